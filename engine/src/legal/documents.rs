//! Legal document drafting
//!
//! Builds a type-specific drafting prompt, sends the caller's field values
//! and context to a chat provider and returns the finished document text.

use crate::llm::{self, collect_stream, ChatProvider, GenerationParams, LLMError, Message};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Sampling used for drafting: long output, conservative wording
pub const DRAFTING_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 4096,
    temperature: 0.5,
    top_p: 0.9,
};

const BASE_PROMPT: &str = "You are an AI specialized in drafting legal documents. \
    Your output must be a well-structured, professional legal document. \
    Do not include conversational text or explanations outside the document itself. \
    Focus solely on generating the document content.";

/// Kind of document to draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentType {
    Will,
    Contract,
    Motion,
    Pleading,
    /// Any other document, drafted from a generic prompt
    Other(String),
}

impl DocumentType {
    /// Case-insensitive lookup; unrecognized names become `Other`
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        match name.to_lowercase().as_str() {
            "will" => DocumentType::Will,
            "contract" => DocumentType::Contract,
            "motion" => DocumentType::Motion,
            "pleading" => DocumentType::Pleading,
            _ => DocumentType::Other(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DocumentType::Will => "will",
            DocumentType::Contract => "contract",
            DocumentType::Motion => "motion",
            DocumentType::Pleading => "pleading",
            DocumentType::Other(name) => name,
        }
    }

    pub fn system_prompt(&self) -> String {
        let instructions = match self {
            DocumentType::Will => {
                "Draft a Last Will and Testament. Include standard clauses for executor \
                 appointment, beneficiaries, distribution of assets, guardianship for minors \
                 (if applicable), and residuary estate. Use clear and unambiguous language. \
                 Ensure placeholders for names, dates, and specific bequests."
                    .to_string()
            }
            DocumentType::Contract => {
                "Draft a general contract. Include standard sections like parties involved, \
                 recitals, terms and conditions, obligations, duration, termination clauses, \
                 governing law, and signatures. Adapt to the specific nature implied by user \
                 inputs."
                    .to_string()
            }
            DocumentType::Motion => {
                "Draft a legal motion. Include standard formatting: court name, case caption, \
                 title of motion, factual background, legal arguments, and prayer for relief. \
                 Focus on clarity and persuasiveness based on provided details."
                    .to_string()
            }
            DocumentType::Pleading => {
                "Draft a legal pleading (e.g., complaint, answer). Include court name, case \
                 caption, parties, factual allegations, causes of action, and prayer for \
                 relief. Adhere to typical pleading structure."
                    .to_string()
            }
            DocumentType::Other(name) => format!(
                "Draft a legal document of type: {}. Adapt based on the provided inputs.",
                name
            ),
        };
        format!("{}\n\n{}", BASE_PROMPT, instructions)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User message listing the field values in the order given
pub fn drafting_request(
    document_type: &DocumentType,
    fields: &[(String, String)],
    context: &str,
) -> String {
    let details: Vec<String> = fields
        .iter()
        .map(|(key, value)| format!("- {}: {}", key, value))
        .collect();
    format!(
        "Generate a {} using the following information:\n\n{}\n\n\
         Additional context: {}\n\n\
         Ensure the document is professional, legally sound (to the best of AI's ability), \
         and well-formatted.",
        document_type,
        details.join("\n"),
        context
    )
}

pub struct DocumentGenerator {
    provider: Arc<dyn ChatProvider>,
    params: GenerationParams,
}

impl DocumentGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            params: DRAFTING_PARAMS,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Draft a document and return its full text
    pub async fn generate(
        &self,
        document_type: &DocumentType,
        fields: &[(String, String)],
        context: &str,
    ) -> llm::Result<String> {
        if document_type.as_str().is_empty() {
            return Err(LLMError::InvalidRequest(
                "document type must not be empty".to_string(),
            ));
        }

        let messages = [
            Message::system(document_type.system_prompt()),
            Message::user(drafting_request(document_type, fields, context)),
        ];

        info!(
            "Drafting {} with {} ({} fields)",
            document_type,
            self.provider.name(),
            fields.len()
        );
        let stream = self.provider.stream_chat(&messages, &self.params).await?;
        collect_stream(stream).await
    }
}
