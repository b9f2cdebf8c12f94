//! Law agent
//!
//! Asks the chat provider to break a query into tasks, then runs each task:
//! a direct answer, a drafting or case-store tool call, or a dual analysis
//! that answers from the lawful (natural and common law) and the statutory
//! perspective side by side. Task outputs are joined with blank lines.

use super::documents::{DocumentGenerator, DocumentType};
use crate::db::{CaseRepository, CaseUpdate};
use crate::llm::{collect_stream, ChatProvider, GenerationParams, Message};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sampling used when asking for a plan
pub const PLANNING_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 500,
    temperature: 0.3,
    top_p: 0.9,
};

const PLANNER_PROMPT: &str = "You are a task decomposition expert. Given a user's legal query \
    and chat history, break it down into actionable steps and identify necessary tools/sub-agents. \
    Output as a JSON list of tasks, e.g., [{\"task\": \"direct_llm_response\", \"args\": {}}, \
    {\"task\": \"call_tool\", \"args\": {\"tool_name\": \"legal_document_generator\", \
    \"document_type\": \"will\", \"user_inputs\": {}, \"context\": \"\"}}, \
    {\"task\": \"dual_analysis\", \"args\": {}}]";

const ASSISTANT_PROMPT: &str = "You are a helpful legal assistant.";

const LAWFUL_PROMPT: &str = "You are a highly analytical Legal Expert specializing in the \
    **Lawful Perspective**. Your task is to analyze the user's legal query exclusively through \
    the lens of: 1.  **Natural Law:** Universal moral principles, inherent justice, rights \
    endowed by creator/nature. 2.  **Common Law:** Historical judicial precedents, established \
    customs, and unwritten laws. 3.  **Inherent Rights:** Fundamental, inalienable rights of \
    individuals. Focus on the underlying principles, maxims, and jurisprudential foundations. \
    Provide a clear, concise, and objective analysis, avoiding statutory jargon where possible, \
    and emphasizing the ethical and foundational aspects of the matter. Structure your response \
    to clearly articulate the lawful position, its implications, and any relevant historical \
    context.";

const STATUTORY_PROMPT: &str = "You are a highly analytical Legal Expert specializing in the \
    **Legal (Statutory) Perspective**. Your task is to analyze the user's legal query \
    exclusively through the lens of: 1.  **Statutory Law:** Enacted legislation, codes, and acts \
    passed by legislative bodies. 2.  **Regulations:** Rules and administrative codes issued by \
    governmental agencies. 3.  **Binding Legal Precedents:** Decisions from higher courts that \
    lower courts must follow. Focus on the black-letter law, jurisdictional rules, procedural \
    requirements, and practical application within existing legal frameworks. Provide a clear, \
    concise, and objective analysis, citing specific legal provisions or types of statutes where \
    appropriate, and emphasizing the procedural and enforceable aspects of the matter within the \
    'legal' system. Structure your response to clearly articulate the legal position, its \
    requirements, and potential outcomes under current law.";

/// One step of a plan as the provider writes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInstruction {
    pub task: String,
    /// Accepted here or inside `args`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl TaskInstruction {
    /// A plan step that answers directly, reusing `raw` when present
    pub fn direct(raw: Option<String>) -> Self {
        let mut args = Map::new();
        if let Some(raw) = raw {
            args.insert("raw_llm_output".to_string(), Value::String(raw));
        }
        Self {
            task: "direct_llm_response".to_string(),
            tool_name: None,
            args,
        }
    }

    fn tool(&self) -> Option<&str> {
        self.tool_name
            .as_deref()
            .or_else(|| self.args.get("tool_name").and_then(Value::as_str))
    }

    fn str_arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    fn id_arg(&self, key: &str) -> Option<i64> {
        let value = self.args.get(key)?;
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }
}

/// Parse a plan, falling back to one direct step carrying the raw text.
///
/// Text around the outermost JSON array (code fences, preamble) is ignored.
pub fn parse_plan(raw: &str) -> Vec<TaskInstruction> {
    let trimmed = raw.trim();
    let body = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };

    match serde_json::from_str::<Vec<TaskInstruction>>(body) {
        Ok(plan) if !plan.is_empty() => plan,
        Ok(_) => vec![TaskInstruction::direct(None)],
        Err(e) => {
            debug!("Plan is not a task list ({}), answering directly", e);
            vec![TaskInstruction::direct(Some(raw.to_string()))]
        }
    }
}

/// Join both perspectives under their headings
pub fn format_dual_analysis(lawful: &str, statutory: &str) -> String {
    format!(
        "## Dual Analysis Output: Lawful vs. Legal\n\n---\n\n\
         ### Lawful Perspective (Natural Law, Common Law, Inherent Rights):\n{}\n\n---\n\n\
         ### Legal/Statutory Perspective (Enacted Laws, Regulations, Precedents):\n{}\n\n---\n\n\
         This dual analysis provides a comprehensive understanding of the matter from both \
         foundational and enacted legal viewpoints.",
        lawful, statutory
    )
}

pub struct LawAgent {
    provider: Arc<dyn ChatProvider>,
    documents: DocumentGenerator,
    cases: Option<CaseRepository>,
}

impl LawAgent {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            documents: DocumentGenerator::new(Arc::clone(&provider)),
            provider,
            cases: None,
        }
    }

    /// Let plans read and change the case store
    pub fn with_cases(mut self, cases: CaseRepository) -> Self {
        self.cases = Some(cases);
        self
    }

    /// Plan the query, run every step and join the outputs
    pub async fn run(
        &self,
        query: &str,
        history: &[Message],
        params: &GenerationParams,
    ) -> Result<String> {
        let plan = self.plan(query, history).await?;
        info!("Running {} planned task(s)", plan.len());

        let mut outputs = Vec::with_capacity(plan.len());
        for step in &plan {
            outputs.push(self.execute_task(step, query, history, params).await?);
        }
        Ok(outputs.join("\n\n"))
    }

    /// Ask the provider to decompose the query
    pub async fn plan(&self, query: &str, history: &[Message]) -> Result<Vec<TaskInstruction>> {
        let messages = conversation(
            PLANNER_PROMPT,
            history,
            &format!("Decompose the following legal query: {}", query),
        );
        let raw = self.ask(&messages, &PLANNING_PARAMS).await?;
        Ok(parse_plan(&raw))
    }

    /// Run one plan step.
    ///
    /// Unknown tasks, tools and case actions produce an explanatory line
    /// instead of an error.
    pub async fn execute_task(
        &self,
        step: &TaskInstruction,
        query: &str,
        history: &[Message],
        params: &GenerationParams,
    ) -> Result<String> {
        debug!("Executing task {}", step.task);
        match step.task.as_str() {
            "direct_llm_response" => match step.str_arg("raw_llm_output") {
                Some(raw) => Ok(raw.to_string()),
                None => {
                    let messages = conversation(ASSISTANT_PROMPT, history, query);
                    self.ask(&messages, params).await
                }
            },
            "call_tool" => self.call_tool(step).await,
            "dual_analysis" => self.dual_analysis(query, history, params).await,
            other => Ok(format!("Unknown task type: {}", other)),
        }
    }

    /// Answer from both perspectives concurrently
    pub async fn dual_analysis(
        &self,
        query: &str,
        history: &[Message],
        params: &GenerationParams,
    ) -> Result<String> {
        let lawful = conversation(LAWFUL_PROMPT, history, query);
        let statutory = conversation(STATUTORY_PROMPT, history, query);
        let (lawful, statutory) = futures::try_join!(
            self.ask(&lawful, params),
            self.ask(&statutory, params)
        )?;
        Ok(format_dual_analysis(&lawful, &statutory))
    }

    async fn call_tool(&self, step: &TaskInstruction) -> Result<String> {
        match step.tool() {
            Some("legal_document_generator") => {
                let document_type = step
                    .str_arg("document_type")
                    .or_else(|| step.str_arg("doc_type"))
                    .unwrap_or_default();
                let fields: Vec<(String, String)> = step
                    .args
                    .get("user_inputs")
                    .and_then(Value::as_object)
                    .map(|inputs| {
                        inputs
                            .iter()
                            .map(|(k, v)| (k.clone(), value_text(v)))
                            .collect()
                    })
                    .unwrap_or_default();
                let context = step.str_arg("context").unwrap_or_default();
                Ok(self
                    .documents
                    .generate(&DocumentType::parse(document_type), &fields, context)
                    .await?)
            }
            Some("case_manager") => match &self.cases {
                Some(cases) => case_action(cases, step).await,
                None => Ok("Tool 'case_manager' not yet implemented or available.".to_string()),
            },
            Some(other) => Ok(format!("Tool '{}' not yet implemented or available.", other)),
            None => Ok("Tool 'None' not yet implemented or available.".to_string()),
        }
    }

    async fn ask(&self, messages: &[Message], params: &GenerationParams) -> Result<String> {
        let stream = self.provider.stream_chat(messages, params).await?;
        Ok(collect_stream(stream).await?)
    }
}

/// System prompt, non-empty history turns, then the user turn
fn conversation(system: &str, history: &[Message], user: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    messages.extend(history.iter().filter(|m| !m.content.is_empty()).cloned());
    messages.push(Message::user(user));
    messages
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

async fn case_action(cases: &CaseRepository, step: &TaskInstruction) -> Result<String> {
    let action = step.str_arg("action").unwrap_or_default();
    let case_id = step.id_arg("case_id");

    let output = match (action, case_id) {
        ("create_case", _) => {
            let title = step.str_arg("title").unwrap_or("Untitled case");
            let description = step.str_arg("description").unwrap_or_default();
            json!(
                cases
                    .create_case(title, description, step.str_arg("status"))
                    .await?
            )
        }
        ("list_cases", _) => json!(cases.list_cases(step.str_arg("status")).await?),
        ("get_case", Some(id)) => json!(cases.get_case(id).await?),
        ("update_case", Some(id)) => {
            let update = CaseUpdate {
                title: step.str_arg("title").map(str::to_string),
                description: step.str_arg("description").map(str::to_string),
                status: step.str_arg("status").map(str::to_string),
            };
            json!({ "case_id": id, "updated": cases.update_case(id, &update).await? })
        }
        ("delete_case", Some(id)) => {
            json!({ "case_id": id, "deleted": cases.delete_case(id).await? })
        }
        ("add_note_to_case", Some(id)) => {
            let content = step.str_arg("content").unwrap_or_default();
            json!(cases.add_note(id, content).await?)
        }
        ("get_notes_for_case", Some(id)) => json!(cases.get_notes(id).await?),
        ("add_document_to_case", Some(id)) => {
            let title = step.str_arg("title").unwrap_or("Untitled document");
            json!(
                cases
                    .add_document(id, title, step.str_arg("file_path"))
                    .await?
            )
        }
        ("get_documents_for_case", Some(id)) => json!(cases.get_documents(id).await?),
        (
            "get_case" | "update_case" | "delete_case" | "add_note_to_case" | "get_notes_for_case"
            | "add_document_to_case" | "get_documents_for_case",
            None,
        ) => {
            warn!("Case action {} without a case_id", action);
            return Ok(format!("CaseManager action '{}' needs a case_id.", action));
        }
        _ => return Ok(format!("CaseManager action '{}' not recognized.", action)),
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_reads_task_list() {
        let plan = parse_plan(
            r#"[{"task": "dual_analysis"},
                {"task": "call_tool", "tool_name": "case_manager", "args": {"action": "list_cases"}}]"#,
        );
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].task, "dual_analysis");
        assert!(plan[0].args.is_empty());
        assert_eq!(plan[1].tool(), Some("case_manager"));
        assert_eq!(plan[1].str_arg("action"), Some("list_cases"));
    }

    #[test]
    fn test_parse_plan_tolerates_code_fence_and_nested_tool_name() {
        let plan = parse_plan(
            "Here is the plan:\n```json\n[{\"task\": \"call_tool\", \"args\": {\"tool_name\": \"legal_document_generator\"}}]\n```",
        );
        assert_eq!(plan[0].tool(), Some("legal_document_generator"));
    }

    #[test]
    fn test_parse_plan_falls_back_to_raw_text() {
        let plan = parse_plan("Consult a lawyer.");
        assert_eq!(plan, vec![TaskInstruction::direct(Some("Consult a lawyer.".to_string()))]);
        assert_eq!(parse_plan("[]"), vec![TaskInstruction::direct(None)]);
    }

    #[test]
    fn test_id_arg_accepts_numbers_and_strings() {
        let step: TaskInstruction =
            serde_json::from_str(r#"{"task": "call_tool", "args": {"case_id": "7"}}"#).unwrap();
        assert_eq!(step.id_arg("case_id"), Some(7));

        let step: TaskInstruction =
            serde_json::from_str(r#"{"task": "call_tool", "args": {"case_id": 3}}"#).unwrap();
        assert_eq!(step.id_arg("case_id"), Some(3));
    }

    #[test]
    fn test_format_dual_analysis() {
        let text = format_dual_analysis("natural", "statutory");
        assert!(text.starts_with("## Dual Analysis Output: Lawful vs. Legal"));
        let lawful = text.find("natural").unwrap();
        let statutory = text.find("statutory").unwrap();
        assert!(lawful < statutory);
    }

    #[test]
    fn test_conversation_skips_empty_history() {
        let history = [Message::user("earlier"), Message::assistant("")];
        let messages = conversation("sys", &history, "now");
        assert_eq!(
            messages,
            vec![Message::system("sys"), Message::user("earlier"), Message::user("now")]
        );
    }
}
