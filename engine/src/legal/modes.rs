//! Legal assistant modes and their system prompts

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalMode {
    Navigation,
    #[default]
    General,
    DocumentValidation,
    LegalResearch,
    Etymology,
    CaseManagement,
    RegulatoryUpdates,
}

impl LegalMode {
    pub const ALL: [LegalMode; 7] = [
        LegalMode::Navigation,
        LegalMode::General,
        LegalMode::DocumentValidation,
        LegalMode::LegalResearch,
        LegalMode::Etymology,
        LegalMode::CaseManagement,
        LegalMode::RegulatoryUpdates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LegalMode::Navigation => "navigation",
            LegalMode::General => "general",
            LegalMode::DocumentValidation => "document_validation",
            LegalMode::LegalResearch => "legal_research",
            LegalMode::Etymology => "etymology",
            LegalMode::CaseManagement => "case_management",
            LegalMode::RegulatoryUpdates => "regulatory_updates",
        }
    }

    /// Exact lookup by mode name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Lookup that falls back to `General` for unknown names
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            warn!("Unknown legal mode '{}', using general", name);
            LegalMode::General
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            LegalMode::Navigation => "Navigation Guide",
            LegalMode::General => "General Legal",
            LegalMode::DocumentValidation => "Document Validator",
            LegalMode::LegalResearch => "Legal Research",
            LegalMode::Etymology => "Etymology Expert",
            LegalMode::CaseManagement => "Case Management",
            LegalMode::RegulatoryUpdates => "Regulatory Updates",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            LegalMode::Navigation => {
                "You are a ProVerBs Legal AI Navigation Guide with advanced reasoning capabilities."
            }
            LegalMode::General => {
                "You are a General Legal Assistant powered by ADAPPT-I\u{2122} reasoning technology."
            }
            LegalMode::DocumentValidation => {
                "You are a Document Validator using Chain-of-Thought and Self-Consistency protocols."
            }
            LegalMode::LegalResearch => {
                "You are a Legal Research Assistant with RAG and Tree-of-Thoughts capabilities."
            }
            LegalMode::Etymology => "You are a Legal Etymology Expert with multi-step reasoning.",
            LegalMode::CaseManagement => {
                "You are a Case Management Helper with ReAct protocol integration."
            }
            LegalMode::RegulatoryUpdates => {
                "You are a Regulatory Monitor with real-time analysis capabilities."
            }
        }
    }

    /// Modes that ask the brain for a reflection pass
    pub fn uses_reflection(&self) -> bool {
        matches!(self, LegalMode::DocumentValidation | LegalMode::LegalResearch)
    }
}

impl fmt::Display for LegalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
