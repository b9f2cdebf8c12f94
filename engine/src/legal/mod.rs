//! Legal assistant layer
//!
//! Mode-specific prompts on top of the reasoning brain and a chat provider,
//! a response cache, document drafting and a planning agent.

pub mod agent;
pub mod assistant;
pub mod cache;
pub mod documents;
pub mod modes;

pub use agent::{format_dual_analysis, parse_plan, LawAgent, TaskInstruction};
pub use assistant::{enhanced_query, reasoning_banner, LegalAssistant, PreparedQuery};
pub use cache::{CacheKey, CacheStats, RequestOutcome, ResponseCache};
pub use documents::{drafting_request, DocumentGenerator, DocumentType};
pub use modes::LegalMode;
