//! Protocol Router
//!
//! Maps query text and caller preferences to an ordered list of protocol
//! names. Matching is case-insensitive substring search over ordered
//! keyword groups. Every matching group contributes its protocols, and
//! duplicates are kept.

use crate::config::RouteConfig;
use sdk::ReasoningContext;
use std::collections::HashMap;
use tracing::debug;

/// Protocol used when no keyword matches
pub const DEFAULT_PROTOCOL: &str = "Chain-of-Thought";

/// Appended when the `use_reflection` preference is set
pub const REFLECTION_PROTOCOL: &str = "Reflexion";

/// Appended when the `multi_agent` preference is set
pub const MULTI_AGENT_PROTOCOL: &str = "Multi-Agent-Coordination";

/// Caller preferences. Unrecognized keys are accepted and ignored.
pub type Preferences = HashMap<String, bool>;

/// One keyword group and the protocols it selects
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRoute {
    pub keywords: Vec<String>,
    pub protocols: Vec<String>,
}

impl KeywordRoute {
    pub fn new(keywords: &[&str], protocols: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            protocols: protocols.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn matches(&self, lowered_query: &str) -> bool {
        self.keywords.iter().any(|k| lowered_query.contains(k.as_str()))
    }
}

impl From<&RouteConfig> for KeywordRoute {
    fn from(route: &RouteConfig) -> Self {
        Self {
            keywords: route.keywords.iter().map(|k| k.to_lowercase()).collect(),
            protocols: route.protocols.clone(),
        }
    }
}

/// Built-in keyword groups, checked in order
fn builtin_routes() -> Vec<KeywordRoute> {
    vec![
        KeywordRoute::new(
            &["quantum", "circuit", "qubit"],
            &["Quantum-Job-Orchestration", "Circuit-Transpilation"],
        ),
        KeywordRoute::new(&["optimize"], &["QAOA", "VQE"]),
        KeywordRoute::new(&["multi-step", "reasoning"], &["Chain-of-Thought"]),
        KeywordRoute::new(&["verify", "check"], &["Self-Consistency"]),
        KeywordRoute::new(&["search", "explore"], &["Tree-of-Thoughts"]),
        KeywordRoute::new(&["knowledge", "retrieve"], &["RAG"]),
    ]
}

/// Keyword router
#[derive(Debug, Clone)]
pub struct ProtocolRouter {
    routes: Vec<KeywordRoute>,
}

impl Default for ProtocolRouter {
    fn default() -> Self {
        Self {
            routes: builtin_routes(),
        }
    }
}

impl ProtocolRouter {
    /// Router with only the built-in keyword groups
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with extra groups checked after the built-in ones
    pub fn with_extra_routes(extra: impl IntoIterator<Item = KeywordRoute>) -> Self {
        let mut router = Self::default();
        router.routes.extend(extra);
        router
    }

    /// Select protocols for a context
    pub fn route(&self, ctx: &ReasoningContext, preferences: &Preferences) -> Vec<String> {
        let query = ctx.query().to_lowercase();

        let mut selected: Vec<String> = self
            .routes
            .iter()
            .filter(|route| route.matches(&query))
            .flat_map(|route| route.protocols.iter().cloned())
            .collect();

        if selected.is_empty() {
            selected.push(DEFAULT_PROTOCOL.to_string());
        }

        if preference(preferences, "use_reflection") {
            selected.push(REFLECTION_PROTOCOL.to_string());
        }
        if preference(preferences, "multi_agent") {
            selected.push(MULTI_AGENT_PROTOCOL.to_string());
        }

        debug!("Routed task {} to {:?}", ctx.task_id(), selected);
        selected
    }
}

fn preference(preferences: &Preferences, key: &str) -> bool {
    preferences.get(key).copied().unwrap_or(false)
}
