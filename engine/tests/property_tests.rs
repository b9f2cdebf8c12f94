use lexbrain_engine::brain::router::{DEFAULT_PROTOCOL, MULTI_AGENT_PROTOCOL, REFLECTION_PROTOCOL};
use lexbrain_engine::brain::{ExecutionMode, Preferences, ProtocolRouter};
use lexbrain_engine::llm::sse::SseDecoder;
use proptest::prelude::*;
use sdk::ReasoningContext;

fn prefs(reflect: bool, multi_agent: bool) -> Preferences {
    [
        ("use_reflection".to_string(), reflect),
        ("multi_agent".to_string(), multi_agent),
    ]
    .into_iter()
    .collect()
}

// Queries built only from letters that spell no routing keyword fall back to
// the default protocol, with the preference protocols appended in order.
proptest! {
    #[test]
    fn test_router_falls_back_to_default(
        query in "[bdfjlwxyz ]{0,40}",
        reflect in any::<bool>(),
        multi_agent in any::<bool>(),
    ) {
        let ctx = ReasoningContext::new("t", query);
        let selected = ProtocolRouter::new().route(&ctx, &prefs(reflect, multi_agent));

        let mut expected = vec![DEFAULT_PROTOCOL.to_string()];
        if reflect {
            expected.push(REFLECTION_PROTOCOL.to_string());
        }
        if multi_agent {
            expected.push(MULTI_AGENT_PROTOCOL.to_string());
        }
        prop_assert_eq!(selected, expected);
    }
}

// Routing never returns an empty list and ignores letter case.
proptest! {
    #[test]
    fn test_router_is_case_insensitive(
        prefix in "[a-z ]{0,10}",
        keyword in "quantum|optimize|verify|search|knowledge|reasoning|circuit",
        suffix in "[a-z ]{0,10}",
    ) {
        let query = format!("{}{}{}", prefix, keyword, suffix);
        let router = ProtocolRouter::new();
        let none = Preferences::new();

        let lower = router.route(&ReasoningContext::new("a", query.clone()), &none);
        let upper = router.route(&ReasoningContext::new("b", query.to_uppercase()), &none);

        prop_assert!(!lower.is_empty());
        prop_assert_eq!(lower, upper);
    }
}

// Reflection is always last when only reflection is requested.
proptest! {
    #[test]
    fn test_reflection_is_appended_last(query in "[a-z ]{0,40}") {
        let ctx = ReasoningContext::new("t", query);
        let selected = ProtocolRouter::new().route(&ctx, &prefs(true, false));
        prop_assert_eq!(selected.last().map(String::as_str), Some(REFLECTION_PROTOCOL));
    }
}

// Only the exact string "parallel" selects parallel mode.
proptest! {
    #[test]
    fn test_execution_mode_parsing(value in "[a-zA-Z]{0,12}") {
        let mode = ExecutionMode::from(value.as_str());
        if value == "parallel" {
            prop_assert_eq!(mode, ExecutionMode::Parallel);
        } else {
            prop_assert_eq!(mode, ExecutionMode::Sequential);
        }
    }
}

// Splitting an SSE body at any byte yields the same data payloads.
proptest! {
    #[test]
    fn test_sse_decoding_ignores_chunk_boundaries(
        payloads in prop::collection::vec("[^\r\n]{0,20}", 1..6),
        split in any::<prop::sample::Index>(),
    ) {
        let body: String = payloads
            .iter()
            .map(|p| format!("data: {}\n\n", p))
            .collect();
        let bytes = body.as_bytes();
        let at = split.index(bytes.len() + 1);

        let mut decoder = SseDecoder::new();
        let mut decoded = decoder.push(&bytes[..at]);
        decoded.extend(decoder.push(&bytes[at..]));
        decoded.extend(decoder.finish());

        prop_assert_eq!(decoded, payloads);
    }
}
