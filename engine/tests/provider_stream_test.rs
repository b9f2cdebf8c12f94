//! Integration tests for streaming chat providers
//!
//! Uses wiremock to serve canned SSE bodies so the providers and the legal
//! assistant can be exercised without network access.

use futures::StreamExt;
use lexbrain_engine::brain::Brain;
use lexbrain_engine::config::ProviderConfig;
use lexbrain_engine::db::Database;
use lexbrain_engine::legal::{
    drafting_request, DocumentGenerator, DocumentType, LawAgent, LegalAssistant, LegalMode,
    ResponseCache,
};
use lexbrain_engine::llm::{
    collect_stream, ChatProvider, GeminiProvider, GenerationParams, LLMError, Message,
    OpenAICompatibleProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_config(server: &MockServer, model: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: server.uri(),
        model: model.to_string(),
        api_key_env: None,
    }
}

fn sse(events: &[&str]) -> String {
    events
        .iter()
        .map(|e| format!("data: {}\n\n", e))
        .collect::<String>()
}

fn openai_body(deltas: &[&str]) -> String {
    let mut events: Vec<String> = vec![r#"{"choices":[{"delta":{"role":"assistant"}}]}"#.to_string()];
    events.extend(
        deltas
            .iter()
            .map(|d| serde_json::json!({"choices": [{"delta": {"content": d}}]}).to_string()),
    );
    events.push("[DONE]".to_string());
    let refs: Vec<&str> = events.iter().map(String::as_str).collect();
    sse(&refs)
}

fn openai_provider(server: &MockServer, key: Option<&str>) -> OpenAICompatibleProvider {
    OpenAICompatibleProvider::new(
        "openai",
        provider_config(server, "gpt-4o-mini"),
        key.map(str::to_string),
        false,
        reqwest::Client::new(),
    )
}

fn lmstudio_provider(server: &MockServer) -> OpenAICompatibleProvider {
    OpenAICompatibleProvider::new(
        "lmstudio",
        provider_config(server, "local-model"),
        None,
        true,
        reqwest::Client::new(),
    )
}

#[tokio::test]
async fn test_openai_stream_concatenates_deltas() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "max_tokens": 2048
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Con", "sideration"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let provider = openai_provider(&server, Some("test-key"));
    assert!(!provider.is_local());
    assert!(!openai_provider(&server, None).is_local());

    let stream = provider
        .stream_chat(&[Message::user("Define consideration")], &GenerationParams::default())
        .await
        .unwrap();
    assert_eq!(collect_stream(stream).await.unwrap(), "Consideration");
}

#[tokio::test]
async fn test_openai_stream_ignores_events_after_done() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"choices":[{"delta":{"content":"done"}}]}"#,
        "[DONE]",
        r#"{"choices":[{"delta":{"content":" extra"}}]}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = lmstudio_provider(&server);
    assert!(provider.is_local());

    let stream = provider
        .stream_chat(&[Message::user("hi")], &GenerationParams::default())
        .await
        .unwrap();
    let deltas: Vec<String> = stream.map(|d| d.unwrap()).collect().await;
    assert_eq!(deltas, vec!["done"]);
}

#[tokio::test]
async fn test_openai_auth_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = openai_provider(&server, Some("bad-key"));
    let result = provider
        .stream_chat(&[Message::user("hi")], &GenerationParams::default())
        .await;

    match result {
        Err(LLMError::AuthenticationFailed(msg)) => assert!(msg.contains("invalid api key")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an authentication error"),
    }
}

#[tokio::test]
async fn test_openai_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = openai_provider(&server, Some("key"));
    let result = provider
        .stream_chat(&[Message::user("hi")], &GenerationParams::default())
        .await;
    assert!(matches!(result, Err(LLMError::RateLimitExceeded)));
}

#[tokio::test]
async fn test_gemini_stream() {
    let server = MockServer::start().await;
    let body = sse(&[
        r#"{"candidates":[{"content":{"parts":[{"text":"Habeas "}],"role":"model"}}]}"#,
        r#"{"candidates":[{"content":{"parts":[{"text":"corpus"}],"role":"model"}}]}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(query_param("key", "gemini-key"))
        .and(body_partial_json(serde_json::json!({
            "systemInstruction": {"parts": [{"text": "Be brief"}]},
            "contents": [{"role": "user", "parts": [{"text": "Latin please"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = GeminiProvider::new(
        provider_config(&server, "gemini-1.5-flash"),
        "gemini-key".to_string(),
        reqwest::Client::new(),
    );

    let stream = provider
        .stream_chat(
            &[Message::system("Be brief"), Message::user("Latin please")],
            &GenerationParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(collect_stream(stream).await.unwrap(), "Habeas corpus");
}

#[tokio::test]
async fn test_assistant_prefixes_reasoning_banner() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["A tort is ", "a civil wrong."]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let assistant = LegalAssistant::new(
        Arc::new(Brain::default()),
        Box::new(openai_provider(&server, None)),
    );

    let mut streamed = String::new();
    let answer = assistant
        .respond(
            "What is a tort?",
            &[],
            LegalMode::General,
            true,
            &GenerationParams::default(),
            |chunk| streamed.push_str(chunk),
        )
        .await
        .unwrap();

    assert_eq!(
        answer,
        "Reasoning Protocols Applied:\n- Chain-of-Thought: success\n\nA tort is a civil wrong."
    );
    assert_eq!(streamed, answer);
}

#[tokio::test]
async fn test_assistant_without_reasoning_sends_mode_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "system", "content": format!(
                    "{}\n\nUser Query: Where do I file?",
                    LegalMode::Navigation.system_prompt()
                )},
                {"role": "user", "content": "Where do I file?"}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Room 101"]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let assistant = LegalAssistant::new(
        Arc::new(Brain::default()),
        Box::new(openai_provider(&server, None)),
    );

    let answer = assistant
        .respond(
            "Where do I file?",
            &[],
            LegalMode::Navigation,
            false,
            &GenerationParams::default(),
            |_| {},
        )
        .await
        .unwrap();
    assert_eq!(answer, "Room 101");
}

#[tokio::test]
async fn test_assistant_appends_mid_stream_error() {
    let server = MockServer::start().await;
    let body = sse(&[r#"{"choices":[{"delta":{"content":"Partial"}}]}"#, "{not json"]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let assistant = LegalAssistant::new(
        Arc::new(Brain::default()),
        Box::new(openai_provider(&server, None)),
    );

    let answer = assistant
        .respond(
            "hello",
            &[],
            LegalMode::General,
            false,
            &GenerationParams::default(),
            |_| {},
        )
        .await
        .unwrap();

    assert!(answer.starts_with("Partial\n\nError: Parse error"));
}

#[tokio::test]
async fn test_draft_sends_type_prompt_and_fields() {
    let server = MockServer::start().await;
    let fields = vec![
        ("testator".to_string(), "Jane Roe".to_string()),
        ("executor".to_string(), "John Roe".to_string()),
    ];

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "max_tokens": 4096,
            "temperature": 0.5,
            "messages": [
                {"role": "system", "content": DocumentType::Will.system_prompt()},
                {"role": "user", "content": drafting_request(&DocumentType::Will, &fields, "")}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                openai_body(&["LAST WILL AND TESTAMENT\n", "I, Jane Roe, ..."]),
                "text/event-stream",
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let generator = DocumentGenerator::new(Arc::new(openai_provider(&server, Some("key"))));
    let document = generator
        .generate(&DocumentType::parse("Will"), &fields, "")
        .await
        .unwrap();
    assert_eq!(document, "LAST WILL AND TESTAMENT\nI, Jane Roe, ...");
}

#[tokio::test]
async fn test_draft_surfaces_provider_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let generator = DocumentGenerator::new(Arc::new(openai_provider(&server, None)));
    let result = generator
        .generate(&DocumentType::parse("lease"), &[], "month to month")
        .await;
    assert!(matches!(result, Err(LLMError::ProviderUnavailable(_))));
}

#[tokio::test]
async fn test_cached_answer_is_replayed_without_a_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Thirty days."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let assistant = LegalAssistant::new(
        Arc::new(Brain::default()),
        Box::new(openai_provider(&server, None)),
    )
    .with_cache(ResponseCache::new(16, Duration::from_secs(60)));

    let mut answers = Vec::new();
    for _ in 0..2 {
        let mut streamed = String::new();
        let answer = assistant
            .respond(
                "How long to answer a complaint?",
                &[],
                LegalMode::General,
                false,
                &GenerationParams::default(),
                |chunk| streamed.push_str(chunk),
            )
            .await
            .unwrap();
        answers.push((answer, streamed));
    }

    assert_eq!(answers[0].0, "Thirty days.");
    assert_eq!(answers[1].0, answers[0].0);
    assert_eq!(answers[1].1, answers[0].0);

    let stats = assistant.cache_stats().await.unwrap();
    assert_eq!((stats.requests, stats.hits, stats.misses), (2, 1, 1));
}

#[tokio::test]
async fn test_broken_answers_are_not_cached() {
    let server = MockServer::start().await;
    let body = sse(&[r#"{"choices":[{"delta":{"content":"Partial"}}]}"#, "{not json"]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(2)
        .mount(&server)
        .await;

    let assistant = LegalAssistant::new(
        Arc::new(Brain::default()),
        Box::new(openai_provider(&server, None)),
    )
    .with_cache(ResponseCache::new(16, Duration::from_secs(60)));

    for _ in 0..2 {
        let answer = assistant
            .respond(
                "hello",
                &[],
                LegalMode::General,
                false,
                &GenerationParams::default(),
                |_| {},
            )
            .await
            .unwrap();
        assert!(answer.starts_with("Partial\n\nError:"));
    }

    let stats = assistant.cache_stats().await.unwrap();
    assert_eq!((stats.requests, stats.hits, stats.errors), (2, 0, 2));
}

#[tokio::test]
async fn test_agent_dual_analysis_asks_both_perspectives() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("**Lawful Perspective**"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Inherent right."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("**Legal (Statutory) Perspective**"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Section 12 applies."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let agent = LawAgent::new(Arc::new(openai_provider(&server, None)));
    let output = agent
        .dual_analysis("Can I fish here?", &[], &GenerationParams::default())
        .await
        .unwrap();

    let lawful = output.find("Inherent right.").unwrap();
    let statutory = output.find("Section 12 applies.").unwrap();
    assert!(lawful < statutory);
    assert!(output.starts_with("## Dual Analysis Output"));
}

#[tokio::test]
async fn test_agent_runs_planned_case_and_direct_tasks() {
    let server = MockServer::start().await;
    let plan = serde_json::json!([
        {"task": "call_tool", "tool_name": "case_manager",
         "args": {"action": "create_case", "title": "Smith v. Jones"}},
        {"task": "call_tool", "args": {"tool_name": "handwritten_note_interpreter"}},
        {"task": "direct_llm_response", "args": {"raw_llm_output": "Case opened."}}
    ])
    .to_string();

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("task decomposition expert"))
        .and(body_partial_json(serde_json::json!({"max_tokens": 500})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&[plan.as_str()]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let database = Database::new(&temp_dir.path().join("cases.db")).await.unwrap();
    let agent =
        LawAgent::new(Arc::new(openai_provider(&server, None))).with_cases(database.cases());

    let output = agent
        .run("Open a case for Smith v. Jones", &[], &GenerationParams::default())
        .await
        .unwrap();

    assert!(output.contains("\"title\": \"Smith v. Jones\""));
    assert!(output.contains("Tool 'handwritten_note_interpreter' not yet implemented"));
    assert!(output.ends_with("\n\nCase opened."));

    let cases = database.cases().list_cases(None).await.unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, "Open");
}

#[tokio::test]
async fn test_agent_answers_directly_when_plan_is_prose() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(openai_body(&["Just file form 7."]), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let agent = LawAgent::new(Arc::new(openai_provider(&server, None)));
    let output = agent
        .run("Which form do I need?", &[], &GenerationParams::default())
        .await
        .unwrap();
    assert_eq!(output, "Just file form 7.");
}
