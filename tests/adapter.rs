// tests/adapter.rs

mod common;

use std::sync::Arc;

use bytes::Bytes;
use common::{ndjson, sse, FakeTransport};
use prompt_assistant_lib::backend::NO_RESPONSE;
use prompt_assistant_lib::{
    Attachment, BackendConfig, BackendError, BackendKind, ChatAdapter, ChatMsg,
    ConversationContext, HttpResponse,
};
use serde_json::json;

fn openai_config() -> BackendConfig {
    BackendConfig {
        kind: BackendKind::OpenAICompatible,
        endpoint: "http://localhost:8000/v1/chat/completions".to_string(),
        model: "qwen2-vl".to_string(),
        ..BackendConfig::default()
    }
}

fn ollama_config() -> BackendConfig {
    BackendConfig {
        system_prompts: prompt_assistant_lib::settings::SystemPrompts {
            en: "sys".to_string(),
            ru: "sys-ru".to_string(),
        },
        ..BackendConfig::default()
    }
}

fn adapter(transport: &Arc<FakeTransport>) -> ChatAdapter {
    ChatAdapter::new(transport.clone())
}

#[tokio::test]
async fn openai_stream_accumulates_three_deltas() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(200, vec![sse(&["A ", "cat", "."])]);
    let adapter = adapter(&transport);

    let mut deltas: Vec<String> = Vec::new();
    let mut sink = |d: &str| deltas.push(d.to_string());
    let reply = adapter
        .converse(&[], "draw a cat", &[], &openai_config(), Some(&mut sink))
        .await;

    assert_eq!(reply, "A cat.");
    assert_eq!(deltas, vec!["A ", "cat", "."]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://localhost:8000/v1/chat/completions");
    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body["stream"], true);
    // Empty transcript: system plus the new user message, nothing else
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "draw a cat");
    assert_eq!(adapter.context(), None);
}

#[tokio::test]
async fn openai_stream_split_mid_event_gives_same_text() {
    let transport = Arc::new(FakeTransport::new());
    let body = sse(&["A ", "cat", "."]);
    let chunks: Vec<Vec<u8>> = body.as_bytes().chunks(7).map(<[u8]>::to_vec).collect();
    transport.respond_with(200, chunks);

    let mut count = 0;
    let mut sink = |_: &str| count += 1;
    let reply = adapter(&transport)
        .converse(&[], "draw a cat", &[], &openai_config(), Some(&mut sink))
        .await;

    assert_eq!(reply, "A cat.");
    assert_eq!(count, 3);
}

#[tokio::test]
async fn openai_history_is_sent_in_order() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(200, vec![r#"{"choices":[{"message":{"content":"ok"}}]}"#]);

    let mut shown = ChatMsg::user("this one");
    shown.images = vec![Attachment::from_data_url("data:image/png;base64,AAAA")];
    let transcript = vec![shown, ChatMsg::assistant("a red fox")];

    let reply = adapter(&transport)
        .converse(&transcript, "make it blue", &[], &openai_config(), None)
        .await;
    assert_eq!(reply, "ok");

    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["stream"], false);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[1]["content"][1]["image_url"]["url"], "data:image/png;base64,AAAA");
    assert_eq!(messages[2]["role"], "assistant");
    assert_eq!(messages[3]["content"], "make it blue");
}

#[tokio::test]
async fn empty_non_stream_answer_becomes_placeholder() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(200, vec![r#"{"choices":[]}"#]);

    let reply = adapter(&transport)
        .converse(&[], "hello", &[], &openai_config(), None)
        .await;
    assert_eq!(reply, NO_RESPONSE);
}

#[tokio::test]
async fn http_error_is_formatted_as_reply() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(500, vec!["internal"]);

    let reply = adapter(&transport)
        .converse(&[], "hello", &[], &openai_config(), None)
        .await;
    assert_eq!(
        reply,
        "Error: API request failed: 500. Please check your AI service configuration."
    );
}

#[tokio::test]
async fn transport_failure_is_formatted_as_reply() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail("connection refused");

    let mut sink = |_: &str| panic!("no deltas expected");
    let reply = adapter(&transport)
        .converse(&[], "hello", &[], &openai_config(), Some(&mut sink))
        .await;
    assert_eq!(
        reply,
        "Error: connection refused. Please check your AI service configuration."
    );
}

#[tokio::test]
async fn api_key_is_passed_to_transport() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(200, vec![sse(&["x"])]);
    let config = BackendConfig {
        api_key: Some("sk-123".to_string()),
        ..openai_config()
    };

    let mut sink = |_: &str| {};
    adapter(&transport)
        .converse(&[], "hi", &[], &config, Some(&mut sink))
        .await;
    assert_eq!(transport.requests()[0].api_key.as_deref(), Some("sk-123"));
}

#[tokio::test]
async fn ollama_chat_streams_ndjson() {
    let transport = Arc::new(FakeTransport::new());
    let body = concat!(
        "{\"message\":{\"role\":\"assistant\",\"content\":\"A \"},\"done\":false}\n",
        "{\"message\":{\"role\":\"assistant\",\"content\":\"fox\"},\"done\":true}\n",
    );
    transport.respond_with(200, vec![body]);

    let image = Attachment::from_data_url("data:image/png;base64,QUJD");
    let mut deltas = Vec::new();
    let mut sink = |d: &str| deltas.push(d.to_string());
    let reply = adapter(&transport)
        .converse(&[], "", &[image], &ollama_config(), Some(&mut sink))
        .await;

    assert_eq!(reply, "A fox");
    assert_eq!(deltas, vec!["A ", "fox"]);

    let request = &transport.requests()[0];
    assert_eq!(request.url, "http://localhost:11434/api/chat");
    let body = request.body.as_ref().unwrap();
    assert_eq!(body["think"], false);
    assert_eq!(body["messages"][1]["content"], "Describe this image");
    assert_eq!(body["messages"][1]["images"], json!(["QUJD"]));
}

#[tokio::test]
async fn ollama_falls_back_to_generate_on_404() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(404, vec!["404 page not found"]);
    transport.respond_with(200, vec![ndjson(&["Hello", " there"], Some(&[1, 2, 3]))]);
    let adapter = adapter(&transport);

    let mut sink = |_: &str| {};
    let reply = adapter
        .converse(&[], "hi", &[], &ollama_config(), Some(&mut sink))
        .await;

    assert_eq!(reply, "Hello there");
    assert!(!reply.contains("Error"));
    assert_eq!(adapter.context(), Some(ConversationContext(vec![1, 2, 3])));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "http://localhost:11434/api/chat");
    assert_eq!(requests[1].url, "http://localhost:11434/api/generate");
    let body = requests[1].body.as_ref().unwrap();
    assert_eq!(body["prompt"], "hi");
    assert_eq!(body["system"], "sys");
    assert!(body.get("context").is_none());
}

#[tokio::test]
async fn context_is_round_tripped_and_kept_when_reply_has_none() {
    let transport = Arc::new(FakeTransport::new());
    let adapter = ChatAdapter::with_context(
        transport.clone(),
        Some(ConversationContext(vec![1, 2, 3])),
    );

    transport.respond_with(404, Vec::<&'static str>::new());
    transport.respond_with(200, vec![ndjson(&["again"], None)]);

    let mut sink = |_: &str| {};
    let reply = adapter
        .converse(&[], "more", &[], &ollama_config(), Some(&mut sink))
        .await;
    assert_eq!(reply, "again");

    let body = transport.requests()[1].body.clone().unwrap();
    assert_eq!(body["context"], json!([1, 2, 3]));
    assert_eq!(adapter.context(), Some(ConversationContext(vec![1, 2, 3])));

    transport.respond_with(404, Vec::<&'static str>::new());
    transport.respond_with(200, vec![ndjson(&["new"], Some(&[9]))]);
    adapter
        .converse(&[], "once more", &[], &ollama_config(), Some(&mut sink))
        .await;
    assert_eq!(adapter.context(), Some(ConversationContext(vec![9])));

    adapter.clear_context();
    assert_eq!(adapter.context(), None);
}

#[tokio::test]
async fn ollama_non_stream_reads_single_object() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(
        200,
        vec![r#"{"model":"gemma3:4b","message":{"role":"assistant","content":"done"},"done":true}"#],
    );

    let reply = adapter(&transport)
        .converse(&[], "hi", &[], &ollama_config(), None)
        .await;
    assert_eq!(reply, "done");
    assert_eq!(transport.requests()[0].body.as_ref().unwrap()["stream"], false);
}

#[tokio::test]
async fn generic_endpoint_gets_flat_prompt() {
    let transport = Arc::new(FakeTransport::new());
    transport.respond_with(200, vec![r#"{"response":"plain"}"#]);
    let config = BackendConfig {
        endpoint: "http://localhost:5000/complete".to_string(),
        ..ollama_config()
    };

    let reply = adapter(&transport)
        .converse(&[], "a castle", &[], &config, None)
        .await;
    assert_eq!(reply, "plain");

    let request = &transport.requests()[0];
    assert_eq!(request.url, "http://localhost:5000/complete");
    assert_eq!(request.body.as_ref().unwrap()["prompt"], "sys\n\nUser: a castle");
}

#[tokio::test]
async fn empty_message_without_images_is_rejected_without_request() {
    let transport = Arc::new(FakeTransport::new());
    let reply = adapter(&transport)
        .converse(&[], "   ", &[], &ollama_config(), None)
        .await;
    assert!(reply.starts_with("Error: message is empty."));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn concurrent_ask_is_rejected() {
    let transport = Arc::new(FakeTransport::new());
    let (release, hold) = tokio::sync::oneshot::channel::<()>();
    let body = futures::stream::once(async move {
        let _ = hold.await;
        Ok::<Bytes, BackendError>(Bytes::from(sse(&["first"])))
    });
    transport.respond(HttpResponse::new(200, Box::pin(body)));

    let adapter = adapter(&transport);
    let config = openai_config();

    let mut sink = |_: &str| {};
    let first = adapter.converse(&[], "one", &[], &config, Some(&mut sink));
    let second = async {
        while !adapter.is_busy() {
            tokio::task::yield_now().await;
        }
        let reply = adapter.converse(&[], "two", &[], &config, None).await;
        let _ = release.send(());
        reply
    };

    let (first, second) = tokio::join!(first, second);
    assert_eq!(first, "first");
    assert_eq!(
        second,
        "Error: another request is already in progress. Please check your AI service configuration."
    );
    assert_eq!(transport.requests().len(), 1);
    assert!(!adapter.is_busy());
}
