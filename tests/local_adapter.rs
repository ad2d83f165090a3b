mod common;

use axum::http::StatusCode;
use chatai::{
    ApiShape, ChatBackend, ChatClient, ChatError, ChatEvent, LocalChatAdapter, RequestOptions,
};
use common::{
    assert_cumulative, assert_single_terminal, chunked, json, mock_server, test_timeouts,
    unreachable_base,
};
use futures::StreamExt;
use std::sync::Arc;

fn client(base: &str) -> ChatClient {
    ChatClient::new(Arc::new(LocalChatAdapter::new(base, "phi", test_timeouts())))
}

fn options(streaming: bool, shape: ApiShape) -> RequestOptions {
    RequestOptions::streaming()
        .with_streaming(streaming)
        .with_api_shape(shape)
}

async fn events(client: &ChatClient, message: &str, options: RequestOptions) -> Vec<ChatEvent> {
    client
        .send_message_with(message, options)
        .collect::<Vec<_>>()
        .await
}

#[tokio::test]
async fn streamed_completion_emits_running_text_then_response() {
    let (base, seen) = mock_server(|_, _| {
        chunked(&[
            "{\"response\":\"Hi\",\"done\":false}\n",
            "{\"response\":\" there\",\"done\":true}\n",
            "{\"response\":\"ignored\",\"done\":false}\n",
        ])
    })
    .await;

    let got = events(&client(&base), "hello", options(true, ApiShape::Completion)).await;
    assert_eq!(
        got,
        vec![
            ChatEvent::Partial("Hi".to_string()),
            ChatEvent::Partial("Hi there".to_string()),
            ChatEvent::Response("Hi there".to_string()),
        ]
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "/api/generate");
    let body: serde_json::Value = serde_json::from_str(&seen[0].1).unwrap();
    assert_eq!(body["model"], "phi");
    assert_eq!(body["prompt"], "hello");
    assert_eq!(body["stream"], true);
}

#[tokio::test]
async fn chat_shape_sends_messages_and_reads_message_content() {
    let (base, seen) = mock_server(|_, _| {
        chunked(&[
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        ])
    })
    .await;

    let got = events(&client(&base), "hi", options(true, ApiShape::Chat)).await;
    assert_cumulative(&got);
    assert_eq!(
        assert_single_terminal(&got),
        &ChatEvent::Response("Hello".to_string())
    );
    // The empty closing fragment adds no partial.
    assert_eq!(got.len(), 3);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].0, "/api/chat");
    let body: serde_json::Value = serde_json::from_str(&seen[0].1).unwrap();
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hi");
    assert_eq!(body["stream"], true);
}

#[tokio::test]
async fn lines_split_across_reads_are_reassembled() {
    let (base, _) = mock_server(|_, _| {
        chunked(&[
            "{\"respon",
            "se\":\"caf\u{e9}\",\"do",
            "ne\":false}\n{\"response\":\"!\",",
            "\"done\":true}\n",
        ])
    })
    .await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert_eq!(
        got,
        vec![
            ChatEvent::Partial("caf\u{e9}".to_string()),
            ChatEvent::Partial("caf\u{e9}!".to_string()),
            ChatEvent::Response("caf\u{e9}!".to_string()),
        ]
    );
}

#[tokio::test]
async fn blank_and_malformed_lines_are_skipped() {
    let (base, _) = mock_server(|_, _| {
        chunked(&[
            "\n",
            "not json at all\n",
            "{\"response\":\"ok\",\"done\":false}\n",
            "   \n",
            "{\"done\":true}\n",
        ])
    })
    .await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert_eq!(
        got,
        vec![
            ChatEvent::Partial("ok".to_string()),
            ChatEvent::Response("ok".to_string()),
        ]
    );
}

#[tokio::test]
async fn stream_without_done_marker_completes_with_accumulated_text() {
    let (base, _) = mock_server(|_, _| chunked(&["{\"response\":\"partial answer\"}"])).await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert_eq!(
        assert_single_terminal(&got),
        &ChatEvent::Response("partial answer".to_string())
    );
}

#[tokio::test]
async fn done_without_text_yields_empty_response() {
    let (base, _) = mock_server(|_, _| chunked(&["{\"response\":\"\",\"done\":true}\n"])).await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert_eq!(got, vec![ChatEvent::Response(String::new())]);
}

#[tokio::test]
async fn stream_with_no_text_and_no_marker_is_empty_result() {
    let (base, _) = mock_server(|_, _| chunked(&["\n", "\n"])).await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert!(matches!(
        assert_single_terminal(&got),
        ChatEvent::Error(ChatError::EmptyResult(_))
    ));
}

#[tokio::test]
async fn error_line_ends_the_stream() {
    let (base, _) = mock_server(|_, _| {
        chunked(&[
            "{\"response\":\"par\",\"done\":false}\n",
            "{\"error\":\"model crashed\"}\n",
            "{\"response\":\"never\",\"done\":true}\n",
        ])
    })
    .await;

    let got = events(&client(&base), "x", options(true, ApiShape::Completion)).await;
    assert_eq!(
        got,
        vec![
            ChatEvent::Partial("par".to_string()),
            ChatEvent::Error(ChatError::Backend("model crashed".to_string())),
        ]
    );
}

#[tokio::test]
async fn single_shot_completion_and_chat_bodies() {
    let (base, _) = mock_server(|path, _| match path {
        "/api/generate" => json(StatusCode::OK, r#"{"response":"from generate","done":true}"#),
        _ => json(
            StatusCode::OK,
            r#"{"message":{"role":"assistant","content":"from chat"},"done":true}"#,
        ),
    })
    .await;
    let client = client(&base);

    let got = events(&client, "x", options(false, ApiShape::Completion)).await;
    assert_eq!(got, vec![ChatEvent::Response("from generate".to_string())]);

    let got = events(&client, "x", options(false, ApiShape::Chat)).await;
    assert_eq!(got, vec![ChatEvent::Response("from chat".to_string())]);
}

#[tokio::test]
async fn single_shot_empty_bodies_are_empty_results() {
    let (base, _) = mock_server(|path, _| match path {
        "/api/generate" => json(StatusCode::OK, ""),
        _ => json(StatusCode::OK, r#"{"message":{"content":""},"done":true}"#),
    })
    .await;
    let client = client(&base);

    let got = events(&client, "x", options(false, ApiShape::Completion)).await;
    assert_eq!(
        got,
        vec![ChatEvent::Error(ChatError::EmptyResult("empty response".to_string()))]
    );

    let got = events(&client, "x", options(false, ApiShape::Chat)).await;
    assert!(matches!(
        got.as_slice(),
        [ChatEvent::Error(ChatError::EmptyResult(_))]
    ));
}

#[tokio::test]
async fn http_error_carries_status_and_server_message() {
    let (base, _) = mock_server(|_, _| {
        json(StatusCode::NOT_FOUND, r#"{"error":"model 'phi' not found"}"#)
    })
    .await;

    let got = events(&client(&base), "x", options(true, ApiShape::Chat)).await;
    match assert_single_terminal(&got) {
        ChatEvent::Error(err) => {
            assert_eq!(err.status(), Some(404));
            assert!(err.to_string().contains("model 'phi' not found"));
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(got.len(), 1);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let base = unreachable_base().await;
    let got = events(&client(&base), "x", options(true, ApiShape::Chat)).await;
    match got.as_slice() {
        [ChatEvent::Error(err)] => assert!(err.is_network(), "{:?}", err),
        other => panic!("expected one network error, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_sends_stay_independent() {
    let (base, _) = mock_server(|_, body| {
        let request: serde_json::Value = serde_json::from_str(body).unwrap();
        let prompt = request["messages"][0]["content"].as_str().unwrap().to_string();
        let first = serde_json::json!({"message": {"content": prompt}, "done": false});
        let second = serde_json::json!({"message": {"content": "!"}, "done": true});
        let lines = [format!("{first}\n"), format!("{second}\n")];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        chunked(&refs)
    })
    .await;
    let client = client(&base);

    let sends = (0..5).map(|i| {
        let client = client.clone();
        async move {
            let prompt = format!("prompt-{i}");
            let got = events(&client, &prompt, options(true, ApiShape::Chat)).await;
            (prompt, got)
        }
    });

    for (prompt, got) in futures::future::join_all(sends).await {
        assert_cumulative(&got);
        assert_eq!(
            assert_single_terminal(&got),
            &ChatEvent::Response(format!("{prompt}!"))
        );
    }
}

#[tokio::test]
async fn final_text_resolves_to_full_reply() {
    let (base, _) = mock_server(|_, _| {
        chunked(&[
            "{\"response\":\"a\"}\n",
            "{\"response\":\"b\"}\n",
            "{\"done\":true}\n",
        ])
    })
    .await;

    let text = client(&base)
        .send_message_with("x", options(true, ApiShape::Completion))
        .final_text()
        .await
        .unwrap();
    assert_eq!(text, "ab");
}

#[tokio::test]
async fn connection_check_reports_version_or_reason() {
    let (base, _) = mock_server(|path, _| match path {
        "/api/version" => json(StatusCode::OK, r#"{"version":"0.1.32"}"#),
        _ => json(StatusCode::NOT_FOUND, "{}"),
    })
    .await;
    let status = client(&base).check_connection().await;
    assert!(status.connected);
    assert_eq!(status.message, "Connected to Ollama 0.1.32");

    let (base, _) = mock_server(|_, _| json(StatusCode::INTERNAL_SERVER_ERROR, "boom")).await;
    let status = client(&base).check_connection().await;
    assert!(!status.connected);
    assert!(status.message.starts_with("Ollama server error:"), "{}", status.message);

    let status = client(&unreachable_base().await).check_connection().await;
    assert!(!status.connected);
    assert!(status.message.starts_with("Cannot connect to Ollama:"), "{}", status.message);
}

#[tokio::test]
async fn models_come_from_tags_and_fail_soft() {
    let (base, _) = mock_server(|_, _| {
        json(
            StatusCode::OK,
            r#"{"models":[
                {"name":"phi:latest","details":{"family":"phi2","parameter_size":"3B","quantization_level":"Q4_0"}},
                {"name":"llama3:8b"}
            ]}"#,
        )
    })
    .await;
    let adapter = LocalChatAdapter::new(&base, "phi", test_timeouts());
    assert_eq!(adapter.list_models().await, vec!["phi:latest", "llama3:8b"]);

    let info = adapter.model_info().await;
    assert!(info.contains("phi:latest"), "{}", info);
    assert!(info.contains(&format!("Server: {base}")), "{}", info);

    let offline = LocalChatAdapter::new(unreachable_base().await, "phi", test_timeouts());
    assert!(offline.list_models().await.is_empty());
    assert!(offline.model_info().await.contains("phi"));
}

#[tokio::test]
async fn usage_note_names_the_server() {
    let adapter = LocalChatAdapter::new("http://localhost:11434/", "phi", test_timeouts());
    assert_eq!(
        adapter.usage_note(),
        "Ollama runs on http://localhost:11434; requests are not metered."
    );
}
