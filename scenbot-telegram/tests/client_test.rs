//! TelegramClient tests against a local mock of the Bot API.

use mockito::Matcher;
use scenbot_core::BotError;
use scenbot_telegram::{GetUpdates, SendMessage, TelegramClient};

#[tokio::test]
async fn test_send_message_posts_json_and_decodes_result() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bottest-token/sendMessage")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(
            serde_json::json!({"chat_id": 42, "text": "hello"}),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"ok":true,"result":{"message_id":7,"chat":{"id":42},"date":0,"text":"hello"}}"#,
        )
        .create_async()
        .await;

    let client = TelegramClient::with_base_url("test-token", server.url());
    let message = client.execute(SendMessage::new(42, "hello")).await.unwrap();

    assert_eq!(message.message_id, 7);
    assert_eq!(message.chat.id, 42);
    assert_eq!(message.text(), Some("hello"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_get_updates_decodes_batch() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bottest-token/getUpdates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"ok":true,"result":[
                {"update_id":5,"message":{"message_id":1,"chat":{"id":1},"date":0,"text":"a"}},
                {"update_id":6,"poll":{"id":"p","question":"?"}}
            ]}"#,
        )
        .create_async()
        .await;

    let client = TelegramClient::with_base_url("test-token", server.url());
    let updates = client
        .execute(GetUpdates::new().offset(0).timeout(1).limit(100))
        .await
        .unwrap();

    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].update_id(), 5);
    assert_eq!(updates[1].update_id(), 6);
}

#[tokio::test]
async fn test_failed_method_surfaces_api_diagnostics() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bottest-token/sendMessage")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#)
        .create_async()
        .await;

    let client = TelegramClient::with_base_url("test-token", server.url());
    let err = client
        .execute(SendMessage::new(999, "hello"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BotError::Api {
            method: "sendMessage".to_string(),
            code: Some(400),
            description: "Bad Request: chat not found".to_string(),
        }
    );
}

#[tokio::test]
async fn test_unparseable_body_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/bottest-token/getMe")
        .with_status(200)
        .with_body("<html>gateway error</html>")
        .create_async()
        .await;

    let client = TelegramClient::with_base_url("test-token", server.url());
    let err = client.execute(scenbot_telegram::GetMe {}).await.unwrap_err();

    assert!(matches!(err, BotError::Decode(_)));
}

#[tokio::test]
async fn test_transport_errors_never_leak_the_token() {
    let token = "123456789:AAH-abcdefghijklmnop";
    // Nothing listens here; the request fails at the transport level with
    // the URL (token included) in the reqwest error text.
    let client = TelegramClient::with_base_url(token, "http://127.0.0.1:9");
    let err = client.execute(SendMessage::new(1, "x")).await.unwrap_err();

    match err {
        BotError::Transport(text) => {
            assert!(!text.contains(token), "token leaked into: {}", text);
        }
        other => panic!("expected transport error, got {:?}", other),
    }
}
