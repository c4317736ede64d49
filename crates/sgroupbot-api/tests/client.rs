use mockito::Matcher;
use serde_json::json;
use sgroupbot_api::{ApiClient, ApiError, MessageRequest, ReplyOutcome, ReplySender, ReplyTarget};
use sgroupbot_gateway::{GatewayError, GatewayResolver};
use std::time::Duration;

fn client(server: &mockito::Server) -> ApiClient {
    ApiClient::new(&server.url(), 1024, "secret", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_group_reply_is_delivered() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/groups/group-1/messages")
        .match_header("authorization", "Bot 1024.secret")
        .match_body(Matcher::Json(json!({
            "content": "成语接龙开始了哦，想想这个成语怎么接，一心一意",
            "msg_type": 0,
            "msg_id": "msg-1"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"reply-1","timestamp":"2024-01-01T00:00:00+08:00"}"#)
        .create_async()
        .await;

    let outcome = client(&server)
        .send_reply(
            &ReplyTarget::Group("group-1".to_string()),
            "成语接龙开始了哦，想想这个成语怎么接，一心一意",
            Some("msg-1"),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ReplyOutcome::Delivered {
            id: Some("reply-1".to_string())
        }
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_audit_pending_is_not_an_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/channels/channel-1/messages")
        .with_status(202)
        .with_body(
            r#"{"code":304023,"message":"push message is waiting for audit now","data":{"message_audit":{"audit_id":"audit-9"}}}"#,
        )
        .create_async()
        .await;

    let outcome = client(&server)
        .send_message(&ReplyTarget::Channel("channel-1".to_string()), &MessageRequest::text("你答对了"))
        .await
        .unwrap();

    assert_eq!(outcome, ReplyOutcome::AuditPending("audit-9".to_string()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_code_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v2/users/user-1/messages")
        .with_status(400)
        .with_body(r#"{"code":40034024,"message":"msg_id invalid"}"#)
        .create_async()
        .await;

    let err = client(&server)
        .send_message(&ReplyTarget::User("user-1".to_string()), &MessageRequest::text("hi").reply_to("bad"))
        .await
        .unwrap_err();

    match err {
        ApiError::Api { code, message } => {
            assert_eq!(code, 40034024);
            assert_eq!(message, "msg_id invalid");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_failure_keeps_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/dms/guild-1/messages")
        .with_status(502)
        .with_body("bad gateway")
        .create_async()
        .await;

    let err = client(&server)
        .send_message(&ReplyTarget::DirectMessage("guild-1".to_string()), &MessageRequest::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Api { code: 502, .. }));
}

#[tokio::test]
async fn test_resolves_gateway_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/gateway")
        .match_header("authorization", "Bot 1024.secret")
        .with_status(200)
        .with_body(r#"{"url":"wss://api.sgroup.qq.com/websocket"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server);
    let info = client.gateway().await.unwrap();
    assert_eq!(info.url, "wss://api.sgroup.qq.com/websocket");
    assert_eq!(client.resolve().await.unwrap(), info.url);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_gateway_failure_maps_to_resolve_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gateway")
        .with_status(401)
        .with_body(r#"{"code":11241,"message":"invalid token"}"#)
        .create_async()
        .await;

    let err = client(&server).resolve().await.unwrap_err();
    assert!(matches!(err, GatewayError::Resolve(message) if message.contains("invalid token")));
}

#[test]
fn test_rejects_invalid_base_url() {
    let err = ApiClient::new("not a url", 1, "t", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, ApiError::InvalidUrl(_)));
}
