//! Single-use envelope flows against a mocked service.

use mockito::Matcher;
use sealkit_core::{Client, ExposeSecret, SealKitError, SecretString};
use serde_json::json;

fn wrapped_token_payload() -> String {
    json!({
        "request_id": "r1",
        "auth": {
            "client_token": "s.newly-issued",
            "accessor": "acc-new",
            "policies": ["default"],
            "lease_duration": 3600,
            "renewable": true,
        },
    })
    .to_string()
}

#[tokio::test]
async fn test_unwrap_is_exactly_once() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("PUT", "/v1/sys/wrapping/unwrap")
        .match_body(Matcher::Json(json!({ "token": "wrap-1" })))
        .with_status(200)
        .with_body(wrapped_token_payload())
        .create_async()
        .await;

    let client = Client::new(&server.url(), "s.root");

    let secret = client.unwrap(Some("wrap-1")).await.unwrap();
    assert_eq!(secret.auth.unwrap().client_token, "s.newly-issued");

    // The service invalidated the envelope on first read.
    first.remove_async().await;
    server
        .mock("PUT", "/v1/sys/wrapping/unwrap")
        .match_body(Matcher::Json(json!({ "token": "wrap-1" })))
        .with_status(400)
        .with_body(json!({ "errors": ["wrapping token is not valid or does not exist"] }).to_string())
        .create_async()
        .await;

    let err = client.unwrap(Some("wrap-1")).await.unwrap_err();
    assert!(matches!(err, SealKitError::InvalidRequest { .. }));
}

#[tokio::test]
async fn test_revoked_accessor_blocks_unwrap() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/v1/auth/token/revoke-accessor")
        .match_body(Matcher::Json(json!({ "accessor": "acc-1" })))
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("PUT", "/v1/sys/wrapping/unwrap")
        .match_body(Matcher::Json(json!({ "token": "wrap-2" })))
        .with_status(403)
        .with_body(json!({ "errors": ["permission denied"] }).to_string())
        .create_async()
        .await;

    let client = Client::new(&server.url(), "s.root");

    // Revoke the envelope without ever reading it, then try to unwrap.
    client.revoke_accessor("acc-1").await.unwrap();
    let err = client.unwrap(Some("wrap-2")).await.unwrap_err();
    assert!(matches!(err, SealKitError::Forbidden { .. }));
}

#[tokio::test]
async fn test_self_unwrap_uses_ambient_credential() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/v1/sys/wrapping/unwrap")
        .match_header("x-vault-token", "wrap-3")
        .with_status(200)
        .with_body(wrapped_token_payload())
        .create_async()
        .await;

    let mut client = Client::new(&server.url(), "s.root");
    // The wrapping token becomes the ambient credential for a self-unwrap.
    client.set_token(SecretString::from("wrap-3".to_string()));

    let token = client.unwrap_token(None).await.unwrap();
    assert_eq!(token.expose_secret(), "s.newly-issued");

    // Adoption of the unwrapped credential is explicit, never implicit.
    client.set_token(token);
    server
        .mock("GET", "/v1/sys/seal-status")
        .match_header("x-vault-token", "s.newly-issued")
        .with_status(200)
        .with_body(json!({ "sealed": false, "t": 3, "n": 5, "progress": 0 }).to_string())
        .create_async()
        .await;
    let status = client.seal_status().await.unwrap();
    assert!(!status.sealed);
}

#[tokio::test]
async fn test_unwrap_token_rejects_non_credential_payload() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/v1/sys/wrapping/unwrap")
        .with_status(200)
        .with_body(json!({ "request_id": "r2", "data": { "zap": "zip" } }).to_string())
        .create_async()
        .await;

    let client = Client::new(&server.url(), "s.root");
    let err = client.unwrap_token(Some("wrap-4")).await.unwrap_err();
    assert!(matches!(err, SealKitError::Serialization { .. }));
}

#[tokio::test]
async fn test_wrapped_write_returns_envelope_descriptor() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/v1/auth/approle/role/deploy/secret-id")
        .match_header("x-vault-wrap-ttl", "60s")
        .with_status(200)
        .with_body(
            json!({
                "request_id": "r3",
                "wrap_info": {
                    "token": "wrap-5",
                    "ttl": 60,
                    "creation_path": "auth/approle/role/deploy/secret-id",
                    "wrapped_accessor": "acc-5",
                },
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = Client::new(&server.url(), "s.root");
    let info = client
        .wrapped_write("auth/approle/role/deploy/secret-id", json!({}), "60s")
        .await
        .unwrap();
    assert_eq!(info.token, "wrap-5");
    assert_eq!(info.ttl, 60);
    assert_eq!(info.wrapped_accessor.as_deref(), Some("acc-5"));
}
