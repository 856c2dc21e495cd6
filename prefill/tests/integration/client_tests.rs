use prefill::api::{
    AssertionService, HttpAssertionClient, HttpPlatformClient, PlatformApi, build_http_client,
};
use prefill_common::{CatalogEntry, ErrorKind, RemoteCall, SubmissionDefaults};

use super::common::{FakePlatformServer, init_test_logging};

fn clients(server: &FakePlatformServer) -> (HttpAssertionClient, HttpPlatformClient) {
    let client = build_http_client().unwrap();
    (
        HttpAssertionClient::new(client.clone(), server.url()),
        HttpPlatformClient::new(client, server.url()),
    )
}

#[tokio::test]
async fn test_assertion_then_login_yields_session() {
    init_test_logging();
    crate::test_log!("TEST START: test_assertion_then_login_yields_session");

    let server = FakePlatformServer::start().await;
    let (assertions, platform) = clients(&server);

    let assertion = assertions.issue_assertion("test0@test.com").await.unwrap();
    assert_eq!(assertion, "ssa.test0@test.com");

    let session = platform.login(&assertion, "http://aud").await.unwrap();
    assert_eq!(session.token, "tok.1");
    assert_eq!(session.public.id, "1");
    assert_eq!(session.public.username, "test0");
    server.with_state(|s| assert_eq!(s.login_audiences, vec!["http://aud".to_string()]));

    crate::test_log!("TEST PASS: test_assertion_then_login_yields_session");
}

#[tokio::test]
async fn test_login_error_field_is_application_error() {
    init_test_logging();
    let server = FakePlatformServer::start().await;
    server.reject_login("test3@test.com");
    let (_, platform) = clients(&server);

    let err = platform.login("ssa.test3@test.com", "aud").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    assert_eq!(err.code(), Some("verification_failed"));
    assert_eq!(err.call(), Some(RemoteCall::Login));
}

#[tokio::test]
async fn test_repeated_friend_request_is_benign_conflict() {
    init_test_logging();
    crate::test_log!("TEST START: test_repeated_friend_request_is_benign_conflict");

    let server = FakePlatformServer::start().await;
    let (_, platform) = clients(&server);
    let a = platform.login("ssa.a@test.com", "aud").await.unwrap();
    let b = platform.login("ssa.b@test.com", "aud").await.unwrap();

    platform.send_friend_request(&a.token, &b.public.id).await.unwrap();

    let err = platform
        .send_friend_request(&b.token, &a.public.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("already_requested"));
    assert!(err.is_benign_friend_conflict());

    platform
        .accept_friend_request(&b.token, &a.public.id)
        .await
        .unwrap();
    let err = platform
        .send_friend_request(&a.token, &b.public.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some("already_friends"));
    assert!(err.is_benign_friend_conflict());

    crate::test_log!("TEST PASS: test_repeated_friend_request_is_benign_conflict");
}

#[tokio::test]
async fn test_accept_without_request_fails() {
    init_test_logging();
    let server = FakePlatformServer::start().await;
    let (_, platform) = clients(&server);
    let a = platform.login("ssa.a@test.com", "aud").await.unwrap();
    let b = platform.login("ssa.b@test.com", "aud").await.unwrap();

    let err = platform
        .accept_friend_request(&a.token, &b.public.id)
        .await
        .unwrap_err();
    assert_eq!(err.call(), Some(RemoteCall::FriendAccept));
    assert_eq!(err.code(), Some("no_such_request"));
    assert!(!err.is_benign_friend_conflict());
}

#[tokio::test]
async fn test_submit_purchase_and_detail() {
    init_test_logging();
    let server = FakePlatformServer::start().await;
    let (_, platform) = clients(&server);
    let buyer = platform.login("ssa.buyer@test.com", "aud").await.unwrap();

    let submission = CatalogEntry::new("Halo 718", "http://halo.com")
        .with_icons("64")
        .merge_defaults(&SubmissionDefaults::default());
    let slug = platform.submit_game(&submission).await.unwrap();
    assert_eq!(slug, "halo-718");

    let body = platform.purchase(&buyer.token, &slug).await.unwrap();
    assert!(body.contains("success"));
    server.with_state(|s| assert_eq!(s.purchases, vec![(1, "halo-718".to_string())]));

    let detail = platform.game_detail(&slug).await.unwrap();
    assert_eq!(detail["icons"], "64");
    assert_eq!(detail["screenshots"], "yes");

    let err = platform.game_detail("missing").await.unwrap_err();
    assert_eq!(err.code(), Some("bad_game"));
}

#[tokio::test]
async fn test_purchase_body_is_not_inspected() {
    init_test_logging();
    let server = FakePlatformServer::start().await;
    let (_, platform) = clients(&server);

    // The platform answers with an error field, which purchase passes through.
    let body = platform.purchase("tok.nobody", "nothing").await.unwrap();
    assert!(body.contains("bad_user"));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_connection_error() {
    init_test_logging();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let assertions = HttpAssertionClient::new(build_http_client().unwrap(), url);
    let err = assertions.issue_assertion("test0@test.com").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.call(), Some(RemoteCall::IssueAssertion));
}
