use reqwest::StatusCode;

use wiremock::matchers::*;
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{checkout_completed, event, TestApp};

#[tokio::test]
async fn checkout_with_email_creates_active_record() {
    let app = TestApp::spawn().await;

    let res = app
        .signed_webhook(checkout_completed(Some("a@x.com"), Some("cus_123")))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!("Received", res.text().await.unwrap());

    let record = app.store.get("a@x.com").expect("No record stored");
    assert!(record.is_active);
    assert_eq!(record.customer_id.as_deref(), Some("cus_123"));
    assert_eq!(
        record.subscription_id.as_deref(),
        Some("sub_1MowQVLkdIwHu7ixeRlqHVzs")
    );
}

#[tokio::test]
async fn checkout_without_email_resolves_customer() {
    let app = TestApp::spawn().await;

    Mock::given(method("GET"))
        .and(path("/v1/customers/cus_123"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cus_123",
            "object": "customer",
            "email": "b@y.com"
        })))
        .expect(1)
        .mount(&app.stripe_server)
        .await;

    let res = app
        .signed_webhook(checkout_completed(None, Some("cus_123")))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());

    let record = app.store.get("b@y.com").expect("No record stored");
    assert_eq!(record.user_email.as_ref(), "b@y.com");
}

#[tokio::test]
async fn checkout_with_email_skips_customer_lookup() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.stripe_server)
        .await;

    let res = app
        .signed_webhook(checkout_completed(Some("a@x.com"), Some("cus_123")))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn checkout_without_resolvable_email_is_bad_request() {
    let app = TestApp::spawn().await;

    Mock::given(path("/v1/customers/cus_gone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cus_gone",
            "object": "customer",
            "deleted": true
        })))
        .mount(&app.stripe_server)
        .await;

    let test_cases = vec![
        ("no email and no customer", checkout_completed(None, None)),
        (
            "no email and a deleted customer",
            checkout_completed(None, Some("cus_gone")),
        ),
        (
            "no email and an empty customer id",
            checkout_completed(None, Some("")),
        ),
    ];

    for (desc, payload) in test_cases {
        let res = app
            .signed_webhook(payload)
            .await
            .expect("Failed to execute request");

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not reject a checkout with {}",
            desc
        );
        assert_eq!("Missing email.", res.text().await.unwrap());
    }

    assert_eq!(0, app.store.writes());
}

#[tokio::test]
async fn customer_lookup_failure_is_server_error() {
    let app = TestApp::spawn().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.stripe_server)
        .await;

    let res = app
        .signed_webhook(checkout_completed(None, Some("cus_123")))
        .await
        .expect("Failed to execute request");

    assert!(res.status().is_server_error());
    assert_eq!(0, app.store.writes());
}

#[tokio::test]
async fn invalid_signatures_are_rejected() {
    let app = TestApp::spawn().await;

    let payload = checkout_completed(Some("a@x.com"), None);
    let valid = app.sign(&payload);

    let mut tampered = payload.clone();
    let last = tampered.len() - 2;
    tampered[last] ^= 0x01;

    let test_cases: Vec<(&str, Vec<u8>, Option<String>)> = vec![
        ("missing signature", payload.clone(), None),
        ("garbage signature", payload.clone(), Some("garbage".into())),
        (
            "signature over different bytes",
            payload.clone(),
            Some(app.sign(b"{}")),
        ),
        ("tampered payload", tampered, Some(valid.clone())),
    ];

    for (desc, payload, signature) in test_cases {
        let res = app
            .webhook(payload, signature.as_deref())
            .await
            .expect("Failed to execute request");

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not reject a delivery with {}",
            desc
        );
        assert!(res.text().await.unwrap().starts_with("Webhook Error:"));
    }

    assert_eq!(0, app.store.writes());
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_without_writing() {
    let app = TestApp::spawn().await;

    let payload = event(
        "customer.subscription.deleted",
        serde_json::json!({ "id": "sub_123", "customer": "cus_123" }),
    );

    let res = app
        .signed_webhook(payload)
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(0, app.store.writes());
}

#[tokio::test]
async fn redelivered_checkout_keeps_one_record() {
    let app = TestApp::spawn().await;
    let payload = checkout_completed(Some("a@x.com"), Some("cus_123"));

    let res = app.signed_webhook(payload.clone()).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let first = app.store.get("a@x.com").unwrap();

    let res = app.signed_webhook(payload).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let second = app.store.get("a@x.com").unwrap();

    assert_eq!(1, app.store.len());
    assert_eq!(2, app.store.writes());
    assert!(second.activated_at >= first.activated_at);
}
