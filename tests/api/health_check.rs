use crate::helpers::TestApp;

#[tokio::test]
async fn index_reports_liveness() {
    let app = TestApp::spawn().await;

    let res = app.index().await.expect("Failed to execute request");

    assert!(res.status().is_success());
    assert_eq!("Stripe webhook is live.", res.text().await.unwrap());
}

#[tokio::test]
async fn health_check_is_present() {
    let app = TestApp::spawn().await;

    let res = app.health_check().await.expect("Failed to execute request");

    assert!(res.status().is_success());
    assert_eq!(Some(0), res.content_length());
}
