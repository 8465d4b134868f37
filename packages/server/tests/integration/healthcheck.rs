use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn reports_availability_and_environment() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::HEALTHCHECK).await;

    assert_eq!(res.status, 200);
    assert_eq!(
        res.body,
        json!({
            "status": "available",
            "system_info": {
                "environment": "testing",
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    );
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::spawn().await;

    let res = app.get("/api-docs/openapi.json").await;

    assert_eq!(res.status, 200);
    assert!(res.body["paths"]["/v1/grenades/{id}"].is_object());
}
