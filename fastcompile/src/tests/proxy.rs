use axum::{http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

use crate::{Error, Executor, Job, ProxiedBackend, ReadyCheck};

/// Serve `/compile` on a free loopback port and return that port
async fn serve_backend(app: Router) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    port
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_forwards_job_body() {
    let app = Router::new().route(
        "/compile",
        post(|Json(body): Json<Value>| async move {
            Json(json!({
                "result": format!(
                    "{}:{}:{}.{}",
                    body["lang"].as_str().unwrap_or_default(),
                    body["code"].as_str().unwrap_or_default(),
                    body["className"].as_str().unwrap_or_default(),
                    body["methodName"].as_str().unwrap_or_default()
                ),
                "backendVersion": "test"
            }))
        }),
    );
    let port = serve_backend(app).await;

    let backend = ProxiedBackend::attach("Java", port, Some(Duration::from_secs(5))).unwrap();
    assert!(backend.wait_ready(3).await);

    let job = Job::new("JAVA", "src").with_entry("TestClass", "testMethod");
    assert_eq!(
        backend.execute(&job).await.unwrap(),
        "Java:src:TestClass.testMethod"
    );
}

#[tokio::test]
async fn test_backend_exception_is_failure() {
    let app = Router::new().route(
        "/compile",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "exceptionText": "NameError: x" })),
            )
        }),
    );
    let port = serve_backend(app).await;

    let backend = ProxiedBackend::attach("python", port, Some(Duration::from_secs(5))).unwrap();
    match backend.execute(&Job::new("python", "x")).await {
        Err(Error::BuildOrRuntimeFailure(text)) => assert_eq!(text, "NameError: x"),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend() {
    let port = free_port().await;
    let backend = ProxiedBackend::attach("java", port, Some(Duration::from_secs(5))).unwrap();

    assert!(!backend.wait_ready(1).await);
    assert!(matches!(
        backend.execute(&Job::new("java", "x")).await,
        Err(Error::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let app = Router::new().route(
        "/compile",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "result": "late" }))
        }),
    );
    let port = serve_backend(app).await;

    let backend = ProxiedBackend::attach("java", port, Some(Duration::from_secs(1))).unwrap();
    assert!(matches!(
        backend.execute(&Job::new("java", "x")).await,
        Err(Error::Timeout(1))
    ));
}

fn works_check() -> ReadyCheck {
    ReadyCheck {
        code: "class TestClass { String testMethod() { return \"Works!\"; } }".to_string(),
        class_name: "TestClass".to_string(),
        method_name: "testMethod".to_string(),
        expected: "Works!".to_string(),
    }
}

/// Backend that answers every job with `result`
async fn constant_backend(result: &'static str) -> u16 {
    serve_backend(Router::new().route(
        "/compile",
        post(move || async move { Json(json!({ "result": result })) }),
    ))
    .await
}

#[tokio::test]
async fn test_self_test_accepts_expected_answer() {
    let port = constant_backend("Works!\n").await;
    let backend = ProxiedBackend::attach("Java", port, Some(Duration::from_secs(5))).unwrap();
    tokio_test::assert_ok!(backend.self_test(&works_check()).await);
}

#[tokio::test]
async fn test_self_test_rejects_wrong_answer() {
    let port = constant_backend("Hello").await;
    let backend = ProxiedBackend::attach("Java", port, Some(Duration::from_secs(5))).unwrap();
    assert!(matches!(
        backend.self_test(&works_check()).await,
        Err(Error::BackendUnavailable(_))
    ));
}

#[tokio::test]
async fn test_start_runs_ready_check() {
    // `cat` stands in for the backend process; the listener answers for it
    let good = constant_backend("Works!").await;
    let backend = ProxiedBackend::start(
        "Java",
        &["cat".to_string()],
        &std::env::temp_dir(),
        good,
        Some(Duration::from_secs(5)),
        3,
        Some(&works_check()),
    )
    .await
    .unwrap();
    backend.shutdown().await;

    let broken = constant_backend("Exception in thread main").await;
    let result = ProxiedBackend::start(
        "Java",
        &["cat".to_string()],
        &std::env::temp_dir(),
        broken,
        Some(Duration::from_secs(5)),
        3,
        Some(&works_check()),
    )
    .await;
    assert!(matches!(result, Err(Error::BackendUnavailable(_))));
}
