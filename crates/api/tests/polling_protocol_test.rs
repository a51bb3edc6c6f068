use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use proxy_api::{create_app, ApiOptions, AppState};
use proxy_core::{CallOutcome, CdsRequest, ServiceDefinition, ServiceInvoker};
use proxy_dispatcher::{BatchRegistry, HookProxy, ProxyOptions};
use proxy_infrastructure::StaticServiceCatalog;
use proxy_worker::DispatchExecutor;
use serde_json::Value;
use tower::ServiceExt;

/// 按服务ID预设延迟和结果的调用器
struct ScriptedInvoker {
    script: HashMap<String, (Duration, CallOutcome)>,
}

impl ScriptedInvoker {
    fn new(entries: &[(&str, u64, CallOutcome)]) -> Self {
        Self {
            script: entries
                .iter()
                .map(|(id, delay_ms, outcome)| {
                    (
                        id.to_string(),
                        (Duration::from_millis(*delay_ms), outcome.clone()),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ServiceInvoker for ScriptedInvoker {
    async fn invoke(&self, service: &ServiceDefinition, request: &CdsRequest) -> CallOutcome {
        let Some((delay, outcome)) = self.script.get(&service.id).cloned() else {
            return CallOutcome::failed("unknown service");
        };
        tokio::time::sleep(delay).await;
        match outcome {
            CallOutcome::Response { status, body } if body == "ECHO" => CallOutcome::response(
                status,
                serde_json::to_string(request).unwrap(),
            ),
            other => other,
        }
    }
}

struct TestApp {
    router: Router,
    proxy: Arc<HookProxy>,
    executor: Arc<DispatchExecutor>,
}

impl TestApp {
    fn new(services: Vec<ServiceDefinition>, invoker: ScriptedInvoker) -> Self {
        Self::with_state(services, invoker, None, None)
    }

    fn with_state(
        services: Vec<ServiceDefinition>,
        invoker: ScriptedInvoker,
        metrics: Option<metrics_exporter_prometheus::PrometheusHandle>,
        static_dir: Option<std::path::PathBuf>,
    ) -> Self {
        let executor = Arc::new(DispatchExecutor::start(Arc::new(invoker), 4, 64).unwrap());
        let proxy = Arc::new(HookProxy::new(
            Arc::new(BatchRegistry::new()),
            Arc::new(StaticServiceCatalog::new(services)),
            executor.clone(),
            ProxyOptions::default(),
        ));
        let state = AppState {
            proxy: Arc::clone(&proxy),
            metrics,
            static_dir,
        };
        Self {
            router: create_app(state, &ApiOptions::default()),
            proxy,
            executor,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn forward(&self, form: &str) -> Response {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/forward")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
    }

    /// 轮询直到返回非 `{}` 的结果
    async fn poll_next(&self, batch_id: &str) -> Response {
        for _ in 0..400 {
            let response = self.get(&format!("/next/{batch_id}")).await;
            if response.status() != StatusCode::OK {
                return response;
            }
            let (parts, body) = response.into_parts();
            let bytes = to_bytes(body, usize::MAX).await.unwrap();
            if bytes.as_ref() != b"{}" {
                return Response::from_parts(parts, Body::from(bytes));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("batch {batch_id} never became ready");
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn patient_view(ids: &[&str]) -> Vec<ServiceDefinition> {
    ids.iter()
        .map(|id| ServiceDefinition::new(*id, "patient-view"))
        .collect()
}

#[tokio::test]
async fn test_forward_without_hook_is_rejected() {
    let app = TestApp::new(patient_view(&["greeting"]), ScriptedInvoker::new(&[]));

    let response = app.forward("patientId=1288992&userId=Practitioner%2F7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "MISSING_HOOK");
    assert_eq!(app.proxy.live_batches(), 0);
}

#[tokio::test]
async fn test_forward_requires_form_body() {
    let app = TestApp::new(patient_view(&["greeting"]), ScriptedInvoker::new(&[]));
    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/forward")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"hook":"patient-view"}"#))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_next_for_unknown_batch() {
    let app = TestApp::new(Vec::new(), ScriptedInvoker::new(&[]));
    assert_eq!(app.get("/next/never-submitted").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        app.get("/response/never-submitted/some-instance").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_forward_with_no_services_returns_empty() {
    let app = TestApp::new(
        vec![ServiceDefinition::new("dosing", "order-select")],
        ScriptedInvoker::new(&[]),
    );
    let response = app.forward("hook=patient-view&patientId=42").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
    assert_eq!(app.proxy.live_batches(), 0);
}

#[tokio::test]
async fn test_three_services_with_one_timeout() {
    let app = TestApp::new(
        patient_view(&["greeting", "reminders", "slow"]),
        ScriptedInvoker::new(&[
            ("greeting", 5, CallOutcome::response(200, "ECHO")),
            ("reminders", 10, CallOutcome::response(200, r#"{"cards":[]}"#)),
            ("slow", 40, CallOutcome::failed("operation timed out")),
        ]),
    );

    let response = app
        .forward("hook=patient-view&patientId=1288992&fhir_endpoint=https%3A%2F%2Ffhir.example.org%2Fr4&mode=demo")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let batch_id = body_text(response).await;
    assert!(!batch_id.is_empty());

    let mut services = Vec::new();
    for _ in 0..2 {
        let response = app.poll_next(&batch_id).await;
        assert_eq!(response.status(), StatusCode::OK);
        let handle = body_json(response).await;
        let hook_id = handle["hookId"].as_str().unwrap().to_string();
        let hook_instance = handle["hookInstance"].as_str().unwrap().to_string();

        let uri = format!("/response/{batch_id}/{hook_instance}");
        let response = app.get(&uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        if hook_id == "greeting" {
            assert_eq!(body["hook"], "patient-view");
            assert_eq!(body["hookInstance"], hook_instance.as_str());
            assert_eq!(body["fhirServer"], "https://fhir.example.org/r4");
            assert_eq!(body["context"]["patientId"], "1288992");
            assert!(body["context"].get("mode").is_none());
        }
        // 同一响应只能取一次
        assert_eq!(app.get(&uri).await.status(), StatusCode::NOT_FOUND);
        services.push(hook_id);
    }
    services.sort();
    assert_eq!(services, vec!["greeting", "reminders"]);

    let response = app.poll_next(&batch_id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.get(&format!("/next/{batch_id}")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.proxy.live_batches(), 0);

    app.executor.shutdown().await;
}

#[tokio::test]
async fn test_failing_backend_does_not_affect_others() {
    let app = TestApp::new(
        patient_view(&["broken", "healthy"]),
        ScriptedInvoker::new(&[
            ("broken", 1, CallOutcome::response(500, "Internal Server Error")),
            ("healthy", 10, CallOutcome::response(200, r#"{"cards":[{"summary":"ok"}]}"#)),
        ]),
    );
    let batch_id = body_text(app.forward("hook=patient-view").await).await;

    let handle = body_json(app.poll_next(&batch_id).await).await;
    assert_eq!(handle["hookId"], "healthy");
    let body = body_json(
        app.get(&format!("/response/{batch_id}/{}", handle["hookInstance"].as_str().unwrap()))
            .await,
    )
    .await;
    assert_eq!(body["cards"][0]["summary"], "ok");

    assert_eq!(app.poll_next(&batch_id).await.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_abort_batch() {
    let app = TestApp::new(
        patient_view(&["slow"]),
        ScriptedInvoker::new(&[("slow", 200, CallOutcome::response(200, "{}"))]),
    );
    let batch_id = body_text(app.forward("hook=patient-view&handle=client-batch-1").await).await;
    assert_eq!(batch_id, "client-batch-1");

    assert_eq!(app.get("/abort/client-batch-1").await.status(), StatusCode::OK);
    assert_eq!(app.get("/abort/client-batch-1").await.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(app.get("/next/client-batch-1").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/abort/unknown").await.status(), StatusCode::NOT_MODIFIED);

    // 中止后迟到的结果被丢弃
    app.executor.shutdown().await;
    assert_eq!(app.proxy.live_batches(), 0);
}

#[tokio::test]
async fn test_duplicate_handle_conflicts() {
    let app = TestApp::new(
        patient_view(&["slow"]),
        ScriptedInvoker::new(&[("slow", 200, CallOutcome::response(200, "{}"))]),
    );
    assert_eq!(app.forward("hook=patient-view&handle=dup").await.status(), StatusCode::OK);

    let response = app.forward("hook=patient-view&handle=dup").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "BATCH_CONFLICT");
}

#[tokio::test]
async fn test_health_reports_live_batches() {
    let app = TestApp::new(
        patient_view(&["slow"]),
        ScriptedInvoker::new(&[("slow", 200, CallOutcome::response(200, "{}"))]),
    );
    app.forward("hook=patient-view").await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["live_batches"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    let app = TestApp::with_state(Vec::new(), ScriptedInvoker::new(&[]), Some(handle), None);

    let response = app.get("/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let app = TestApp::new(Vec::new(), ScriptedInvoker::new(&[]));
    assert_eq!(app.get("/metrics").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_assets() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("ui")).unwrap();
    std::fs::write(dir.path().join("ui/index.html"), "<html>proxy</html>").unwrap();
    std::fs::write(dir.path().join("ui/app.js"), "console.log('ok');").unwrap();

    let app = TestApp::with_state(
        Vec::new(),
        ScriptedInvoker::new(&[]),
        None,
        Some(dir.path().to_path_buf()),
    );

    let response = app.get("/static/ui").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/static/ui/index.html");

    let response = app.get("/static/ui/index.html").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<html>proxy</html>");

    let response = app.get("/static/ui/app.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .contains("javascript"));

    assert_eq!(app.get("/static/ui/missing.css").await.status(), StatusCode::NOT_FOUND);
}
