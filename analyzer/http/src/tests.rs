use super::*;
use http_body_util::BodyExt;
use hyper::{http, Request, Response};
use ingress_analyzer_core::Report;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};

#[derive(Clone, Debug)]
struct MockReports {
    current: Arc<Report>,
    refreshed: Arc<Report>,
    fail: bool,
    refreshes: Arc<AtomicUsize>,
    sends: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Reports for MockReports {
    fn current(&self) -> Arc<Report> {
        self.current.clone()
    }

    async fn refresh(&self) -> anyhow::Result<Arc<Report>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("Ingress cache has not synced");
        }
        Ok(self.refreshed.clone())
    }

    async fn send(&self) -> anyhow::Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("invalid response status code: 503");
        }
        Ok(())
    }
}

impl MockReports {
    fn new(fail: bool) -> Self {
        let mut refreshed = Report::empty("v1.0.0");
        refreshed.ingress_count = 3;
        refreshed.compatible_ingress_count = 3;
        refreshed.vanilla_ingress_count = 3;
        Self {
            current: Arc::new(Report::empty("v1.0.0")),
            refreshed: Arc::new(refreshed),
            fail,
            refreshes: Arc::new(AtomicUsize::new(0)),
            sends: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn request(method: http::Method, path: &str) -> Request<()> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(())
        .expect("request must be valid")
}

async fn body_json<T: serde::de::DeserializeOwned>(
    rsp: Response<http_body_util::Full<bytes::Bytes>>,
) -> T {
    let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("body must be valid json")
}

fn assert_json_error(rsp: &Response<http_body_util::Full<bytes::Bytes>>) {
    assert_eq!(
        rsp.headers()[http::header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(rsp.headers()[http::header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn get_returns_current_report() {
    let reports = MockReports::new(false);
    let server = ReportServer::new(reports.clone());

    let rsp = server.handle(request(http::Method::GET, "/")).await;
    assert_eq!(rsp.status(), http::StatusCode::OK);
    assert_eq!(
        rsp.headers()[http::header::CONTENT_TYPE],
        "application/json"
    );
    let report: Report = body_json(rsp).await;
    assert_eq!(report, *reports.current);
    assert_eq!(reports.refreshes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn update_returns_refreshed_report() {
    let reports = MockReports::new(false);
    let server = ReportServer::new(reports.clone());

    let rsp = server.handle(request(http::Method::PUT, "/update")).await;
    assert_eq!(rsp.status(), http::StatusCode::OK);
    let report: Report = body_json(rsp).await;
    assert_eq!(report, *reports.refreshed);
    assert_eq!(reports.refreshes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn update_failure_is_internal_error() {
    let reports = MockReports::new(true);
    let server = ReportServer::new(reports);

    let rsp = server.handle(request(http::Method::PUT, "/update")).await;
    assert_eq!(rsp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_json_error(&rsp);
    let body: serde_json::Value = body_json(rsp).await;
    assert_eq!(body, serde_json::json!({ "error": "internal server error" }));
}

#[tokio::test]
async fn send_returns_no_content() {
    let reports = MockReports::new(false);
    let server = ReportServer::new(reports.clone());

    let rsp = server.handle(request(http::Method::PUT, "/send")).await;
    assert_eq!(rsp.status(), http::StatusCode::NO_CONTENT);
    assert_eq!(reports.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn send_failure_is_internal_error() {
    let reports = MockReports::new(true);
    let server = ReportServer::new(reports.clone());

    let rsp = server.handle(request(http::Method::PUT, "/send")).await;
    assert_eq!(rsp.status(), http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_json_error(&rsp);
    assert_eq!(reports.sends.load(Ordering::SeqCst), 1);
}

#[rstest]
#[case::post_report(http::Method::POST, "/", http::StatusCode::METHOD_NOT_ALLOWED)]
#[case::get_update(http::Method::GET, "/update", http::StatusCode::METHOD_NOT_ALLOWED)]
#[case::get_send(http::Method::GET, "/send", http::StatusCode::METHOD_NOT_ALLOWED)]
#[case::unknown_path(http::Method::GET, "/metrics", http::StatusCode::NOT_FOUND)]
#[case::nested_path(http::Method::PUT, "/update/now", http::StatusCode::NOT_FOUND)]
#[tokio::test]
async fn rejects_unrouted_requests(
    #[case] method: http::Method,
    #[case] path: &str,
    #[case] status: http::StatusCode,
) {
    let reports = MockReports::new(false);
    let server = ReportServer::new(reports.clone());

    let rsp = server.handle(request(method, path)).await;
    assert_eq!(rsp.status(), status);
    assert_json_error(&rsp);
    assert_eq!(reports.refreshes.load(Ordering::SeqCst), 0);
    assert_eq!(reports.sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn serves_until_drained() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let (signal, watch) = drain::channel();
    let server = tokio::spawn(serve(addr, ReportServer::new(MockReports::new(false)), watch));

    let mut stream = {
        let mut attempts = 0;
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(error) if attempts < 50 => {
                    attempts += 1;
                    tracing::debug!(%error, "Server not yet listening");
                    time::sleep(time::Duration::from_millis(10)).await;
                }
                Err(error) => panic!("failed to connect: {error}"),
            }
        }
    };
    stream
        .write_all(b"GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut rsp = String::new();
    stream.read_to_string(&mut rsp).await.unwrap();
    assert!(rsp.starts_with("HTTP/1.1 200 OK"), "{rsp}");
    assert!(rsp.contains(r#""version":"v1.0.0""#), "{rsp}");

    time::timeout(time::Duration::from_secs(5), signal.drain())
        .await
        .expect("server must drain");
    server
        .await
        .expect("server task must not panic")
        .expect("server must not fail");
}
