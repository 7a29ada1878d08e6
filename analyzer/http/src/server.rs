use crate::Reports;
use futures::future;
use hyper::{http, server::conn::http1, Request, Response};
use hyper_util::{
    rt::{TokioIo, TokioTimer},
    service::TowerToHyperService,
};
use serde::Serialize;
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};

const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(10);

type Body = http_body_util::Full<bytes::Bytes>;

/// Routes report requests to a [`Reports`] implementation.
#[derive(Clone, Debug)]
pub struct ReportServer<R> {
    reports: R,
}

#[derive(Debug, Serialize)]
struct ApiError<'a> {
    error: &'a str,
}

// === impl ReportServer ===

impl<R: Reports> ReportServer<R> {
    pub fn new(reports: R) -> Self {
        Self { reports }
    }

    pub async fn handle<B>(&self, req: Request<B>) -> Response<Body> {
        let method = req.method().clone();
        trace!(%method, path = %req.uri().path(), "Handling request");
        match (req.uri().path(), method) {
            ("/", http::Method::GET) => {
                json_response(http::StatusCode::OK, &*self.reports.current())
            }

            ("/update", http::Method::PUT) => match self.reports.refresh().await {
                Ok(report) => json_response(http::StatusCode::OK, &*report),
                Err(error) => {
                    error!(%error, "Failed to update the report");
                    internal_error()
                }
            },

            ("/send", http::Method::PUT) => match self.reports.send().await {
                Ok(()) => Response::builder()
                    .status(http::StatusCode::NO_CONTENT)
                    .body(Body::default())
                    .expect("no content response must be valid"),
                Err(error) => {
                    error!(%error, "Failed to send the report");
                    internal_error()
                }
            },

            ("/" | "/update" | "/send", _) => {
                json_error(http::StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
            }

            _ => json_error(http::StatusCode::NOT_FOUND, "not found"),
        }
    }
}

impl<R, B> tower::Service<Request<B>> for ReportServer<R>
where
    R: Reports,
    B: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { Ok(server.handle(req).await) })
    }
}

/// Serves reports on `addr` until the drain signal fires.
///
/// In-flight connections are shut down gracefully before the drain is released.
#[instrument(skip_all, fields(port = %addr.port()))]
pub async fn serve<R: Reports>(
    addr: SocketAddr,
    server: ReportServer<R>,
    drain: drain::Watch,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Report server listening");

    let shutdown = drain.clone().signaled();
    tokio::pin!(shutdown);
    loop {
        let (io, client) = tokio::select! {
            res = listener.accept() => match res {
                Ok(conn) => conn,
                Err(error) => {
                    warn!(%error, "Failed to accept connection");
                    continue;
                }
            },
            _handle = &mut shutdown => {
                debug!("Report server shutting down");
                return Ok(());
            }
        };

        let svc = TowerToHyperService::new(server.clone());
        let drain = drain.clone();
        tokio::spawn(
            async move {
                let conn = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .header_read_timeout(HEADER_READ_TIMEOUT)
                    .serve_connection(TokioIo::new(io), svc);
                tokio::pin!(conn);

                tokio::select! {
                    res = conn.as_mut() => {
                        if let Err(error) = res {
                            debug!(%error, "Connection failed");
                        }
                    }
                    handle = drain.signaled() => {
                        conn.as_mut().graceful_shutdown();
                        if let Err(error) = handle.release_after(conn).await {
                            debug!(%error, "Connection failed during shutdown");
                        }
                    }
                }
            }
            .instrument(info_span!("conn", %client)),
        );
    }
}

fn json_response<T: Serialize>(status: http::StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("json response must be valid"),
        Err(error) => {
            error!(%error, "Failed to encode response");
            internal_error()
        }
    }
}

fn internal_error() -> Response<Body> {
    json_error(
        http::StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error",
    )
}

fn json_error(status: http::StatusCode, message: &str) -> Response<Body> {
    let bytes = serde_json::to_vec(&ApiError { error: message })
        .unwrap_or_else(|_| br#"{"error":"internal error"}"#.to_vec());
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(Body::from(bytes))
        .expect("error response must be valid")
}
