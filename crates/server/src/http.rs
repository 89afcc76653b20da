//! HTTP listener wiring.
//!
//! Every request, whatever its method or path, is answered from the query
//! component of its target. Successful outcomes, including replay misses, use
//! status 200; the error payload shape tells a miss apart from a hit.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::resolver::{Resolution, Resolver};

const TEXT_PLAIN_UTF8: &str = "text/plain;charset=utf-8";

/// A running listener.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Connections already being served finish on their own tasks.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.join.await;
    }
}

/// Bind the listener on all interfaces.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Serve `resolver` on `listener` until the returned handle is shut down.
pub fn spawn(listener: TcpListener, resolver: Arc<Resolver>) -> std::io::Result<ServerHandle> {
    let local_addr = listener.local_addr()?;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                accept = listener.accept() => {
                    let (stream, peer) = match accept {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            tracing::error!("accept failed: {err}");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let resolver = Arc::clone(&resolver);
                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle(req, Arc::clone(&resolver)));
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(%peer, "connection error: {err}");
                        }
                    });
                }
            }
        }
    });

    Ok(ServerHandle { local_addr, shutdown_tx, join })
}

async fn handle(req: Request<Incoming>, resolver: Arc<Resolver>) -> Result<Response<Full<Bytes>>, Infallible> {
    let raw_query = req.uri().query().map(|query| format!("?{query}"));

    let response = match resolver.resolve(raw_query.as_deref()).await {
        Ok(Resolution::NoQuery) => {
            tracing::debug!(uri = %req.uri(), "request has no query string");
            payload_response(StatusCode::BAD_REQUEST, Bytes::new())
        }
        Ok(resolution) => {
            if let Resolution::Captured { key, .. } = &resolution {
                tracing::debug!(key = %key, "echoing captured response");
            }
            payload_response(StatusCode::OK, resolution.body().cloned().unwrap_or_default())
        }
        Err(err) => {
            tracing::error!(uri = %req.uri(), "{err}");
            payload_response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new())
        }
    };

    tracing::info!(
        request = raw_query.as_deref().unwrap_or_default(),
        status = response.status().as_u16(),
        "handled request"
    );

    Ok(response)
}

fn payload_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_payload_response_headers() {
        let response = payload_response(StatusCode::OK, Bytes::from_static(b"OK"));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain;charset=utf-8");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"OK"));
    }

    #[tokio::test]
    async fn test_payload_response_keeps_headers_on_errors() {
        let response = payload_response(StatusCode::BAD_REQUEST, Bytes::new());

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
