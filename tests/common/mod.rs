//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_proxy::config::ProxyConfig;
use relay_proxy::http::HttpServer;
use relay_proxy::lifecycle::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned upstream reply.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

#[allow(dead_code)]
impl MockResponse {
    pub fn html(body: &str) -> Self {
        Self::ok(Some("text/html; charset=utf-8"), body)
    }

    pub fn ok(content_type: Option<&'static str>, body: &str) -> Self {
        Self::bytes(content_type, body.as_bytes())
    }

    pub fn bytes(content_type: Option<&'static str>, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: Some("text/plain"),
            body: b"upstream says no".to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Start a mock upstream that answers every connection with `response`.
#[allow(dead_code)]
pub async fn start_mock_upstream(response: MockResponse) -> SocketAddr {
    start_programmable_upstream(move || {
        let response = response.clone();
        async move { response }
    })
    .await
}

/// Start a programmable mock upstream on an ephemeral loopback port.
pub async fn start_programmable_upstream<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let response = f().await;
                        tokio::time::sleep(response.delay).await;

                        let status_text = match response.status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let content_type = response
                            .content_type
                            .map(|ct| format!("Content-Type: {}\r\n", ct))
                            .unwrap_or_default();

                        let head = format!(
                            "HTTP/1.1 {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
                            status_text,
                            content_type,
                            response.body.len()
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&response.body).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Spawn the proxy on an ephemeral port; `tweak` adjusts the default config.
pub async fn spawn_proxy(tweak: impl FnOnce(&mut ProxyConfig)) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ProxyConfig::default();
    config.listener.bind_address = addr.to_string();
    tweak(&mut config);

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.clone()).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, shutdown)
}

/// Plain client that never goes through a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
