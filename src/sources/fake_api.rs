//! Local HTTP server with canned JSON responses, for driving the adapters
//! end to end without network access.

use std::sync::{Arc, Mutex};

use reqwest::Client;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A canned response for every request target starting with `prefix`.
pub struct Route {
    pub prefix: String,
    pub status: u16,
    pub body: String,
}

impl Route {
    pub fn json(prefix: impl Into<String>, body: impl Into<String>) -> Self {
        Route {
            prefix: prefix.into(),
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(prefix: impl Into<String>, status: u16) -> Self {
        Route {
            prefix: prefix.into(),
            status,
            body: "{}".to_string(),
        }
    }
}

/// Client that ignores proxy settings from the environment.
pub fn client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

pub struct FakeApi {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    /// Serves `routes` on an ephemeral port. The first matching route wins;
    /// unmatched targets get a 404.
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(respond(socket, Arc::clone(&routes), Arc::clone(&log)));
            }
        });

        FakeApi {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    /// Request targets (path and query) received so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_requested(&self, prefix: &str) -> bool {
        self.requests().iter().any(|t| t.starts_with(prefix))
    }
}

async fn respond(mut socket: TcpStream, routes: Arc<Vec<Route>>, log: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    log.lock().unwrap().push(target.clone());

    let (status, body) = routes
        .iter()
        .find(|r| target.starts_with(&r.prefix))
        .map(|r| (r.status, r.body.clone()))
        .unwrap_or((404, "{}".to_string()));

    let response = format!(
        "HTTP/1.1 {} Fake\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
