//! A minimal scripted HTTP server for exercising the dispatcher without a
//! real backend. Each connection consumes the next scripted response;
//! responses are sent with `connection: close` so every request arrives on a
//! fresh connection and can be counted.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub(crate) struct ScriptedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl ScriptedResponse {
    pub(crate) fn ok(body: &str) -> ScriptedResponse {
        ScriptedResponse {
            status: 200,
            body: body.to_owned(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn status(status: u16) -> ScriptedResponse {
        ScriptedResponse {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn delayed(body: &str, delay: Duration) -> ScriptedResponse {
        ScriptedResponse {
            status: 200,
            body: body.to_owned(),
            delay,
        }
    }
}

pub(crate) struct ScriptedServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    pub(crate) async fn start(responses: Vec<ScriptedResponse>) -> ScriptedServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        {
            let hits = Arc::clone(&hits);
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                let mut script = responses.into_iter();
                loop {
                    let Ok((socket, _)) = listener.accept().await else {
                        return;
                    };
                    hits.fetch_add(1, Ordering::SeqCst);
                    let response = script.next().unwrap_or_else(|| ScriptedResponse::status(500));
                    let requests = Arc::clone(&requests);
                    // Serve each connection on its own task so a delayed
                    // response does not block later requests.
                    tokio::spawn(async move {
                        serve(socket, response, requests).await;
                    });
                }
            });
        }

        ScriptedServer {
            addr,
            hits,
            requests,
        }
    }

    /// Base URL including a `/v1` path segment, like the real service.
    pub(crate) fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub(crate) fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Raw request texts (headers + body) received so far.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(mut socket: TcpStream, response: ScriptedResponse, requests: Arc<Mutex<Vec<String>>>) {
    let Ok(request) = read_request(&mut socket).await else {
        return;
    };
    requests.lock().unwrap().push(request);

    if response.delay > Duration::ZERO {
        tokio::time::sleep(response.delay).await;
    }

    let reason = match response.status {
        200 => "OK",
        202 => "Accepted",
        _ => "Error",
    };
    let payload = format!(
        "HTTP/1.1 {} {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        response.status,
        reason,
        response.body.len(),
        response.body,
    );
    let _ = socket.write_all(payload.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Read one full HTTP request (headers plus content-length body).
async fn read_request(socket: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
