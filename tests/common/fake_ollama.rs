/*!
 * Scripted stand-in for an Ollama server.
 *
 * Every connection receives the next scripted response (the last one is
 * repeated once the script runs out). Request bodies are recorded.
 */

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One scripted HTTP response
#[derive(Debug, Clone)]
pub enum Reply {
    /// Status code and body
    Status(u16, String),
    /// Wait before answering with 200 and the body
    Delayed(Duration, String),
}

impl Reply {
    /// A successful generate response carrying `text`
    pub fn ok(text: &str) -> Self {
        Reply::Status(200, generation_body(text))
    }

    pub fn error(status: u16, message: &str) -> Self {
        Reply::Status(status, serde_json::json!({ "error": message }).to_string())
    }
}

/// JSON body of a non-streaming generate response
pub fn generation_body(text: &str) -> String {
    serde_json::json!({
        "model": "test-model",
        "created_at": "2024-01-01T00:00:00Z",
        "response": text,
        "done": true,
        "eval_count": 7
    })
    .to_string()
}

pub struct FakeOllama {
    pub url: String,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeOllama {
    /// Start serving the script on an ephemeral local port
    pub async fn start(script: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/api/generate", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let reply = script
                    .get(served)
                    .or_else(|| script.last())
                    .cloned()
                    .unwrap_or_else(|| Reply::ok(""));
                served += 1;
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve(stream, reply, recorded).await;
                });
            }
        });

        Self { url, requests }
    }

    /// Parsed JSON bodies received so far
    pub fn requests(&self) -> Vec<serde_json::Value> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

async fn serve(
    mut stream: TcpStream,
    reply: Reply,
    recorded: Arc<Mutex<Vec<serde_json::Value>>>,
) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    if let Ok(body) = serde_json::from_slice(&buffer[header_end..]) {
        recorded.lock().push(body);
    }

    let (status, body) = match reply {
        Reply::Status(status, body) => (status, body),
        Reply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            (200, body)
        }
    };
    let response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
