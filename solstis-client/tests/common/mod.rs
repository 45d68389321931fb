//! Fake SolsTiS controller on a loopback socket

#![allow(dead_code)]

use serde_json::{Value, json};
use solstis_client::{ClientBuilder, SolstisClient};
use solstis_session::FrameExtractor;
use solstis_transport::TcpTransport;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Reply frame; the fake controller fills in the request's transmission ID
pub fn frame(op: &str, parameters: Value) -> Value {
    json!({"message": {"op": op, "parameters": parameters}})
}

pub fn ok(op: &str) -> Value {
    frame(&format!("{}_reply", op), json!({"status": [0]}))
}

pub fn push(status: &str, wavelength: f64) -> Value {
    json!({"message": {"transmission_id": [0], "op": "automatic_output",
        "parameters": {"wavelength": [wavelength], "status": status}}})
}

/// One-connection fake controller
///
/// Each request is answered with the frames returned by the handler.
/// `start_link` is answered automatically.
pub struct FakeController {
    pub address: SocketAddr,
    task: JoinHandle<Vec<(String, Value)>>,
}

impl FakeController {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: FnMut(&str, &Value) -> Vec<Value> + Send + 'static,
    {
        Self::spawn_chunked(None, handler).await
    }

    /// Like [`FakeController::spawn`], writing each frame in `chunk`-byte pieces
    pub async fn spawn_chunked<F>(chunk: Option<usize>, mut handler: F) -> Self
    where
        F: FnMut(&str, &Value) -> Vec<Value> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.set_nodelay(true).unwrap();
            let mut extractor = FrameExtractor::new();
            let mut buf = [0u8; 1024];
            let mut seen = Vec::new();
            loop {
                while let Some(request) = extractor.next_document().unwrap() {
                    let message = &request["message"];
                    let op = message["op"].as_str().unwrap().to_string();
                    let parameters = message.get("parameters").cloned().unwrap_or(json!({}));
                    let frames = if op == "start_link" {
                        vec![frame("start_link_reply", json!({"status": "ok"}))]
                    } else {
                        handler(&op, &parameters)
                    };
                    for mut reply in frames {
                        if reply["message"].get("transmission_id").is_none() {
                            reply["message"]["transmission_id"] = message["transmission_id"].clone();
                        }
                        let bytes = serde_json::to_vec(&reply).unwrap();
                        match chunk {
                            None => socket.write_all(&bytes).await.unwrap(),
                            Some(size) => {
                                for piece in bytes.chunks(size) {
                                    socket.write_all(piece).await.unwrap();
                                    tokio::time::sleep(Duration::from_millis(2)).await;
                                }
                            }
                        }
                    }
                    seen.push((op, parameters));
                }
                let n = match socket.read(&mut buf).await {
                    Ok(n) => n,
                    Err(_) => 0,
                };
                if n == 0 {
                    break;
                }
                extractor.feed(&buf[..n]);
            }
            seen
        });
        Self { address, task }
    }

    /// Linked client for this controller
    pub async fn client(&self) -> SolstisClient<TcpTransport> {
        ClientBuilder::new()
            .tcp(&self.address.to_string())
            .read_timeout(Duration::from_millis(500))
            .link_ip("127.0.0.1")
            .connect_and_link()
            .await
            .unwrap()
    }

    /// Every `(op, parameters)` received, once the client has closed
    pub async fn requests(self) -> Vec<(String, Value)> {
        self.task.await.unwrap()
    }
}
