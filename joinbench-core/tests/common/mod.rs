//! Fake cluster nodes served over real HTTP
//!
//! All nodes spawned from one [`FakeWorld`] share state: a member added
//! through `POST {base}/members` immediately reports itself as leader, and the
//! node handling the call stores its measurement under `measurement`.

#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const BASE_PATH: &str = "/_raft";

#[derive(Default)]
struct WorldState {
    leaders: HashMap<u64, u64>,
    kv: HashMap<String, Bytes>,
    writes: HashMap<u64, usize>,
    added: Vec<Vec<u64>>,
    tokens: Vec<Option<String>>,
    required_token: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeWorld {
    state: Arc<Mutex<WorldState>>,
}

impl FakeWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_token(&self, token: &str) {
        self.state.lock().unwrap().required_token = Some(token.to_string());
    }

    pub fn added(&self) -> Vec<Vec<u64>> {
        self.state.lock().unwrap().added.clone()
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().tokens.clone()
    }

    pub fn writes(&self, member_id: u64) -> usize {
        self.state.lock().unwrap().writes.get(&member_id).copied().unwrap_or(0)
    }

    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.state.lock().unwrap().kv.get(key).cloned()
    }

    /// Serve a node with `member_id` that currently follows `leader_id`.
    pub async fn spawn_node(&self, member_id: u64, leader_id: u64) -> String {
        self.state.lock().unwrap().leaders.insert(member_id, leader_id);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let world = self.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let world = world.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let world = world.clone();
                        async move { Ok::<_, Infallible>(world.handle(member_id, req).await) }
                    });
                    let _ = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    async fn handle(&self, member_id: u64, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let token = req
            .headers()
            .get("X-Raft-Token")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let required = {
            let mut state = self.state.lock().unwrap();
            state.tokens.push(token.clone());
            state.required_token.clone()
        };
        if required.is_some() && required != token {
            return reply(StatusCode::UNAUTHORIZED, Bytes::new());
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let body = req.into_body().collect().await.map(|b| b.to_bytes()).unwrap_or_default();

        let Some(route) = path.strip_prefix(BASE_PATH) else {
            return reply(StatusCode::NOT_FOUND, Bytes::new());
        };

        match (method, route) {
            (Method::GET, "/status") => {
                let leader_id = self.state.lock().unwrap().leaders[&member_id];
                let json = serde_json::json!({ "leader_id": leader_id, "member_id": member_id });
                reply(StatusCode::OK, Bytes::from(json.to_string()))
            }
            (Method::PUT, key) if key.starts_with("/kv/") => {
                if key == "/kv/slow" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                let mut state = self.state.lock().unwrap();
                *state.writes.entry(member_id).or_default() += 1;
                state.kv.insert(key["/kv/".len()..].to_string(), body);
                reply(StatusCode::NO_CONTENT, Bytes::new())
            }
            (Method::GET, key) if key.starts_with("/kv/") => {
                match self.state.lock().unwrap().kv.get(&key["/kv/".len()..]) {
                    Some(value) => reply(StatusCode::OK, value.clone()),
                    None => reply(StatusCode::NOT_FOUND, Bytes::new()),
                }
            }
            (Method::POST, "/members") => {
                let Ok(request) = serde_json::from_slice::<serde_json::Value>(&body) else {
                    return reply(StatusCode::BAD_REQUEST, Bytes::new());
                };
                let add: Vec<u64> = request["add"]
                    .as_array()
                    .map(|ids| ids.iter().filter_map(|id| id.as_u64()).collect())
                    .unwrap_or_default();

                let mut state = self.state.lock().unwrap();
                for id in &add {
                    state.leaders.insert(*id, *id);
                }
                state.added.push(add);
                let measurement = serde_json::json!({
                    "AddEnter": 1_700_000_000_000_000i64,
                    "AddLeave": 1_700_000_000_040_000i64,
                    "leaderElect": 120_000,
                });
                state.kv.insert("measurement".to_string(), Bytes::from(measurement.to_string()));
                reply(StatusCode::OK, Bytes::new())
            }
            _ => reply(StatusCode::NOT_FOUND, Bytes::new()),
        }
    }
}

fn reply(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}
