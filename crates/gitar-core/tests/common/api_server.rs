//! Minimal HTTP/1.1 server standing in for the GitHub/Gitee REST APIs and
//! archive hosts in integration tests.
//!
//! Routes are keyed by request target (path plus query). Unknown targets get
//! `200 []`, which reads as an empty listing page. A route can stall its first
//! N requests to exercise client timeouts.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Route {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Requests that sleep for `stall` before answering.
    pub stall_first: u32,
    pub stall: Duration,
}

impl Route {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
            stall_first: 0,
            stall: Duration::ZERO,
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            content_type: "application/octet-stream",
            body,
            ..Self::json("")
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::json("{\"message\":\"error\"}")
        }
    }

    pub fn stalling(mut self, first: u32, stall: Duration) -> Self {
        self.stall_first = first;
        self.stall = stall;
        self
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    hits: HashMap<String, u32>,
}

/// Handle to a running server. The server thread lives until the process exits.
#[derive(Clone)]
pub struct ApiServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl ApiServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    /// Base URL without a trailing slash, e.g. `http://127.0.0.1:12345`.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn route(&self, target: &str, route: Route) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert(target.to_string(), route);
    }

    /// Number of requests seen for `target`.
    pub fn hits(&self, target: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .hits
            .get(target)
            .copied()
            .unwrap_or(0)
    }
}

/// `/repos/<owner>/<repo>/<kind>?page=<page>&per_page=100`
pub fn listing_target(owner: &str, repo: &str, kind: &str, page: u32) -> String {
    format!("/repos/{owner}/{repo}/{kind}?page={page}&per_page=100")
}

fn handle(mut stream: std::net::TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let Some(target) = request_target(request) else {
        let _ = stream.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        return;
    };

    let (route, hit) = {
        let mut st = state.lock().unwrap();
        let hit = {
            let h = st.hits.entry(target.to_string()).or_insert(0);
            *h += 1;
            *h
        };
        (st.routes.get(target).cloned(), hit)
    };
    let route = route.unwrap_or_else(|| Route::json("[]"));

    if hit <= route.stall_first {
        thread::sleep(route.stall);
    }

    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        reason(route.status),
        route.content_type,
        route.body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(&route.body);
}

fn request_target(request: &str) -> Option<&str> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    if !method.eq_ignore_ascii_case("GET") {
        return None;
    }
    parts.next()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Status",
    }
}
