//! In-process stand-in for the upstream vector tile API.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};

use tile_common::UpstreamConfig;
use tile_server::ServiceConfig;

struct MockState {
    body: Vec<u8>,
    delay: Duration,
    fail_first: u32,
    fail_status: StatusCode,
    requests: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    uris: Mutex<Vec<String>>,
}

/// Serves one payload for every path, optionally slow or failing.
pub struct MockUpstream {
    addr: SocketAddr,
    state: Arc<MockState>,
}

pub struct MockUpstreamBuilder {
    body: Vec<u8>,
    delay: Duration,
    fail_first: u32,
    fail_status: StatusCode,
}

impl MockUpstreamBuilder {
    /// Sleep this long inside every request.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer the first `count` requests with `status`.
    pub fn fail_first(mut self, count: u32, status: StatusCode) -> Self {
        self.fail_first = count;
        self.fail_status = status;
        self
    }

    /// Answer every request with `status`.
    pub fn always_fail(self, status: StatusCode) -> Self {
        self.fail_first(u32::MAX, status)
    }

    pub async fn start(self) -> MockUpstream {
        let state = Arc::new(MockState {
            body: self.body,
            delay: self.delay,
            fail_first: self.fail_first,
            fail_status: self.fail_status,
            requests: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            uris: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(serve_tile).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockUpstream { addr, state }
    }
}

impl MockUpstream {
    pub fn serving(body: Vec<u8>) -> MockUpstreamBuilder {
        MockUpstreamBuilder {
            body,
            delay: Duration::ZERO,
            fail_first: 0,
            fail_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/tiles", self.addr)
    }

    pub fn requests(&self) -> u32 {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were being served at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Path and query of every request received, in arrival order.
    pub fn uris(&self) -> Vec<String> {
        self.state.uris.lock().unwrap().clone()
    }
}

async fn serve_tile(State(state): State<Arc<MockState>>, uri: Uri) -> Response {
    let n = state.requests.fetch_add(1, Ordering::SeqCst) + 1;
    state.uris.lock().unwrap().push(uri.to_string());

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    if n <= state.fail_first {
        return state.fail_status.into_response();
    }
    (StatusCode::OK, state.body.clone()).into_response()
}

/// Service configuration pointed at a mock upstream.
pub fn config_for(upstream: &MockUpstream) -> ServiceConfig {
    let mut config = ServiceConfig::new(UpstreamConfig::new(upstream.url()));
    config.tile_size = 256;
    config.limits.cpu = 2;
    config
}
