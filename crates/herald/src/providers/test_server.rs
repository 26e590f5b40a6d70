//! Scripted HTTP endpoint for provider and engine tests.

use std::sync::{Arc, Mutex};
use std::thread;

use tiny_http::{Header, Response, Server, StatusCode};

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub(crate) struct TestServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Recorded>>>,
    handle: thread::JoinHandle<()>,
}

impl TestServer {
    /// Wait for every scripted response to be served and return the requests.
    pub fn join(self) -> Vec<Recorded> {
        self.handle.join().expect("join server");
        let seen = self.seen.lock().expect("lock");
        seen.clone()
    }
}

/// Serve `responses` in order, one per request, then stop.
pub(crate) fn spawn(responses: Vec<(u16, String)>) -> TestServer {
    let server = Server::http("127.0.0.1:0").expect("server");
    let base_url = format!("http://{}", server.server_addr());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_thread = Arc::clone(&seen);

    let handle = thread::spawn(move || {
        for (status, body) in responses {
            let mut req = server.recv().expect("request");
            let mut received = String::new();
            let _ = req.as_reader().read_to_string(&mut received);
            seen_thread.lock().expect("lock").push(Recorded {
                method: req.method().to_string(),
                path: req.url().to_string(),
                headers: req
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string(), h.value.to_string()))
                    .collect(),
                body: received,
            });
            let resp = Response::from_string(body)
                .with_status_code(StatusCode(status))
                .with_header(
                    Header::from_bytes("Content-Type", "application/json").expect("header"),
                );
            req.respond(resp).expect("respond");
        }
    });

    TestServer {
        base_url,
        seen,
        handle,
    }
}
