#![allow(dead_code)]

pub mod mock_validator {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Raw request text received by a mock server
    pub type Received = thread::JoinHandle<Vec<String>>;

    /// Starts a validator that answers `200 OK` when the `Authorization`
    /// header equals `valid_token` and `401 Unauthorized` otherwise.
    ///
    /// Serves `requests` connections, then returns what it received.
    pub fn start_token_server(valid_token: &str, requests: usize) -> (String, Received) {
        let expected = format!("authorization: {}", valid_token.to_lowercase());
        start_server(requests, Duration::ZERO, move |raw| {
            let ok = raw
                .lines()
                .any(|line| line.trim().to_lowercase() == expected);
            if ok {
                "200 OK"
            } else {
                "401 Unauthorized"
            }
        })
    }

    /// Starts a validator that always answers with `status` after `delay`.
    pub fn start_status_server(status: &'static str, delay: Duration, requests: usize) -> (String, Received) {
        start_server(requests, delay, move |_| status)
    }

    /// A URL on localhost that refuses connections
    pub fn unreachable_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}:{}/validate", addr.ip(), addr.port())
    }

    fn start_server<F>(requests: usize, delay: Duration, respond: F) -> (String, Received)
    where
        F: Fn(&str) -> &'static str + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{}:{}/validate", addr.ip(), addr.port());
        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..requests {
                let Ok((mut stream, _)) = listener.accept() else {
                    break;
                };
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).unwrap_or(0);
                let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let status = respond(&raw);
                let body = if status.starts_with("200") { "" } else { "denied" };
                let resp = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes());
                received.push(raw);
            }
            received
        });
        (url, handle)
    }
}

pub mod stores {
    use review_gate::store::{ReviewRecord, ReviewStore, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Keeps every write in order, including repeated keys.
    #[derive(Default)]
    pub struct RecordingStore {
        writes: Mutex<Vec<ReviewRecord>>,
    }

    impl RecordingStore {
        pub fn writes(&self) -> Vec<ReviewRecord> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl ReviewStore for RecordingStore {
        fn put_review(&self, record: &ReviewRecord) -> Result<(), StoreError> {
            self.writes.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn get_review(
            &self,
            app_name: &str,
            create_date: &str,
        ) -> Result<Option<ReviewRecord>, StoreError> {
            Ok(self
                .writes
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|r| r.key() == (app_name, create_date))
                .cloned())
        }

        fn table_name(&self) -> &str {
            "Reviews"
        }
    }

    /// Rejects every write.
    #[derive(Default)]
    pub struct FailingStore {
        pub attempts: AtomicUsize,
    }

    impl ReviewStore for FailingStore {
        fn put_review(&self, _record: &ReviewRecord) -> Result<(), StoreError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Rejected(
                "ProvisionedThroughputExceededException".into(),
            ))
        }

        fn get_review(&self, _: &str, _: &str) -> Result<Option<ReviewRecord>, StoreError> {
            Ok(None)
        }

        fn table_name(&self) -> &str {
            "Reviews"
        }
    }
}

pub mod fixtures {
    use review_gate::config::ServiceConfig;
    use review_gate::server::{ReviewRequest, ReviewService};
    use review_gate::store::ReviewStore;
    use std::sync::Arc;

    pub const ALLOWED_ORIGIN: &str = "https://app.testdevops.com";
    pub const FALLBACK_ORIGIN: &str = "https://api.testdevops.com";
    pub const GOOD_TOKEN: &str = "Bearer good-token";

    /// Configuration with both required settings present
    pub fn configured(endpoint: &str) -> ServiceConfig {
        ServiceConfig {
            table_name: Some("Reviews".into()),
            token_validation_endpoint: Some(endpoint.into()),
            ..ServiceConfig::default()
        }
    }

    /// A service that accepts only [`GOOD_TOKEN`] without any network call
    pub fn service(store: Arc<dyn ReviewStore>) -> ReviewService {
        ReviewService::new(configured("http://validator.invalid/validate"), store)
            .unwrap()
            .with_token_validator(Arc::new(|token: &str| token == GOOD_TOKEN))
    }

    /// An authenticated POST from an allowed origin
    pub fn post(body: &str) -> ReviewRequest {
        ReviewRequest::new("POST")
            .header("Origin", ALLOWED_ORIGIN)
            .header("Authorization", GOOD_TOKEN)
            .body(body)
    }

    pub fn valid_body() -> &'static str {
        r#"{"AppName":"Foo","Rating":5,"Description":"Great app"}"#
    }
}

pub mod logs {
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Captures formatted log output of the current thread.
    pub struct CapturedLogs {
        buf: Arc<Mutex<Vec<u8>>>,
        _guard: tracing::subscriber::DefaultGuard,
    }

    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Sink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        pub fn start() -> Self {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let writer = Arc::clone(&buf);
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::TRACE)
                .with_ansi(false)
                .with_writer(move || Sink(Arc::clone(&writer)))
                .finish();
            Self {
                buf,
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
        }
    }
}
