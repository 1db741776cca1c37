#![allow(dead_code)]

pub mod requests {
    use http::Method;
    use serde_json::Value;
    use sigbind::ApiRequest;
    use std::sync::Arc;

    pub fn get(target: &str) -> Arc<ApiRequest> {
        Arc::new(ApiRequest::new(Method::GET, target))
    }

    pub fn post_json(target: &str, body: Value) -> Arc<ApiRequest> {
        Arc::new(ApiRequest::new(Method::POST, target).with_json(&body))
    }

    pub fn post_raw(target: &str, body: &str) -> Arc<ApiRequest> {
        Arc::new(
            ApiRequest::new(Method::POST, target)
                .with_header("content-type", "application/json")
                .with_body(body.as_bytes().to_vec()),
        )
    }
}

pub mod tracing_capture {
    use std::io;
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for formatted log records.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            let buf = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// JSON subscriber scoped to the current thread for the life of the value.
    pub struct TestTracing {
        pub logs: CapturedLogs,
        _guard: tracing::subscriber::DefaultGuard,
    }

    impl TestTracing {
        pub fn init() -> Self {
            let logs = CapturedLogs::default();
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_max_level(tracing::Level::TRACE)
                .with_writer(logs.clone())
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);
            Self {
                logs,
                _guard: guard,
            }
        }
    }
}
