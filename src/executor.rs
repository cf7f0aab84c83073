use std::{fmt, sync::Arc, time::Duration};

use crate::{
    transport::{ExchangeSink, Method, ReqwestTransport, Transport},
    HttpError, RequestConfig, Response,
};

/// Minimum delay between two attempts.
pub const RETRY_DELAY_FLOOR: Duration = Duration::from_millis(3_000);

/// Delay applied before every attempt after the first.
///
/// Configured delays below [`RETRY_DELAY_FLOOR`] are raised to it.
pub fn retry_delay(configured_ms: u64) -> Duration {
    Duration::from_millis(configured_ms).max(RETRY_DELAY_FLOOR)
}

/// Blocks the calling thread between attempts.
pub trait Sleep: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleep`] backed by [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs configured exchanges against a transport, retrying failed attempts.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleep>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor").finish_non_exhaustive()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ReqwestTransport::default())
    }
}

impl Executor {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            sleeper: Arc::new(ThreadSleep),
        }
    }

    /// Replaces the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Sleep + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Performs the exchange up to `max(retry_attempts, 1)` times.
    ///
    /// Returns the first successful response, or the last failed one. A
    /// transport handle that cannot be opened ends the call immediately.
    pub fn execute(&self, config: &RequestConfig, url: &str, method: Method) -> Response {
        let attempts = config.options.max_attempts();
        let delay = retry_delay(config.options.retry_delay_ms);
        let mut last = Response::empty();

        for attempt in 0..attempts {
            if attempt > 0 {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "retrying {} {} after {} ms",
                    method.as_str(),
                    url,
                    delay.as_millis()
                );
                self.sleeper.sleep(delay);
            }

            let response = self.attempt(config, url, method);
            if response.is_successful() {
                return response;
            }
            if response.error().is_some_and(|err| !err.is_retryable()) {
                return response;
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                "attempt {}/{} for {} {} failed: {:?}",
                attempt + 1,
                attempts,
                method.as_str(),
                url,
                response.error()
            );
            last = response;
        }

        last
    }

    fn attempt(&self, config: &RequestConfig, url: &str, method: Method) -> Response {
        let request = config.to_transport_request(url, method);

        let mut handle = match self.transport.open(&request) {
            Ok(handle) => handle,
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("could not open transport for {}: {}", url, err);
                return Response::from_error(match err {
                    HttpError::TransportHandle(_) => err,
                    other => HttpError::TransportHandle(other.to_string()),
                });
            }
        };

        let mut sink = ExchangeSink::default();
        let outcome = handle.perform(&request, &mut sink);
        drop(handle);

        let response = Response::parse(sink.body(), sink.raw_headers());
        match outcome {
            Ok(()) => response,
            Err(err) => response.with_network_failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use super::{retry_delay, Executor, Sleep, RETRY_DELAY_FLOOR};
    use crate::{
        transport::{ExchangeSink, Method, Transport, TransportHandle, TransportRequest},
        HttpError, RequestConfig, Result,
    };

    #[derive(Clone, Default)]
    struct RecordingSleep(Arc<Mutex<Vec<Duration>>>);

    impl RecordingSleep {
        fn slept(&self) -> Vec<Duration> {
            self.0.lock().expect("sleep log mutex must not be poisoned").clone()
        }
    }

    impl Sleep for RecordingSleep {
        fn sleep(&self, duration: Duration) {
            self.0
                .lock()
                .expect("sleep log mutex must not be poisoned")
                .push(duration);
        }
    }

    enum Scripted {
        Headers(&'static str),
        NetworkError,
    }

    #[derive(Clone)]
    struct ScriptedTransport {
        script: Arc<Mutex<VecDeque<Scripted>>>,
        opened: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
        fail_open: bool,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                opened: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicUsize::new(0)),
                fail_open: false,
            }
        }

        fn failing_open() -> Self {
            Self {
                fail_open: true,
                ..Self::new(Vec::new())
            }
        }
    }

    struct ScriptedHandle {
        next: Option<Scripted>,
        released: Arc<AtomicUsize>,
    }

    impl Drop for ScriptedHandle {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Transport for ScriptedTransport {
        fn open(&self, _request: &TransportRequest<'_>) -> Result<Box<dyn TransportHandle>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(HttpError::TransportHandle("no handles left".to_owned()));
            }
            let next = self
                .script
                .lock()
                .expect("script mutex must not be poisoned")
                .pop_front();
            Ok(Box::new(ScriptedHandle {
                next,
                released: Arc::clone(&self.released),
            }))
        }
    }

    impl TransportHandle for ScriptedHandle {
        fn perform(
            &mut self,
            _request: &TransportRequest<'_>,
            sink: &mut ExchangeSink,
        ) -> Result<()> {
            match self.next.take() {
                Some(Scripted::Headers(raw)) => {
                    sink.write_headers(raw);
                    sink.write_body(b"payload");
                    Ok(())
                }
                Some(Scripted::NetworkError) | None => Err(HttpError::Network {
                    message: "connection refused".to_owned(),
                    timeout: false,
                }),
            }
        }
    }

    fn config(attempts: u32, delay_ms: u64) -> RequestConfig {
        let mut config = RequestConfig::default();
        config.options.retry_attempts = attempts;
        config.options.retry_delay_ms = delay_ms;
        config
    }

    #[test]
    fn retry_delay_never_drops_below_floor() {
        assert_eq!(retry_delay(0), RETRY_DELAY_FLOOR);
        assert_eq!(retry_delay(100), Duration::from_millis(3_000));
        assert_eq!(retry_delay(5_000), Duration::from_millis(5_000));
    }

    #[test]
    fn retries_until_success_with_floored_delay() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Headers("HTTP/1.1 500 Internal Server Error\r\n\r\n"),
            Scripted::NetworkError,
            Scripted::Headers("HTTP/1.1 200 OK\r\nX-Ok: 1\r\n\r\n"),
        ]);
        let sleeper = RecordingSleep::default();
        let executor = Executor::new(transport.clone()).with_sleeper(sleeper.clone());

        let response = executor.execute(&config(3, 100), "http://h/", Method::Get);

        assert!(response.is_successful());
        assert_eq!(response.header("X-Ok"), Some("1"));
        assert_eq!(transport.opened.load(Ordering::SeqCst), 3);
        assert_eq!(
            sleeper.slept(),
            vec![Duration::from_millis(3_000), Duration::from_millis(3_000)]
        );
    }

    #[test]
    fn returns_last_failure_after_exhausting_attempts() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Headers("HTTP/1.1 429 Too Many Requests\r\n\r\n"),
            Scripted::Headers("HTTP/1.1 404 Not Found\r\n\r\n"),
        ]);
        let sleeper = RecordingSleep::default();
        let executor = Executor::new(transport.clone()).with_sleeper(sleeper.clone());

        let response = executor.execute(&config(2, 5_000), "http://h/", Method::Post);

        assert!(response.is_failed());
        assert_eq!(response.status(), 404);
        assert_eq!(transport.opened.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.slept(), vec![Duration::from_millis(5_000)]);
    }

    #[test]
    fn zero_attempts_means_one_try_and_no_sleep() {
        let transport = ScriptedTransport::new(vec![Scripted::NetworkError]);
        let sleeper = RecordingSleep::default();
        let executor = Executor::new(transport.clone()).with_sleeper(sleeper.clone());

        let response = executor.execute(&config(0, 0), "http://h/", Method::Get);

        assert!(response.is_failed());
        assert!(matches!(response.error(), Some(HttpError::Network { .. })));
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn success_on_first_attempt_stops_immediately() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Headers("HTTP/1.1 302 Found\r\nLocation: /x\r\n\r\n"),
            Scripted::Headers("HTTP/1.1 200 OK\r\n\r\n"),
        ]);
        let sleeper = RecordingSleep::default();
        let executor = Executor::new(transport.clone()).with_sleeper(sleeper.clone());

        let response = executor.execute(&config(5, 0), "http://h/", Method::Get);

        assert!(response.is_redirect());
        assert!(response.is_successful());
        assert_eq!(response.body(), "payload");
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn handle_failure_is_fatal_and_not_retried() {
        let transport = ScriptedTransport::failing_open();
        let sleeper = RecordingSleep::default();
        let executor = Executor::new(transport.clone()).with_sleeper(sleeper.clone());

        let response = executor.execute(&config(4, 0), "http://h/", Method::Get);

        assert!(response.is_failed());
        assert_eq!(response.status(), 0);
        assert!(response.body().is_empty());
        assert!(matches!(response.error(), Some(HttpError::TransportHandle(_))));
        assert_eq!(transport.opened.load(Ordering::SeqCst), 1);
        assert!(sleeper.slept().is_empty());
    }

    #[test]
    fn handles_are_released_after_every_attempt() {
        let transport = ScriptedTransport::new(vec![
            Scripted::NetworkError,
            Scripted::Headers("HTTP/1.1 abc OK\r\n"),
            Scripted::Headers("HTTP/1.1 500 Oops\r\n"),
        ]);
        let executor = Executor::new(transport.clone()).with_sleeper(RecordingSleep::default());

        let response = executor.execute(&config(3, 0), "http://h/", Method::Get);

        assert!(response.is_failed());
        assert_eq!(transport.opened.load(Ordering::SeqCst), 3);
        assert_eq!(transport.released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn network_failure_keeps_partial_headers_but_fails() {
        struct PartialTransport;
        struct PartialHandle;

        impl Transport for PartialTransport {
            fn open(&self, _request: &TransportRequest<'_>) -> Result<Box<dyn TransportHandle>> {
                Ok(Box::new(PartialHandle))
            }
        }

        impl TransportHandle for PartialHandle {
            fn perform(
                &mut self,
                _request: &TransportRequest<'_>,
                sink: &mut ExchangeSink,
            ) -> Result<()> {
                sink.write_headers("HTTP/1.1 200 OK\r\nServer: x\r\n\r\n");
                Err(HttpError::Network {
                    message: "body read timed out".to_owned(),
                    timeout: true,
                })
            }
        }

        let executor = Executor::new(PartialTransport).with_sleeper(RecordingSleep::default());
        let response = executor.execute(&config(1, 0), "http://h/", Method::Get);

        assert!(response.is_failed());
        assert_eq!(response.status(), 200);
        assert_eq!(response.header("Server"), Some("x"));
        assert!(matches!(
            response.error(),
            Some(HttpError::Network { timeout: true, .. })
        ));
    }
}
