use crate::config::{AttemptConfig, BridgeConfig};
use crate::errors::AttemptError;
use crate::relay::StopReason;
use crate::strategy::CATALOG;
use crate::worker::{run_attempt, READY_MARKER};
use iotc::{MockSdk, RecvStep};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // CATALOG[1] is sequential, CATALOG[0] parallel; both region "all".
    const SEQUENTIAL: usize = 1;
    const PARALLEL: usize = 0;

    fn test_cfg() -> BridgeConfig {
        BridgeConfig {
            uid: "TESTUID123".to_string(),
            auth_key: "secret".to_string(),
            state_path: "unused".into(),
            watchdog_timeout: Duration::from_secs(15),
            failure_exit_delay: Duration::ZERO,
            license_key: None,
            iotc_lib_path: None,
            av_lib_path: None,
            attempt: AttemptConfig {
                retry_pause: Duration::ZERO,
                ..Default::default()
            },
        }
    }

    fn count(events: &[String], name: &str) -> usize {
        events.iter().filter(|e| e.as_str() == name).count()
    }

    #[test]
    fn sequential_connect_retries_until_a_handle_comes_back() {
        let sdk = MockSdk::new()
            .with_connect(&[-1, iotc::ER_TIMEOUT, 5])
            .with_client_start(&[2])
            .with_recv(vec![RecvStep::Error(-1)]);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);

        assert!(matches!(result, Ok(StopReason::ReceiveError(-1))));
        assert_eq!(count(&sdk.event_names(), "connect_by_uid"), 3);
        assert_eq!(out[0], READY_MARKER);
    }

    #[test]
    fn sequential_connect_stops_after_the_retry_budget() {
        let sdk = MockSdk::new().with_connect(&[-1, -1, -1]);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);

        assert!(matches!(result, Err(AttemptError::ConnectFailed(-1))));
        // no marker, no session to close, but the subsystems come down
        assert!(out.is_empty());
        let events = sdk.event_names();
        assert_eq!(count(&events, "connect_by_uid"), 3);
        assert!(!events.iter().any(|e| e.starts_with("session_close")));
        assert!(events.contains(&"av_deinit".to_string()));
        assert!(events.contains(&"deinit".to_string()));
    }

    #[test]
    fn parallel_connect_gets_exactly_one_shot() {
        let sdk = MockSdk::new()
            .with_alloc_session(9)
            .with_parallel_connect(&[-1]);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[PARALLEL], &mut out, &stop);

        assert!(matches!(result, Err(AttemptError::ConnectFailed(-1))));
        let events = sdk.event_names();
        assert_eq!(
            events
                .iter()
                .filter(|e| e.starts_with("connect_by_uid_parallel"))
                .count(),
            1
        );
        // the spent pre-allocated id is released
        assert!(events.contains(&"session_close:9".to_string()));
        assert!(out.is_empty());
    }

    #[test]
    fn init_failure_is_fatal_before_any_connect() {
        let sdk = MockSdk::new().with_init_result(-2);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);

        assert!(matches!(result, Err(AttemptError::InitFailed(-2))));
        assert_eq!(count(&sdk.event_names(), "connect_by_uid"), 0);
    }

    #[test]
    fn ready_marker_goes_out_before_the_media_client_starts() {
        let sdk = MockSdk::new()
            .with_connect(&[3])
            .with_client_start(&[1])
            .with_recv(vec![RecvStep::Error(-9)]);
        let events = sdk.events();
        let mut out = SignalSpy {
            bytes: Vec::new(),
            events: Arc::clone(&events),
        };
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);
        assert!(result.is_ok());

        let events = sdk.event_names();
        let marker = events.iter().position(|e| e == "signal:1").unwrap();
        let connect = events.iter().position(|e| e == "connect_by_uid").unwrap();
        let client_start = events.iter().position(|e| e == "client_start").unwrap();
        assert!(connect < marker, "got {events:?}");
        assert!(marker < client_start, "got {events:?}");
        assert_eq!(out.bytes[0], READY_MARKER);
    }

    #[test]
    fn client_start_failure_releases_the_session() {
        let sdk = MockSdk::new()
            .with_connect(&[4])
            .with_client_start(&[-1, -1, -1]);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);

        let result = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);

        assert!(matches!(result, Err(AttemptError::ClientStartFailed(-1))));
        let events = sdk.event_names();
        assert_eq!(count(&events, "client_start"), 3);
        assert!(events.contains(&"session_close:4".to_string()));
        // the marker had already gone out when the connect succeeded; the
        // supervisor will have pinned this strategy, and that is intended
        assert_eq!(out, vec![READY_MARKER]);
    }

    #[test]
    fn strategy_region_is_applied_before_init() {
        let sdk = MockSdk::new().with_connect(&[-1, -1, -1]);
        let mut out = Vec::new();
        let stop = AtomicBool::new(false);
        let _ = run_attempt(&sdk, &test_cfg(), &CATALOG[SEQUENTIAL], &mut out, &stop);

        let events = sdk.event_names();
        let region = events.iter().position(|e| e.starts_with("set_region")).unwrap();
        let init = events.iter().position(|e| e == "init").unwrap();
        assert!(region < init, "got {events:?}");
    }

    /// Records every write into the shared SDK event log so signal/call
    /// ordering is observable in one sequence.
    struct SignalSpy {
        bytes: Vec<u8>,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Write for SignalSpy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.events.lock().unwrap().push(format!("signal:{}", buf.len()));
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
