//! Scripted SDK stand-in for tests.
//!
//! Connect, client-start and receive results are played back from queues;
//! every call is appended to a shared event log so tests can assert call
//! ordering across the bridge and the SDK boundary.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::sdk::{CameraSdk, Region, ER_TIMEOUT};

/// One scripted result for [`CameraSdk::recv_frame`].
#[derive(Debug, Clone)]
pub enum RecvStep {
    /// Return [`ER_TIMEOUT`], deliver nothing.
    Timeout,
    /// Copy these bytes into the caller's buffer and return their length.
    Data(Vec<u8>),
    /// Return this (negative) status.
    Error(i32),
}

/// Status returned when a script queue runs dry, distinct from every code
/// the bridge treats specially.
pub const SCRIPT_EXHAUSTED: i32 = -9999;

#[derive(Default)]
pub struct MockSdk {
    connect_results: Mutex<VecDeque<i32>>,
    parallel_results: Mutex<VecDeque<i32>>,
    client_start_results: Mutex<VecDeque<i32>>,
    recv_steps: Mutex<VecDeque<RecvStep>>,
    alloc_session_result: Mutex<i32>,
    init_result: Mutex<i32>,
    av_init_result: Mutex<i32>,
    events: Arc<Mutex<Vec<String>>>,
}

impl MockSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue results for successive `connect_by_uid` calls.
    pub fn with_connect(self, results: &[i32]) -> Self {
        self.connect_results.lock().unwrap().extend(results);
        self
    }

    /// Queue results for successive `connect_by_uid_parallel` calls.
    pub fn with_parallel_connect(self, results: &[i32]) -> Self {
        self.parallel_results.lock().unwrap().extend(results);
        self
    }

    /// Queue results for successive `client_start` calls.
    pub fn with_client_start(self, results: &[i32]) -> Self {
        self.client_start_results.lock().unwrap().extend(results);
        self
    }

    /// Queue receive steps for the relay loop.
    pub fn with_recv(self, steps: Vec<RecvStep>) -> Self {
        self.recv_steps.lock().unwrap().extend(steps);
        self
    }

    pub fn with_alloc_session(self, sid: i32) -> Self {
        *self.alloc_session_result.lock().unwrap() = sid;
        self
    }

    pub fn with_init_result(self, status: i32) -> Self {
        *self.init_result.lock().unwrap() = status;
        self
    }

    pub fn with_av_init_result(self, status: i32) -> Self {
        *self.av_init_result.lock().unwrap() = status;
        self
    }

    /// Shared event log; clone the handle to record externally observed
    /// events (e.g. bytes crossing the signaling channel) in sequence with
    /// SDK calls.
    pub fn events(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.events)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    fn pop(queue: &Mutex<VecDeque<i32>>) -> i32 {
        queue.lock().unwrap().pop_front().unwrap_or(SCRIPT_EXHAUSTED)
    }
}

impl CameraSdk for MockSdk {
    fn version(&self) -> Option<String> {
        Some("0.0.0.0".to_string())
    }

    fn set_region(&self, region: Region) -> i32 {
        self.record(format!("set_region:{}", region.code()));
        0
    }

    fn set_license_key(&self, _key: &str) -> i32 {
        self.record("set_license_key");
        0
    }

    fn init(&self) -> i32 {
        self.record("init");
        *self.init_result.lock().unwrap()
    }

    fn deinit(&self) -> i32 {
        self.record("deinit");
        0
    }

    fn av_init(&self, _max_channels: i32) -> i32 {
        self.record("av_init");
        *self.av_init_result.lock().unwrap()
    }

    fn av_deinit(&self) -> i32 {
        self.record("av_deinit");
        0
    }

    fn connect_by_uid(&self, _uid: &str) -> i32 {
        self.record("connect_by_uid");
        Self::pop(&self.connect_results)
    }

    fn alloc_session_id(&self) -> i32 {
        self.record("alloc_session_id");
        *self.alloc_session_result.lock().unwrap()
    }

    fn connect_by_uid_parallel(&self, _uid: &str, sid: i32) -> i32 {
        self.record(format!("connect_by_uid_parallel:{sid}"));
        Self::pop(&self.parallel_results)
    }

    fn session_close(&self, sid: i32) {
        self.record(format!("session_close:{sid}"));
    }

    fn client_start(
        &self,
        _sid: i32,
        _account: &str,
        _password: &str,
        _timeout_secs: u32,
        _channel: u32,
    ) -> i32 {
        self.record("client_start");
        Self::pop(&self.client_start_results)
    }

    fn client_stop(&self, av_index: i32) {
        self.record(format!("client_stop:{av_index}"));
    }

    fn send_ioctl(&self, _av_index: i32, ctrl_type: u32, payload: &[u8]) -> i32 {
        self.record(format!("send_ioctl:{ctrl_type:#x}:{payload:02x?}"));
        0
    }

    fn recv_frame(&self, _av_index: i32, buf: &mut [u8]) -> i32 {
        let step = self.recv_steps.lock().unwrap().pop_front();
        match step {
            Some(RecvStep::Timeout) => ER_TIMEOUT,
            Some(RecvStep::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                n as i32
            }
            Some(RecvStep::Error(status)) => status,
            None => SCRIPT_EXHAUSTED,
        }
    }
}
