use thiserror::Error;

/// Why a connection attempt died before streaming.
///
/// Statuses are the vendor's signed codes, carried for the log line only;
/// apart from the timeout sentinel they are not interpreted. Failures here
/// never cross the worker/supervisor boundary as values — the worker just
/// exits without its ready marker.
#[derive(Error, Debug)]
pub enum AttemptError {
    #[error("transport initialization failed (status {0})")]
    InitFailed(i32),

    #[error("media subsystem initialization failed (status {0})")]
    AvInitFailed(i32),

    #[error("no session id available for parallel connect (status {0})")]
    SessionAllocFailed(i32),

    #[error("connect failed (last status {0})")]
    ConnectFailed(i32),

    #[error("media client start failed (last status {0})")]
    ClientStartFailed(i32),

    #[error("signaling channel closed: {0}")]
    Signal(#[from] std::io::Error),

    #[error("interrupted before connect completed")]
    Interrupted,
}
