//! The streaming relay: drain decoded frames from the SDK and write them
//! verbatim to the sink.
//!
//! Runs on a blocking thread inside the worker process for the remaining
//! lifetime of that process. Frames are opaque H.264 elementary-stream
//! bytes; nothing is parsed, buffered or reframed, and every write is
//! flushed immediately — downstream consumers want latency, not
//! throughput.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use iotc::{CameraSdk, ER_TIMEOUT};

use crate::config::AttemptConfig;
use crate::control;

/// Handles owned by the worker for the duration of one attempt.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    pub sid: i32,
    pub av_index: i32,
}

/// Why the relay left its receive loop.
#[derive(Debug)]
pub enum StopReason {
    /// External interrupt (Ctrl-C).
    Interrupted,
    /// The SDK returned a non-timeout negative status.
    ReceiveError(i32),
    /// The downstream consumer went away.
    SinkClosed(std::io::Error),
}

/// Start the stream, relay until it dies, then tear everything down.
///
/// Teardown is best-effort in a fixed order — stop-stream ioctl, media
/// client, session handle, media subsystem, transport — and a failing step
/// is logged, never allowed to abort the rest of the sequence.
pub fn run(
    sdk: &dyn CameraSdk,
    session: Session,
    cfg: &AttemptConfig,
    sink: &mut dyn Write,
    stop: &AtomicBool,
) -> StopReason {
    let payload = control::stream_payload(cfg.channel);
    let status = sdk.send_ioctl(session.av_index, control::IOTYPE_USER_IPCAM_START, &payload);
    if status < 0 {
        warn!("start-stream ioctl returned {status}, streaming anyway");
    }
    info!("stream started, relaying to output");

    let mut buf = vec![0u8; cfg.recv_buffer_size];
    let reason = receive_loop(sdk, session.av_index, &mut buf, sink, stop);

    match &reason {
        StopReason::Interrupted => info!("stream interrupted, shutting down"),
        StopReason::ReceiveError(status) => warn!("frame receive failed (status {status})"),
        StopReason::SinkClosed(e) => warn!("output sink closed: {e}"),
    }
    shutdown(sdk, session, cfg);
    reason
}

fn receive_loop(
    sdk: &dyn CameraSdk,
    av_index: i32,
    buf: &mut [u8],
    sink: &mut dyn Write,
    stop: &AtomicBool,
) -> StopReason {
    loop {
        if stop.load(Ordering::Relaxed) {
            return StopReason::Interrupted;
        }
        let ret = sdk.recv_frame(av_index, buf);
        if ret > 0 {
            let n = ret as usize;
            if let Err(e) = sink.write_all(&buf[..n]).and_then(|_| sink.flush()) {
                return StopReason::SinkClosed(e);
            }
        } else if ret == ER_TIMEOUT {
            // No data yet; the receive call is internally timed, so no
            // extra backoff here.
            continue;
        } else {
            return StopReason::ReceiveError(ret);
        }
    }
}

fn shutdown(sdk: &dyn CameraSdk, session: Session, cfg: &AttemptConfig) {
    let payload = control::stream_payload(cfg.channel);
    let status = sdk.send_ioctl(session.av_index, control::IOTYPE_USER_IPCAM_STOP, &payload);
    if status < 0 {
        warn!("stop-stream ioctl returned {status}");
    }
    sdk.client_stop(session.av_index);
    sdk.session_close(session.sid);
    let status = sdk.av_deinit();
    if status < 0 {
        warn!("media subsystem shutdown returned {status}");
    }
    let status = sdk.deinit();
    if status < 0 {
        warn!("transport shutdown returned {status}");
    }
    debug!("session released");
}
