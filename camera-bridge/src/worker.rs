//! The connection worker: one strategy, end to end, in its own process.
//!
//! The supervisor re-executes this binary with a hidden flag naming the
//! catalog index to try; process isolation is what makes a hung connect
//! call killable, since the SDK offers no cooperative cancellation. The
//! only signal the worker ever sends back is [`READY_MARKER`], written to
//! stdout the moment a connect returns a valid session handle — strictly
//! before any media-client call. After the marker, stdout carries nothing
//! but raw stream bytes.

use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use iotc::{CameraSdk, NativeSdk, ER_TIMEOUT};

use crate::config::BridgeConfig;
use crate::errors::AttemptError;
use crate::relay::{self, Session, StopReason};
use crate::state::{Status, StrategyState};
use crate::strategy::{self, ConnectMethod, Strategy};

/// The one byte that crosses the supervisor/worker boundary: connect
/// succeeded, the strategy works, stop the watchdog clock.
pub const READY_MARKER: u8 = 0x06;

/// Worker-process entry point. Exit code 0 means the run reached a live
/// stream and ended; any attempt failure exits non-zero without the
/// marker, which the supervisor treats as a failed strategy.
pub async fn run(cfg: &BridgeConfig, index: usize) -> ExitCode {
    let sdk = match NativeSdk::load(cfg.iotc_lib_path.clone(), cfg.av_lib_path.clone()) {
        Ok(sdk) => sdk,
        Err(e) => {
            error!("cannot load vendor SDK: {e}");
            return ExitCode::FAILURE;
        }
    };

    let state = StrategyState {
        index,
        status: Status::Pending,
    };
    let strategy = strategy::select(&state);
    info!(strategy = strategy.name, "worker starting connection attempt");

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let attempt_cfg = cfg.clone();
    let stop_flag = Arc::clone(&stop);
    // The SDK blocks the calling thread, sometimes forever; keep it off
    // the runtime threads.
    let outcome = tokio::task::spawn_blocking(move || {
        let mut out = std::io::stdout().lock();
        run_attempt(&sdk, &attempt_cfg, strategy, &mut out, &stop_flag)
    })
    .await;

    match outcome {
        Ok(Ok(reason)) => {
            info!("stream ended: {reason:?}");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!("connection attempt failed: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("worker thread lost: {e}");
            ExitCode::FAILURE
        }
    }
}

/// One full attempt: global SDK setup, init, connect, signal, client
/// start, then hand off to the relay until the stream dies.
pub fn run_attempt(
    sdk: &dyn CameraSdk,
    cfg: &BridgeConfig,
    strategy: &Strategy,
    out: &mut dyn Write,
    stop: &AtomicBool,
) -> Result<StopReason, AttemptError> {
    if let Some(version) = sdk.version() {
        info!("vendor SDK version {version}");
    }

    // Region and license mutate library-global state. Their failures are
    // logged and ignored: builds that reject or omit these calls have
    // been observed to connect anyway.
    let status = sdk.set_region(strategy.region);
    if status < 0 {
        warn!(region = ?strategy.region, "set_region returned {status}, continuing");
    }
    match &cfg.license_key {
        Some(key) => {
            let status = sdk.set_license_key(key);
            if status < 0 {
                warn!("set_license_key returned {status}, continuing");
            }
        }
        None => info!("no license key in environment, continuing without one"),
    }

    let status = sdk.init();
    if status < 0 {
        return Err(AttemptError::InitFailed(status));
    }
    let status = sdk.av_init(1);
    if status < 0 {
        sdk.deinit();
        return Err(AttemptError::AvInitFailed(status));
    }

    let sid = match connect(sdk, cfg, strategy, stop) {
        Ok(sid) => sid,
        Err(e) => {
            sdk.av_deinit();
            sdk.deinit();
            return Err(e);
        }
    };
    info!(sid, strategy = strategy.name, "connected");

    // The watchdog is still ticking until this byte lands.
    if let Err(e) = out.write_all(&[READY_MARKER]).and_then(|_| out.flush()) {
        release(sdk, sid);
        return Err(AttemptError::Signal(e));
    }

    let av_index = match start_client(sdk, cfg, sid) {
        Ok(av_index) => av_index,
        Err(e) => {
            release(sdk, sid);
            return Err(e);
        }
    };
    info!(av_index, "media client started");

    let session = Session { sid, av_index };
    Ok(relay::run(sdk, session, &cfg.attempt, out, stop))
}

/// Connect with the strategy's method. Sequential retries the direct
/// primitive a bounded number of times; parallel gets exactly one shot on
/// its pre-allocated session id.
fn connect(
    sdk: &dyn CameraSdk,
    cfg: &BridgeConfig,
    strategy: &Strategy,
    stop: &AtomicBool,
) -> Result<i32, AttemptError> {
    match strategy.method {
        ConnectMethod::Sequential => {
            let mut last = ER_TIMEOUT;
            for attempt in 1..=cfg.attempt.max_retries {
                if stop.load(Ordering::Relaxed) {
                    return Err(AttemptError::Interrupted);
                }
                let sid = sdk.connect_by_uid(&cfg.uid);
                if sid >= 0 {
                    return Ok(sid);
                }
                if sid == ER_TIMEOUT {
                    info!(attempt, "connect timed out, retrying");
                } else {
                    warn!(attempt, "connect returned {sid}");
                }
                last = sid;
                if attempt < cfg.attempt.max_retries {
                    thread::sleep(cfg.attempt.retry_pause);
                }
            }
            Err(AttemptError::ConnectFailed(last))
        }
        ConnectMethod::Parallel => {
            let sid = sdk.alloc_session_id();
            if sid < 0 {
                return Err(AttemptError::SessionAllocFailed(sid));
            }
            let status = sdk.connect_by_uid_parallel(&cfg.uid, sid);
            if status >= 0 {
                Ok(status)
            } else {
                // The pre-allocated id is spent either way.
                sdk.session_close(sid);
                Err(AttemptError::ConnectFailed(status))
            }
        }
    }
}

fn start_client(sdk: &dyn CameraSdk, cfg: &BridgeConfig, sid: i32) -> Result<i32, AttemptError> {
    let mut last = ER_TIMEOUT;
    for attempt in 1..=cfg.attempt.max_retries {
        let av_index = sdk.client_start(
            sid,
            &cfg.attempt.account,
            &cfg.auth_key,
            cfg.attempt.auth_timeout_secs,
            cfg.attempt.channel,
        );
        if av_index >= 0 {
            return Ok(av_index);
        }
        warn!(attempt, "media client start returned {av_index}");
        last = av_index;
        if attempt < cfg.attempt.max_retries {
            thread::sleep(cfg.attempt.retry_pause);
        }
    }
    Err(AttemptError::ClientStartFailed(last))
}

/// Failure-path release of a session that never reached streaming.
fn release(sdk: &dyn CameraSdk, sid: i32) {
    sdk.session_close(sid);
    sdk.av_deinit();
    sdk.deinit();
}
