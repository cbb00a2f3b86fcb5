//! The watchdog supervisor.
//!
//! Bounds the one thing that cannot be bounded from inside: a vendor
//! connect call that never returns. The worker runs as a child process;
//! the supervisor waits up to the watchdog timeout for the ready marker on
//! the child's stdout and kills the child outright if it never arrives.
//! Escalation to the next strategy is not done here — every failure path
//! just leaves the state `pending` and exits non-zero, and the *next*
//! invocation's load advances the index. That keeps the rotation
//! idempotent and driven entirely by the external restart loop.

use std::future::Future;
use std::process::{ExitCode, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::state::{StateStore, Status, StrategyState};
use crate::strategy::{self, CATALOG};
use crate::worker::READY_MARKER;

/// What the bounded wait for the ready marker observed.
#[derive(Debug, PartialEq, Eq)]
enum ReadySignal {
    /// Marker arrived; the strategy works.
    Ready,
    /// The child's stdout closed before the marker: it failed fast.
    EarlyExit,
    /// Not the marker. A worker that prints anything else to stdout is
    /// broken and cannot be trusted with the stream.
    Unexpected(u8),
    /// The bound elapsed; the child is presumed hung.
    TimedOut,
}

/// The state an invocation runs under: escalate if the previous run left
/// `pending`, then mark this attempt `pending` at the chosen index.
pub fn plan_attempt(loaded: StrategyState, catalog_len: usize) -> StrategyState {
    loaded.advance(catalog_len).with_status(Status::Pending)
}

/// Supervisor entry point for one invocation.
pub async fn run(cfg: &BridgeConfig) -> ExitCode {
    let store = StateStore::new(&cfg.state_path);
    let loaded = store.load(CATALOG.len());
    let plan = plan_attempt(loaded, CATALOG.len());
    if loaded.status == Status::Pending {
        info!(
            from = loaded.index,
            to = plan.index,
            "previous attempt never connected, escalating strategy"
        );
    }
    let chosen = strategy::select(&plan);
    info!(index = plan.index, strategy = chosen.name, "selected connection strategy");

    // Crash-safety anchor: from here on, dying by any means leaves
    // `pending` behind and the next invocation escalates.
    store.save(&plan);

    let mut child = match spawn_worker(cfg, plan.index) {
        Ok(child) => child,
        Err(e) => {
            error!("failed to spawn connection worker: {e}");
            return fail(cfg).await;
        }
    };
    let mut child_out = match child.stdout.take() {
        Some(out) => out,
        None => {
            error!("worker spawned without piped stdout");
            let _ = child.kill().await;
            return fail(cfg).await;
        }
    };

    match await_ready(&mut child_out, cfg.watchdog_timeout).await {
        ReadySignal::Ready => {
            info!(strategy = chosen.name, "strategy proven, pinning it");
            store.save(&plan.with_status(Status::Connected));
            // Take over SIGINT handling for the rest of the run: the
            // worker sees the same interrupt, winds the stream down and
            // exits cleanly, and its status must drive ours — dying to
            // the default signal disposition mid-pump would sever the
            // stream and misreport an interrupted-but-connected run.
            let interrupt = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            let mut stdout = tokio::io::stdout();
            match stream_until_exit(&mut child, &mut child_out, interrupt, &mut stdout).await {
                StreamEnd::CleanExit | StreamEnd::ConsumerGone => ExitCode::SUCCESS,
                StreamEnd::WorkerFailure => ExitCode::FAILURE,
            }
        }
        ReadySignal::EarlyExit => {
            let status = child.wait().await;
            warn!("worker gave up before the watchdog fired ({status:?})");
            fail(cfg).await
        }
        ReadySignal::Unexpected(byte) => {
            error!("unexpected byte {byte:#04x} on signaling channel, terminating worker");
            kill(&mut child).await;
            fail(cfg).await
        }
        ReadySignal::TimedOut => {
            warn!(
                timeout_secs = cfg.watchdog_timeout.as_secs(),
                "no success signal within bound, terminating worker"
            );
            kill(&mut child).await;
            fail(cfg).await
        }
    }
}

fn spawn_worker(cfg: &BridgeConfig, index: usize) -> std::io::Result<Child> {
    let exe = std::env::current_exe()?;
    Command::new(exe)
        .arg(&cfg.uid)
        .arg(&cfg.auth_key)
        .arg("--connect-worker")
        .arg(index.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
}

/// Wait up to `bound` for the one-byte ready marker.
async fn await_ready<R: AsyncRead + Unpin>(reader: &mut R, bound: Duration) -> ReadySignal {
    let mut byte = [0u8; 1];
    match timeout(bound, reader.read_exact(&mut byte)).await {
        Ok(Ok(_)) if byte[0] == READY_MARKER => ReadySignal::Ready,
        Ok(Ok(_)) => ReadySignal::Unexpected(byte[0]),
        Ok(Err(_)) => ReadySignal::EarlyExit,
        Err(_) => ReadySignal::TimedOut,
    }
}

/// How the post-marker streaming phase ended.
#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    /// The child exited on its own with a clean status.
    CleanExit,
    /// The child exited on its own with a failure status.
    WorkerFailure,
    /// The downstream consumer went away; the child was terminated. The
    /// run still reached a live stream, so this counts as a natural end.
    ConsumerGone,
}

/// Success path: pump the child's stdout — now pure stream bytes — to the
/// sink, flushing per chunk, until the child exits on its own. From here
/// the run counts as connected, so the child is never watchdog-killed for
/// being slow; only a vanished downstream consumer ends it early.
///
/// `interrupt` resolving does not stop the pump: an interrupt reaches the
/// worker too, which tears the stream down and closes its stdout, and the
/// loop runs to that EOF so the child's own status can drive the outcome.
async fn stream_until_exit(
    child: &mut Child,
    child_out: &mut (impl AsyncRead + Unpin),
    interrupt: impl Future<Output = ()>,
    out: &mut (impl AsyncWrite + Unpin),
) -> StreamEnd {
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        tokio::select! {
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                info!("interrupt received, waiting for worker to wind down");
            }
            read = child_out.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let write = async {
                        out.write_all(&buf[..n]).await?;
                        out.flush().await
                    };
                    if let Err(e) = write.await {
                        info!("output consumer went away ({e}), stopping relay");
                        kill(child).await;
                        return StreamEnd::ConsumerGone;
                    }
                }
                Err(e) => {
                    warn!("lost worker stdout: {e}");
                    break;
                }
            }
        }
    }
    match child.wait().await {
        Ok(status) if status.success() => StreamEnd::CleanExit,
        Ok(status) => {
            warn!("worker exited with {status}");
            StreamEnd::WorkerFailure
        }
        Err(e) => {
            error!("failed to reap worker: {e}");
            StreamEnd::WorkerFailure
        }
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to terminate worker: {e}");
    }
}

/// Common failure exit: pause briefly so an external restart loop cannot
/// hammer an unreachable device, then report failure.
async fn fail(cfg: &BridgeConfig) -> ExitCode {
    tokio::time::sleep(cfg.failure_exit_delay).await;
    ExitCode::FAILURE
}

#[cfg(test)]
mod ready_tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn marker_byte_reads_as_ready() {
        let (mut client, mut server) = tokio::io::duplex(8);
        client.write_all(&[READY_MARKER]).await.unwrap();
        let signal = await_ready(&mut server, Duration::from_secs(1)).await;
        assert_eq!(signal, ReadySignal::Ready);
    }

    #[tokio::test]
    async fn closed_channel_reads_as_early_exit() {
        let (client, mut server) = tokio::io::duplex(8);
        drop(client);
        let signal = await_ready(&mut server, Duration::from_secs(1)).await;
        assert_eq!(signal, ReadySignal::EarlyExit);
    }

    #[tokio::test]
    async fn wrong_byte_is_a_protocol_violation() {
        let (mut client, mut server) = tokio::io::duplex(8);
        client.write_all(b"x").await.unwrap();
        let signal = await_ready(&mut server, Duration::from_secs(1)).await;
        assert_eq!(signal, ReadySignal::Unexpected(b'x'));
    }

    #[tokio::test]
    async fn silence_times_out() {
        let (_client, mut server) = tokio::io::duplex(8);
        let signal = await_ready(&mut server, Duration::from_millis(20)).await;
        assert_eq!(signal, ReadySignal::TimedOut);
    }
}

#[cfg(all(test, unix))]
mod stream_tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn spawn_sh(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn interrupt_does_not_sever_the_pump() {
        let mut child = spawn_sh("printf abc");
        let mut child_out = child.stdout.take().unwrap();
        let mut sink = Vec::new();

        // interrupt already delivered: the pump must still run to the
        // child's own exit and report the child's clean status
        let end = stream_until_exit(
            &mut child,
            &mut child_out,
            std::future::ready(()),
            &mut sink,
        )
        .await;

        assert_eq!(end, StreamEnd::CleanExit);
        assert_eq!(sink, b"abc");
    }

    #[tokio::test]
    async fn worker_failure_status_is_mirrored() {
        let mut child = spawn_sh("exit 3");
        let mut child_out = child.stdout.take().unwrap();
        let mut sink = Vec::new();

        let end = stream_until_exit(
            &mut child,
            &mut child_out,
            std::future::pending(),
            &mut sink,
        )
        .await;

        assert_eq!(end, StreamEnd::WorkerFailure);
        assert!(sink.is_empty());
    }

    struct ClosedSink;

    impl AsyncWrite for ClosedSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(io::ErrorKind::BrokenPipe)))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn vanished_consumer_terminates_worker_as_natural_end() {
        let mut child = spawn_sh("printf abc; sleep 5");
        let mut child_out = child.stdout.take().unwrap();

        let end = stream_until_exit(
            &mut child,
            &mut child_out,
            std::future::pending(),
            &mut ClosedSink,
        )
        .await;

        assert_eq!(end, StreamEnd::ConsumerGone);
        // the child was already terminated; reaping must not hang
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
