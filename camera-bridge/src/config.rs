//! Runtime configuration.
//!
//! Two required CLI arguments (device UID, auth key); everything else is
//! fixed defaults with environment overrides, read once at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Optional license key applied to the SDK before initialization.
pub const LICENSE_KEY_ENV: &str = "TUTK_LICENSE_KEY";
/// Overrides the strategy-state file location.
pub const STATE_FILE_ENV: &str = "BRIDGE_STATE_FILE";
/// Override paths for the vendor libraries.
pub const IOTC_LIB_ENV: &str = "IOTC_LIB_PATH";
pub const AV_LIB_ENV: &str = "AV_LIB_PATH";

const DEFAULT_STATE_FILE: &str = "camera-bridge-state.json";

/// Knobs for one connection attempt.
#[derive(Debug, Clone)]
pub struct AttemptConfig {
    /// Sequential-connect and client-start retry budget.
    pub max_retries: u32,
    /// Pause between in-process retries.
    pub retry_pause: Duration,
    /// Auth handshake bound passed to the media client.
    pub auth_timeout_secs: u32,
    /// Account paired with the auth key; the device family hardcodes it.
    pub account: String,
    /// Media channel to open and stream.
    pub channel: u32,
    /// Reusable receive buffer size.
    pub recv_buffer_size: usize,
}

impl Default for AttemptConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_pause: Duration::from_secs(1),
            auth_timeout_secs: 30,
            account: "admin".to_string(),
            channel: 0,
            recv_buffer_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub uid: String,
    pub auth_key: String,
    pub state_path: PathBuf,
    /// Bound on the wait for the worker's ready marker. Connects that the
    /// SDK will ever complete finish well inside this.
    pub watchdog_timeout: Duration,
    /// Pause before a failure exit, so an eager external restart loop
    /// cannot spin hot against an unreachable device.
    pub failure_exit_delay: Duration,
    pub license_key: Option<String>,
    pub iotc_lib_path: Option<PathBuf>,
    pub av_lib_path: Option<PathBuf>,
    pub attempt: AttemptConfig,
}

impl BridgeConfig {
    pub fn from_env(uid: String, auth_key: String) -> Self {
        Self {
            uid,
            auth_key,
            state_path: env::var_os(STATE_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            watchdog_timeout: Duration::from_secs(15),
            failure_exit_delay: Duration::from_secs(2),
            license_key: env::var(LICENSE_KEY_ENV).ok(),
            iotc_lib_path: env::var_os(IOTC_LIB_ENV).map(PathBuf::from),
            av_lib_path: env::var_os(AV_LIB_ENV).map(PathBuf::from),
            attempt: AttemptConfig::default(),
        }
    }
}
