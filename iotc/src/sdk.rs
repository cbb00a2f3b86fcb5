//! The capability surface of the vendor SDK.
//!
//! Every call is synchronous and returns a signed status: negative means
//! failure, and [`ER_TIMEOUT`] is the only negative value with a defined
//! meaning ("timed out, safe to retry the same call"). No finer error-code
//! taxonomy is assumed reliable across device firmware versions.

/// The distinguished "timed out" status (`IOTC_ER_TIMEOUT`). Shared by the
/// transport and media libraries.
pub const ER_TIMEOUT: i32 = -20012;

/// Server-region selector applied to the SDK's global state before
/// initialization. Values match the vendor's region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    All,
    China,
    Europe,
    UnitedStates,
}

impl Region {
    pub fn code(self) -> i32 {
        match self {
            Region::All => 0,
            Region::China => 1,
            Region::Europe => 2,
            Region::UnitedStates => 3,
        }
    }
}

/// Black-box view of the vendor session/media SDK.
///
/// Implementations: [`crate::NativeSdk`] (dynamic binding to the vendor
/// `.so` files) and [`crate::MockSdk`] (scripted, for tests). The trait is
/// deliberately narrow: only the calls the bridge actually issues, with
/// pointer-style out-parameters folded away.
pub trait CameraSdk: Send + Sync {
    /// Vendor library version string, when the version symbol exists.
    fn version(&self) -> Option<String>;

    /// Select the server region. Mutates library-global state; a failure
    /// here is reported but connects are attempted regardless.
    fn set_region(&self, region: Region) -> i32;

    /// Apply a license key. Same global-state caveats as [`Self::set_region`].
    fn set_license_key(&self, key: &str) -> i32;

    /// Initialize the peer-to-peer transport (`IOTC_Initialize2`).
    fn init(&self) -> i32;

    /// Tear down the transport (`IOTC_DeInitialize`).
    fn deinit(&self) -> i32;

    /// Initialize the media subsystem (`avInitialize`).
    fn av_init(&self, max_channels: i32) -> i32;

    /// Tear down the media subsystem (`avDeInitialize`).
    fn av_deinit(&self) -> i32;

    /// Direct connect (`IOTC_Connect_ByUID`). Returns a session id, or a
    /// negative status. May block for a long time; may never return.
    fn connect_by_uid(&self, uid: &str) -> i32;

    /// Pre-allocate a session id for a parallel connect
    /// (`IOTC_Get_SessionID`). The returned id is single-use.
    fn alloc_session_id(&self) -> i32;

    /// Parallel connect using a pre-allocated session id
    /// (`IOTC_Connect_ByUID_Parallel`).
    fn connect_by_uid_parallel(&self, uid: &str, sid: i32) -> i32;

    /// Close a session handle. Best-effort, no status.
    fn session_close(&self, sid: i32);

    /// Start the authenticated media client (`avClientStart`). Returns an
    /// AV channel index, or a negative status.
    fn client_start(
        &self,
        sid: i32,
        account: &str,
        password: &str,
        timeout_secs: u32,
        channel: u32,
    ) -> i32;

    /// Stop the media client. Best-effort, no status.
    fn client_stop(&self, av_index: i32);

    /// Send a control payload on the media channel (`avSendIOCtrl`).
    fn send_ioctl(&self, av_index: i32, ctrl_type: u32, payload: &[u8]) -> i32;

    /// Receive one media frame into `buf` (`avRecvFrameData2`).
    ///
    /// A positive return is the number of valid bytes at the front of
    /// `buf`; [`ER_TIMEOUT`] means no data yet. The call's extra
    /// frame-info out-parameters are discarded: the positive-return
    /// contract is the only behavior observed to hold across firmware
    /// variants.
    fn recv_frame(&self, av_index: i32, buf: &mut [u8]) -> i32;
}
