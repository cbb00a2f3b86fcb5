//! Dynamic binding to the vendor shared libraries.
//!
//! The libraries are loaded at runtime rather than linked, because the
//! vendor ships several incompatible builds per device family and the
//! right pair is only known on the deployment host. Symbols are resolved
//! per call, the same way the exported symbol set varies between builds:
//! a missing optional symbol (version query, region/license setters, the
//! media init pair) is logged and treated as a no-op success, which is the
//! observed behavior of builds that omit them.

use std::env;
use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_uint, c_ushort};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, warn};

use crate::error::SdkError;
use crate::sdk::{CameraSdk, Region};

/// Status returned when a required symbol is missing or an argument cannot
/// cross the FFI boundary. Any negative value short of [`crate::ER_TIMEOUT`]
/// is treated identically by callers.
const CALL_FAILED: i32 = -1;

const IOTC_LIB: &str = "libIOTCAPIs.so";
const AV_LIB: &str = "libAVAPIs.so";

/// The real vendor SDK, bound via `dlopen`.
pub struct NativeSdk {
    iotc: Library,
    av: Library,
}

impl NativeSdk {
    /// Load both vendor libraries.
    ///
    /// Explicit paths win; otherwise `/usr/lib` is probed first (where the
    /// deployment image installs them), then the working directory. The
    /// transport library is opened with `RTLD_GLOBAL` so the media library
    /// can resolve its symbols.
    pub fn load(iotc_path: Option<PathBuf>, av_path: Option<PathBuf>) -> Result<Self, SdkError> {
        let iotc_path = resolve(iotc_path, IOTC_LIB)?;
        let av_path = resolve(av_path, AV_LIB)?;

        let iotc = open_global(&iotc_path)?;
        let av = open(&av_path)?;
        debug!(iotc = %iotc_path.display(), av = %av_path.display(), "vendor libraries loaded");

        Ok(Self { iotc, av })
    }

    fn required<'a, T>(&self, lib: &'a Library, name: &str) -> Option<Symbol<'a, T>> {
        match unsafe { lib.get(&nul_terminated(name)) } {
            Ok(f) => Some(f),
            Err(e) => {
                warn!("required SDK symbol {name} unavailable: {e}");
                None
            }
        }
    }

    fn optional<'a, T>(&self, lib: &'a Library, name: &str) -> Option<Symbol<'a, T>> {
        match unsafe { lib.get(&nul_terminated(name)) } {
            Ok(f) => Some(f),
            Err(_) => {
                debug!("optional SDK symbol {name} not exported by this build");
                None
            }
        }
    }
}

/// Symbol name in the form the loader wants it.
fn nul_terminated(name: &str) -> Vec<u8> {
    let mut symbol = Vec::with_capacity(name.len() + 1);
    symbol.extend_from_slice(name.as_bytes());
    symbol.push(0);
    symbol
}

fn resolve(explicit: Option<PathBuf>, file_name: &str) -> Result<PathBuf, SdkError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let candidates = [
        PathBuf::from("/usr/lib").join(file_name),
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(file_name),
    ];
    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.clone());
        }
    }
    Err(SdkError::LibraryNotFound {
        searched: candidates.to_vec(),
    })
}

#[cfg(unix)]
fn open_global(path: &Path) -> Result<Library, SdkError> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
    let lib = unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map_err(|e| {
        SdkError::LibraryLoad {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    Ok(lib.into())
}

#[cfg(not(unix))]
fn open_global(path: &Path) -> Result<Library, SdkError> {
    open(path)
}

fn open(path: &Path) -> Result<Library, SdkError> {
    unsafe { Library::new(path) }.map_err(|e| SdkError::LibraryLoad {
        path: path.to_path_buf(),
        source: e,
    })
}

fn cstring(value: &str) -> Option<CString> {
    CString::new(value).ok()
}

impl CameraSdk for NativeSdk {
    fn version(&self) -> Option<String> {
        type VersionFn = unsafe extern "C" fn(*mut c_uint);
        let f: Symbol<VersionFn> = self.optional(&self.iotc, "IOTC_Get_Version")?;
        let mut packed: c_uint = 0;
        unsafe { f(&mut packed) };
        Some(format!(
            "{}.{}.{}.{}",
            (packed >> 24) & 0xff,
            (packed >> 16) & 0xff,
            (packed >> 8) & 0xff,
            packed & 0xff
        ))
    }

    fn set_region(&self, region: Region) -> i32 {
        type SetRegionFn = unsafe extern "C" fn(c_int) -> c_int;
        match self.optional::<SetRegionFn>(&self.iotc, "TUTK_SDK_Set_Region") {
            Some(f) => unsafe { f(region.code()) },
            None => 0,
        }
    }

    fn set_license_key(&self, key: &str) -> i32 {
        type SetLicenseFn = unsafe extern "C" fn(*const c_char) -> c_int;
        let f = match self.optional::<SetLicenseFn>(&self.iotc, "TUTK_SDK_Set_License_Key") {
            Some(f) => f,
            None => return 0,
        };
        match cstring(key) {
            Some(key) => unsafe { f(key.as_ptr()) },
            None => CALL_FAILED,
        }
    }

    fn init(&self) -> i32 {
        type InitFn = unsafe extern "C" fn(c_ushort) -> c_int;
        match self.required::<InitFn>(&self.iotc, "IOTC_Initialize2") {
            // 0 = let the library pick its own UDP port
            Some(f) => unsafe { f(0) },
            None => CALL_FAILED,
        }
    }

    fn deinit(&self) -> i32 {
        type DeinitFn = unsafe extern "C" fn() -> c_int;
        match self.required::<DeinitFn>(&self.iotc, "IOTC_DeInitialize") {
            Some(f) => unsafe { f() },
            None => CALL_FAILED,
        }
    }

    fn av_init(&self, max_channels: i32) -> i32 {
        type AvInitFn = unsafe extern "C" fn(c_int) -> c_int;
        match self.optional::<AvInitFn>(&self.av, "avInitialize") {
            Some(f) => unsafe { f(max_channels) },
            None => 0,
        }
    }

    fn av_deinit(&self) -> i32 {
        type AvDeinitFn = unsafe extern "C" fn() -> c_int;
        match self.optional::<AvDeinitFn>(&self.av, "avDeInitialize") {
            Some(f) => unsafe { f() },
            None => 0,
        }
    }

    fn connect_by_uid(&self, uid: &str) -> i32 {
        type ConnectFn = unsafe extern "C" fn(*const c_char) -> c_int;
        let f = match self.required::<ConnectFn>(&self.iotc, "IOTC_Connect_ByUID") {
            Some(f) => f,
            None => return CALL_FAILED,
        };
        match cstring(uid) {
            Some(uid) => unsafe { f(uid.as_ptr()) },
            None => CALL_FAILED,
        }
    }

    fn alloc_session_id(&self) -> i32 {
        type GetSidFn = unsafe extern "C" fn() -> c_int;
        match self.required::<GetSidFn>(&self.iotc, "IOTC_Get_SessionID") {
            Some(f) => unsafe { f() },
            None => CALL_FAILED,
        }
    }

    fn connect_by_uid_parallel(&self, uid: &str, sid: i32) -> i32 {
        type ConnectParallelFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
        let f = match self.required::<ConnectParallelFn>(&self.iotc, "IOTC_Connect_ByUID_Parallel")
        {
            Some(f) => f,
            None => return CALL_FAILED,
        };
        match cstring(uid) {
            Some(uid) => unsafe { f(uid.as_ptr(), sid) },
            None => CALL_FAILED,
        }
    }

    fn session_close(&self, sid: i32) {
        type CloseFn = unsafe extern "C" fn(c_int);
        if let Some(f) = self.optional::<CloseFn>(&self.iotc, "IOTC_Session_Close") {
            unsafe { f(sid) };
        }
    }

    fn client_start(
        &self,
        sid: i32,
        account: &str,
        password: &str,
        timeout_secs: u32,
        channel: u32,
    ) -> i32 {
        type ClientStartFn = unsafe extern "C" fn(
            c_int,
            *const c_char,
            *const c_char,
            c_uint,
            *mut c_uint,
            c_uint,
        ) -> c_int;
        let f = match self.required::<ClientStartFn>(&self.av, "avClientStart") {
            Some(f) => f,
            None => return CALL_FAILED,
        };
        let (account, password) = match (cstring(account), cstring(password)) {
            (Some(a), Some(p)) => (a, p),
            _ => return CALL_FAILED,
        };
        // In/out service-type argument; 0 selects the simple-auth service
        // the device family speaks.
        let mut serv_type: c_uint = 0;
        unsafe {
            f(
                sid,
                account.as_ptr(),
                password.as_ptr(),
                timeout_secs,
                &mut serv_type,
                channel,
            )
        }
    }

    fn client_stop(&self, av_index: i32) {
        type ClientStopFn = unsafe extern "C" fn(c_int);
        if let Some(f) = self.optional::<ClientStopFn>(&self.av, "avClientStop") {
            unsafe { f(av_index) };
        }
    }

    fn send_ioctl(&self, av_index: i32, ctrl_type: u32, payload: &[u8]) -> i32 {
        type SendIoctlFn = unsafe extern "C" fn(c_int, c_uint, *const c_char, c_int) -> c_int;
        let f = match self.required::<SendIoctlFn>(&self.av, "avSendIOCtrl") {
            Some(f) => f,
            None => return CALL_FAILED,
        };
        unsafe {
            f(
                av_index,
                ctrl_type,
                payload.as_ptr() as *const c_char,
                payload.len() as c_int,
            )
        }
    }

    fn recv_frame(&self, av_index: i32, buf: &mut [u8]) -> i32 {
        type RecvFrameFn = unsafe extern "C" fn(
            c_int,
            *mut c_char,
            c_int,
            *mut c_int,
            *mut c_int,
            *mut c_char,
            c_int,
            *mut c_int,
            *mut c_int,
        ) -> c_int;
        let f = match self.required::<RecvFrameFn>(&self.av, "avRecvFrameData2") {
            Some(f) => f,
            None => return CALL_FAILED,
        };
        let mut out_buf_size: c_int = 0;
        let mut out_frame_size: c_int = 0;
        let mut frame_index: c_int = 0;
        let mut key_frame: c_int = 0;
        // Oversized frame-info buffer; the struct is 24 bytes in most
        // builds but larger variants exist. Its contents are discarded
        // along with the other out-parameters: only the positive return
        // ("this many bytes are valid in buf") is trusted.
        let mut frame_info = [0u8; 128];
        unsafe {
            f(
                av_index,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as c_int,
                &mut out_buf_size,
                &mut out_frame_size,
                frame_info.as_mut_ptr() as *mut c_char,
                frame_info.len() as c_int,
                &mut frame_index,
                &mut key_frame,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_are_nul_terminated() {
        assert_eq!(nul_terminated("IOTC_Initialize2"), b"IOTC_Initialize2\0");
        assert_eq!(nul_terminated(""), b"\0");
    }
}
