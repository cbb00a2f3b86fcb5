//! Boundary crate for the vendor IOTC/AV session SDK.
//!
//! The vendor ships two native shared libraries (`libIOTCAPIs.so` for the
//! peer-to-peer transport, `libAVAPIs.so` for the authenticated media
//! channel). Everything the rest of the bridge needs from them is expressed
//! through the [`CameraSdk`] trait; [`NativeSdk`] binds the real libraries
//! at runtime, [`MockSdk`] scripts them for tests.

pub mod error;
pub mod mock;
pub mod native;
pub mod sdk;

pub use error::SdkError;
pub use mock::{MockSdk, RecvStep, SCRIPT_EXHAUSTED};
pub use native::NativeSdk;
pub use sdk::{CameraSdk, Region, ER_TIMEOUT};
