//! The fixed table of connection strategies.
//!
//! Some region/method combinations hang forever inside the vendor SDK,
//! others fail fast, and which is which varies by device family and
//! network. The catalog orders the combinations cheapest-first and the
//! supervisor walks it one entry per failed run; it is never reordered at
//! runtime.

use iotc::Region;

use crate::state::StrategyState;

/// Which connect primitive an attempt uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectMethod {
    /// `IOTC_Connect_ByUID`, retried in-process a bounded number of times.
    Sequential,
    /// `IOTC_Connect_ByUID_Parallel` on a pre-allocated session id. Never
    /// retried in-process: the pre-allocated id is single-use.
    Parallel,
}

/// One (region, method) pair tried as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub region: Region,
    pub method: ConnectMethod,
    pub name: &'static str,
}

/// Ordering is significant: broadest region first, parallel before
/// sequential where both are worth trying.
pub const CATALOG: [Strategy; 7] = [
    Strategy {
        region: Region::All,
        method: ConnectMethod::Parallel,
        name: "all-regions/parallel",
    },
    Strategy {
        region: Region::All,
        method: ConnectMethod::Sequential,
        name: "all-regions/sequential",
    },
    Strategy {
        region: Region::UnitedStates,
        method: ConnectMethod::Parallel,
        name: "us/parallel",
    },
    Strategy {
        region: Region::UnitedStates,
        method: ConnectMethod::Sequential,
        name: "us/sequential",
    },
    Strategy {
        region: Region::Europe,
        method: ConnectMethod::Parallel,
        name: "eu/parallel",
    },
    Strategy {
        region: Region::Europe,
        method: ConnectMethod::Sequential,
        name: "eu/sequential",
    },
    Strategy {
        region: Region::China,
        method: ConnectMethod::Sequential,
        name: "cn/sequential",
    },
];

/// Strategy for a state's index. An out-of-range index wraps rather than
/// erroring; the persisted file may predate a catalog change.
pub fn select(state: &StrategyState) -> &'static Strategy {
    &CATALOG[state.index % CATALOG.len()]
}
