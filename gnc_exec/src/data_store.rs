//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::guid_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of odometry samples processed so far
    pub num_cycles: u128,

    // GuidCtrl
    pub guid_ctrl: guid_ctrl::GuidCtrl,
    pub guid_ctrl_output: guid_ctrl::OutputData,
    pub guid_ctrl_status_rpt: guid_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive input receive errors
    pub num_consec_recv_errors: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Perform actions required at the start of a processing cycle.
    pub fn cycle_start(&mut self) {
        self.num_cycles += 1;

        self.guid_ctrl_output = guid_ctrl::OutputData::default();
        self.guid_ctrl_status_rpt = guid_ctrl::StatusReport::default();
    }
}
