//! TeraScan state machine

use solstis_core::{SolstisError, SolstisResult};
use std::fmt;

/// State of one TeraScan as seen from the client
///
/// # State Transitions
/// ```text
/// Idle -> Initialized (scan_stitch_initialise)
/// Initialized -> Scanning (scan_stitch_op start)
/// Scanning <-> Tuning (reported per update)
/// Scanning | Tuning -> Paused (start/repeat push with pause enabled)
/// Paused -> Scanning (terascan_continue)
/// Scanning | Tuning | Paused -> Completed (end reached the completion bound)
/// any -> Stopped (scan_stitch_op stop)
/// any -> Failed (communication or status failure)
/// Completed | Stopped | Failed -> Idle (reset) or Initialized (re-initialise)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Initialized,
    Scanning,
    /// Re-tuning between stitched segments
    Tuning,
    /// Waiting for `terascan_continue`
    Paused,
    Completed,
    Stopped,
    /// Terminal until re-initialised
    Failed,
}

impl ScanState {
    /// Check whether the laser is moving through the scan range
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ScanState::Scanning | ScanState::Tuning | ScanState::Paused
        )
    }

    /// Check whether the scan has ended, for whatever reason
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Stopped | ScanState::Failed
        )
    }

    /// Validate state transition
    ///
    /// # Errors
    /// [`SolstisError::Validation`] naming both states if the move is not allowed.
    pub fn validate_transition(&self, new_state: ScanState) -> SolstisResult<()> {
        use ScanState::*;
        let valid = match (*self, new_state) {
            (_, Stopped) | (_, Failed) => true,
            (Idle | Initialized, Initialized) => true,
            (Completed | Stopped | Failed, Initialized) => true,
            (Initialized, Scanning) => true,
            (Scanning | Tuning, Scanning | Tuning) => true,
            (Scanning | Tuning, Paused) => true,
            (Paused, Scanning) => true,
            (Scanning | Tuning | Paused, Completed) => true,
            (Idle | Initialized | Completed | Stopped | Failed, Idle) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(SolstisError::Validation(format!(
                "Invalid scan state transition: {} -> {}",
                self, new_state
            )))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "Idle",
            ScanState::Initialized => "Initialized",
            ScanState::Scanning => "Scanning",
            ScanState::Tuning => "Tuning",
            ScanState::Paused => "Paused",
            ScanState::Completed => "Completed",
            ScanState::Stopped => "Stopped",
            ScanState::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
