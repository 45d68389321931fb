//! Automatic-output telemetry
//!
//! While a TeraScan runs with automatic output enabled, the controller
//! pushes `automatic_output` frames carrying a wavelength and a status tag.
//! They answer no request and carry no meaningful transmission ID.

use crate::catalog::terascan::{MAX_OUTPUT_DELAY_MS, MAX_OUTPUT_UPDATE_STEP};
use solstis_core::{SolstisError, SolstisResult};
use solstis_session::Envelope;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Status tag of an `automatic_output` push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOutputStatus {
    /// A scan segment starts
    Start,
    /// A segment is being repeated
    Repeat,
    /// The laser is recovering its tuning position
    Recover,
    Scan,
    /// A segment ended
    End,
}

impl AutoOutputStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoOutputStatus::Start => "start",
            AutoOutputStatus::Repeat => "repeat",
            AutoOutputStatus::Recover => "recover",
            AutoOutputStatus::Scan => "scan",
            AutoOutputStatus::End => "end",
        }
    }

    /// Check whether a paused scan waits for `terascan_continue` after this push
    pub fn awaits_continue(&self) -> bool {
        matches!(self, AutoOutputStatus::Start | AutoOutputStatus::Repeat)
    }
}

impl fmt::Display for AutoOutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoOutputStatus {
    type Err = SolstisError;

    fn from_str(s: &str) -> SolstisResult<Self> {
        match s {
            "start" => Ok(AutoOutputStatus::Start),
            "repeat" => Ok(AutoOutputStatus::Repeat),
            "recover" => Ok(AutoOutputStatus::Recover),
            "scan" => Ok(AutoOutputStatus::Scan),
            "end" => Ok(AutoOutputStatus::End),
            other => Err(SolstisError::InvalidData(format!(
                "Unknown automatic output status '{}'",
                other
            ))),
        }
    }
}

/// One decoded `automatic_output` push
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoOutputEvent {
    /// Wavelength in nm
    pub wavelength: f64,
    pub status: AutoOutputStatus,
}

impl AutoOutputEvent {
    pub fn from_envelope(envelope: &Envelope) -> SolstisResult<Self> {
        if !envelope.is_unsolicited() {
            return Err(SolstisError::InvalidData(format!(
                "'{}' is not an automatic output push",
                envelope.op
            )));
        }
        Ok(Self {
            wavelength: envelope.number("wavelength")?,
            status: envelope.text("status")?.parse()?,
        })
    }
}

/// Settings passed to `terascan_output` when automatic output is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoOutputSettings {
    /// Delay between pushes in ms
    pub delay_ms: u32,
    /// Scan steps between pushes
    pub update_step: u32,
    /// Pause after each `start`/`repeat` push until `terascan_continue`
    pub pause: bool,
    /// Wait before sending `terascan_continue`
    pub continue_delay: Duration,
}

impl Default for AutoOutputSettings {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            update_step: 0,
            pause: false,
            continue_delay: Duration::ZERO,
        }
    }
}

impl AutoOutputSettings {
    /// Settings with pause enabled
    pub fn paused() -> Self {
        Self {
            pause: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SolstisResult<()> {
        if self.delay_ms > MAX_OUTPUT_DELAY_MS || self.update_step > MAX_OUTPUT_UPDATE_STEP {
            return Err(SolstisError::Validation(format!(
                "Automatic output needs delay <= {} ms and update step <= {}, got {} ms and {}",
                MAX_OUTPUT_DELAY_MS, MAX_OUTPUT_UPDATE_STEP, self.delay_ms, self.update_step
            )));
        }
        Ok(())
    }
}
