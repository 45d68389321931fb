//! Wavelength-meter and table tuning commands
//!
//! `*_wave_m` commands need an external wavelength meter and tune in closed
//! loop. `*_wave_t` commands tune open loop from the controller's internal
//! wavelength table.

use crate::catalog::descriptor::{
    LOCK_WAVE_M, MOVE_WAVE_T, MOVE_WAVE_T_REPORT, POLL_MOVE_WAVE_T, POLL_WAVE_M, SET_WAVE_M,
    SET_WAVE_M_REPORT, SET_WAVE_TOLERANCE_M, STOP_MOVE_WAVE_T, STOP_WAVE_M,
};
use crate::catalog::types::{on_off, validate_positive, validate_wavelength};
use crate::client::SolstisClient;
use serde_json::{Value, json};
use solstis_core::{SolstisError, SolstisResult};
use solstis_transport::TransportLayer;
use std::time::Duration;

/// Wavelength-meter tuning state reported by `poll_wave_m`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavemeterState {
    Idle,
    Tuning,
    /// Closed-loop lock on the target is active
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavemeterPoll {
    pub state: WavemeterState,
    /// Latest wavelength-meter reading in nm
    pub current_wavelength: f64,
}

/// Table tuning state reported by `poll_move_wave_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableTuningState {
    Done,
    Tuning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableTuningPoll {
    pub state: TableTuningState,
    pub wavelength: f64,
}

fn wavelength_parameters(nm: f64, report_finished: bool) -> Value {
    if report_finished {
        json!({ "wavelength": [nm], "report": "finished" })
    } else {
        json!({ "wavelength": [nm] })
    }
}

impl<T: TransportLayer> SolstisClient<T> {
    /// Start closed-loop tuning to `nm`
    ///
    /// Returns the wavelength the controller acknowledged. Tuning continues
    /// after the reply; use [`SolstisClient::poll_wave_m`] to follow it.
    pub async fn set_wave_m(&mut self, nm: f64) -> SolstisResult<f64> {
        validate_wavelength("wavelength", nm)?;
        let (_, reply) = self
            .execute(&SET_WAVE_M, Some(wavelength_parameters(nm, false)))
            .await?;
        reply.number("wavelength")
    }

    /// Tune to `nm` and wait for the controller's final report
    ///
    /// # Arguments
    /// * `nm` - Target wavelength in nm
    /// * `timeout` - Deadline for the final report, which arrives only once tuning ends
    ///
    /// # Returns
    /// The wavelength carried by the final report
    pub async fn set_wave_m_and_wait(&mut self, nm: f64, timeout: Duration) -> SolstisResult<f64> {
        validate_wavelength("wavelength", nm)?;
        self.execute(&SET_WAVE_M, Some(wavelength_parameters(nm, true)))
            .await?;
        let (_, report) = self
            .await_final_report(&SET_WAVE_M_REPORT, Some(timeout))
            .await?;
        report.number("wavelength")
    }

    pub async fn poll_wave_m(&mut self) -> SolstisResult<WavemeterPoll> {
        let (code, reply) = self.execute(&POLL_WAVE_M, None).await?;
        let state = match code {
            0 => WavemeterState::Idle,
            2 => WavemeterState::Tuning,
            3 => WavemeterState::Locked,
            other => {
                return Err(SolstisError::InvalidData(format!(
                    "poll_wave_m status {} has no state",
                    other
                )));
            }
        };
        Ok(WavemeterPoll {
            state,
            current_wavelength: reply.number("current_wavelength")?,
        })
    }

    pub async fn stop_wave_m(&mut self) -> SolstisResult<()> {
        self.execute(&STOP_WAVE_M, None).await?;
        Ok(())
    }

    /// Switch the wavelength-meter lock on or off
    pub async fn lock_wave_m(&mut self, on: bool) -> SolstisResult<()> {
        self.execute(&LOCK_WAVE_M, Some(json!({ "operation": on_off(on) })))
            .await?;
        Ok(())
    }

    /// Set the tolerance, in nm, within which closed-loop tuning counts as done
    pub async fn set_wave_tolerance_m(&mut self, tolerance_nm: f64) -> SolstisResult<()> {
        validate_positive("tolerance", tolerance_nm)?;
        self.execute(
            &SET_WAVE_TOLERANCE_M,
            Some(json!({ "tolerance": [tolerance_nm] })),
        )
        .await?;
        Ok(())
    }

    /// Start open-loop tuning to `nm` from the wavelength table
    pub async fn move_wave_t(&mut self, nm: f64) -> SolstisResult<()> {
        validate_wavelength("wavelength", nm)?;
        self.execute(&MOVE_WAVE_T, Some(wavelength_parameters(nm, false)))
            .await?;
        Ok(())
    }

    /// Table-tune to `nm` and wait for the final report
    pub async fn move_wave_t_and_wait(&mut self, nm: f64, timeout: Duration) -> SolstisResult<f64> {
        validate_wavelength("wavelength", nm)?;
        self.execute(&MOVE_WAVE_T, Some(wavelength_parameters(nm, true)))
            .await?;
        let (_, report) = self
            .await_final_report(&MOVE_WAVE_T_REPORT, Some(timeout))
            .await?;
        report.number("wavelength")
    }

    pub async fn poll_move_wave_t(&mut self) -> SolstisResult<TableTuningPoll> {
        let (code, reply) = self.execute(&POLL_MOVE_WAVE_T, None).await?;
        let state = if code == 0 {
            TableTuningState::Done
        } else {
            TableTuningState::Tuning
        };
        Ok(TableTuningPoll {
            state,
            wavelength: reply.number("wavelength")?,
        })
    }

    pub async fn stop_move_wave_t(&mut self) -> SolstisResult<()> {
        self.execute(&STOP_MOVE_WAVE_T, None).await?;
        Ok(())
    }
}
