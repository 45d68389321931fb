//! TeraScan flow controller
//!
//! Drives one stitched scan through [`ScanState`], in one of two monitoring
//! modes:
//!
//! - **Polling**: repeated `scan_stitch_status` requests, see
//!   [`ScanController::poll`] and [`ScanController::run_polling`]
//! - **Automatic output**: unsolicited pushes, see
//!   [`ScanController::next_event`] and [`ScanController::observe`]
//!
//! With pause enabled the controller stops after every `start` and `repeat`
//! push until it receives `terascan_continue`. [`ScanController::next_event`]
//! sends it, so a caller consuming events keeps the scan moving.

use crate::catalog::terascan::{ScanActivity, ScanStatus};
use crate::catalog::types::{validate_wavelength, ScanOperation, ScanRate, ScanType};
use crate::client::SolstisClient;
use crate::scan::auto_output::{AutoOutputEvent, AutoOutputSettings, AutoOutputStatus};
use crate::scan::state::ScanState;
use solstis_core::{SolstisError, SolstisResult};
use solstis_transport::TransportLayer;
use std::time::Duration;

/// Parameters and state of one TeraScan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub scan: ScanType,
    /// Lower wavelength bound in nm
    pub start: f64,
    /// Upper wavelength bound in nm
    pub stop: f64,
    pub rate: ScanRate,
    pub state: ScanState,
    /// Wavelength an `end` push must reach for the scan to count as complete
    pub completion_bound: f64,
}

impl ScanSession {
    /// Describe a scan over `start..stop` nm
    ///
    /// The completion bound starts at `stop`.
    pub fn new(scan: ScanType, start: f64, stop: f64, rate: ScanRate) -> SolstisResult<Self> {
        validate_wavelength("start", start)?;
        validate_wavelength("stop", stop)?;
        if start >= stop {
            return Err(SolstisError::Validation(format!(
                "Scan start {} nm must be below stop {} nm",
                start, stop
            )));
        }
        if !rate.is_valid_for(scan) {
            return Err(SolstisError::Validation(format!(
                "Rate {} is not available for a {} scan",
                rate, scan
            )));
        }
        Ok(Self {
            scan,
            start,
            stop,
            rate,
            state: ScanState::Idle,
            completion_bound: stop,
        })
    }

    /// Override the wavelength an `end` push must reach
    pub fn with_completion_bound(mut self, nm: f64) -> Self {
        self.completion_bound = nm;
        self
    }

    /// Fraction of the range covered at `current`, clamped to 0..=1
    pub fn coverage(&self, current: f64) -> f64 {
        ((current - self.start) / (self.stop - self.start)).clamp(0.0, 1.0)
    }

    /// Check whether a push marks the end of the whole scan
    pub fn is_completed_by(&self, event: &AutoOutputEvent) -> bool {
        event.status == AutoOutputStatus::End && event.wavelength >= self.completion_bound
    }
}

/// One polling sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanProgress {
    pub in_progress: bool,
    pub current: Option<f64>,
    /// Fraction of the range covered, when `current` is known
    pub coverage: Option<f64>,
    pub activity: Option<ScanActivity>,
    pub state: ScanState,
}

/// Outcome of [`ScanController::observe`]
#[derive(Debug)]
pub struct ObservationSummary {
    pub events: usize,
    pub continues_sent: usize,
    pub last_wavelength: Option<f64>,
    pub completed: bool,
    /// Error that ended observation early, timeouts included
    pub ended_by: Option<SolstisError>,
}

/// Drives one TeraScan over a borrowed client
///
/// The controller holds the client exclusively for the scan's lifetime, so
/// no other request can interleave with the push stream.
#[derive(Debug)]
pub struct ScanController<'a, T: TransportLayer> {
    client: &'a mut SolstisClient<T>,
    session: ScanSession,
    output: Option<AutoOutputSettings>,
    continues_sent: usize,
}

impl<'a, T: TransportLayer> ScanController<'a, T> {
    pub fn new(client: &'a mut SolstisClient<T>, session: ScanSession) -> Self {
        Self {
            client,
            session,
            output: None,
            continues_sent: 0,
        }
    }

    pub fn state(&self) -> ScanState {
        self.session.state
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Number of `terascan_continue` requests sent so far
    pub fn continues_sent(&self) -> usize {
        self.continues_sent
    }

    pub fn automatic_output(&self) -> Option<&AutoOutputSettings> {
        self.output.as_ref()
    }

    /// Send `scan_stitch_initialise` for this session
    pub async fn initialise(&mut self) -> SolstisResult<()> {
        self.session.state.validate_transition(ScanState::Initialized)?;
        let ScanSession {
            scan,
            start,
            stop,
            rate,
            ..
        } = self.session;
        let result = self
            .client
            .scan_stitch_initialise(scan, start, stop, rate)
            .await;
        self.settle(result, ScanState::Initialized)?;
        self.output = None;
        self.continues_sent = 0;
        log::info!(
            "TeraScan initialised: {} {} -> {} nm at {}",
            scan,
            start,
            stop,
            rate
        );
        Ok(())
    }

    /// Enable the `automatic_output` stream before the scan starts
    pub async fn enable_automatic_output(&mut self, settings: AutoOutputSettings) -> SolstisResult<()> {
        if self.session.state != ScanState::Initialized {
            return Err(SolstisError::Validation(format!(
                "Automatic output must be enabled after initialise and before start, scan is {}",
                self.session.state
            )));
        }
        settings.validate()?;
        let result = self
            .client
            .terascan_output(
                ScanOperation::Start,
                settings.delay_ms,
                settings.update_step,
                settings.pause,
            )
            .await;
        self.settle(result, ScanState::Initialized)?;
        self.output = Some(settings);
        Ok(())
    }

    /// Start the scan
    pub async fn start(&mut self) -> SolstisResult<()> {
        self.session.state.validate_transition(ScanState::Scanning)?;
        let result = self
            .client
            .scan_stitch_op(self.session.scan, ScanOperation::Start)
            .await;
        self.settle(result, ScanState::Scanning)?;
        log::info!("TeraScan started");
        Ok(())
    }

    /// Issue one `scan_stitch_status` and update the state from it
    pub async fn poll(&mut self) -> SolstisResult<ScanProgress> {
        if self.output.is_some() {
            return Err(SolstisError::Validation(
                "Polling is not available while automatic output is enabled".to_string(),
            ));
        }
        if !self.session.state.is_active() {
            return Err(SolstisError::Validation(format!(
                "Cannot poll a scan that is {}",
                self.session.state
            )));
        }
        let result = self.client.scan_stitch_status(self.session.scan).await;
        let status = self.settle(result, self.session.state)?;
        let next = next_polled_state(&status);
        self.transition(next)?;
        Ok(ScanProgress {
            in_progress: status.in_progress,
            current: status.current,
            coverage: status.current.map(|nm| self.session.coverage(nm)),
            activity: status.activity,
            state: next,
        })
    }

    /// Poll every `interval` until the controller reports the scan inactive
    ///
    /// `on_sample` sees every sample, the final inactive one included. If a
    /// poll fails, `scan_stitch_op stop` is still sent while the connection
    /// is open and the scan is left [`ScanState::Failed`] with the poll error.
    pub async fn run_polling<F>(&mut self, interval: Duration, mut on_sample: F) -> SolstisResult<usize>
    where
        F: FnMut(&ScanProgress),
    {
        let mut samples = 0;
        loop {
            let progress = match self.poll().await {
                Ok(progress) => progress,
                Err(e) => {
                    self.abandon().await;
                    return Err(e);
                }
            };
            samples += 1;
            on_sample(&progress);
            if !progress.in_progress {
                return Ok(samples);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Wait for the next automatic-output push
    ///
    /// With pause enabled, `terascan_continue` is sent after `start` and
    /// `repeat` pushes before this returns. A timeout leaves the state
    /// unchanged; any other failure moves the scan to [`ScanState::Failed`].
    pub async fn next_event(&mut self, timeout: Option<Duration>) -> SolstisResult<AutoOutputEvent> {
        let Some(settings) = self.output else {
            return Err(SolstisError::Validation(
                "Automatic output is not enabled".to_string(),
            ));
        };
        if !self.session.state.is_active() {
            return Err(SolstisError::Validation(format!(
                "No pushes are expected while the scan is {}",
                self.session.state
            )));
        }

        let event = match self.client.next_push(timeout).await {
            Ok(push) => AutoOutputEvent::from_envelope(&push),
            Err(e) => Err(e),
        };
        let event = match event {
            Ok(event) => event,
            Err(e) if e.is_timeout() => return Err(e),
            Err(e) => {
                self.session.state = ScanState::Failed;
                return Err(e);
            }
        };
        log::debug!("automatic_output {} at {} nm", event.status, event.wavelength);

        if self.session.is_completed_by(&event) {
            self.transition(ScanState::Completed)?;
            log::info!("TeraScan completed at {} nm", event.wavelength);
            return Ok(event);
        }

        match event.status {
            status if settings.pause && status.awaits_continue() => {
                self.transition(ScanState::Paused)?;
                if !settings.continue_delay.is_zero() {
                    tokio::time::sleep(settings.continue_delay).await;
                }
                let result = self.client.terascan_continue().await;
                self.settle(result, ScanState::Scanning)?;
                self.continues_sent += 1;
            }
            AutoOutputStatus::Recover => self.transition(ScanState::Tuning)?,
            _ => self.transition(ScanState::Scanning)?,
        }
        Ok(event)
    }

    /// Consume pushes until the scan completes or waiting fails
    ///
    /// Any error while waiting, a timeout included, ends observation; it is
    /// reported in the summary rather than returned.
    pub async fn observe<F>(&mut self, timeout: Option<Duration>, mut on_event: F) -> ObservationSummary
    where
        F: FnMut(&AutoOutputEvent),
    {
        let continues_before = self.continues_sent;
        let mut summary = ObservationSummary {
            events: 0,
            continues_sent: 0,
            last_wavelength: None,
            completed: false,
            ended_by: None,
        };
        while summary.ended_by.is_none() && self.session.state != ScanState::Completed {
            match self.next_event(timeout).await {
                Ok(event) => {
                    summary.events += 1;
                    summary.last_wavelength = Some(event.wavelength);
                    on_event(&event);
                }
                Err(e) => {
                    log::info!("Observation ended: {}", e);
                    summary.ended_by = Some(e);
                }
            }
        }
        summary.completed = self.session.state == ScanState::Completed;
        summary.continues_sent = self.continues_sent - continues_before;
        summary
    }

    /// Stop the scan and its automatic output
    pub async fn stop(&mut self) -> SolstisResult<()> {
        let result = self
            .client
            .scan_stitch_op(self.session.scan, ScanOperation::Stop)
            .await;
        self.settle(result, ScanState::Stopped)?;
        if self.output.take().is_some() {
            let result = self
                .client
                .terascan_output(ScanOperation::Stop, 0, 0, false)
                .await;
            self.settle(result, ScanState::Stopped)?;
        }
        log::info!("TeraScan stopped");
        Ok(())
    }

    /// Best-effort stop after a failure, leaving the scan Failed
    async fn abandon(&mut self) {
        if self.client.is_closed() || self.session.state == ScanState::Idle {
            return;
        }
        if let Err(e) = self.stop().await {
            log::warn!("Could not stop the failed TeraScan: {}", e);
        }
        self.session.state = ScanState::Failed;
    }

    /// Return a finished scan to [`ScanState::Idle`]
    pub fn reset(&mut self) -> SolstisResult<()> {
        self.transition(ScanState::Idle)?;
        self.output = None;
        self.continues_sent = 0;
        Ok(())
    }

    fn transition(&mut self, next: ScanState) -> SolstisResult<()> {
        self.session.state.validate_transition(next)?;
        if self.session.state != next {
            log::trace!("Scan state {} -> {}", self.session.state, next);
        }
        self.session.state = next;
        Ok(())
    }

    /// Apply a command result: move to `next` on success, to Failed on error
    fn settle<R>(&mut self, result: SolstisResult<R>, next: ScanState) -> SolstisResult<R> {
        match result {
            Ok(value) => {
                self.transition(next)?;
                Ok(value)
            }
            Err(e) => {
                log::warn!("TeraScan failed while {}: {}", self.session.state, e);
                self.session.state = ScanState::Failed;
                Err(e)
            }
        }
    }
}

fn next_polled_state(status: &ScanStatus) -> ScanState {
    match (status.in_progress, status.activity) {
        (false, _) => ScanState::Completed,
        (true, Some(ScanActivity::Tuning)) => ScanState::Tuning,
        (true, _) => ScanState::Scanning,
    }
}
