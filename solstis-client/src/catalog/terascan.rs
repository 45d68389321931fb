//! TeraScan commands
//!
//! A TeraScan stitches many short scans into one wide-range scan. These are
//! the raw commands; [`crate::scan::ScanController`] drives them as a state
//! machine.

use crate::catalog::descriptor::{
    SCAN_STITCH_INITIALISE, SCAN_STITCH_OP, SCAN_STITCH_STATUS, TERASCAN_CONTINUE, TERASCAN_OUTPUT,
};
use crate::catalog::optional_number;
use crate::catalog::types::{on_off, validate_wavelength, ScanOperation, ScanRate, ScanType};
use crate::client::SolstisClient;
use serde_json::json;
use solstis_core::{SolstisError, SolstisResult};
use solstis_transport::TransportLayer;

/// Largest automatic-output delay the controller accepts, in ms
pub const MAX_OUTPUT_DELAY_MS: u32 = 1000;

/// Largest automatic-output update step the controller accepts
pub const MAX_OUTPUT_UPDATE_STEP: u32 = 50;

/// What the laser is doing within an active TeraScan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanActivity {
    /// Re-tuning between scan segments
    Tuning,
    Scanning,
}

/// Reply of `scan_stitch_status`
///
/// Wavelength fields are only reported while a scan is in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanStatus {
    pub in_progress: bool,
    pub current: Option<f64>,
    pub start: Option<f64>,
    pub stop: Option<f64>,
    pub activity: Option<ScanActivity>,
}

impl<T: TransportLayer> SolstisClient<T> {
    /// Configure a TeraScan over `start..stop` nm at `rate`
    ///
    /// # Errors
    /// Fails with [`SolstisError::Validation`] before any I/O if the range
    /// is empty or `rate` does not belong to `scan`.
    pub async fn scan_stitch_initialise(
        &mut self,
        scan: ScanType,
        start: f64,
        stop: f64,
        rate: ScanRate,
    ) -> SolstisResult<()> {
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
        self.execute(
            &SCAN_STITCH_INITIALISE,
            Some(json!({
                "scan": scan.as_str(),
                "start": [start],
                "stop": [stop],
                "rate": [rate.value()],
                "units": rate.unit().as_str(),
            })),
        )
        .await?;
        Ok(())
    }

    /// Start or stop the configured TeraScan
    pub async fn scan_stitch_op(
        &mut self,
        scan: ScanType,
        operation: ScanOperation,
    ) -> SolstisResult<()> {
        self.execute(
            &SCAN_STITCH_OP,
            Some(json!({ "scan": scan.as_str(), "operation": operation.as_str() })),
        )
        .await?;
        Ok(())
    }

    pub async fn scan_stitch_status(&mut self, scan: ScanType) -> SolstisResult<ScanStatus> {
        let (code, reply) = self
            .execute(&SCAN_STITCH_STATUS, Some(json!({ "scan": scan.as_str() })))
            .await?;
        let activity = optional_number(&reply, "operation").map(|flag| {
            if flag == 0.0 {
                ScanActivity::Tuning
            } else {
                ScanActivity::Scanning
            }
        });
        Ok(ScanStatus {
            in_progress: code == 1,
            current: optional_number(&reply, "current"),
            start: optional_number(&reply, "start"),
            stop: optional_number(&reply, "stop"),
            activity,
        })
    }

    /// Configure the unsolicited `automatic_output` stream
    ///
    /// # Arguments
    /// * `operation` - Start or stop the stream
    /// * `delay_ms` - Delay between pushes, at most [`MAX_OUTPUT_DELAY_MS`]
    /// * `update_step` - Scan steps between pushes, at most [`MAX_OUTPUT_UPDATE_STEP`]
    /// * `pause` - Pause the scan after each `start`/`repeat` push until `terascan_continue`
    pub async fn terascan_output(
        &mut self,
        operation: ScanOperation,
        delay_ms: u32,
        update_step: u32,
        pause: bool,
    ) -> SolstisResult<()> {
        if delay_ms > MAX_OUTPUT_DELAY_MS {
            return Err(SolstisError::Validation(format!(
                "Output delay must be at most {} ms, got {}",
                MAX_OUTPUT_DELAY_MS, delay_ms
            )));
        }
        if update_step > MAX_OUTPUT_UPDATE_STEP {
            return Err(SolstisError::Validation(format!(
                "Output update step must be at most {}, got {}",
                MAX_OUTPUT_UPDATE_STEP, update_step
            )));
        }
        self.execute(
            &TERASCAN_OUTPUT,
            Some(json!({
                "operation": operation.as_str(),
                "delay": [delay_ms],
                "update": [update_step],
                "pause": on_off(pause),
            })),
        )
        .await?;
        Ok(())
    }

    /// Resume a TeraScan paused after a `start` or `repeat` push
    pub async fn terascan_continue(&mut self) -> SolstisResult<()> {
        self.execute(&TERASCAN_CONTINUE, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_device, frame, requests};

    fn ok_device() -> (SolstisClient<solstis_transport::MockTransport>, solstis_transport::WriteLog) {
        fake_device(|op, _| vec![frame(&format!("{}_reply", op), json!({"status": [0]}))])
    }

    #[tokio::test]
    async fn test_initialise_parameters() {
        let (mut client, log) = ok_device();
        client
            .scan_stitch_initialise(ScanType::Medium, 775.5, 780.5, ScanRate::Ghz100)
            .await
            .unwrap();
        let sent = requests(&log);
        assert_eq!(sent[0].0, "scan_stitch_initialise");
        assert_eq!(
            sent[0].1,
            json!({"scan": "medium", "start": [775.5], "stop": [780.5], "rate": [100], "units": "GHz/s"})
        );
    }

    #[tokio::test]
    async fn test_initialise_validation_happens_before_io() {
        let (mut client, log) = ok_device();
        assert!(matches!(
            client
                .scan_stitch_initialise(ScanType::Medium, 775.0, 780.0, ScanRate::Mhz500)
                .await,
            Err(SolstisError::Validation(_))
        ));
        assert!(matches!(
            client
                .scan_stitch_initialise(ScanType::Fine, 780.0, 775.0, ScanRate::Ghz1)
                .await,
            Err(SolstisError::Validation(_))
        ));
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_initialise_status_codes() {
        for (status, reason) in [
            (1, "start wavelength out of range"),
            (3, "scan range too wide"),
            (7, "TeraScan not available"),
        ] {
            let (mut client, _) = fake_device(move |_, _| {
                vec![frame("scan_stitch_initialise_reply", json!({"status": [status]}))]
            });
            let err = client
                .scan_stitch_initialise(ScanType::Line, 700.0, 800.0, ScanRate::Mhz1)
                .await
                .unwrap_err();
            assert!(err.to_string().contains(reason), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_scan_status_fields() {
        let (mut client, _) = fake_device(|_, _| {
            vec![frame(
                "scan_stitch_status_reply",
                json!({"status": [1], "current": [776.25], "start": [775.5], "stop": [780.5], "operation": [1]}),
            )]
        });
        let status = client.scan_stitch_status(ScanType::Medium).await.unwrap();
        assert!(status.in_progress);
        assert_eq!(status.current, Some(776.25));
        assert_eq!(status.stop, Some(780.5));
        assert_eq!(status.activity, Some(ScanActivity::Scanning));

        let (mut client, _) =
            fake_device(|_, _| vec![frame("scan_stitch_status_reply", json!({"status": [0]}))]);
        let status = client.scan_stitch_status(ScanType::Medium).await.unwrap();
        assert!(!status.in_progress);
        assert_eq!(status.current, None);
    }

    #[tokio::test]
    async fn test_terascan_output_parameters_and_limits() {
        let (mut client, log) = ok_device();
        client
            .terascan_output(ScanOperation::Start, 50, 5, true)
            .await
            .unwrap();
        assert_eq!(
            requests(&log)[0].1,
            json!({"operation": "start", "delay": [50], "update": [5], "pause": "on"})
        );
        assert!(client
            .terascan_output(ScanOperation::Start, 1001, 5, false)
            .await
            .is_err());
        assert!(client
            .terascan_output(ScanOperation::Start, 0, 51, false)
            .await
            .is_err());
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_terascan_continue_not_paused() {
        let (mut client, _) =
            fake_device(|_, _| vec![frame("terascan_continue_reply", json!({"status": [1]}))]);
        let err = client.terascan_continue().await.unwrap_err();
        assert!(err.to_string().contains("not paused"));
    }
}
