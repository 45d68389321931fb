//! Fast scan commands

use crate::catalog::descriptor::{FAST_SCAN_POLL, FAST_SCAN_START, FAST_SCAN_STOP};
use crate::catalog::optional_number;
use crate::catalog::types::{validate_positive, FastScanType};
use crate::client::SolstisClient;
use serde_json::json;
use solstis_core::SolstisResult;
use solstis_transport::TransportLayer;

/// Reply of `fast_scan_poll`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastScanPoll {
    pub in_progress: bool,
    /// Current tuner position, reported while the scan runs
    pub tuner_value: Option<f64>,
}

impl<T: TransportLayer> SolstisClient<T> {
    /// Start a fast scan of `width_ghz` around the current wavelength lasting `time_s`
    pub async fn fast_scan_start(
        &mut self,
        scan: FastScanType,
        width_ghz: f64,
        time_s: f64,
    ) -> SolstisResult<()> {
        validate_positive("width", width_ghz)?;
        validate_positive("time", time_s)?;
        self.execute(
            &FAST_SCAN_START,
            Some(json!({ "scan": scan.as_str(), "width": [width_ghz], "time": [time_s] })),
        )
        .await?;
        log::info!("Fast scan {} started: {} GHz over {} s", scan, width_ghz, time_s);
        Ok(())
    }

    pub async fn fast_scan_poll(&mut self, scan: FastScanType) -> SolstisResult<FastScanPoll> {
        let (code, reply) = self
            .execute(&FAST_SCAN_POLL, Some(json!({ "scan": scan.as_str() })))
            .await?;
        Ok(FastScanPoll {
            in_progress: code == 1,
            tuner_value: optional_number(&reply, "tuner_value"),
        })
    }

    pub async fn fast_scan_stop(&mut self, scan: FastScanType) -> SolstisResult<()> {
        self.execute(&FAST_SCAN_STOP, Some(json!({ "scan": scan.as_str() })))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_device, frame, requests};
    use solstis_core::SolstisError;

    #[tokio::test]
    async fn test_fast_scan_cycle() {
        let mut polls = 0;
        let (mut client, log) = fake_device(move |op, _| {
            let reply = match op {
                "fast_scan_poll" => {
                    polls += 1;
                    if polls < 3 {
                        json!({"status": [1], "tuner_value": [polls * 10]})
                    } else {
                        json!({"status": [0]})
                    }
                }
                _ => json!({"status": [0]}),
            };
            vec![frame(&format!("{}_reply", op), reply)]
        });
        client
            .fast_scan_start(FastScanType::EtalonContinuous, 10.0, 2.0)
            .await
            .unwrap();
        let mut samples = Vec::new();
        loop {
            let poll = client.fast_scan_poll(FastScanType::EtalonContinuous).await.unwrap();
            if !poll.in_progress {
                break;
            }
            samples.push(poll.tuner_value);
        }
        assert_eq!(samples, vec![Some(10.0), Some(20.0)]);
        client.fast_scan_stop(FastScanType::EtalonContinuous).await.unwrap();
        let sent = requests(&log);
        assert_eq!(
            sent[0].1,
            json!({"scan": "etalon_continuous", "width": [10.0], "time": [2.0]})
        );
        assert_eq!(sent.last().unwrap().0, "fast_scan_stop");
    }

    #[tokio::test]
    async fn test_fast_scan_start_status_codes() {
        for (status, reason) in [
            (1, "width too large"),
            (2, "reference cavity"),
            (3, "ERC"),
            (4, "invalid scan type"),
            (5, "scan time too long"),
        ] {
            let (mut client, _) = fake_device(move |_, _| {
                vec![frame("fast_scan_start_reply", json!({"status": [status]}))]
            });
            let err = client
                .fast_scan_start(FastScanType::CavitySingle, 1.0, 1.0)
                .await
                .unwrap_err();
            assert!(err.to_string().contains(reason), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_fast_scan_rejects_bad_width() {
        let (mut client, log) = fake_device(|_, _| vec![]);
        assert!(matches!(
            client.fast_scan_start(FastScanType::EcdRamp, 0.0, 1.0).await,
            Err(SolstisError::Validation(_))
        ));
        assert!(log.is_empty());
    }
}
