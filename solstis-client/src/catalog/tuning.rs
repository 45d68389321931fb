//! Etalon and resonator tuning

use crate::catalog::descriptor::{
    CommandDescriptor, FINE_TUNE_RESONATOR, TUNE_ETALON, TUNE_RESONATOR,
};
use crate::catalog::types::validate_percentage;
use crate::client::SolstisClient;
use serde_json::json;
use solstis_core::SolstisResult;
use solstis_transport::TransportLayer;

impl<T: TransportLayer> SolstisClient<T> {
    /// Set the etalon tuner, in percent of its range
    pub async fn tune_etalon(&mut self, percent: f64) -> SolstisResult<()> {
        self.tune(&TUNE_ETALON, percent).await
    }

    /// Set the resonator tuner, in percent of its range
    pub async fn tune_resonator(&mut self, percent: f64) -> SolstisResult<()> {
        self.tune(&TUNE_RESONATOR, percent).await
    }

    /// Set the resonator fine tuner, in percent of its range
    pub async fn fine_tune_resonator(&mut self, percent: f64) -> SolstisResult<()> {
        self.tune(&FINE_TUNE_RESONATOR, percent).await
    }

    async fn tune(&mut self, descriptor: &CommandDescriptor, percent: f64) -> SolstisResult<()> {
        validate_percentage("setting", percent)?;
        self.execute(descriptor, Some(json!({ "setting": [percent] })))
            .await?;
        Ok(())
    }
}
