//! Full system status

use crate::catalog::descriptor::GET_STATUS;
use crate::client::SolstisClient;
use serde::Serialize;
use serde_json::{Map, Value};
use solstis_core::SolstisResult;
use solstis_session::Envelope;
use solstis_session::envelope::first_scalar;
use solstis_transport::TransportLayer;

/// Text the controller reports for a channel whose hardware is absent
pub const NOT_FITTED: &str = "not_fitted";

const KNOWN_FIELDS: &[&str] = &[
    "status",
    "wavelength",
    "temperature",
    "temperature_status",
    "etalon_lock",
    "etalon_voltage",
    "cavity_lock",
    "resonator_voltage",
    "ecd_lock",
    "ecd_voltage",
    "output_monitor",
    "etalon_pd_dc",
    "dither",
];

/// Telemetry record returned by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    /// Wavelength in nm
    pub wavelength: f64,
    /// Laser temperature in °C
    pub temperature: f64,
    pub temperature_status: String,
    pub etalon_lock: String,
    pub etalon_voltage: f64,
    pub cavity_lock: String,
    pub resonator_voltage: f64,
    pub ecd_lock: String,
    /// `None` when no ECD is fitted
    pub ecd_voltage: Option<f64>,
    pub output_monitor: f64,
    pub etalon_pd_dc: f64,
    pub dither: String,
    /// Reply fields not covered above, passed through unchanged
    pub extra: Map<String, Value>,
}

impl SystemStatus {
    fn from_reply(reply: &Envelope) -> SolstisResult<Self> {
        let ecd_voltage = match reply.text("ecd_voltage") {
            Ok(NOT_FITTED) => None,
            _ => Some(reply.number("ecd_voltage")?),
        };
        let extra = reply
            .parameters
            .iter()
            .filter(|(name, _)| !KNOWN_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Ok(Self {
            wavelength: reply.number("wavelength")?,
            temperature: reply.number("temperature")?,
            temperature_status: text(reply, "temperature_status")?,
            etalon_lock: text(reply, "etalon_lock")?,
            etalon_voltage: reply.number("etalon_voltage")?,
            cavity_lock: text(reply, "cavity_lock")?,
            resonator_voltage: reply.number("resonator_voltage")?,
            ecd_lock: text(reply, "ecd_lock")?,
            ecd_voltage,
            output_monitor: reply.number("output_monitor")?,
            etalon_pd_dc: reply.number("etalon_pd_dc")?,
            dither: text(reply, "dither")?,
            extra,
        })
    }
}

/// Text field, tolerating controllers that report numbers where text is usual
fn text(reply: &Envelope, name: &str) -> SolstisResult<String> {
    let value = reply.require(name)?;
    Ok(match first_scalar(value) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    })
}

impl<T: TransportLayer> SolstisClient<T> {
    /// Read the full telemetry record
    pub async fn get_status(&mut self) -> SolstisResult<SystemStatus> {
        let (_, reply) = self.execute(&GET_STATUS, None).await?;
        SystemStatus::from_reply(&reply)
    }
}
