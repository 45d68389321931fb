//! Etalon, reference cavity and ECD locks

use crate::catalog::descriptor::{
    CommandDescriptor, CAVITY_LOCK, CAVITY_LOCK_STATUS, ECD_LOCK, ECD_LOCK_STATUS, ETALON_LOCK,
    ETALON_LOCK_STATUS,
};
use crate::catalog::types::on_off;
use crate::client::SolstisClient;
use serde_json::json;
use solstis_core::{SolstisError, SolstisResult};
use solstis_transport::TransportLayer;
use std::fmt;
use std::str::FromStr;

/// Lock condition reported by the `*_lock_status` commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCondition {
    Off,
    On,
    Debug,
    Error,
    Search,
    Low,
}

impl LockCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockCondition::Off => "off",
            LockCondition::On => "on",
            LockCondition::Debug => "debug",
            LockCondition::Error => "error",
            LockCondition::Search => "search",
            LockCondition::Low => "low",
        }
    }

    /// Check whether the lock is holding
    pub fn is_locked(&self) -> bool {
        matches!(self, LockCondition::On)
    }
}

impl fmt::Display for LockCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockCondition {
    type Err = SolstisError;

    fn from_str(s: &str) -> SolstisResult<Self> {
        match s {
            "off" => Ok(LockCondition::Off),
            "on" => Ok(LockCondition::On),
            "debug" => Ok(LockCondition::Debug),
            "error" => Ok(LockCondition::Error),
            "search" => Ok(LockCondition::Search),
            "low" => Ok(LockCondition::Low),
            other => Err(SolstisError::InvalidData(format!(
                "Unknown lock condition '{}'",
                other
            ))),
        }
    }
}

impl<T: TransportLayer> SolstisClient<T> {
    pub async fn etalon_lock(&mut self, on: bool) -> SolstisResult<()> {
        self.switch_lock(&ETALON_LOCK, on).await
    }

    pub async fn cavity_lock(&mut self, on: bool) -> SolstisResult<()> {
        self.switch_lock(&CAVITY_LOCK, on).await
    }

    pub async fn ecd_lock(&mut self, on: bool) -> SolstisResult<()> {
        self.switch_lock(&ECD_LOCK, on).await
    }

    pub async fn etalon_lock_status(&mut self) -> SolstisResult<LockCondition> {
        self.lock_condition(&ETALON_LOCK_STATUS).await
    }

    pub async fn cavity_lock_status(&mut self) -> SolstisResult<LockCondition> {
        self.lock_condition(&CAVITY_LOCK_STATUS).await
    }

    pub async fn ecd_lock_status(&mut self) -> SolstisResult<LockCondition> {
        self.lock_condition(&ECD_LOCK_STATUS).await
    }

    async fn switch_lock(&mut self, descriptor: &CommandDescriptor, on: bool) -> SolstisResult<()> {
        self.execute(descriptor, Some(json!({ "operation": on_off(on) })))
            .await?;
        log::info!("{} {}", descriptor.op, on_off(on));
        Ok(())
    }

    async fn lock_condition(&mut self, descriptor: &CommandDescriptor) -> SolstisResult<LockCondition> {
        let (_, reply) = self.execute(descriptor, None).await?;
        reply.text("condition")?.parse()
    }
}
