//! Enumerated modes and their wire representations

use solstis_core::{SolstisError, SolstisResult};
use std::fmt;
use std::str::FromStr;

/// TeraScan category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanType {
    Medium,
    Fine,
    Line,
}

impl ScanType {
    pub const ALL: [ScanType; 3] = [ScanType::Medium, ScanType::Fine, ScanType::Line];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Medium => "medium",
            ScanType::Fine => "fine",
            ScanType::Line => "line",
        }
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = SolstisError;

    fn from_str(s: &str) -> SolstisResult<Self> {
        ScanType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SolstisError::Validation(format!("Unknown scan type '{}'", s)))
    }
}

/// Rate unit sent alongside a TeraScan rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    GhzPerSecond,
    MhzPerSecond,
}

impl RateUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateUnit::GhzPerSecond => "GHz/s",
            RateUnit::MhzPerSecond => "MHz/s",
        }
    }
}

/// TeraScan rate
///
/// Medium scans accept 1 to 100 GHz/s. Fine and line scans accept 1 to
/// 20 GHz/s and 1 to 500 MHz/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanRate {
    Ghz100,
    Ghz50,
    Ghz20,
    Ghz15,
    Ghz10,
    Ghz5,
    Ghz2,
    Ghz1,
    Mhz500,
    Mhz200,
    Mhz100,
    Mhz50,
    Mhz20,
    Mhz10,
    Mhz5,
    Mhz2,
    Mhz1,
}

impl ScanRate {
    pub const ALL: [ScanRate; 17] = [
        ScanRate::Ghz100,
        ScanRate::Ghz50,
        ScanRate::Ghz20,
        ScanRate::Ghz15,
        ScanRate::Ghz10,
        ScanRate::Ghz5,
        ScanRate::Ghz2,
        ScanRate::Ghz1,
        ScanRate::Mhz500,
        ScanRate::Mhz200,
        ScanRate::Mhz100,
        ScanRate::Mhz50,
        ScanRate::Mhz20,
        ScanRate::Mhz10,
        ScanRate::Mhz5,
        ScanRate::Mhz2,
        ScanRate::Mhz1,
    ];

    /// Numeric rate in [`ScanRate::unit`]s
    pub fn value(&self) -> u32 {
        match self {
            ScanRate::Ghz100 | ScanRate::Mhz100 => 100,
            ScanRate::Ghz50 | ScanRate::Mhz50 => 50,
            ScanRate::Ghz20 | ScanRate::Mhz20 => 20,
            ScanRate::Ghz15 => 15,
            ScanRate::Ghz10 | ScanRate::Mhz10 => 10,
            ScanRate::Ghz5 | ScanRate::Mhz5 => 5,
            ScanRate::Ghz2 | ScanRate::Mhz2 => 2,
            ScanRate::Ghz1 | ScanRate::Mhz1 => 1,
            ScanRate::Mhz500 => 500,
            ScanRate::Mhz200 => 200,
        }
    }

    pub fn unit(&self) -> RateUnit {
        match self {
            ScanRate::Ghz100
            | ScanRate::Ghz50
            | ScanRate::Ghz20
            | ScanRate::Ghz15
            | ScanRate::Ghz10
            | ScanRate::Ghz5
            | ScanRate::Ghz2
            | ScanRate::Ghz1 => RateUnit::GhzPerSecond,
            _ => RateUnit::MhzPerSecond,
        }
    }

    /// Rate in GHz/s
    pub fn ghz_per_second(&self) -> f64 {
        match self.unit() {
            RateUnit::GhzPerSecond => f64::from(self.value()),
            RateUnit::MhzPerSecond => f64::from(self.value()) / 1000.0,
        }
    }

    /// Check whether the controller accepts this rate for a scan category
    pub fn is_valid_for(&self, scan: ScanType) -> bool {
        match scan {
            ScanType::Medium => self.unit() == RateUnit::GhzPerSecond,
            ScanType::Fine | ScanType::Line => {
                !matches!(self, ScanRate::Ghz100 | ScanRate::Ghz50 | ScanRate::Ghz15)
            }
        }
    }
}

impl fmt::Display for ScanRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value(), self.unit().as_str())
    }
}

impl FromStr for ScanRate {
    type Err = SolstisError;

    /// Parses forms such as `100GHz`, `5 MHz/s` or `20ghz/s`
    fn from_str(s: &str) -> SolstisResult<Self> {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let compact = compact.strip_suffix("/s").unwrap_or(&compact);
        let (digits, unit) = if let Some(d) = compact.strip_suffix("ghz") {
            (d, RateUnit::GhzPerSecond)
        } else if let Some(d) = compact.strip_suffix("mhz") {
            (d, RateUnit::MhzPerSecond)
        } else {
            return Err(SolstisError::Validation(format!(
                "Scan rate '{}' needs a GHz or MHz unit",
                s
            )));
        };
        let value: u32 = digits
            .parse()
            .map_err(|_| SolstisError::Validation(format!("Invalid scan rate '{}'", s)))?;
        ScanRate::ALL
            .into_iter()
            .find(|r| r.value() == value && r.unit() == unit)
            .ok_or_else(|| SolstisError::Validation(format!("Unsupported scan rate '{}'", s)))
    }
}

/// Start or stop a TeraScan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOperation {
    Start,
    Stop,
}

impl ScanOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOperation::Start => "start",
            ScanOperation::Stop => "stop",
        }
    }
}

/// Fast scan kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FastScanType {
    EtalonContinuous,
    EtalonSingle,
    CavityContinuous,
    CavitySingle,
    ResonatorContinuous,
    ResonatorSingle,
    EcdContinuous,
    FringeTest,
    ResonatorRamp,
    EcdRamp,
    CavityTriangular,
    ResonatorTriangular,
    EtalonTriangular,
}

impl FastScanType {
    pub const ALL: [FastScanType; 13] = [
        FastScanType::EtalonContinuous,
        FastScanType::EtalonSingle,
        FastScanType::CavityContinuous,
        FastScanType::CavitySingle,
        FastScanType::ResonatorContinuous,
        FastScanType::ResonatorSingle,
        FastScanType::EcdContinuous,
        FastScanType::FringeTest,
        FastScanType::ResonatorRamp,
        FastScanType::EcdRamp,
        FastScanType::CavityTriangular,
        FastScanType::ResonatorTriangular,
        FastScanType::EtalonTriangular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FastScanType::EtalonContinuous => "etalon_continuous",
            FastScanType::EtalonSingle => "etalon_single",
            FastScanType::CavityContinuous => "cavity_continuous",
            FastScanType::CavitySingle => "cavity_single",
            FastScanType::ResonatorContinuous => "resonator_continuous",
            FastScanType::ResonatorSingle => "resonator_single",
            FastScanType::EcdContinuous => "ecd_continuous",
            FastScanType::FringeTest => "fringe_test",
            FastScanType::ResonatorRamp => "resonator_ramp",
            FastScanType::EcdRamp => "ecd_ramp",
            FastScanType::CavityTriangular => "cavity_triangular",
            FastScanType::ResonatorTriangular => "resonator_triangular",
            FastScanType::EtalonTriangular => "etalon_triangular",
        }
    }
}

impl fmt::Display for FastScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FastScanType {
    type Err = SolstisError;

    fn from_str(s: &str) -> SolstisResult<Self> {
        FastScanType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SolstisError::Validation(format!("Unknown fast scan type '{}'", s)))
    }
}

/// On/off switch used by lock commands and the TeraScan pause flag
pub(crate) fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

/// Reject wavelengths that cannot be a laser setpoint
pub(crate) fn validate_wavelength(name: &str, nm: f64) -> SolstisResult<()> {
    if nm.is_finite() && nm > 0.0 {
        Ok(())
    } else {
        Err(SolstisError::Validation(format!(
            "{} must be a positive wavelength in nm, got {}",
            name, nm
        )))
    }
}

/// Reject tuning settings outside 0..=100 %
pub(crate) fn validate_percentage(name: &str, percent: f64) -> SolstisResult<()> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(SolstisError::Validation(format!(
            "{} must be between 0 and 100 %, got {}",
            name, percent
        )))
    }
}

/// Reject non-finite or non-positive quantities
pub(crate) fn validate_positive(name: &str, value: f64) -> SolstisResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SolstisError::Validation(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}
