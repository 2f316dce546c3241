//! Light switch configuration.
//!
//! A [`LightConfig`] names the device a light switch drives and the layout of
//! the report `sync` sends. It is usually loaded from TOML:
//!
//! ```toml
//! vendor_id = 0x16c0
//! product_id = 0x05df
//! brightness = 0.5
//! tag = 1
//!
//! [report]
//! report_id = 0
//! length = 8
//! channel = "feature"
//! max_brightness = 100.0
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::{DeviceError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which HID pipe a light report travels on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportChannel {
    /// Interrupt OUT / `SET_REPORT(Output)`.
    #[default]
    Output,
    /// `SET_REPORT(Feature)` control transfer.
    Feature,
}

/// Layout of the brightness report: `[report_id, channel, level, 0...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLayout {
    pub report_id: u8,
    /// Total report length in bytes, including the report ID.
    pub length: usize,
    pub channel: ReportChannel,
    /// Brightness value that maps to full output.
    pub max_brightness: f64,
}

/// Bytes before padding: report ID, channel, level.
pub const MIN_REPORT_LENGTH: usize = 3;

impl Default for ReportLayout {
    fn default() -> Self {
        Self {
            report_id: 0,
            length: 8,
            channel: ReportChannel::Output,
            max_brightness: 1.0,
        }
    }
}

impl ReportLayout {
    pub fn validate(&self) -> Result<()> {
        if self.length < MIN_REPORT_LENGTH {
            return Err(DeviceError::Config(format!(
                "report length {} is shorter than {MIN_REPORT_LENGTH} bytes",
                self.length
            )));
        }
        if !(self.max_brightness.is_finite() && self.max_brightness > 0.0) {
            return Err(DeviceError::Config(format!(
                "max_brightness must be positive, got {}",
                self.max_brightness
            )));
        }
        Ok(())
    }
}

/// Device selection, report layout and initial state for one light switch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// USB Vendor ID to match; `0` matches any.
    pub vendor_id: u16,
    /// USB Product ID to match; `0` matches any.
    pub product_id: u16,
    /// Pick a specific unit when several share the VID/PID.
    pub serial_number: Option<String>,
    pub brightness: f64,
    pub tag: i64,
    pub report: ReportLayout,
}

impl LightConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: LightConfig = toml::from_str(s)?;
        config.report.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DeviceError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = LightConfig::from_toml_str("").unwrap();
        assert_eq!(config, LightConfig::default());
        assert_eq!(config.report.length, 8);
        assert_eq!(config.report.channel, ReportChannel::Output);
    }

    #[test]
    fn test_parse_full_config() {
        let config = LightConfig::from_toml_str(
            r#"
            vendor_id = 0x16c0
            product_id = 0x05df
            serial_number = "LS-1"
            brightness = 40.0
            tag = 2

            [report]
            report_id = 1
            length = 4
            channel = "feature"
            max_brightness = 100.0
            "#,
        )
        .unwrap();

        assert_eq!(config.vendor_id, 0x16c0);
        assert_eq!(config.product_id, 0x05df);
        assert_eq!(config.serial_number.as_deref(), Some("LS-1"));
        assert_eq!(config.tag, 2);
        assert_eq!(config.report.report_id, 1);
        assert_eq!(config.report.channel, ReportChannel::Feature);
        assert_eq!(config.report.max_brightness, 100.0);
    }

    #[test]
    fn test_rejects_short_report() {
        let err = LightConfig::from_toml_str("[report]\nlength = 2\n").unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let err = LightConfig::from_toml_str("[report]\nmax_brightness = 0.0\n").unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_channel() {
        let err = LightConfig::from_toml_str("[report]\nchannel = \"bulk\"\n").unwrap_err();
        assert!(matches!(err, DeviceError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = LightConfig::default();
        config.vendor_id = 0x16c0;
        config.report.channel = ReportChannel::Feature;
        let text = config.to_toml_string().unwrap();
        assert_eq!(LightConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_config_io() {
        let err = LightConfig::load("/nonexistent/lightswitch.toml").unwrap_err();
        assert!(matches!(err, DeviceError::ConfigIo(_)));
    }
}
