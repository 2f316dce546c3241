//! Light switch controller.
//!
//! A [`LightSwitch`] holds a brightness value and a tag and pushes them to a USB
//! light on demand. It references its [`HidDevice`] weakly: whoever enumerated
//! the device owns it, and once the last owner lets go, `sync` reports
//! [`DeviceError::NoDevice`] instead of keeping a stale handle alive.
//!
//! `brightness` and `tag` are plain fields. Nothing is sent until [`LightSwitch::sync`].

use crate::config::{LightConfig, ReportChannel, ReportLayout};
use crate::device::HidDevice;
use crate::error::{DeviceError, Result};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Drives one USB light over HID.
#[derive(Debug, Default)]
pub struct LightSwitch {
    /// Desired brightness, in units of `layout.max_brightness`.
    pub brightness: f64,
    /// Caller-assigned identifier, sent as the report's channel byte.
    pub tag: i64,
    device: Weak<HidDevice>,
    layout: ReportLayout,
}

impl LightSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: ReportLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    /// Initial state and layout from a config. The device is attached separately.
    pub fn from_config(config: &LightConfig) -> Self {
        Self {
            brightness: config.brightness,
            tag: config.tag,
            device: Weak::new(),
            layout: config.report.clone(),
        }
    }

    /// Reference `device` without keeping it alive.
    pub fn attach(&mut self, device: &Arc<HidDevice>) {
        self.device = Arc::downgrade(device);
    }

    pub fn detach(&mut self) {
        self.device = Weak::new();
    }

    /// The referenced device, if it is still alive.
    pub fn device(&self) -> Option<Arc<HidDevice>> {
        self.device.upgrade()
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Output level `0..=255` for the current brightness.
    ///
    /// Brightness is scaled by `max_brightness` and clamped; NaN maps to off.
    pub fn level(&self) -> u8 {
        let ratio = self.brightness / self.layout.max_brightness;
        if ratio.is_nan() {
            return 0;
        }
        (ratio.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// The report `sync` would send: `[report_id, channel, level, 0...]`.
    ///
    /// Fails with [`DeviceError::InvalidReport`] when the layout is too short or
    /// its brightness scale is not a positive finite number, or the tag does not
    /// fit in a byte.
    pub fn encode_report(&self) -> Result<Vec<u8>> {
        self.layout.validate().map_err(|e| match e {
            DeviceError::Config(msg) => DeviceError::InvalidReport(msg),
            other => other,
        })?;
        let channel = u8::try_from(self.tag).map_err(|_| {
            DeviceError::InvalidReport(format!("tag {} does not fit a channel byte", self.tag))
        })?;

        let mut report = vec![0u8; self.layout.length];
        report[0] = self.layout.report_id;
        report[1] = channel;
        report[2] = self.level();
        Ok(report)
    }

    /// Push the current brightness and tag to the device.
    pub fn sync(&self) -> Result<()> {
        let device = self.device().ok_or(DeviceError::NoDevice)?;
        let report = self.encode_report()?;

        match self.layout.channel {
            ReportChannel::Output => device.write_report(&report)?,
            ReportChannel::Feature => device.write_feature_report(&report)?,
        }

        debug!(
            "synced {} channel {} to level {} ({})",
            device.meta().display_name(),
            report[1],
            report[2],
            self.brightness
        );
        Ok(())
    }
}
