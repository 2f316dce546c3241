//! Device registry.
//!
//! [`DeviceManager`] owns the handles from the last enumeration. Light switches
//! borrow them weakly, so a device that disappears on [`DeviceManager::refresh`]
//! is released and its light switches start reporting `NoDevice`. Devices that
//! are still present keep their existing handle, but its connections are
//! closed: the device may have been unplugged and replugged between listings,
//! so the next transfer reopens it.

use crate::backends::HidBackend;
use crate::config::LightConfig;
use crate::device::HidDevice;
use crate::error::{DeviceError, Result};
use crate::light::LightSwitch;
use crate::metadata::DeviceMeta;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry of the handles from the most recent enumeration over one backend.
pub struct DeviceManager {
    backend: Arc<dyn HidBackend>,
    devices: Vec<Arc<HidDevice>>,
}

impl DeviceManager {
    /// Empty registry; call [`refresh`](Self::refresh) to populate it.
    pub fn new(backend: Arc<dyn HidBackend>) -> Self {
        Self {
            backend,
            devices: Vec::new(),
        }
    }

    /// Registry populated with the current device list.
    pub fn discover(backend: Arc<dyn HidBackend>) -> Result<Self> {
        let mut manager = Self::new(backend);
        manager.refresh()?;
        Ok(manager)
    }

    /// Registry over the native backend.
    #[cfg(feature = "hid")]
    pub fn discover_native() -> Result<Self> {
        Self::discover(crate::backends::default_backend()?)
    }

    /// Re-enumerate. Returns the number of devices now registered.
    ///
    /// Handles for devices still present are reused and closed; a read parked
    /// on one keeps its connection until it returns.
    pub fn refresh(&mut self) -> Result<usize> {
        let fresh = HidDevice::enumerate(&self.backend)?;
        let previous = std::mem::take(&mut self.devices);

        let mut kept = 0usize;
        for device in fresh {
            match previous.iter().find(|old| **old == device) {
                Some(old) => {
                    kept += 1;
                    old.close();
                    self.devices.push(Arc::clone(old));
                }
                None => {
                    debug!("device added: {}", device);
                    self.devices.push(device);
                }
            }
        }
        for old in previous.iter().filter(|old| !self.devices.contains(*old)) {
            debug!("device removed: {}", old);
        }

        info!(
            "discovered {} HID device(s) ({} unchanged)",
            self.devices.len(),
            kept
        );
        Ok(self.devices.len())
    }

    pub fn devices(&self) -> &[Arc<HidDevice>] {
        &self.devices
    }

    pub fn backend(&self) -> &Arc<dyn HidBackend> {
        &self.backend
    }

    /// First registered device matching the VID/PID filter (`0` = any).
    pub fn find(&self, vendor_id: u16, product_id: u16) -> Option<Arc<HidDevice>> {
        self.devices
            .iter()
            .find(|d| d.meta().matches(vendor_id, product_id))
            .cloned()
    }

    pub fn find_by_path(&self, path: &str) -> Option<Arc<HidDevice>> {
        self.devices.iter().find(|d| d.path() == path).cloned()
    }

    /// Build a light switch from `config` and attach it to the matching device.
    pub fn light_switch(&self, config: &LightConfig) -> Result<LightSwitch> {
        let device = self
            .devices
            .iter()
            .find(|d| {
                d.meta().matches(config.vendor_id, config.product_id)
                    && config
                        .serial_number
                        .as_deref()
                        .map_or(true, |s| d.serial_number() == Some(s))
            })
            .ok_or_else(|| {
                DeviceError::DeviceNotFound(format!(
                    "{:04x}:{:04x}{}",
                    config.vendor_id,
                    config.product_id,
                    config
                        .serial_number
                        .as_deref()
                        .map(|s| format!(" serial {s}"))
                        .unwrap_or_default()
                ))
            })?;

        let mut light = LightSwitch::from_config(config);
        light.attach(device);
        Ok(light)
    }

    /// Registered devices as a JSON array, for diagnostics.
    pub fn export_json(&self) -> Result<String> {
        let metas: Vec<&DeviceMeta> = self.devices.iter().map(|d| d.meta()).collect();
        Ok(serde_json::to_string_pretty(&metas)?)
    }
}
