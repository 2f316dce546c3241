//! Native backend over `hidapi`.
//!
//! Each enumeration builds a fresh `HidApi` context so results are a snapshot
//! at call time. Connections are opened by path.

use crate::backends::{HidBackend, HidConnection};
use crate::error::{DeviceError, Result};
use crate::metadata::DeviceMeta;
use hidapi::{DeviceInfo, HidApi};
use std::ffi::CString;
use tracing::{debug, trace};

/// [`HidBackend`] backed by the platform HID stack through `hidapi`.
#[derive(Debug, Default)]
pub struct HidApiBackend;

impl HidApiBackend {
    pub fn new() -> Self {
        Self
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceMeta>> {
        let mut api = HidApi::new_without_enumerate()?;
        api.add_devices(vendor_id, product_id)?;

        let found: Vec<DeviceMeta> = api.device_list().map(meta).collect();
        debug!(
            "hidapi enumerated {} device(s) for {:04x}:{:04x}",
            found.len(),
            vendor_id,
            product_id
        );
        Ok(found)
    }

    fn open(&self, meta: &DeviceMeta) -> Result<Box<dyn HidConnection>> {
        let path = CString::new(meta.path.as_str())
            .map_err(|_| DeviceError::DeviceNotFound(meta.path.clone()))?;
        let api = HidApi::new_without_enumerate()?;
        let device = api.open_path(&path)?;
        // Reads are bounded by per-call timeouts, never by blocking mode.
        device.set_blocking_mode(true)?;
        trace!("opened {}", meta.path);
        Ok(Box::new(HidApiConnection { raw: device }))
    }

    fn name(&self) -> &str {
        "hidapi"
    }
}

struct HidApiConnection {
    raw: hidapi::HidDevice,
}

impl HidConnection for HidApiConnection {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.raw.write(data)?)
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        Ok(self.raw.read_timeout(buf, timeout_ms)?)
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        Ok(self.raw.send_feature_report(data)?)
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.raw.get_feature_report(buf)?)
    }

    fn get_indexed_string(&mut self, index: i32) -> Result<Option<String>> {
        Ok(self.raw.get_indexed_string(index)?)
    }
}

/// Build a [`DeviceMeta`] snapshot for a `hidapi` device entry.
fn meta(info: &DeviceInfo) -> DeviceMeta {
    DeviceMeta {
        vendor_id: info.vendor_id(),
        product_id: info.product_id(),
        path: info.path().to_string_lossy().to_string(),
        release_number: info.release_number(),
        manufacturer_name: info.manufacturer_string().unwrap_or("").to_string(),
        product_name: info.product_string().unwrap_or("").to_string(),
        usage_page: info.usage_page(),
        usage: info.usage(),
        interface_id: info.interface_number(),
        serial_number: info
            .serial_number()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string()),
    }
}
