//! HID backends for `lightswitch`.
//!
//! A backend is the seam between [`HidDevice`](crate::device::HidDevice) and the
//! platform HID stack. It enumerates interfaces and opens connections; report
//! framing, timeouts and string decoding are the backend's semantics and are
//! passed through unchanged.
//!
//! # Feature flags
//! - **`hid`**: native backend over `hidapi` (default).
//! - **`virtual`**: in-memory loopback devices for tests and demos.

use crate::error::Result;
use crate::metadata::DeviceMeta;
use std::sync::Arc;

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

#[cfg(any(test, feature = "virtual"))]
#[cfg_attr(docsrs, doc(cfg(feature = "virtual")))]
pub mod virtual_device;

/// Enumerates HID interfaces and opens connections to them.
pub trait HidBackend: Send + Sync {
    /// Snapshot of connected interfaces. `0` for either ID is a wildcard.
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceMeta>>;

    /// Open the interface described by `meta`. Opening is never exclusive.
    fn open(&self, meta: &DeviceMeta) -> Result<Box<dyn HidConnection>>;

    /// Short backend name for logs.
    fn name(&self) -> &str;
}

/// An open connection to one HID interface.
///
/// Buffers follow the native convention: the first byte of an outgoing report
/// (and of a feature report buffer) is the report ID, `0` for devices that do
/// not number their reports.
pub trait HidConnection: Send {
    /// Send an output report; returns the number of bytes written.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read one input report into `buf`.
    ///
    /// `timeout_ms` of `-1` blocks indefinitely, `0` polls. Returns `Ok(0)`
    /// when the timeout elapsed without data.
    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize>;

    fn send_feature_report(&mut self, data: &[u8]) -> Result<()>;

    /// `buf[0]` selects the report ID; returns the number of bytes filled.
    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// `Ok(None)` when the device defines no string at `index`.
    fn get_indexed_string(&mut self, index: i32) -> Result<Option<String>>;
}

/// The backend used by the crate-level enumeration functions.
///
/// Returns the native `hidapi` backend when the `hid` feature is enabled.
pub fn default_backend() -> Result<Arc<dyn HidBackend>> {
    #[cfg(feature = "hid")]
    {
        Ok(Arc::new(hid::HidApiBackend::new()))
    }

    #[cfg(not(feature = "hid"))]
    {
        Err(crate::error::DeviceError::Unsupported(
            "no native HID backend compiled in (enable the `hid` feature)".into(),
        ))
    }
}
