//! lightswitch: USB HID device access and brightness sync for USB lights.
//!
//! - [`HidDevice`] identifies one HID interface and exchanges raw reports with it.
//! - [`LightSwitch`] pushes a brightness value to a light through a weakly held device.
//! - [`DeviceManager`] keeps the handles from the latest enumeration.
//!
//! Transport, descriptor parsing and device-node discovery stay in the platform
//! HID stack, reached through a [`HidBackend`](backends::HidBackend).
//!
//! ```no_run
//! use lightswitch::LightSwitch;
//!
//! let lamps = lightswitch::enumerate_with_ids(0x16c0, 0x05df)?;
//! let mut light = LightSwitch::new();
//! if let Some(lamp) = lamps.first() {
//!     light.attach(lamp);
//! }
//! light.brightness = 0.75;
//! light.sync()?;
//! # Ok::<(), lightswitch::DeviceError>(())
//! ```

pub mod backends;
pub mod config;
pub mod device;
pub mod error;
pub mod light;
pub mod manager;
pub mod metadata;

pub use config::{LightConfig, ReportChannel, ReportLayout};
pub use device::HidDevice;
pub use error::{DeviceError, Result};
pub use light::LightSwitch;
pub use manager::DeviceManager;
pub use metadata::DeviceMeta;

/// Enumerate every HID interface through the native backend.
#[cfg(feature = "hid")]
pub fn enumerate() -> Result<Vec<std::sync::Arc<HidDevice>>> {
    HidDevice::enumerate(&backends::default_backend()?)
}

/// Enumerate HID interfaces by VID/PID through the native backend. `0` ignores a filter.
#[cfg(feature = "hid")]
pub fn enumerate_with_ids(
    vendor_id: u16,
    product_id: u16,
) -> Result<Vec<std::sync::Arc<HidDevice>>> {
    HidDevice::enumerate_with_ids(&backends::default_backend()?, vendor_id, product_id)
}
