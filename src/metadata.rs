//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is the identifying description of one HID interface as the
//! backend reported it at enumeration time. It is cloneable and serializable so
//! it can be logged or exported for diagnostics.
//!
//! # Conventions
//! - `path` is an OS device-node path (opaque string). It changes across ports
//!   and reconnects; treat it as diagnostic first, identity second.
//! - `interface_id` is `-1` when the platform does not report one.
//! - Missing manufacturer/product strings are stored as empty strings.
//!
//! ## Identity
//! Two snapshots describe the same device when vendor ID, product ID, path and
//! serial number match ([`DeviceMeta::same_device`]). Release number, strings
//! and usages are descriptive only.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of the attributes describing a single HID interface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// USB Vendor ID (VID).
    pub vendor_id: u16,

    /// USB Product ID (PID).
    pub product_id: u16,

    /// OS device-node path.
    pub path: String,

    /// Device release number (`bcdDevice`).
    pub release_number: u16,

    /// USB manufacturer string.
    pub manufacturer_name: String,

    /// USB product string.
    pub product_name: String,

    /// HID Usage Page (e.g. `0x01` for Generic Desktop, `0xFFxx` vendor-defined).
    pub usage_page: u16,

    /// HID Usage within the page.
    pub usage: u16,

    /// USB interface number; `-1` means not applicable.
    pub interface_id: i32,

    /// USB serial number string, if the device reports one.
    pub serial_number: Option<String>,
}

impl DeviceMeta {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            interface_id: -1,
            ..Default::default()
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_strings(
        mut self,
        manufacturer: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        self.manufacturer_name = manufacturer.into();
        self.product_name = product.into();
        self
    }

    pub fn with_usage(mut self, usage_page: u16, usage: u16) -> Self {
        self.usage_page = usage_page;
        self.usage = usage;
        self
    }

    pub fn with_interface(mut self, interface_id: i32) -> Self {
        self.interface_id = interface_id;
        self
    }

    pub fn with_release(mut self, release_number: u16) -> Self {
        self.release_number = release_number;
        self
    }

    /// Whether this device passes a VID/PID filter. `0` matches anything.
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        (vendor_id == 0 || self.vendor_id == vendor_id)
            && (product_id == 0 || self.product_id == product_id)
    }

    /// Structural identity: VID, PID, path and serial number.
    pub fn same_device(&self, other: &DeviceMeta) -> bool {
        self.vendor_id == other.vendor_id
            && self.product_id == other.product_id
            && self.path == other.path
            && self.serial_number == other.serial_number
    }

    /// Friendly name for logs: product string, then manufacturer, then `vid:pid`.
    pub fn display_name(&self) -> String {
        if !self.product_name.is_empty() {
            self.product_name.clone()
        } else if !self.manufacturer_name.is_empty() {
            self.manufacturer_name.clone()
        } else {
            format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
        }
    }
}

impl fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{:04x}:{:04x}] up=0x{:04x} u=0x{:04x} iface={} path={}",
            self.display_name(),
            self.vendor_id,
            self.product_id,
            self.usage_page,
            self.usage,
            self.interface_id,
            self.path
        )
    }
}
