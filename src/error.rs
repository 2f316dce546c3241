//! Error types.
//!
//! Every fallible operation in this crate returns [`Result`]. Expected failures
//! (disconnects, timeouts, bad string indices) are ordinary variants the caller
//! can match on and recover from.

use thiserror::Error;

/// Errors produced by HID devices, backends, and light switches.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The underlying transfer could not be completed.
    #[error("HID I/O error: {0}")]
    Io(String),

    /// The OS refused access to the device node.
    #[error("HID permission denied: {0}")]
    PermissionDenied(String),

    /// The device went away while a connection was open.
    #[error("Device disconnected")]
    Disconnected,

    /// No report arrived before the read deadline.
    #[error("Timed out waiting for report")]
    Timeout,

    /// The device has no descriptor string at this index.
    #[error("Invalid string index: {0}")]
    InvalidIndex(usize),

    /// The descriptor string exists but could not be decoded.
    #[error("Could not decode HID string: {0}")]
    Encoding(String),

    /// Opening failed because no device sits at the path, or nothing matched a lookup.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Report contents or length rejected before reaching the device.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// A light switch was synced without a live device reference.
    #[error("Light switch has no device attached")]
    NoDevice,

    /// A config or report layout failed to parse or validate.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The config file could not be read.
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The JSON device listing could not be produced.
    #[error("Failed to serialize device list: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No backend is compiled in for the requested operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl DeviceError {
    /// Whether the cached OS handle should be discarded after this error.
    ///
    /// Timeouts, bad indices and rejected reports leave the connection usable.
    pub fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            DeviceError::Io(_) | DeviceError::Disconnected | DeviceError::PermissionDenied(_)
        )
    }
}

impl From<toml::de::Error> for DeviceError {
    fn from(e: toml::de::Error) -> Self {
        DeviceError::Config(e.to_string())
    }
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for DeviceError {
    fn from(e: hidapi::HidError) -> Self {
        if let hidapi::HidError::FromWideCharError { wide_char } = &e {
            return DeviceError::Encoding(format!("invalid wide char 0x{wide_char:x}"));
        }

        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") || msg.contains("EACCES") {
            DeviceError::PermissionDenied(msg)
        } else if msg.contains("No such device") || msg.contains("ENODEV") {
            DeviceError::Disconnected
        } else {
            DeviceError::Io(msg)
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(DeviceError::Timeout.to_string(), "Timed out waiting for report");
        assert_eq!(
            DeviceError::InvalidIndex(7).to_string(),
            "Invalid string index: 7"
        );
        assert_eq!(
            DeviceError::NoDevice.to_string(),
            "Light switch has no device attached"
        );
    }

    #[test]
    fn test_connection_invalidation() {
        assert!(DeviceError::Disconnected.invalidates_connection());
        assert!(DeviceError::Io("pipe".into()).invalidates_connection());
        assert!(!DeviceError::Timeout.invalidates_connection());
        assert!(!DeviceError::InvalidIndex(3).invalidates_connection());
    }

    #[test]
    fn test_toml_error_becomes_config() {
        let err: DeviceError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(matches!(err, DeviceError::Config(_)));
    }

    #[cfg(feature = "hid")]
    #[test]
    fn test_hidapi_error_classification() {
        let err: DeviceError = hidapi::HidError::HidApiError {
            message: "Permission denied".into(),
        }
        .into();
        assert!(matches!(err, DeviceError::PermissionDenied(_)));

        let err: DeviceError = hidapi::HidError::HidApiError {
            message: "No such device".into(),
        }
        .into();
        assert!(matches!(err, DeviceError::Disconnected));

        let err: DeviceError = hidapi::HidError::HidApiError {
            message: "Broken pipe".into(),
        }
        .into();
        assert!(matches!(err, DeviceError::Io(_)));
    }
}
