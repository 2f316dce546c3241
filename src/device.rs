//! The HID device handle.
//!
//! A [`HidDevice`] is created only by enumeration. Its identifying attributes
//! are frozen at that point; OS handles are opened on the first transfer and
//! cached until [`HidDevice::close`], drop, or a transfer error that leaves the
//! connection unusable.
//!
//! All I/O is blocking and runs on the calling thread. Input reads use their own
//! connection, so a blocking [`HidDevice::read_report`] on a reader thread does
//! not hold up output reports, feature reports or string reads issued from
//! other threads. Concurrent reads are serialized with each other, as are
//! concurrent writes. The same physical device may still be opened elsewhere.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//!
//! let lamps = lightswitch::enumerate_with_ids(0x16c0, 0x05df)?;
//! if let Some(lamp) = lamps.first() {
//!     lamp.write_report(&[0x00, 0x01, 0xff])?;
//!     let reply = lamp.read_report_timeout(8, Duration::from_millis(250))?;
//!     println!("{}: {:02x?}", lamp, reply);
//! }
//! # Ok::<(), lightswitch::DeviceError>(())
//! ```

use crate::backends::{HidBackend, HidConnection};
use crate::error::{DeviceError, Result};
use crate::metadata::DeviceMeta;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// One USB HID interface, as found by enumeration.
pub struct HidDevice {
    meta: DeviceMeta,
    backend: Arc<dyn HidBackend>,
    /// Output, feature and string transfers.
    control: Slot,
    /// Input reads, which may block for as long as the caller allows.
    input: Slot,
}

type Slot = Mutex<Option<Box<dyn HidConnection>>>;

impl HidDevice {
    /// Enumerate every connected HID interface.
    pub fn enumerate(backend: &Arc<dyn HidBackend>) -> Result<Vec<Arc<HidDevice>>> {
        Self::enumerate_with_ids(backend, 0, 0)
    }

    /// Enumerate interfaces matching a VID/PID pair. Pass `0` to ignore either.
    pub fn enumerate_with_ids(
        backend: &Arc<dyn HidBackend>,
        vendor_id: u16,
        product_id: u16,
    ) -> Result<Vec<Arc<HidDevice>>> {
        let devices: Vec<Arc<HidDevice>> = backend
            .enumerate(vendor_id, product_id)?
            .into_iter()
            .filter(|meta| meta.matches(vendor_id, product_id))
            .map(|meta| Arc::new(Self::from_meta(meta, Arc::clone(backend))))
            .collect();

        debug!(
            "{} backend: {} device(s) match {:04x}:{:04x}",
            backend.name(),
            devices.len(),
            vendor_id,
            product_id
        );
        Ok(devices)
    }

    pub(crate) fn from_meta(meta: DeviceMeta, backend: Arc<dyn HidBackend>) -> Self {
        Self {
            meta,
            backend,
            control: Mutex::new(None),
            input: Mutex::new(None),
        }
    }

    /// Structural equality: VID, PID, path and serial number.
    pub fn is_equal_to_device(&self, other: &HidDevice) -> bool {
        self.meta.same_device(&other.meta)
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    pub fn vendor_id(&self) -> u16 {
        self.meta.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.meta.product_id
    }

    pub fn path(&self) -> &str {
        &self.meta.path
    }

    pub fn release_number(&self) -> u16 {
        self.meta.release_number
    }

    pub fn manufacturer_name(&self) -> &str {
        &self.meta.manufacturer_name
    }

    pub fn product_name(&self) -> &str {
        &self.meta.product_name
    }

    pub fn usage_page(&self) -> u16 {
        self.meta.usage_page
    }

    pub fn usage(&self) -> u16 {
        self.meta.usage
    }

    /// USB interface number, `-1` when the platform reports none.
    pub fn interface_id(&self) -> i32 {
        self.meta.interface_id
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.meta.serial_number.as_deref()
    }

    /// Send an output report. `data[0]` is the report ID (`0` if unnumbered).
    pub fn write_report(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(DeviceError::InvalidReport("empty output report".into()));
        }
        let written = self.with_connection(&self.control, |conn| conn.write(data))?;
        if written < data.len() {
            return Err(DeviceError::Io(format!(
                "short write: {written} of {} bytes",
                data.len()
            )));
        }
        trace!("{}: wrote {:02x?}", self.meta.path, data);
        Ok(())
    }

    /// Receive an input report of up to `length` bytes.
    ///
    /// Blocks until a report arrives or `until` passes; `None` waits
    /// indefinitely. A deadline already in the past polls once and returns
    /// [`DeviceError::Timeout`] if nothing is queued.
    pub fn read_report(&self, length: usize, until: Option<Instant>) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(DeviceError::InvalidReport("zero-length read".into()));
        }
        let timeout_ms = until.map_or(-1, millis_until);

        let mut buf = vec![0u8; length];
        let n = self.with_connection(&self.input, |conn| conn.read_timeout(&mut buf, timeout_ms))?;
        if n == 0 {
            return Err(DeviceError::Timeout);
        }
        buf.truncate(n);
        Ok(buf)
    }

    /// [`read_report`](Self::read_report) with a timeout relative to now.
    pub fn read_report_timeout(&self, length: usize, timeout: Duration) -> Result<Vec<u8>> {
        self.read_report(length, Instant::now().checked_add(timeout))
    }

    /// Send a feature report. `data[0]` is the report ID.
    pub fn write_feature_report(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(DeviceError::InvalidReport("empty feature report".into()));
        }
        self.with_connection(&self.control, |conn| conn.send_feature_report(data))
    }

    /// Receive feature report `0`, up to `length` bytes including the ID byte.
    pub fn read_feature_report(&self, length: usize) -> Result<Vec<u8>> {
        self.read_feature_report_with_id(0, length)
    }

    /// Receive a numbered feature report, up to `length` bytes including the ID byte.
    pub fn read_feature_report_with_id(&self, report_id: u8, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(DeviceError::InvalidReport("zero-length feature read".into()));
        }
        let mut buf = vec![0u8; length];
        buf[0] = report_id;
        let n = self.with_connection(&self.control, |conn| conn.get_feature_report(&mut buf))?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read a USB string descriptor by index.
    ///
    /// Index `0` holds the language ID table, not a string, and is rejected.
    pub fn string_at_index(&self, index: usize) -> Result<String> {
        let native = match i32::try_from(index) {
            Ok(i) if i > 0 => i,
            _ => return Err(DeviceError::InvalidIndex(index)),
        };
        self.with_connection(&self.control, |conn| conn.get_indexed_string(native))?
            .ok_or(DeviceError::InvalidIndex(index))
    }

    /// Release cached OS handles. The next transfer reopens them.
    ///
    /// Never waits: a connection in use by a read in progress on another
    /// thread stays with that read and is released when it finishes with an
    /// error or on drop.
    pub fn close(&self) {
        let mut closed = lock(&self.control).take().is_some();
        match self.input.try_lock() {
            Ok(mut slot) => closed |= slot.take().is_some(),
            Err(TryLockError::Poisoned(e)) => closed |= e.into_inner().take().is_some(),
            Err(TryLockError::WouldBlock) => {
                debug!("{}: input connection busy, left open", self.meta.path)
            }
        }
        if closed {
            debug!("closed {}", self.meta.path);
        }
    }

    /// Whether any OS handle is cached or in use. Never blocks.
    pub fn is_open(&self) -> bool {
        slot_open(&self.control) || slot_open(&self.input)
    }

    fn with_connection<T>(
        &self,
        slot: &Slot,
        f: impl FnOnce(&mut dyn HidConnection) -> Result<T>,
    ) -> Result<T> {
        let mut slot = lock(slot);
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => {
                debug!("opening {} via {}", self.meta, self.backend.name());
                self.backend.open(&self.meta)?
            }
        };

        let result = f(conn.as_mut());
        match &result {
            Err(e) if e.invalidates_connection() => {
                debug!("dropping connection to {}: {}", self.meta.path, e);
            }
            _ => *slot = Some(conn),
        }
        result
    }
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Box<dyn HidConnection>>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// A slot held by a transfer in progress counts as open.
fn slot_open(slot: &Slot) -> bool {
    match slot.try_lock() {
        Ok(guard) => guard.is_some(),
        Err(TryLockError::Poisoned(e)) => e.into_inner().is_some(),
        Err(TryLockError::WouldBlock) => true,
    }
}

/// Milliseconds from now until `deadline`, saturating at zero and `i32::MAX`.
fn millis_until(deadline: Instant) -> i32 {
    let remaining = deadline.saturating_duration_since(Instant::now());
    i32::try_from(remaining.as_millis()).unwrap_or(i32::MAX)
}

impl PartialEq for HidDevice {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal_to_device(other)
    }
}

impl Eq for HidDevice {}

impl Hash for HidDevice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.vendor_id.hash(state);
        self.meta.product_id.hash(state);
        self.meta.path.hash(state);
        self.meta.serial_number.hash(state);
    }
}

impl fmt::Debug for HidDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidDevice")
            .field("meta", &self.meta)
            .field("backend", &self.backend.name())
            .field("open", &self.is_open())
            .finish()
    }
}

impl fmt::Display for HidDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.meta.fmt(f)
    }
}
