//! In-memory HID devices.
//!
//! [`VirtualBackend`] hosts [`VirtualDevice`]s that behave like simple USB
//! peripherals: output reports can loop back as input reports, feature reports
//! are stored per report ID, and descriptor strings are served from a table.
//! Reads honor their timeout, so a deadline in the past returns immediately.
//!
//! Connections opened from the same device share its state, which lets a test
//! inject input or inspect written reports through the `VirtualDevice` it kept.

use crate::backends::{HidBackend, HidConnection};
use crate::error::{DeviceError, Result};
use crate::metadata::DeviceMeta;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct VirtualState {
    input: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    features: HashMap<u8, Vec<u8>>,
    /// `None` marks a string the device reports but cannot be decoded.
    strings: HashMap<i32, Option<String>>,
    loopback: bool,
    connected: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<VirtualState>,
    arrived: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A simulated HID interface.
#[derive(Clone, Debug)]
pub struct VirtualDevice {
    meta: DeviceMeta,
    shared: Arc<Shared>,
}

impl VirtualDevice {
    pub fn new(meta: DeviceMeta) -> Self {
        let shared = Arc::new(Shared::default());
        shared.lock().connected = true;
        Self { meta, shared }
    }

    /// Echo every output report back as an input report.
    pub fn with_loopback(self) -> Self {
        self.shared.lock().loopback = true;
        self
    }

    pub fn with_string(self, index: i32, value: impl Into<String>) -> Self {
        self.shared.lock().strings.insert(index, Some(value.into()));
        self
    }

    /// Register a string slot whose contents fail to decode.
    pub fn with_undecodable_string(self, index: i32) -> Self {
        self.shared.lock().strings.insert(index, None);
        self
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    /// Queue an input report for the next read.
    pub fn feed(&self, report: Vec<u8>) {
        self.shared.lock().input.push_back(report);
        self.shared.arrived.notify_all();
    }

    /// Preload a feature report; `report[0]` is its report ID.
    pub fn set_feature(&self, report: Vec<u8>) {
        let id = report.first().copied().unwrap_or(0);
        self.shared.lock().features.insert(id, report);
    }

    pub fn feature(&self, report_id: u8) -> Option<Vec<u8>> {
        self.shared.lock().features.get(&report_id).cloned()
    }

    /// Every output report written so far, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.lock().written.clone()
    }

    pub fn disconnect(&self) {
        self.shared.lock().connected = false;
        self.shared.arrived.notify_all();
    }

    pub fn reconnect(&self) {
        self.shared.lock().connected = true;
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }
}

/// [`HidBackend`] over a fixed set of [`VirtualDevice`]s.
#[derive(Debug, Default)]
pub struct VirtualBackend {
    devices: Mutex<Vec<VirtualDevice>>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug a device in. It shows up in the next enumeration.
    pub fn add_device(&self, device: VirtualDevice) {
        self.devices
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(device);
    }

    /// Unplug the device at `path`; open connections see a disconnect.
    pub fn remove_device(&self, path: &str) -> Option<VirtualDevice> {
        let mut devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        let pos = devices.iter().position(|d| d.meta.path == path)?;
        let device = devices.remove(pos);
        device.disconnect();
        Some(device)
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl HidBackend for VirtualBackend {
    fn enumerate(&self, vendor_id: u16, product_id: u16) -> Result<Vec<DeviceMeta>> {
        let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        Ok(devices
            .iter()
            .filter(|d| d.is_connected() && d.meta.matches(vendor_id, product_id))
            .map(|d| d.meta.clone())
            .collect())
    }

    fn open(&self, meta: &DeviceMeta) -> Result<Box<dyn HidConnection>> {
        let devices = self.devices.lock().unwrap_or_else(|e| e.into_inner());
        let device = devices
            .iter()
            .find(|d| d.meta.same_device(meta) && d.is_connected())
            .ok_or_else(|| DeviceError::DeviceNotFound(meta.path.clone()))?;
        Ok(Box::new(VirtualConnection {
            shared: Arc::clone(&device.shared),
        }))
    }

    fn name(&self) -> &str {
        "virtual"
    }
}

struct VirtualConnection {
    shared: Arc<Shared>,
}

impl VirtualConnection {
    fn connected(&self) -> Result<MutexGuard<'_, VirtualState>> {
        let state = self.shared.lock();
        if state.connected {
            Ok(state)
        } else {
            Err(DeviceError::Disconnected)
        }
    }
}

impl HidConnection for VirtualConnection {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let mut state = self.connected()?;
        state.written.push(data.to_vec());
        if state.loopback {
            state.input.push_back(data.to_vec());
            self.shared.arrived.notify_all();
        }
        Ok(data.len())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize> {
        let deadline = u64::try_from(timeout_ms)
            .ok()
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut state = self.connected()?;

        loop {
            if !state.connected {
                return Err(DeviceError::Disconnected);
            }
            if let Some(report) = state.input.pop_front() {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                return Ok(n);
            }
            state = match deadline {
                None => self
                    .shared
                    .arrived
                    .wait(state)
                    .unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(0);
                    }
                    self.shared
                        .arrived
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }

    fn send_feature_report(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.connected()?;
        let id = data
            .first()
            .copied()
            .ok_or_else(|| DeviceError::InvalidReport("empty feature report".into()))?;
        state.features.insert(id, data.to_vec());
        Ok(())
    }

    fn get_feature_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        let state = self.connected()?;
        let id = buf.first().copied().unwrap_or(0);
        let report = state
            .features
            .get(&id)
            .ok_or_else(|| DeviceError::Io(format!("no feature report with id {id}")))?;
        let n = report.len().min(buf.len());
        buf[..n].copy_from_slice(&report[..n]);
        Ok(n)
    }

    fn get_indexed_string(&mut self, index: i32) -> Result<Option<String>> {
        let state = self.connected()?;
        match state.strings.get(&index) {
            None => Ok(None),
            Some(Some(s)) => Ok(Some(s.clone())),
            Some(None) => Err(DeviceError::Encoding(format!(
                "string descriptor {index} is not valid UTF-16"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lamp(path: &str) -> VirtualDevice {
        VirtualDevice::new(DeviceMeta::new(0x16c0, 0x05df, path))
    }

    #[test]
    fn test_enumerate_filters_and_skips_unplugged() {
        let backend = VirtualBackend::new();
        backend.add_device(lamp("/virtual/0"));
        backend.add_device(VirtualDevice::new(DeviceMeta::new(0x046d, 0xc52b, "/virtual/1")));

        assert_eq!(backend.enumerate(0, 0).unwrap().len(), 2);
        assert_eq!(backend.enumerate(0x16c0, 0).unwrap().len(), 1);

        backend.remove_device("/virtual/0");
        assert_eq!(backend.device_count(), 1);
        assert!(backend.enumerate(0x16c0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_loopback_read() {
        let backend = VirtualBackend::new();
        let device = lamp("/virtual/0").with_loopback();
        backend.add_device(device.clone());

        let mut conn = backend.open(device.meta()).unwrap();
        assert_eq!(conn.write(&[0, 1, 2]).unwrap(), 3);

        let mut buf = [0u8; 8];
        assert_eq!(conn.read_timeout(&mut buf, 0).unwrap(), 3);
        assert_eq!(&buf[..3], &[0, 1, 2]);
        assert_eq!(device.written(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_read_times_out_without_input() {
        let backend = VirtualBackend::new();
        let device = lamp("/virtual/0");
        backend.add_device(device.clone());

        let mut conn = backend.open(device.meta()).unwrap();
        let mut buf = [0u8; 4];
        let started = Instant::now();
        assert_eq!(conn.read_timeout(&mut buf, 20).unwrap(), 0);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_blocking_read_wakes_on_feed() {
        let backend = VirtualBackend::new();
        let device = lamp("/virtual/0");
        backend.add_device(device.clone());
        let mut conn = backend.open(device.meta()).unwrap();

        let feeder = device.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            feeder.feed(vec![9, 9]);
        });

        let mut buf = [0u8; 2];
        assert_eq!(conn.read_timeout(&mut buf, -1).unwrap(), 2);
        assert_eq!(buf, [9, 9]);
        handle.join().unwrap();
    }

    #[test]
    fn test_disconnect_fails_io() {
        let backend = VirtualBackend::new();
        let device = lamp("/virtual/0");
        backend.add_device(device.clone());
        let mut conn = backend.open(device.meta()).unwrap();

        device.disconnect();
        assert!(matches!(conn.write(&[0]), Err(DeviceError::Disconnected)));
        assert!(matches!(
            backend.open(device.meta()),
            Err(DeviceError::DeviceNotFound(_))
        ));
    }
}
