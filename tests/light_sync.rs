//! End-to-end: enumerate virtual lights, drive them, unplug one.

use lightswitch::backends::virtual_device::{VirtualBackend, VirtualDevice};
use lightswitch::backends::HidBackend;
use lightswitch::{DeviceError, DeviceManager, DeviceMeta, HidDevice, LightConfig};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

const VID: u16 = 0x16c0;
const PID: u16 = 0x05df;

fn light(path: &str, serial: &str) -> VirtualDevice {
    VirtualDevice::new(
        DeviceMeta::new(VID, PID, path)
            .with_serial(serial)
            .with_strings("Acme", "USB Light Switch")
            .with_release(0x0102),
    )
    .with_loopback()
    .with_string(1, "Acme")
    .with_string(2, "USB Light Switch")
}

#[test]
fn sync_reaches_selected_light_only() {
    let backend = Arc::new(VirtualBackend::new());
    let left = light("/virtual/left", "L");
    let right = light("/virtual/right", "R");
    backend.add_device(left.clone());
    backend.add_device(right.clone());

    let manager = DeviceManager::discover(backend.clone()).unwrap();
    let config = LightConfig::from_toml_str(
        r#"
        vendor_id = 0x16c0
        product_id = 0x05df
        serial_number = "R"
        tag = 1

        [report]
        length = 4
        max_brightness = 100.0
        "#,
    )
    .unwrap();

    let mut switch = manager.light_switch(&config).unwrap();
    switch.brightness = 100.0;
    switch.sync().unwrap();

    assert!(left.written().is_empty());
    assert_eq!(right.written(), vec![vec![0, 1, 255, 0]]);

    // Loopback echoes the report back on the input pipe.
    let device = switch.device().unwrap();
    let echoed = device.read_report_timeout(4, Duration::from_millis(100)).unwrap();
    assert_eq!(echoed, vec![0, 1, 255, 0]);
    assert_eq!(device.string_at_index(2).unwrap(), "USB Light Switch");
}

#[test]
fn unplugged_light_stops_syncing() {
    let backend = Arc::new(VirtualBackend::new());
    backend.add_device(light("/virtual/0", "A"));
    let mut manager = DeviceManager::discover(backend.clone()).unwrap();

    let switch = manager.light_switch(&LightConfig::default()).unwrap();
    switch.sync().unwrap();

    backend.remove_device("/virtual/0");
    assert!(matches!(switch.sync(), Err(DeviceError::Disconnected)));

    manager.refresh().unwrap();
    assert!(manager.devices().is_empty());
    assert!(matches!(switch.sync(), Err(DeviceError::NoDevice)));
}

#[test]
fn enumeration_snapshots_compare_structurally() {
    let backend: Arc<dyn HidBackend> = {
        let b = VirtualBackend::new();
        b.add_device(light("/virtual/0", "A"));
        b.add_device(light("/virtual/1", "B"));
        Arc::new(b)
    };

    let all = HidDevice::enumerate(&backend).unwrap();
    let filtered = HidDevice::enumerate_with_ids(&backend, VID, PID).unwrap();
    assert_eq!(all, filtered);
    assert!(filtered.iter().all(|d| d.vendor_id() == VID && d.product_id() == PID));
    assert_eq!(all[0].release_number(), 0x0102);

    let started = Instant::now();
    let past = started - Duration::from_millis(1);
    assert!(matches!(all[1].read_report(8, Some(past)), Err(DeviceError::Timeout)));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn sync_completes_while_reader_waits() {
    let backend = Arc::new(VirtualBackend::new());
    let lamp = light("/virtual/0", "A");
    backend.add_device(lamp.clone());
    let manager = DeviceManager::discover(backend.clone()).unwrap();
    let mut switch = manager.light_switch(&LightConfig::default()).unwrap();

    let reader = {
        let device = switch.device().unwrap();
        thread::spawn(move || device.read_report(8, None))
    };
    thread::sleep(Duration::from_millis(20));

    switch.brightness = 1.0;
    let (tx, rx) = mpsc::channel();
    let syncer = thread::spawn(move || {
        let _ = tx.send(switch.sync());
    });
    rx.recv_timeout(Duration::from_secs(2))
        .expect("sync waited for the blocked read")
        .unwrap();
    syncer.join().unwrap();

    // The loopback echo is what releases the reader.
    let echoed = reader.join().unwrap().unwrap();
    assert_eq!(echoed, vec![0, 0, 255, 0, 0, 0, 0, 0]);
    assert_eq!(lamp.written(), vec![echoed]);
}
