//! List HID interfaces, optionally filtered by VID/PID.
//!
//! ```text
//! cargo run --example enumerate -- [vid] [pid] [--json]
//! ```

use lightswitch::DeviceMeta;
use tracing_subscriber::{fmt, EnvFilter};

fn parse_id(arg: Option<&String>) -> u16 {
    arg.and_then(|s| u16::from_str_radix(s.trim_start_matches("0x"), 16).ok())
        .unwrap_or(0)
}

fn main() -> Result<(), lightswitch::DeviceError> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let ids: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let vid = parse_id(ids.first().copied());
    let pid = parse_id(ids.get(1).copied());

    let devices = lightswitch::enumerate_with_ids(vid, pid)?;
    if json {
        let metas: Vec<&DeviceMeta> = devices.iter().map(|d| d.meta()).collect();
        println!("{}", serde_json::to_string_pretty(&metas)?);
        return Ok(());
    }

    for device in devices {
        println!(
            "VID:PID={:04x}:{:04x} rel={:04x} up=0x{:02x} u=0x{:02x} iface={} mfr={:?} prod={:?} ser={:?} path={}",
            device.vendor_id(),
            device.product_id(),
            device.release_number(),
            device.usage_page(),
            device.usage(),
            device.interface_id(),
            device.manufacturer_name(),
            device.product_name(),
            device.serial_number(),
            device.path()
        );
    }
    Ok(())
}
