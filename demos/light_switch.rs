//! Set a USB light's brightness from a TOML config.
//!
//! ```text
//! cargo run --example light_switch -- lightswitch.toml 0.8
//! ```

use lightswitch::{DeviceManager, LightConfig};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: light_switch <config.toml> [brightness]");
        std::process::exit(2);
    };

    if let Err(e) = run(&path, args.next()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(path: &str, brightness: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = LightConfig::load(path)?;
    let manager = DeviceManager::discover_native()?;
    let mut light = manager.light_switch(&config)?;

    if let Some(value) = brightness {
        light.brightness = value.parse()?;
    }
    light.sync()?;
    println!("brightness {} -> level {}", light.brightness, light.level());
    Ok(())
}
