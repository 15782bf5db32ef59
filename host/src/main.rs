//! MCP2221 USB HID diagnostic probe.
//!
//! Sends the fixed "GPIO setup, all outputs, all off" command to an
//! MCP2221 and checks the status byte of the response. Each step is
//! narrated on stdout; a visible pause between steps usually means a
//! conflicting kernel driver has claimed the device.
//!
//! Usage:
//!   cargo run -p host            # run the probe
//!   cargo run -p host -- list    # list HID and USB devices

mod probe;
mod transport;

use std::io;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hidapi::HidApi;
use protocol::{USB_PID, USB_VID};

use crate::probe::ProbeOptions;
use crate::transport::HidTransport;

#[derive(Parser)]
#[command(name = "host")]
#[command(about = "MCP2221 USB HID diagnostic probe", long_about = None)]
struct Cli {
    /// Also close the device and shut the HID subsystem down when a
    /// step fails (historically the failure paths exit without
    /// cleanup)
    #[arg(long)]
    cleanup_on_failure: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the all-outputs-off probe (the default)
    Probe,
    /// List all devices (HID + libusb)
    List,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Probe) {
        Commands::Probe => {
            let mut transport = HidTransport::new();
            let opts = ProbeOptions {
                cleanup_on_failure: cli.cleanup_on_failure,
            };
            let code = probe::run(&mut transport, &mut io::stdout(), &opts)?;
            process::exit(code);
        }
        Commands::List => list_devices(),
    }
}

/// List HID devices via hidapi, then raw USB devices via libusb,
/// flagging the MCP2221 in both views. Useful to tell which driver is
/// sitting on the device when the probe stalls.
fn list_devices() -> Result<()> {
    let api = HidApi::new().context("unable to initialize HID API")?;

    println!("===== HID devices (hidapi) =====\n");
    for (i, device) in api.device_list().enumerate() {
        let manufacturer = device.manufacturer_string().unwrap_or("N/A");
        let product = device.product_string().unwrap_or("N/A");
        let serial = device.serial_number().unwrap_or("N/A");

        println!("device #{}:", i + 1);
        println!(
            "  VID:PID      = {:04X}:{:04X}",
            device.vendor_id(),
            device.product_id()
        );
        println!("  manufacturer = {}", manufacturer);
        println!("  product      = {}", product);
        println!("  serial       = {}", serial);

        if device.vendor_id() == USB_VID && device.product_id() == USB_PID {
            println!("  *** target device ***");
        }
        println!();
    }

    println!("===== USB devices (libusb) =====\n");
    let devices = rusb::devices()?;
    for (i, device) in devices.iter().enumerate() {
        let desc = device.device_descriptor()?;
        let vid = desc.vendor_id();
        let pid = desc.product_id();

        println!("device #{}:", i + 1);
        println!("  VID:PID      = {:04X}:{:04X}", vid, pid);

        if let Ok(handle) = device.open() {
            if let Ok(lang) = handle.read_languages(Duration::from_millis(100)) {
                if let Some(&lang0) = lang.first() {
                    if let Ok(m) =
                        handle.read_manufacturer_string(lang0, &desc, Duration::from_millis(100))
                    {
                        println!("  manufacturer = {}", m);
                    }
                    if let Ok(p) = handle.read_product_string(lang0, &desc, Duration::from_millis(100)) {
                        println!("  product      = {}", p);
                    }
                    if let Ok(s) =
                        handle.read_serial_number_string(lang0, &desc, Duration::from_millis(100))
                    {
                        println!("  serial       = {}", s);
                    }
                }
            }
        }

        if vid == USB_VID && pid == USB_PID {
            println!("  *** target device ***");
        }
        println!();
    }

    Ok(())
}
