//! MCP2221 HID protocol constants and report helpers.
//!
//! Shared between the probe runner and its tests. Pure data, no I/O:
//! the transport layer lives in the host crate.

pub mod commands;

use crate::commands::{CMD_SET_SRAM_SETTINGS, RSP_OK};

/// MCP2221 USB vendor ID (Microchip).
pub const USB_VID: u16 = 0x04D8;
/// MCP2221 USB product ID.
pub const USB_PID: u16 = 0x00DD;

/// HID report payload size in bytes.
pub const REPORT_SIZE: usize = 64;

/// Output report size on the wire: report ID byte plus payload.
pub const REPORT_BUF_SIZE: usize = REPORT_SIZE + 1;

/// Index of the status byte in a command response buffer.
///
/// The device echoes the command byte first, then the status.
pub const STATUS_INDEX: usize = 1;

/// Set SRAM Settings payload configuring GP0..GP3 as GPIO outputs
/// driving low. Offsets per the MCP2221 datasheet: byte 3 enables GP
/// alteration, bytes 4..8 carry the per-pin designations.
pub const GPIO_ALL_OUTPUTS_OFF: [u8; 12] = [
    CMD_SET_SRAM_SETTINGS,
    0x00,
    0x00,
    0x81,
    0x95,
    0x81,
    0x00,
    0x80,
    0x00,
    0x00,
    0x00,
    0x00,
];

/// Build the fixed "all outputs off" output report.
///
/// Byte 0 is the report ID (always 0 for the MCP2221), followed by the
/// command payload; the remainder stays zero.
pub fn all_outputs_off_report() -> [u8; REPORT_BUF_SIZE] {
    let mut report = [0u8; REPORT_BUF_SIZE];
    report[1..1 + GPIO_ALL_OUTPUTS_OFF.len()].copy_from_slice(&GPIO_ALL_OUTPUTS_OFF);
    report
}

/// Extract the status byte from a command response.
pub fn response_status(data: &[u8]) -> Option<u8> {
    data.get(STATUS_INDEX).copied()
}

/// True when the response carries an OK status byte.
pub fn response_ok(data: &[u8]) -> bool {
    response_status(data) == Some(RSP_OK)
}
