//! MCP2221 command and response codes.
//!
//! Only the subset the probe uses; the full command set is in the
//! datasheet.

/// Set SRAM Settings - runtime GP configuration.
pub const CMD_SET_SRAM_SETTINGS: u8 = 0x60;

/// Get SRAM Settings.
pub const CMD_GET_SRAM_SETTINGS: u8 = 0x61;

/// Command completed successfully.
pub const RSP_OK: u8 = 0x00;

/// Command not supported or failed.
pub const RSP_ERROR: u8 = 0x01;
