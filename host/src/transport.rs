//! HID transport seam.
//!
//! The probe consumes exactly the capabilities the diagnostic needs:
//! init, open-by-id, product string, write report, read report, close,
//! shutdown. Keeping them behind a trait lets the contract tests drive
//! the probe with a scripted transport instead of real hardware.

use hidapi::{HidApi, HidDevice};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("unable to initialize HID subsystem: {0}")]
    Init(String),
    #[error("unable to open device {vid:04X}:{pid:04X}: {reason}")]
    Open { vid: u16, pid: u16, reason: String },
    #[error("report I/O failed: {0}")]
    Io(String),
    #[error("device not open")]
    NotOpen,
}

/// Blocking HID transport operations, executed strictly on the calling
/// thread. No timeouts and no buffering: a stalled call must show up
/// as a visible pause in the probe narration.
pub trait Transport {
    fn init(&mut self) -> Result<(), TransportError>;

    /// Open the first enumerated device matching `vid`/`pid`. Which
    /// one "first" is when several are attached is the backend's
    /// policy, not ours.
    fn open(&mut self, vid: u16, pid: u16) -> Result<(), TransportError>;

    /// Best-effort product string; `None` when the descriptor read
    /// fails. Never aborts the probe.
    fn product_string(&mut self) -> Option<String>;

    fn write_report(&mut self, report: &[u8]) -> Result<usize, TransportError>;

    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn close(&mut self);

    fn shutdown(&mut self);
}

/// `hidapi`-backed transport.
#[derive(Default)]
pub struct HidTransport {
    api: Option<HidApi>,
    device: Option<HidDevice>,
}

impl HidTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn device(&self) -> Result<&HidDevice, TransportError> {
        self.device.as_ref().ok_or(TransportError::NotOpen)
    }
}

impl Transport for HidTransport {
    fn init(&mut self) -> Result<(), TransportError> {
        let api = HidApi::new().map_err(|e| TransportError::Init(e.to_string()))?;
        self.api = Some(api);
        Ok(())
    }

    fn open(&mut self, vid: u16, pid: u16) -> Result<(), TransportError> {
        let api = self
            .api
            .as_ref()
            .ok_or_else(|| TransportError::Init("HID subsystem not initialized".into()))?;
        let device = api.open(vid, pid).map_err(|e| TransportError::Open {
            vid,
            pid,
            reason: e.to_string(),
        })?;
        self.device = Some(device);
        Ok(())
    }

    fn product_string(&mut self) -> Option<String> {
        self.device
            .as_ref()
            .and_then(|dev| dev.get_product_string().ok())
            .flatten()
    }

    fn write_report(&mut self, report: &[u8]) -> Result<usize, TransportError> {
        debug!("write {} bytes: {:02X?}", report.len(), &report[..16.min(report.len())]);
        self.device()?
            .write(report)
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = self
            .device()?
            .read(buf)
            .map_err(|e| TransportError::Io(e.to_string()))?;
        debug!("read {} bytes: {:02X?}", n, &buf[..16.min(buf.len())]);
        Ok(n)
    }

    fn close(&mut self) {
        self.device = None;
    }

    fn shutdown(&mut self) {
        self.api = None;
    }
}
