/// Raw device identifiers for node-locked licenses
use std::fs;

use crate::error::{FitError, FitResult};

pub const DEVICE_ID_MIN_LEN: usize = 4;
pub const DEVICE_ID_MAX_LEN: usize = 64;

/// Supplies the raw bytes a device fingerprint is hashed from.
pub trait DeviceIdSource {
    /// Fill `buf` and return how many bytes were written.
    fn raw_device_id(&self, buf: &mut [u8; DEVICE_ID_MAX_LEN]) -> FitResult<usize>;
}

/// Fixed identifier, e.g. a serial number burned in at manufacturing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDeviceId {
    id: Vec<u8>,
}

impl StaticDeviceId {
    pub fn new(id: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into() }
    }
}

impl DeviceIdSource for StaticDeviceId {
    fn raw_device_id(&self, buf: &mut [u8; DEVICE_ID_MAX_LEN]) -> FitResult<usize> {
        if self.id.len() > DEVICE_ID_MAX_LEN {
            return Err(FitError::InvalidDeviceIdLen);
        }
        buf[..self.id.len()].copy_from_slice(&self.id);
        Ok(self.id.len())
    }
}

/// Host identity: hostname plus the MAC address of the first network interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostDeviceId;

impl HostDeviceId {
    /// Identifier string before truncation.
    pub fn describe(&self) -> String {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        let mac = get_mac_address().unwrap_or_else(|| "00:00:00:00:00:00".to_string());
        format!("{}-{}", hostname, mac)
    }
}

impl DeviceIdSource for HostDeviceId {
    fn raw_device_id(&self, buf: &mut [u8; DEVICE_ID_MAX_LEN]) -> FitResult<usize> {
        let id = self.describe();
        let len = id.len().min(DEVICE_ID_MAX_LEN);
        buf[..len].copy_from_slice(&id.as_bytes()[..len]);
        if len < DEVICE_ID_MIN_LEN {
            buf[len..DEVICE_ID_MIN_LEN].fill(0);
            return Ok(DEVICE_ID_MIN_LEN);
        }
        Ok(len)
    }
}

/// MAC address of the first non-loopback interface.
fn get_mac_address() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let mut entries: Vec<_> = fs::read_dir("/sys/class/net").ok()?.flatten().collect();
        // read_dir order is unspecified; sort so the id is stable across boots
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let iface = entry.file_name();
            let iface = iface.to_string_lossy();
            if iface == "lo" {
                continue;
            }

            let addr_path = format!("/sys/class/net/{}/address", iface);
            if let Ok(addr) = fs::read_to_string(&addr_path) {
                return Some(addr.trim().to_string());
            }
        }
    }

    None
}
