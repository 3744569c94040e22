//! Exclusive ownership of physical devices within the process.

use std::collections::HashSet;
use std::sync::{LazyLock, Mutex, MutexGuard};

use crate::error::{CalibError, Result};

static OPEN_DEVICES: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(|| Mutex::new(HashSet::new()));

fn open_devices() -> MutexGuard<'static, HashSet<String>> {
    // The set stays consistent even if a holder panicked mid-insert.
    OPEN_DEVICES.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Proof that this process holds the only open session on a device.
///
/// Released when dropped.
#[derive(Debug)]
pub struct DeviceLease {
    serial: String,
}

impl DeviceLease {
    /// Claim `serial`, failing with [`CalibError::DeviceBusy`] if it is held.
    pub fn acquire(serial: &str) -> Result<Self> {
        let mut open = open_devices();
        if !open.insert(serial.to_string()) {
            return Err(CalibError::DeviceBusy {
                serial: serial.to_string(),
            });
        }
        log::debug!("acquired lease on device {serial}");
        Ok(Self {
            serial: serial.to_string(),
        })
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn is_held(serial: &str) -> bool {
        open_devices().contains(serial)
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        open_devices().remove(&self.serial);
        log::debug!("released lease on device {}", self.serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_is_exclusive() {
        let lease = DeviceLease::acquire("lease-test-exclusive").unwrap();
        assert!(DeviceLease::is_held("lease-test-exclusive"));
        assert!(matches!(
            DeviceLease::acquire("lease-test-exclusive"),
            Err(CalibError::DeviceBusy { serial }) if serial == "lease-test-exclusive"
        ));
        drop(lease);
        assert!(!DeviceLease::is_held("lease-test-exclusive"));
        assert!(DeviceLease::acquire("lease-test-exclusive").is_ok());
    }

    #[test]
    fn test_leases_on_different_devices_coexist() {
        let a = DeviceLease::acquire("lease-test-a").unwrap();
        let b = DeviceLease::acquire("lease-test-b").unwrap();
        assert_eq!(a.serial(), "lease-test-a");
        assert_eq!(b.serial(), "lease-test-b");
    }
}
