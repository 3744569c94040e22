//! Identification of a connected depth camera

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a connected depth camera as reported by the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Product name, e.g. `"Intel RealSense D435"`
    pub name: String,
    /// Serial number; unique per physical device
    pub serial_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    /// USB type descriptor, e.g. `"3.2"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_type: Option<String>,
}

impl DeviceInfo {
    pub fn new(name: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serial_number: serial_number.into(),
            ..Default::default()
        }
    }

    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }

    pub fn with_usb_type(mut self, usb_type: impl Into<String>) -> Self {
        self.usb_type = Some(usb_type.into());
        self
    }

    /// Whether the device is attached over a USB 2 link, which cannot carry
    /// full resolution depth and color at once.
    pub fn is_usb2(&self) -> bool {
        self.usb_type.as_deref().is_some_and(|t| t.starts_with('2'))
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {}", self.name, self.serial_number)?;
        if let Some(fw) = &self.firmware_version {
            write!(f, ", firmware {}", fw)?;
        }
        if let Some(usb) = &self.usb_type {
            write!(f, ", USB {}", usb)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_info_display() {
        let info = DeviceInfo::new("Intel RealSense D435", "123456789")
            .with_firmware_version("5.13.0.50")
            .with_usb_type("3.2");
        assert_eq!(
            info.to_string(),
            "Intel RealSense D435 (serial 123456789, firmware 5.13.0.50, USB 3.2)"
        );
        assert!(!info.is_usb2());
    }

    #[test]
    fn test_device_info_usb2_detection() {
        let info = DeviceInfo::new("Intel RealSense D415", "1").with_usb_type("2.1");
        assert!(info.is_usb2());
        assert!(!DeviceInfo::new("unknown", "2").is_usb2());
    }

    #[test]
    fn test_optional_fields_skipped_in_json() {
        let json = serde_json::to_value(DeviceInfo::new("cam", "42")).unwrap();
        assert!(json.get("firmware_version").is_none());
        assert_eq!(json["name"], "cam");
    }
}
