use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::{Error, Result};

/// Kind of device an operator implementation runs on
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Display, EnumString, EnumIter, AsRefStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Host CPU
    Cpu,
    /// Accelerator, addressed by device index
    Gpu,
    /// Host memory pinned for fast accelerator transfers
    CpuPinned,
}

impl DeviceType {
    /// Numeric device code used by the C prediction API
    pub fn code(self) -> i32 {
        match self {
            DeviceType::Cpu => 1,
            DeviceType::Gpu => 2,
            DeviceType::CpuPinned => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        DeviceType::iter()
            .find(|dev| dev.code() == code)
            .ok_or_else(|| Error::InvalidConfiguration(format!("Unknown device type code {}", code)))
    }

    /// Whether tensors on this device live in host memory
    pub fn is_host(self) -> bool {
        matches!(self, DeviceType::Cpu | DeviceType::CpuPinned)
    }
}

/// Where an operator implementation will run.
///
/// Small and `Copy`; passed by value everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub device_type: DeviceType,
    pub device_id: u32,
}

impl ExecutionContext {
    pub fn new(device_type: DeviceType, device_id: u32) -> Self {
        Self { device_type, device_id }
    }

    pub fn cpu() -> Self {
        Self::new(DeviceType::Cpu, 0)
    }

    pub fn gpu(device_id: u32) -> Self {
        Self::new(DeviceType::Gpu, device_id)
    }

    pub fn cpu_pinned() -> Self {
        Self::new(DeviceType::CpuPinned, 0)
    }

    /// Build from the numeric device code and index
    pub fn from_code(code: i32, device_id: u32) -> Result<Self> {
        Ok(Self::new(DeviceType::from_code(code)?, device_id))
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::cpu()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.device_type, self.device_id)
    }
}

impl FromStr for ExecutionContext {
    type Err = Error;

    /// Accepts `cpu`, `gpu(1)` and `gpu:1`. A missing index means 0.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfiguration(format!("Invalid execution context '{}'", s));
        let s = s.trim();

        let (name, index) = if let Some(open) = s.find('(') {
            let close = s.strip_suffix(')').ok_or_else(invalid)?;
            (&s[..open], &close[open + 1..])
        } else if let Some((name, index)) = s.split_once(':') {
            (name, index)
        } else {
            (s, "0")
        };

        let device_type = DeviceType::from_str(name.trim()).map_err(|_| invalid())?;
        let device_id = index.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(device_type, device_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(ExecutionContext::cpu().to_string(), "cpu(0)");
        assert_eq!(ExecutionContext::gpu(2).to_string(), "gpu(2)");
        assert_eq!(ExecutionContext::cpu_pinned().to_string(), "cpu_pinned(0)");

        assert_eq!("cpu".parse::<ExecutionContext>().unwrap(), ExecutionContext::cpu());
        assert_eq!("gpu(3)".parse::<ExecutionContext>().unwrap(), ExecutionContext::gpu(3));
        assert_eq!("GPU:1".parse::<ExecutionContext>().unwrap(), ExecutionContext::gpu(1));
        assert_eq!(
            "cpu_pinned(0)".parse::<ExecutionContext>().unwrap(),
            ExecutionContext::cpu_pinned()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["tpu", "gpu(", "gpu(x)", "gpu:-1", ""] {
            assert!(bad.parse::<ExecutionContext>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_device_codes() {
        for dev in DeviceType::iter() {
            assert_eq!(DeviceType::from_code(dev.code()).unwrap(), dev);
        }
        assert_eq!(ExecutionContext::from_code(2, 4).unwrap(), ExecutionContext::gpu(4));
        assert!(DeviceType::from_code(0).is_err());
    }

    #[test]
    fn test_host_devices() {
        assert!(DeviceType::Cpu.is_host());
        assert!(DeviceType::CpuPinned.is_host());
        assert!(!DeviceType::Gpu.is_host());
    }
}
