//! Compute device selection

use candle_core::Device;
use std::fmt;
use std::str::FromStr;
use toxeval_core::{Error, Result};

/// Environment variable scoping which CUDA devices the process can see
pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";

/// Device type for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceSpec {
    /// CPU inference (always available)
    #[default]
    Cpu,
    /// CUDA GPU inference
    Cuda(usize), // GPU index
    /// Metal (Apple Silicon)
    Metal(usize),
}

impl DeviceSpec {
    /// Device to use after `CUDA_VISIBLE_DEVICES` was set to `selector`.
    ///
    /// A numeric selector (or list such as `"2,3"`) leaves the chosen GPUs
    /// renumbered from zero, so it maps to `cuda:0`. Anything else is parsed
    /// as a regular device name.
    pub fn from_visible_selector(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        let numeric = !selector.is_empty()
            && selector
                .split(',')
                .all(|part| !part.trim().is_empty() && part.trim().chars().all(|c| c.is_ascii_digit()));

        if numeric {
            Ok(Self::Cuda(0))
        } else {
            selector.parse()
        }
    }

    /// Create the candle device
    pub fn create(&self) -> Result<Device> {
        match self {
            Self::Cpu => Ok(Device::Cpu),
            Self::Cuda(idx) => Device::new_cuda(*idx)
                .map_err(|e| Error::config(format!("Failed to create CUDA device {}: {}", idx, e))),
            Self::Metal(idx) => Device::new_metal(*idx)
                .map_err(|e| Error::config(format!("Failed to create Metal device {}: {}", idx, e))),
        }
    }
}

impl FromStr for DeviceSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        let parse_index = |idx: &str| {
            idx.parse::<usize>()
                .map_err(|_| Error::config(format!("Invalid device index '{}'", idx)))
        };

        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            "metal" | "mps" => Ok(Self::Metal(0)),
            _ => {
                if let Some(idx) = s.strip_prefix("cuda:") {
                    Ok(Self::Cuda(parse_index(idx)?))
                } else if let Some(idx) = s.strip_prefix("metal:").or_else(|| s.strip_prefix("mps:")) {
                    Ok(Self::Metal(parse_index(idx)?))
                } else if s.chars().all(|c| c.is_ascii_digit()) && !s.is_empty() {
                    Ok(Self::Cuda(parse_index(&s)?))
                } else {
                    Err(Error::config(format!("Unknown device '{}'", s)))
                }
            }
        }
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(idx) => write!(f, "cuda:{}", idx),
            Self::Metal(idx) => write!(f, "metal:{}", idx),
        }
    }
}
