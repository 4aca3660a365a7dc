// Compute device selection, resolved once at startup
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::DevicePreference;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum Device {
    Cuda { device_id: i32 },
    CoreMl,
    Cpu,
}

impl Device {
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Device::Cpu)
    }

    /// Chunks per inference call. Batching amortizes per-call overhead on an
    /// accelerator; on CPU a single chunk keeps peak memory flat.
    pub fn batch_size(&self) -> usize {
        if self.is_accelerated() {
            2
        } else {
            1
        }
    }

    pub fn execution_providers(&self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Device::Cuda { device_id } => {
                vec![CUDAExecutionProvider::default().with_device_id(*device_id).build()]
            }
            Device::CoreMl => vec![CoreMLExecutionProvider::default().build()],
            Device::Cpu => Vec::new(),
        }
    }

    /// Allocator arena that the runtime shrinks back after each run.
    pub fn arena_spec(&self) -> String {
        match self {
            Device::Cuda { device_id } => format!("gpu:{}", device_id),
            _ => "cpu:0".to_string(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda { device_id } => write!(f, "cuda:{}", device_id),
            Device::CoreMl => write!(f, "coreml"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

fn cuda_available() -> bool {
    CUDAExecutionProvider::default().is_available().unwrap_or(false)
}

fn coreml_available() -> bool {
    CoreMLExecutionProvider::default().is_available().unwrap_or(false)
}

/// Probe for accelerated hardware. Call once per process and pass the
/// result around; nothing re-probes per request.
pub fn probe_device(preference: DevicePreference, cuda_device_id: i32) -> Device {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => {
            if cuda_available() {
                Device::Cuda { device_id: cuda_device_id }
            } else {
                warn!("CUDA requested but not available");
                Device::Cpu
            }
        }
        DevicePreference::Auto => {
            if cuda_available() {
                Device::Cuda { device_id: cuda_device_id }
            } else if coreml_available() {
                Device::CoreMl
            } else {
                Device::Cpu
            }
        }
    };

    if device.is_accelerated() {
        info!("🚀 Using accelerator: {}", device);
    } else if preference == DevicePreference::Cpu {
        info!("Using CPU (configured)");
    } else {
        warn!("⚠️ Using CPU (no accelerator detected)");
    }
    device
}
