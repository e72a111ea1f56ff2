use anyhow::Result;
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{DType, Device};
use pixstyle_core::{DeviceMap, Precision};

/// Pick the accelerator for `device_map`, falling back to the CPU
pub fn select_best_device(device_map: DeviceMap) -> Result<Device> {
    let ordinal = match device_map {
        DeviceMap::ForceCpu => {
            tracing::info!("Using CPU device (forced by config)");
            return Ok(Device::Cpu);
        }
        DeviceMap::Ordinal(ordinal) => ordinal,
    };

    if cuda_is_available() {
        tracing::info!("Using CUDA device {}", ordinal);
        Ok(Device::new_cuda(ordinal)?)
    } else if metal_is_available() {
        tracing::info!("Using Metal device {}", ordinal);
        Ok(Device::new_metal(ordinal)?)
    } else {
        tracing::info!("Using CPU device (no GPU features enabled)");
        Ok(Device::Cpu)
    }
}

pub fn precision_dtype(precision: Precision) -> DType {
    match precision {
        Precision::F16 => DType::F16,
        Precision::Bf16 => DType::BF16,
        Precision::F32 => DType::F32,
    }
}
