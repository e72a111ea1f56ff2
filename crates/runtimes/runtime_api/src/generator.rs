//! Seeded random-number generator bound to a device

use anyhow::Result;
use candle_core::Device;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Randomness source handed to the pipeline for one request.
///
/// Accelerator devices get their own RNG reseeded; the host-side `rng` is
/// seeded identically so CPU backends stay reproducible too.
pub struct Generator {
    device: Device,
    seed: u64,
    rng: StdRng,
}

impl Generator {
    pub fn manual_seed(device: &Device, seed: u64) -> Result<Self> {
        // candle refuses to seed the CPU device
        if !device.is_cpu() {
            device.set_seed(seed)?;
        }
        Ok(Self {
            device: device.clone(),
            seed,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("device", &self.device)
            .field("seed", &self.seed)
            .finish()
    }
}
