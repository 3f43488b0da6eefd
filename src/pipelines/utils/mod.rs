use crate::core::ModelOptions;
use candle_core::Device;

/// Where the classifier should run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceRequest {
    /// First CUDA device when one is usable, CPU otherwise.
    #[default]
    Default,
    Cpu,
    /// A specific CUDA device. Failing to open it is an error, not a fallback.
    Cuda(usize),
}

impl DeviceRequest {
    pub fn resolve(self) -> anyhow::Result<Device> {
        let device = match self {
            DeviceRequest::Default => {
                let device = Device::cuda_if_available(0)?;
                if device.is_cpu() {
                    tracing::info!("CUDA unavailable, running inference on CPU");
                }
                device
            }
            DeviceRequest::Cpu => Device::Cpu,
            DeviceRequest::Cuda(index) => Device::new_cuda(index)?,
        };
        Ok(device)
    }
}

/// Cache key combining model options and device location.
pub fn build_cache_key<O: ModelOptions>(options: &O, device: &Device) -> String {
    format!("{}-{:?}", options.cache_key(), device.location())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Options(&'static str);

    impl ModelOptions for Options {
        fn cache_key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn cpu_request_resolves_to_cpu() {
        let device = DeviceRequest::Cpu.resolve().unwrap();
        assert!(device.is_cpu());
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn default_request_falls_back_to_cpu_without_cuda() {
        assert!(DeviceRequest::Default.resolve().unwrap().is_cpu());
    }

    #[test]
    fn cache_key_includes_device() {
        let key = build_cache_key(&Options("complaint-bert"), &Device::Cpu);
        assert!(key.starts_with("complaint-bert-"));
        assert!(key.contains("Cpu"));
    }
}
