//! Which devices a build may use, and how a request is matched to one.
//!
//! Selection fails loudly: an accelerated device that is not compiled in, or
//! that the backend does not implement, is an error. There is no fallback to
//! [`DeviceType::Cpu`].

use crate::{BridgeError, BridgeResult, DeviceType, ProvingBackend};

/// Set of devices available in this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePolicy {
    mask: u8,
}

const fn bit(device: DeviceType) -> u8 {
    1 << device.raw()
}

impl DevicePolicy {
    /// Devices compiled into this build: `Cpu` always, plus `Metal` and
    /// `CpuMetal` with the `metal` feature on Apple targets.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(all(
            feature = "metal",
            any(target_os = "macos", target_os = "ios")
        )) {
            Self::with_devices(&DeviceType::ALL)
        } else {
            Self::cpu_only()
        }
    }

    /// Only `Cpu`.
    #[must_use]
    pub const fn cpu_only() -> Self {
        Self {
            mask: bit(DeviceType::Cpu),
        }
    }

    /// An explicit device set. `Cpu` is always included.
    #[must_use]
    pub const fn with_devices(devices: &[DeviceType]) -> Self {
        let mut mask = bit(DeviceType::Cpu);
        let mut i = 0;
        while i < devices.len() {
            mask |= bit(devices[i]);
            i += 1;
        }
        Self { mask }
    }

    /// Whether `device` is compiled into this build.
    #[inline]
    #[must_use]
    pub const fn is_available(&self, device: DeviceType) -> bool {
        self.mask & bit(device) != 0
    }

    /// Available devices in ABI order.
    pub fn available(&self) -> impl Iterator<Item = DeviceType> + '_ {
        DeviceType::ALL.into_iter().filter(|d| self.is_available(*d))
    }

    /// Accept `device` if both the build and `backend` can serve it.
    pub fn resolve<B: ProvingBackend + ?Sized>(
        &self,
        device: DeviceType,
        backend: &B,
    ) -> BridgeResult<DeviceType> {
        if !self.is_available(device) {
            let have: Vec<&str> = self.available().map(DeviceType::name).collect();
            return Err(BridgeError::UnsupportedDevice(format!(
                "device `{device}` is not available in this build (available: {})",
                have.join(", ")
            )));
        }
        if !backend.supports(device) {
            return Err(BridgeError::UnsupportedDevice(format!(
                "backend `{}` cannot run on device `{device}`",
                backend.name()
            )));
        }
        Ok(device)
    }
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self::for_build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProofRequest;
    use std::path::Path;

    struct Accel;

    impl ProvingBackend for Accel {
        fn name(&self) -> &'static str {
            "accel"
        }
        fn supports(&self, _device: DeviceType) -> bool {
            true
        }
        fn prove(&self, _r: &ProofRequest, _d: DeviceType) -> anyhow::Result<()> {
            Ok(())
        }
        fn verify(&self, _p: &Path, _q: &Path, _v: &Path) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    struct CpuLib;

    impl ProvingBackend for CpuLib {
        fn name(&self) -> &'static str {
            "cpu-lib"
        }
        fn prove(&self, _r: &ProofRequest, _d: DeviceType) -> anyhow::Result<()> {
            Ok(())
        }
        fn verify(&self, _p: &Path, _q: &Path, _v: &Path) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn cpu_is_always_available() {
        for policy in [
            DevicePolicy::cpu_only(),
            DevicePolicy::with_devices(&[]),
            DevicePolicy::for_build(),
        ] {
            assert_eq!(policy.resolve(DeviceType::Cpu, &CpuLib).unwrap(), DeviceType::Cpu);
        }
    }

    #[test]
    fn accelerated_device_missing_from_build_is_rejected() {
        let err = DevicePolicy::cpu_only()
            .resolve(DeviceType::Metal, &Accel)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("metal"), "{msg}");
        assert!(msg.contains("not available"), "{msg}");
    }

    #[test]
    fn backend_must_support_device() {
        let policy = DevicePolicy::with_devices(&DeviceType::ALL);
        assert!(policy.resolve(DeviceType::CpuMetal, &Accel).is_ok());
        let err = policy.resolve(DeviceType::CpuMetal, &CpuLib).unwrap_err();
        assert!(err.to_string().contains("cpu-lib"));
    }

    #[cfg(not(feature = "metal"))]
    #[test]
    fn default_build_is_cpu_only() {
        let got: Vec<_> = DevicePolicy::for_build().available().collect();
        assert_eq!(got, vec![DeviceType::Cpu]);
    }
}
