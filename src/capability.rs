use std::fmt;

use crate::error::Error;
use crate::portable;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Avx,
    Avx2,
    PortableSimd,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Avx, Capability::Avx2, Capability::PortableSimd];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Avx => write!(f, "AVX"),
            Capability::Avx2 => write!(f, "AVX2"),
            Capability::PortableSimd => write!(f, "SIMD"),
        }
    }
}

/// What the host processor can run, as detected at startup.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub avx: bool,
    pub avx2: bool,
    pub portable_simd: bool,
}

impl Capabilities {
    pub fn detect() -> Self {
        let mut capabilities = Self::default();

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            capabilities.avx = is_x86_feature_detected!("avx");
            capabilities.avx2 = is_x86_feature_detected!("avx2");
        }
        capabilities.portable_simd = portable::is_hardware_accelerated();

        tracing::debug!(avx = capabilities.avx,
                        avx2 = capabilities.avx2,
                        portable_simd = capabilities.portable_simd,
                        "probed host capabilities");
        capabilities
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Avx => self.avx,
            Capability::Avx2 => self.avx2,
            Capability::PortableSimd => self.portable_simd,
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(move |&capability| !self.has(capability))
    }

    /// Fails with the first missing capability. Nothing is benchmarked unless
    /// this succeeds: there is no emulated fallback for the intrinsic paths.
    pub fn require_all(&self) -> Result<(), Error> {
        match self.missing().next() {
            None => Ok(()),
            Some(capability) => Err(Error::CapabilityUnavailable(capability)),
        }
    }
}
