use crate::capability::Capabilities;
use crate::error::Error;
use crate::portable::Portable;
use crate::xor::{self, Kind, Xor};

/// Every strategy the host can run, chosen once from the probed capabilities.
pub struct Registry {
    capabilities: Capabilities,
    strategies: Vec<Box<dyn Xor>>,
}

impl Registry {
    pub fn detect() -> Self {
        Self::from_capabilities(Capabilities::detect())
    }

    /// Intrinsic strategies are only registered when the capability is set
    /// and the strategy itself confirms the instruction set is present.
    pub fn from_capabilities(capabilities: Capabilities) -> Self {
        let mut strategies: Vec<Box<dyn Xor>> = Vec::with_capacity(Kind::ALL.len());
        for kind in Kind::ALL {
            if let Some(capability) = kind.capability() {
                if !capabilities.has(capability) {
                    continue;
                }
            }
            match build(kind) {
                None => tracing::debug!(strategy = %kind, "strategy not constructible on this host"),
                Some(strategy) => strategies.push(strategy),
            }
        }
        tracing::debug!(strategies = ?strategies.iter().map(|s| s.kind()).collect::<Vec<_>>(), "built strategy registry");
        Self { capabilities, strategies }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn get(&self, kind: Kind) -> Option<&dyn Xor> {
        self.strategies.iter().find(|s| s.kind() == kind).map(|s| &**s)
    }

    pub fn require(&self, kind: Kind) -> Result<&dyn Xor, Error> {
        self.get(kind).ok_or(Error::StrategyUnavailable(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Xor> {
        self.strategies.iter().map(|s| &**s)
    }

    pub fn kinds(&self) -> Vec<Kind> {
        self.iter().map(|s| s.kind()).collect()
    }
}

fn build(kind: Kind) -> Option<Box<dyn Xor>> {
    match kind {
        Kind::Scalar => Some(Box::new(xor::Scalar::new())),
        Kind::BytePointers => Some(Box::new(xor::BytePointers::new())),
        Kind::LongPointers => Some(Box::new(xor::LongPointers::new())),
        Kind::Portable => Some(Box::new(Portable::new())),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Kind::Avx => xor::Avx::new().map(|s| Box::new(s) as Box<dyn Xor>),
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        Kind::Avx2 => xor::Avx2::new().map(|s| Box::new(s) as Box<dyn Xor>),
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        Kind::Avx | Kind::Avx2 => None,
    }
}
