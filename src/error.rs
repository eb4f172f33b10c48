use crate::capability::Capability;
use crate::element::ElementWidth;
use crate::xor::Kind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{0} is not supported.")]
    CapabilityUnavailable(Capability),
    #[error("Strategy {0} is not available on this host")]
    StrategyUnavailable(Kind),
    #[error("Buffer lengths differ: old {old}, new {new}, difference {difference}")]
    LengthMismatch { old: usize, new: usize, difference: usize },
    #[error("Buffer of {len} bytes is not a multiple of the {step}-byte step")]
    Misaligned { len: usize, step: usize },
    #[error("Iteration budget {budget} does not split evenly across {threads} threads")]
    UnevenSplit { budget: usize, threads: usize },
    #[error("{0}")]
    Mismatch(Mismatch),
    #[error("Failed to spawn worker thread: {0:?}")]
    Spawn(std::io::ErrorKind),
}

/// The first element at which a strategy disagreed with the scalar reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub kind: Kind,
    pub width: ElementWidth,
    pub position: usize,
    pub actual: u64,
    pub expected: u64,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.width.bytes() * 2;
        write!(f, "{}: invalid {} at position {}: 0x{:0digits$x} != 0x{:0digits$x}.",
               self.kind, self.width, self.position, self.actual, self.expected, digits = digits)
    }
}

/// Checks that a triple has a common length which is a whole number of
/// `step`-byte steps. Lengths are in bytes. Returns the number of steps.
pub fn check_shape(old: usize, new: usize, difference: usize, step: usize) -> Result<usize, Error> {
    if old != new || new != difference {
        return Err(Error::LengthMismatch { old, new, difference });
    }
    if step == 0 || difference % step != 0 {
        return Err(Error::Misaligned { len: difference, step });
    }
    Ok(difference / step)
}
