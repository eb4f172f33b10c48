//! A vector path that does not name an instruction set. The block width is
//! picked at runtime from what the host offers, and each block is a fixed-size
//! loop the compiler turns into whatever vector instructions that width maps to.

use std::hint::black_box;

use crate::element::Element;
use crate::error::{check_shape, Error};
use crate::xor::{Kind, Xor, REGISTER_NEW_WORD, REGISTER_OLD_WORD, REGISTER_ROUND_BYTES};

/// Block widths, in bytes, that [Portable] can be built for.
pub const SUPPORTED_WIDTHS: [usize; 4] = [8, 16, 32, 64];

/// Widest vector register, in bytes, the host can use.
pub fn native_width() -> usize {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx2") {
            return 32;
        }
        if is_x86_feature_detected!("sse2") {
            return 16;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return 16;
        }
    }
    8
}

/// Whether blocks are wider than a general purpose register.
pub fn is_hardware_accelerated() -> bool {
    native_width() > 8
}

#[inline(always)]
fn xor_blocks<T: Element, const N: usize>(old: &[T], new: &[T], difference: &mut [T]) {
    for ((d, o), n) in difference.chunks_exact_mut(N).zip(old.chunks_exact(N)).zip(new.chunks_exact(N)) {
        for i in 0..N {
            d[i] = o[i] ^ n[i];
        }
    }
}

#[inline(always)]
fn xor_lanes<T: Element>(lanes: usize, old: &[T], new: &[T], difference: &mut [T]) {
    match lanes {
        1 => xor_blocks::<T, 1>(old, new, difference),
        2 => xor_blocks::<T, 2>(old, new, difference),
        4 => xor_blocks::<T, 4>(old, new, difference),
        8 => xor_blocks::<T, 8>(old, new, difference),
        16 => xor_blocks::<T, 16>(old, new, difference),
        32 => xor_blocks::<T, 32>(old, new, difference),
        64 => xor_blocks::<T, 64>(old, new, difference),
        _ => unreachable!("unsupported lane count {}", lanes),
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2")]
unsafe fn xor_lanes_avx2<T: Element>(lanes: usize, old: &[T], new: &[T], difference: &mut [T]) {
    xor_lanes::<T>(lanes, old, new, difference)
}

#[derive(Copy, Clone, Debug)]
pub struct Portable {
    width: usize,
    avx2: bool,
}

impl Portable {
    pub fn new() -> Self {
        Self { width: native_width(), avx2: avx2_detected() }
    }

    pub fn with_width(width: usize) -> Option<Self> {
        if SUPPORTED_WIDTHS.contains(&width) {
            Some(Self { width, avx2: avx2_detected() })
        } else {
            None
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Elements of type `T` per block.
    pub fn lanes<T: Element>(&self) -> usize {
        self.width / T::WIDTH.bytes()
    }

    fn run<T: Element>(&self, old: &[T], new: &[T], difference: &mut [T]) -> Result<(), Error> {
        let bytes = T::WIDTH.bytes();
        check_shape(old.len() * bytes, new.len() * bytes, difference.len() * bytes, self.width)?;
        let lanes = self.lanes::<T>();

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        if self.avx2 {
            unsafe { xor_lanes_avx2::<T>(lanes, old, new, difference) };
            return Ok(());
        }

        xor_lanes::<T>(lanes, old, new, difference);
        Ok(())
    }
}

impl Default for Portable {
    fn default() -> Self {
        Self::new()
    }
}

fn avx2_detected() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    if is_x86_feature_detected!("avx2") {
        return true;
    }
    false
}

impl Xor for Portable {
    fn kind(&self) -> Kind { Kind::Portable }

    fn step(&self) -> usize { self.width }

    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        self.run::<u8>(old, new, difference)
    }

    fn xor_words(&self, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        self.run::<u64>(old, new, difference)
    }

    fn xor_registers(&self, rounds: usize) -> u64 {
        let mut block = [REGISTER_OLD_WORD; 8];
        let words = self.lanes::<u64>();
        for _ in 0..rounds {
            for _ in 0..REGISTER_ROUND_BYTES / self.width {
                for i in 0..words {
                    block[i] ^= REGISTER_NEW_WORD;
                }
                block = black_box(block);
            }
        }
        block[0]
    }
}
