use std::fmt;
use std::hint::black_box;
use std::str::FromStr;

use crate::capability::Capability;
use crate::element::{self, load_word, words_as_bytes, words_as_bytes_mut};
use crate::error::{check_shape, Error};
use crate::portable::Portable;

/// Amount of XOR work, in bytes, that one round of [Xor::xor_registers] stands for.
pub const REGISTER_ROUND_BYTES: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Scalar,
    BytePointers,
    LongPointers,
    Avx,
    Avx2,
    Portable,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::Scalar,
        Kind::BytePointers,
        Kind::LongPointers,
        Kind::Avx,
        Kind::Avx2,
        Kind::Portable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Kind::Scalar => "scalar",
            Kind::BytePointers => "byte-pointers",
            Kind::LongPointers => "long-pointers",
            Kind::Avx => "avx",
            Kind::Avx2 => "avx2",
            Kind::Portable => "portable",
        }
    }

    /// The capability that has to be present before this strategy may run.
    pub fn capability(self) -> Option<Capability> {
        match self {
            Kind::Scalar | Kind::BytePointers | Kind::LongPointers => None,
            Kind::Avx => Some(Capability::Avx),
            Kind::Avx2 => Some(Capability::Avx2),
            Kind::Portable => Some(Capability::PortableSimd),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL.into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown strategy {:?}", s))
    }
}

/// One way of computing `difference[i] = old[i] ^ new[i]`.
///
/// Implementations only write `difference`, never allocate, and reject a
/// triple whose lengths differ or are not a whole number of steps.
pub trait Xor: Send + Sync {
    fn kind(&self) -> Kind;

    /// Bytes consumed per step.
    fn step(&self) -> usize;

    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error>;

    fn xor_words(&self, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        self.xor_bytes(words_as_bytes(old), words_as_bytes(new), words_as_bytes_mut(difference))
    }

    /// XORs values held in registers for `rounds` rounds of
    /// [REGISTER_ROUND_BYTES] bytes each, touching no buffer at all.
    fn xor_registers(&self, rounds: usize) -> u64;
}

impl Xor for Box<dyn Xor> {
    fn kind(&self) -> Kind { (**self).kind() }
    fn step(&self) -> usize { (**self).step() }
    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        (**self).xor_bytes(old, new, difference)
    }
    fn xor_words(&self, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        (**self).xor_words(old, new, difference)
    }
    fn xor_registers(&self, rounds: usize) -> u64 { (**self).xor_registers(rounds) }
}

pub(crate) const REGISTER_OLD_WORD: u64 = 0x5555555555555555;
pub(crate) const REGISTER_NEW_WORD: u64 = 0x2AAAAAAAAAAAAAAA;

/// Walks 8-byte runs, assembling one word per run. Any trailing partial run is untouched.
#[inline(always)]
fn xor_byte_runs(old: &[u8], new: &[u8], difference: &mut [u8]) {
    for ((d, o), n) in difference.chunks_exact_mut(8).zip(old.chunks_exact(8)).zip(new.chunks_exact(8)) {
        let word = load_word(o) ^ load_word(n);
        d.copy_from_slice(&word.to_ne_bytes());
    }
}

#[inline(always)]
fn xor_word_slices(old: &[u64], new: &[u64], difference: &mut [u64]) {
    for i in 0..difference.len() {
        difference[i] = old[i] ^ new[i];
    }
}

fn xor_registers_words(rounds: usize) -> u64 {
    let mut stor = REGISTER_OLD_WORD;
    for _ in 0..rounds {
        for _ in 0..REGISTER_ROUND_BYTES / 8 {
            stor = black_box(stor ^ REGISTER_NEW_WORD);
        }
    }
    stor
}

/// One element per step; the reference every other strategy is held to.
#[derive(Copy, Clone, Debug, Default)]
pub struct Scalar {}

impl Scalar {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xor for Scalar {
    fn kind(&self) -> Kind { Kind::Scalar }

    fn step(&self) -> usize { 1 }

    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        check_shape(old.len(), new.len(), difference.len(), 1)?;
        for i in 0..difference.len() {
            difference[i] = old[i] ^ new[i];
        }
        Ok(())
    }

    fn xor_words(&self, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        check_shape(old.len() * 8, new.len() * 8, difference.len() * 8, 8)?;
        xor_word_slices(old, new, difference);
        Ok(())
    }

    fn xor_registers(&self, rounds: usize) -> u64 {
        let mut stor = 0x55u8;
        for _ in 0..rounds {
            for _ in 0..REGISTER_ROUND_BYTES {
                stor = black_box(stor ^ 0xAA);
            }
        }
        stor as u64
    }
}

/// Steps through byte buffers 8 bytes at a time, XORing whole words.
#[derive(Copy, Clone, Debug, Default)]
pub struct BytePointers {}

impl BytePointers {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xor for BytePointers {
    fn kind(&self) -> Kind { Kind::BytePointers }

    fn step(&self) -> usize { 8 }

    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        check_shape(old.len(), new.len(), difference.len(), 8)?;
        xor_byte_runs(old, new, difference);
        Ok(())
    }

    fn xor_registers(&self, rounds: usize) -> u64 {
        xor_registers_words(rounds)
    }
}

/// Reinterprets byte buffers as `u64` words and XORs word by word.
#[derive(Copy, Clone, Debug, Default)]
pub struct LongPointers {}

impl LongPointers {
    pub fn new() -> Self {
        Self {}
    }
}

impl Xor for LongPointers {
    fn kind(&self) -> Kind { Kind::LongPointers }

    fn step(&self) -> usize { 8 }

    fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        check_shape(old.len(), new.len(), difference.len(), 8)?;
        if let (Some(old_words), Some(new_words)) = (element::bytes_as_words(old), element::bytes_as_words(new)) {
            if let Some(difference_words) = element::bytes_as_words_mut(difference) {
                xor_word_slices(old_words, new_words, difference_words);
                return Ok(());
            }
        }
        // not word-aligned: same words, assembled from bytes
        xor_byte_runs(old, new, difference);
        Ok(())
    }

    fn xor_words(&self, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        check_shape(old.len() * 8, new.len() * 8, difference.len() * 8, 8)?;
        xor_word_slices(old, new, difference);
        Ok(())
    }

    fn xor_registers(&self, rounds: usize) -> u64 {
        xor_registers_words(rounds)
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    use super::{Kind, Xor, REGISTER_NEW_WORD, REGISTER_OLD_WORD, REGISTER_ROUND_BYTES};
    use crate::error::{check_shape, Error};
    use std::hint::black_box;
    #[cfg(target_arch = "x86")]
    use core::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::*;

    /// 128-bit loads, one vector XOR, 128-bit store.
    #[derive(Copy, Clone, Debug)]
    pub struct Avx { _feature_detected_witness: () }

    impl Avx {
        pub fn new() -> Option<Self> {
            if is_x86_feature_detected!("avx") {
                return Some(Self { _feature_detected_witness: () });
            }
            None
        }

        #[target_feature(enable = "avx")]
        unsafe fn _xor(&self, old: &[u8], new: &[u8], difference: &mut [u8]) {
            for ((d, o), n) in difference.chunks_exact_mut(16).zip(old.chunks_exact(16)).zip(new.chunks_exact(16)) {
                let x = _mm_xor_si128(_mm_loadu_si128(o.as_ptr() as *const __m128i),
                                      _mm_loadu_si128(n.as_ptr() as *const __m128i));
                _mm_storeu_si128(d.as_mut_ptr() as *mut __m128i, x);
            }
        }

        #[target_feature(enable = "avx")]
        unsafe fn _xor_registers(&self, rounds: usize) -> u64 {
            let mut s1 = _mm_set1_epi64x(REGISTER_OLD_WORD as i64);
            let s2 = _mm_set1_epi64x(REGISTER_NEW_WORD as i64);
            for _ in 0..rounds {
                for _ in 0..REGISTER_ROUND_BYTES / 16 {
                    s1 = black_box(_mm_xor_si128(s1, s2));
                }
            }
            let mut buf = [0u64; 2];
            _mm_storeu_si128(buf.as_mut_ptr() as *mut __m128i, s1);
            buf[0]
        }
    }

    impl Xor for Avx {
        fn kind(&self) -> Kind { Kind::Avx }

        fn step(&self) -> usize { 16 }

        fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
            check_shape(old.len(), new.len(), difference.len(), 16)?;
            let () = self._feature_detected_witness;
            unsafe { self._xor(old, new, difference) };
            Ok(())
        }

        fn xor_registers(&self, rounds: usize) -> u64 {
            let () = self._feature_detected_witness;
            unsafe { self._xor_registers(rounds) }
        }
    }

    /// 256-bit loads, one vector XOR, 256-bit store.
    #[derive(Copy, Clone, Debug)]
    pub struct Avx2 { _feature_detected_witness: () }

    impl Avx2 {
        pub fn new() -> Option<Self> {
            if is_x86_feature_detected!("avx2") {
                return Some(Self { _feature_detected_witness: () });
            }
            None
        }

        #[target_feature(enable = "avx2")]
        unsafe fn _xor(&self, old: &[u8], new: &[u8], difference: &mut [u8]) {
            for ((d, o), n) in difference.chunks_exact_mut(32).zip(old.chunks_exact(32)).zip(new.chunks_exact(32)) {
                let x = _mm256_xor_si256(_mm256_loadu_si256(o.as_ptr() as *const __m256i),
                                         _mm256_loadu_si256(n.as_ptr() as *const __m256i));
                _mm256_storeu_si256(d.as_mut_ptr() as *mut __m256i, x);
            }
        }

        #[target_feature(enable = "avx2")]
        unsafe fn _xor_registers(&self, rounds: usize) -> u64 {
            let mut s1 = _mm256_set1_epi64x(REGISTER_OLD_WORD as i64);
            let s2 = _mm256_set1_epi64x(REGISTER_NEW_WORD as i64);
            for _ in 0..rounds {
                for _ in 0..REGISTER_ROUND_BYTES / 32 {
                    s1 = black_box(_mm256_xor_si256(s1, s2));
                }
            }
            let mut buf = [0u64; 4];
            _mm256_storeu_si256(buf.as_mut_ptr() as *mut __m256i, s1);
            buf[0]
        }
    }

    impl Xor for Avx2 {
        fn kind(&self) -> Kind { Kind::Avx2 }

        fn step(&self) -> usize { 32 }

        fn xor_bytes(&self, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
            check_shape(old.len(), new.len(), difference.len(), 32)?;
            let () = self._feature_detected_witness;
            unsafe { self._xor(old, new, difference) };
            Ok(())
        }

        fn xor_registers(&self, rounds: usize) -> u64 {
            let () = self._feature_detected_witness;
            unsafe { self._xor_registers(rounds) }
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use x86::*;

/// The widest single strategy this host can run.
pub fn runtime_detect() -> Box<dyn Xor> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        match Avx2::new() {
            None => (),
            Some(avx2) => { return Box::new(avx2); }
        }
        match Avx::new() {
            None => (),
            Some(avx) => { return Box::new(avx); }
        }
    }
    Box::new(Portable::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle;

    trait Testable {
        fn run_test(&self, old: &[u8], new: &[u8]);
    }

    impl<T: Xor> Testable for T {
        fn run_test(&self, old: &[u8], new: &[u8]) {
            let mut difference = vec![0u8; old.len()];
            self.xor_bytes(old, new, &mut difference[..]).unwrap();
            if let Err(e) = oracle::verify(self.kind(), old, new, &difference[..]) {
                panic!("{}", e);
            }

            let old_words: Vec<u64> = old.chunks_exact(8).map(load_word).collect();
            let new_words: Vec<u64> = new.chunks_exact(8).map(load_word).collect();
            let mut difference_words = vec![0u64; old_words.len()];
            self.xor_words(&old_words[..], &new_words[..], &mut difference_words[..]).unwrap();
            if let Err(e) = oracle::verify(self.kind(), &old_words[..], &new_words[..], &difference_words[..]) {
                panic!("{}", e);
            }
        }
    }

    fn run_test(old: &[u8], new: &[u8]) {
        Scalar::new().run_test(old, new);
        BytePointers::new().run_test(old, new);
        LongPointers::new().run_test(old, new);
        Portable::new().run_test(old, new);

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            match Avx::new() {
                Some(avx) => avx.run_test(old, new),
                None => (),
            }
            match Avx2::new() {
                Some(avx2) => avx2.run_test(old, new),
                None => (),
            }
        }
    }

    #[test]
    fn test_1() {
        run_test(&[0xAA; 64], &[0x55; 64]);
    }

    #[test]
    fn test_2() {
        let old: Vec<u8> = (0..=255).collect();
        let new: Vec<u8> = (0..=255).rev().collect();
        run_test(&old[..], &new[..]);
    }

    #[test]
    fn test_3() {
        let old: Vec<u8> = (0..1024).map(|i| (i * 7 % 251) as u8).collect();
        let new: Vec<u8> = (0..1024).map(|i| (i * 13 % 241) as u8).collect();
        run_test(&old[..], &new[..]);
    }

    #[test]
    fn empty() {
        run_test(&[], &[]);
    }

    #[test]
    fn unaligned_long_pointers() {
        let old: Vec<u8> = (0..72).map(|i| i as u8).collect();
        let new: Vec<u8> = (0..72).map(|i| (i * 3) as u8).collect();
        let mut difference = vec![0u8; 72];
        LongPointers::new().xor_bytes(&old[1..65], &new[3..67], &mut difference[5..69]).unwrap();
        oracle::verify(Kind::LongPointers, &old[1..65], &new[3..67], &difference[5..69]).unwrap();
        assert!(difference[..5].iter().all(|&b| b == 0));
        assert!(difference[69..].iter().all(|&b| b == 0));
    }

    #[test]
    fn rejects_bad_triples() {
        let old = [0u8; 24];
        let new = [0u8; 24];
        let mut difference = [0u8; 16];
        assert_eq!(Scalar::new().xor_bytes(&old, &new, &mut difference),
                   Err(Error::LengthMismatch { old: 24, new: 24, difference: 16 }));

        let mut difference = [0u8; 24];
        assert_eq!(Scalar::new().xor_bytes(&old, &new, &mut difference), Ok(()));
        assert_eq!(BytePointers::new().xor_bytes(&old[..20], &new[..20], &mut difference[..20]),
                   Err(Error::Misaligned { len: 20, step: 8 }));

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        match Avx2::new() {
            Some(avx2) => assert_eq!(avx2.xor_bytes(&old, &new, &mut difference),
                                     Err(Error::Misaligned { len: 24, step: 32 })),
            None => (),
        };
    }

    #[test]
    fn registers() {
        // an even number of XORs with the same constant is the identity
        assert_eq!(Scalar::new().xor_registers(3), 0x55);
        assert_eq!(BytePointers::new().xor_registers(2), REGISTER_OLD_WORD);
        assert_eq!(LongPointers::new().xor_registers(0), REGISTER_OLD_WORD);

        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        {
            match Avx::new() {
                Some(avx) => assert_eq!(avx.xor_registers(5), REGISTER_OLD_WORD),
                None => (),
            }
            match Avx2::new() {
                Some(avx2) => assert_eq!(avx2.xor_registers(5), REGISTER_OLD_WORD),
                None => (),
            }
        }
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(kind.name().parse::<Kind>(), Ok(kind));
        }
        assert!("sse".parse::<Kind>().is_err());
        assert_eq!(format!("{:<8}|", Kind::Avx), "avx     |");
    }

    #[test]
    fn runtime_detect_is_correct() {
        let xor = runtime_detect();
        xor.run_test(&[0x0F; 128], &[0xF0; 128]);
    }
}
