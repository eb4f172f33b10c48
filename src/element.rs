use std::fmt;
use std::ops::BitXor;

use crate::error::Error;
use crate::xor::Xor;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementWidth {
    Byte,
    Word,
}

impl ElementWidth {
    pub fn bytes(self) -> usize {
        match self {
            ElementWidth::Byte => 1,
            ElementWidth::Word => 8,
        }
    }
}

impl fmt::Display for ElementWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementWidth::Byte => f.pad("byte"),
            ElementWidth::Word => f.pad("word"),
        }
    }
}

/// A buffer element: `u8` for byte-addressed frames, `u64` for word-addressed ones.
pub trait Element: Copy + Default + Eq + BitXor<Output = Self> + fmt::Debug + Send + Sync + 'static {
    const WIDTH: ElementWidth;

    /// Routes a strategy call to the entry point for this width.
    fn xor_with(strategy: &dyn Xor, old: &[Self], new: &[Self], difference: &mut [Self]) -> Result<(), Error>;

    fn as_bytes(items: &[Self]) -> &[u8];

    fn as_bytes_mut(items: &mut [Self]) -> &mut [u8];

    fn to_u64(self) -> u64;
}

impl Element for u8 {
    const WIDTH: ElementWidth = ElementWidth::Byte;

    #[inline(always)]
    fn xor_with(strategy: &dyn Xor, old: &[u8], new: &[u8], difference: &mut [u8]) -> Result<(), Error> {
        strategy.xor_bytes(old, new, difference)
    }

    fn as_bytes(items: &[u8]) -> &[u8] {
        items
    }

    fn as_bytes_mut(items: &mut [u8]) -> &mut [u8] {
        items
    }

    fn to_u64(self) -> u64 {
        self as u64
    }
}

impl Element for u64 {
    const WIDTH: ElementWidth = ElementWidth::Word;

    #[inline(always)]
    fn xor_with(strategy: &dyn Xor, old: &[u64], new: &[u64], difference: &mut [u64]) -> Result<(), Error> {
        strategy.xor_words(old, new, difference)
    }

    fn as_bytes(items: &[u64]) -> &[u8] {
        words_as_bytes(items)
    }

    fn as_bytes_mut(items: &mut [u64]) -> &mut [u8] {
        words_as_bytes_mut(items)
    }

    fn to_u64(self) -> u64 {
        self
    }
}

/// Reads one native-endian word from an 8-byte run.
#[inline(always)]
pub fn load_word(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_ne_bytes(word)
}

pub fn words_as_bytes(words: &[u64]) -> &[u8] {
    // u8 has no alignment requirement and every u64 is eight valid bytes.
    unsafe { std::slice::from_raw_parts(words.as_ptr() as *const u8, words.len() * 8) }
}

pub fn words_as_bytes_mut(words: &mut [u64]) -> &mut [u8] {
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr() as *mut u8, words.len() * 8) }
}

/// Views a byte run as words, provided it starts on a word boundary and
/// contains a whole number of words.
pub fn bytes_as_words(bytes: &[u8]) -> Option<&[u64]> {
    let (prefix, words, suffix) = unsafe { bytes.align_to::<u64>() };
    if prefix.is_empty() && suffix.is_empty() { Some(words) } else { None }
}

pub fn bytes_as_words_mut(bytes: &mut [u8]) -> Option<&mut [u64]> {
    let (prefix, words, suffix) = unsafe { bytes.align_to_mut::<u64>() };
    if prefix.is_empty() && suffix.is_empty() { Some(words) } else { None }
}
