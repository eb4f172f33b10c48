use std::cell::UnsafeCell;

use rand::{Fill, Rng};

use crate::element::{Element, ElementWidth};
use crate::error::Error;
use crate::xor::Xor;

pub const FRAME_WIDTH: usize = 1920;
pub const FRAME_HEIGHT: usize = 1080;
pub const BYTES_PER_PIXEL: usize = 3;

/// One 24bpp full HD frame.
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * BYTES_PER_PIXEL;
pub const FRAME_WORDS: usize = FRAME_BYTES / 8;

pub const PARALLEL_BYTES: usize = 256;
pub const PARALLEL_WORDS: usize = PARALLEL_BYTES / 8;

/// Step of the widest fixed-width strategy. Every generated buffer is a
/// whole number of these.
pub const MAX_STEP: usize = 32;

pub const THREAD_COUNTS: [usize; 4] = [1, 2, 4, 8];

/// Total inner iterations of a parallel trial, whatever its thread count.
pub const ITERATION_BUDGET: usize = 1 << 20;

/// 1, 2, 4, ... up to and including `max`.
pub fn thread_counts(max: usize) -> impl Iterator<Item = usize> {
    std::iter::successors(Some(1usize), |&threads| threads.checked_mul(2))
        .take_while(move |&threads| threads <= max)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Shape {
    pub len: usize,
    pub width: ElementWidth,
    pub threads: usize,
}

impl Shape {
    pub fn new<T: Element>(len: usize, threads: usize) -> Self {
        Self { len, width: T::WIDTH, threads }
    }

    pub fn bytes(&self) -> usize {
        self.len * self.width.bytes()
    }

    pub fn check(&self) -> Result<(), Error> {
        if self.bytes() % MAX_STEP != 0 {
            return Err(Error::Misaligned { len: self.bytes(), step: MAX_STEP });
        }
        Ok(())
    }
}

/// Two source buffers and the destination a strategy writes into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workload<T> {
    pub old: Vec<T>,
    pub new: Vec<T>,
    pub difference: Vec<T>,
}

impl<T: Element> Workload<T> {
    pub fn random<R: Rng>(len: usize, rng: &mut R) -> Result<Self, Error>
    where [T]: Fill
    {
        Shape::new::<T>(len, 1).check()?;
        let mut old = vec![T::default(); len];
        let mut new = vec![T::default(); len];
        rng.fill(&mut old[..]);
        rng.fill(&mut new[..]);
        let difference = vec![T::default(); len];
        Ok(Self { old, new, difference })
    }

    pub fn filled(len: usize, old: T, new: T) -> Result<Self, Error> {
        Shape::new::<T>(len, 1).check()?;
        Ok(Self {
            old: vec![old; len],
            new: vec![new; len],
            difference: vec![T::default(); len],
        })
    }

    pub fn len(&self) -> usize {
        self.difference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.difference.is_empty()
    }

    pub fn shape(&self) -> Shape {
        Shape::new::<T>(self.len(), 1)
    }

    pub fn reset(&mut self) {
        self.difference.fill(T::default());
    }

    pub fn run(&mut self, strategy: &dyn Xor) -> Result<(), Error> {
        T::xor_with(strategy, &self.old[..], &self.new[..], &mut self.difference[..])
    }
}

pub fn frame_bytes() -> Result<Workload<u8>, Error> {
    Workload::random(FRAME_BYTES, &mut rand::thread_rng())
}

pub fn frame_words() -> Result<Workload<u64>, Error> {
    Workload::random(FRAME_WORDS, &mut rand::thread_rng())
}

/// A destination written concurrently by every worker of a shared-memory
/// trial. Workers hand it straight to a strategy as `&mut [T]` with no
/// locking, so the stores of different threads race on the same cache lines.
pub struct SharedBuffer {
    words: Box<[UnsafeCell<u64>]>,
}

// Writers only come through `racy_slice_mut`, whose callers accept the race.
unsafe impl Sync for SharedBuffer {}

impl SharedBuffer {
    pub fn zeroed(len_bytes: usize) -> Result<Self, Error> {
        if len_bytes % 8 != 0 {
            return Err(Error::Misaligned { len: len_bytes, step: 8 });
        }
        Ok(Self { words: (0..len_bytes / 8).map(|_| UnsafeCell::new(0)).collect() })
    }

    pub fn len_bytes(&self) -> usize {
        self.words.len() * 8
    }

    /// Mutable view of the whole buffer as `T`s.
    ///
    /// # Safety
    ///
    /// Every caller gets a view of the same memory. Concurrent writers race
    /// and the content is unspecified until all of them are done; no view
    /// may outlive the trial that took it.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn racy_slice_mut<T: Element>(&self) -> &mut [T] {
        // UnsafeCell<u64> has the layout of u64, so the storage is 8-byte aligned.
        std::slice::from_raw_parts_mut(self.words.as_ptr() as *mut T, self.len_bytes() / T::WIDTH.bytes())
    }

    /// Copies the content out. Only meaningful once no worker is writing.
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        let items = unsafe {
            std::slice::from_raw_parts(self.words.as_ptr() as *const T, self.len_bytes() / T::WIDTH.bytes())
        };
        items.to_vec()
    }
}

/// One thread-count configuration of a parallel workload, with its own destination.
pub struct ParallelTrial {
    pub threads: usize,
    pub difference: SharedBuffer,
}

/// A fixed source pair crossed with a set of thread counts.
pub struct ParallelWorkload<T> {
    pub old: Vec<T>,
    pub new: Vec<T>,
    pub trials: Vec<ParallelTrial>,
}

impl<T: Element> ParallelWorkload<T> {
    pub fn random<R: Rng>(len: usize, thread_counts: &[usize], rng: &mut R) -> Result<Self, Error>
    where [T]: Fill
    {
        let Workload { old, new, .. } = Workload::<T>::random(len, rng)?;
        let trials = thread_counts.iter()
            .map(|&threads| -> Result<ParallelTrial, Error> {
                Ok(ParallelTrial { threads, difference: SharedBuffer::zeroed(len * T::WIDTH.bytes())? })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Self { old, new, trials })
    }

    pub fn shapes(&self) -> impl Iterator<Item = Shape> + '_ {
        self.trials.iter().map(|trial| Shape::new::<T>(self.old.len(), trial.threads))
    }
}

pub fn parallel_bytes() -> Result<ParallelWorkload<u8>, Error> {
    ParallelWorkload::random(PARALLEL_BYTES, &THREAD_COUNTS, &mut rand::thread_rng())
}

pub fn parallel_words() -> Result<ParallelWorkload<u64>, Error> {
    ParallelWorkload::random(PARALLEL_WORDS, &THREAD_COUNTS, &mut rand::thread_rng())
}
