use crate::error::Error;
use crate::workload::{self, Shape};

/// Parameters of a benchmark run. The defaults are the frame and parallel
/// shapes every trial is compared against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Total iterations of a parallel trial, split across its threads.
    pub budget: usize,
    pub thread_counts: Vec<usize>,
    /// Bytes per frame buffer.
    pub frame_len: usize,
    /// Bytes per parallel-trial buffer.
    pub parallel_len: usize,
    /// Timed runs of each single-threaded strategy.
    pub repetitions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            budget: workload::ITERATION_BUDGET,
            thread_counts: workload::THREAD_COUNTS.to_vec(),
            frame_len: workload::FRAME_BYTES,
            parallel_len: workload::PARALLEL_BYTES,
            repetitions: 10,
        }
    }
}

impl Config {
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.thread_counts = workload::thread_counts(max_threads).collect();
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        for &threads in self.thread_counts.iter() {
            if threads == 0 || self.budget % threads != 0 {
                return Err(Error::UnevenSplit { budget: self.budget, threads });
            }
        }
        for len in [self.frame_len, self.parallel_len] {
            Shape::new::<u8>(len, 1).check()?;
        }
        Ok(())
    }

    /// Word count matching `frame_len` bytes.
    pub fn frame_words(&self) -> usize {
        self.frame_len / 8
    }

    pub fn parallel_words(&self) -> usize {
        self.parallel_len / 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::MAX_STEP;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.frame_words(), workload::FRAME_WORDS);
        assert_eq!(config.parallel_words(), workload::PARALLEL_WORDS);
    }

    #[test]
    fn max_threads() {
        assert_eq!(Config::default().with_max_threads(4).thread_counts, vec![1, 2, 4]);
        assert_eq!(Config::default().with_max_threads(16).thread_counts, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn invalid() {
        let config = Config { budget: 12, ..Config::default() };
        assert_eq!(config.validate(), Err(Error::UnevenSplit { budget: 12, threads: 8 }));

        let config = Config { parallel_len: 48, ..Config::default() };
        assert_eq!(config.validate(), Err(Error::Misaligned { len: 48, step: MAX_STEP }));
    }
}
