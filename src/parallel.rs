//! Fork-join trials that split a fixed iteration budget across a number of
//! worker threads, so that trials with different thread counts do the same
//! total amount of work.

use std::fmt;
use std::hint::black_box;
use std::str::FromStr;

use rand::Fill;

use crate::element::Element;
use crate::error::{check_shape, Error};
use crate::workload::{ParallelTrial, ParallelWorkload, SharedBuffer, Workload};
use crate::xor::Xor;

pub use crate::workload::ITERATION_BUDGET;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Discipline {
    /// All workers read the same sources and write the same destination.
    Shared,
    /// Each worker allocates and randomizes its own buffers.
    ThreadLocal,
    /// [Discipline::ThreadLocal] setup with no XOR work, to subtract from it.
    Baseline,
    /// No buffers at all: values stay in registers.
    RegisterOnly,
}

impl Discipline {
    pub const ALL: [Discipline; 4] = [
        Discipline::Shared,
        Discipline::ThreadLocal,
        Discipline::Baseline,
        Discipline::RegisterOnly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Discipline::Shared => "shared",
            Discipline::ThreadLocal => "thread-local",
            Discipline::Baseline => "baseline",
            Discipline::RegisterOnly => "register-only",
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Discipline::ALL.into_iter()
            .find(|discipline| discipline.name() == s)
            .ok_or_else(|| format!("unknown discipline {:?}", s))
    }
}

/// A completed trial.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Trial {
    pub discipline: Discipline,
    pub threads: usize,
    pub iterations_per_thread: usize,
}

impl Trial {
    pub fn total_iterations(&self) -> usize {
        self.threads * self.iterations_per_thread
    }
}

/// Iterations each of `threads` workers runs. Refuses any split that would
/// lose a remainder, so `threads * result == budget` always holds.
pub fn split_budget(budget: usize, threads: usize) -> Result<usize, Error> {
    if threads == 0 || budget % threads != 0 {
        return Err(Error::UnevenSplit { budget, threads });
    }
    Ok(budget / threads)
}

/// Runs `work` on exactly `threads` scoped workers and blocks until every one
/// has finished. Returns the first worker error; a worker panic is resumed here.
fn fork_join<F>(threads: usize, work: F) -> Result<(), Error>
where
    F: Fn(usize) -> Result<(), Error> + Sync,
{
    let threads_result = crossbeam_utils::thread::scope(|scope| -> Result<(), Error> {
        let mut handles = Vec::with_capacity(threads);
        for thread_index in 0..threads {
            let work = &work;
            let handle = scope.builder()
                .name(format!("worker #{}", thread_index + 1))
                .spawn(move |_| {
                    #[cfg(feature = "vtune")] let domain = ittapi::Domain::new(std::thread::current().name().unwrap_or("worker"));
                    #[cfg(feature = "vtune")] let task = ittapi::Task::begin(&domain, "work_unit");
                    let result = work(thread_index);
                    #[cfg(feature = "vtune")] task.end();
                    result
                })
                .map_err(|e| Error::Spawn(e.kind()))?;
            handles.push(handle);
        }
        handles.into_iter()
            .map(|handle| match handle.join() {
                Err(e) => std::panic::resume_unwind(e),
                Ok(result) => result,
            })
            .fold(Ok(()), |acc, result| acc.and(result))
    });

    match threads_result {
        Err(e) => std::panic::resume_unwind(e),
        Ok(result) => result,
    }
}

pub fn run_shared<T: Element>(strategy: &dyn Xor,
                              old: &[T],
                              new: &[T],
                              difference: &SharedBuffer,
                              threads: usize,
                              budget: usize)
                              -> Result<Trial, Error>
{
    let iterations_per_thread = split_budget(budget, threads)?;
    let bytes = T::WIDTH.bytes();
    check_shape(old.len() * bytes, new.len() * bytes, difference.len_bytes(), strategy.step())?;
    tracing::debug!(strategy = %strategy.kind(), threads, iterations_per_thread, "shared trial");

    fork_join(threads, |_| {
        // every worker stores into the same destination; the view dies with the worker
        let difference = unsafe { difference.racy_slice_mut::<T>() };
        for _ in 0..iterations_per_thread {
            T::xor_with(strategy, old, new, difference)?;
        }
        Ok(())
    })?;

    Ok(Trial { discipline: Discipline::Shared, threads, iterations_per_thread })
}

pub fn run_thread_local<T: Element>(strategy: &dyn Xor, len: usize, threads: usize, budget: usize) -> Result<Trial, Error>
where [T]: Fill
{
    let iterations_per_thread = split_budget(budget, threads)?;
    tracing::debug!(strategy = %strategy.kind(), threads, iterations_per_thread, "thread-local trial");

    fork_join(threads, |_| {
        let mut workload = Workload::<T>::random(len, &mut rand::thread_rng())?;
        for _ in 0..iterations_per_thread {
            workload.run(strategy)?;
        }
        black_box(&workload.difference);
        Ok(())
    })?;

    Ok(Trial { discipline: Discipline::ThreadLocal, threads, iterations_per_thread })
}

pub fn run_baseline<T: Element>(len: usize, threads: usize, budget: usize) -> Result<Trial, Error>
where [T]: Fill
{
    let iterations_per_thread = split_budget(budget, threads)?;
    tracing::debug!(threads, "baseline trial");

    fork_join(threads, |_| {
        let workload = Workload::<T>::random(len, &mut rand::thread_rng())?;
        black_box(workload);
        Ok(())
    })?;

    Ok(Trial { discipline: Discipline::Baseline, threads, iterations_per_thread })
}

pub fn run_register_only(strategy: &dyn Xor, threads: usize, budget: usize) -> Result<Trial, Error> {
    let iterations_per_thread = split_budget(budget, threads)?;
    tracing::debug!(strategy = %strategy.kind(), threads, iterations_per_thread, "register-only trial");

    fork_join(threads, |_| {
        black_box(strategy.xor_registers(iterations_per_thread));
        Ok(())
    })?;

    Ok(Trial { discipline: Discipline::RegisterOnly, threads, iterations_per_thread })
}

/// Runs one thread-count configuration of `workload` under `discipline`.
pub fn run_trial<T: Element>(discipline: Discipline,
                             strategy: &dyn Xor,
                             workload: &ParallelWorkload<T>,
                             trial: &ParallelTrial,
                             budget: usize)
                             -> Result<Trial, Error>
where [T]: Fill
{
    let len = workload.old.len();
    match discipline {
        Discipline::Shared =>
            run_shared(strategy, &workload.old[..], &workload.new[..], &trial.difference, trial.threads, budget),
        Discipline::ThreadLocal => run_thread_local::<T>(strategy, len, trial.threads, budget),
        Discipline::Baseline => run_baseline::<T>(len, trial.threads, budget),
        Discipline::RegisterOnly => run_register_only(strategy, trial.threads, budget),
    }
}

/// Runs every thread-count configuration of `workload` in order.
pub fn run<T: Element>(discipline: Discipline, strategy: &dyn Xor, workload: &ParallelWorkload<T>, budget: usize)
                       -> Result<Vec<Trial>, Error>
where [T]: Fill
{
    workload.trials.iter()
        .map(|trial| run_trial(discipline, strategy, workload, trial, budget))
        .collect()
}
