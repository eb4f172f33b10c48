use std::time::{Duration, Instant};

use clap::Parser;
use simd_xor::parallel::{self, Discipline};
use simd_xor::*;

/// Times every XOR strategy over full HD frames, then sweeps thread counts
/// over small buffers under each memory discipline.
#[derive(Parser, Debug)]
#[command(name = "xorbench")]
struct Args {
    /// Strategy to run; repeat for several. Defaults to every available one.
    #[arg(long = "strategy", value_name = "KIND")]
    strategies: Vec<Kind>,

    /// Parallel discipline to run; repeat for several. Defaults to all.
    #[arg(long = "discipline", value_name = "DISCIPLINE")]
    disciplines: Vec<Discipline>,

    /// Total iterations per parallel trial, split across its threads.
    #[arg(long, default_value_t = parallel::ITERATION_BUDGET)]
    budget: usize,

    /// Largest thread count of the sweep; counts double from 1.
    #[arg(long, default_value_t = 8)]
    max_threads: usize,

    /// Timed runs per single-threaded strategy.
    #[arg(long, default_value_t = 10)]
    repetitions: usize,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn time<F: FnMut() -> Result<(), Error>>(repetitions: usize, mut f: F) -> Result<Duration, Error> {
    let start = Instant::now();
    for _ in 0..repetitions {
        f()?;
    }
    Ok(start.elapsed() / std::cmp::max(repetitions, 1) as u32)
}

fn megabytes_per_second(bytes: usize, elapsed: Duration) -> f64 {
    bytes as f64 / elapsed.as_secs_f64().max(f64::MIN_POSITIVE) / 1e6
}

/// One line per discipline, strategy and thread count.
fn sweep<T: Element>(disciplines: &[Discipline],
                     strategies: &[&dyn Xor],
                     workload: &ParallelWorkload<T>,
                     budget: usize)
                     -> Result<(), Error>
where [T]: rand::Fill
{
    for &discipline in disciplines {
        for &strategy in strategies {
            let label = if discipline == Discipline::Baseline { "-".to_owned() } else { strategy.kind().to_string() };
            for trial in workload.trials.iter() {
                let start = Instant::now();
                let result = parallel::run_trial(discipline, strategy, workload, trial, budget)?;
                let elapsed = start.elapsed();
                tracing::debug!(%discipline, strategy = %label, width = %T::WIDTH, threads = result.threads, ?elapsed, "trial finished");
                println!("{:<14} {:<14} {:<5} threads {:>2} x {:>8} {:>12.3?}",
                         discipline, label, T::WIDTH, result.threads, result.iterations_per_thread, elapsed);
            }
            // setup cost does not depend on the strategy
            if discipline == Discipline::Baseline {
                break;
            }
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<(), Error> {
    let capabilities = Capabilities::detect();
    capabilities.require_all()?;

    let config = Config { budget: args.budget, repetitions: args.repetitions, ..Config::default() }
        .with_max_threads(args.max_threads);
    config.validate()?;

    let physical_cores = num_cpus::get_physical();
    if config.thread_counts.iter().any(|&threads| threads > physical_cores) {
        tracing::warn!(physical_cores, "thread sweep exceeds the physical core count");
    }

    let registry = Registry::from_capabilities(capabilities);
    let kinds = if args.strategies.is_empty() { registry.kinds() } else { args.strategies.clone() };
    let strategies = kinds.iter()
        .map(|&kind| registry.require(kind))
        .collect::<Result<Vec<_>, Error>>()?;

    let mut rng = rand::thread_rng();
    let mut bytes = Workload::<u8>::random(config.frame_len, &mut rng)?;
    let mut words = Workload::<u64>::random(config.frame_words(), &mut rng)?;

    println!("frame: {} bytes, {} runs each", config.frame_len, config.repetitions);
    for &strategy in strategies.iter() {
        oracle::check(strategy, &mut bytes)?;
        oracle::check(strategy, &mut words)?;
        tracing::info!(strategy = %strategy.kind(), "verified against scalar reference");

        let byte_time = time(config.repetitions, || bytes.run(strategy))?;
        let word_time = time(config.repetitions, || words.run(strategy))?;
        println!("{:<14} bytes {:>12.3?} {:>9.1} MB/s   words {:>12.3?} {:>9.1} MB/s",
                 strategy.kind(),
                 byte_time, megabytes_per_second(config.frame_len, byte_time),
                 word_time, megabytes_per_second(config.frame_len, word_time));
    }

    let disciplines = if args.disciplines.is_empty() { Discipline::ALL.to_vec() } else { args.disciplines.clone() };
    let byte_workload = ParallelWorkload::<u8>::random(config.parallel_len, &config.thread_counts[..], &mut rng)?;
    let word_workload = ParallelWorkload::<u64>::random(config.parallel_words(), &config.thread_counts[..], &mut rng)?;

    println!("parallel: {} bytes, budget {}", config.parallel_len, config.budget);
    sweep(&disciplines, &strategies, &byte_workload, config.budget)?;
    sweep(&disciplines, &strategies, &word_workload, config.budget)?;

    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
