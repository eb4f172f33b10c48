use criterion::*;
use simd_xor::parallel::{self, Discipline};
use simd_xor::*;

fn bench_discipline<T: Element>(c: &mut Criterion, discipline: Discipline, workload: &ParallelWorkload<T>)
where [T]: rand::Fill
{
    let registry = Registry::detect();

    let mut group = c.benchmark_group(format!("parallel-{}-{}s", discipline, T::WIDTH));
    group.sample_size(10);
    group.throughput(Throughput::Bytes((parallel::ITERATION_BUDGET * workload::PARALLEL_BYTES) as u64));
    for strategy in registry.iter() {
        for trial in workload.trials.iter() {
            group.bench_with_input(BenchmarkId::new(strategy.kind().name(), trial.threads),
                                   trial,
                                   |b, trial| b.iter(|| {
                                       black_box(parallel::run_trial(discipline, strategy, workload, trial,
                                                                     parallel::ITERATION_BUDGET).unwrap())
                                   }));
        }
        if discipline == Discipline::Baseline {
            break;
        }
    }
    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let bytes = workload::parallel_bytes().unwrap();
    let words = workload::parallel_words().unwrap();
    for discipline in Discipline::ALL {
        bench_discipline(c, discipline, &bytes);
        bench_discipline(c, discipline, &words);
    }
}

criterion_group!(benches, bench_parallel);
criterion_main!(benches);
