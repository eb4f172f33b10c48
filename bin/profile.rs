use simd_xor::parallel::{self, Discipline};
use simd_xor::*;

fn main() {
    let strategy = xor::runtime_detect();
    let mut frame = workload::frame_bytes().unwrap();

    for _i in 0..100 {
        frame.run(&strategy).unwrap();
        std::hint::black_box(&frame.difference);
    }

    let event_frame = ittapi::Event::new("frame");

    for _i in 0..1000 {
        let e = event_frame.start();
        frame.run(&strategy).unwrap();
        std::hint::black_box(&frame.difference);
        std::mem::drop(e);
    }

    let domain = ittapi::Domain::new("parallel");
    let workload = workload::parallel_bytes().unwrap();
    for discipline in Discipline::ALL {
        for trial in workload.trials.iter() {
            let task = ittapi::Task::begin(&domain, discipline.name());
            let result = parallel::run_trial(discipline, &strategy, &workload, trial, parallel::ITERATION_BUDGET).unwrap();
            task.end();
            println!("{:<14} {:<10} threads {:>2}", discipline, strategy.kind(), result.threads);
        }
    }
}
