/*
 * Copyright 2020 UT OVERSEAS INC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Hammers one shared word with compare-and-swap increments from several threads, reporting
//! throughput as it goes and a CAS latency histogram at the end.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering as CoreOrdering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use lazy_static::lazy_static;
use lowlevel_atomics::{
    build_info, fence, log_selection, ttrace, utils::rate_reporter::RateReporter, Location, Ordering,
};
use structopt::StructOpt;

lazy_static! {
    pub static ref RUNNING: AtomicBool = AtomicBool::from(true);
    pub static ref SHARED_WORD: AtomicU64 = AtomicU64::new(0);
    pub static ref HISTOGRAMM: Arc<Mutex<Histogram::<u64>>> = Arc::new(Mutex::new(
        Histogram::<u64>::new_with_bounds(1, 10 * 1000 * 1000 * 1000, 3).unwrap()
    ));
}

fn sig_int_handler() {
    RUNNING.store(false, CoreOrdering::SeqCst);
}

#[derive(StructOpt, Clone, Debug)]
#[structopt(name = "Atomics stress tool")]
struct CmdOpts {
    #[structopt(short = "t", long, default_value = "4", help = "Number of worker threads")]
    threads: usize,
    #[structopt(short = "d", long, default_value = "10", help = "Run time in seconds")]
    duration_secs: u64,
    #[structopt(short = "r", long, default_value = "1000", help = "Rate report interval in ms")]
    report_interval_ms: u64,
    #[structopt(short = "o", long, default_value = "acq_rel", help = "Ordering for the CAS increments")]
    ordering: Ordering,
}

fn parse_cmd_line() -> CmdOpts {
    CmdOpts::from_args()
}

fn print_rate(ops_per_sec: f64, total_ops: u64) {
    println!("{:.4} ops/sec, totals {} increments", ops_per_sec, total_ops);
}

fn worker(index: usize, ordering: Ordering, reporter: Arc<RateReporter>) -> Histogram<u64> {
    let mut histogram = Histogram::<u64>::new_with_bounds(1, 10 * 1000 * 1000 * 1000, 3).unwrap();
    let word = Location::<u64>::new(&*SHARED_WORD);
    let mut batch = 0;

    ttrace!("worker {} started", index);

    while RUNNING.load(CoreOrdering::Relaxed) {
        let start = Instant::now();
        let mut current = word.load(ordering);
        loop {
            let result = word.compare_and_swap(current, current.wrapping_add(1), ordering);
            if result.success {
                break;
            }
            current = result.observed;
            fence::cpu_pause();
        }
        let _ignored = histogram.record(start.elapsed().as_nanos() as u64);

        batch += 1;
        if batch == 1024 {
            reporter.on_operations(batch);
            batch = 0;
        }
    }
    reporter.on_operations(batch);

    ttrace!("worker {} stopped", index);
    histogram
}

fn main() {
    pretty_env_logger::init();
    ctrlc::set_handler(move || {
        println!("received Ctrl+C!");
        sig_int_handler();
    })
    .expect("Error setting Ctrl-C handler");

    let settings = parse_cmd_line();

    log_selection();
    let info = build_info();
    println!(
        "Backend {} on {}, {} threads for {} s with {} increments",
        info.backend, info.target_arch, settings.threads, settings.duration_secs, settings.ordering
    );

    let reporter = Arc::new(RateReporter::new(
        Duration::from_millis(settings.report_interval_ms),
        print_rate,
    ));
    let reporter_thread = {
        let reporter = reporter.clone();
        thread::Builder::new()
            .name(String::from("rate-reporter"))
            .spawn(move || reporter.run())
            .expect("unable to spawn rate reporter")
    };

    let workers: Vec<_> = (0..settings.threads)
        .map(|index| {
            let reporter = reporter.clone();
            let ordering = settings.ordering;
            thread::Builder::new()
                .name(format!("worker-{}", index))
                .spawn(move || worker(index, ordering, reporter))
                .expect("unable to spawn worker")
        })
        .collect();

    let deadline = Instant::now() + Duration::from_secs(settings.duration_secs);
    while RUNNING.load(CoreOrdering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(100));
    }
    RUNNING.store(false, CoreOrdering::SeqCst);

    for handle in workers {
        let histogram = handle.join().expect("worker panicked");
        HISTOGRAMM.lock().unwrap().add(&histogram).expect("histogram bounds differ");
    }
    reporter.halt();
    reporter_thread.join().expect("rate reporter panicked");

    let final_value = Location::<u64>::new(&*SHARED_WORD).load(Ordering::SeqCst);
    assert_eq!(final_value, reporter.total(), "lost increments");
    println!("Final value {} matches {} reported increments", final_value, reporter.total());

    let histogram = HISTOGRAMM.lock().unwrap();
    for v in histogram.iter_quantiles(1) {
        println!("{} ns - {}", v.value_iterated_to(), v.count_at_value());
    }
}
