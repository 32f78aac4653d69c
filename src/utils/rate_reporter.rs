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

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as CoreOrdering};
use std::time::{Duration, Instant};

use crate::concurrent::location::Location;
use crate::concurrent::ordering::Ordering;

/// Operation count and time of the previous report.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub total_ops: u64,
    pub timestamp: Instant,
}

/// Periodically reports operations per second. Counting is a relaxed fetch-add so worker
/// threads can share one reporter.
pub struct RateReporter {
    report_interval: Duration,
    on_report: fn(f64, u64),
    halt: AtomicBool,
    total_ops: AtomicU64,
}

impl RateReporter {
    pub fn new(report_interval: Duration, on_report_handler: fn(f64, u64)) -> Self {
        Self {
            report_interval,
            on_report: on_report_handler,
            halt: AtomicBool::from(false),
            total_ops: AtomicU64::new(0),
        }
    }

    fn counter(&self) -> Location<'_, u64> {
        Location::new(&self.total_ops)
    }

    pub fn run(&self) {
        let mut last = self.snapshot();
        while !self.is_halted() {
            std::thread::sleep(self.report_interval);
            last = self.report(last);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            total_ops: self.total(),
            timestamp: Instant::now(),
        }
    }

    /// Calls the report handler with the rate since `last` and returns the new snapshot.
    pub fn report(&self, last: Snapshot) -> Snapshot {
        let current = self.snapshot();
        let time_span_sec = (current.timestamp - last.timestamp).as_secs_f64();
        let ops = current.total_ops.wrapping_sub(last.total_ops);
        let ops_per_sec = if time_span_sec > 0.0 { ops as f64 / time_span_sec } else { 0.0 };

        (self.on_report)(ops_per_sec, current.total_ops);

        current
    }

    pub fn halt(&self) {
        self.halt.store(true, CoreOrdering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halt.load(CoreOrdering::SeqCst)
    }

    pub fn on_operations(&self, count: u64) {
        self.counter().fetch_add(count, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.counter().load(Ordering::Relaxed)
    }
}
