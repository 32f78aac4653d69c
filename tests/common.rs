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

#![allow(dead_code)]

use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};

pub const THREAD_COUNT: usize = 8;
pub const INCREMENTS_PER_THREAD: u64 = 100_000;
pub const MESSAGE_PASSING_ITERATIONS: u64 = 1_000_000;

pub fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

// Spawns `count` workers that all start together once every one of them is running.
pub fn spawn_synchronized<F, R>(count: usize, worker: F) -> Vec<JoinHandle<R>>
where
    F: Fn(usize) -> R + Send + Sync + 'static,
    R: Send + 'static,
{
    let start = Arc::new(Barrier::new(count));
    let worker = Arc::new(worker);

    (0..count)
        .map(|index| {
            let start = start.clone();
            let worker = worker.clone();
            thread::spawn(move || {
                start.wait();
                worker(index)
            })
        })
        .collect()
}

pub fn join_all<R>(handles: Vec<JoinHandle<R>>) -> Vec<R> {
    handles
        .into_iter()
        .map(|handle| handle.join().expect("worker thread panicked"))
        .collect()
}
