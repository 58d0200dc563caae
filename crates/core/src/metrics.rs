// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{IoSignals, Tick, TickObserver};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Plain copy of the counters, for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSummary {
    pub ticks: u64,
    pub stall_ticks: u64,
    pub bank_reads: u64,
    pub bank_writes: u64,
    pub valid_words: u64,
    pub runs: u64,
    pub failed_runs: u64,
}

#[derive(Debug)]
pub struct RunMetrics {
    ticks: AtomicU64,
    stall_ticks: AtomicU64,
    bank_reads: AtomicU64,
    bank_writes: AtomicU64,
    valid_words: AtomicU64,
    runs: AtomicU64,
    failed_runs: AtomicU64,
    current_run: Mutex<Option<String>>,
    start_time: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            stall_ticks: AtomicU64::new(0),
            bank_reads: AtomicU64::new(0),
            bank_writes: AtomicU64::new(0),
            valid_words: AtomicU64::new(0),
            runs: AtomicU64::new(0),
            failed_runs: AtomicU64::new(0),
            current_run: Mutex::new(None),
            start_time: Instant::now(),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.ticks,
            &self.stall_ticks,
            &self.bank_reads,
            &self.bank_writes,
            &self.valid_words,
            &self.runs,
            &self.failed_runs,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        if let Ok(mut run) = self.current_run.lock() {
            *run = None;
        }
    }

    pub fn get_ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn get_stall_ticks(&self) -> u64 {
        self.stall_ticks.load(Ordering::SeqCst)
    }

    pub fn current_run(&self) -> Option<String> {
        self.current_run.lock().ok().and_then(|r| r.clone())
    }

    /// Simulated ticks per wall-clock second.
    pub fn get_tps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_ticks() as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            ticks: self.get_ticks(),
            stall_ticks: self.get_stall_ticks(),
            bank_reads: self.bank_reads.load(Ordering::SeqCst),
            bank_writes: self.bank_writes.load(Ordering::SeqCst),
            valid_words: self.valid_words.load(Ordering::SeqCst),
            runs: self.runs.load(Ordering::SeqCst),
            failed_runs: self.failed_runs.load(Ordering::SeqCst),
        }
    }
}

impl TickObserver for RunMetrics {
    fn on_run_start(&self, scenario: &str) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut run) = self.current_run.lock() {
            *run = Some(scenario.to_string());
        }
    }

    fn on_run_end(&self, _scenario: &str, passed: bool) {
        if !passed {
            self.failed_runs.fetch_add(1, Ordering::SeqCst);
        }
        if let Ok(mut run) = self.current_run.lock() {
            *run = None;
        }
    }

    fn on_tick(&self, _tick: Tick, signals: &IoSignals) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
        if signals.global_stall {
            self.stall_ticks.fetch_add(1, Ordering::SeqCst);
        }
        let reads = signals.banks.iter().filter(|b| b.read_enable).count() as u64;
        let writes = signals.banks.iter().filter(|b| b.write_enable).count() as u64;
        let valid = signals.streams.iter().filter(|s| s.read_valid).count() as u64;
        self.bank_reads.fetch_add(reads, Ordering::SeqCst);
        self.bank_writes.fetch_add(writes, Ordering::SeqCst);
        self.valid_words.fetch_add(valid, Ordering::SeqCst);
    }
}
