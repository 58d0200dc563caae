// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{BankedMemory, Dut, IoParams, IoSignals, SimResult, Tick, TickObserver};
use std::sync::Arc;

/// Owns the unit under test, its signals and the memory model, and advances
/// them together one clock period at a time.
#[derive(Debug)]
pub struct Testbench<D: Dut> {
    dut: D,
    pub signals: IoSignals,
    pub memory: BankedMemory,
    pub params: IoParams,
    tick_count: Tick,
    observers: Vec<Arc<dyn TickObserver>>,
}

impl<D: Dut> Testbench<D> {
    /// Build a testbench with memory seeded so every word holds its index
    /// inside its bank.
    pub fn new(dut: D, params: &IoParams) -> SimResult<Self> {
        params.validate()?;
        let mut memory = BankedMemory::new(params);
        memory.fill_with(|_, word| word as u16);
        let mut tb = Self {
            dut,
            signals: IoSignals::new(params),
            memory,
            params: *params,
            tick_count: 0,
            observers: Vec::new(),
        };
        tb.reset();
        Ok(tb)
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TickObserver>) {
        self.observers.push(observer);
    }

    pub fn observers(&self) -> &[Arc<dyn TickObserver>] {
        &self.observers
    }

    pub fn dut(&self) -> &D {
        &self.dut
    }

    pub fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    pub fn tick_count(&self) -> Tick {
        self.tick_count
    }

    pub fn reset(&mut self) {
        self.signals.reset();
        self.dut.reset(&mut self.signals);
        self.dut.eval(&mut self.signals);
    }

    /// One clock period: settle, service memory, sample, rising edge,
    /// falling edge.
    pub fn tick(&mut self) -> SimResult<()> {
        self.dut.eval(&mut self.signals);
        self.memory.service(&mut self.signals)?;

        for observer in &self.observers {
            observer.on_tick(self.tick_count, &self.signals);
        }

        self.signals.clk = true;
        self.dut.eval(&mut self.signals);
        self.signals.clk = false;
        self.dut.eval(&mut self.signals);

        self.tick_count += 1;
        Ok(())
    }

    pub fn idle(&mut self, ticks: u32) -> SimResult<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "tick": self.tick_count,
            "signals": serde_json::to_value(&self.signals).unwrap_or(serde_json::Value::Null),
            "dut": self.dut.snapshot(),
        })
    }
}
