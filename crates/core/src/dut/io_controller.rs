// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Behavioural model of the streaming I/O controller.
//!
//! Cycle behaviour at each rising edge:
//! - config bus: a write strobe updates the addressed register, a read strobe
//!   registers its value onto `config_read_data`.
//! - `start_pulse` loads every channel's runtime state from its registers.
//! - INSTREAM channels keep at most two lines buffered or in flight. A read
//!   issued at edge T is captured at edge T+2, after the memory's one-tick
//!   latency.
//! - OUTSTREAM channels pack accepted words into a line and issue a one-cycle
//!   masked write when the line fills or the stream ends.
//! - `done_pulse` is high for one cycle once every channel has drained and
//!   counted out its completion delay.

use super::Dut;
use crate::channel::Mode;
use crate::protocol::RegisterId;
use crate::{IoParams, IoSignals};
use serde::Serialize;
use std::collections::VecDeque;

const LINE_WORDS: u32 = 4;
const LINE_BYTES: u32 = 8;
const PREFETCH_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, Default, Serialize)]
struct ReadRequest {
    bank: usize,
    bank_address: u32,
    line_address: u32,
    routed: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct Line {
    address: u32,
    words: [u16; 4],
}

#[derive(Debug, Clone, Copy, Serialize)]
struct LineWrite {
    bank: usize,
    bank_address: u32,
    data: u64,
    mask: u64,
    routed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
struct InstreamUnit {
    out_address: u32,
    remaining: u32,
    fetch_address: u64,
    fetch_end: u64,
    fifo: VecDeque<Line>,
    /// Stage 0 drives the bank port, stage 1 waits for the data.
    pipe: [Option<ReadRequest>; 2],
    data: u16,
    valid: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
struct OutstreamUnit {
    address: u32,
    remaining: u32,
    line_address: u32,
    line: u64,
    mask: u64,
    pending: Option<LineWrite>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
enum Unit {
    #[default]
    Idle,
    Instream(InstreamUnit),
    Outstream(OutstreamUnit),
    Sram,
}

#[derive(Debug, Clone, Default, Serialize)]
struct ChannelUnit {
    id: u16,
    regs: [u32; 5],
    unit: Unit,
    delay_count: u32,
}

impl ChannelUnit {
    fn reg(&self, reg: RegisterId) -> u32 {
        self.regs[reg as usize]
    }

    fn drained(&self) -> bool {
        match &self.unit {
            Unit::Instream(s) => s.remaining == 0,
            Unit::Outstream(s) => s.remaining == 0 && s.pending.is_none(),
            Unit::Idle | Unit::Sram => true,
        }
    }

    fn complete(&self) -> bool {
        match self.unit {
            Unit::Idle | Unit::Sram => true,
            _ => self.drained() && self.delay_count >= self.reg(RegisterId::CompletionDelay),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IoController {
    #[serde(skip)]
    params: IoParams,
    channels: Vec<ChannelUnit>,
    config_read_data: u32,
    armed: bool,
    running: bool,
    done_pulse: bool,
    last_clk: bool,
    dropped_accesses: u64,
}

impl IoController {
    pub fn new(params: &IoParams) -> Self {
        Self {
            params: *params,
            channels: (0..params.channel_count)
                .map(|id| ChannelUnit {
                    id,
                    ..Default::default()
                })
                .collect(),
            config_read_data: 0,
            armed: false,
            running: false,
            done_pulse: false,
            last_clk: false,
            dropped_accesses: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Accesses dropped because the target bank was not enabled.
    pub fn dropped_accesses(&self) -> u64 {
        self.dropped_accesses
    }

    fn decode_config_address(&self, address: u32) -> Option<(usize, RegisterId)> {
        let reg_mask = (1u32 << self.params.config_reg_width) - 1;
        let channel = (address >> self.params.config_reg_width) as usize;
        let reg = RegisterId::from_index(address & reg_mask)?;
        (channel < self.channels.len()).then_some((channel, reg))
    }

    fn config_edge(&mut self, signals: &IoSignals) {
        let bus = &signals.config;
        if !bus.enable {
            return;
        }
        let Some((channel, reg)) = self.decode_config_address(bus.address) else {
            tracing::warn!("Config access to unmapped address {:#x}", bus.address);
            return;
        };
        if bus.write {
            let value = match reg {
                RegisterId::Mode => bus.write_data & 0x3,
                _ => bus.write_data,
            };
            self.channels[channel].regs[reg as usize] = value;
        } else if bus.read {
            self.config_read_data = self.channels[channel].reg(reg);
        }
    }

    fn arm(&mut self) {
        for ch in &mut self.channels {
            let start = ch.reg(RegisterId::StartAddress);
            let words = ch.reg(RegisterId::NumWords);
            ch.delay_count = 0;
            ch.unit = match Mode::try_from(ch.reg(RegisterId::Mode)) {
                Ok(Mode::Instream) => Unit::Instream(InstreamUnit {
                    out_address: start,
                    remaining: words,
                    fetch_address: (start & !(LINE_BYTES - 1)) as u64,
                    fetch_end: start as u64 + 2 * words as u64,
                    ..Default::default()
                }),
                Ok(Mode::Outstream) => Unit::Outstream(OutstreamUnit {
                    address: start,
                    remaining: words,
                    ..Default::default()
                }),
                Ok(Mode::Sram) => Unit::Sram,
                Ok(Mode::Idle) | Err(_) => Unit::Idle,
            };
        }
        tracing::debug!("IO controller armed");
    }

    fn step_instream(
        params: &IoParams,
        id: u16,
        switch_sel: u32,
        s: &mut InstreamUnit,
        signals: &IoSignals,
        stalled: bool,
        dropped: &mut u64,
    ) {
        let arriving = s.pipe[1].take();
        s.pipe[1] = s.pipe[0].take();

        if let Some(req) = arriving {
            let words = if req.routed {
                let raw = signals.banks[req.bank].read_data;
                [raw as u16, (raw >> 16) as u16, (raw >> 32) as u16, (raw >> 48) as u16]
            } else {
                [0; 4]
            };
            s.fifo.push_back(Line {
                address: req.line_address,
                words,
            });
        }

        if !stalled {
            if s.remaining == 0 {
                s.valid = false;
            } else {
                let line_address = s.out_address & !(LINE_BYTES - 1);
                match s.fifo.front() {
                    Some(line) if line.address == line_address => {
                        let lane = (s.out_address >> 1) % LINE_WORDS;
                        s.data = line.words[lane as usize];
                        s.valid = true;
                        s.out_address = s.out_address.wrapping_add(2);
                        s.remaining -= 1;
                        if lane == LINE_WORDS - 1 || s.remaining == 0 {
                            s.fifo.pop_front();
                        }
                    }
                    _ => s.valid = false,
                }
            }
        }

        let in_flight = s.pipe.iter().filter(|p| p.is_some()).count();
        if s.fetch_address < s.fetch_end && s.fifo.len() + in_flight < PREFETCH_DEPTH {
            let line_address = s.fetch_address as u32;
            let loc = params.locate(line_address);
            let routed = params.reachable(id, switch_sel, loc.bank);
            if !routed {
                *dropped += 1;
                tracing::warn!(
                    "ch{}: read of {:#010x} targets disabled bank {}, returning zeros",
                    id,
                    line_address,
                    loc.bank
                );
            }
            s.pipe[0] = Some(ReadRequest {
                bank: loc.bank,
                bank_address: line_address & params.bank_mask(),
                line_address,
                routed,
            });
            s.fetch_address += LINE_BYTES as u64;
        }
    }

    fn step_outstream(
        params: &IoParams,
        id: u16,
        switch_sel: u32,
        s: &mut OutstreamUnit,
        signals: &IoSignals,
        stalled: bool,
        dropped: &mut u64,
    ) {
        s.pending = None;
        let port = &signals.streams[id as usize];
        if stalled || s.remaining == 0 || !port.write_enable {
            return;
        }

        let lane = (s.address >> 1) % LINE_WORDS;
        if s.mask == 0 {
            s.line_address = s.address & !(LINE_BYTES - 1);
        }
        s.line |= (port.write_data as u64) << (16 * lane);
        s.mask |= 0xFFFFu64 << (16 * lane);
        s.address = s.address.wrapping_add(2);
        s.remaining -= 1;

        if lane == LINE_WORDS - 1 || s.remaining == 0 {
            let loc = params.locate(s.line_address);
            let routed = params.reachable(id, switch_sel, loc.bank);
            if !routed {
                *dropped += 1;
                tracing::warn!(
                    "ch{}: write of {:#010x} targets disabled bank {}, dropped",
                    id,
                    s.line_address,
                    loc.bank
                );
            }
            s.pending = Some(LineWrite {
                bank: loc.bank,
                bank_address: s.line_address & params.bank_mask(),
                data: s.line,
                mask: s.mask,
                routed,
            });
            s.line = 0;
            s.mask = 0;
        }
    }

    fn stream_edge(&mut self, signals: &IoSignals) {
        let stalled = signals.global_stall;
        let params = self.params;
        for ch in &mut self.channels {
            let switch_sel = ch.reg(RegisterId::SwitchSelector);
            match &mut ch.unit {
                Unit::Instream(s) => Self::step_instream(
                    &params,
                    ch.id,
                    switch_sel,
                    s,
                    signals,
                    stalled,
                    &mut self.dropped_accesses,
                ),
                Unit::Outstream(s) => Self::step_outstream(
                    &params,
                    ch.id,
                    switch_sel,
                    s,
                    signals,
                    stalled,
                    &mut self.dropped_accesses,
                ),
                Unit::Idle | Unit::Sram => {}
            }
            if ch.drained() && !stalled && ch.delay_count < ch.reg(RegisterId::CompletionDelay) {
                ch.delay_count += 1;
            }
        }

        if self.running && self.channels.iter().all(ChannelUnit::complete) {
            self.done_pulse = true;
            self.running = false;
            tracing::debug!("IO controller done");
        }
    }

    fn posedge(&mut self, signals: &IoSignals) {
        self.done_pulse = false;
        self.config_edge(signals);
        if signals.start_pulse {
            self.arm();
            self.armed = true;
            self.running = true;
        }
        // Channels keep stepping after done so ports settle back to idle.
        if self.armed {
            self.stream_edge(signals);
        }
    }

    fn drive(&self, signals: &mut IoSignals) {
        signals.done_pulse = self.done_pulse;
        signals.config.read_data = self.config_read_data;
        for port in &mut signals.banks {
            port.read_enable = false;
            port.write_enable = false;
        }

        for ch in &self.channels {
            let stream = &mut signals.streams[ch.id as usize];
            match &ch.unit {
                Unit::Instream(s) => {
                    stream.read_data = s.data;
                    stream.read_valid = s.valid;
                    if let Some(req) = s.pipe[0].filter(|r| r.routed) {
                        let port = &mut signals.banks[req.bank];
                        port.read_enable = true;
                        port.read_address = req.bank_address;
                    }
                }
                Unit::Outstream(s) => {
                    stream.read_valid = false;
                    if let Some(w) = s.pending.filter(|w| w.routed) {
                        let port = &mut signals.banks[w.bank];
                        port.write_enable = true;
                        port.write_address = w.bank_address;
                        port.write_data = w.data;
                        port.write_bit_select = w.mask;
                    }
                }
                Unit::Idle | Unit::Sram => {
                    stream.read_valid = false;
                }
            }
        }
    }
}

impl Dut for IoController {
    fn reset(&mut self, signals: &mut IoSignals) {
        *self = Self::new(&self.params);
        self.last_clk = signals.clk;
        self.drive(signals);
    }

    fn eval(&mut self, signals: &mut IoSignals) {
        if signals.clk && !self.last_clk {
            self.posedge(signals);
        }
        self.last_clk = signals.clk;
        self.drive(signals);
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelConfig;
    use crate::protocol::ConfigDriver;
    use crate::Testbench;

    fn bench_with(configs: &[(u16, ChannelConfig)]) -> Testbench<IoController> {
        let params = IoParams::default();
        let mut tb = Testbench::new(IoController::new(&params), &params).unwrap();
        let driver = ConfigDriver::new(&params);
        for (id, cfg) in configs {
            driver.write_channel(&mut tb, *id, cfg).unwrap();
        }
        tb
    }

    fn start(tb: &mut Testbench<IoController>) {
        tb.signals.start_pulse = true;
        tb.tick().unwrap();
        tb.signals.start_pulse = false;
    }

    #[test]
    fn test_config_registers_are_readable() {
        let mut tb = bench_with(&[]);
        let bus = &mut tb.signals.config;
        bus.enable = true;
        bus.write = true;
        bus.address = (3 << 4) + RegisterId::Mode as u32;
        bus.write_data = 0x7;
        tb.tick().unwrap();

        let bus = &mut tb.signals.config;
        bus.write = false;
        bus.read = true;
        tb.tick().unwrap();
        // MODE keeps two bits.
        assert_eq!(tb.signals.config.read_data, 0x3);
    }

    #[test]
    fn test_instream_first_word_two_ticks_after_start() {
        let cfg = ChannelConfig {
            mode: Mode::Instream,
            start_address: 0x64,
            num_words: 6,
            switch_sel: 0xF,
            completion_delay: 0,
        };
        let mut tb = bench_with(&[(0, cfg)]);
        start(&mut tb);
        assert!(!tb.signals.streams[0].read_valid);
        tb.tick().unwrap();
        assert!(!tb.signals.streams[0].read_valid);

        // Memory is seeded with each word's index inside its bank.
        for i in 0..6u16 {
            tb.tick().unwrap();
            assert!(tb.signals.streams[0].read_valid);
            assert_eq!(tb.signals.streams[0].read_data, 0x32 + i);
            assert_eq!(tb.signals.done_pulse, i == 5);
        }
        tb.tick().unwrap();
        assert!(!tb.signals.streams[0].read_valid);
        assert!(!tb.signals.done_pulse);
        assert!(!tb.dut().is_running());
    }

    #[test]
    fn test_instream_holds_word_while_stalled() {
        let cfg = ChannelConfig {
            mode: Mode::Instream,
            start_address: 0x100,
            num_words: 20,
            switch_sel: 0x1,
            completion_delay: 0,
        };
        let mut tb = bench_with(&[(0, cfg)]);
        start(&mut tb);
        tb.idle(3).unwrap();
        let held = tb.signals.streams[0].read_data;
        assert_eq!(held, 0x81);

        tb.signals.global_stall = true;
        for _ in 0..25 {
            tb.tick().unwrap();
            assert_eq!(tb.signals.streams[0].read_data, held);
            assert!(tb.signals.streams[0].read_valid);
        }
        tb.signals.global_stall = false;
        tb.tick().unwrap();
        assert_eq!(tb.signals.streams[0].read_data, held + 1);
    }

    #[test]
    fn test_read_in_flight_at_stall_onset_completes() {
        let cfg = ChannelConfig {
            mode: Mode::Instream,
            start_address: 0x100,
            num_words: 20,
            switch_sel: 0x1,
            completion_delay: 0,
        };
        let mut tb = bench_with(&[(0, cfg)]);
        start(&mut tb);
        // Second line's read goes out on this tick.
        tb.tick().unwrap();

        tb.signals.global_stall = true;
        for _ in 0..10 {
            tb.tick().unwrap();
            assert!(!tb.signals.streams[0].read_valid);
        }
        tb.signals.global_stall = false;

        for i in 0..12u16 {
            tb.tick().unwrap();
            assert!(tb.signals.streams[0].read_valid, "word {}", i);
            assert_eq!(tb.signals.streams[0].read_data, 0x80 + i);
        }
        assert_eq!(tb.dut().dropped_accesses(), 0);
    }

    #[test]
    fn test_outstream_packs_lines_with_mask() {
        let base = 16 << 17;
        let cfg = ChannelConfig {
            mode: Mode::Outstream,
            start_address: base + 0x64,
            num_words: 3,
            switch_sel: 0x1,
            completion_delay: 2,
        };
        let mut tb = bench_with(&[(4, cfg)]);
        start(&mut tb);

        tb.signals.streams[4].write_enable = true;
        for value in [0xA, 0xB, 0xC] {
            tb.signals.streams[4].write_data = value;
            tb.tick().unwrap();
        }
        tb.signals.streams[4].write_enable = false;
        tb.tick().unwrap();

        assert_eq!(tb.memory.word(base + 0x64).unwrap(), 0xA);
        assert_eq!(tb.memory.word(base + 0x66).unwrap(), 0xB);
        assert_eq!(tb.memory.word(base + 0x68).unwrap(), 0xC);
        // Partial lines clear the lanes they do not select.
        assert_eq!(tb.memory.word(base + 0x60).unwrap(), 0);
        assert_eq!(tb.memory.word(base + 0x6a).unwrap(), 0);
        // Untouched line keeps its seed value.
        assert_eq!(tb.memory.word(base + 0x70).unwrap(), 0x38);

        let mut saw_done = false;
        for _ in 0..4 {
            tb.tick().unwrap();
            saw_done |= tb.signals.done_pulse;
        }
        assert!(saw_done);
    }

    #[test]
    fn test_disabled_bank_reads_zero() {
        let cfg = ChannelConfig {
            mode: Mode::Instream,
            start_address: (1 << 17) + 0x10,
            num_words: 2,
            switch_sel: 0b0001,
            completion_delay: 0,
        };
        let mut tb = bench_with(&[(0, cfg)]);
        start(&mut tb);
        tb.idle(2).unwrap();
        assert!(tb.signals.streams[0].read_valid);
        assert_eq!(tb.signals.streams[0].read_data, 0);
        assert!(tb.dut().dropped_accesses() > 0);
    }

    #[test]
    fn test_snapshot_lists_channels() {
        let tb = bench_with(&[]);
        let snap = tb.dut().snapshot();
        assert_eq!(snap["channels"].as_array().map(Vec::len), Some(8));
        assert_eq!(snap["running"], serde_json::json!(false));
    }
}
