// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::IoParams;
use serde::Serialize;

/// Address-mapped configuration bus. The testbench drives everything except
/// `read_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigBus {
    pub enable: bool,
    pub write: bool,
    pub read: bool,
    pub address: u32,
    pub write_data: u32,
    pub read_data: u32,
}

/// One channel's streaming port towards the compute engine.
///
/// `read_*` are driven by the unit under test, `write_*` by the testbench.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamPort {
    pub read_data: u16,
    pub read_valid: bool,
    pub write_enable: bool,
    pub write_data: u16,
}

/// One bank's memory port. The memory model drives `read_data` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BankPort {
    pub write_enable: bool,
    pub write_address: u32,
    pub write_data: u64,
    pub write_bit_select: u64,
    pub read_enable: bool,
    pub read_address: u32,
    pub read_data: u64,
}

/// Complete signal bundle between the testbench and the unit under test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IoSignals {
    pub clk: bool,
    pub config: ConfigBus,
    pub streams: Vec<StreamPort>,
    pub banks: Vec<BankPort>,
    pub global_stall: bool,
    pub start_pulse: bool,
    pub done_pulse: bool,
}

impl IoSignals {
    pub fn new(params: &IoParams) -> Self {
        Self {
            streams: vec![StreamPort::default(); params.channel_count as usize],
            banks: vec![BankPort::default(); params.bank_count as usize],
            ..Default::default()
        }
    }

    /// Clear every signal back to its reset level, keeping the port counts.
    pub fn reset(&mut self) {
        self.clk = false;
        self.config = ConfigBus::default();
        self.streams.iter_mut().for_each(|p| *p = StreamPort::default());
        self.banks.iter_mut().for_each(|p| *p = BankPort::default());
        self.global_stall = false;
        self.start_pulse = false;
        self.done_pulse = false;
    }
}
