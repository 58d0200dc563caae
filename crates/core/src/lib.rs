// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod channel;
pub mod dut;
pub mod engine;
pub mod memory;
pub mod metrics;
pub mod params;
pub mod protocol;
pub mod scenario;
pub mod scoreboard;
pub mod signals;
pub mod stall;
pub mod testbench;

pub use channel::{Channel, ChannelConfig, ChannelSet, ChannelState, Cursor, Mode};
pub use dut::{io_controller::IoController, Dut};
pub use engine::StreamEngine;
pub use memory::{BankedMemory, MemAccess};
pub use metrics::{MetricsSummary, RunMetrics};
pub use params::IoParams;
pub use protocol::{ConfigDriver, RegisterId};
pub use scenario::{
    builtin_scenarios, run_batch, run_scenario, BatchReport, RunOptions, Scenario, ScenarioKind,
    ScenarioReport,
};
pub use scoreboard::{CheckCounters, Scoreboard};
pub use signals::IoSignals;
pub use stall::{StallInjector, StallWindow};
pub use testbench::Testbench;

/// Simulated time, in clock periods.
pub type Tick = u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Channel {channel}: address {address:#010x} is not word aligned")]
    UnalignedAddress { channel: u16, address: u32 },
    #[error("Channel {channel}: bank switch selector {selector:#x} cannot be configured (limit {limit:#x})")]
    SwitchSelectorOutOfRange { channel: u16, selector: u32, limit: u32 },
    #[error("Channel {channel} does not exist (channel count {count})")]
    InvalidChannel { channel: u16, count: u16 },
    #[error("Channel {channel}: invalid mode encoding {value}")]
    InvalidMode { channel: u16, value: u32 },
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),
    #[error("Channel {channel}: register {register} read back {actual:#x}, expected {expected:#x}")]
    RegisterMismatch {
        channel: u16,
        register: RegisterId,
        expected: u32,
        actual: u32,
    },
    #[error("Channel {channel}: stream data {actual:#06x} at {address:#010x}, expected {expected:#06x}")]
    StreamMismatch {
        channel: u16,
        address: u32,
        expected: u16,
        actual: u16,
    },
    #[error("Channel {channel}: stream valid deasserted at {address:#010x}")]
    StreamNotValid { channel: u16, address: u32 },
    #[error("Channel {channel}: memory holds {actual:#06x} at {address:#010x}, expected {expected:#06x}")]
    MemoryMismatch {
        channel: u16,
        address: u32,
        expected: u16,
        actual: u16,
    },
    #[error("Bank access out of range: bank {bank}, word {word}")]
    BankOutOfRange { bank: usize, word: usize },
    #[error("No done pulse after {0} ticks")]
    Timeout(Tick),
}

/// Coarse classification used by run drivers to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Verification,
    Runtime,
}

impl SimulationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnalignedAddress { .. }
            | Self::SwitchSelectorOutOfRange { .. }
            | Self::InvalidChannel { .. }
            | Self::InvalidMode { .. }
            | Self::InvalidParams(_) => ErrorKind::Configuration,
            Self::RegisterMismatch { .. }
            | Self::StreamMismatch { .. }
            | Self::StreamNotValid { .. }
            | Self::MemoryMismatch { .. } => ErrorKind::Verification,
            Self::BankOutOfRange { .. } | Self::Timeout(_) => ErrorKind::Runtime,
        }
    }
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing testbench ticks in a modular way.
pub trait TickObserver: std::fmt::Debug + Send + Sync {
    fn on_run_start(&self, _scenario: &str) {}
    fn on_run_end(&self, _scenario: &str, _passed: bool) {}
    /// Called once per tick after the memory model has serviced the bus and
    /// before the clock edge.
    fn on_tick(&self, _tick: Tick, _signals: &IoSignals) {}
}
