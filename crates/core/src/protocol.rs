// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Address-mapped register protocol used to program channels.

use crate::channel::ChannelConfig;
use crate::testbench::Testbench;
use crate::{Dut, IoParams, SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Idle ticks held after every register access.
pub const SETTLE_TICKS: u32 = 10;
/// Ticks the read strobe is held before sampling `config_read_data`.
pub const DEFAULT_READ_DELAY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegisterId {
    Mode = 0,
    StartAddress = 1,
    NumWords = 2,
    SwitchSelector = 3,
    CompletionDelay = 4,
}

impl RegisterId {
    pub const ALL: [RegisterId; 5] = [
        RegisterId::Mode,
        RegisterId::StartAddress,
        RegisterId::NumWords,
        RegisterId::SwitchSelector,
        RegisterId::CompletionDelay,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterId::Mode => "MODE",
            RegisterId::StartAddress => "START_ADDRESS",
            RegisterId::NumWords => "NUM_WORDS",
            RegisterId::SwitchSelector => "BANK_SWITCH_SELECTOR",
            RegisterId::CompletionDelay => "COMPLETION_DELAY",
        };
        f.write_str(name)
    }
}

/// Drives the configuration bus of a testbench.
#[derive(Debug, Clone)]
pub struct ConfigDriver {
    params: IoParams,
    pub settle_ticks: u32,
    pub read_delay: u32,
}

impl ConfigDriver {
    pub fn new(params: &IoParams) -> Self {
        Self {
            params: *params,
            settle_ticks: SETTLE_TICKS,
            read_delay: DEFAULT_READ_DELAY,
        }
    }

    fn check_register(&self, channel: u16, reg: RegisterId, value: u32) -> SimResult<()> {
        if channel >= self.params.channel_count {
            return Err(SimulationError::InvalidChannel {
                channel,
                count: self.params.channel_count,
            });
        }
        match reg {
            RegisterId::StartAddress if value % 2 != 0 => {
                Err(SimulationError::UnalignedAddress { channel, address: value })
            }
            RegisterId::SwitchSelector if value >= self.params.switch_selector_limit() => {
                Err(SimulationError::SwitchSelectorOutOfRange {
                    channel,
                    selector: value,
                    limit: self.params.switch_selector_limit(),
                })
            }
            _ => Ok(()),
        }
    }

    /// One-tick write strobe followed by the settle window. Invalid values
    /// never reach the bus.
    pub fn write_register<D: Dut>(
        &self,
        tb: &mut Testbench<D>,
        channel: u16,
        reg: RegisterId,
        value: u32,
    ) -> SimResult<()> {
        self.check_register(channel, reg, value)?;
        tracing::debug!("Config write ch{} {} = {:#x}", channel, reg, value);

        let bus = &mut tb.signals.config;
        bus.enable = true;
        bus.write = true;
        bus.read = false;
        bus.address = self.params.config_address(channel, reg as u32);
        bus.write_data = value;
        tb.tick()?;

        let bus = &mut tb.signals.config;
        bus.enable = false;
        bus.write = false;
        tb.idle(self.settle_ticks)
    }

    /// Hold the read strobe for `delay` ticks, then compare the returned value.
    pub fn read_register<D: Dut>(
        &self,
        tb: &mut Testbench<D>,
        channel: u16,
        reg: RegisterId,
        expected: u32,
        delay: u32,
    ) -> SimResult<u32> {
        if channel >= self.params.channel_count {
            return Err(SimulationError::InvalidChannel {
                channel,
                count: self.params.channel_count,
            });
        }

        let bus = &mut tb.signals.config;
        bus.enable = true;
        bus.read = true;
        bus.write = false;
        bus.address = self.params.config_address(channel, reg as u32);
        tb.idle(delay)?;

        let actual = tb.signals.config.read_data;
        let bus = &mut tb.signals.config;
        bus.enable = false;
        bus.read = false;

        if actual != expected {
            tracing::error!(
                "Config read-back mismatch on ch{} {}: expected {:#x}, got {:#x}",
                channel,
                reg,
                expected,
                actual
            );
            return Err(SimulationError::RegisterMismatch {
                channel,
                register: reg,
                expected,
                actual,
            });
        }
        tracing::debug!("Config read ch{} {} = {:#x}", channel, reg, actual);
        tb.idle(self.settle_ticks)?;
        Ok(actual)
    }

    /// Program all five registers of a channel, in register order.
    pub fn write_channel<D: Dut>(
        &self,
        tb: &mut Testbench<D>,
        channel: u16,
        config: &ChannelConfig,
    ) -> SimResult<()> {
        config.validate(channel, &self.params)?;
        for reg in RegisterId::ALL {
            self.write_register(tb, channel, reg, config.register(reg))?;
        }
        Ok(())
    }

    pub fn read_back_channel<D: Dut>(
        &self,
        tb: &mut Testbench<D>,
        channel: u16,
        config: &ChannelConfig,
    ) -> SimResult<()> {
        for reg in RegisterId::ALL {
            self.read_register(tb, channel, reg, config.register(reg), self.read_delay)?;
        }
        Ok(())
    }
}
