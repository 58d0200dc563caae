// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::channel::{Channel, ChannelSet, Mode};
use crate::signals::StreamPort;
use crate::{BankedMemory, SimResult, SimulationError};
use serde::Serialize;

/// Number of assertions performed, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckCounters {
    pub instream_words: u64,
    pub stall_holds: u64,
    pub outstream_words: u64,
}

/// Compares observed stream traffic against the memory model.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    counters: CheckCounters,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> CheckCounters {
        self.counters
    }

    fn compare_stream(
        channel: u16,
        address: u32,
        port: &StreamPort,
        memory: &BankedMemory,
    ) -> SimResult<()> {
        let expected = memory.word(address)?;
        if port.read_data != expected {
            tracing::error!(
                "ch{}: stream data mismatch at {:#010x}: expected {:#06x}, got {:#06x}",
                channel,
                address,
                expected,
                port.read_data
            );
            return Err(SimulationError::StreamMismatch {
                channel,
                address,
                expected,
                actual: port.read_data,
            });
        }
        if !port.read_valid {
            tracing::error!("ch{}: stream valid low at {:#010x}", channel, address);
            return Err(SimulationError::StreamNotValid { channel, address });
        }
        Ok(())
    }

    /// The word presented this tick must be the memory word at `address`.
    pub fn check_instream(
        &mut self,
        channel: u16,
        address: u32,
        port: &StreamPort,
        memory: &BankedMemory,
    ) -> SimResult<()> {
        Self::compare_stream(channel, address, port, memory)?;
        self.counters.instream_words += 1;
        Ok(())
    }

    /// While stalled the port must keep presenting the last accepted word.
    pub fn check_held(
        &mut self,
        channel: u16,
        address: u32,
        port: &StreamPort,
        memory: &BankedMemory,
    ) -> SimResult<()> {
        Self::compare_stream(channel, address, port, memory)?;
        self.counters.stall_holds += 1;
        Ok(())
    }

    /// Memory at `start + 2j` must hold `source[j]` for every word the
    /// channel was programmed to write.
    pub fn check_outstream(
        &mut self,
        channel: &Channel,
        source: &[u16],
        memory: &BankedMemory,
    ) -> SimResult<()> {
        let start = channel.config.start_address;
        for j in 0..channel.config.num_words {
            let address = start.wrapping_add(2 * j);
            let expected = source.get(j as usize).copied().unwrap_or(0);
            let actual = memory.word(address)?;
            if actual != expected {
                tracing::error!(
                    "ch{}: memory mismatch at {:#010x} (word {}): expected {:#06x}, got {:#06x}",
                    channel.id,
                    address,
                    j,
                    expected,
                    actual
                );
                return Err(SimulationError::MemoryMismatch {
                    channel: channel.id,
                    address,
                    expected,
                    actual,
                });
            }
            self.counters.outstream_words += 1;
        }
        Ok(())
    }

    /// End-of-run verification of every OUTSTREAM channel.
    pub fn verify_run(
        &mut self,
        channels: &ChannelSet,
        source: &[u16],
        memory: &BankedMemory,
    ) -> SimResult<()> {
        for channel in channels.iter().filter(|c| c.mode() == Mode::Outstream) {
            self.check_outstream(channel, source, memory)?;
        }
        Ok(())
    }
}
