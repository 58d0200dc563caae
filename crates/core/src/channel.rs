// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::protocol::RegisterId;
use crate::{IoParams, SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use streamio_config::ChannelMode;

/// Channel operating mode, in MODE register encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Idle = 0,
    Instream = 1,
    Outstream = 2,
    Sram = 3,
}

impl Mode {
    pub fn decode(channel: u16, value: u32) -> SimResult<Self> {
        Self::try_from(value).map_err(|value| SimulationError::InvalidMode { channel, value })
    }

    pub fn is_streaming(self) -> bool {
        matches!(self, Mode::Instream | Mode::Outstream)
    }
}

impl TryFrom<u32> for Mode {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Idle),
            1 => Ok(Mode::Instream),
            2 => Ok(Mode::Outstream),
            3 => Ok(Mode::Sram),
            other => Err(other),
        }
    }
}

impl From<ChannelMode> for Mode {
    fn from(mode: ChannelMode) -> Self {
        match mode {
            ChannelMode::Idle => Mode::Idle,
            ChannelMode::Instream => Mode::Instream,
            ChannelMode::Outstream => Mode::Outstream,
            ChannelMode::Sram => Mode::Sram,
        }
    }
}

/// The five programmable registers of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub mode: Mode,
    pub start_address: u32,
    pub num_words: u32,
    pub switch_sel: u32,
    pub completion_delay: u32,
}

impl ChannelConfig {
    pub fn register(&self, reg: RegisterId) -> u32 {
        match reg {
            RegisterId::Mode => self.mode as u32,
            RegisterId::StartAddress => self.start_address,
            RegisterId::NumWords => self.num_words,
            RegisterId::SwitchSelector => self.switch_sel,
            RegisterId::CompletionDelay => self.completion_delay,
        }
    }

    /// Address alignment and selector range, checked before anything is
    /// driven onto the configuration bus.
    pub fn validate(&self, channel: u16, params: &IoParams) -> SimResult<()> {
        if channel >= params.channel_count {
            return Err(SimulationError::InvalidChannel {
                channel,
                count: params.channel_count,
            });
        }
        if self.start_address % 2 != 0 {
            return Err(SimulationError::UnalignedAddress {
                channel,
                address: self.start_address,
            });
        }
        let limit = params.switch_selector_limit();
        if self.switch_sel >= limit {
            return Err(SimulationError::SwitchSelectorOutOfRange {
                channel,
                selector: self.switch_sel,
                limit,
            });
        }
        Ok(())
    }

    /// Byte address one past the last streamed word.
    pub fn end_address(&self) -> u32 {
        self.start_address.wrapping_add(self.num_words.wrapping_mul(2))
    }
}

/// Address/counter pair of a streaming channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Cursor {
    pub current_address: u32,
    pub remaining_words: u32,
}

impl Cursor {
    pub fn new(start_address: u32, num_words: u32) -> Self {
        Self {
            current_address: start_address,
            remaining_words: num_words,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_words == 0
    }

    /// Step to the next word. No-op once exhausted.
    pub fn advance(&mut self) {
        if self.remaining_words > 0 {
            self.current_address = self.current_address.wrapping_add(2);
            self.remaining_words -= 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InstreamState {
    pub cursor: Cursor,
    /// Address of the word accepted on the last non-stalled tick; a stalled
    /// port must keep presenting it.
    pub last_presented: Option<u32>,
}

/// Testbench-side write producer of an OUTSTREAM channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Producer {
    pub write_enable: bool,
    /// Index into the source array of the word currently driven.
    pub next_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ChannelState {
    #[default]
    Idle,
    Instream(InstreamState),
    Outstream { cursor: Cursor, producer: Producer },
    Sram,
}

impl ChannelState {
    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            ChannelState::Instream(s) => Some(&s.cursor),
            ChannelState::Outstream { cursor, .. } => Some(cursor),
            ChannelState::Idle | ChannelState::Sram => None,
        }
    }

    pub fn as_instream(&self) -> Option<&InstreamState> {
        match self {
            ChannelState::Instream(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub id: u16,
    pub config: ChannelConfig,
    pub state: ChannelState,
    pub completion_count: u32,
}

impl Channel {
    pub fn new(id: u16) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.state.cursor()
    }

    /// Load the runtime state from the programmed registers.
    pub fn arm(&mut self) {
        let cursor = Cursor::new(self.config.start_address, self.config.num_words);
        self.state = match self.config.mode {
            Mode::Idle => ChannelState::Idle,
            Mode::Sram => ChannelState::Sram,
            Mode::Instream => ChannelState::Instream(InstreamState {
                cursor,
                last_presented: None,
            }),
            Mode::Outstream => ChannelState::Outstream {
                cursor,
                producer: Producer::default(),
            },
        };
        self.completion_count = 0;
    }

    /// A streaming channel with no words left, or a non-streaming one.
    pub fn is_drained(&self) -> bool {
        self.cursor().map_or(true, Cursor::is_exhausted)
    }

    /// Drained and past its completion delay.
    pub fn is_complete(&self) -> bool {
        self.is_drained()
            && (!self.mode().is_streaming() || self.completion_count >= self.config.completion_delay)
    }
}

/// One `Channel` per channel id, created zeroed and IDLE.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSet {
    channels: Vec<Channel>,
    #[serde(skip)]
    params: IoParams,
}

impl ChannelSet {
    pub fn new(params: &IoParams) -> Self {
        Self {
            channels: (0..params.channel_count).map(Channel::new).collect(),
            params: *params,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, id: u16) -> SimResult<&Channel> {
        let count = self.params.channel_count;
        self.channels
            .get(id as usize)
            .ok_or(SimulationError::InvalidChannel { channel: id, count })
    }

    pub fn get_mut(&mut self, id: u16) -> SimResult<&mut Channel> {
        let count = self.params.channel_count;
        self.channels
            .get_mut(id as usize)
            .ok_or(SimulationError::InvalidChannel { channel: id, count })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }

    /// Validate and store a channel's configuration. Runtime state goes back
    /// to IDLE until the next `arm_all`.
    pub fn configure(&mut self, id: u16, config: ChannelConfig) -> SimResult<()> {
        config.validate(id, &self.params)?;
        let channel = self.get_mut(id)?;
        channel.config = config;
        channel.state = ChannelState::Idle;
        channel.completion_count = 0;
        Ok(())
    }

    pub fn arm_all(&mut self) {
        self.channels.iter_mut().for_each(Channel::arm);
    }

    /// Largest word count over all non-IDLE channels.
    pub fn max_num_words(&self) -> u32 {
        self.channels
            .iter()
            .filter(|c| c.mode() != Mode::Idle)
            .map(|c| c.config.num_words)
            .max()
            .unwrap_or(0)
    }

    pub fn all_complete(&self) -> bool {
        self.channels.iter().all(Channel::is_complete)
    }
}
