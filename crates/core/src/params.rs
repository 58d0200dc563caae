// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use streamio_config::ParamOverrides;

/// Hardware parameters shared by the model and the unit under test.
///
/// Both sides must be built from the same values; a mismatch is not
/// detectable from the signal interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoParams {
    pub bank_count: u16,
    pub channel_count: u16,
    /// Byte address bits inside one bank.
    pub bank_addr_width: u32,
    pub bank_data_width: u32,
    pub channel_data_width: u32,
    pub config_feature_width: u32,
    pub config_reg_width: u32,
}

impl Default for IoParams {
    fn default() -> Self {
        Self {
            bank_count: 32,
            channel_count: 8,
            bank_addr_width: 17,
            bank_data_width: 64,
            channel_data_width: 16,
            config_feature_width: 4,
            config_reg_width: 4,
        }
    }
}

/// A global byte address split into bank and 16-bit word index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLocation {
    pub bank: usize,
    pub word: usize,
}

impl IoParams {
    pub fn with_overrides(overrides: &ParamOverrides) -> Self {
        let mut params = Self::default();
        if let Some(v) = overrides.bank_count {
            params.bank_count = v;
        }
        if let Some(v) = overrides.channel_count {
            params.channel_count = v;
        }
        if let Some(v) = overrides.bank_addr_width {
            params.bank_addr_width = v;
        }
        if let Some(v) = overrides.bank_data_width {
            params.bank_data_width = v;
        }
        if let Some(v) = overrides.channel_data_width {
            params.channel_data_width = v;
        }
        if let Some(v) = overrides.config_feature_width {
            params.config_feature_width = v;
        }
        if let Some(v) = overrides.config_reg_width {
            params.config_reg_width = v;
        }
        params
    }

    pub fn validate(&self) -> SimResult<()> {
        let fail = |msg: String| Err(SimulationError::InvalidParams(msg));

        if self.bank_data_width != 64 || self.channel_data_width != 16 {
            return fail(format!(
                "only 64-bit banks with 16-bit channel words are modeled (got {}/{})",
                self.bank_data_width, self.channel_data_width
            ));
        }
        if self.channel_count == 0 || self.bank_count == 0 {
            return fail("bank and channel counts must be non-zero".to_string());
        }
        if self.bank_count % self.channel_count != 0 {
            return fail(format!(
                "bank count {} is not a multiple of channel count {}",
                self.bank_count, self.channel_count
            ));
        }
        if self.banks_per_channel() > 16 {
            return fail(format!(
                "{} banks per channel exceeds the 16-bit switch selector",
                self.banks_per_channel()
            ));
        }
        if !(4..=24).contains(&self.bank_addr_width) {
            return fail(format!(
                "bank address width {} outside 4..=24",
                self.bank_addr_width
            ));
        }
        if self.config_reg_width < 3 {
            return fail(format!(
                "config register width {} cannot address five registers",
                self.config_reg_width
            ));
        }
        if self.config_reg_width >= 32 {
            return fail(format!(
                "config register width {} leaves no room for a channel id",
                self.config_reg_width
            ));
        }
        if self.config_feature_width + self.config_reg_width > 32 {
            return fail("config address wider than 32 bits".to_string());
        }
        if self.config_feature_width < 16 && (self.channel_count as u32) > (1 << self.config_feature_width) {
            return fail(format!(
                "{} channels cannot be addressed with a {}-bit feature id",
                self.channel_count, self.config_feature_width
            ));
        }
        // Global addresses are 32 bits wide.
        let bank_bits = 32 - (self.bank_count as u32 - 1).leading_zeros();
        if bank_bits + self.bank_addr_width > 32 {
            return fail("global address space exceeds 32 bits".to_string());
        }
        Ok(())
    }

    pub fn banks_per_channel(&self) -> u16 {
        self.bank_count / self.channel_count.max(1)
    }

    /// Exclusive upper bound for a channel's bank switch selector.
    pub fn switch_selector_limit(&self) -> u32 {
        1u32 << self.banks_per_channel()
    }

    pub fn bank_mask(&self) -> u32 {
        (1u32 << self.bank_addr_width) - 1
    }

    pub fn words_per_bank(&self) -> usize {
        1usize << (self.bank_addr_width - 1)
    }

    pub fn words_per_line(&self) -> u32 {
        self.bank_data_width / self.channel_data_width
    }

    pub fn line_bytes(&self) -> u32 {
        self.bank_data_width / 8
    }

    pub fn locate(&self, address: u32) -> WordLocation {
        WordLocation {
            bank: (address >> self.bank_addr_width) as usize,
            word: ((address & self.bank_mask()) >> 1) as usize,
        }
    }

    pub fn address_of(&self, location: WordLocation) -> u32 {
        ((location.bank as u32) << self.bank_addr_width) | ((location.word as u32) << 1)
    }

    /// Banks channel `channel` may reach, given its switch selector.
    pub fn reachable(&self, channel: u16, switch_sel: u32, bank: usize) -> bool {
        let per = self.banks_per_channel() as usize;
        let first = channel as usize * per;
        bank >= first && bank < first + per && (switch_sel >> (bank - first)) & 1 == 1
    }

    pub fn config_address(&self, channel: u16, reg: u32) -> u32 {
        ((channel as u32) << self.config_reg_width) + reg
    }
}
