// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_max_ticks() -> u64 {
    1_000_000
}

fn default_latency() -> u32 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    #[default]
    Idle,
    Instream,
    Outstream,
    Sram,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    #[default]
    Stream,
    ConfigRoundtrip,
}

/// Hardware parameter overrides. Unset fields keep the model defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamOverrides {
    #[serde(default)]
    pub bank_count: Option<u16>,
    #[serde(default)]
    pub channel_count: Option<u16>,
    #[serde(default)]
    pub bank_addr_width: Option<u32>,
    #[serde(default)]
    pub bank_data_width: Option<u32>,
    #[serde(default)]
    pub channel_data_width: Option<u32>,
    #[serde(default)]
    pub config_feature_width: Option<u32>,
    #[serde(default)]
    pub config_reg_width: Option<u32>,
}

impl ParamOverrides {
    /// Set one parameter by name. Accepts both the snake_case field names
    /// and the uppercase hardware parameter names (`BANK_ADDR_WIDTH`).
    pub fn set(&mut self, name: &str, value: u32) -> Result<()> {
        let narrow = |v: u32| -> Result<u16> {
            u16::try_from(v).with_context(|| format!("Value {} for '{}' does not fit 16 bits", v, name))
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "bank_count" | "num_banks" => self.bank_count = Some(narrow(value)?),
            "channel_count" | "num_io" => self.channel_count = Some(narrow(value)?),
            "bank_addr_width" => self.bank_addr_width = Some(value),
            "bank_data_width" => self.bank_data_width = Some(value),
            "channel_data_width" | "cgra_data_width" => self.channel_data_width = Some(value),
            "config_feature_width" => self.config_feature_width = Some(value),
            "config_reg_width" => self.config_reg_width = Some(value),
            other => anyhow::bail!("Unknown parameter '{}'", other),
        }
        Ok(())
    }

    /// Parse a `NAME=VALUE` assignment (value in decimal or `0x` hex).
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("Expected NAME=VALUE, got '{}'", assignment))?;
        let value = parse_u32(value)?;
        self.set(name, value)
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&mut self, other: &ParamOverrides) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(
            bank_count,
            channel_count,
            bank_addr_width,
            bank_data_width,
            channel_data_width,
            config_feature_width,
            config_reg_width
        );
    }
}

pub fn parse_u32(s: &str) -> Result<u32> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).with_context(|| format!("Invalid hex value '{}'", s))
    } else {
        trimmed
            .parse::<u32>()
            .with_context(|| format!("Invalid value '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    /// Safety ceiling on ticks spent waiting for the done pulse.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    #[serde(default)]
    pub continue_on_failure: bool,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            continue_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub id: u16,
    pub mode: ChannelMode,
    #[serde(default)]
    pub start_address: u32,
    #[serde(default)]
    pub num_words: u32,
    #[serde(default)]
    pub switch_sel: u32,
    #[serde(default)]
    pub completion_delay: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ScenarioKind,
    #[serde(default = "default_latency")]
    pub latency: u32,
    #[serde(default)]
    pub stall_cycles: u32,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchScript {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub params: ParamOverrides,
    #[serde(default)]
    pub limits: RunLimits,
    #[serde(default)]
    pub include_builtin: bool,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

impl BenchScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read bench script at {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self = serde_yaml::from_str(yaml).context("Failed to parse Bench Script YAML")?;
        script.validate()?;
        tracing::debug!(
            "Loaded bench script with {} scenario(s)",
            script.scenarios.len()
        );
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.limits.max_ticks == 0 {
            anyhow::bail!("Limit 'max_ticks' must be greater than zero");
        }

        if self.scenarios.is_empty() && !self.include_builtin {
            anyhow::bail!("Bench script defines no scenarios");
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                anyhow::bail!("Scenario name cannot be empty");
            }
            if !names.insert(scenario.name.as_str()) {
                anyhow::bail!("Duplicate scenario name '{}'", scenario.name);
            }
            let mut ids = HashSet::new();
            for channel in &scenario.channels {
                if !ids.insert(channel.id) {
                    anyhow::bail!(
                        "Scenario '{}' configures channel {} more than once",
                        scenario.name,
                        channel.id
                    );
                }
            }
        }

        Ok(())
    }
}
