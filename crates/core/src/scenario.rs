// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::channel::{ChannelConfig, ChannelSet, Mode};
use crate::engine::StreamEngine;
use crate::protocol::ConfigDriver;
use crate::scoreboard::CheckCounters;
use crate::stall::{StallInjector, StallWindow};
use crate::testbench::Testbench;
use crate::{Dut, ErrorKind, IoParams, Scoreboard, SimResult, SimulationError, Tick};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::Serialize;
use streamio_config::ScenarioSpec;

pub use streamio_config::ScenarioKind;

/// Idle ticks after programming and after end-of-run verification.
pub const SCENARIO_IDLE_TICKS: u32 = 100;
/// Idle ticks between consecutive scenarios of a batch.
pub const BATCH_GAP_TICKS: u32 = 500;
/// Ticks between the start pulse and the first stream word.
pub const READ_LATENCY_TICKS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
    /// Channels not listed are programmed IDLE.
    pub channels: Vec<(u16, ChannelConfig)>,
    /// Ticks the application spends reading before producers start.
    pub latency: u32,
    pub stall_cycles: u32,
}

impl Scenario {
    pub fn stream(name: &str, channels: Vec<(u16, ChannelConfig)>, latency: u32, stall_cycles: u32) -> Self {
        Self {
            name: name.to_string(),
            kind: ScenarioKind::Stream,
            channels,
            latency,
            stall_cycles,
        }
    }

    pub fn config_roundtrip(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ScenarioKind::ConfigRoundtrip,
            channels: Vec::new(),
            latency: 0,
            stall_cycles: 0,
        }
    }

    pub fn from_spec(spec: &ScenarioSpec) -> Self {
        Self {
            name: spec.name.clone(),
            kind: spec.kind,
            channels: spec
                .channels
                .iter()
                .map(|c| {
                    (
                        c.id,
                        ChannelConfig {
                            mode: Mode::from(c.mode),
                            start_address: c.start_address,
                            num_words: c.num_words,
                            switch_sel: c.switch_sel,
                            completion_delay: c.completion_delay,
                        },
                    )
                })
                .collect(),
            latency: spec.latency,
            stall_cycles: spec.stall_cycles,
        }
    }

    pub fn config_for(&self, id: u16) -> ChannelConfig {
        self.channels
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, cfg)| *cfg)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOptions {
    pub seed: u64,
    pub max_ticks: Tick,
    pub continue_on_failure: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            max_ticks: 1_000_000,
            continue_on_failure: false,
        }
    }
}

/// Result of one streaming run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamOutcome {
    pub streaming_ticks: Tick,
    pub stall: Option<StallWindow>,
    pub checks: CheckCounters,
    pub channels: ChannelSet,
    pub source: Vec<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub kind: ScenarioKind,
    pub seed: u64,
    pub passed: bool,
    /// Testbench ticks spent on the scenario, programming included.
    pub ticks: Tick,
    pub streaming_ticks: Tick,
    pub stall: Option<StallWindow>,
    pub checks: CheckCounters,
    pub registers_checked: u32,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub params: IoParams,
    pub seed: u64,
    pub passed: bool,
    pub scenarios: Vec<ScenarioReport>,
}

impl BatchReport {
    /// Kind of the first failure, if any scenario failed.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        self.scenarios.iter().find_map(|s| s.error_kind)
    }
}

fn pulse_start<D: Dut>(tb: &mut Testbench<D>) -> SimResult<()> {
    tb.signals.start_pulse = true;
    let result = tb.tick();
    tb.signals.start_pulse = false;
    result
}

/// Program every channel, stream until the done pulse and verify memory.
pub fn run_stream_scenario<D: Dut>(
    tb: &mut Testbench<D>,
    scenario: &Scenario,
    seed: u64,
    max_ticks: Tick,
) -> SimResult<StreamOutcome> {
    let params = tb.params;
    let driver = ConfigDriver::new(&params);
    let mut engine = StreamEngine::new(ChannelSet::new(&params), seed);

    for &(id, _) in &scenario.channels {
        if id >= params.channel_count {
            return Err(SimulationError::InvalidChannel {
                channel: id,
                count: params.channel_count,
            });
        }
    }
    for id in 0..params.channel_count {
        let config = scenario.config_for(id);
        engine.channels_mut().configure(id, config)?;
        driver.write_channel(tb, id, &config)?;
    }
    tb.idle(SCENARIO_IDLE_TICKS)?;

    let max_num_words = engine.channels().max_num_words();
    let stall = StallInjector::plan(scenario.stall_cycles, max_num_words, engine.rng_mut());
    engine.generate_source();

    pulse_start(tb)?;
    engine.arm(tb);
    engine.observe_done(tb);

    for _ in 0..READ_LATENCY_TICKS {
        tb.tick()?;
        engine.observe_done(tb);
    }

    let mut scoreboard = Scoreboard::new();
    for _ in 0..scenario.latency {
        tb.tick()?;
        engine.observe_done(tb);
        engine.step(tb, false, &mut scoreboard)?;
    }

    engine.begin_production(tb);
    let streaming_ticks = engine.run_until_done(tb, &mut scoreboard, &stall, max_ticks)?;

    scoreboard.verify_run(engine.channels(), engine.source(), &tb.memory)?;
    tb.idle(SCENARIO_IDLE_TICKS)?;

    Ok(StreamOutcome {
        streaming_ticks,
        stall: stall.window(),
        checks: scoreboard.counters(),
        channels: engine.channels().clone(),
        source: engine.source().to_vec(),
    })
}

/// Write random values to all five registers of every channel and read them
/// back. Channels are left IDLE. Returns the number of registers checked.
pub fn run_config_roundtrip<D: Dut>(tb: &mut Testbench<D>, seed: u64) -> SimResult<u32> {
    let params = tb.params;
    let driver = ConfigDriver::new(&params);
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut checked = 0;

    for id in 0..params.channel_count {
        let config = ChannelConfig {
            mode: Mode::Idle,
            start_address: rng.gen::<u32>() << 3,
            num_words: rng.gen::<u16>() as u32,
            switch_sel: rng.gen::<u32>() % params.switch_selector_limit(),
            completion_delay: rng.gen::<u8>() as u32,
        };
        driver.write_channel(tb, id, &config)?;
        driver.read_back_channel(tb, id, &config)?;
        checked += crate::protocol::RegisterId::ALL.len() as u32;
    }
    Ok(checked)
}

/// Run one scenario and fold the outcome into a report.
pub fn run_scenario<D: Dut>(tb: &mut Testbench<D>, scenario: &Scenario, seed: u64, max_ticks: Tick) -> ScenarioReport {
    tracing::info!("Scenario '{}' ({:?}) seed {}", scenario.name, scenario.kind, seed);
    // The access log covers one scenario at a time.
    tb.memory.clear_log();
    for observer in tb.observers() {
        observer.on_run_start(&scenario.name);
    }

    let start_tick = tb.tick_count();
    let mut report = ScenarioReport {
        name: scenario.name.clone(),
        kind: scenario.kind,
        seed,
        passed: false,
        ticks: 0,
        streaming_ticks: 0,
        stall: None,
        checks: CheckCounters::default(),
        registers_checked: 0,
        error: None,
        error_kind: None,
    };

    let result = match scenario.kind {
        ScenarioKind::Stream => run_stream_scenario(tb, scenario, seed, max_ticks).map(|outcome| {
            report.streaming_ticks = outcome.streaming_ticks;
            report.stall = outcome.stall;
            report.checks = outcome.checks;
        }),
        ScenarioKind::ConfigRoundtrip => {
            run_config_roundtrip(tb, seed).map(|checked| report.registers_checked = checked)
        }
    };

    report.ticks = tb.tick_count() - start_tick;
    match result {
        Ok(()) => {
            report.passed = true;
            tracing::info!("Scenario '{}' passed in {} ticks", scenario.name, report.ticks);
        }
        Err(e) => {
            tracing::error!("Scenario '{}' failed: {}", scenario.name, e);
            report.error_kind = Some(e.kind());
            report.error = Some(e.to_string());
        }
    }

    for observer in tb.observers() {
        observer.on_run_end(&scenario.name, report.passed);
    }
    report
}

/// Run scenarios in order with idle gaps between them.
///
/// A failing scenario ends the batch unless `continue_on_failure` is set; in
/// that case the testbench is reset before the next scenario.
pub fn run_batch<D: Dut>(tb: &mut Testbench<D>, scenarios: &[Scenario], options: &RunOptions) -> BatchReport {
    let mut reports = Vec::with_capacity(scenarios.len());

    for (i, scenario) in scenarios.iter().enumerate() {
        if i > 0 {
            if let Err(e) = tb.idle(BATCH_GAP_TICKS) {
                tracing::error!("Idle gap before '{}' failed: {}", scenario.name, e);
                break;
            }
        }
        let seed = options.seed.wrapping_add(i as u64);
        let report = run_scenario(tb, scenario, seed, options.max_ticks);
        let passed = report.passed;
        reports.push(report);

        if !passed {
            if !options.continue_on_failure {
                break;
            }
            tb.reset();
        }
    }

    let passed = reports.len() == scenarios.len() && reports.iter().all(|r| r.passed);
    BatchReport {
        params: tb.params,
        seed: options.seed,
        passed,
        scenarios: reports,
    }
}

/// Base address and byte size of the banks channel `channel` owns.
fn channel_region(params: &IoParams, channel: u16) -> (u32, u32) {
    let per = params.banks_per_channel() as u32;
    let base = (channel as u32 * per) << params.bank_addr_width;
    (base, per << params.bank_addr_width)
}

/// Place a stream of `words` at `offset` bytes into the channel's region,
/// trimming it so it never leaves the region.
fn place(params: &IoParams, channel: u16, offset: u32, words: u32) -> (u32, u32) {
    let (base, size) = channel_region(params, channel);
    let offset = (offset % size) & !1;
    let start = base + offset;
    let fit = (size - offset) / 2;
    (start, words.min(fit))
}

fn stream_channel(params: &IoParams, id: u16, mode: Mode, offset: u32, words: u32, delay: u32) -> (u16, ChannelConfig) {
    let (start_address, num_words) = place(params, id, offset, words);
    (
        id,
        ChannelConfig {
            mode,
            start_address,
            num_words,
            switch_sel: params.switch_selector_limit() - 1,
            completion_delay: delay,
        },
    )
}

fn dedup(channels: Vec<(u16, ChannelConfig)>) -> Vec<(u16, ChannelConfig)> {
    let mut seen = Vec::new();
    channels
        .into_iter()
        .filter(|(id, _)| {
            let fresh = !seen.contains(id);
            seen.push(*id);
            fresh
        })
        .collect()
}

/// The reference regression: register round-trip, a stalled
/// instream/outstream pair, and four channels crossing bank boundaries.
pub fn builtin_scenarios(params: &IoParams) -> Vec<Scenario> {
    let n = params.channel_count;
    let w = params.bank_addr_width;
    let bank = 1u32 << w;
    // Streams start near the end of their first bank so they cross into the
    // next one when the channel owns more than one.
    let near_end = |back: u32| {
        if params.banks_per_channel() >= 2 {
            bank.saturating_sub(back)
        } else {
            100
        }
    };

    let pair = dedup(vec![
        stream_channel(params, 0, Mode::Instream, (1 << (w - 2)) + 100, 200, 20),
        stream_channel(params, n / 2, Mode::Outstream, 100, 300, 20),
    ]);

    let quad = dedup(vec![
        stream_channel(params, 0, Mode::Instream, near_end(100), 200, 0),
        stream_channel(params, n / 4, Mode::Instream, near_end(150), 200, 0),
        stream_channel(params, n / 2, Mode::Instream, near_end(50), 200, 0),
        stream_channel(params, 3 * n / 4, Mode::Outstream, near_end(70), 200, 0),
    ]);

    vec![
        Scenario::config_roundtrip("config-roundtrip"),
        Scenario::stream("instream-outstream-stall", pair, 10, 300),
        Scenario::stream("four-channel-bank-crossing", quad, 30, 0),
    ]
}
