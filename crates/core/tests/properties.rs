// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use streamio_core::protocol::{ConfigDriver, RegisterId};
use streamio_core::scenario::run_stream_scenario;
use streamio_core::{
    BankedMemory, ChannelConfig, ChannelSet, ErrorKind, IoController, IoParams, IoSignals, Mode,
    Scenario, Scoreboard, SimulationError, StallInjector, StreamEngine, Testbench,
};

fn bench() -> anyhow::Result<Testbench<IoController>> {
    let params = IoParams::default();
    Ok(Testbench::new(IoController::new(&params), &params)?)
}

#[test]
fn test_write_masking_never_merges() -> anyhow::Result<()> {
    let params = IoParams {
        bank_count: 2,
        channel_count: 1,
        bank_addr_width: 10,
        ..Default::default()
    };
    let mut rng = Xoshiro256StarStar::seed_from_u64(0x5eed);
    for _ in 0..256 {
        let mut mem = BankedMemory::new(&params);
        mem.fill_with(|_, _| 0xFFFF);
        let (data, mask): (u64, u64) = (rng.gen(), rng.gen());
        let address = rng.gen_range(0..128u32) << 3;
        mem.write(1, address, data, mask)?;
        assert_eq!(mem.read_line(1, address)?, data & mask);
    }
    Ok(())
}

#[test]
fn test_bank_decomposition_roundtrip() {
    let params = IoParams::default();
    let mut rng = Xoshiro256StarStar::seed_from_u64(3);
    for _ in 0..1000 {
        let address = rng.gen_range(0..(32u32 << 17)) & !1;
        let loc = params.locate(address);
        assert_eq!(loc.bank, (address >> 17) as usize);
        assert_eq!(loc.word, ((address & 0x1_ffff) >> 1) as usize);
        assert_eq!(params.address_of(loc), address);
    }
}

#[test]
fn test_read_data_never_early() -> anyhow::Result<()> {
    let params = IoParams::default();
    let mut mem = BankedMemory::new(&params);
    mem.fill_with(|bank, word| (bank as u16) << 12 | word as u16 & 0xfff);
    let mut signals = IoSignals::new(&params);
    let expected_t = mem.read_line(6, 0x80)?;
    let expected_t1 = mem.read_line(6, 0x400)?;

    // Tick T
    signals.banks[6].read_enable = true;
    signals.banks[6].read_address = 0x80;
    mem.service(&mut signals)?;
    assert_ne!(signals.banks[6].read_data, expected_t);

    // Tick T+1, unrelated read
    signals.banks[6].read_address = 0x400;
    mem.service(&mut signals)?;
    assert_eq!(signals.banks[6].read_data, expected_t);

    signals.banks[6].read_enable = false;
    mem.service(&mut signals)?;
    assert_eq!(signals.banks[6].read_data, expected_t1);
    Ok(())
}

#[test]
fn test_stall_freezes_progress() -> anyhow::Result<()> {
    let mut tb = bench()?;
    let params = tb.params;
    let driver = ConfigDriver::new(&params);
    let mut engine = StreamEngine::new(ChannelSet::new(&params), 4);
    let configs = [
        (
            1u16,
            ChannelConfig {
                mode: Mode::Instream,
                start_address: (4 << 17) + 0x20,
                num_words: 120,
                switch_sel: 0x1,
                completion_delay: 0,
            },
        ),
        (
            3,
            ChannelConfig {
                mode: Mode::Outstream,
                start_address: (12 << 17) + 0x2,
                num_words: 120,
                switch_sel: 0x1,
                completion_delay: 0,
            },
        ),
    ];
    for (id, cfg) in configs {
        driver.write_channel(&mut tb, id, &cfg)?;
        engine.channels_mut().configure(id, cfg)?;
    }
    engine.generate_source();
    tb.signals.start_pulse = true;
    tb.tick()?;
    tb.signals.start_pulse = false;
    engine.arm(&mut tb);
    tb.tick()?;
    engine.begin_production(&mut tb);

    let (s, k) = (10, 25);
    let stall = StallInjector::fixed(s, k);
    let mut sb = Scoreboard::new();
    let mut frozen = None;
    let mut driven = None;
    for t in 0..(s + k + 10) {
        if t == s {
            frozen = Some(engine.channels().clone());
            driven = Some(tb.signals.streams[3].clone());
        }
        if t == s + k {
            let frozen = frozen.as_ref().expect("recorded at stall start");
            for id in [1, 3] {
                assert_eq!(engine.channels().get(id)?.cursor(), frozen.get(id)?.cursor());
            }
        }
        let stalled = stall.is_stalled(t);
        tb.signals.global_stall = stalled;
        tb.tick()?;
        engine.step(&mut tb, stalled, &mut sb)?;
        if stalled {
            let held = driven.as_ref().expect("recorded at stall start");
            assert_eq!(tb.signals.streams[3].write_enable, held.write_enable, "tick {}", t);
            assert_eq!(tb.signals.streams[3].write_data, held.write_data, "tick {}", t);
        }
    }
    assert_eq!(sb.counters().stall_holds, k);
    // Both channels moved again after the stall.
    let after = engine.channels().get(1)?.cursor().copied().unwrap_or_default();
    assert!(after.remaining_words < 120 - s as u32);
    Ok(())
}

#[test]
fn test_unaligned_start_rejected_before_bus() -> anyhow::Result<()> {
    let mut tb = bench()?;
    let scenario = Scenario::stream(
        "odd",
        vec![(
            2,
            ChannelConfig {
                mode: Mode::Instream,
                start_address: 0x1001,
                num_words: 8,
                switch_sel: 0xF,
                completion_delay: 0,
            },
        )],
        1,
        0,
    );
    let err = run_stream_scenario(&mut tb, &scenario, 1, 1000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    // Channels 0 and 1 were programmed; channel 2 never saw its START_ADDRESS.
    let driver = ConfigDriver::new(&tb.params);
    driver.read_register(&mut tb, 2, RegisterId::StartAddress, 0, 10)?;
    driver.read_register(&mut tb, 2, RegisterId::Mode, 0, 10)?;

    let err = driver
        .write_register(&mut tb, 0, RegisterId::StartAddress, 0x3)
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::UnalignedAddress {
            channel: 0,
            address: 0x3
        }
    );
    Ok(())
}

#[test]
fn test_selector_limit_follows_banks_per_channel() -> anyhow::Result<()> {
    let params = IoParams {
        bank_count: 32,
        channel_count: 16,
        ..Default::default()
    };
    let mut tb = Testbench::new(IoController::new(&params), &params)?;
    let driver = ConfigDriver::new(&params);
    driver.write_register(&mut tb, 15, RegisterId::SwitchSelector, 0b11)?;
    let err = driver
        .write_register(&mut tb, 15, RegisterId::SwitchSelector, 0b100)
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::SwitchSelectorOutOfRange {
            channel: 15,
            selector: 4,
            limit: 4
        }
    );
    Ok(())
}
