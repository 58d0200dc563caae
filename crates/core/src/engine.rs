// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Reference model of the per-channel streaming state machines.
//!
//! After every tick the engine looks at what the unit under test presented,
//! checks INSTREAM words through the scoreboard and plays the producer side
//! of OUTSTREAM channels.

use crate::channel::{ChannelSet, ChannelState, Cursor, Producer};
use crate::stall::StallInjector;
use crate::testbench::Testbench;
use crate::{Dut, Scoreboard, SimResult, SimulationError, Tick};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

#[derive(Debug, Clone)]
pub struct StreamEngine {
    channels: ChannelSet,
    source: Vec<u16>,
    rng: Xoshiro256StarStar,
    producing: bool,
    done_seen: bool,
}

impl StreamEngine {
    pub fn new(channels: ChannelSet, seed: u64) -> Self {
        Self {
            channels,
            source: Vec::new(),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            producing: false,
            done_seen: false,
        }
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut ChannelSet {
        &mut self.channels
    }

    pub fn rng_mut(&mut self) -> &mut Xoshiro256StarStar {
        &mut self.rng
    }

    pub fn source(&self) -> &[u16] {
        &self.source
    }

    pub fn done_seen(&self) -> bool {
        self.done_seen
    }

    /// Fill the source array with one random word per slot of the longest
    /// channel.
    pub fn generate_source(&mut self) -> &[u16] {
        let len = self.channels.max_num_words() as usize;
        let rng = &mut self.rng;
        self.source = (0..len).map(|_| rng.gen::<u16>()).collect();
        &self.source
    }

    pub fn set_source(&mut self, source: Vec<u16>) {
        self.source = source;
    }

    /// Load every channel's cursor from its configuration and park the
    /// producers.
    pub fn arm<D: Dut>(&mut self, tb: &mut Testbench<D>) {
        self.channels.arm_all();
        self.producing = false;
        self.done_seen = false;
        for ch in self.channels.iter() {
            if let ChannelState::Outstream { .. } = ch.state {
                let port = &mut tb.signals.streams[ch.id as usize];
                port.write_enable = false;
                port.write_data = 0;
            }
        }
    }

    /// Start driving every OUTSTREAM channel with the first source word.
    pub fn begin_production<D: Dut>(&mut self, tb: &mut Testbench<D>) {
        let first = self.source.first().copied().unwrap_or(0);
        for ch in self.channels.iter_mut() {
            if let ChannelState::Outstream { producer, .. } = &mut ch.state {
                *producer = Producer {
                    write_enable: true,
                    next_index: 0,
                };
                let port = &mut tb.signals.streams[ch.id as usize];
                port.write_enable = true;
                port.write_data = first;
            }
        }
        self.producing = true;
    }

    /// Latch a done pulse seen on the last tick.
    pub fn observe_done<D: Dut>(&mut self, tb: &Testbench<D>) -> bool {
        if tb.signals.done_pulse && !self.done_seen {
            tracing::debug!("Done pulse at tick {}", tb.tick_count());
            self.done_seen = true;
        }
        self.done_seen
    }

    /// Advance the model by one tick.
    ///
    /// Every channel's next state is computed from the ports as they were
    /// after the tick and from `stalled`; the new states and stream inputs
    /// are committed together afterwards.
    pub fn step<D: Dut>(
        &mut self,
        tb: &mut Testbench<D>,
        stalled: bool,
        scoreboard: &mut Scoreboard,
    ) -> SimResult<()> {
        let ports = &tb.signals.streams;
        let coin = self.producing && !stalled && self.rng.gen_bool(0.5);
        let mut next = Vec::with_capacity(self.channels.len());

        for ch in self.channels.iter() {
            let port = &ports[ch.id as usize];
            let state = match ch.state {
                ChannelState::Instream(mut s) if !s.cursor.is_exhausted() => {
                    if !stalled {
                        let address = s.cursor.current_address;
                        scoreboard.check_instream(ch.id, address, port, &tb.memory)?;
                        tracing::debug!(
                            "ch{} in  {:#010x} = {:#06x}",
                            ch.id,
                            address,
                            port.read_data
                        );
                        s.last_presented = Some(address);
                        s.cursor.advance();
                    } else if let Some(address) = s.last_presented {
                        scoreboard.check_held(ch.id, address, port, &tb.memory)?;
                    }
                    ChannelState::Instream(s)
                }
                ChannelState::Outstream {
                    mut cursor,
                    mut producer,
                } if self.producing => {
                    // The driven enable and data stay frozen while stalled.
                    if !stalled {
                        if port.write_enable && !cursor.is_exhausted() {
                            tracing::debug!(
                                "ch{} out {:#010x} = {:#06x}",
                                ch.id,
                                cursor.current_address,
                                port.write_data
                            );
                            cursor.advance();
                            producer.next_index += 1;
                        }
                        producer.write_enable = !cursor.is_exhausted() && coin;
                    }
                    ChannelState::Outstream { cursor, producer }
                }
                other => other,
            };
            let drained = state.cursor().map_or(true, Cursor::is_exhausted);
            let mut completion_count = ch.completion_count;
            if drained && !stalled && completion_count < ch.config.completion_delay {
                completion_count += 1;
            }
            next.push((state, completion_count));
        }

        for (ch, (state, completion_count)) in self.channels.iter_mut().zip(next) {
            ch.state = state;
            ch.completion_count = completion_count;
            if let ChannelState::Outstream { producer, .. } = ch.state {
                if self.producing {
                    let port = &mut tb.signals.streams[ch.id as usize];
                    port.write_enable = producer.write_enable;
                    port.write_data = self.source.get(producer.next_index).copied().unwrap_or(0);
                }
            }
        }
        Ok(())
    }

    /// Tick until the done pulse, applying the injector's stall level.
    /// Returns the number of streaming ticks.
    pub fn run_until_done<D: Dut>(
        &mut self,
        tb: &mut Testbench<D>,
        scoreboard: &mut Scoreboard,
        stall: &StallInjector,
        max_ticks: Tick,
    ) -> SimResult<Tick> {
        let mut tick: Tick = 0;
        let result = loop {
            if self.done_seen {
                break Ok(tick);
            }
            if tick >= max_ticks {
                tracing::error!("No done pulse after {} streaming ticks", max_ticks);
                break Err(SimulationError::Timeout(max_ticks));
            }
            let stalled = stall.is_stalled(tick);
            tb.signals.global_stall = stalled;
            if let Err(e) = tb.tick() {
                break Err(e);
            }
            self.observe_done(tb);
            if let Err(e) = self.step(tb, stalled, scoreboard) {
                break Err(e);
            }
            tick += 1;
        };
        tb.signals.global_stall = false;
        result
    }
}
