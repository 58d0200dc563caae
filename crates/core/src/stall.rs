// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::Tick;
use rand::Rng;
use serde::Serialize;

/// Earliest tick, relative to the start of streaming, a stall may begin.
pub const MIN_STALL_START: Tick = 2;

/// A contiguous run of stalled ticks, `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StallWindow {
    pub start: Tick,
    pub duration: Tick,
}

impl StallWindow {
    pub fn end(&self) -> Tick {
        self.start + self.duration
    }

    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.start && tick < self.end()
    }
}

/// Decides the global stall level for every tick of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StallInjector {
    window: Option<StallWindow>,
}

impl StallInjector {
    pub fn disabled() -> Self {
        Self { window: None }
    }

    pub fn fixed(start: Tick, duration: Tick) -> Self {
        Self {
            window: (duration > 0).then_some(StallWindow { start, duration }),
        }
    }

    /// Pick a start tick in `[2, max_num_words / 2]` and stall for
    /// `duration` ticks. Disabled when either argument is zero.
    pub fn plan<R: Rng + ?Sized>(duration: u32, max_num_words: u32, rng: &mut R) -> Self {
        if duration == 0 || max_num_words == 0 {
            return Self::disabled();
        }
        let offset = (rng.gen::<u32>() % max_num_words) / 2;
        let start = (offset as Tick).max(MIN_STALL_START);
        tracing::info!("Stall planned: {} ticks from tick {}", duration, start);
        Self::fixed(start, duration as Tick)
    }

    pub fn window(&self) -> Option<StallWindow> {
        self.window
    }

    pub fn is_enabled(&self) -> bool {
        self.window.is_some()
    }

    /// Stall level for `tick`, counted from the start of streaming.
    pub fn is_stalled(&self, tick: Tick) -> bool {
        self.window.map_or(false, |w| w.contains(tick))
    }
}
