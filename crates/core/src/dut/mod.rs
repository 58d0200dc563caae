// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod io_controller;

use crate::IoSignals;

/// Signal-level view of the unit under test.
///
/// `eval` settles combinational outputs and performs the sequential update
/// when it observes a rising edge on `signals.clk`, the way a compiled RTL
/// model is driven.
pub trait Dut: std::fmt::Debug {
    fn reset(&mut self, signals: &mut IoSignals);
    fn eval(&mut self, signals: &mut IoSignals);

    /// Internal state for diagnostics.
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
