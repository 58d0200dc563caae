// StreamIO - Streaming I/O Controller Verification Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{IoParams, IoSignals, SimResult, SimulationError};
use serde::Serialize;

const LANES: usize = 4;
const LANE_BITS: u32 = 16;

/// One logged bank access, kept for diagnostic replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MemAccess {
    Write {
        bank: usize,
        address: u32,
        data: u64,
        mask: u64,
    },
    Read {
        bank: usize,
        address: u32,
        data: u64,
    },
}

/// Banked word store with masked line writes and a one-tick read latency.
///
/// Each bank holds 16-bit words; a bank access moves one 64-bit line made of
/// four consecutive words, lane 0 in the low bits.
#[derive(Debug, Clone)]
pub struct BankedMemory {
    banks: Vec<Vec<u16>>,
    params: IoParams,
    /// Requests issued this tick, latched on the next `clock`.
    requested: Vec<Option<u32>>,
    latched: Vec<Option<u32>>,
    completed: Vec<Option<u64>>,
    log: Vec<MemAccess>,
    logging: bool,
}

impl BankedMemory {
    pub fn new(params: &IoParams) -> Self {
        let bank_count = params.bank_count as usize;
        Self {
            banks: vec![vec![0; params.words_per_bank()]; bank_count],
            params: *params,
            requested: vec![None; bank_count],
            latched: vec![None; bank_count],
            completed: vec![None; bank_count],
            log: Vec::new(),
            logging: true,
        }
    }

    pub fn bank_count(&self) -> usize {
        self.banks.len()
    }

    pub fn words_per_bank(&self) -> usize {
        self.params.words_per_bank()
    }

    pub fn set_logging(&mut self, enabled: bool) {
        self.logging = enabled;
    }

    pub fn access_log(&self) -> &[MemAccess] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Seed every word from `f(bank, word_index)`.
    pub fn fill_with<F: FnMut(usize, usize) -> u16>(&mut self, mut f: F) {
        for (b, bank) in self.banks.iter_mut().enumerate() {
            for (w, word) in bank.iter_mut().enumerate() {
                *word = f(b, w);
            }
        }
    }

    fn check(&self, bank: usize, word: usize) -> SimResult<()> {
        if bank < self.banks.len() && word < self.banks[bank].len() {
            Ok(())
        } else {
            Err(SimulationError::BankOutOfRange { bank, word })
        }
    }

    /// Read one word by global byte address.
    pub fn word(&self, address: u32) -> SimResult<u16> {
        let loc = self.params.locate(address);
        self.check(loc.bank, loc.word)?;
        Ok(self.banks[loc.bank][loc.word])
    }

    pub fn set_word(&mut self, address: u32, value: u16) -> SimResult<()> {
        let loc = self.params.locate(address);
        self.check(loc.bank, loc.word)?;
        self.banks[loc.bank][loc.word] = value;
        Ok(())
    }

    /// Masked line write at bank-local byte address `address`.
    ///
    /// The line is aligned down to its 64-bit boundary. Masked-out bits of
    /// each lane are written as zero rather than keeping the old contents.
    pub fn write(&mut self, bank: usize, address: u32, data: u64, mask: u64) -> SimResult<()> {
        let base = ((address >> 3) << 2) as usize;
        self.check(bank, base + LANES - 1)?;
        for lane in 0..LANES {
            let shift = lane as u32 * LANE_BITS;
            self.banks[bank][base + lane] = ((data & mask) >> shift) as u16;
        }
        tracing::trace!(
            "Write bank {}: data {:#018x} / bit_sel {:#018x} / addr {:#010x}",
            bank,
            data,
            mask,
            address
        );
        if self.logging {
            self.log.push(MemAccess::Write {
                bank,
                address,
                data,
                mask,
            });
        }
        Ok(())
    }

    /// Four consecutive words starting at bank-local byte address `address`.
    pub fn read_line(&self, bank: usize, address: u32) -> SimResult<u64> {
        let base = (address >> 1) as usize;
        self.check(bank, base + LANES - 1)?;
        let words = &self.banks[bank][base..base + LANES];
        Ok(words
            .iter()
            .enumerate()
            .fold(0u64, |acc, (lane, &w)| acc | (w as u64) << (lane as u32 * LANE_BITS)))
    }

    /// Issue a read for this tick. The data appears after the next-but-one
    /// `clock`, i.e. one tick after the request is latched.
    pub fn request_read(&mut self, bank: usize, address: u32) -> SimResult<()> {
        self.check(bank, 0)?;
        self.requested[bank] = Some(address);
        Ok(())
    }

    /// Result of the read completed by the most recent `clock`, if any.
    pub fn read_result(&self, bank: usize) -> Option<u64> {
        self.completed.get(bank).copied().flatten()
    }

    /// Advance the read pipeline by one tick: complete the reads latched on
    /// the previous tick, then latch this tick's requests.
    pub fn clock(&mut self) -> SimResult<()> {
        for bank in 0..self.banks.len() {
            self.completed[bank] = match self.latched[bank].take() {
                Some(address) => {
                    let data = self.read_line(bank, address)?;
                    tracing::trace!(
                        "Read bank {}: data {:#018x} / addr {:#010x}",
                        bank,
                        data,
                        address
                    );
                    if self.logging {
                        self.log.push(MemAccess::Read {
                            bank,
                            address,
                            data,
                        });
                    }
                    Some(data)
                }
                None => None,
            };
            self.latched[bank] = self.requested[bank].take();
        }
        Ok(())
    }

    /// Service one tick of memory-bus traffic: apply asserted writes, drive
    /// completed reads onto `read_data`, latch new read requests.
    pub fn service(&mut self, signals: &mut IoSignals) -> SimResult<()> {
        for bank in 0..self.banks.len().min(signals.banks.len()) {
            let port = &signals.banks[bank];
            if port.write_enable {
                let (address, data, mask) = (port.write_address, port.write_data, port.write_bit_select);
                self.write(bank, address, data, mask)?;
            }
            if port.read_enable {
                self.requested[bank] = Some(port.read_address);
            }
        }

        self.clock()?;

        for (bank, port) in signals.banks.iter_mut().enumerate() {
            if let Some(data) = self.read_result(bank) {
                port.read_data = data;
            }
        }
        Ok(())
    }

    /// Re-apply every logged write onto `target`.
    pub fn replay_writes(&self, target: &mut BankedMemory) -> SimResult<()> {
        for access in &self.log {
            if let MemAccess::Write {
                bank,
                address,
                data,
                mask,
            } = *access
            {
                target.write(bank, address, data, mask)?;
            }
        }
        Ok(())
    }
}
