//! Byte-oriented range coder (`Range`), Subbotin's carryless
//! variant: no explicit carry propagation, instead the encoder shrinks
//! `range` whenever it would straddle a renormalization boundary so the
//! top byte of `low` can never again change. Frequency tables are built and
//! transmitted with [`super::alphabet`] (`normalize_frequencies` scales the
//! block's order-0 histogram to [`SCALE`], `encode_alphabet`/`write_var_int`
//! carry the header).

use std::io::{Read, Write};

use super::alphabet::{decode_alphabet, encode_alphabet, normalize_frequencies, read_var_int, write_var_int};
use super::{EntropyDecoder, EntropyEncoder, EntropyError};
use crate::bitstream::{DefaultInputBitStream, DefaultOutputBitStream};
use crate::util::histogram::order0_histogram;

const TOP: u32 = 1 << 24;
const BOTTOM: u32 = 1 << 16;
const SCALE: u32 = 1 << 16;

struct FreqTable {
    /// Present symbols in ascending order.
    symbols: Vec<u8>,
    /// Cumulative frequency before symbol `i` (`cum[i]`), `cum[len] == SCALE`.
    cum: Vec<u32>,
    /// `freq[i]` is the scaled frequency of `symbols[i]`.
    freq: Vec<u32>,
}

impl FreqTable {
    fn from_block(block: &[u8]) -> Result<Self, EntropyError> {
        let mut freqs = order0_histogram(block);
        let total: u32 = block.len() as u32;
        let symbols = if total == 0 {
            Vec::new()
        } else {
            normalize_frequencies(&mut freqs, 256, total, SCALE)?
        };

        let mut cum = Vec::with_capacity(symbols.len() + 1);
        let mut freq = Vec::with_capacity(symbols.len());
        let mut acc = 0u32;
        for &s in &symbols {
            cum.push(acc);
            let f = freqs[s as usize];
            freq.push(f);
            acc += f;
        }
        cum.push(acc);

        Ok(FreqTable { symbols, cum, freq })
    }

    fn write<W: Write>(&self, obs: &mut DefaultOutputBitStream<W>) -> Result<(), EntropyError> {
        encode_alphabet(obs, &self.symbols, 256, self.symbols.len())?;
        for &f in &self.freq {
            write_var_int(obs, f)?;
        }
        Ok(())
    }

    fn read<R: Read>(ibs: &mut DefaultInputBitStream<R>) -> Result<Self, EntropyError> {
        let mut alphabet = [0u8; 256];
        let count = decode_alphabet(ibs, &mut alphabet)?;
        let symbols = alphabet[..count].to_vec();

        let mut cum = Vec::with_capacity(count + 1);
        let mut freq = Vec::with_capacity(count);
        let mut acc = 0u32;
        for _ in 0..count {
            let f = read_var_int(ibs)?;
            cum.push(acc);
            freq.push(f);
            acc += f;
        }
        cum.push(acc);

        Ok(FreqTable { symbols, cum, freq })
    }

    /// Index of `sym` among present symbols (linear scan: alphabets are <= 256).
    fn index_of(&self, sym: u8) -> Option<usize> {
        self.symbols.iter().position(|&s| s == sym)
    }

    fn total(&self) -> u32 {
        *self.cum.last().unwrap_or(&0)
    }

    /// Finds the symbol whose `[cum[i], cum[i]+freq[i])` interval contains `value`.
    fn find(&self, value: u32) -> usize {
        match self.cum.binary_search(&value) {
            Ok(i) => i.min(self.symbols.len() - 1),
            Err(i) => i - 1,
        }
    }
}

pub struct RangeEncoder<'a, W: Write> {
    bitstream: &'a mut DefaultOutputBitStream<W>,
    low: u32,
    range: u32,
}

impl<'a, W: Write> RangeEncoder<'a, W> {
    pub fn new(bitstream: &'a mut DefaultOutputBitStream<W>) -> Self {
        RangeEncoder { bitstream, low: 0, range: 0xFFFF_FFFF }
    }

    fn renormalize(&mut self) -> Result<(), EntropyError> {
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
                // top byte settled
            } else if self.range < BOTTOM {
                self.range = (!self.low).wrapping_add(1) & (BOTTOM - 1);
            } else {
                break;
            }
            self.bitstream.write_bits((self.low >> 24) as u64, 8)?;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }

    fn encode_freq(&mut self, cum: u32, freq: u32, total: u32) -> Result<(), EntropyError> {
        self.range /= total;
        self.low = self.low.wrapping_add(cum.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);
        self.renormalize()
    }

    fn flush(&mut self) -> Result<(), EntropyError> {
        for _ in 0..4 {
            self.bitstream.write_bits((self.low >> 24) as u64, 8)?;
            self.low <<= 8;
        }
        Ok(())
    }
}

impl<'a, W: Write> EntropyEncoder for RangeEncoder<'a, W> {
    fn encode(&mut self, block: &[u8]) -> Result<usize, EntropyError> {
        let table = FreqTable::from_block(block)?;
        table.write(self.bitstream)?;
        if table.symbols.is_empty() {
            return Ok(block.len());
        }
        let total = table.total();
        for &b in block {
            let idx = table.index_of(b).expect("histogram-derived alphabet must contain every block byte");
            self.encode_freq(table.cum[idx], table.freq[idx], total)?;
        }
        Ok(block.len())
    }

    fn finish(&mut self) -> Result<(), EntropyError> {
        self.flush()
    }
}

pub struct RangeDecoder<'a, R: Read> {
    bitstream: &'a mut DefaultInputBitStream<R>,
    low: u32,
    range: u32,
    code: u32,
}

impl<'a, R: Read> RangeDecoder<'a, R> {
    pub fn new(bitstream: &'a mut DefaultInputBitStream<R>) -> Result<Self, EntropyError> {
        let mut code = 0u32;
        for _ in 0..4 {
            code = (code << 8) | bitstream.read_bits(8)? as u32;
        }
        Ok(RangeDecoder { bitstream, low: 0, range: 0xFFFF_FFFF, code })
    }

    fn renormalize(&mut self) -> Result<(), EntropyError> {
        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
                // top byte settled
            } else if self.range < BOTTOM {
                self.range = (!self.low).wrapping_add(1) & (BOTTOM - 1);
            } else {
                break;
            }
            self.code = (self.code << 8) | self.bitstream.read_bits(8)? as u32;
            self.low <<= 8;
            self.range <<= 8;
        }
        Ok(())
    }

    fn decode_freq(&mut self, total: u32) -> Result<u32, EntropyError> {
        self.range /= total;
        Ok((self.code.wrapping_sub(self.low)) / self.range)
    }

    fn decode_update(&mut self, cum: u32, freq: u32) -> Result<(), EntropyError> {
        self.low = self.low.wrapping_add(cum.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);
        self.renormalize()
    }
}

impl<'a, R: Read> EntropyDecoder for RangeDecoder<'a, R> {
    fn decode(&mut self, block: &mut [u8]) -> Result<usize, EntropyError> {
        let table = FreqTable::read(self.bitstream)?;
        if table.symbols.is_empty() {
            return Ok(block.len());
        }
        let total = table.total();
        for slot in block.iter_mut() {
            let value = self.decode_freq(total)?.min(total - 1);
            let idx = table.find(value);
            *slot = table.symbols[idx];
            self.decode_update(table.cum[idx], table.freq[idx])?;
        }
        Ok(block.len())
    }
}
