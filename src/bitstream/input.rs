//! Big-endian, MSB-first bit reader over a buffered byte source.
//!
//! Mirror image of [`super::output::DefaultOutputBitStream`], grounded on
//! kanzi's `DefaultInputBitStream.cpp`'s `readBits`
//! byte-run algorithm (the single-value `readBit`/`readBits(count)` path is
//! reconstructed symmetrically from the same accumulator discipline, since
//! kanzi's inline definitions for them weren't available to copy).

use std::io::Read;

use crate::bitstream::error::BitStreamError;
use crate::config::MIN_BITSTREAM_BLOCK_SIZE;

pub const MAX_BUFFER_SIZE: usize = 1 << 29;

#[inline]
fn mask64(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

fn read_to_capacity(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Buffered, big-endian bit reader (read contract).
pub struct DefaultInputBitStream<R: Read> {
    source: R,
    buffer: Vec<u8>,
    buffer_size: usize,
    position: usize,
    max_position: i64,
    avail_bits: u32,
    current: u64,
    read: u64,
    closed: bool,
}

impl<R: Read> DefaultInputBitStream<R> {
    pub fn new(source: R, buffer_size: usize) -> Result<Self, BitStreamError> {
        if buffer_size < MIN_BITSTREAM_BLOCK_SIZE {
            return Err(BitStreamError::invalid("invalid buffer size (must be at least 1024)"));
        }
        if buffer_size > MAX_BUFFER_SIZE {
            return Err(BitStreamError::invalid("invalid buffer size (must be at most 536870912)"));
        }
        if buffer_size & 7 != 0 {
            return Err(BitStreamError::invalid("invalid buffer size (must be a multiple of 8)"));
        }
        Ok(DefaultInputBitStream {
            source,
            buffer: vec![0u8; buffer_size],
            buffer_size,
            position: 0,
            max_position: -1,
            avail_bits: 0,
            current: 0,
            read: 0,
            closed: false,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total number of bits consumed so far.
    pub fn read_bits_total(&self) -> u64 {
        self.read + ((self.position as u64) << 3) - (self.avail_bits as u64)
    }

    fn check_open(&self) -> Result<(), BitStreamError> {
        if self.closed {
            Err(BitStreamError::closed())
        } else {
            Ok(())
        }
    }

    fn read_from_input_stream(&mut self, count: usize) -> Result<usize, BitStreamError> {
        self.check_open()?;
        self.read += ((self.max_position + 1) as u64) << 3;
        let n = read_to_capacity(&mut self.source, &mut self.buffer[..count])?;
        self.position = 0;
        self.max_position = if n == 0 { -1 } else { (n - 1) as i64 };
        Ok(n)
    }

    fn pull_current(&mut self) -> Result<(), BitStreamError> {
        if (self.position + 8) as i64 > self.max_position + 1 {
            self.read_from_input_stream(self.buffer_size)?;
        }
        if (self.position + 8) as i64 > self.max_position + 1 {
            return Err(BitStreamError::end_of_stream());
        }
        self.current = u64::from_be_bytes(self.buffer[self.position..self.position + 8].try_into().unwrap());
        self.position += 8;
        self.avail_bits = 64;
        Ok(())
    }

    /// Reads a single bit (0 or 1).
    pub fn read_bit(&mut self) -> Result<i32, BitStreamError> {
        self.check_open()?;
        if self.avail_bits == 0 {
            self.pull_current()?;
        }
        self.avail_bits -= 1;
        Ok(((self.current >> self.avail_bits) & 1) as i32)
    }

    /// Reads `count` bits (`count` in `[1, 64]`) and returns them right-aligned.
    pub fn read_bits(&mut self, count: u32) -> Result<u64, BitStreamError> {
        self.check_open()?;
        if count == 0 || count > 64 {
            return Err(BitStreamError::invalid(format!(
                "invalid bit count: {count} (must be in [1..64])"
            )));
        }
        if count <= self.avail_bits {
            self.avail_bits -= count;
            Ok((self.current >> self.avail_bits) & mask64(count))
        } else {
            let v = self.current & mask64(self.avail_bits);
            let remaining = count - self.avail_bits;
            self.pull_current()?;
            self.avail_bits -= remaining;
            Ok((v << remaining) | (self.current >> self.avail_bits))
        }
    }

    /// Reads `n_bits` bits MSB-first into `bits`, with a byte-aligned bulk-copy
    /// fast path mirroring `write_bits_bytes`.
    pub fn read_bits_bytes(&mut self, bits: &mut [u8], n_bits: usize) -> Result<usize, BitStreamError> {
        self.check_open()?;
        if n_bits == 0 {
            return Ok(0);
        }
        let mut remaining = n_bits as i64;
        let mut start = 0usize;

        if self.avail_bits & 7 == 0 {
            if self.avail_bits == 0 {
                self.pull_current()?;
            }
            while self.avail_bits > 0 && remaining >= 8 {
                bits[start] = self.read_bits(8)? as u8;
                start += 1;
                remaining -= 8;
            }
            loop {
                let avail_bytes = (self.max_position + 1) - self.position as i64;
                if (remaining >> 3) <= avail_bytes {
                    break;
                }
                if avail_bytes <= 0 {
                    return Err(BitStreamError::end_of_stream());
                }
                let avail = avail_bytes as usize;
                bits[start..start + avail].copy_from_slice(&self.buffer[self.position..self.position + avail]);
                start += avail;
                remaining -= (avail as i64) << 3;
                self.read_from_input_stream(self.buffer_size)?;
            }
            let r = ((remaining >> 6) << 3) as usize;
            if r > 0 {
                bits[start..start + r].copy_from_slice(&self.buffer[self.position..self.position + r]);
                self.position += r;
                start += r;
                remaining -= (r as i64) << 3;
            }
        } else {
            let r = 64 - self.avail_bits;
            while remaining >= 64 {
                let v = self.current & mask64(self.avail_bits);
                self.pull_current()?;
                self.avail_bits -= r;
                let combined = (v << r) | (self.current >> self.avail_bits);
                bits[start..start + 8].copy_from_slice(&combined.to_be_bytes());
                start += 8;
                remaining -= 64;
            }
        }

        while remaining >= 8 {
            bits[start] = self.read_bits(8)? as u8;
            start += 1;
            remaining -= 8;
        }
        if remaining > 0 {
            bits[start] = (self.read_bits(remaining as u32)? as u8) << (8 - remaining);
        }
        Ok(n_bits)
    }

    /// `true` unless the stream is closed or EOF has been reached.
    pub fn has_more_to_read(&mut self) -> bool {
        if self.closed {
            return false;
        }
        if (self.position as i64) < self.max_position || self.avail_bits > 0 {
            return true;
        }
        matches!(self.read_from_input_stream(self.buffer_size), Ok(n) if n > 0)
    }

    /// Marks the stream closed. Subsequent reads fail with `StreamClosed`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.avail_bits = 0;
        self.max_position = -1;
    }
}

#[cfg(test)]
mod tests {
    use super::super::output::DefaultOutputBitStream;
    use super::*;

    #[test]
    fn round_trips_varied_bit_widths() {
        let mut out = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        let values: Vec<(u64, u32)> =
            vec![(1, 1), (0, 1), (0b101, 3), (0xFF, 8), (0x1234, 16), (u64::MAX, 64), (42, 7)];
        for &(v, n) in &values {
            out.write_bits(v, n).unwrap();
        }
        out.close().unwrap();
        let buf = out_into_vec(out);

        let mut input = DefaultInputBitStream::new(buf.as_slice(), 1024).unwrap();
        for &(v, n) in &values {
            let got = input.read_bits(n).unwrap();
            assert_eq!(got, v & mask64(n), "mismatch for width {n}");
        }
    }

    #[test]
    fn round_trips_individual_bits() {
        let mut out = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        let bits = [1, 0, 1, 1, 0, 0, 1, 0, 1];
        for &b in &bits {
            out.write_bit(b).unwrap();
        }
        out.close().unwrap();
        let buf = out_into_vec(out);

        let mut input = DefaultInputBitStream::new(buf.as_slice(), 1024).unwrap();
        for &b in &bits {
            assert_eq!(input.read_bit().unwrap(), b);
        }
    }

    #[test]
    fn round_trips_byte_runs_both_alignments() {
        let data: Vec<u8> = (0..251u16).map(|i| (i * 7) as u8).collect();
        let mut out = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        // Misalign by 3 bits first so the byte-run path exercises both branches.
        out.write_bits(0b101, 3).unwrap();
        out.write_bits_bytes(&data, data.len() * 8).unwrap();
        out.close().unwrap();
        let buf = out_into_vec(out);

        let mut input = DefaultInputBitStream::new(buf.as_slice(), 1024).unwrap();
        assert_eq!(input.read_bits(3).unwrap(), 0b101);
        let mut roundtrip = vec![0u8; data.len()];
        input.read_bits_bytes(&mut roundtrip, data.len() * 8).unwrap();
        assert_eq!(roundtrip, data);
    }

    #[test]
    fn read_past_eof_fails() {
        let mut out = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        out.write_bits(1, 1).unwrap();
        out.close().unwrap();
        let buf = out_into_vec(out);

        let mut input = DefaultInputBitStream::new(buf.as_slice(), 1024).unwrap();
        let _ = input.read_bit().unwrap();
        assert!(input.read_bits(64).is_err());
    }

    #[test]
    fn read_after_close_fails() {
        let mut input = DefaultInputBitStream::new(&b""[..], 1024).unwrap();
        input.close();
        assert!(input.read_bit().is_err());
    }

    fn out_into_vec(out: DefaultOutputBitStream<Vec<u8>>) -> Vec<u8> {
        out.into_inner().unwrap()
    }
}
