//! Big-endian, MSB-first bit writer over a buffered byte sink.
//!
//! Direct port of the algorithm in kanzi's
//! `DefaultOutputBitStream.hpp`/`.cpp`: a 64-bit accumulator (`current`)
//! plus an `avail_bits` counter counting down from 64,
//! a byte buffer flushed to the sink once full, and a byte-aligned bulk-copy
//! fast path for `write_bits_bytes`. Exceptions become `Result`s here

use std::io::Write;

use crate::bitstream::error::BitStreamError;
use crate::config::MIN_BITSTREAM_BLOCK_SIZE;

/// Upper bound on the internal buffer size ("upper bound 2^29").
pub const MAX_BUFFER_SIZE: usize = 1 << 29;

#[inline]
fn mask64(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Buffered, big-endian bit writer (write contract).
pub struct DefaultOutputBitStream<W: Write> {
    sink: Option<W>,
    buffer: Vec<u8>,
    buffer_size: usize,
    position: usize,
    avail_bits: u32,
    current: u64,
    written: u64,
    closed: bool,
}

impl<W: Write> DefaultOutputBitStream<W> {
    /// Constructs a writer with the given internal buffer size.
    ///
    /// `buffer_size` must be >= 1024, a multiple of 8, and <= 2^29.
    pub fn new(sink: W, buffer_size: usize) -> Result<Self, BitStreamError> {
        if buffer_size < MIN_BITSTREAM_BLOCK_SIZE {
            return Err(BitStreamError::invalid("invalid buffer size (must be at least 1024)"));
        }
        if buffer_size > MAX_BUFFER_SIZE {
            return Err(BitStreamError::invalid("invalid buffer size (must be at most 536870912)"));
        }
        if buffer_size & 7 != 0 {
            return Err(BitStreamError::invalid("invalid buffer size (must be a multiple of 8)"));
        }
        Ok(DefaultOutputBitStream {
            sink: Some(sink),
            buffer: vec![0u8; buffer_size],
            buffer_size,
            position: 0,
            avail_bits: 64,
            current: 0,
            written: 0,
            closed: false,
        })
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total number of bits written so far, including buffered-but-unflushed ones.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written + ((self.position as u64) << 3) + (64 - self.avail_bits as u64)
    }

    fn check_open(&self) -> Result<(), BitStreamError> {
        if self.closed {
            Err(BitStreamError::closed())
        } else {
            Ok(())
        }
    }

    fn flush(&mut self) -> Result<(), BitStreamError> {
        if self.position > 0 {
            self.sink
                .as_mut()
                .expect("sink only taken by into_inner, after which no other method runs")
                .write_all(&self.buffer[..self.position])
                .map_err(BitStreamError::from)?;
            self.written += (self.position as u64) << 3;
            self.position = 0;
        }
        Ok(())
    }

    /// Pushes the 64-bit accumulator into the byte buffer, big-endian.
    fn push_current(&mut self) -> Result<(), BitStreamError> {
        self.buffer[self.position..self.position + 8].copy_from_slice(&self.current.to_be_bytes());
        self.avail_bits = 64;
        self.current = 0;
        self.position += 8;
        if self.position >= self.buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the least-significant bit of `bit`.
    pub fn write_bit(&mut self, bit: i32) -> Result<(), BitStreamError> {
        self.check_open()?;
        if self.avail_bits <= 1 {
            self.current |= (bit & 1) as u64;
            self.push_current()?;
        } else {
            self.avail_bits -= 1;
            self.current |= ((bit & 1) as u64) << self.avail_bits;
        }
        Ok(())
    }

    /// Writes the low `count` bits of `value`, MSB-first. `count` in `[1, 64]`.
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<u32, BitStreamError> {
        self.check_open()?;
        if count == 0 || count > 64 {
            return Err(BitStreamError::invalid(format!(
                "invalid bit count: {count} (must be in [1..64])"
            )));
        }
        if count < self.avail_bits {
            self.avail_bits -= count;
            self.current |= (value & mask64(count)) << self.avail_bits;
        } else {
            let value = value & mask64(count);
            let remaining = count - self.avail_bits;
            self.current |= value >> remaining;
            self.push_current()?;
            if remaining != 0 {
                self.current = value << (64 - remaining);
                self.avail_bits -= remaining;
            }
        }
        Ok(count)
    }

    /// Writes `n_bits` bits taken MSB-first from `bits`, with a byte-aligned
    /// bulk-copy fast path ("byte-run paths").
    pub fn write_bits_bytes(&mut self, bits: &[u8], n_bits: usize) -> Result<usize, BitStreamError> {
        self.check_open()?;
        let mut remaining = n_bits as i64;
        let mut start = 0usize;

        if self.avail_bits & 7 == 0 {
            while self.avail_bits != 64 && remaining >= 8 {
                self.write_bits(bits[start] as u64, 8)?;
                start += 1;
                remaining -= 8;
            }
            while (remaining >> 3) as usize >= self.buffer_size - self.position {
                let chunk = self.buffer_size - self.position;
                self.buffer[self.position..self.position + chunk]
                    .copy_from_slice(&bits[start..start + chunk]);
                start += chunk;
                remaining -= (chunk as i64) << 3;
                self.position = self.buffer_size;
                self.flush()?;
            }
            let r = ((remaining >> 6) << 3) as usize;
            if r > 0 {
                self.buffer[self.position..self.position + r].copy_from_slice(&bits[start..start + r]);
                start += r;
                self.position += r;
                remaining -= (r as i64) << 3;
            }
        } else {
            let r = 64 - self.avail_bits;
            while remaining >= 64 {
                let value = u64::from_be_bytes(bits[start..start + 8].try_into().unwrap());
                self.current |= value >> r;
                self.push_current()?;
                self.current = value << (64 - r);
                self.avail_bits -= r;
                start += 8;
                remaining -= 64;
            }
        }

        while remaining >= 8 {
            self.write_bits(bits[start] as u64, 8)?;
            start += 1;
            remaining -= 8;
        }
        if remaining > 0 {
            self.write_bits((bits[start] as u64) >> (8 - remaining), remaining as u32)?;
        }
        Ok(n_bits)
    }

    /// Pads the final partial byte with zero bits, flushes, and marks the
    /// stream closed. Subsequent writes fail with `StreamClosed`.
    pub fn close(&mut self) -> Result<(), BitStreamError> {
        if self.closed {
            return Ok(());
        }
        let saved_avail = self.avail_bits;
        let saved_position = self.position;
        let saved_current = self.current;

        let result = (|| {
            let size_bits = 64 - saved_avail;
            let size_bytes = ((size_bits + 7) / 8) as usize;
            self.push_current()?;
            self.position -= 8 - size_bytes;
            self.flush()?;
            self.sink
                .as_mut()
                .expect("sink only taken by into_inner, after which no other method runs")
                .flush()
                .map_err(BitStreamError::from)
        })();

        if let Err(e) = result {
            self.position = saved_position;
            self.avail_bits = saved_avail;
            self.current = saved_current;
            return Err(e);
        }

        self.closed = true;
        self.position = 0;
        self.avail_bits = 0;
        Ok(())
    }

    /// Closes the stream and returns the underlying sink.
    ///
    /// Used by callers (tests, the scheduler's in-memory mode) that need the
    /// written bytes back out; `W` is not otherwise accessible since the
    /// writer owns it exclusively while open.
    pub fn into_inner(mut self) -> Result<W, BitStreamError> {
        self.close()?;
        Ok(self.sink.take().expect("sink not yet taken"))
    }
}

impl<W: Write> Drop for DefaultOutputBitStream<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::error::BitStreamErrorKind;

    #[test]
    fn rejects_bad_buffer_sizes() {
        assert!(DefaultOutputBitStream::new(Vec::new(), 100).is_err());
        assert!(DefaultOutputBitStream::new(Vec::new(), 1025).is_err());
        assert!(DefaultOutputBitStream::new(Vec::new(), 1 << 30).is_err());
    }

    #[test]
    fn write_bit_and_close_pads_final_byte() {
        let mut bs = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        bs.write_bit(1).unwrap();
        bs.write_bit(0).unwrap();
        bs.write_bit(1).unwrap();
        bs.close().unwrap();
    }

    #[test]
    fn write_after_close_fails() {
        let mut bs = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        bs.close().unwrap();
        assert_eq!(
            bs.write_bits(1, 1).unwrap_err().kind,
            BitStreamErrorKind::StreamClosed
        );
    }

    #[test]
    fn rejects_out_of_range_count() {
        let mut bs = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        assert!(bs.write_bits(1, 0).is_err());
        assert!(bs.write_bits(1, 65).is_err());
    }
}
