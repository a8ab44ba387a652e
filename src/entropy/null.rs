//! Pass-through entropy codec (`Null`).
//!
//! Direct port of kanzi's `NullEntropyEncoder.hpp`: no
//! modeling, just a byte-aligned bulk write/read through the bitstream.

use std::io::{Read, Write};

use super::{EntropyDecoder, EntropyEncoder, EntropyError};
use crate::bitstream::{DefaultInputBitStream, DefaultOutputBitStream};

pub struct NullEncoder<'a, W: Write> {
    bitstream: &'a mut DefaultOutputBitStream<W>,
}

impl<'a, W: Write> NullEncoder<'a, W> {
    pub fn new(bitstream: &'a mut DefaultOutputBitStream<W>) -> Self {
        NullEncoder { bitstream }
    }
}

impl<'a, W: Write> EntropyEncoder for NullEncoder<'a, W> {
    fn encode(&mut self, block: &[u8]) -> Result<usize, EntropyError> {
        self.bitstream.write_bits_bytes(block, block.len() * 8)?;
        Ok(block.len())
    }

    fn finish(&mut self) -> Result<(), EntropyError> {
        Ok(())
    }
}

pub struct NullDecoder<'a, R: Read> {
    bitstream: &'a mut DefaultInputBitStream<R>,
}

impl<'a, R: Read> NullDecoder<'a, R> {
    pub fn new(bitstream: &'a mut DefaultInputBitStream<R>) -> Self {
        NullDecoder { bitstream }
    }
}

impl<'a, R: Read> EntropyDecoder for NullDecoder<'a, R> {
    fn decode(&mut self, block: &mut [u8]) -> Result<usize, EntropyError> {
        self.bitstream.read_bits_bytes(block, block.len() * 8)?;
        Ok(block.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i * 37) as u8).collect();

        let mut out = DefaultOutputBitStream::new(Vec::new(), 1024).unwrap();
        NullEncoder::new(&mut out).encode(&data).unwrap();
        let buf = out.into_inner().unwrap();

        let mut input = DefaultInputBitStream::new(buf.as_slice(), 1024).unwrap();
        let mut roundtrip = vec![0u8; data.len()];
        NullDecoder::new(&mut input).decode(&mut roundtrip).unwrap();
        assert_eq!(roundtrip, data);
    }
}
