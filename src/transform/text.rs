//! Text codec ("Text codec"): a one-pass dictionary transform for
//! natural-language text, grounded on
//! kanzi's `TextCodec.cpp`/`.hpp`.
//!
//! The original builds a 256-bucket histogram plus a 2-gram statistic to
//! classify a block as text/binary, matches words against a 1024-entry
//! static English dictionary seeded at startup (`DICT_EN_1024`) plus a
//! dynamic dictionary that grows as the block is scanned, and replaces
//! matched words with an escape byte (`ESCAPE_TOKEN1`/`ESCAPE_TOKEN2`) plus a
//! tiered variable-length index (`THRESHOLD1`/`THRESHOLD2` cutting the index
//! into 1/2/3-byte forms).
//!
//! **Deviations**, each made to keep the transform hand-verifiable without a
//! compiler:
//! - The classifier collapses the original's multi-bit mode mask (full/
//!   almost-full ASCII, XML/HTML, CRLF) down to a single ASCII-printable
//!   ratio threshold plus a CRLF-majority check. Good enough to gate the
//!   transform; not bit-compatible with the original's `MASK_*` constants.
//! - The static dictionary is a much smaller curated list of common English
//!   words rather than a transcription of `DICT_EN_1024`'s 1024 entries —
//!   transcribing that packed, unseparated 1024-word C string by hand risked
//!   silent errors with no way to catch them without running the code. Its
//!   role (a head start before the dynamic dictionary takes over) still
//!   holds with a smaller list.
//! - `ESCAPE_TOKEN2`'s job in the original is toggling the case of a
//!   dictionary word's first letter so `"The"` and `"the"` can share one
//!   dictionary slot. That's dropped: dictionary matching here is plain
//!   exact-byte matching, and `ESCAPE_TOKEN2` only remains as the second
//!   escapable literal byte (kept so a literal `0x0E` in the input still
//!   round-trips).
//! - The index encoding is a tiered scheme in the same spirit as
//!   `THRESHOLD1`/`THRESHOLD2` but not the original's exact bit layout: every
//!   index is tagged with a leading `10` or `11` bit pattern so its first
//!   byte always has the top bit set, which can never collide with a bare
//!   `ESCAPE_TOKEN1`/`ESCAPE_TOKEN2` (`0x0F`/`0x0E`) byte. An index tier that
//!   could start with a byte in `0x00..=0x7F` would make `ESCAPE_TOKEN1`
//!   immediately followed by that byte ambiguous with a doubled literal
//!   escape — the same class of framing bug the RLT transform's field
//!   reorder (see `rlt.rs`) was fixed for.
//! - The dynamic dictionary's capacity is far smaller than the original's
//!   `1 << 19` cap (see [`DYNAMIC_CAP`]) and its hash table is `1 << 16`
//!   slots rather than `1 << 24` (`LOG_HASHES_SIZE`), to keep per-block
//!   memory use modest; eviction is a plain ring buffer (oldest dynamic slot
//!   overwritten first) rather than the original's timestamp-based LRU.

use std::collections::HashMap;

use super::{Transform, TransformError};

const ESCAPE_TOKEN1: u8 = 0x0F;
const ESCAPE_TOKEN2: u8 = 0x0E;
const MAX_WORD_LENGTH: usize = 32;
const DYNAMIC_CAP: usize = 1 << 14;
const LOG_HASHES_SIZE: u32 = 16;
const HASH1: u32 = 0x7FEB352D;
const HASH2: u32 = 0x846CA68B;
const MIN_TEXT_RATIO: f64 = 0.55;

const STATIC_WORDS: &[&str] = &[
    "the", "be", "and", "of", "in", "to", "with", "it", "that", "for", "you", "he", "have", "on",
    "said", "say", "at", "but", "we", "by", "had", "they", "as", "would", "who", "or", "can",
    "may", "do", "this", "was", "is", "much", "any", "from", "not", "she", "what", "their",
    "which", "get", "give", "has", "are", "him", "her", "come", "my", "our", "were", "will",
    "some", "because", "there", "through", "tell", "when", "work", "them", "yet", "up", "own",
    "out", "into", "just", "could", "over", "old", "think", "day", "way", "than", "like", "other",
    "how", "then", "its", "people", "two", "more", "these", "been", "now", "want", "first", "new",
    "use", "see", "time", "man", "many", "thing", "make", "go", "all", "know", "take", "about",
    "if", "no", "so", "one", "look", "also", "after", "back", "good", "only", "year", "should",
    "us", "where", "too", "even", "most", "world", "such", "here", "need", "each", "well", "way",
    "life", "still", "being", "without", "before", "between", "under", "again", "around", "very",
];

fn word_hash(word: &[u8]) -> u32 {
    let mut h = HASH1;
    for &b in word {
        h = h.wrapping_mul(HASH1) ^ (b as u32).wrapping_mul(HASH2);
    }
    h
}

struct Dictionary {
    words: Vec<Vec<u8>>,
    static_len: usize,
    table: Vec<i64>,
    mask: u32,
    next_slot: u32,
}

impl Dictionary {
    fn new() -> Self {
        let mut words: Vec<Vec<u8>> = STATIC_WORDS.iter().map(|w| w.as_bytes().to_vec()).collect();
        let static_len = words.len();
        words.resize(static_len + DYNAMIC_CAP, Vec::new());
        let table = vec![-1i64; 1usize << LOG_HASHES_SIZE];
        let mask = (1u32 << LOG_HASHES_SIZE) - 1;

        let mut dict = Dictionary { words, static_len, table, mask, next_slot: 0 };
        for i in 0..static_len {
            let h = word_hash(&dict.words[i]) & dict.mask;
            dict.table[h as usize] = i as i64;
        }
        dict
    }

    fn lookup(&self, word: &[u8]) -> Option<u32> {
        let h = word_hash(word) & self.mask;
        let idx = self.table[h as usize];
        if idx < 0 {
            return None;
        }
        if self.words[idx as usize] == word {
            Some(idx as u32)
        } else {
            None
        }
    }

    fn insert(&mut self, word: &[u8]) {
        let slot = self.static_len + (self.next_slot as usize % DYNAMIC_CAP);
        self.words[slot] = word.to_vec();
        let h = word_hash(word) & self.mask;
        self.table[h as usize] = slot as i64;
        self.next_slot = self.next_slot.wrapping_add(1);
    }

    fn get(&self, idx: u32) -> Result<&[u8], TransformError> {
        self.words
            .get(idx as usize)
            .map(|w| w.as_slice())
            .filter(|w| !w.is_empty())
            .ok_or_else(|| TransformError::InvalidData("text codec dictionary index out of range".into()))
    }
}

fn classify(src: &[u8]) -> Option<bool> {
    if src.is_empty() {
        return Some(false);
    }
    let mut printable = 0usize;
    let mut crlf_pairs = 0usize;
    let mut lone_lf = 0usize;
    for (i, &b) in src.iter().enumerate() {
        if b == b'\t' || b == b'\n' || b == b'\r' || (0x20..=0x7E).contains(&b) {
            printable += 1;
        }
        if b == b'\n' {
            if i > 0 && src[i - 1] == b'\r' {
                crlf_pairs += 1;
            } else {
                lone_lf += 1;
            }
        }
    }
    let ratio = printable as f64 / src.len() as f64;
    if ratio < MIN_TEXT_RATIO {
        return None;
    }
    Some(crlf_pairs > lone_lf)
}

fn emit_word_index(dst: &mut Vec<u8>, idx: u32) {
    if idx < (1 << 14) {
        dst.push(0x80 | ((idx >> 8) as u8));
        dst.push((idx & 0xFF) as u8);
    } else {
        dst.push(0xC0 | ((idx >> 16) as u8));
        dst.push(((idx >> 8) & 0xFF) as u8);
        dst.push((idx & 0xFF) as u8);
    }
}

fn read_word_index(src: &[u8], pos: &mut usize) -> Result<u32, TransformError> {
    let b0 = *src
        .get(*pos)
        .ok_or_else(|| TransformError::InvalidData("truncated text codec word index".into()))?;
    *pos += 1;
    if b0 & 0xC0 == 0x80 {
        let b1 = *src
            .get(*pos)
            .ok_or_else(|| TransformError::InvalidData("truncated text codec word index".into()))?;
        *pos += 1;
        Ok((((b0 & 0x3F) as u32) << 8) | b1 as u32)
    } else if b0 & 0xC0 == 0xC0 {
        let b1 = *src
            .get(*pos)
            .ok_or_else(|| TransformError::InvalidData("truncated text codec word index".into()))?;
        let b2 = *src
            .get(*pos + 1)
            .ok_or_else(|| TransformError::InvalidData("truncated text codec word index".into()))?;
        *pos += 2;
        Ok((((b0 & 0x3F) as u32) << 16) | ((b1 as u32) << 8) | b2 as u32)
    } else {
        Err(TransformError::InvalidData("malformed text codec word index tag".into()))
    }
}

fn push_literal_byte(dst: &mut Vec<u8>, b: u8) {
    if b == ESCAPE_TOKEN1 || b == ESCAPE_TOKEN2 {
        dst.push(b);
        dst.push(b);
    } else {
        dst.push(b);
    }
}

pub struct TextCodec;

impl TextCodec {
    pub fn new() -> Self {
        TextCodec
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for TextCodec {
    fn max_encoded_len(&self, n: usize) -> usize {
        2 * n + 16
    }

    fn forward(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<bool, TransformError> {
        let crlf = match classify(src) {
            Some(crlf) => crlf,
            None => return Ok(false),
        };

        dst.push(if crlf { 1 } else { 0 });
        let mut dict = Dictionary::new();
        let n = src.len();
        let mut i = 0usize;

        while i < n {
            if src[i].is_ascii_alphabetic() {
                let start = i;
                while i < n && src[i].is_ascii_alphabetic() && i - start < MAX_WORD_LENGTH {
                    i += 1;
                }
                let word = &src[start..i];
                if word.len() >= 2 {
                    if let Some(idx) = dict.lookup(word) {
                        dst.push(ESCAPE_TOKEN1);
                        emit_word_index(dst, idx);
                    } else {
                        dst.extend_from_slice(word);
                        dict.insert(word);
                    }
                } else {
                    dst.extend_from_slice(word);
                }
            } else {
                push_literal_byte(dst, src[i]);
                i += 1;
            }
        }

        if dst.len() >= n {
            dst.clear();
            return Ok(false);
        }
        Ok(true)
    }

    fn inverse(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<(), TransformError> {
        if src.is_empty() {
            return Err(TransformError::InvalidData("text codec payload missing mode byte".into()));
        }
        let mut dict = Dictionary::new();
        let mut pos = 1usize;
        let mut word_buf: Vec<u8> = Vec::new();

        let flush_word = |word_buf: &mut Vec<u8>, dst: &mut Vec<u8>, dict: &mut Dictionary| {
            if !word_buf.is_empty() {
                if word_buf.len() >= 2 && dict.lookup(word_buf).is_none() {
                    dict.insert(word_buf);
                }
                dst.extend_from_slice(word_buf);
                word_buf.clear();
            }
        };

        while pos < src.len() {
            let b = src[pos];
            if b == ESCAPE_TOKEN1 {
                flush_word(&mut word_buf, dst, &mut dict);
                pos += 1;
                if pos < src.len() && src[pos] == ESCAPE_TOKEN1 {
                    dst.push(ESCAPE_TOKEN1);
                    pos += 1;
                    continue;
                }
                let idx = read_word_index(src, &mut pos)?;
                let word = dict.get(idx)?.to_vec();
                dst.extend_from_slice(&word);
            } else if b == ESCAPE_TOKEN2 {
                flush_word(&mut word_buf, dst, &mut dict);
                pos += 1;
                if pos < src.len() && src[pos] == ESCAPE_TOKEN2 {
                    dst.push(ESCAPE_TOKEN2);
                    pos += 1;
                    continue;
                }
                return Err(TransformError::InvalidData("unescaped text codec token byte".into()));
            } else if b.is_ascii_alphabetic() {
                word_buf.push(b);
                pos += 1;
                if word_buf.len() == MAX_WORD_LENGTH {
                    flush_word(&mut word_buf, dst, &mut dict);
                }
            } else {
                flush_word(&mut word_buf, dst, &mut dict);
                dst.push(b);
                pos += 1;
            }
        }
        flush_word(&mut word_buf, dst, &mut dict);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(data: &[u8]) {
        let mut t = TextCodec::new();
        let mut encoded = Vec::new();
        let applied = t.forward(data, &mut encoded).unwrap();
        if !applied {
            return;
        }
        let mut decoded = Vec::new();
        t.inverse(&encoded, &mut decoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trips_repeated_common_words() {
        round_trip(b"the cat and the dog and the bird, said the man, because the cat had the ball");
    }

    #[test]
    fn round_trips_text_with_escape_bytes() {
        let mut data = b"some text with escapes: ".to_vec();
        data.push(0x0F);
        data.push(0x0E);
        data.extend_from_slice(b" and more words repeated words repeated words");
        round_trip(&data);
    }

    #[test]
    fn round_trips_long_word_runs() {
        let long_word = "a".repeat(70);
        let data = format!("{long_word} {long_word} short words here and there");
        round_trip(data.as_bytes());
    }

    #[test]
    fn rejects_binary_input() {
        let data: Vec<u8> = (0..=255u8).cycle().take(512).collect();
        let mut t = TextCodec::new();
        let mut encoded = Vec::new();
        let applied = t.forward(&data, &mut encoded).unwrap();
        assert!(!applied);
    }

    #[test]
    fn round_trips_crlf_text() {
        round_trip(b"line one\r\nline two\r\nline three\r\nrepeated repeated repeated words here");
    }

    #[test]
    fn round_trips_empty_input() {
        let mut t = TextCodec::new();
        let mut encoded = Vec::new();
        let applied = t.forward(b"", &mut encoded).unwrap();
        assert!(!applied);
    }
}
