//! Pattern-boundary chunking.
//!
//! Chunks end right after an occurrence of a fixed byte pattern, as long as
//! that keeps the chunk within `[min_size, max_size]`. Where the pattern
//! does not help, the chunk is cut at exactly `max_size`.
//!
//! The boundary decision is the pure step function [`PatternRule::decide`]
//! over the buffered bytes, so boundaries depend only on content and the
//! rule, never on how the stream happens to deliver its bytes.

use std::io::Read;

use log::{debug, error, trace};
use memchr::memmem::Finder;

use super::{ChunkCountHint, Chunker};
use crate::block_size::{MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, SizeHint};
use crate::buffer::ScanBuffer;
use crate::chunk::Chunk;
use crate::error::ChunkError;
use crate::registry::ChunkerFactory;

/// Pattern used by the `"zeropattern"` strategy: eight zero bytes.
pub const ZERO_PATTERN: [u8; 8] = [0; 8];

/// Outcome of one boundary decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No boundary can be asserted yet; read more bytes.
    NeedMore,
    /// The next chunk is the first `n` buffered bytes.
    Emit(usize),
    /// The stream is exhausted.
    End,
}

/// Chunk bounds plus the byte pattern to cut after.
#[derive(Debug, Clone)]
pub struct PatternRule {
    min_size: usize,
    max_size: usize,
    finder: Finder<'static>,
}

impl PatternRule {
    /// Creates a rule.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if `min_size` is zero, exceeds
    /// `max_size`, or the pattern is empty.
    pub fn new(min_size: usize, max_size: usize, pattern: impl Into<Vec<u8>>) -> Result<Self, ChunkError> {
        let pattern = pattern.into();
        if min_size == 0 {
            return Err(ChunkError::InvalidConfig {
                message: "min_size must be non-zero",
            });
        }
        if min_size > max_size {
            return Err(ChunkError::InvalidConfig {
                message: "min_size cannot be greater than max_size",
            });
        }
        if pattern.is_empty() {
            return Err(ChunkError::InvalidConfig {
                message: "pattern must not be empty",
            });
        }
        Ok(Self::build(min_size, max_size, &pattern))
    }

    fn build(min_size: usize, max_size: usize, pattern: &[u8]) -> Self {
        Self {
            min_size,
            max_size,
            finder: Finder::new(pattern).into_owned(),
        }
    }

    /// Smallest chunk the rule cuts, final chunk excepted.
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Largest chunk the rule cuts.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The byte pattern chunks end after.
    pub fn pattern(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Decides the next boundary for the buffered bytes `data`.
    ///
    /// 1. At end of stream, emit whatever is left, or signal the end.
    /// 2. Below `min_size`, ask for more.
    /// 3. The first pattern occurrence ending at or after `min_size` wins:
    ///    cut right after it, or at `max_size` if it ends later than that.
    /// 4. No such occurrence: cut at `max_size` once that much is buffered,
    ///    otherwise ask for more.
    ///
    /// ```
    /// use splitrs::{Decision, PatternRule};
    ///
    /// let rule = PatternRule::new(4, 8, &b"--"[..])?;
    /// assert_eq!(rule.decide(b"ab--cd--ef", false), Decision::Emit(4));
    /// assert_eq!(rule.decide(b"a--bcd--ef", false), Decision::Emit(8));
    /// assert_eq!(rule.decide(b"abcdef", false), Decision::NeedMore);
    /// assert_eq!(rule.decide(b"abcdef", true), Decision::Emit(6));
    /// assert_eq!(rule.decide(b"", true), Decision::End);
    /// # Ok::<(), splitrs::ChunkError>(())
    /// ```
    pub fn decide(&self, data: &[u8], at_end: bool) -> Decision {
        self.scan(data, at_end, 0).0
    }

    /// [`PatternRule::decide`] with a search start, plus the position a
    /// later call may resume from if more bytes are appended to `data`.
    ///
    /// Resuming is exact: occurrences starting before the returned
    /// position have already been ruled out.
    fn scan(&self, data: &[u8], at_end: bool, from: usize) -> (Decision, usize) {
        if at_end {
            let decision = if data.is_empty() {
                Decision::End
            } else {
                Decision::Emit(data.len())
            };
            return (decision, 0);
        }

        if data.len() < self.min_size {
            return (Decision::NeedMore, from);
        }

        let pattern_len = self.pattern().len();
        let mut offset = from;
        while let Some(idx) = self.finder.find(&data[offset..]) {
            let end = offset + idx + pattern_len;
            if end > self.max_size {
                return (Decision::Emit(self.max_size), 0);
            }
            if end >= self.min_size {
                return (Decision::Emit(end), 0);
            }
            offset = end;
        }

        if data.len() >= self.max_size {
            return (Decision::Emit(self.max_size), 0);
        }

        // A match may still straddle the current end of the buffer.
        let resume = offset.max((data.len() + 1).saturating_sub(pattern_len));
        (Decision::NeedMore, resume)
    }
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.min_size == other.min_size && self.max_size == other.max_size && self.pattern() == other.pattern()
    }
}

impl Eq for PatternRule {}

/// Splits a stream after occurrences of a byte pattern, within size
/// bounds.
///
/// The look-ahead buffer never holds more than `max_size` bytes.
///
/// # Example
///
/// ```
/// use splitrs::{Chunker, PatternBoundaryChunker};
///
/// let data = b"this is some-*- data with a-*- few-*- break-*- patterns in-*- between";
/// let chunker = PatternBoundaryChunker::new(&data[..], 10, 20, &b"-*-"[..])?;
///
/// let lens: Vec<usize> = chunker.chunks().map(|c| c.map(|c| c.len())).collect::<Result<_, _>>()?;
/// assert_eq!(lens, [15, 15, 16, 15, 8]);
/// # Ok::<(), splitrs::ChunkError>(())
/// ```
#[derive(Debug)]
pub struct PatternBoundaryChunker<R> {
    reader: R,
    rule: PatternRule,
    buffer: ScanBuffer,
    /// Search start for the next scan of the current buffer.
    resume: usize,
    offset: u64,
    at_end: bool,
}

impl<R: Read> PatternBoundaryChunker<R> {
    /// Creates a chunker with explicit bounds and pattern.
    ///
    /// # Errors
    ///
    /// See [`PatternRule::new`].
    pub fn new(reader: R, min_size: usize, max_size: usize, pattern: impl Into<Vec<u8>>) -> Result<Self, ChunkError> {
        Ok(Self::with_rule(reader, PatternRule::new(min_size, max_size, pattern)?))
    }

    /// Creates a chunker from an existing rule.
    pub fn with_rule(reader: R, rule: PatternRule) -> Self {
        debug!(
            "pattern chunker: min={} max={} pattern_len={}",
            rule.min_size,
            rule.max_size,
            rule.pattern().len()
        );

        Self {
            reader,
            buffer: ScanBuffer::with_capacity(rule.max_size),
            rule,
            resume: 0,
            offset: 0,
            at_end: false,
        }
    }

    /// Creates the `"zeropattern"` chunker: cut after eight zero bytes,
    /// within the protocol block size range.
    pub fn zero_pattern(reader: R) -> Self {
        Self::with_rule(reader, PatternRule::build(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, &ZERO_PATTERN))
    }

    /// Returns the boundary rule.
    pub fn rule(&self) -> &PatternRule {
        &self.rule
    }

    /// Returns the stream position of the next chunk.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl<R: Read> Chunker for PatternBoundaryChunker<R> {
    fn chunk_count_hint(&self) -> ChunkCountHint {
        ChunkCountHint::UNKNOWN
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>, ChunkError> {
        loop {
            let (decision, resume) = self.rule.scan(self.buffer.as_slice(), self.at_end, self.resume);
            self.resume = resume;

            match decision {
                Decision::End => return Ok(None),
                Decision::Emit(len) => {
                    let chunk = Chunk::new(self.buffer.split_to(len), self.offset);
                    self.offset += len as u64;
                    trace!("pattern chunk: {}", chunk);
                    return Ok(Some(chunk));
                }
                Decision::NeedMore => {
                    if self.buffer.is_full() {
                        error!(
                            "pattern chunker cannot decide with {} bytes buffered (max {}); bounds are misconfigured",
                            self.buffer.len(),
                            self.buffer.capacity()
                        );
                        return Err(ChunkError::BufferExhausted {
                            buffered: self.buffer.len(),
                            max: self.buffer.capacity(),
                        });
                    }
                    if self.buffer.fill(&mut self.reader)? == 0 {
                        self.at_end = true;
                    }
                }
            }
        }
    }
}

/// Factory for the `"zeropattern"` strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPatternFactory;

impl ChunkerFactory for ZeroPatternFactory {
    fn new_chunker<'a>(
        &self,
        reader: Box<dyn Read + 'a>,
        _size: SizeHint,
        _prior_sizes: &[usize],
    ) -> Box<dyn Chunker + 'a> {
        Box::new(PatternBoundaryChunker::zero_pattern(reader))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    const SAMPLE: &[u8] = b"this is some-*- data with a-*- few-*- break-*- patterns in-*- between";

    /// Delivers at most `step` bytes per read.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn split<R: Read>(chunker: PatternBoundaryChunker<R>) -> Vec<Vec<u8>> {
        chunker
            .chunks()
            .map(|c| c.unwrap().data.to_vec())
            .collect()
    }

    /// Chunk lengths when each decision sees the whole window at once.
    fn split_by_decide(rule: &PatternRule, data: &[u8]) -> Vec<usize> {
        let mut lens = Vec::new();
        let mut rest = data;
        while !rest.is_empty() {
            let window = &rest[..rest.len().min(rule.max_size())];
            let len = match rule.decide(window, false) {
                Decision::Emit(len) => len,
                _ => rest.len(),
            };
            lens.push(len);
            rest = &rest[len..];
        }
        lens
    }

    #[test]
    fn test_sample_boundaries() {
        let chunks = split(PatternBoundaryChunker::new(SAMPLE, 10, 20, &b"-*-"[..]).unwrap());

        let expected: [&[u8]; 5] = [
            b"this is some-*-",
            b" data with a-*-",
            b" few-*- break-*-",
            b" patterns in-*-",
            b" between",
        ];
        assert_eq!(chunks, expected);
    }

    #[test]
    fn test_sample_boundaries_independent_of_read_size() {
        let reference = split(PatternBoundaryChunker::new(SAMPLE, 10, 20, &b"-*-"[..]).unwrap());

        for step in [1, 2, 3, 5, 7, 11, 64] {
            let reader = Trickle { data: SAMPLE, step };
            let chunks = split(PatternBoundaryChunker::new(reader, 10, 20, &b"-*-"[..]).unwrap());
            assert_eq!(chunks, reference, "read size {}", step);
        }
    }

    #[test]
    fn test_no_pattern_forces_max_cuts() {
        let data = [b'x'; 50];
        let chunks = split(PatternBoundaryChunker::new(&data[..], 10, 20, &b"-*-"[..]).unwrap());
        let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(lens, [20, 20, 10]);
    }

    #[test]
    fn test_pattern_past_max_is_ignored() {
        let mut data = vec![b'a'; 25];
        data.extend_from_slice(b"-*-");
        let chunks = split(PatternBoundaryChunker::new(&data[..], 10, 20, &b"-*-"[..]).unwrap());
        let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(lens, [20, 8]);
    }

    #[test]
    fn test_pattern_before_min_is_skipped() {
        let data = b"ab-*-cdefgh-*-ijklmnop";
        let chunks = split(PatternBoundaryChunker::new(&data[..], 10, 20, &b"-*-"[..]).unwrap());
        assert_eq!(chunks[0], b"ab-*-cdefgh-*-");
        assert_eq!(chunks[1], b"ijklmnop");
    }

    #[test]
    fn test_final_chunk_may_be_below_min() {
        let data = b"0123456789-*-abc";
        let chunks = split(PatternBoundaryChunker::new(&data[..], 10, 20, &b"-*-"[..]).unwrap());
        assert_eq!(chunks, [b"0123456789-*-".to_vec(), b"abc".to_vec()]);
    }

    #[test]
    fn test_empty_stream() {
        let mut chunker = PatternBoundaryChunker::new(&b""[..], 10, 20, &b"-*-"[..]).unwrap();
        assert!(chunker.next_chunk().unwrap().is_none());
        assert!(chunker.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_overlapping_pattern_occurrences() {
        // "aa" in "aaaa...": occurrences are taken left to right without
        // overlap, so the first one ending at or past min_size is at 4.
        let rule = PatternRule::new(3, 10, &b"aa"[..]).unwrap();
        assert_eq!(rule.decide(b"aaaaaaa", false), Decision::Emit(4));
    }

    #[test]
    fn test_decide_steps() {
        let rule = PatternRule::new(10, 20, &b"-*-"[..]).unwrap();

        assert_eq!(rule.decide(b"", true), Decision::End);
        assert_eq!(rule.decide(b"abc", true), Decision::Emit(3));
        assert_eq!(rule.decide(b"abc", false), Decision::NeedMore);
        assert_eq!(rule.decide(b"0123456789ab-*-", false), Decision::Emit(15));
        assert_eq!(rule.decide(b"0123456789abcdef", false), Decision::NeedMore);
        assert_eq!(rule.decide(&[b'z'; 20], false), Decision::Emit(20));
        assert_eq!(rule.decide(&[b'z'; 30], false), Decision::Emit(20));
    }

    #[test]
    fn test_decide_rejects_late_pattern_in_oversized_buffer() {
        let rule = PatternRule::new(10, 20, &b"-*-"[..]).unwrap();
        let mut data = vec![b'q'; 22];
        data.extend_from_slice(b"-*-");
        assert_eq!(rule.decide(&data, false), Decision::Emit(20));
    }

    #[test]
    fn test_resumed_scan_matches_fresh_scan() {
        let mut state = 7u32;
        let data: Vec<u8> = (0..5000)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                // Small alphabet so the pattern shows up often.
                b"ab"[(state >> 16) as usize % 2]
            })
            .collect();
        let rule = PatternRule::new(16, 64, &b"abba"[..]).unwrap();

        let expected = split_by_decide(&rule, &data);
        for step in [1, 3, 17, 100] {
            let reader = Trickle { data: &data, step };
            let lens: Vec<usize> = split(PatternBoundaryChunker::with_rule(reader, rule.clone()))
                .iter()
                .map(Vec::len)
                .collect();
            assert_eq!(lens, expected, "read size {}", step);
        }
    }

    #[test]
    fn test_bounds_hold_for_all_but_last() {
        let data: Vec<u8> = (0..3000u32).map(|i| if i % 37 < 3 { 0 } else { i as u8 | 1 }).collect();
        let chunks = split(PatternBoundaryChunker::new(Cursor::new(&data), 24, 100, &[0u8, 0, 0][..]).unwrap());

        let (last, rest) = chunks.split_last().unwrap();
        for chunk in rest {
            assert!((24..=100).contains(&chunk.len()), "chunk of {}", chunk.len());
        }
        assert!(!last.is_empty() && last.len() <= 100);
        assert_eq!(chunks.concat(), data);
    }

    #[test]
    fn test_invalid_rules() {
        assert!(PatternRule::new(0, 10, &b"x"[..]).is_err());
        assert!(PatternRule::new(11, 10, &b"x"[..]).is_err());
        assert!(PatternRule::new(1, 10, Vec::new()).is_err());
    }

    #[test]
    fn test_read_error_keeps_buffered_data() {
        struct FailAfter<'a> {
            data: &'a [u8],
        }
        impl Read for FailAfter<'_> {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.data.is_empty() {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "cable cut"));
                }
                let n = buf.len().min(self.data.len());
                buf[..n].copy_from_slice(&self.data[..n]);
                self.data = &self.data[n..];
                Ok(n)
            }
        }

        let reader = FailAfter { data: b"0123456789abc" };
        let mut chunker = PatternBoundaryChunker::new(reader, 10, 20, &b"-*-"[..]).unwrap();

        match chunker.next_chunk() {
            Err(ChunkError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected io error, got {:?}", other),
        }
        assert_eq!(chunker.offset(), 0);
    }

    #[test]
    fn test_zero_pattern_rule() {
        let chunker = PatternBoundaryChunker::zero_pattern(io::empty());
        assert_eq!(chunker.rule().pattern(), &ZERO_PATTERN);
        assert_eq!(chunker.rule().min_size(), MIN_BLOCK_SIZE);
        assert_eq!(chunker.rule().max_size(), MAX_BLOCK_SIZE);
    }

    #[test]
    fn test_zero_pattern_rule_equals_built_rule() {
        let chunker = PatternBoundaryChunker::zero_pattern(io::empty());
        let built = PatternRule::new(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, ZERO_PATTERN.to_vec()).unwrap();
        assert_eq!(chunker.rule(), &built);
        assert_eq!(chunker.rule().clone(), built);
        assert_ne!(built, PatternRule::new(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, &b"\0"[..]).unwrap());
    }

    #[test]
    fn test_late_pattern_in_large_window() {
        let max = 4 * 1024 * 1024;
        let rule = PatternRule::new(1024, max, &b"-*-"[..]).unwrap();

        let mut data = vec![b'x'; max - 3];
        data.extend_from_slice(b"-*-");
        assert_eq!(rule.decide(&data, false), Decision::Emit(max));

        data[max / 2..max / 2 + 3].copy_from_slice(b"-*-");
        assert_eq!(rule.decide(&data, false), Decision::Emit(max / 2 + 3));
    }

    #[test]
    fn test_pattern_longer_than_window() {
        let rule = PatternRule::new(2, 64, vec![0xabu8; 32]).unwrap();
        assert_eq!(rule.pattern().len(), 32);
        assert_eq!(rule.decide(&[0xab; 16], false), Decision::NeedMore);
        assert_eq!(rule.decide(&[0xab; 16], true), Decision::Emit(16));

        let chunker = PatternBoundaryChunker::with_rule(&[0xabu8; 40][..], rule);
        let lens: Vec<usize> = split(chunker).iter().map(Vec::len).collect();
        assert_eq!(lens, vec![32, 8]);
    }
}
