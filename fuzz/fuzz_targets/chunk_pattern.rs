#![no_main]

use libfuzzer_sys::fuzz_target;
use splitrs::{Chunker, PatternBoundaryChunker};

fuzz_target!(|input: &[u8]| {
    // First bytes pick the bounds and pattern, the rest is the stream.
    if input.len() < 4 {
        return;
    }
    let min = 1 + input[0] as usize;
    let max = min + input[1] as usize;
    let pattern_len = 1 + (input[2] % 4) as usize;
    let rest = &input[3..];
    if rest.len() < pattern_len {
        return;
    }
    let (pattern, data) = rest.split_at(pattern_len);

    let chunker = PatternBoundaryChunker::new(data, min, max, pattern).unwrap();
    let chunks: Vec<_> = chunker.chunks().collect::<Result<_, _>>().unwrap();

    // Verify: bounds hold for all but the last chunk
    for (i, chunk) in chunks.iter().enumerate() {
        assert!(!chunk.is_empty());
        assert!(chunk.len() <= max);
        if i < chunks.len() - 1 {
            assert!(chunk.len() >= min);
        }
    }

    // Verify: chunks concatenate to the input with contiguous offsets
    let mut expected_offset = 0u64;
    let mut joined = Vec::with_capacity(data.len());
    for chunk in &chunks {
        assert_eq!(chunk.offset, expected_offset);
        expected_offset += chunk.len() as u64;
        joined.extend_from_slice(&chunk.data);
    }
    assert_eq!(joined, data);

    // Verify: the pure decision agrees with the streaming chunker
    let mut rest = data;
    for chunk in &chunks {
        let window = &rest[..rest.len().min(max)];
        let expected = match decide_len(min, max, pattern, window) {
            Some(len) => len,
            None => rest.len(),
        };
        assert_eq!(chunk.len(), expected);
        rest = &rest[expected..];
    }
});

fn decide_len(min: usize, max: usize, pattern: &[u8], window: &[u8]) -> Option<usize> {
    let rule = splitrs::PatternRule::new(min, max, pattern).unwrap();
    match rule.decide(window, false) {
        splitrs::Decision::Emit(len) => Some(len),
        _ => None,
    }
}
