#![no_main]

use libfuzzer_sys::fuzz_target;
use splitrs::{ChunkConfig, Chunker, ContentDefinedChunker};

/// Hands out at most `step` bytes per read.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl std::io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fuzz_target!(|data: &[u8]| {
    // Test with various chunk configurations
    let configs = [
        // Small chunks
        ChunkConfig::new(16, 64, 256).unwrap(),
        // Medium chunks
        ChunkConfig::new(64, 256, 1024).unwrap(),
        // Large chunks
        ChunkConfig::new(256, 4096, 16384).unwrap(),
    ];

    for config in configs {
        let chunker = ContentDefinedChunker::with_config(data, config).unwrap();
        let chunks: Vec<_> = chunker.chunks().collect::<Result<_, _>>().unwrap();

        // Verify: all chunks are within min/max bounds
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(!chunk.is_empty());
            assert!(chunk.len() <= config.max_size());
            // Only enforce min_size for chunks that are not the last one
            if i < chunks.len() - 1 {
                assert!(chunk.len() >= config.min_size());
            }
        }

        // Verify: total bytes match input
        let total_bytes: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total_bytes, data.len());

        // Verify: offsets are correct
        let mut expected_offset = 0u64;
        for chunk in &chunks {
            assert_eq!(chunk.offset, expected_offset);
            expected_offset += chunk.len() as u64;
        }

        // Verify: determinism - small reads produce the same chunks
        let step = 1 + data.first().copied().unwrap_or(0) as usize;
        let reader = Trickle { data, step };
        let chunks2: Vec<_> = ContentDefinedChunker::with_config(reader, config)
            .unwrap()
            .chunks()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(chunks.len(), chunks2.len());
        for (c1, c2) in chunks.iter().zip(chunks2.iter()) {
            assert_eq!(c1.data, c2.data);
            assert_eq!(c1.offset, c2.offset);
        }
    }
});
