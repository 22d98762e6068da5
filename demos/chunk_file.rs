//! File chunking example.
//!
//! Run with:
//!     cargo run --example chunk_file -- /path/to/file [strategy] [prior_block_size]
//!
//! Set `RUST_LOG=debug` to see the sizes each strategy picks.

use std::env;
use std::fs::File;

use splitrs::{Chunker, DEFAULT_STRATEGY, SizeHint, StrategyRegistry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "Cargo.toml".to_string());
    let strategy = args.next().unwrap_or_else(|| DEFAULT_STRATEGY.to_string());
    let prior: Vec<usize> = args.next().map(|s| s.parse()).transpose()?.into_iter().collect();

    let registry = StrategyRegistry::with_defaults();
    let Some(factory) = registry.resolve(&strategy) else {
        return Err(format!("unknown strategy {:?}, expected one of {:?}", strategy, registry.names()).into());
    };

    println!("Chunking file: {} ({})\n", path, strategy);

    let file = File::open(&path)?;
    let size = file.metadata()?.len();
    println!("File size: {} bytes\n", size);

    let chunker = factory.new_chunker(Box::new(file), SizeHint::Known(size), &prior);
    let hint = chunker.chunk_count_hint();
    if hint.exact {
        println!("Expecting about {} chunks\n", hint.value);
    }

    let mut total_chunks = 0;
    let mut total_bytes = 0;

    for chunk in chunker.chunks() {
        let chunk = chunk?;
        total_chunks += 1;
        total_bytes += chunk.len();

        println!(
            "Chunk {}: offset={:>10}, len={:>8}",
            total_chunks,
            chunk.offset,
            chunk.len()
        );
    }

    println!("\nTotal: {} chunks, {} bytes", total_chunks, total_bytes);
    if total_chunks > 0 {
        println!("Average chunk size: {} bytes", total_bytes / total_chunks);
    }

    Ok(())
}
