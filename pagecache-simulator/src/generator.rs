// Synthetic workload generation

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::TraceRecord;

/// Parameters for generating a synthetic access trace.
pub struct TraceConfig {
    /// Total number of accesses to generate
    pub requests: u64,
    /// Number of distinct page positions
    pub unique_pages: u32,
    /// Percentage of traffic aimed at the popular pages
    pub popular_traffic_percent: u8,
    /// Percentage of pages considered "popular"
    pub popular_pages_percent: u8,
    /// Minimum page size in quanta
    pub min_size: u32,
    /// Maximum page size in quanta
    pub max_size: u32,
    /// Percentage of accesses that are writes
    pub write_percent: u8,
    /// RNG seed, for reproducible traces
    pub seed: u64,
    /// Output CSV file
    pub output: PathBuf,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            requests: 100_000,
            unique_pages: 10_000,
            popular_traffic_percent: 80,
            popular_pages_percent: 20,
            min_size: 16,
            max_size: 256,
            write_percent: 20,
            seed: 42,
            output: PathBuf::from("trace.csv"),
        }
    }
}

/// Generates a trace to `config.output` and returns the record count.
///
/// Traffic is split between a small popular set and the long tail (the
/// classic 80/20 shape by default). A page keeps the same size every time
/// it is accessed, so replays account memory consistently.
pub fn generate(config: &TraceConfig) -> Result<u64, Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let popular_pages =
        (config.unique_pages * u32::from(config.popular_pages_percent) / 100).max(1);

    let mut writer = csv::Writer::from_writer(File::create(&config.output)?);
    for _ in 0..config.requests {
        let position = if rng.gen_range(0..100) < config.popular_traffic_percent {
            rng.gen_range(0..popular_pages)
        } else {
            rng.gen_range(popular_pages..config.unique_pages.max(popular_pages + 1))
        };
        let record = TraceRecord {
            position,
            size: size_for(position, config),
            write: rng.gen_range(0..100) < config.write_percent,
        };
        writer.serialize(&record)?;
    }
    writer.flush()?;
    Ok(config.requests)
}

/// Deterministic size per position so repeated accesses agree.
fn size_for(position: u32, config: &TraceConfig) -> u32 {
    let span = config.max_size.saturating_sub(config.min_size).max(1);
    config.min_size + (position.wrapping_mul(2_654_435_761) % span)
}

/// Reads a trace back from a CSV file.
pub fn read_trace(path: &Path) -> Result<Vec<TraceRecord>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        let record: TraceRecord = record?;
        records.push(record);
    }
    Ok(records)
}
