// Statistics reporting for replay runs

use std::error::Error;
use std::path::Path;

use serde::Serialize;

/// Everything a replay run measured.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStats {
    pub requests: u64,
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub shadow_hits: u64,
    pub evictions: u64,
    pub page_writes: u64,
    pub log_flushes: u64,
    pub eviction_stalls: u64,
    pub final_entries: u64,
    pub final_memory: u64,
}

impl ReplayStats {
    /// Prints a human-readable summary table.
    pub fn print_summary(&self) {
        println!("=== Replay Summary ===");
        println!("{:<20} {:>12}", "requests", self.requests);
        println!("{:<20} {:>12}", "reads", self.reads);
        println!("{:<20} {:>12}", "writes", self.writes);
        println!("{:<20} {:>12}", "cache hits", self.hits);
        println!("{:<20} {:>12}", "cache misses", self.misses);
        println!("{:<20} {:>11.1}%", "hit rate", self.hit_rate * 100.0);
        println!("{:<20} {:>12}", "shadow hits", self.shadow_hits);
        println!("{:<20} {:>12}", "evictions", self.evictions);
        println!("{:<20} {:>12}", "page writes", self.page_writes);
        println!("{:<20} {:>12}", "log flushes", self.log_flushes);
        println!("{:<20} {:>12}", "eviction stalls", self.eviction_stalls);
        println!("{:<20} {:>12}", "final entries", self.final_entries);
        println!("{:<20} {:>12}", "final memory", self.final_memory);
    }

    /// Appends the run to a CSV file (with a header when new).
    pub fn export_csv(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let new_file = !path.exists();
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(new_file)
            .from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;
        Ok(())
    }
}
