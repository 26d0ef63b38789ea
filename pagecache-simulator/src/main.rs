use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod generator;
mod models;
mod runner;
mod stats;

use generator::TraceConfig;
use models::Retention;
use runner::ReplayConfig;

/// Page cache simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay an access trace against the page cache
    Simulate {
        /// Trace CSV produced by `generate` (position,size,write)
        #[arg(short, long, value_name = "FILE")]
        trace: PathBuf,

        /// Cache budget in quanta
        #[arg(short, long, default_value = "1048576")]
        max_memory: u64,

        /// Entry floor during eviction
        #[arg(long, default_value = "16")]
        min_records: usize,

        /// Second-level retention for evicted clean pages
        #[arg(long, value_enum, default_value_t = Retention::None)]
        retention: Retention,

        /// Append the run's results to a CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },

    /// Generate a random access trace
    Generate {
        /// Number of accesses
        #[arg(long, default_value = "100000")]
        requests: u64,

        /// Number of distinct page positions
        #[arg(long, default_value = "10000")]
        pages: u32,

        /// Percentage of traffic aimed at the popular pages (default: 80%)
        #[arg(long, default_value = "80")]
        popular_traffic: u8,

        /// Percentage of pages that are popular (default: 20%)
        #[arg(long, default_value = "20")]
        popular_pages: u8,

        /// Minimum page size in quanta
        #[arg(long, default_value = "16")]
        min_size: u32,

        /// Maximum page size in quanta
        #[arg(long, default_value = "256")]
        max_size: u32,

        /// Percentage of accesses that are writes
        #[arg(long, default_value = "20")]
        writes: u8,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output trace file
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            requests,
            pages,
            popular_traffic,
            popular_pages,
            min_size,
            max_size,
            writes,
            seed,
            output,
        } => {
            let config = TraceConfig {
                requests,
                unique_pages: pages,
                popular_traffic_percent: popular_traffic,
                popular_pages_percent: popular_pages,
                min_size,
                max_size,
                write_percent: writes,
                seed,
                output,
            };
            let written = generator::generate(&config)?;
            println!("generated {written} accesses to {}", config.output.display());
        }

        Commands::Simulate {
            trace,
            max_memory,
            min_records,
            retention,
            output_csv,
        } => {
            let records = generator::read_trace(&trace)?;
            println!(
                "replaying {} accesses (budget {max_memory} quanta, retention {retention})",
                records.len()
            );
            let stats = runner::replay(
                &records,
                &ReplayConfig {
                    max_memory,
                    min_records,
                    retention: retention.to_policy(),
                },
            )?;
            stats.print_summary();
            if let Some(path) = output_csv {
                stats.export_csv(&path)?;
                println!("results appended to {}", path.display());
            }
        }
    }

    Ok(())
}
