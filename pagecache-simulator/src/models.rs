// Data models for page cache simulation

use serde::{Deserialize, Serialize};
use std::fmt;

/// One access in a workload trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Page position being accessed
    pub position: u32,
    /// Memory estimate of the page, in quanta
    pub size: u32,
    /// Whether the access modifies the page
    pub write: bool,
}

/// Second-level retention options exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Retention {
    None,
    Weak,
    Soft,
}

impl Retention {
    pub fn to_policy(self) -> pagecache_rs::RetentionPolicy {
        match self {
            Retention::None => pagecache_rs::RetentionPolicy::None,
            Retention::Weak => pagecache_rs::RetentionPolicy::Weak,
            Retention::Soft => pagecache_rs::RetentionPolicy::Soft,
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Retention::None => "none",
            Retention::Weak => "weak",
            Retention::Soft => "soft",
        };
        write!(f, "{name}")
    }
}
