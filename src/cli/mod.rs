use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Time-bounded memoization cache and helpers", long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub subcommand: Runtime,

    /// JSON cache configuration
    #[arg(long, env = "MEMOCALL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, env = "MEMOCALL_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[arg(long, env = "MEMOCALL_LOG_JSON", global = true)]
    pub log_json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Runtime {
    /// Run concurrent memoized calls against a slow function and print stats
    Demo {
        #[arg(long, default_value_t = 8)]
        tasks: usize,

        #[arg(long, default_value_t = 4)]
        calls: usize,

        /// Distinct argument values spread across the calls
        #[arg(long, default_value_t = 3)]
        keys: u64,

        /// Simulated work per computation, in milliseconds
        #[arg(long, default_value_t = 200)]
        work_ms: u64,
    },
    /// Hash a password with bcrypt
    Hash {
        password: String,

        #[arg(long, default_value_t = crate::helpers::password::DEFAULT_COST)]
        cost: u32,
    },
    /// Check a password against a bcrypt hash
    Verify { password: String, hash: String },
    /// Print a random alphanumeric string, or a number when a range is given
    Random {
        #[arg(long, default_value_t = 16)]
        len: usize,

        #[arg(long, requires = "max")]
        min: Option<i64>,

        #[arg(long, requires = "min")]
        max: Option<i64>,
    },
}
