//! lsmlite CLI
//!
//! Command-line interface operating directly on a local data directory.

use clap::{Parser, Subcommand, ValueEnum};
use lsmlite::{Config, Engine, WalSyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// lsmlite CLI
#[derive(Parser, Debug)]
#[command(name = "lsmlite-cli")]
#[command(about = "CLI for the lsmlite embedded LSM key-value engine")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./lsmlite_data")]
    data_dir: String,

    /// MemTable flush threshold in bytes
    #[arg(short, long, default_value = "4096")]
    flush_threshold: usize,

    /// SSTable count above which all tables are compacted into one
    #[arg(short, long, default_value = "5")]
    max_sstables: usize,

    /// WAL fsync policy
    #[arg(short, long, value_enum, default_value = "every-n")]
    sync: SyncArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncArg {
    /// fsync after every put
    EveryWrite,
    /// fsync after every 100 puts
    EveryN,
    /// leave syncing to the OS
    Os,
}

impl From<SyncArg> for WalSyncStrategy {
    fn from(arg: SyncArg) -> Self {
        match arg {
            SyncArg::EveryWrite => WalSyncStrategy::EveryWrite,
            SyncArg::EveryN => WalSyncStrategy::EveryNEntries { count: 100 },
            SyncArg::Os => WalSyncStrategy::OsBuffered,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Insert `count` sequential keys (`<prefix>-00`, `<prefix>-01`, ...)
    Load {
        /// Number of keys to insert
        count: usize,

        /// Key prefix
        #[arg(short, long, default_value = "key")]
        prefix: String,
    },

    /// Flush the MemTable to a new SSTable
    Flush,

    /// Merge all SSTables into one
    Compact,

    /// Print engine statistics
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lsmlite=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> lsmlite::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .flush_threshold(args.flush_threshold)
        .max_sstables(args.max_sstables)
        .wal_sync_strategy(args.sync.into())
        .build();

    let engine = Engine::open(config)?;

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Load { count, prefix } => {
            let width = count.saturating_sub(1).to_string().len().max(2);
            for i in 0..count {
                let key = format!("{}-{:0width$}", prefix, i, width = width);
                let value = format!("value-{}", i);
                engine.put(key.as_bytes(), value.as_bytes())?;
            }
            println!("Loaded {} keys", count);
        }
        Commands::Flush => {
            engine.flush()?;
            println!("OK");
        }
        Commands::Compact => match engine.compact()? {
            Some(report) => println!(
                "Merged {} tables into 1 ({} keys)",
                report.inputs, report.merged_entries
            ),
            None => println!("Nothing to compact"),
        },
        Commands::Stats => {
            println!("data_dir:       {}", engine.data_dir().display());
            println!("memtable_keys:  {}", engine.memtable_len());
            println!("memtable_bytes: {}", engine.memtable_size());
            println!("sstables:       {}", engine.sstable_count());
            for path in engine.sstable_paths() {
                println!("  {}", path.display());
            }
        }
    }

    engine.close()
}
