//! CLI tool for inspecting and editing files through the medium store.
//!
//! Provides commands for:
//! - Hex dumps of file ranges through the region cache
//! - Inserting, removing and replacing bytes with a bounded-I/O flush

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use medium_core::{FileAccessor, MediumConfig, MediumError, MediumStore};
use tracing_subscriber::EnvFilter;

/// Bytes shown per hex dump line
const DUMP_LINE_WIDTH: usize = 16;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding medium configuration values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum size of a single read or write in bytes
    #[arg(long, global = true)]
    block_size: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a hex dump of a byte range
    Dump {
        file: PathBuf,

        /// First byte to dump
        #[arg(short, long, default_value_t = 0)]
        offset: u64,

        /// Number of bytes to dump
        #[arg(short, long, default_value_t = 256)]
        length: u64,
    },

    /// Insert bytes before the given offset
    Insert {
        file: PathBuf,

        #[arg(short, long)]
        offset: u64,

        /// Inserted bytes as hex digits
        #[arg(long)]
        hex: String,
    },

    /// Remove a byte range
    Remove {
        file: PathBuf,

        #[arg(short, long)]
        offset: u64,

        #[arg(short, long)]
        length: u64,
    },

    /// Replace a byte range by other bytes
    Replace {
        file: PathBuf,

        #[arg(short, long)]
        offset: u64,

        /// Number of replaced bytes
        #[arg(short, long)]
        length: u64,

        /// Replacement bytes as hex digits, empty to drop the range
        #[arg(long, default_value = "")]
        hex: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let output = run(cli)?;
    print!("{}", output);
    Ok(())
}

/// Executes one command and returns its console output.
fn run(cli: Cli) -> anyhow::Result<String> {
    let config = load_config(cli.config.as_deref(), cli.block_size)?;

    match cli.command {
        Commands::Dump {
            file,
            offset,
            length,
        } => dump(&file, config, offset, length),
        Commands::Insert { file, offset, hex } => {
            let bytes = decode_hex(&hex)?;
            if bytes.is_empty() {
                bail!("No bytes to insert");
            }
            edit(&file, config, |store| {
                let at = store.create_offset(offset)?;
                store.insert_data(at, bytes).map(|_| ())
            })
        }
        Commands::Remove {
            file,
            offset,
            length,
        } => edit(&file, config, |store| {
            let at = store.create_offset(offset)?;
            store.remove_data(at, length).map(|_| ())
        }),
        Commands::Replace {
            file,
            offset,
            length,
            hex,
        } => {
            let bytes = decode_hex(&hex)?;
            edit(&file, config, |store| {
                let at = store.create_offset(offset)?;
                store.replace_data(at, length, bytes).map(|_| ())
            })
        }
    }
}

fn load_config(path: Option<&Path>, block_size: Option<u64>) -> anyhow::Result<MediumConfig> {
    let mut config = match path {
        Some(path) => MediumConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => MediumConfig::default(),
    };
    if let Some(block_size) = block_size {
        config.max_read_write_block_size = block_size;
    }
    config.validate()?;
    Ok(config)
}

fn decode_hex(digits: &str) -> anyhow::Result<Vec<u8>> {
    hex::decode(digits.trim()).with_context(|| format!("Invalid hex data {:?}", digits))
}

fn open_store(file: &Path, config: MediumConfig, read_only: bool) -> anyhow::Result<MediumStore<FileAccessor>> {
    let mut store = MediumStore::new(FileAccessor::new(file, read_only), config)?;
    store
        .open()
        .with_context(|| format!("Failed to open {}", file.display()))?;
    Ok(store)
}

fn dump(file: &Path, config: MediumConfig, offset: u64, length: u64) -> anyhow::Result<String> {
    let mut store = open_store(file, config, true)?;
    let start = store.create_offset(offset)?;

    let (bytes, short_read) = match store.get_data(start, length) {
        Ok(bytes) => (bytes, false),
        Err(MediumError::EndOfMedium { partial, .. }) => (partial, true),
        Err(e) => return Err(e.into()),
    };
    store.close()?;

    let mut output = String::new();
    for (i, line) in bytes.chunks(DUMP_LINE_WIDTH).enumerate() {
        let address = offset + (i * DUMP_LINE_WIDTH) as u64;
        output.push_str(&format!("{:08x}  {}\n", address, hex::encode(line)));
    }
    if short_read {
        output.push_str(&format!(
            "-- end of medium after {} of {} bytes\n",
            bytes.len(),
            length
        ));
    }
    Ok(output)
}

fn edit<F>(file: &Path, config: MediumConfig, schedule: F) -> anyhow::Result<String>
where
    F: FnOnce(&mut MediumStore<FileAccessor>) -> Result<(), MediumError>,
{
    let mut store = open_store(file, config, false)?;
    let old_length = store.medium_length()?;

    schedule(&mut store).context("Failed to schedule edit")?;
    let flushed = store
        .flush()
        .with_context(|| format!("Failed to flush {}", file.display()))?;
    let new_length = store.medium_length()?;
    store.close()?;

    tracing::info!("Flushed {} edit(s) to {}", flushed.len(), file.display());
    Ok(format!(
        "flushed {} edit(s), length {} -> {}\n",
        flushed.len(),
        old_length,
        new_length
    ))
}
