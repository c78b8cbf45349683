//! `annodb query`: fetch by id, genealogical traversal, region lookup.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::common::cli::OutputFormat;
use crate::feature::Feature;
use crate::query;
use crate::store::keys::Level;
use crate::store::Store;

#[derive(Parser, Debug)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
    /// Output format: one JSON object per line, or the record's own
    /// dialect.
    #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub out_format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one feature by id.
    Id {
        #[arg(long)]
        path_rocksdb: PathBuf,
        #[arg(long)]
        id: String,
    },
    /// Fetch the direct or transitive children of a feature.
    Children {
        #[arg(long)]
        path_rocksdb: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
    },
    /// Fetch the direct or transitive parents of a feature.
    Parents {
        #[arg(long)]
        path_rocksdb: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long, default_value_t = 1)]
        level: u8,
    },
    /// Fetch every feature overlapping a region.
    Region {
        #[arg(long)]
        path_rocksdb: PathBuf,
        #[arg(long)]
        seqid: String,
        #[arg(long)]
        start: i64,
        #[arg(long)]
        end: i64,
    },
}

fn level_from_u8(level: u8) -> Result<Level, anyhow::Error> {
    match level {
        1 => Ok(Level::Direct),
        2 => Ok(Level::Transitive),
        other => Err(anyhow::anyhow!("--level must be 1 or 2, got {other}")),
    }
}

fn print_features(features: &[Feature], out_format: OutputFormat) -> Result<(), anyhow::Error> {
    for feature in features {
        match out_format {
            OutputFormat::Jsonl => println!("{}", serde_json::to_string(feature)?),
            OutputFormat::Native => println!("{}", feature.to_line()),
        }
    }
    Ok(())
}

pub fn run(args: &Args) -> Result<(), anyhow::Error> {
    match &args.command {
        Command::Id { path_rocksdb, id } => {
            let store = open(path_rocksdb)?;
            let feature = query::by_id(&store, id)?;
            print_features(std::slice::from_ref(&feature), args.out_format)?;
        }
        Command::Children { path_rocksdb, id, level } => {
            let store = open(path_rocksdb)?;
            let features = query::children(&store, id, level_from_u8(*level)?)?;
            print_features(&features, args.out_format)?;
        }
        Command::Parents { path_rocksdb, id, level } => {
            let store = open(path_rocksdb)?;
            let features = query::parents(&store, id, level_from_u8(*level)?)?;
            print_features(&features, args.out_format)?;
        }
        Command::Region { path_rocksdb, seqid, start, end } => {
            let store = open(path_rocksdb)?;
            let features = query::region(&store, seqid, *start, *end)?;
            print_features(&features, args.out_format)?;
        }
    }
    Ok(())
}

fn open(path: &PathBuf) -> Result<Store, anyhow::Error> {
    Store::open_for_read(path).with_context(|| format!("opening store at {}", path.display()))
}
