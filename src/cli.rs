// src/cli.rs

use clap::{ArgAction, Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "property_compare")]
#[command(about = "Property comparison and price estimation service")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Copy dataset properties missing from the store into it
    Import,
    /// Merge the raw `JSON 1/2/3.txt` exports into per-property files
    Convert,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Address to listen on
    #[arg(long, global = true, default_value = "127.0.0.1:3000", env = "PROPERTY_BIND")]
    pub bind: SocketAddr,

    /// SQLite file backing the property store
    #[arg(long, global = true, default_value = "properties.sqlite3", env = "PROPERTY_DB")]
    pub db: PathBuf,

    /// Dataset directory containing `properties/` and `property_index.json`
    #[arg(long, global = true, default_value = "dataset", env = "PROPERTY_DATASET")]
    pub dataset: PathBuf,

    /// Endpoint of the remote price model; heuristic pricing when unset
    #[arg(long, global = true, env = "PRICE_MODEL_URL")]
    pub model_url: Option<String>,

    #[arg(long, global = true, default_value_t = 5, env = "PRICE_MODEL_TIMEOUT_SECS")]
    pub model_timeout_secs: u64,

    /// Accept close (not exact) address matches from the dataset
    #[arg(long, global = true, default_value_t = false, action = ArgAction::Set, env = "PROPERTY_FUZZY_MATCH")]
    pub fuzzy_match: bool,

    /// Render comparison charts
    #[arg(long, global = true, default_value_t = true, action = ArgAction::Set, env = "PROPERTY_CHARTS")]
    pub charts: bool,

    /// Copy dataset properties into the store when the server starts
    #[arg(long, global = true, default_value_t = true, action = ArgAction::Set, env = "PROPERTY_SYNC_ON_STARTUP")]
    pub sync_on_startup: bool,

    /// Request worker threads
    #[arg(long, global = true, default_value_t = 8, env = "PROPERTY_WORKERS")]
    pub workers: usize,
}
