use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chunkvault",
    about = "chunkvault: chunked upload service and client",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the ingestion server
    Serve(ServeArgs),
    /// Upload a file in chunks
    Upload(UploadArgs),
    /// List stored items
    List(ListArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file; flags below override its values
    #[arg(short, long, env = "CHUNKVAULT_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "CHUNKVAULT_BIND")]
    pub bind: Option<SocketAddr>,
    #[arg(long, env = "CHUNKVAULT_ROOT")]
    pub root: Option<PathBuf>,
    #[arg(long, env = "CHUNKVAULT_MAX_READ")]
    pub max_read: Option<usize>,
    #[arg(long, env = "CHUNKVAULT_MAX_UPLOAD")]
    pub max_upload: Option<usize>,
    /// Largest accepted upload, in bytes
    #[arg(long, env = "CHUNKVAULT_MAX_PAYLOAD")]
    pub max_payload: Option<usize>,
    /// Default per-call deadline in seconds (0 disables it)
    #[arg(long, env = "CHUNKVAULT_CALL_TIMEOUT")]
    pub call_timeout: Option<u64>,
}

#[derive(Args)]
pub struct RemoteArgs {
    #[arg(long, env = "CHUNKVAULT_SERVER", default_value = "http://127.0.0.1:5001")]
    pub server: String,
}

#[derive(Args)]
pub struct UploadArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Stored name (defaults to the file name)
    #[arg(long)]
    pub name: Option<String>,
    /// Content type (defaults to the file extension, e.g. ".png")
    #[arg(long)]
    pub content_type: Option<String>,
    #[arg(long, default_value = "1024", value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: u32,
    /// Call deadline in milliseconds
    #[arg(long, default_value = "5000")]
    pub timeout_ms: u64,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub remote: RemoteArgs,
    /// Write the listing to this file as JSON instead of printing it
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, default_value = "1000")]
    pub timeout_ms: u64,
}
