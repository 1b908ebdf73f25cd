mod config;
mod iterations;
mod model;
mod process;
mod reader;
mod server;
mod session;
mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, DEFAULT_PORT, DEFAULT_RALPH_DIR};
use session::SessionStore;
use status::build_status;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ralph-monitor")]
#[command(about = "Read-only HTTP monitor for a running Ralph agent")]
struct Cli {
	/// Port to listen on
	#[arg(long, env = "PORT", default_value_t = DEFAULT_PORT, global = true)]
	port: u16,

	/// Address to bind
	#[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), global = true)]
	host: IpAddr,

	/// Directory the agent runs in; its state lives under `.ralph-tui/`
	#[arg(long, env = "RALPH_DIR", default_value = DEFAULT_RALPH_DIR, global = true)]
	ralph_dir: String,

	/// Static UI bundle served at `/`
	#[arg(long, env = "PUBLIC_DIR", default_value = "public", global = true)]
	public_dir: PathBuf,

	/// Upper bound on each process listing
	#[arg(long, default_value_t = 5, global = true)]
	process_timeout_secs: u64,

	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Run the HTTP server (default)
	Serve,
	/// Print the current status once as JSON
	Status,
}

fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_tracing();

	let cfg = Config::new(
		cli.host,
		cli.port,
		&cli.ralph_dir,
		&cli.public_dir,
		cli.process_timeout_secs,
	)
	.context("invalid configuration")?;

	match cli.command {
		Some(Commands::Status) => {
			let status = build_status(&SessionStore::from_config(&cfg));
			println!("{}", serde_json::to_string_pretty(&status)?);
			Ok(())
		}
		Some(Commands::Serve) | None => server::serve(&cfg).await,
	}
}
