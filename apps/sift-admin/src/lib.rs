mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use sift_service::SiftService;
use sift_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = cli::VERSION,
	long_version = cli::LONG_VERSION,
	rename_all = "kebab",
	styles = cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Reports whether the index tables exist and the server is recent enough.
	Check,
	/// Creates or upgrades the index tables.
	Init,
	/// Removes documents from the index.
	Delete(DeleteArgs),
}

#[derive(Debug, clap::Args)]
#[group(required = true, multiple = false)]
pub struct DeleteArgs {
	/// Remove a single document and its files.
	#[arg(long, value_name = "DOCID")]
	pub docid: Option<String>,
	/// Remove every document of one search area.
	#[arg(long, value_name = "AREAID")]
	pub area: Option<String>,
	/// Remove everything.
	#[arg(long)]
	pub all: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;

	init_tracing(&config)?;

	let db = Db::connect(&config.storage.postgres).await?;

	match args.command {
		Command::Init => {
			db.ensure_schema().await?;

			tracing::info!("Index schema is up to date.");
		},
		Command::Check => check(SiftService::new(config, db)).await?,
		Command::Delete(delete) => {
			let service = SiftService::new(config, db);
			let removed = match (delete.docid, delete.area) {
				(Some(docid), _) => service.delete_by_id(&docid).await?,
				(None, Some(area)) => service.delete(Some(&area)).await?,
				(None, None) => service.delete(None).await?,
			};

			println!("{}", serde_json::json!({ "removed": removed }));
		},
	}

	Ok(())
}

async fn check(service: SiftService) -> color_eyre::Result<()> {
	service.ensure_ready().await?;

	let tika = if service.file_indexing_enabled() {
		match sift_providers::tika::version(&service.cfg.file_indexing).await {
			Ok(version) => Some(version),
			Err(err) => {
				return Err(eyre::eyre!("File indexing is enabled but Tika is unreachable: {err}"));
			},
		}
	} else {
		None
	};

	println!(
		"{}",
		serde_json::json!({
			"ready": true,
			"file_indexing": service.file_indexing_enabled(),
			"tika": tika,
		})
	);

	Ok(())
}

fn init_tracing(config: &sift_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	Ok(())
}
