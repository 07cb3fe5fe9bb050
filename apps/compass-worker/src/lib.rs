pub mod worker;

use std::path::PathBuf;

use clap::Parser;

use compass_service::CompassService;
use compass_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = compass_cli::VERSION,
	rename_all = "kebab",
	styles = compass_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = compass_config::load(&args.config)?;

	compass_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let service = CompassService::new(config, db)?;

	worker::run_worker(&service).await
}
