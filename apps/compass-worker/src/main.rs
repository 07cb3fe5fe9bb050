use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = compass_worker::Args::parse();

	compass_worker::run(args).await
}
