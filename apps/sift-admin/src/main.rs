use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sift_admin::Args::parse();

	sift_admin::run(args).await
}
