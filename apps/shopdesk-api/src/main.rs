use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = shopdesk_api::Args::parse();

	shopdesk_api::run(args).await
}
