use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = riffle_api::Args::parse();
	riffle_api::run(args).await
}
