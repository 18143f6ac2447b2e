use anyhow::Result;
use clap::Parser;
use grid_reconcile::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    let globals = cli::GlobalArgs {
        config: args.config.clone(),
        overrides: args.overrides.clone(),
    };
    let payload = cli::run_command(args.command, globals).await?;
    cli::output::emit_value(&payload, args.compact, args.quiet)?;
    Ok(())
}
