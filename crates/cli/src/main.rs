use clap::Parser;
use gateway_cli::{completions, interactive, oneshot, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Subscribe { channel, cursor }) => {
            oneshot::subscribe(&cli.url, &channel, cursor).await?;
        }
        Some(Commands::Completions { shell }) => {
            completions::generate(shell);
        }
        Some(Commands::Interactive) | None => {
            interactive::run(&cli.url).await?;
        }
    }

    Ok(())
}
