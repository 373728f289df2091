use std::path::PathBuf;

use clap::Parser;

use tinyipfix_listener::ListenerConfig;

#[derive(Parser)]
#[command(name = "tinyipfix-listener", about = "TinyIPFIX collector for tunslip6-bridged sensor networks")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tinyipfix.toml")]
    config: PathBuf,

    /// Replay captured bridge output instead of running the configured command
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File the reports are appended to
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match ListenerConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config from {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    if let Some(input) = cli.input {
        config.listener.command = None;
        config.listener.input = Some(input);
    }
    if let Some(output) = cli.output {
        config.output.path = Some(output);
    }

    // Initialize logging
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tinyipfix_listener::logging::init_json(&config.logging.level);
    } else {
        tinyipfix_listener::logging::init(&config.logging.level);
    }

    if let Err(e) = tinyipfix_listener::run(config).await {
        tracing::error!("listener failed: {e}");
        std::process::exit(1);
    }
}
