use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rosgpt")]
#[command(about = "ROS to OpenAI bridge node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config.json.
    Init {
        /// Config file path (default: ROSGPT_CONFIG_PATH or ~/.rosgpt/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the bridge node: subscribe to the input topic and publish completions on the output topic. Requires OPENAI_API_KEY.
    Run {
        /// Config file path (default: ROSGPT_CONFIG_PATH or ~/.rosgpt/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// rosbridge WebSocket URL (default from config, ROSBRIDGE_URL, or ws://127.0.0.1:9090)
        #[arg(long, short, value_name = "WS_URL")]
        url: Option<String>,
    },

    /// Send one prompt to the completion service and print the reply. Requires OPENAI_API_KEY.
    Ask {
        /// Config file path (default: ROSGPT_CONFIG_PATH or ~/.rosgpt/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Prompt text
        prompt: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run {
        config: None,
        url: None,
    }) {
        Commands::Version => {
            println!("rosgpt {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Init { config } => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Run { config, url } => {
            if let Err(e) = run_node(config, url).await {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Ask { config, prompt } => {
            if let Err(e) = run_ask(config, prompt).await {
                log::error!("ask failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(rosgpt::config::default_config_path);
    let dir = rosgpt::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_node(config_path: Option<PathBuf>, url: Option<String>) -> anyhow::Result<()> {
    let api_key = rosgpt::config::resolve_api_key();
    if api_key.is_none() {
        // Fail before reading config or touching the bus.
        return Err(rosgpt::node::StartupError::MissingCredential.into());
    }
    let (mut config, path) = rosgpt::config::load_config(config_path)?;
    rosgpt::config::apply_env_overrides(&mut config);
    if let Some(u) = url {
        config.bus.url = u;
    }
    log::info!("starting node {} (config {})", config.bus.node_name, path.display());
    rosgpt::node::run_node(config, api_key).await
}

async fn run_ask(config_path: Option<PathBuf>, prompt: String) -> anyhow::Result<()> {
    let (mut config, _) = rosgpt::config::load_config(config_path)?;
    rosgpt::config::apply_env_overrides(&mut config);
    let reply = rosgpt::node::ask(&config, rosgpt::config::resolve_api_key(), &prompt).await?;
    println!("{}", reply);
    Ok(())
}
