#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use postforge::config::Config;
use postforge::gateway;
use postforge::gateway::build_router;
use postforge::providers;
use postforge::providers::registry::ProviderName;
use postforge::providers::traits::ContentRequest;
use tracing_subscriber::{fmt, EnvFilter};

/// `PostForge` - AI-powered social media content generation.
#[derive(Parser, Debug)]
#[command(name = "postforge")]
#[command(version)]
#[command(about = "Multi-provider social media content generation service.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show which AI provider would serve the next request
    Status,

    /// Generate content from the command line
    Generate {
        /// What to post about
        query: String,

        /// Comma-separated platform list
        #[arg(long, default_value = "x,instagram,linkedin")]
        platforms: String,
    },

    /// Generate an image for a prompt
    Image {
        /// Image description
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, config).await
        }
        Commands::Status => {
            let router = build_router(&config);
            let (name, info) = router.active_info()?;
            println!("Active provider: {} ({})", info.display_name, name);
            println!("Free tier: {}", if info.is_free { "yes" } else { "no" });
            if name == ProviderName::Mock {
                println!("No provider credentials found; mock content will be served.");
            }
            println!("\nCredentials:");
            for provider in ProviderName::ALL {
                let Some(var) = providers::credential_env_var(provider) else {
                    continue;
                };
                let state = if providers::resolve_credential(var).is_some() {
                    "set"
                } else {
                    "unset"
                };
                println!("  {provider:<12} {var} ({state})");
            }
            Ok(())
        }
        Commands::Generate { query, platforms } => {
            let platforms: Vec<String> = platforms
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            let router = build_router(&config);
            let request = ContentRequest::new(platforms, query);
            let routed = router.route_content(&request).await?;
            println!("Generated by: {}", routed.provider);
            for suggestion in routed.value {
                println!("\n== {} ==", suggestion.platform);
                println!("{}", suggestion.content);
                if !suggestion.hashtags.is_empty() {
                    println!("{}", suggestion.hashtags.join(" "));
                }
                if let Some(image_prompt) = suggestion.image_prompt {
                    println!("[image: {image_prompt}]");
                }
            }
            Ok(())
        }
        Commands::Image { prompt } => {
            let router = build_router(&config);
            let routed = router.route_image(&prompt).await?;
            println!("Generated by: {}", routed.provider);
            println!("{}", routed.value);
            Ok(())
        }
    }
}
