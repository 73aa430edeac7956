mod client_cmd;
mod config;
mod rate_limit;
mod render;
mod serve_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use config::MealPlanConfig;

#[derive(Parser)]
#[command(name = "mealplan", about = "LLM-backed weekly meal plan service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a mealplan config file
    Init {
        /// Model provider API key
        #[arg(long)]
        api_key: Option<String>,
        /// Model name (e.g. gpt-5-mini)
        #[arg(long)]
        model: Option<String>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides MEALPLAN_BIND and config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides MEALPLAN_PORT and config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Request a meal plan from a running server
    Generate {
        /// Path to a JSON file holding the preferences object
        #[arg(long)]
        preferences: PathBuf,
        /// Server base URL (defaults to the configured bind address and port)
        #[arg(long)]
        server: Option<String>,
        /// Print the plan as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the built-in demo meal plan
    Demo {
        /// Print the plan as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Execute the `mealplan init` command: write config file.
fn cmd_init(api_key: Option<String>, model: Option<String>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut cfg = config::ConfigFile::default();
    cfg.server.bind = Some(config::DEFAULT_BIND.to_string());
    cfg.server.port = Some(config::DEFAULT_PORT);
    cfg.model.name = model;
    cfg.model.api_key = api_key;

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!(
        "  server = {}:{}",
        config::DEFAULT_BIND,
        config::DEFAULT_PORT
    );
    if let Some(name) = &cfg.model.name {
        println!("  model.name = {name}");
    }
    if cfg.model.api_key.is_some() {
        println!("  model.api_key = (set)");
    } else {
        println!("  model.api_key not set; export MEALPLAN_API_KEY or OPENAI_API_KEY");
    }
    println!();
    println!("Next: run `mealplan serve` to start the API server.");

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            api_key,
            model,
            force,
        } => {
            cmd_init(api_key, model, force)?;
        }
        Commands::Serve { bind, port } => {
            let resolved = MealPlanConfig::resolve(bind.as_deref(), port)?;
            serve_cmd::run_serve(&resolved).await?;
        }
        Commands::Generate {
            preferences,
            server,
            json,
        } => {
            let server = match server {
                Some(url) => url,
                None => MealPlanConfig::resolve(None, None)?.server_url(),
            };
            client_cmd::run_generate(&preferences, &server, json).await?;
        }
        Commands::Demo { json } => {
            client_cmd::run_demo(json)?;
        }
    }

    Ok(())
}
