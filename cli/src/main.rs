use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nav_core::{ClientConfig, LinkUpdate, NavApi, NewLink, Protocol, UploadFile};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "navctl")]
#[command(about = "Talks to a navigation bookmark backend", long_about = None)]
struct Cli {
    /// Backend root, e.g. http://127.0.0.1:3000
    #[arg(long, env = "NAV_BASE_URL")]
    base_url: Option<String>,

    /// Wire protocol: `action` or `sql`
    #[arg(long, env = "NAV_PROTOCOL")]
    protocol: Option<Protocol>,

    #[arg(long, env = "NAV_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the session (including the token)
    Login { username: String, password: String },
    /// Show the user behind the token
    Me,
    /// Resolve a username to its nav user id, creating it if needed
    EnsureUser { username: String },
    Links { user_id: i64 },
    AddLink {
        user_id: i64,
        title: String,
        url: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    UpdateLink {
        id: i64,
        title: String,
        url: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        pinned: bool,
    },
    DeleteLink { id: i64 },
    Pin {
        id: i64,
        #[arg(long)]
        off: bool,
    },
    /// Set link sort order to the order given
    OrderLinks { ids: Vec<i64> },
    Categories { user_id: i64 },
    /// Replace the category order with the order given
    OrderCategories { user_id: i64, categories: Vec<String> },
    Settings { user_id: i64 },
    SetSetting { user_id: i64, key: String, value: String },
    Upload {
        path: PathBuf,
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default()),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "navctl failed");
            std::process::exit(1);
        }
    }
}

/// Environment settings overlaid with the command-line flags.
fn config<F>(cli: &Cli, lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::from_lookup(lookup).context("invalid environment")?;
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url);
    }
    if let Some(protocol) = cli.protocol {
        config = config.with_protocol(protocol);
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<Value> {
    let config = config(&cli, |key| std::env::var(key).ok())?;
    tracing::debug!(base_url = %config.base_url, protocol = %config.protocol, "configured");
    let api = NavApi::new(config);
    let token = cli.token.as_deref();

    let output = match cli.command {
        Command::Login { username, password } => envelope_data(api.login(&username, &password).await?),
        Command::Me => envelope_data(api.get_me(token).await?),
        Command::EnsureUser { username } => json!({"id": api.ensure_nav_user(token, &username).await?}),
        Command::Links { user_id } => serde_json::to_value(api.get_links(token, user_id).await?)?,
        Command::AddLink { user_id, title, url, category, note } => {
            let link = NewLink { title, url, category, note };
            envelope_data(api.add_link(token, user_id, &link).await?)
        }
        Command::UpdateLink { id, title, url, category, note, pinned } => {
            let link = LinkUpdate { title, url, category, note, pinned };
            envelope_data(api.update_link(token, id, &link).await?)
        }
        Command::DeleteLink { id } => envelope_data(api.delete_link(token, id).await?),
        Command::Pin { id, off } => envelope_data(api.toggle_pin(token, id, !off).await?),
        Command::OrderLinks { ids } => {
            api.save_link_order(token, &ids).await?;
            json!({"saved": ids.len()})
        }
        Command::Categories { user_id } => serde_json::to_value(api.get_category_order(token, user_id).await?)?,
        Command::OrderCategories { user_id, categories } => {
            api.save_category_order(token, user_id, &categories).await?;
            json!({"saved": categories.len()})
        }
        Command::Settings { user_id } => serde_json::to_value(api.get_settings(token, user_id).await?)?,
        Command::SetSetting { user_id, key, value } => {
            api.save_settings(token, user_id, [(key, value)]).await?;
            json!({"saved": 1})
        }
        Command::Upload { path, content_type } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload.bin".to_string());
            let mut file = UploadFile::new(name, bytes);
            if let Some(content_type) = content_type {
                file = file.with_content_type(content_type);
            }
            envelope_data(api.upload_file(token, &file).await?)
        }
    };
    Ok(output)
}

fn envelope_data(envelope: nav_core::Envelope) -> Value {
    envelope.data.unwrap_or(Value::Null)
}
