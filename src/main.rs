use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use privacy_rs::config::ConfigLoader;
use privacy_rs::logging::init_logging;
use privacy_rs::privacy::{
    PrivacyHandler, PrivacyRequest, RequestType, TableFieldResolver, TableSubjectDirectory,
    UserPrivacyHandler,
};
use privacy_rs::session::TableSessionStore;
use privacy_rs::storage::SqliteRowStore;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "privacy-rs", version)]
#[command(about = "Export, check and erase the personal data held about an account")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "PRIVACY_CONFIG")]
    config: Option<String>,

    /// Database URL, overrides the configured one
    #[arg(long)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every export domain of an account as JSON
    Export {
        subject_id: u64,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Check whether an account may be erased
    CanErase { subject_id: u64 },
    /// Pseudonymize an account and destroy its sessions
    Erase { subject_id: u64 },
    /// Print the effective configuration as TOML
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::new()
        .load_from_file(cli.config.as_deref())
        .load_from_env()
        .build()?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Command::ShowConfig = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }
    let _guard = init_logging(&config.logging)?;

    let rows = Arc::new(
        SqliteRowStore::connect(&config.database.url, config.database.max_connections)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.url))?,
    );
    let directory = Arc::new(TableSubjectDirectory::new(
        rows.clone(),
        &config.tables.users,
        &config.tables.usergroup_map,
        config.eligibility.super_user_groups.clone(),
    ));
    let fields = Arc::new(TableFieldResolver::new(
        rows.clone(),
        &config.tables.fields,
        &config.tables.fields_values,
    ));
    let sessions = Arc::new(TableSessionStore::new(rows.clone(), &config.tables.session));
    let handler = UserPrivacyHandler::from_config(&config, directory, rows, fields, sessions);

    match cli.command {
        Command::Export { subject_id, pretty } => {
            let request = PrivacyRequest::new("cli", Some(subject_id), RequestType::Export);
            let domains = handler.export_request(&request).await?;
            info!(subject_id, domains = domains.len(), "export finished");

            let output = if pretty {
                serde_json::to_string_pretty(&domains)?
            } else {
                serde_json::to_string(&domains)?
            };
            println!("{}", output);
        }
        Command::CanErase { subject_id } => {
            let request = PrivacyRequest::new("cli", Some(subject_id), RequestType::Remove);
            let status = handler.can_remove_data(&request).await?;
            println!("{}", serde_json::to_string(&status)?);
        }
        Command::Erase { subject_id } => {
            let request = PrivacyRequest::new("cli", Some(subject_id), RequestType::Remove);
            let report = handler.remove_data(&request).await?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::ShowConfig => {}
    }

    Ok(())
}
