use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use dfsql::{ContextConfig, SqlContext};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "dfsql")]
#[command(about = "Run SQL queries over JSON files registered as tables")]
struct Cli {
    /// Register a JSON array file as a table
    #[arg(long = "table", value_name = "NAME=FILE", value_parser = parse_table)]
    tables: Vec<(String, PathBuf)>,

    /// Create a materialized view from a query over the registered tables
    #[arg(long = "view", value_name = "NAME=SQL", value_parser = parse_view)]
    views: Vec<(String, String)>,

    /// Database the tables are registered in
    #[arg(long, default_value = "main")]
    database: String,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Per-query execution limit in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Queries to run, in order
    #[arg(required = true)]
    sql: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

fn parse_table(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    let (name, path) = split_binding(arg)?;
    Ok((name, PathBuf::from(path)))
}

fn parse_view(arg: &str) -> std::result::Result<(String, String), String> {
    split_binding(arg)
}

fn split_binding(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

/// Initialize logging
fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = ContextConfig::new().default_database(&cli.database);
    if let Some(ms) = cli.timeout_ms {
        config = config.query_timeout(Duration::from_millis(ms));
    }
    let ctx = SqlContext::with_config(config).context("Invalid configuration")?;

    for (name, path) in &cli.tables {
        ctx.register_json(name, path)
            .with_context(|| format!("Failed to register table '{}' from '{}'", name, path.display()))?;
    }

    for (name, sql) in &cli.views {
        ctx.create_view(name, sql)
            .await
            .with_context(|| format!("Failed to create view '{}'", name))?;
    }

    info!(tables = ?ctx.list_tables()?, views = ?ctx.list_views()?, "registry ready");

    for sql in &cli.sql {
        let result_set = ctx
            .sql(sql)
            .await
            .with_context(|| format!("Failed to submit query: {}", sql))?;
        let result = result_set
            .get()
            .await
            .with_context(|| format!("Query {} failed", result_set.token()))?;

        match cli.format {
            Format::Table => result.print(),
            Format::Json => {
                let rendered = serde_json::to_string_pretty(&result.to_json())
                    .map_err(|e| anyhow!("Failed to render result: {}", e))?;
                println!("{}", rendered);
            }
        }

        result_set.release().await?;
    }

    Ok(())
}
