//! analyst — plain-language questions over a local SQLite database.
//!
//! Usage:
//!   analyst seed               Create and fill the demo database
//!   analyst ask "question"     One question, one answer
//!   analyst chat               Interactive session
//!   analyst schema             Print the live schema
//!   analyst query "SQL"        Run one read-only statement
//!   analyst init               Write a default config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncBufReadExt;

use pocket_analyst::agent;
use pocket_analyst::config::{self, AnalystConfig};
use pocket_analyst::db::{self, seed, QueryExecutor, SchemaInspector};
use pocket_analyst::runtime::RuntimeClient;
use pocket_analyst::tools::ToolContext;
use pocket_analyst::types::{ChatRole, CycleReport};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "analyst")]
#[command(version = "0.1.0")]
#[command(about = "Ask a local model questions about a local SQLite database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the analyst home directory (default: ~/.pocket-analyst).
    #[arg(long)]
    home: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question and print the answer.
    Ask {
        /// The question, in plain language.
        question: String,

        /// Model override for this invocation.
        #[arg(long)]
        model: Option<String>,

        /// Runtime URL override for this invocation.
        #[arg(long)]
        runtime_url: Option<String>,

        /// Print the tool trace after the answer.
        #[arg(long)]
        trace: bool,
    },

    /// Start an interactive question/answer session.
    Chat {
        /// Model override for this invocation.
        #[arg(long)]
        model: Option<String>,

        /// Runtime URL override for this invocation.
        #[arg(long)]
        runtime_url: Option<String>,
    },

    /// Create and populate the demo payments database.
    Seed {
        /// Number of demo transactions to insert.
        #[arg(long, default_value_t = seed::DEFAULT_ROWS)]
        rows: usize,
    },

    /// Print the live schema snapshot.
    Schema,

    /// Run one read-only SQL statement and print the rows.
    Query {
        /// A single SELECT statement.
        sql: String,
    },

    /// Write a default config file for editing.
    Init,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = match cli.home.as_deref() {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let config_path = home_dir.join("analyst.toml");
    let config = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging (CLI flag wins over the config file)
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask {
            question,
            model,
            runtime_url,
            trace,
        } => cmd_ask(with_overrides(config, model, runtime_url), &question, trace).await,
        Commands::Chat { model, runtime_url } => {
            cmd_chat(with_overrides(config, model, runtime_url)).await
        }
        Commands::Seed { rows } => cmd_seed(&config, rows),
        Commands::Schema => cmd_schema(&config).await,
        Commands::Query { sql } => cmd_query(&config, &sql).await,
        Commands::Init => cmd_init(&config, &config_path),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_ask(config: AnalystConfig, question: &str, trace: bool) -> Result<()> {
    let tool_ctx = build_tool_context(&config)?;
    let runtime = RuntimeClient::new(&config);

    let report = agent::run_cycle(&config, &runtime, &tool_ctx, question).await?;
    println!("{}", report.answer);

    if trace {
        print_trace(&report);
    }
    Ok(())
}

async fn cmd_chat(config: AnalystConfig) -> Result<()> {
    let tool_ctx = build_tool_context(&config)?;
    let runtime = RuntimeClient::new(&config);

    println!(
        "{} {} via {} (Ctrl-C or \"exit\" to quit)",
        ">>>".green().bold(),
        config.model.bold(),
        config.runtime_url,
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "?".cyan().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        // Ctrl-C during a question cancels the cycle, not the session.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "cancelled".yellow());
            }
            outcome = agent::run_cycle(&config, &runtime, &tool_ctx, question) => match outcome {
                Ok(report) => println!("{}", report.answer),
                Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
            },
        }
    }

    println!();
    println!("{} Session closed", "<<<".red().bold());
    Ok(())
}

fn cmd_seed(config: &AnalystConfig, rows: usize) -> Result<()> {
    let db_path = PathBuf::from(config.resolved_db_path());
    let inserted = seed::seed(&db_path, rows)?;

    if inserted == 0 {
        println!(
            "Database at {} already has data; seed skipped.",
            db_path.display()
        );
    } else {
        println!(
            "{} Seeded {} transactions into {}",
            ">>>".green().bold(),
            inserted,
            db_path.display()
        );
    }
    Ok(())
}

async fn cmd_schema(config: &AnalystConfig) -> Result<()> {
    let db_path = require_database(config);
    let snapshot = SchemaInspector::new(&db_path).describe().await?;

    if snapshot.tables.is_empty() {
        println!("No tables. Run `analyst seed` to create the demo dataset.");
        return Ok(());
    }

    for table in &snapshot.tables {
        println!("{}", table.name.bold());
        for column in &table.columns {
            let null_marker = if column.nullable { "" } else { "  not null" };
            println!("  {:<24}{}{}", column.name, column.decl_type, null_marker);
        }
        println!();
    }
    Ok(())
}

async fn cmd_query(config: &AnalystConfig, sql: &str) -> Result<()> {
    let tool_ctx = build_tool_context(config)?;

    match tool_ctx.executor.execute(sql).await {
        Ok(result) => {
            println!("{}", result.columns.join(" | ").bold());
            for row in &result.rows {
                let rendered: Vec<String> = row.iter().map(display_value).collect();
                println!("{}", rendered.join(" | "));
            }
            let truncated = if result.truncated { ", truncated" } else { "" };
            println!(
                "{}",
                format!("({} row(s){})", result.row_count, truncated).dimmed()
            );
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn cmd_init(config: &AnalystConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    config::save_config(config, config_path)?;
    println!("{} Wrote {}", ">>>".green().bold(), config_path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn with_overrides(
    mut config: AnalystConfig,
    model: Option<String>,
    runtime_url: Option<String>,
) -> AnalystConfig {
    if let Some(model) = model {
        config.model = model;
    }
    if let Some(url) = runtime_url {
        config.runtime_url = url;
    }
    config
}

/// Wire the database-facing components from config.
fn build_tool_context(config: &AnalystConfig) -> Result<ToolContext> {
    let db_path = require_database(config);
    let conn = db::open_read_only(&db_path).with_context(|| {
        format!("Failed to open database read-only at {}", db_path.display())
    })?;
    let executor = QueryExecutor::new(
        conn,
        Duration::from_millis(config.query_timeout_ms),
        config.row_cap,
    );

    Ok(ToolContext {
        inspector: SchemaInspector::new(&db_path),
        executor,
    })
}

fn require_database(config: &AnalystConfig) -> PathBuf {
    let db_path = PathBuf::from(config.resolved_db_path());
    if !db_path.exists() {
        eprintln!(
            "{} No database at {}. Run `analyst seed` first, or point db_path at an existing file.",
            "Error:".red().bold(),
            db_path.display()
        );
        std::process::exit(1);
    }
    db_path
}

fn print_trace(report: &CycleReport) {
    println!();
    for turn in &report.conversation {
        match turn.role {
            ChatRole::Assistant => {
                for call in &turn.tool_calls {
                    println!("{}", format!("-> {}({})", call.name, call.arguments).dimmed());
                }
            }
            ChatRole::Tool => {
                println!("{}", format!("<- {}", preview(&turn.content, 200)).dimmed());
            }
            _ => {}
        }
    }
    println!(
        "{}",
        format!(
            "{} round(s), {} tokens",
            report.rounds, report.usage.total_tokens
        )
        .dimmed()
    );
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".into(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Clip long tool output for terminal display, on a char boundary.
fn preview(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
