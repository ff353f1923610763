//! Task Board
//!
//! Runs the task REST API, or talks to a running one from the command line.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use task_board::api;
use task_board::cli::{AddArgs, Cli, Command};
use task_board::client::{TaskApi, TaskService};
use task_board::config::Config;
use task_board::db::Database;
use task_board::format::{self, OutputFormat};
use task_board::types::{NewTask, Task, TaskPatch};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Load config and apply CLI overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::resolve(cli.config.as_deref().map(Path::new))?;
    if let Some(ref db) = cli.database {
        config.server.db_path = db.into();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref url) = cli.api_url {
        config.client.api_url = url.clone();
    }
    Ok(config)
}

async fn serve(config: &Config) -> Result<()> {
    config.ensure_db_dir()?;
    let db = Arc::new(Database::open(&config.server.db_path)?);
    info!(path = %config.server.db_path.display(), tasks = db.count_tasks()?, "Database opened");

    let handle = api::start_server(db, config.server.socket_addr()).await?;
    info!("Task API available at {}", handle.tasks_url());

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received");
    handle.shutdown().await;
    Ok(())
}

fn print_task(task: &Task, output: OutputFormat) {
    match output {
        OutputFormat::Json => println!("{}", format::to_json(task)),
        OutputFormat::Markdown => print!("{}", format::format_task_markdown(task, Utc::now())),
    }
}

fn new_task_from_args(args: AddArgs) -> NewTask {
    let mut input = NewTask::new(args.text);
    if let Some(priority) = args.priority {
        input = input.with_priority(priority.into());
    }
    if let Some(category) = args.category {
        input = input.with_category(category);
    }
    if let Some(due) = args.due {
        input = input.with_due_date(due);
    }
    input
}

async fn run(command: Command, config: &Config, output: OutputFormat) -> Result<()> {
    let service = TaskService::new(config.client.api_url.clone());

    match command {
        Command::Serve => serve(config).await?,
        Command::List(args) => {
            let tasks = service.list_tasks(&args.to_filter()).await?;
            match output {
                OutputFormat::Json => println!("{}", format::to_json(&tasks)),
                OutputFormat::Markdown => {
                    print!("{}", format::format_tasks_markdown(&tasks, Utc::now()))
                }
            }
        }
        Command::Add(args) => {
            let task = service.create_task(&new_task_from_args(args)).await?;
            print_task(&task, output);
        }
        Command::Done { id } => {
            let task = service.update_task(&id, &TaskPatch::completed(true)).await?;
            print_task(&task, output);
        }
        Command::Reopen { id } => {
            let task = service.update_task(&id, &TaskPatch::completed(false)).await?;
            print_task(&task, output);
        }
        Command::Edit { id, text } => {
            let task = service.update_task(&id, &TaskPatch::text(text)).await?;
            print_task(&task, output);
        }
        Command::Rm { id } => {
            let task = service.delete_task(&id).await?;
            print_task(&task, output);
        }
        Command::Stats => {
            let stats = service.stats().await?;
            match output {
                OutputFormat::Json => println!("{}", format::to_json(&stats)),
                OutputFormat::Markdown => print!("{}", format::format_stats_markdown(&stats)),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = load_config(&cli)?;
    let output = OutputFormat::from(cli.format);

    run(cli.command.unwrap_or(Command::Serve), &config, output).await
}
