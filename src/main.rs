use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use tasklist::{Config, Task, TaskCoordinator, TaskFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Tasklist CLI - track short tasks in a local SQLite store")]
#[command(version)]
struct Cli {
    /// Directory holding the task database (default: platform data dir)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Print tasks as JSON lines instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        description: String,
        /// Create the task already completed
        #[arg(long)]
        done: bool,
    },

    /// List tasks, newest first
    List {
        /// all, pending or done
        #[arg(short, long, default_value = "all", value_parser = parse_filter)]
        filter: TaskFilter,
    },

    /// Mark a task as done
    Done { id: i64 },

    /// Mark a task as pending again
    Undo { id: i64 },

    /// Replace a task's description
    Edit { id: i64, description: String },

    /// Delete a task
    Delete { id: i64 },

    /// Write all tasks to a JSONL file
    Export { file: PathBuf },

    /// Load tasks from a JSONL file, keeping their ids
    Import { file: PathBuf },
}

fn parse_filter(s: &str) -> Result<TaskFilter, String> {
    s.parse::<TaskFilter>().map_err(|e| e.to_string())
}

fn non_blank(description: &str) -> Result<&str> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(eyre!("Task description cannot be empty"));
    }
    Ok(trimmed)
}

async fn find_task(coordinator: &TaskCoordinator, id: i64) -> Result<Task> {
    coordinator
        .store()
        .get(id)
        .await?
        .ok_or_else(|| eyre!("No task with id {}", id))
}

async fn update(coordinator: &TaskCoordinator, task: Task) -> Result<()> {
    coordinator.update_task(&task).await?;
    let marker = *coordinator.last_updated_id().borrow();
    if marker == Some(task.id) {
        println!("{} {}", render(&task), "Updated!".green());
    }
    Ok(())
}

fn render(task: &Task) -> String {
    if task.done {
        format!("{:>4}  [x] {}", task.id, task.description.dimmed().strikethrough())
    } else {
        format!("{:>4}  [ ] {}", task.id, task.description)
    }
}

fn print_tasks(tasks: &[Task], json: bool) -> Result<()> {
    if json {
        for task in tasks {
            println!("{}", serde_json::to_string(task)?);
        }
        return Ok(());
    }

    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
    }
    for task in tasks {
        println!("{}", render(task));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::new(cli.store_path.unwrap_or_else(Config::default_store_path));
    let coordinator = TaskCoordinator::open(&config)?;

    match cli.command {
        Commands::Add { description, done } => {
            let id = coordinator.store().insert(non_blank(&description)?, done).await?;
            let task = find_task(&coordinator, id).await?;
            print_tasks(&[task], cli.json)?;
        }
        Commands::List { filter } => {
            print_tasks(&coordinator.tasks(filter).current(), cli.json)?;
        }
        Commands::Done { id } => {
            let task = find_task(&coordinator, id).await?;
            update(&coordinator, task.with_done(true)).await?;
        }
        Commands::Undo { id } => {
            let task = find_task(&coordinator, id).await?;
            update(&coordinator, task.with_done(false)).await?;
        }
        Commands::Edit { id, description } => {
            let task = find_task(&coordinator, id).await?;
            update(&coordinator, task.with_description(non_blank(&description)?)).await?;
        }
        Commands::Delete { id } => {
            let task = find_task(&coordinator, id).await?;
            coordinator.delete_task(&task).await?;
            println!("Deleted task {}", id);
        }
        Commands::Export { file } => {
            let count = coordinator.store().export_jsonl(&file).await?;
            println!("Exported {} tasks to {}", count, file.display());
        }
        Commands::Import { file } => {
            let count = coordinator.store().import_jsonl(&file).await?;
            println!("Imported {} tasks from {}", count, file.display());
        }
    }

    Ok(())
}
