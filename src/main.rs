use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use tasklist::{Config, FileStorage, SystemClock, Task, TaskId, TaskListStore};
use tracing::Level;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "TaskList CLI - manage a persistent to-do list")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Directory holding the task list (default: platform data dir)
    #[arg(short, long)]
    store_dir: Option<PathBuf>,

    /// Storage key the list is saved under
    #[arg(short, long)]
    key: Option<String>,

    /// Path to a YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// List tasks
    #[command(visible_alias = "ls")]
    List {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task between pending and completed
    Toggle { id: TaskId },

    /// Replace a task's text
    Edit {
        id: TaskId,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a task
    #[command(visible_alias = "rm")]
    Delete { id: TaskId },

    /// Delete every task and the stored list itself
    Reset,

    /// Show total, completed and pending counts
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.store_dir, cli.key)?;

    // Open store
    let storage = FileStorage::open(&config.store_dir)?;
    let mut store = TaskListStore::open_at(storage, SystemClock, config.storage_key);

    match cli.command {
        Commands::Add { text } => {
            let text = text.join(" ");
            match store.add(&text) {
                Some(id) => println!("Added task {}", id.to_string().cyan()),
                None => return Err(eyre!("Task text cannot be empty")),
            }
        }
        Commands::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
            } else if store.tasks().is_empty() {
                println!("No tasks yet");
            } else {
                for task in store.tasks() {
                    print_task(task);
                }
            }
        }
        Commands::Toggle { id } => {
            if !store.toggle_complete(id) {
                return Err(eyre!("No task with id {}", id));
            }
            if let Some(task) = store.get(id) {
                print_task(task);
            }
        }
        Commands::Edit { id, text } => {
            if !store.begin_edit(id) {
                return Err(eyre!("No task with id {}", id));
            }
            store.update_draft(text.join(" "));
            if !store.commit_edit() {
                store.cancel_edit();
                return Err(eyre!("Task text cannot be empty"));
            }
            if let Some(task) = store.get(id) {
                print_task(task);
            }
        }
        Commands::Delete { id } => {
            if !store.delete(id) {
                return Err(eyre!("No task with id {}", id));
            }
            println!("Deleted task {}", id.to_string().cyan());
        }
        Commands::Reset => {
            store.reset_all();
            println!("All tasks removed");
        }
        Commands::Stats => {
            let stats = store.stats();
            println!("Total:     {}", stats.total.to_string().bold());
            println!("Completed: {}", stats.completed.to_string().green());
            println!("Pending:   {}", stats.pending.to_string().yellow());
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let id = task.id.to_string().cyan();
    if task.completed {
        println!("[{}] {}  {}", "x".green(), id, task.text.strikethrough().dimmed());
    } else {
        println!("[ ] {}  {}", id, task.text);
    }
}
