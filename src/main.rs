//! Tempo CLI - tasks, epics and subtasks on a conflict-free schedule.

use chrono::{Duration, NaiveDateTime};
use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use tempo::{Daemon, DaemonConfig, Entity, Epic, Kind, Status, Store, StoreConfig, Subtask, Task};

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tempo")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("tempo.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn format_status(status: Status) -> ColoredString {
    match status {
        Status::New => "new".green(),
        Status::InProgress => "in_progress".yellow(),
        Status::Done => "done".blue(),
    }
}

fn parse_start(raw: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 4] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| eyre!("Invalid start time '{}', expected YYYY-MM-DDTHH:MM", raw))
}

fn schedule(start: Option<String>, minutes: Option<i64>) -> Result<(Option<NaiveDateTime>, Option<Duration>)> {
    let start = start.as_deref().map(parse_start).transpose()?;
    let duration = minutes
        .map(|m| Duration::try_minutes(m).ok_or_else(|| eyre!("Duration of {} minutes is out of range", m)))
        .transpose()?;
    Ok((start, duration))
}

fn parse_kind(raw: &str) -> Result<Kind> {
    raw.parse::<Kind>().map_err(|e| eyre!(e))
}

fn format_span(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> String {
    match (start, end) {
        (Some(start), Some(end)) => format!("{} → {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M")),
        (Some(start), None) => format!("{}", start.format("%Y-%m-%d %H:%M")),
        _ => String::new(),
    }
}

fn print_line(entity: &Entity) {
    let span = format_span(entity.start_time(), entity.end_time());
    let epic = match entity {
        Entity::Subtask(s) => format!(" (epic {})", s.epic_id),
        _ => String::new(),
    };
    println!(
        "{} {} {} {}{} {}",
        format_status(entity.status()),
        entity.id().to_string().cyan(),
        entity.kind().as_str().to_lowercase().dimmed(),
        entity.name(),
        epic.dimmed(),
        span.dimmed()
    );
}

fn print_list(entities: &[Entity], empty: &str) {
    if entities.is_empty() {
        println!("{}", empty.dimmed());
    } else {
        for entity in entities {
            print_line(entity);
        }
    }
}

fn print_detail(entity: &Entity) {
    println!("{}: {}", "ID".bold(), entity.id().to_string().cyan());
    println!("{}: {}", "Kind".bold(), entity.kind().as_str().to_lowercase());
    println!("{}: {}", "Name".bold(), entity.name());
    println!("{}: {}", "Status".bold(), format_status(entity.status()));

    let (description, duration) = match entity {
        Entity::Task(t) => (&t.description, t.duration),
        Entity::Epic(e) => (&e.description, Some(e.duration)),
        Entity::Subtask(s) => (&s.description, s.duration),
    };
    if !description.is_empty() {
        println!("{}: {}", "Description".bold(), description);
    }
    if let Some(duration) = duration {
        println!("{}: {} min", "Duration".bold(), duration.num_minutes());
    }
    if let Some(start) = entity.start_time() {
        println!("{}: {}", "Start".bold(), start);
    }
    if let Some(end) = entity.end_time() {
        println!("{}: {}", "End".bold(), end);
    }
    match entity {
        Entity::Epic(e) if !e.subtask_ids.is_empty() => {
            let ids: Vec<String> = e.subtask_ids.iter().map(u64::to_string).collect();
            println!("{}: {}", "Subtasks".bold(), ids.join(", "));
        }
        Entity::Subtask(s) => println!("{}: {}", "Epic".bold(), s.epic_id),
        _ => {}
    }
}

fn open_store(cli: &Cli) -> Result<Store> {
    let config = StoreConfig {
        history_limit: cli.history_limit,
    };
    Store::open_with(&cli.file, config).with_context(|| format!("Failed to open store at {}", cli.file.display()))
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Task {
            name,
            description,
            start,
            minutes,
        } => {
            let mut store = open_store(&cli)?;
            let (start_time, duration) = schedule(start.clone(), *minutes)?;
            let task = store
                .create_task(Task {
                    start_time,
                    duration,
                    ..Task::new(name.as_str(), description.as_str())
                })
                .context("Failed to create task")?;

            println!("{} Created task: {} {}", "✓".green(), task.id.to_string().cyan(), task.name);
        }

        Command::Epic { name, description } => {
            let mut store = open_store(&cli)?;
            let epic = store
                .create_epic(Epic::new(name.as_str(), description.as_str()))
                .context("Failed to create epic")?;

            println!("{} Created epic: {} {}", "✓".green(), epic.id.to_string().cyan(), epic.name);
        }

        Command::Subtask {
            epic_id,
            name,
            description,
            start,
            minutes,
        } => {
            let mut store = open_store(&cli)?;
            let (start_time, duration) = schedule(start.clone(), *minutes)?;
            let subtask = store
                .create_subtask(Subtask {
                    start_time,
                    duration,
                    ..Subtask::new(*epic_id, name.as_str(), description.as_str())
                })
                .context("Failed to create subtask")?;

            println!(
                "{} Created subtask: {} {} in epic {}",
                "✓".green(),
                subtask.id.to_string().cyan(),
                subtask.name,
                subtask.epic_id.to_string().cyan()
            );
        }

        Command::Get { id } => {
            let mut store = open_store(&cli)?;
            match store.get(*id).context("Failed to get entity")? {
                Some(entity) => print_detail(&entity),
                None => {
                    eprintln!("{} Not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::List { kind, epic } => {
            let store = open_store(&cli)?;
            let entities: Vec<Entity> = match epic {
                Some(epic_id) => store
                    .epic_subtasks(*epic_id)
                    .ok_or_else(|| eyre!("Epic not found: {}", epic_id))?
                    .into_iter()
                    .map(Entity::Subtask)
                    .collect(),
                None => match parse_kind(kind)? {
                    Kind::Task => store.tasks().into_iter().map(Entity::Task).collect(),
                    Kind::Epic => store.epics().into_iter().map(Entity::Epic).collect(),
                    Kind::Subtask => store.subtasks().into_iter().map(Entity::Subtask).collect(),
                },
            };
            print_list(&entities, "No items found");
        }

        Command::Status { id, status } => {
            let status: Status = status.parse().map_err(|e: String| eyre!(e))?;
            let mut store = open_store(&cli)?;
            let updated = match store.find(*id) {
                Some(Entity::Task(task)) => Entity::Task(
                    store
                        .update_task(task.with_status(status))
                        .context("Failed to update task")?,
                ),
                Some(Entity::Subtask(subtask)) => Entity::Subtask(
                    store
                        .update_subtask(subtask.with_status(status))
                        .context("Failed to update subtask")?,
                ),
                Some(Entity::Epic(_)) => {
                    return Err(eyre!("Epic {} takes its status from its subtasks", id));
                }
                None => return Err(eyre!("Not found: {}", id)),
            };

            println!(
                "{} {} is now {}",
                "→".blue(),
                updated.id().to_string().cyan(),
                format_status(updated.status())
            );
        }

        Command::Delete { id } => {
            let mut store = open_store(&cli)?;
            let Some(entity) = store.find(*id) else {
                eprintln!("{} Not found: {}", "✗".red(), id);
                std::process::exit(1);
            };
            let deleted = match entity.kind() {
                Kind::Task => store.delete_task(*id),
                Kind::Epic => store.delete_epic(*id),
                Kind::Subtask => store.delete_subtask(*id),
            };
            deleted.context("Failed to delete")?;

            println!("{} Deleted: {} {}", "✓".green(), id.to_string().cyan(), entity.name());
        }

        Command::Clear { kind } => {
            let kind = parse_kind(kind)?;
            let mut store = open_store(&cli)?;
            let cleared = match kind {
                Kind::Task => store.clear_tasks(),
                Kind::Epic => store.clear_epics(),
                Kind::Subtask => store.clear_subtasks(),
            };
            cleared.context("Failed to clear")?;

            println!("{} Cleared all {}s", "✓".green(), kind.as_str().to_lowercase());
        }

        Command::Prioritized => {
            let store = open_store(&cli)?;
            print_list(&store.prioritized(), "Nothing scheduled");
        }

        Command::History => {
            let store = open_store(&cli)?;
            print_list(&store.history(), "No history");
        }

        Command::Serve { bind } => {
            println!("{} Serving {} on http://{}", "→".blue(), cli.file.display(), bind);

            let config = DaemonConfig {
                bind: *bind,
                history_limit: cli.history_limit,
                ..DaemonConfig::new(Some(cli.file.clone()))
            };
            let daemon = Daemon::new(config).context("Failed to create daemon")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(daemon.run()).context("Daemon error")?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
