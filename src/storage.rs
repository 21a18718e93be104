//! Storage layer for tempo: a flat text snapshot rewritten on every change.
//!
//! Layout:
//!
//! ```text
//! type,id,name,status,description,duration,startTime,epicId
//! TASK,1,Write report,NEW,,30,2025-03-14T10:00:00,
//! EPIC,2,Release,IN_PROGRESS,,,,
//! SUBTASK,3,Tag build,DONE,,,,2
//!
//! 3,1
//! ```
//!
//! Durations are whole minutes. Epic status and timing are written for
//! readability but rebuilt from subtasks on load.

use crate::types::{Epic, Status, Subtask, Task};
use chrono::{Duration, NaiveDateTime};
use eyre::{Context, Result, bail, eyre};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column header, first line of every snapshot.
pub const HEADER: &str = "type,id,name,status,description,duration,startTime,epicId";

const COLUMNS: usize = 8;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Everything needed to rebuild a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub epics: Vec<Epic>,
    pub subtasks: Vec<Subtask>,
    /// Viewed ids, oldest first
    pub history: Vec<u64>,
}

/// Handle on the snapshot file.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the file with `snapshot`.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create data directory")?;
        }

        let mut file = File::create(&self.path)
            .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
        file.write_all(encode(snapshot).as_bytes())
            .context("Failed to write snapshot")?;
        file.sync_all().context("Failed to sync snapshot")?;

        log::debug!(
            "Saved {} tasks, {} epics, {} subtasks to {}",
            snapshot.tasks.len(),
            snapshot.epics.len(),
            snapshot.subtasks.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Snapshot> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        decode(&text).with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

/// Render a snapshot in the flat-file format.
pub fn encode(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for task in &snapshot.tasks {
        push_row(
            &mut out,
            "TASK",
            task.id,
            &task.name,
            task.status,
            &task.description,
            task.duration,
            task.start_time,
            None,
        );
    }
    for epic in &snapshot.epics {
        push_row(
            &mut out,
            "EPIC",
            epic.id,
            &epic.name,
            epic.status,
            &epic.description,
            None,
            None,
            None,
        );
    }
    for subtask in &snapshot.subtasks {
        push_row(
            &mut out,
            "SUBTASK",
            subtask.id,
            &subtask.name,
            subtask.status,
            &subtask.description,
            subtask.duration,
            subtask.start_time,
            Some(subtask.epic_id),
        );
    }

    out.push('\n');
    let history: Vec<String> = snapshot.history.iter().map(|id| id.to_string()).collect();
    out.push_str(&history.join(","));
    out.push('\n');
    out
}

#[allow(clippy::too_many_arguments)]
fn push_row(
    out: &mut String,
    kind: &str,
    id: u64,
    name: &str,
    status: Status,
    description: &str,
    duration: Option<Duration>,
    start_time: Option<NaiveDateTime>,
    epic_id: Option<u64>,
) {
    let fields = [
        kind.to_string(),
        id.to_string(),
        escape(name),
        status.as_str().to_string(),
        escape(description),
        duration.map(|d| d.num_minutes().to_string()).unwrap_or_default(),
        start_time.map(|t| t.format(TIME_FORMAT).to_string()).unwrap_or_default(),
        epic_id.map(|id| id.to_string()).unwrap_or_default(),
    ];
    out.push_str(&fields.join(","));
    out.push('\n');
}

/// Parse the flat-file format.
///
/// Rows that fail to parse are logged and skipped; a bad header is an error.
pub fn decode(text: &str) -> Result<Snapshot> {
    let mut lines = text.lines();

    match lines.next() {
        Some(header) if header.trim_end() == HEADER => {}
        Some(header) => bail!("unexpected header: {}", header),
        None => bail!("empty snapshot"),
    }

    let mut snapshot = Snapshot::default();
    let mut line_no = 1;

    for line in lines.by_ref() {
        line_no += 1;
        if line.trim().is_empty() {
            break;
        }
        if let Err(e) = parse_row(line, &mut snapshot) {
            log::warn!("Skipping row at line {}: {}", line_no, e);
        }
    }

    if let Some(history) = lines.next() {
        for token in history.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<u64>() {
                Ok(id) => snapshot.history.push(id),
                Err(e) => log::warn!("Skipping history entry '{}': {}", token, e),
            }
        }
    }

    Ok(snapshot)
}

fn parse_row(line: &str, snapshot: &mut Snapshot) -> Result<()> {
    let fields = split_fields(line);
    if fields.len() != COLUMNS {
        bail!("expected {} columns, found {}", COLUMNS, fields.len());
    }

    let id: u64 = fields[1].parse().context("invalid id")?;
    if id == 0 || id == u64::MAX {
        bail!("id out of range: {}", id);
    }
    let name = fields[2].clone();
    let status: Status = fields[3].parse().map_err(|e: String| eyre!(e))?;
    let description = fields[4].clone();
    let duration = parse_optional(&fields[5], |s| {
        let minutes: i64 = s.parse().context("invalid duration")?;
        Duration::try_minutes(minutes).ok_or_else(|| eyre!("duration out of range: {}", minutes))
    })?;
    let start_time = parse_optional(&fields[6], |s| {
        NaiveDateTime::parse_from_str(s, TIME_FORMAT).context("invalid startTime")
    })?;

    match fields[0].as_str() {
        "TASK" => snapshot.tasks.push(Task {
            id,
            name,
            description,
            status,
            duration,
            start_time,
        }),
        "EPIC" => snapshot.epics.push(Epic {
            id,
            status,
            ..Epic::new(name, description)
        }),
        "SUBTASK" => {
            let epic_id: u64 = fields[7].parse().context("invalid epicId")?;
            snapshot.subtasks.push(Subtask {
                id,
                name,
                description,
                status,
                duration,
                start_time,
                epic_id,
            });
        }
        other => bail!("unknown type '{}'", other),
    }

    Ok(())
}

fn parse_optional<T>(field: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
    if field.is_empty() { Ok(None) } else { parse(field).map(Some) }
}

/// Escape the separator, the escape character and line breaks.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`].
pub fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            push_escaped(&mut out, chars.next());
        } else {
            out.push(c);
        }
    }
    out
}

/// Split a row on unescaped commas, unescaping each field.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(COLUMNS);
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => push_escaped(&mut current, chars.next()),
            ',' => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn push_escaped(out: &mut String, next: Option<char>) {
    match next {
        Some('n') => out.push('\n'),
        Some('r') => out.push('\r'),
        Some(other) => out.push(other),
        // Trailing lone backslash
        None => out.push('\\'),
    }
}
