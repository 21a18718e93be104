//! Core data types for tempo work items.

use crate::schedule::Slot;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progress state of a work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Done,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::InProgress => "IN_PROGRESS",
            Status::Done => "DONE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(Status::New),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "DONE" => Ok(Status::Done),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Which table an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    Task,
    Epic,
    Subtask,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Task => "TASK",
            Kind::Epic => "EPIC",
            Kind::Subtask => "SUBTASK",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TASK" | "TASKS" => Ok(Kind::Task),
            "EPIC" | "EPICS" => Ok(Kind::Epic),
            "SUBTASK" | "SUBTASKS" => Ok(Kind::Subtask),
            other => Err(format!("unknown kind '{}'", other)),
        }
    }
}

/// A standalone unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Assigned by the store; ignored on create
    #[serde(default)]
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Status,

    /// Planned length; absent means unscheduled
    #[serde(default, with = "minutes_opt", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status: Status::New,
            duration: None,
            start_time: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Place the task on the calendar.
    pub fn scheduled(mut self, start_time: NaiveDateTime, duration: Duration) -> Self {
        self.start_time = Some(start_time);
        self.duration = Some(duration);
        self
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        end_time(self.start_time, self.duration)
    }

    pub fn slot(&self) -> Option<Slot> {
        Slot::of(self.start_time, self.duration)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.start_time, self.duration)
    }
}

/// A unit of work that belongs to an epic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(default)]
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default, with = "minutes_opt", skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,

    /// Owning epic (relation only)
    pub epic_id: u64,
}

impl Subtask {
    pub fn new(epic_id: u64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status: Status::New,
            duration: None,
            start_time: None,
            epic_id,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn scheduled(mut self, start_time: NaiveDateTime, duration: Duration) -> Self {
        self.start_time = Some(start_time);
        self.duration = Some(duration);
        self
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        end_time(self.start_time, self.duration)
    }

    pub fn slot(&self) -> Option<Slot> {
        Slot::of(self.start_time, self.duration)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.start_time, self.duration)
    }
}

/// A container of subtasks.
///
/// Status, duration and the time span are derived from the children by the
/// store and are ignored when an epic is submitted for create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epic {
    #[serde(default)]
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: Status,

    #[serde(default = "Duration::zero", with = "minutes")]
    pub duration: Duration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveDateTime>,

    /// Child ids in the order they were attached
    #[serde(default)]
    pub subtask_ids: Vec<u64>,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status: Status::New,
            duration: Duration::zero(),
            start_time: None,
            end_time: None,
            subtask_ids: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok(())
    }
}

/// Any stored work item, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entity {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl Entity {
    pub fn id(&self) -> u64 {
        match self {
            Entity::Task(t) => t.id,
            Entity::Epic(e) => e.id,
            Entity::Subtask(s) => s.id,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Entity::Task(_) => Kind::Task,
            Entity::Epic(_) => Kind::Epic,
            Entity::Subtask(_) => Kind::Subtask,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Task(t) => &t.name,
            Entity::Epic(e) => &e.name,
            Entity::Subtask(s) => &s.name,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Entity::Task(t) => t.status,
            Entity::Epic(e) => e.status,
            Entity::Subtask(s) => s.status,
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        match self {
            Entity::Task(t) => t.start_time,
            Entity::Epic(e) => e.start_time,
            Entity::Subtask(s) => s.start_time,
        }
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        match self {
            Entity::Task(t) => t.end_time(),
            Entity::Epic(e) => e.end_time,
            Entity::Subtask(s) => s.end_time(),
        }
    }
}

/// Validation errors for submitted work items.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyName,
    NegativeDuration,
    ScheduleOverflow,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyName => write!(f, "name cannot be empty"),
            ValidationError::NegativeDuration => write!(f, "duration cannot be negative"),
            ValidationError::ScheduleOverflow => write!(f, "start time plus duration is out of range"),
        }
    }
}

impl std::error::Error for ValidationError {}

fn end_time(start_time: Option<NaiveDateTime>, duration: Option<Duration>) -> Option<NaiveDateTime> {
    start_time?.checked_add_signed(duration?)
}

fn validate_fields(
    name: &str,
    start_time: Option<NaiveDateTime>,
    duration: Option<Duration>,
) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if let Some(duration) = duration {
        if duration < Duration::zero() {
            return Err(ValidationError::NegativeDuration);
        }
        if let Some(start) = start_time
            && start.checked_add_signed(duration).is_none()
        {
            return Err(ValidationError::ScheduleOverflow);
        }
    }
    Ok(())
}

/// Durations travel as whole minutes.
mod minutes {
    use chrono::Duration;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_minutes())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        from_minutes::<D>(i64::deserialize(deserializer)?)
    }

    /// Minute counts beyond what a `Duration` holds are a data error.
    pub(super) fn from_minutes<'de, D: Deserializer<'de>>(minutes: i64) -> Result<Duration, D::Error> {
        Duration::try_minutes(minutes)
            .ok_or_else(|| D::Error::custom(format!("duration of {} minutes is out of range", minutes)))
    }
}

mod minutes_opt {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.num_minutes()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<i64>::deserialize(deserializer)?
            .map(super::minutes::from_minutes::<D>)
            .transpose()
    }
}
