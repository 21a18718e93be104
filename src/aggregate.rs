//! Derivation of epic fields from their subtasks.

use crate::types::{Epic, Status, Subtask};
use chrono::{Duration, NaiveDateTime};

/// The fields of an epic that are owned by its children.
#[derive(Debug, Clone, PartialEq)]
pub struct EpicSummary {
    pub status: Status,
    pub duration: Duration,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl EpicSummary {
    /// Copy the derived fields onto `epic`.
    pub fn apply_to(self, epic: &mut Epic) {
        epic.status = self.status;
        epic.duration = self.duration;
        epic.start_time = self.start_time;
        epic.end_time = self.end_time;
    }
}

/// Summarise a set of subtasks.
///
/// No children, or all NEW, gives NEW; all DONE gives DONE; any other mix is
/// IN_PROGRESS. Durations add up, saturating, with missing ones counted as zero; the span
/// runs from the earliest start to the latest computable end.
pub fn recompute<'a>(subtasks: impl IntoIterator<Item = &'a Subtask>) -> EpicSummary {
    let mut any = false;
    let mut all_new = true;
    let mut all_done = true;
    let mut duration = Duration::zero();
    let mut start_time: Option<NaiveDateTime> = None;
    let mut end_time: Option<NaiveDateTime> = None;

    for subtask in subtasks {
        any = true;
        all_new &= subtask.status == Status::New;
        all_done &= subtask.status == Status::Done;

        if let Some(d) = subtask.duration {
            duration = duration.checked_add(&d).unwrap_or(Duration::MAX);
        }
        if let Some(start) = subtask.start_time {
            start_time = Some(start_time.map_or(start, |cur| cur.min(start)));
        }
        if let Some(end) = subtask.end_time() {
            end_time = Some(end_time.map_or(end, |cur| cur.max(end)));
        }
    }

    let status = if !any || all_new {
        Status::New
    } else if all_done {
        Status::Done
    } else {
        Status::InProgress
    };

    EpicSummary {
        status,
        duration,
        start_time,
        end_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 20)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn sub(status: Status) -> Subtask {
        Subtask::new(1, "child", "").with_status(status)
    }

    #[test]
    fn test_empty_epic() {
        let summary = recompute(&[]);
        assert_eq!(summary.status, Status::New);
        assert_eq!(summary.duration, Duration::zero());
        assert_eq!(summary.start_time, None);
        assert_eq!(summary.end_time, None);
    }

    #[test]
    fn test_status_rules() {
        use Status::*;

        assert_eq!(recompute(&[sub(New), sub(New)]).status, New);
        assert_eq!(recompute(&[sub(Done), sub(Done)]).status, Done);
        assert_eq!(recompute(&[sub(New), sub(Done)]).status, InProgress);
        assert_eq!(recompute(&[sub(InProgress), sub(InProgress)]).status, InProgress);
        assert_eq!(recompute(&[sub(InProgress), sub(New)]).status, InProgress);
        assert_eq!(recompute(&[sub(Done)]).status, Done);
    }

    #[test]
    fn test_duration_and_span() {
        let subtasks = [
            sub(Status::New).scheduled(at(13, 0), Duration::minutes(45)),
            sub(Status::New).scheduled(at(9, 0), Duration::minutes(30)),
            sub(Status::New),
        ];
        let summary = recompute(&subtasks);
        assert_eq!(summary.duration, Duration::minutes(75));
        assert_eq!(summary.start_time, Some(at(9, 0)));
        assert_eq!(summary.end_time, Some(at(13, 45)));
    }

    #[test]
    fn test_start_without_duration_counts_for_start_only() {
        let mut loose = sub(Status::New);
        loose.start_time = Some(at(7, 0));
        let timed = sub(Status::New).scheduled(at(8, 0), Duration::minutes(20));

        let summary = recompute([&loose, &timed]);
        assert_eq!(summary.start_time, Some(at(7, 0)));
        assert_eq!(summary.end_time, Some(at(8, 20)));
        assert_eq!(summary.duration, Duration::minutes(20));
    }

    #[test]
    fn test_duration_sum_saturates() {
        let longest = Duration::try_minutes(Duration::MAX.num_minutes()).unwrap();
        let a = Subtask {
            duration: Some(longest),
            ..sub(Status::New)
        };
        let b = Subtask {
            duration: Some(longest),
            ..sub(Status::Done)
        };

        let summary = recompute([&a, &b]);
        assert_eq!(summary.duration, Duration::MAX);
        assert_eq!(summary.status, Status::InProgress);
    }

    #[test]
    fn test_apply_to_epic() {
        let mut epic = Epic::new("Release", "");
        recompute(&[sub(Status::Done).scheduled(at(10, 0), Duration::minutes(60))]).apply_to(&mut epic);
        assert_eq!(epic.status, Status::Done);
        assert_eq!(epic.duration, Duration::minutes(60));
        assert_eq!(epic.end_time, Some(at(11, 0)));
    }
}
