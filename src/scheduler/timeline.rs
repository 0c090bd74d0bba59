//! Time-ordered job queue.
//!
//! A min-heap keyed by `(fire_at, seq)`: earliest job first, and jobs sharing
//! a fire time come out in the order they were inserted.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use crate::actuator::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Actuate(Command),
    /// Recompute today's schedule and re-arm for tomorrow.
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledJob {
    pub label: String,
    pub fire_at: DateTime<Tz>,
    pub action: JobAction,
}

impl ScheduledJob {
    pub fn actuate(command: Command, fire_at: DateTime<Tz>) -> Self {
        Self {
            label: command.label().to_string(),
            fire_at,
            action: JobAction::Actuate(command),
        }
    }

    pub fn refresh(fire_at: DateTime<Tz>) -> Self {
        Self {
            label: "Schedule Refresh".to_string(),
            fire_at,
            action: JobAction::Refresh,
        }
    }

    pub fn is_solar(&self) -> bool {
        matches!(self.action, JobAction::Actuate(_))
    }
}

impl fmt::Display for ScheduledJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (next run at: {})",
            self.label,
            self.fire_at.format("%Y-%m-%d %H:%M:%S %Z")
        )
    }
}

struct Entry {
    fire_at: DateTime<Utc>,
    seq: u64,
    job: ScheduledJob,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

#[derive(Default)]
pub struct Timeline {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, job: ScheduledJob) {
        let entry = Entry {
            fire_at: job.fire_at.with_timezone(&Utc),
            seq: self.next_seq,
            job,
        };
        self.next_seq += 1;
        self.heap.push(Reverse(entry));
    }

    /// Remove and return the earliest job if it is due at `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<ScheduledJob> {
        if self.heap.peek()?.0.fire_at <= now {
            self.heap.pop().map(|Reverse(entry)| entry.job)
        } else {
            None
        }
    }

    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(entry)| entry.fire_at)
    }

    /// Keep only jobs for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ScheduledJob) -> bool) {
        self.heap.retain(|Reverse(entry)| keep(&entry.job));
    }

    /// Pending jobs in firing order.
    pub fn pending(&self) -> Vec<ScheduledJob> {
        let mut entries: Vec<&Entry> = self.heap.iter().map(|Reverse(entry)| entry).collect();
        entries.sort();
        entries.into_iter().map(|entry| entry.job.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        chrono_tz::US::Pacific
            .with_ymd_and_hms(2024, 6, 1, h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.push(ScheduledJob::actuate(Command::CloseCoop, at(21, 15)));
        timeline.push(ScheduledJob::actuate(Command::OpenCoop, at(5, 30)));
        timeline.push(ScheduledJob::actuate(Command::CloseTunnel, at(21, 15)));

        let now = at(23, 0).with_timezone(&Utc);
        let order: Vec<_> = std::iter::from_fn(|| timeline.pop_due(now))
            .map(|j| j.action)
            .collect();
        assert_eq!(
            order,
            vec![
                JobAction::Actuate(Command::OpenCoop),
                JobAction::Actuate(Command::CloseCoop),
                JobAction::Actuate(Command::CloseTunnel),
            ]
        );
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_pop_due_waits_for_fire_time() {
        let mut timeline = Timeline::new();
        timeline.push(ScheduledJob::actuate(Command::OpenCoop, at(5, 30)));

        assert!(timeline.pop_due(at(5, 29).with_timezone(&Utc)).is_none());
        assert_eq!(timeline.next_fire(), Some(at(5, 30).with_timezone(&Utc)));
        assert!(timeline.pop_due(at(5, 30).with_timezone(&Utc)).is_some());
    }

    #[test]
    fn test_retain_and_pending() {
        let mut timeline = Timeline::new();
        timeline.push(ScheduledJob::refresh(at(0, 10)));
        timeline.push(ScheduledJob::actuate(Command::OpenCoop, at(5, 30)));
        timeline.retain(|job| !job.is_solar());

        let pending = timeline.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].action, JobAction::Refresh);
        assert_eq!(
            pending[0].to_string(),
            "Schedule Refresh (next run at: 2024-06-01 00:10:00 PDT)"
        );
    }
}
