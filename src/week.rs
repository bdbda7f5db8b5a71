use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Weekday names in board order. The backend stores the English day name as
/// the entry key, so the wire form is the variant name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

pub const WEEK_DAYS: [WeekDay; 7] = [
    WeekDay::Monday,
    WeekDay::Tuesday,
    WeekDay::Wednesday,
    WeekDay::Thursday,
    WeekDay::Friday,
    WeekDay::Saturday,
    WeekDay::Sunday,
];

impl WeekDay {
    pub fn as_str(self) -> &'static str {
        match self {
            WeekDay::Monday => "Monday",
            WeekDay::Tuesday => "Tuesday",
            WeekDay::Wednesday => "Wednesday",
            WeekDay::Thursday => "Thursday",
            WeekDay::Friday => "Friday",
            WeekDay::Saturday => "Saturday",
            WeekDay::Sunday => "Sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        WEEK_DAYS.iter().copied().find(|d| d.as_str() == s.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub day: WeekDay,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub completed: bool,
}

/// One week of tasks. Always exactly 7 entries, one per weekday, in
/// Monday..Sunday order; `week_start` is always the Monday of its week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekBoard {
    pub week_start: NaiveDate,
    pub entries: Vec<TaskEntry>,
}

/// Monday on or before `reference`, time-of-day dropped by construction.
pub fn week_start_of(reference: NaiveDate) -> NaiveDate {
    let day_index = reference.weekday().num_days_from_sunday() as i64;
    let offset = (day_index + 6) % 7;
    reference - Duration::days(offset)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub fn build_empty_week(week_start: NaiveDate) -> WeekBoard {
    WeekBoard {
        week_start,
        entries: WEEK_DAYS
            .iter()
            .map(|day| TaskEntry {
                day: *day,
                task: String::new(),
                completed: false,
            })
            .collect(),
    }
}

/// Rebuilds a full board from whatever the remote returned. Every fixed
/// weekday gets the first matching remote entry; days the remote does not
/// know are synthesized empty and incomplete, so the 7-entry invariant holds
/// for partial, unordered, or duplicated payloads alike.
pub fn merge_with_remote(week_start: NaiveDate, remote: &[TaskEntry]) -> WeekBoard {
    WeekBoard {
        week_start,
        entries: WEEK_DAYS
            .iter()
            .map(|day| {
                remote
                    .iter()
                    .find(|entry| entry.day == *day)
                    .map(|entry| TaskEntry {
                        day: *day,
                        task: entry.task.clone(),
                        completed: entry.completed,
                    })
                    .unwrap_or(TaskEntry {
                        day: *day,
                        task: String::new(),
                        completed: false,
                    })
            })
            .collect(),
    }
}

pub fn set_task_text(board: &mut WeekBoard, day: WeekDay, text: &str) {
    if let Some(entry) = board.entries.iter_mut().find(|e| e.day == day) {
        entry.task = text.to_string();
    }
}

pub fn toggle_completion(board: &mut WeekBoard, day: WeekDay) {
    if let Some(entry) = board.entries.iter_mut().find(|e| e.day == day) {
        entry.completed = !entry.completed;
    }
}

/// Longest run of consecutive completed days in Monday..Sunday order. Runs
/// do not wrap across week boundaries.
pub fn longest_streak(board: &WeekBoard) -> i64 {
    let mut streak = 0;
    let mut longest = 0;
    for entry in &board.entries {
        if entry.completed {
            streak += 1;
            longest = longest.max(streak);
        } else {
            streak = 0;
        }
    }
    longest
}

pub fn completion_percent(board: &WeekBoard) -> i64 {
    let done = board.entries.iter().filter(|e| e.completed).count();
    ((done as f64 / WEEK_DAYS.len() as f64) * 100.0).round() as i64
}

pub fn daily_reminder(board: &WeekBoard) -> String {
    let upcoming = board
        .entries
        .iter()
        .find(|e| !e.task.trim().is_empty() && !e.completed);
    if let Some(entry) = upcoming {
        return format!("{}: {}", entry.day.as_str(), entry.task);
    }
    if board.entries.iter().any(|e| !e.task.trim().is_empty()) {
        "All tasks are tracked. Keep the streak alive!".to_string()
    } else {
        "Add weekly tasks to get daily reminders.".to_string()
    }
}

/// The active board plus the bookkeeping that guards against a late-arriving
/// remote payload overwriting a newer week's view: every `begin_open` bumps
/// the generation, and a remote application is discarded unless it carries
/// the current generation.
#[derive(Debug, Clone)]
pub struct BoardSlot {
    pub board: WeekBoard,
    generation: u64,
    pending_week: NaiveDate,
    prev_completion: i64,
    last_boost: i64,
}

impl BoardSlot {
    pub fn new(week_start: NaiveDate) -> Self {
        BoardSlot {
            board: build_empty_week(week_start),
            generation: 0,
            pending_week: week_start,
            prev_completion: 0,
            last_boost: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a navigation to `week_start`. The current board stays visible
    /// until a matching remote payload is applied.
    pub fn begin_open(&mut self, week_start: NaiveDate) -> u64 {
        self.generation += 1;
        self.pending_week = week_start;
        self.generation
    }

    /// Applies remote entries for the requested week. Returns false (and
    /// leaves the board untouched) when the payload is stale: another
    /// `begin_open` happened since the request was issued, or the payload is
    /// for a week the user has navigated away from.
    pub fn apply_remote(
        &mut self,
        week_start: NaiveDate,
        generation: u64,
        remote: &[TaskEntry],
    ) -> bool {
        if generation != self.generation || week_start != self.pending_week {
            return false;
        }
        self.board = merge_with_remote(week_start, remote);
        self.refresh_boost();
        true
    }

    pub fn toggle(&mut self, day: WeekDay) {
        toggle_completion(&mut self.board, day);
        self.refresh_boost();
    }

    pub fn set_text(&mut self, day: WeekDay, text: &str) {
        set_task_text(&mut self.board, day, text);
    }

    /// Completion delta since the previous completion-changing event.
    pub fn task_boost(&self) -> i64 {
        self.last_boost
    }

    fn refresh_boost(&mut self) {
        let current = completion_percent(&self.board);
        self.last_boost = current - self.prev_completion;
        self.prev_completion = current;
    }
}
