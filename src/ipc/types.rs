use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use rusqlite::Connection;
use serde::Deserialize;

use crate::backend::{Backend, ClassAnalytics, SessionUser, StudentOverview};
use crate::calc::{all_subjects, PerformanceInputs, SectionList, DEFAULT_MARK};
use crate::week::{week_start_of, BoardSlot};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct SessionInfo {
    pub token: String,
    pub user: SessionUser,
}

/// Focus-timer state. Elapsed time of an active run is only folded into
/// `stored_minutes` when the timer stops.
pub struct ReadingTimer {
    pub started: Option<Instant>,
    pub stored_minutes: f64,
}

impl ReadingTimer {
    pub fn total_minutes(&self) -> f64 {
        let live = self
            .started
            .map(|s| s.elapsed().as_secs_f64() / 60.0)
            .unwrap_or(0.0);
        self.stored_minutes + live
    }
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub backend: Option<Backend>,
    pub session: Option<SessionInfo>,
    pub board: BoardSlot,
    pub marks: BTreeMap<String, i64>,
    pub semester: i64,
    pub inputs: PerformanceInputs,
    pub sections: SectionList,
    pub roster: Vec<StudentOverview>,
    pub analytics: Option<ClassAnalytics>,
    pub reading: ReadingTimer,
}

impl AppState {
    pub fn new() -> Self {
        let mut marks = BTreeMap::new();
        for subject in all_subjects() {
            marks.insert(subject.to_string(), DEFAULT_MARK);
        }
        AppState {
            workspace: None,
            db: None,
            backend: None,
            session: None,
            board: BoardSlot::new(week_start_of(chrono::Local::now().date_naive())),
            marks,
            semester: 1,
            inputs: PerformanceInputs::default(),
            sections: SectionList::new(),
            roster: Vec::new(),
            analytics: None,
            reading: ReadingTimer {
                started: None,
                stored_minutes: 0.0,
            },
        }
    }

    /// Drops everything a session owns. The store connection and workspace
    /// go too; a fresh `session.init` starts over.
    pub fn reset(&mut self) {
        *self = AppState::new();
    }
}
