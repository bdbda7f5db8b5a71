use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::backend::StudentOverview;

pub const DEFAULT_MARK: i64 = 75;
pub const BACKLOG_THRESHOLD: i64 = 40;

pub const SEMESTER_OPTIONS: [i64; 4] = [1, 2, 3, 4];

/// Subject catalog per semester. The mark book scopes visibility and
/// aggregation to the active semester's list.
pub fn semester_subjects(semester: i64) -> Option<&'static [&'static str]> {
    match semester {
        1 => Some(&[
            "Engineering Mathematics I",
            "Engineering Physics",
            "Engineering Chemistry",
            "Basic Electrical & Electronics Engineering",
            "Programming in C",
        ]),
        2 => Some(&[
            "Engineering Mathematics II",
            "Workshop / Manufacturing Practices",
            "Engineering Graphics",
            "Environmental Science & Engineering",
            "Professional Communication & Ethics",
        ]),
        3 => Some(&[
            "Data Structures",
            "Discrete Mathematics",
            "Object Oriented Programming",
            "Computer Organization",
            "Design and Analysis of Algorithms",
            "Operating Systems",
        ]),
        4 => Some(&[
            "Database Management Systems",
            "Computer Networks",
            "Software Engineering",
            "Theory of Computation",
            "Compiler Design",
            "Artificial Intelligence / Machine Learning (elective)",
            "Mobile Application Development",
        ]),
        _ => None,
    }
}

pub fn all_subjects() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for semester in SEMESTER_OPTIONS {
        for subject in semester_subjects(semester).unwrap_or(&[]) {
            if !out.contains(subject) {
                out.push(*subject);
            }
        }
    }
    out
}

pub fn clamp_mark(value: i64) -> i64 {
    value.clamp(0, 100)
}

/// Inserts every subject missing from the map at the default mark. Retain
/// policy: subjects that left the active list keep their marks, so switching
/// semesters back restores prior values.
pub fn ensure_subjects(marks: &mut BTreeMap<String, i64>, subjects: &[&str]) {
    for subject in subjects {
        marks.entry((*subject).to_string()).or_insert(DEFAULT_MARK);
    }
}

pub fn set_mark(marks: &mut BTreeMap<String, i64>, subject: &str, value: i64) {
    marks.insert(subject.to_string(), clamp_mark(value));
}

pub fn average_mark(marks: &BTreeMap<String, i64>, subjects: &[&str]) -> i64 {
    if subjects.is_empty() {
        return 0;
    }
    let total: i64 = subjects
        .iter()
        .map(|s| marks.get(*s).copied().unwrap_or(0))
        .sum();
    (total as f64 / subjects.len() as f64).round() as i64
}

pub fn backlog_subjects<'a>(marks: &BTreeMap<String, i64>, subjects: &[&'a str]) -> Vec<&'a str> {
    subjects
        .iter()
        .filter(|s| marks.get(**s).copied().unwrap_or(0) < BACKLOG_THRESHOLD)
        .copied()
        .collect()
}

/// Four-tier display label for a single mark. Monotonic: a higher mark never
/// maps to a worse tier.
pub fn mark_tier(mark: i64) -> &'static str {
    if mark >= 80 {
        "High"
    } else if mark >= 60 {
        "Medium"
    } else if mark >= BACKLOG_THRESHOLD {
        "Low"
    } else {
        "Backlog"
    }
}

/// Average mark per catalog semester, for the term-over-term trend.
pub fn semester_averages(marks: &BTreeMap<String, i64>) -> Vec<(i64, i64)> {
    SEMESTER_OPTIONS
        .iter()
        .map(|semester| {
            let subjects = semester_subjects(*semester).unwrap_or(&[]);
            (*semester, average_mark(marks, subjects))
        })
        .collect()
}

/// Heuristic performance score from the three board-derived indicators.
/// Weights are fixed and sum to 1.0; the streak is capped at a full week so
/// it cannot over-contribute. This is a local estimate, not the backend's
/// predicted score.
pub fn performance_score(average_mark: i64, longest_streak: i64, completion_percent: i64) -> i64 {
    let mark_part = average_mark as f64 / 100.0;
    let streak_part = (longest_streak as f64 / 7.0).min(1.0);
    let task_part = completion_percent as f64 / 100.0;
    ((mark_part * 0.60 + streak_part * 0.25 + task_part * 0.15) * 100.0).round() as i64
}

/// The five slider-backed inputs feeding both the local confidence estimate
/// and backend prediction requests. Every write clamps to the field's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInputs {
    pub study_hours: f64,
    pub attendance: f64,
    pub assignments_score: f64,
    pub past_marks: f64,
    pub engagement_score: f64,
}

impl Default for PerformanceInputs {
    fn default() -> Self {
        PerformanceInputs {
            study_hours: 6.0,
            attendance: 85.0,
            assignments_score: 80.0,
            past_marks: 75.0,
            engagement_score: 7.0,
        }
    }
}

impl PerformanceInputs {
    pub fn is_field(key: &str) -> bool {
        matches!(
            key,
            "studyHours" | "attendance" | "assignmentsScore" | "pastMarks" | "engagementScore"
        )
    }

    /// Applies one field by its wire name. Returns false for an unknown
    /// field so callers can reject the patch instead of guessing.
    pub fn set_field(&mut self, key: &str, value: f64) -> bool {
        match key {
            "studyHours" => self.study_hours = value.clamp(0.0, 24.0),
            "attendance" => self.attendance = value.clamp(0.0, 100.0),
            "assignmentsScore" => self.assignments_score = value.clamp(0.0, 100.0),
            "pastMarks" => self.past_marks = value.clamp(0.0, 100.0),
            "engagementScore" => self.engagement_score = value.clamp(0.0, 10.0),
            _ => return false,
        }
        true
    }

    pub fn clamped(mut self) -> Self {
        self.study_hours = self.study_hours.clamp(0.0, 24.0);
        self.attendance = self.attendance.clamp(0.0, 100.0);
        self.assignments_score = self.assignments_score.clamp(0.0, 100.0);
        self.past_marks = self.past_marks.clamp(0.0, 100.0);
        self.engagement_score = self.engagement_score.clamp(0.0, 10.0);
        self
    }
}

/// Fixed-weight confidence percentage over the five normalized inputs.
pub fn confidence_estimate(inputs: &PerformanceInputs) -> i64 {
    let blend = (inputs.study_hours / 24.0) * 0.25
        + (inputs.attendance / 100.0) * 0.25
        + (inputs.assignments_score / 100.0) * 0.20
        + (inputs.past_marks / 100.0) * 0.20
        + (inputs.engagement_score / 10.0) * 0.10;
    (blend * 100.0).round() as i64
}

/// Risk label for the heuristic score shown on the student dashboard.
/// Distinct from the backend's risk category on a Prediction.
pub fn score_risk_category(score: i64) -> &'static str {
    if score >= 70 {
        "Low"
    } else if score >= 45 {
        "Medium"
    } else {
        "High"
    }
}

pub fn pass_hint(score: i64) -> &'static str {
    if score >= 50 {
        "Expected to Pass"
    } else {
        "At Risk of Failing"
    }
}

pub fn action_tip(risk: &str) -> &'static str {
    match risk {
        "High" => {
            "High risk: elevate attendance, complete assignments, and extend study sessions to reduce volatility."
        }
        "Medium" => {
            "Medium risk: keep streaks intact, clear backlog subjects, and check in with mentors before the next prediction run."
        }
        _ => {
            "Low risk: you are on track. Keep logging tasks, maintain attendance, and support peers with insights."
        }
    }
}

/// Order-preserving roster filter. `risk` of "all" disables the risk test;
/// otherwise a student matches only when their latest prediction carries the
/// requested category.
pub fn filter_roster<'a>(
    students: &'a [StudentOverview],
    year: i64,
    section: &str,
    risk: &str,
) -> Vec<&'a StudentOverview> {
    students
        .iter()
        .filter(|s| s.year == year && s.section == section)
        .filter(|s| {
            if risk == "all" {
                return true;
            }
            s.latest_prediction
                .as_ref()
                .map(|p| p.risk_category == risk)
                .unwrap_or(false)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionError {
    EmptyName,
    Duplicate,
    LastSection,
    NotFound,
}

/// Ordered list of section labels with a selected entry. Labels are
/// case-normalized before insertion; the list never becomes empty.
#[derive(Debug, Clone)]
pub struct SectionList {
    labels: Vec<String>,
    selected: usize,
}

impl SectionList {
    pub fn new() -> Self {
        SectionList {
            labels: vec!["A".to_string()],
            selected: 0,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn selected_label(&self) -> &str {
        &self.labels[self.selected]
    }

    fn normalize(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Adds a section and makes it the selection.
    pub fn add(&mut self, raw: &str) -> Result<String, SectionError> {
        let label = Self::normalize(raw);
        if label.is_empty() {
            return Err(SectionError::EmptyName);
        }
        if self.labels.contains(&label) {
            return Err(SectionError::Duplicate);
        }
        self.labels.push(label.clone());
        self.selected = self.labels.len() - 1;
        Ok(label)
    }

    /// Removes a section. The last remaining section cannot be removed;
    /// removing the selected one moves selection to the first remaining.
    pub fn remove(&mut self, raw: &str) -> Result<(), SectionError> {
        let label = Self::normalize(raw);
        let Some(idx) = self.labels.iter().position(|l| *l == label) else {
            return Err(SectionError::NotFound);
        };
        if self.labels.len() == 1 {
            return Err(SectionError::LastSection);
        }
        let removed_selected = idx == self.selected;
        self.labels.remove(idx);
        if removed_selected {
            self.selected = 0;
        } else if idx < self.selected {
            self.selected -= 1;
        }
        Ok(())
    }

    pub fn select(&mut self, raw: &str) -> Result<(), SectionError> {
        let label = Self::normalize(raw);
        let Some(idx) = self.labels.iter().position(|l| *l == label) else {
            return Err(SectionError::NotFound);
        };
        self.selected = idx;
        Ok(())
    }

    /// Rebuilds a list from persisted labels, re-normalizing and dropping
    /// duplicates. An empty or all-invalid payload falls back to the default
    /// list so the non-empty invariant holds.
    pub fn restore(raw_labels: &[String], selected: &str) -> Self {
        let mut labels: Vec<String> = Vec::new();
        for raw in raw_labels {
            let label = Self::normalize(raw);
            if !label.is_empty() && !labels.contains(&label) {
                labels.push(label);
            }
        }
        if labels.is_empty() {
            labels.push("A".to_string());
        }
        let wanted = Self::normalize(selected);
        let selected = labels.iter().position(|l| *l == wanted).unwrap_or(0);
        SectionList { labels, selected }
    }
}
