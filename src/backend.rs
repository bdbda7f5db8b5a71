use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::calc::PerformanceInputs;
use crate::week::{format_date, TaskEntry};

/// Account object returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub token_type: String,
    pub user: SessionUser,
}

/// Backend-authoritative prediction. Immutable once created; a new run is a
/// new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub predicted_score: f64,
    pub pass_fail: String,
    pub risk_category: String,
    pub confidence: f64,
    pub study_hours: f64,
    pub attendance: f64,
    pub assignments_score: f64,
    pub past_marks: f64,
    pub engagement_score: f64,
    pub created_at: String,
}

/// Fields the roster owner supplies on create/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentDraft {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub class_name: String,
    pub year: i64,
    pub section: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentOverview {
    pub id: i64,
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub class_name: String,
    pub year: i64,
    pub section: String,
    #[serde(default)]
    pub latest_prediction: Option<Prediction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low_risk: i64,
    pub medium_risk: i64,
    pub high_risk: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAnalytics {
    pub total_students: i64,
    pub total_predictions: i64,
    pub average_score: f64,
    pub risk_distribution: RiskDistribution,
    pub pass_rate: f64,
}

/// Remote collaborator behind every network edge. `Http` talks to the
/// model-serving backend; `Demo` is the offline provider selected by
/// configuration at session init, with the same surface.
pub enum Backend {
    Http(HttpBackend),
    Demo(DemoBackend),
}

impl Backend {
    pub fn mode(&self) -> &'static str {
        match self {
            Backend::Http(_) => "remote",
            Backend::Demo(_) => "demo",
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        match self {
            Backend::Http(b) => b.token = token,
            // The demo provider serves a single local user; it has no use
            // for the bearer token.
            Backend::Demo(_) => {}
        }
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<AuthSession> {
        match self {
            Backend::Http(b) => b.login(email, password),
            Backend::Demo(b) => b.login(email, password),
        }
    }

    pub fn register(
        &mut self,
        email: &str,
        password: &str,
        full_name: &str,
        role: &str,
    ) -> Result<AuthSession> {
        match self {
            Backend::Http(b) => b.register(email, password, full_name, role),
            Backend::Demo(b) => b.register(email, password, full_name, role),
        }
    }

    pub fn get_week(&self, week_start: NaiveDate) -> Result<Vec<TaskEntry>> {
        match self {
            Backend::Http(b) => b.get_week(week_start),
            Backend::Demo(b) => Ok(b.get_week(week_start)),
        }
    }

    pub fn sync_week(&mut self, week_start: NaiveDate, entries: &[TaskEntry]) -> Result<Vec<TaskEntry>> {
        match self {
            Backend::Http(b) => b.sync_week(week_start, entries),
            Backend::Demo(b) => Ok(b.sync_week(week_start, entries)),
        }
    }

    pub fn create_student(&mut self, draft: &StudentDraft) -> Result<StudentOverview> {
        match self {
            Backend::Http(b) => b.create_student(draft),
            Backend::Demo(b) => Ok(b.create_student(draft)),
        }
    }

    pub fn update_student(&mut self, id: i64, draft: &StudentDraft) -> Result<()> {
        match self {
            Backend::Http(b) => b.update_student(id, draft),
            Backend::Demo(b) => b.update_student(id, draft),
        }
    }

    pub fn delete_student(&mut self, id: i64) -> Result<()> {
        match self {
            Backend::Http(b) => b.delete_student(id),
            Backend::Demo(b) => b.delete_student(id),
        }
    }

    pub fn create_prediction(&mut self, inputs: &PerformanceInputs) -> Result<Prediction> {
        match self {
            Backend::Http(b) => b.create_prediction(inputs),
            Backend::Demo(b) => Ok(b.create_prediction(inputs)),
        }
    }

    pub fn my_predictions(&self, limit: usize) -> Result<Vec<Prediction>> {
        match self {
            Backend::Http(b) => b.my_predictions(limit),
            Backend::Demo(b) => Ok(b.my_predictions(limit)),
        }
    }

    pub fn class_analytics(&self) -> Result<ClassAnalytics> {
        match self {
            Backend::Http(b) => b.class_analytics(),
            Backend::Demo(b) => Ok(b.class_analytics()),
        }
    }

    pub fn students_overview(&self) -> Result<Vec<StudentOverview>> {
        match self {
            Backend::Http(b) => b.students_overview(),
            Backend::Demo(b) => Ok(b.students_overview()),
        }
    }

    pub fn model_info(&self) -> Result<serde_json::Value> {
        match self {
            Backend::Http(b) => b.model_info(),
            Backend::Demo(b) => Ok(b.model_info()),
        }
    }
}

pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        HttpBackend {
            agent: ureq::AgentBuilder::new().build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {}", token)),
            None => req,
        }
    }

    fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let resp = self
            .agent
            .post(&self.url("/api/auth/login"))
            .send_json(json!({ "email": email, "password": password }))
            .context("login request failed")?;
        resp.into_json().context("login response was not valid JSON")
    }

    fn register(&self, email: &str, password: &str, full_name: &str, role: &str) -> Result<AuthSession> {
        let resp = self
            .agent
            .post(&self.url("/api/auth/register"))
            .send_json(json!({
                "email": email,
                "password": password,
                "full_name": full_name,
                "role": role,
            }))
            .context("register request failed")?;
        resp.into_json().context("register response was not valid JSON")
    }

    fn get_week(&self, week_start: NaiveDate) -> Result<Vec<TaskEntry>> {
        let resp = self
            .authorize(self.agent.get(&self.url("/api/v1/weekly-tasks")))
            .query("week_start", &format_date(week_start))
            .call()
            .context("weekly-tasks fetch failed")?;
        resp.into_json().context("weekly-tasks payload was not valid JSON")
    }

    fn sync_week(&self, week_start: NaiveDate, entries: &[TaskEntry]) -> Result<Vec<TaskEntry>> {
        let resp = self
            .authorize(self.agent.post(&self.url("/api/v1/weekly-tasks")))
            .send_json(json!({
                "week_start": format_date(week_start),
                "entries": entries,
            }))
            .context("weekly-tasks sync failed")?;
        resp.into_json().context("weekly-tasks echo was not valid JSON")
    }

    fn create_student(&self, draft: &StudentDraft) -> Result<StudentOverview> {
        let resp = self
            .authorize(self.agent.post(&self.url("/api/students")))
            .send_json(draft)
            .context("student create failed")?;
        resp.into_json().context("student create response was not valid JSON")
    }

    fn update_student(&self, id: i64, draft: &StudentDraft) -> Result<()> {
        self.authorize(self.agent.put(&self.url(&format!("/api/students/{}", id))))
            .send_json(draft)
            .context("student update failed")?;
        Ok(())
    }

    fn delete_student(&self, id: i64) -> Result<()> {
        self.authorize(
            self.agent
                .delete(&self.url(&format!("/api/students/{}", id))),
        )
        .call()
        .context("student delete failed")?;
        Ok(())
    }

    fn create_prediction(&self, inputs: &PerformanceInputs) -> Result<Prediction> {
        let resp = self
            .authorize(self.agent.post(&self.url("/api/predictions")))
            .send_json(json!({
                "study_hours": inputs.study_hours,
                "attendance": inputs.attendance,
                "assignments_score": inputs.assignments_score,
                "past_marks": inputs.past_marks,
                "engagement_score": inputs.engagement_score,
            }))
            .context("prediction request failed")?;
        resp.into_json().context("prediction response was not valid JSON")
    }

    fn my_predictions(&self, limit: usize) -> Result<Vec<Prediction>> {
        let resp = self
            .authorize(self.agent.get(&self.url("/api/predictions/my")))
            .query("limit", &limit.to_string())
            .call()
            .context("prediction history fetch failed")?;
        resp.into_json().context("prediction history was not valid JSON")
    }

    fn class_analytics(&self) -> Result<ClassAnalytics> {
        let resp = self
            .authorize(self.agent.get(&self.url("/api/predictions/class/analytics")))
            .call()
            .context("class analytics fetch failed")?;
        resp.into_json().context("class analytics was not valid JSON")
    }

    fn students_overview(&self) -> Result<Vec<StudentOverview>> {
        let resp = self
            .authorize(
                self.agent
                    .get(&self.url("/api/predictions/class/students-overview")),
            )
            .call()
            .context("students overview fetch failed")?;
        resp.into_json().context("students overview was not valid JSON")
    }

    fn model_info(&self) -> Result<serde_json::Value> {
        let resp = self
            .authorize(self.agent.get(&self.url("/api/info/model")))
            .call()
            .context("model info fetch failed")?;
        resp.into_json().context("model info was not valid JSON")
    }
}

/// Offline provider with the remote surface served from memory. Week syncs
/// round-trip through an in-memory store keyed by week-start date, and
/// predictions use the backend's published constants (risk tiers at 75/60,
/// pass at 50, fallback confidence 0.85).
pub struct DemoBackend {
    weeks: HashMap<String, Vec<TaskEntry>>,
    students: Vec<StudentOverview>,
    predictions: Vec<Prediction>,
    next_student_id: i64,
    next_prediction_id: i64,
}

fn demo_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

impl DemoBackend {
    pub fn new() -> Self {
        let seed = |id: i64,
                    code: &str,
                    name: &str,
                    email: &str,
                    prediction: Prediction| StudentOverview {
            id,
            student_id: code.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            class_name: "CS101".to_string(),
            year: 2,
            section: "A".to_string(),
            latest_prediction: Some(prediction),
        };
        let pred = |id: i64, score: f64, pass: &str, risk: &str, confidence: f64, inputs: [f64; 5]| {
            Prediction {
                id,
                predicted_score: score,
                pass_fail: pass.to_string(),
                risk_category: risk.to_string(),
                confidence,
                study_hours: inputs[0],
                attendance: inputs[1],
                assignments_score: inputs[2],
                past_marks: inputs[3],
                engagement_score: inputs[4],
                created_at: demo_timestamp(),
            }
        };

        DemoBackend {
            weeks: HashMap::new(),
            students: vec![
                seed(
                    1,
                    "ST101",
                    "Asha Patel",
                    "asha@school.com",
                    pred(11, 48.0, "Fail", "High", 0.72, [2.0, 60.0, 40.0, 52.0, 3.0]),
                ),
                seed(
                    2,
                    "ST102",
                    "Ravi Kumar",
                    "ravi@school.com",
                    pred(12, 82.0, "Pass", "Low", 0.91, [8.0, 95.0, 90.0, 86.0, 9.0]),
                ),
                seed(
                    3,
                    "ST103",
                    "Meera Singh",
                    "meera@school.com",
                    pred(13, 70.0, "Pass", "Medium", 0.80, [5.0, 84.0, 72.0, 68.0, 6.0]),
                ),
            ],
            predictions: Vec::new(),
            next_student_id: 4,
            next_prediction_id: 14,
        }
    }

    fn issue_session(&self, email: &str, full_name: &str, role: &str) -> AuthSession {
        AuthSession {
            access_token: format!("demo-{}", Uuid::new_v4()),
            token_type: "bearer".to_string(),
            user: SessionUser {
                id: 1,
                email: email.to_string(),
                full_name: full_name.to_string(),
                role: role.to_string(),
            },
        }
    }

    fn login(&self, email: &str, _password: &str) -> Result<AuthSession> {
        Ok(self.issue_session(email, "Demo User", "student"))
    }

    fn register(&self, email: &str, _password: &str, full_name: &str, role: &str) -> Result<AuthSession> {
        Ok(self.issue_session(email, full_name, role))
    }

    fn get_week(&self, week_start: NaiveDate) -> Vec<TaskEntry> {
        self.weeks
            .get(&format_date(week_start))
            .cloned()
            .unwrap_or_default()
    }

    fn sync_week(&mut self, week_start: NaiveDate, entries: &[TaskEntry]) -> Vec<TaskEntry> {
        let stored = entries.to_vec();
        self.weeks.insert(format_date(week_start), stored.clone());
        stored
    }

    fn create_student(&mut self, draft: &StudentDraft) -> StudentOverview {
        let student = StudentOverview {
            id: self.next_student_id,
            student_id: draft.student_id.clone(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            class_name: draft.class_name.clone(),
            year: draft.year,
            section: draft.section.clone(),
            latest_prediction: None,
        };
        self.next_student_id += 1;
        self.students.push(student.clone());
        student
    }

    fn update_student(&mut self, id: i64, draft: &StudentDraft) -> Result<()> {
        let Some(student) = self.students.iter_mut().find(|s| s.id == id) else {
            return Err(anyhow!("student {} not found", id));
        };
        student.student_id = draft.student_id.clone();
        student.name = draft.name.clone();
        student.email = draft.email.clone();
        student.class_name = draft.class_name.clone();
        student.year = draft.year;
        student.section = draft.section.clone();
        Ok(())
    }

    fn delete_student(&mut self, id: i64) -> Result<()> {
        let before = self.students.len();
        self.students.retain(|s| s.id != id);
        if self.students.len() == before {
            return Err(anyhow!("student {} not found", id));
        }
        Ok(())
    }

    fn create_prediction(&mut self, inputs: &PerformanceInputs) -> Prediction {
        let blend = (inputs.study_hours / 24.0) * 0.25
            + (inputs.attendance / 100.0) * 0.25
            + (inputs.assignments_score / 100.0) * 0.20
            + (inputs.past_marks / 100.0) * 0.20
            + (inputs.engagement_score / 10.0) * 0.10;
        let score = ((blend * 100.0) * 100.0).round() / 100.0;
        let risk = if score >= 75.0 {
            "Low"
        } else if score >= 60.0 {
            "Medium"
        } else {
            "High"
        };
        let prediction = Prediction {
            id: self.next_prediction_id,
            predicted_score: score,
            pass_fail: if score >= 50.0 { "Pass" } else { "Fail" }.to_string(),
            risk_category: risk.to_string(),
            confidence: 0.85,
            study_hours: inputs.study_hours,
            attendance: inputs.attendance,
            assignments_score: inputs.assignments_score,
            past_marks: inputs.past_marks,
            engagement_score: inputs.engagement_score,
            created_at: demo_timestamp(),
        };
        self.next_prediction_id += 1;
        self.predictions.push(prediction.clone());
        prediction
    }

    fn my_predictions(&self, limit: usize) -> Vec<Prediction> {
        self.predictions
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    fn class_analytics(&self) -> ClassAnalytics {
        let latest: Vec<&Prediction> = self
            .students
            .iter()
            .filter_map(|s| s.latest_prediction.as_ref())
            .collect();
        let total = latest.len() as i64;
        let average_score = if latest.is_empty() {
            0.0
        } else {
            latest.iter().map(|p| p.predicted_score).sum::<f64>() / latest.len() as f64
        };
        let count_risk = |risk: &str| latest.iter().filter(|p| p.risk_category == risk).count() as i64;
        let pass_rate = if latest.is_empty() {
            0.0
        } else {
            100.0 * latest.iter().filter(|p| p.pass_fail == "Pass").count() as f64
                / latest.len() as f64
        };
        ClassAnalytics {
            total_students: self.students.len() as i64,
            total_predictions: total + self.predictions.len() as i64,
            average_score,
            risk_distribution: RiskDistribution {
                low_risk: count_risk("Low"),
                medium_risk: count_risk("Medium"),
                high_risk: count_risk("High"),
            },
            pass_rate,
        }
    }

    fn students_overview(&self) -> Vec<StudentOverview> {
        self.students.clone()
    }

    fn model_info(&self) -> serde_json::Value {
        json!({
            "algorithm": "RandomForestRegressor + LogisticRegression",
            "features": [
                "study_hours",
                "attendance",
                "assignments_score",
                "past_marks",
                "engagement_score"
            ],
            "performance": {
                "regression": { "rmse": 4.8, "r2_score": 0.89, "mse": 23.0 },
                "classification": { "accuracy": 0.92 }
            },
            "risk_thresholds": { "low_risk": 75, "medium_risk": 60, "high_risk": 0 },
            "version": "1.0",
            "training_date": "2026-01-05T00:00:00"
        })
    }
}
