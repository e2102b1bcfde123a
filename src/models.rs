use crate::auth::AccountBook;
use crate::store::TaskBook;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user: UserId,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub user: UserId,
    pub title: String,
    pub date: NaiveDate,
}

/// Everything persisted to the data file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    #[serde(default)]
    pub accounts: AccountBook,
    #[serde(default)]
    pub tasks: TaskBook,
}

/// Identity resolved from the session cookie, attached to each authenticated request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct HomeQuery {
    pub date: Option<String>,
    pub week: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewTaskForm {
    pub title: Option<String>,
    pub task_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[serde(rename = "none")]
    NoTasks,
    Partial,
    Complete,
}

impl CellStatus {
    pub fn from_counts(total: usize, done: usize) -> Self {
        if total == 0 {
            CellStatus::NoTasks
        } else if done == total {
            CellStatus::Complete
        } else {
            CellStatus::Partial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CellStatus::NoTasks => "none",
            CellStatus::Partial => "partial",
            CellStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub day: u32,
    pub status: CellStatus,
    pub date: NaiveDate,
}

/// Monday-first weeks of one month; days outside the month are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Option<CalendarDay>; 7]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekSummary {
    pub start: NaiveDate,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub month_name: String,
    pub year: i32,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeContext {
    pub tasks: Vec<Task>,
    pub completed: usize,
    pub total: usize,
    pub progress: u32,
    pub streak: u32,
    pub selected_date: NaiveDate,

    pub month_name: String,
    pub year: i32,
    pub calendar: MonthGrid,
    pub next_month_name: String,
    pub next_year: i32,
    pub next_calendar: MonthGrid,

    pub prev_month: String,
    pub next_month: String,
    pub week_start: NaiveDate,
    pub week_labels: Vec<String>,
    pub week_values: Vec<u64>,
    pub prev_week: String,
    pub next_week: String,
}
