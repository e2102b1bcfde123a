use crate::errors::AppError;
use crate::models::{HomeContext, HomeQuery, UserId};
use crate::stats::{month_grid, month_name, streak_at, week_start, week_summary};
use crate::store::{TaskQuery, TaskStore};
use chrono::{Datelike, Duration, Months, NaiveDate};

/// Parsed and defaulted home-page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HomeParams {
    pub selected_date: NaiveDate,
    pub week_start: NaiveDate,
}

impl HomeParams {
    pub fn parse(query: &HomeQuery, today: NaiveDate) -> Result<Self, AppError> {
        let selected_date = parse_param("date", query.date.as_deref())?.unwrap_or(today);
        let week_start = parse_param("week", query.week.as_deref())?
            .unwrap_or_else(|| week_start(today));
        Ok(Self {
            selected_date,
            week_start,
        })
    }
}

/// Parses an ISO date; empty or missing values are `None`.
pub fn parse_date(value: Option<&str>) -> Option<Result<NaiveDate, chrono::ParseError>> {
    value
        .filter(|raw| !raw.is_empty())
        .map(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
}

/// A bad query date is fatal to the request and surfaces as a server error.
fn parse_param(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    parse_date(value)
        .transpose()
        .map_err(|err| AppError::server(format!("invalid {name} parameter: {err}")))
}

fn out_of_range() -> AppError {
    AppError::server("date out of range")
}

pub fn progress(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * completed as f64 / total as f64).round() as u32
}

pub fn build_home<S: TaskStore + ?Sized>(
    store: &S,
    user: UserId,
    params: HomeParams,
    today: NaiveDate,
) -> Result<HomeContext, AppError> {
    let selected = params.selected_date;
    let tasks = store.tasks_on(user, selected);
    let total = tasks.len();
    let completed = store.count(&TaskQuery::owner(user).on(selected).completed(true));

    let month_start = selected.with_day(1).unwrap_or(selected);
    let next_month_start = month_start
        .checked_add_months(Months::new(1))
        .ok_or_else(out_of_range)?;
    let prev_month_start = month_start
        .checked_sub_months(Months::new(1))
        .ok_or_else(out_of_range)?;

    let calendar = month_grid(store, user, month_start.year(), month_start.month())
        .ok_or_else(out_of_range)?;
    let next_calendar = month_grid(store, user, next_month_start.year(), next_month_start.month())
        .ok_or_else(out_of_range)?;

    let week = week_summary(store, user, params.week_start).ok_or_else(out_of_range)?;
    let prev_week = params
        .week_start
        .checked_sub_signed(Duration::days(7))
        .ok_or_else(out_of_range)?;
    let next_week = params
        .week_start
        .checked_add_signed(Duration::days(7))
        .ok_or_else(out_of_range)?;

    Ok(HomeContext {
        tasks,
        completed,
        total,
        progress: progress(completed, total),
        streak: streak_at(store, user, today),
        selected_date: selected,

        month_name: month_name(month_start.month()),
        year: month_start.year(),
        calendar,
        next_month_name: month_name(next_month_start.month()),
        next_year: next_month_start.year(),
        next_calendar,

        prev_month: prev_month_start.to_string(),
        next_month: next_month_start.to_string(),
        week_start: params.week_start,
        week_labels: week.labels,
        week_values: week.values,
        prev_week: prev_week.to_string(),
        next_week: next_week.to_string(),
    })
}

/// Where `POST /` sends the browser afterwards.
pub fn redirect_after_create(task_date: Option<&str>) -> String {
    match parse_date(task_date) {
        Some(Ok(date)) => format!("/?date={date}"),
        _ => "/".to_string(),
    }
}
