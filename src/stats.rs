use crate::models::{CalendarDay, CellStatus, MonthGrid, MonthlySummary, UserId, WeekSummary};
use crate::store::{TaskQuery, TaskStore};
use chrono::{Datelike, Duration, Local, Month, Months, NaiveDate};

/// Task counts for the seven days starting at `start`. Values are total tasks per day,
/// completed or not. `None` when the week runs past the last representable date.
pub fn week_summary<S: TaskStore + ?Sized>(
    store: &S,
    user: UserId,
    start: NaiveDate,
) -> Option<WeekSummary> {
    let mut labels = Vec::with_capacity(7);
    let mut values = Vec::with_capacity(7);

    for offset in 0..7 {
        let date = start.checked_add_signed(Duration::days(offset))?;
        labels.push(date.format("%a").to_string());
        values.push(store.count(&TaskQuery::owner(user).on(date)) as u64);
    }

    Some(WeekSummary {
        start,
        labels,
        values,
    })
}

/// Calendar grid for `year`-`month` with Monday as the first weekday.
/// Returns `None` for an out-of-range month.
pub fn month_grid<S: TaskStore + ?Sized>(
    store: &S,
    user: UserId,
    year: i32,
    month: u32,
) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = days_in_month(first)?;
    let lead = first.weekday().num_days_from_monday() as usize;

    let mut cells: Vec<Option<CalendarDay>> = vec![None; lead];
    for day in 1..=days {
        let date = first.with_day(day)?;
        let tasks = store.tasks_on(user, date);
        let done = tasks.iter().filter(|task| task.is_completed).count();
        cells.push(Some(CalendarDay {
            day,
            status: CellStatus::from_counts(tasks.len(), done),
            date,
        }));
    }
    while cells.len() % 7 != 0 {
        cells.push(None);
    }

    let weeks = cells
        .chunks(7)
        .map(|chunk| std::array::from_fn(|i| chunk[i].clone()))
        .collect();

    Some(MonthGrid { year, month, weeks })
}

pub fn streak<S: TaskStore + ?Sized>(store: &S, user: UserId) -> u32 {
    streak_at(store, user, Local::now().date_naive())
}

/// Consecutive days ending at `today` on which at least one task exists and all are done.
pub fn streak_at<S: TaskStore + ?Sized>(store: &S, user: UserId, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;

    loop {
        let tasks = store.tasks_on(user, day);
        if tasks.is_empty() || tasks.iter().any(|task| !task.is_completed) {
            break;
        }
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }

    streak
}

pub fn monthly_summary<S: TaskStore + ?Sized>(store: &S, user: UserId) -> MonthlySummary {
    monthly_summary_at(store, user, Local::now().date_naive())
}

/// Completed-task counts per day of `today`'s month, only for days with at least one.
pub fn monthly_summary_at<S: TaskStore + ?Sized>(
    store: &S,
    user: UserId,
    today: NaiveDate,
) -> MonthlySummary {
    let query = TaskQuery::owner(user)
        .in_month(today.year(), today.month())
        .completed(true);

    let mut per_day: std::collections::BTreeMap<NaiveDate, u64> = Default::default();
    for task in store.find(&query) {
        *per_day.entry(task.date).or_default() += 1;
    }

    MonthlySummary {
        month_name: month_name(today.month()),
        year: today.year(),
        labels: per_day.keys().map(|d| d.format("%d").to_string()).collect(),
        values: per_day.values().copied().collect(),
    }
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

fn days_in_month(first: NaiveDate) -> Option<u32> {
    let next = first.checked_add_months(Months::new(1))?;
    Some((next - first).num_days() as u32)
}
