use crate::dashboard::{HomeParams, build_home, parse_date, redirect_after_create};
use crate::errors::AppError;
use crate::models::{CurrentUser, HomeContext, HomeQuery, MAX_TITLE_LEN, NewTask, NewTaskForm, TaskId};
use crate::state::AppState;
use crate::stats::monthly_summary;
use crate::storage::persist_data;
use crate::store::TaskStore;
use crate::ui::{render_home, render_monthly};
use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{Html, Redirect},
};
use chrono::Local;
use tracing::info;

pub async fn home(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HomeQuery>,
) -> Result<Html<String>, AppError> {
    let context = load_home(&state, &user, &query).await?;
    Ok(Html(render_home(&user, &context)))
}

pub async fn home_json(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HomeQuery>,
) -> Result<Json<HomeContext>, AppError> {
    Ok(Json(load_home(&state, &user, &query).await?))
}

async fn load_home(
    state: &AppState,
    user: &CurrentUser,
    query: &HomeQuery,
) -> Result<HomeContext, AppError> {
    let today = Local::now().date_naive();
    let params = HomeParams::parse(query, today)?;
    let data = state.data.lock().await;
    build_home(&data.tasks, user.id, params, today)
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<NewTaskForm>,
) -> Result<Redirect, AppError> {
    let title = form.title.as_deref().map(str::trim).unwrap_or_default();
    let date = parse_date(form.task_date.as_deref()).and_then(Result::ok);

    match date {
        Some(date) if !title.is_empty() && title.chars().count() <= MAX_TITLE_LEN => {
            let mut data = state.data.lock().await;
            let task = data.tasks.create(NewTask {
                user: user.id,
                title: title.to_string(),
                date,
            });
            if let Err(err) = persist_data(&state.data_path, &data).await {
                data.tasks.delete(user.id, task.id);
                return Err(err);
            }
            info!(user = %user.id, task = %task.id, date = %task.date, "task created");
        }
        _ => info!(user = %user.id, "incomplete task form ignored"),
    }

    Ok(Redirect::to(&redirect_after_create(form.task_date.as_deref())))
}

pub async fn toggle_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let mut data = state.data.lock().await;
    let task = data
        .tasks
        .toggle(user.id, TaskId(task_id))
        .ok_or_else(|| AppError::not_found("task not found"))?;
    if let Err(err) = persist_data(&state.data_path, &data).await {
        data.tasks.toggle(user.id, task.id);
        return Err(err);
    }
    info!(user = %user.id, task = %task.id, completed = task.is_completed, "task toggled");

    Ok(Redirect::to(referer(&headers)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(task_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let mut data = state.data.lock().await;
    let task = data
        .tasks
        .delete(user.id, TaskId(task_id))
        .ok_or_else(|| AppError::not_found("task not found"))?;
    if let Err(err) = persist_data(&state.data_path, &data).await {
        data.tasks.restore(task);
        return Err(err);
    }
    info!(user = %user.id, task = %task.id, "task deleted");

    Ok(Redirect::to(referer(&headers)))
}

pub async fn monthly(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Html<String> {
    let data = state.data.lock().await;
    let summary = monthly_summary(&data.tasks, user.id);
    Html(render_monthly(&user, &summary))
}

fn referer(headers: &HeaderMap) -> &str {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .unwrap_or("/")
}
