use crate::auth;
use crate::handlers;
use crate::state::AppState;
use axum::{middleware, routing::get, Router};

pub fn router(state: AppState) -> Router {
    let tasks = Router::new()
        .route("/", get(handlers::home).post(handlers::create_task))
        .route(
            "/toggle/:task_id/",
            get(handlers::toggle_task).post(handlers::toggle_task),
        )
        .route(
            "/delete/:task_id/",
            get(handlers::delete_task).post(handlers::delete_task),
        )
        .route("/monthly/", get(handlers::monthly))
        .route("/api/home", get(handlers::home_json))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_login,
        ));

    Router::new()
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/signup/", get(auth::signup_page).post(auth::signup))
        .route("/logout/", get(auth::logout).post(auth::logout))
        .merge(tasks)
        .with_state(state)
}
