use crate::errors::AppError;
use crate::models::{CurrentUser, LoginForm, LoginQuery, SignupForm, UserId};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::ui::{render_login, render_signup};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountBook {
    next_id: u64,
    accounts: Vec<Account>,
}

impl AccountBook {
    pub fn find_by_name(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }

    pub fn get(&self, id: UserId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// Validates the signup form and stores a new account.
    pub fn register(&mut self, form: &SignupForm) -> Result<Account, String> {
        let username = form.username.trim();
        if username.is_empty() {
            return Err("Username is required.".to_string());
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(format!("Username must be at most {MAX_USERNAME_LEN} characters."));
        }
        if username.chars().any(char::is_whitespace) {
            return Err("Username may not contain spaces.".to_string());
        }
        if self.find_by_name(username).is_some() {
            return Err("A user with that username already exists.".to_string());
        }
        if form.password1.is_empty() {
            return Err("Password is required.".to_string());
        }
        if form.password1 != form.password2 {
            return Err("The two password fields didn't match.".to_string());
        }

        let password_hash = hash_password(&form.password1)?;
        self.next_id += 1;
        let account = Account {
            id: UserId(self.next_id),
            username: username.to_string(),
            password_hash,
        };
        self.accounts.push(account.clone());
        Ok(account)
    }

    /// Drops an account whose registration could not be saved.
    pub fn forget(&mut self, id: UserId) {
        self.accounts.retain(|a| a.id != id);
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<&Account> {
        let account = self.find_by_name(username.trim())?;
        verify_password(password, &account.password_hash).then_some(account)
    }
}

fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| "Password hashing failed.".to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
struct Session {
    user: UserId,
    /// `None` when the lifetime runs past what the clock can represent.
    expires_at: Option<SystemTime>,
}

/// Live sessions keyed by the cookie value. Not persisted.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<String, Session>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: HashMap::new(),
        }
    }

    pub fn create(&mut self, user: UserId) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(
            id.clone(),
            Session {
                user,
                expires_at: SystemTime::now().checked_add(self.ttl),
            },
        );
        id
    }

    pub fn resolve(&mut self, session_id: &str) -> Option<UserId> {
        let now = SystemTime::now();
        self.sessions
            .retain(|_, s| s.expires_at.is_none_or(|at| at > now));
        self.sessions.get(session_id).map(|s| s.user)
    }

    pub fn end(&mut self, session_id: &str) {
        self.sessions.remove(session_id);
    }
}

fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Only same-site absolute paths are honoured as post-login targets.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let user = state.sessions.lock().await.resolve(cookie.value());
        let current = match user {
            Some(user) => {
                let data = state.data.lock().await;
                data.accounts.get(user).map(|account| CurrentUser {
                    id: account.id,
                    username: account.username.clone(),
                })
            }
            None => None,
        };
        if let Some(current) = current {
            request.extensions_mut().insert(current);
            return next.run(request).await;
        }
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    Redirect::to(&format!("/login/?next={}", urlencoding::encode(&target))).into_response()
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    Html(render_login(safe_next(query.next.as_deref()), None))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref()).to_string();
    let user = {
        let data = state.data.lock().await;
        data.accounts
            .authenticate(&form.username, &form.password)
            .map(|account| account.id)
    };

    match user {
        Some(user) => {
            let session_id = state.sessions.lock().await.create(user);
            info!(user = %user, "login");
            (jar.add(session_cookie(session_id)), Redirect::to(&next)).into_response()
        }
        None => {
            warn!(username = %form.username, "login failed");
            Html(render_login(
                &next,
                Some("Please enter a correct username and password."),
            ))
            .into_response()
        }
    }
}

pub async fn signup_page() -> Html<String> {
    Html(render_signup("", None))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let mut data = state.data.lock().await;
    let account = match data.accounts.register(&form) {
        Ok(account) => account,
        Err(message) => {
            warn!(username = %form.username, "signup rejected: {message}");
            return Ok(Html(render_signup(&form.username, Some(&message))).into_response());
        }
    };
    if let Err(err) = persist_data(&state.data_path, &data).await {
        data.accounts.forget(account.id);
        return Err(err);
    }
    drop(data);

    let session_id = state.sessions.lock().await.create(account.id);
    info!(user = %account.id, username = %account.username, "signup");
    Ok((jar.add(session_cookie(session_id)), Redirect::to("/")).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.lock().await.end(cookie.value());
        info!("logout");
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to("/login/"),
    )
}
