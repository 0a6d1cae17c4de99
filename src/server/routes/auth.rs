use crate::db::UserCreate;
use crate::error::TilError;
use crate::server::guards::session::{self, SESSION_COOKIE};
use crate::server::router::TilState;
use crate::utils::password;
use crate::views::{self, LoginPage, RegisterPage};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    Form,
    cookie::{Cookie, PrivateCookieJar},
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Presence alone signals a failed attempt; the value is ignored.
    pub error: Option<String>,
}

/// GET /login
pub async fn login_form(Query(query): Query<LoginQuery>) -> Result<impl IntoResponse, TilError> {
    views::render(&LoginPage {
        title: "Log In",
        login_error: query.error.is_some(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
}

/// POST /login
pub async fn login_submit(
    State(state): State<TilState>,
    jar: PrivateCookieJar,
    Form(data): Form<LoginData>,
) -> Result<Response, TilError> {
    let Some(user) = state.db.find_user_by_username(data.username).await? else {
        return Ok(Redirect::to("/login?error").into_response());
    };

    if !password::verify_password(&data.password, &user.password_hash) {
        return Ok(Redirect::to("/login?error").into_response());
    }

    info!(user_id = user.id, "password login succeeded");
    let jar = jar.add(session::session_cookie(user.id, !state.insecure_cookie));
    Ok((jar, Redirect::to("/")).into_response())
}

/// POST /logout
pub async fn logout(jar: PrivateCookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    (jar, Redirect::to("/"))
}

#[derive(Debug, Deserialize)]
pub struct RegisterQuery {
    pub message: Option<String>,
}

/// GET /register
pub async fn register_form(
    Query(query): Query<RegisterQuery>,
) -> Result<impl IntoResponse, TilError> {
    views::render(&RegisterPage {
        title: "Register",
        message: query.message,
    })
}

#[derive(Debug, Deserialize)]
pub struct RegisterData {
    pub name: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub twitter_url: Option<String>,
}

impl RegisterData {
    /// First failed rule wins; the message lands in `/register?message=`.
    fn validate(&self) -> Result<(), &'static str> {
        if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii()) {
            return Err("name must use ASCII characters only");
        }
        if self.username.len() < 3
            || !self.username.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err("username must be alphanumeric and at least 3 characters long");
        }
        if self.password.len() < 8 {
            return Err("password must be at least 8 characters long");
        }
        if self.password != self.confirm_password {
            return Err("password not match");
        }
        Ok(())
    }
}

fn register_redirect(message: &str) -> Redirect {
    let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
    Redirect::to(&format!("/register?message={encoded}"))
}

/// POST /register
pub async fn register_submit(
    State(state): State<TilState>,
    jar: PrivateCookieJar,
    Form(data): Form<RegisterData>,
) -> Result<Response, TilError> {
    if let Err(reason) = data.validate() {
        return Ok(register_redirect(reason).into_response());
    }

    if state
        .db
        .find_user_by_username(data.username.clone())
        .await?
        .is_some()
    {
        return Ok(register_redirect("username is already taken").into_response());
    }

    let password_hash = password::hash_password(&data.password)?;
    let twitter_url = data.twitter_url.filter(|t| !t.is_empty());

    let user = state
        .db
        .create_user(UserCreate {
            name: data.name,
            username: data.username,
            password_hash,
            twitter_url,
        })
        .await?;

    info!(user_id = user.id, "registered new account");
    let jar = jar.add(session::session_cookie(user.id, !state.insecure_cookie));
    Ok((jar, Redirect::to("/")).into_response())
}
