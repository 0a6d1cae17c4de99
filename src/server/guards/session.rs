use crate::db::DbUser;
use crate::server::router::TilState;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use time::Duration;

pub const SESSION_COOKIE: &str = "til_session";
pub const FORM_TOKEN_COOKIE: &str = "til_form_token";

/// Authenticated session: resolves the session cookie to a user row.
#[derive(Debug, Clone)]
pub struct SessionUser(pub DbUser);

/// Session-aware variant: never rejects; `None` when the session is missing or stale.
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<DbUser>);

/// Rejection for protected routes; anonymous browsers land on the login form.
pub struct LoginRedirect;

impl IntoResponse for LoginRedirect {
    fn into_response(self) -> Response {
        Redirect::to("/login").into_response()
    }
}

async fn session_user(parts: &mut Parts, state: &TilState) -> Option<DbUser> {
    let jar: PrivateCookieJar =
        PrivateCookieJar::from_request_parts(parts, state).await.ok()?;
    let id = jar.get(SESSION_COOKIE)?.value().parse::<i64>().ok()?;
    state.db.get_user(id).await.ok().flatten()
}

impl FromRequestParts<TilState> for SessionUser {
    type Rejection = LoginRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &TilState,
    ) -> Result<Self, Self::Rejection> {
        session_user(parts, state)
            .await
            .map(SessionUser)
            .ok_or(LoginRedirect)
    }
}

impl FromRequestParts<TilState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &TilState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(session_user(parts, state).await))
    }
}

/// Session cookie holding the authenticated user id.
pub fn session_cookie(user_id: i64, secure: bool) -> Cookie<'static> {
    build_cookie(SESSION_COOKIE, user_id.to_string(), secure, Duration::days(7))
}

/// One-time token cookie backing the create/edit forms.
pub fn form_token_cookie(token: String, secure: bool) -> Cookie<'static> {
    build_cookie(FORM_TOKEN_COOKIE, token, secure, Duration::minutes(15))
}

/// Read and clear the one-time form token.
pub fn take_form_token(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<String>) {
    let token = jar.get(FORM_TOKEN_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::from(FORM_TOKEN_COOKIE));
    (jar, token)
}

fn build_cookie(
    name: &'static str,
    value: String,
    secure: bool,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}
