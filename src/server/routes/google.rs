use crate::db::UserCreate;
use crate::error::TilError;
use crate::google::{endpoints::GoogleOauthEndpoints, userinfo};
use crate::server::guards::session;
use crate::server::router::TilState;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use oauth2::{AuthorizationCode, PkceCodeChallenge, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use time::Duration;
use tracing::{error, info};

const CSRF_COOKIE: &str = "google_oauth_csrf_token";
const PKCE_COOKIE: &str = "google_oauth_pkce_verifier";

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: String,
    pub state: String,
}

/// GET /login-google
///
/// Starts the Google OAuth2 PKCE flow and redirects the browser to the consent screen.
pub async fn google_oauth_entry(
    State(state): State<TilState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, TilError> {
    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = GoogleOauthEndpoints::build_authorize_url(&state.google, challenge);

    let jar = jar
        .add(build_cookie(
            CSRF_COOKIE,
            csrf_token.secret().to_string(),
            !state.insecure_cookie,
        ))
        .add(build_cookie(
            PKCE_COOKIE,
            verifier.secret().to_string(),
            !state.insecure_cookie,
        ));

    info!("Dispatching Google OAuth redirect to: {}", auth_url);
    Ok((jar, Redirect::temporary(auth_url.as_ref())).into_response())
}

/// GET at the path of the configured callback URL.
pub async fn google_oauth_callback(
    State(state): State<TilState>,
    Query(query): Query<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> impl IntoResponse {
    let (jar, flow) = take_oauth_cookies(jar);

    match process_google_login(&state, &query, flow).await {
        Ok(user_id) => {
            info!(user_id, "Google login established a session");
            let jar = jar.add(session::session_cookie(user_id, !state.insecure_cookie));
            (jar, Redirect::to("/")).into_response()
        }
        Err(err) => {
            error!("Google OAuth failure: {err}");
            (jar, err.into_response()).into_response()
        }
    }
}

async fn process_google_login(
    state: &TilState,
    query: &AuthCallbackQuery,
    flow: Option<(String, String)>,
) -> Result<i64, TilError> {
    let (pkce_verifier, csrf_token) = flow.ok_or_else(|| TilError::OauthFlow {
        code: "OAUTH_SESSION_MISSING".to_string(),
        message: "Missing OAuth flow cookies".to_string(),
    })?;

    if query.state != csrf_token {
        return Err(TilError::OauthFlow {
            code: "STATE_MISMATCH".to_string(),
            message: "OAuth state parameter mismatch".to_string(),
        });
    }

    let token_response = GoogleOauthEndpoints::exchange_authorization_code(
        &state.google,
        AuthorizationCode::new(query.code.clone()),
        PkceCodeVerifier::new(pkce_verifier),
        state.client.clone(),
    )
    .await?;

    let info = userinfo::fetch_user_info(
        &state.google,
        token_response.access_token().secret(),
        &state.client,
    )
    .await?;

    // Google identities reuse the local account whose username is the e-mail.
    if let Some(existing) = state.db.find_user_by_username(info.email.clone()).await? {
        return Ok(existing.id);
    }

    // Delegated accounts carry a blank password hash; the password form rejects them.
    let user = state
        .db
        .create_user(UserCreate {
            name: info.name,
            username: info.email,
            password_hash: String::new(),
            twitter_url: None,
        })
        .await?;

    Ok(user.id)
}

fn take_oauth_cookies(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<(String, String)>) {
    let csrf = jar.get(CSRF_COOKIE).map(|c| c.value().to_string());
    let pkce = jar.get(PKCE_COOKIE).map(|c| c.value().to_string());

    let jar = jar
        .remove(Cookie::from(CSRF_COOKIE))
        .remove(Cookie::from(PKCE_COOKIE));

    match (pkce, csrf) {
        (Some(p), Some(c)) => (jar, Some((p, c))),
        _ => (jar, None),
    }
}

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}
