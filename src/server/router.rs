use crate::config::GoogleResolvedConfig;
use crate::db::DbActorHandle;
use crate::server::routes::{acronyms, auth, google, pages};
use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use base64::Engine as _;
use rand::RngCore;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Global cookie signing/encryption key for PrivateCookieJar.
static COOKIE_KEY: LazyLock<Key> = LazyLock::new(Key::generate);

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone)]
pub struct TilState {
    pub db: DbActorHandle,
    pub client: reqwest::Client,
    pub google: Arc<GoogleResolvedConfig>,
    pub insecure_cookie: bool,
}

impl TilState {
    pub fn new(db: DbActorHandle, google: GoogleResolvedConfig, insecure_cookie: bool) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");

        Self {
            db,
            client,
            google: Arc::new(google),
            insecure_cookie,
        }
    }
}

impl FromRef<TilState> for Key {
    fn from_ref(state: &TilState) -> Self {
        let _ = state; // state not used to fetch the static key
        COOKIE_KEY.clone()
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id` for easier correlation, even if the client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {} | {}ms",
            status.as_u16(),
            request_id,
            method.as_str(),
            path,
            latency_ms
        );
    }

    resp
}

pub fn til_router(state: TilState) -> Router {
    let pages = Router::new()
        .route("/", get(pages::index))
        .route("/acronyms/{id}", get(pages::acronym_detail))
        .route("/users", get(pages::all_users))
        .route("/users/{id}", get(pages::user_detail))
        .route("/categories", get(pages::all_categories))
        .route("/categories/{id}", get(pages::category_detail));

    let sessions = Router::new()
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route(
            "/register",
            get(auth::register_form).post(auth::register_submit),
        );

    let acronyms = Router::new()
        .route(
            "/acronyms/create",
            get(acronyms::create_form).post(acronyms::create_submit),
        )
        .route(
            "/acronyms/{id}/edit",
            get(acronyms::edit_form).post(acronyms::edit_submit),
        )
        .route("/acronyms/{id}/delete", post(acronyms::delete));

    let oauth = Router::new()
        .route("/login-google", get(google::google_oauth_entry))
        // Callback path comes from the deployment's registered redirect URL.
        .route(
            state.google.callback_path().as_str(),
            get(google::google_oauth_callback),
        );

    Router::new()
        .merge(pages)
        .merge(sessions)
        .merge(acronyms)
        .merge(oauth)
        .nest_service("/static", ServeDir::new("public"))
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
