use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use url::Url;

fn unique_sqlite_path(prefix: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!("til-{prefix}-{}-{}.sqlite", std::process::id(), nanos));
    temp_path
}

async fn test_app(prefix: &str) -> (Router, til::DbActorHandle, std::path::PathBuf) {
    let db_path = unique_sqlite_path(prefix);
    let database_url = format!("sqlite:{}", db_path.display());
    let db = til::db::spawn(&database_url).await;

    let mut google = til::config::GoogleConfig::default();
    google.callback_url = Some(Url::parse("http://localhost:8188/oauth-callback").unwrap());
    let google = google.resolve().expect("callback url set");

    let state = til::server::router::TilState::new(db.clone(), google, true);
    (til::server::router::til_router(state), db, db_path)
}

#[derive(Default)]
struct CookieStore {
    cookies: BTreeMap<String, String>,
}

impl CookieStore {
    fn update(&mut self, headers: &axum::http::HeaderMap) {
        for v in headers.get_all(header::SET_COOKIE).iter() {
            let s = v.to_str().expect("set-cookie header was not valid utf-8");
            let first = s.split(';').next().unwrap_or("");
            let Some((name, value)) = first.split_once('=') else {
                continue;
            };
            if value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_string(), value.to_string());
            }
        }
    }

    fn header(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn form_post(uri: &str, cookies: &CookieStore, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::COOKIE, cookies.header())
        .body(Body::from(body))
        .expect("build request")
}

fn get(uri: &str, cookies: &CookieStore) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookies.header())
        .body(Body::empty())
        .expect("build request")
}

/// Pull the one-time token out of the rendered form.
fn extract_form_token(body: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = body.find(marker).expect("csrf token input not found") + marker.len();
    let rest = &body[start..];
    let end = rest.find('"').expect("unterminated csrf token value");
    rest[..end].to_string()
}

async fn body_string(resp: axum::http::Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

/// Register an account and return its session cookies.
async fn register(app: &Router, username: &str) -> CookieStore {
    let body = format!(
        "name=Test&username={username}&password=password123&confirm_password=password123"
    );
    let resp = app
        .clone()
        .oneshot(form_post("/register", &CookieStore::default(), body))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());

    let mut store = CookieStore::default();
    store.update(resp.headers());
    store
}

#[tokio::test]
async fn create_requires_matching_form_token() {
    let (app, db, db_path) = test_app("acronym-csrf").await;
    let mut store = register(&app, "alice").await;

    // No token cookie at all: rejected outright.
    let resp = app
        .clone()
        .oneshot(form_post(
            "/acronyms/create",
            &store,
            "short=FTW&long=For+The+Win&csrf_token=bogus".to_string(),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Fetch the form so the session holds a real token, then submit a different one.
    let resp = app
        .clone()
        .oneshot(get("/acronyms/create", &store))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    store.update(resp.headers());

    let resp = app
        .clone()
        .oneshot(form_post(
            "/acronyms/create",
            &store,
            "short=FTW&long=For+The+Win&csrf_token=not-the-issued-token".to_string(),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(db.list_acronyms().await.unwrap().is_empty());

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn create_with_token_attaches_categories_and_redirects() {
    let (app, db, db_path) = test_app("acronym-create").await;
    let mut store = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(get("/acronyms/create", &store))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    store.update(resp.headers());
    let token = extract_form_token(&body_string(resp).await);

    let resp = app
        .clone()
        .oneshot(form_post(
            "/acronyms/create",
            &store,
            format!(
                "short=FTW&long=For+The+Win&categories=Slang&categories=Internet&csrf_token={token}"
            ),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    store.update(resp.headers());

    let acronyms = db.list_acronyms().await.unwrap();
    assert_eq!(acronyms.len(), 1);
    assert_eq!(acronyms[0].short, "FTW");
    assert_eq!(acronyms[0].long, "For The Win");

    let location = resp
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(location, format!("/acronyms/{}", acronyms[0].id));

    let categories = db.categories_for_acronym(acronyms[0].id).await.unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Internet", "Slang"]);

    // Detail page renders the stored record.
    let resp = app
        .clone()
        .oneshot(get(&format!("/acronyms/{}", acronyms[0].id), &store))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("FTW"));
    assert!(body.contains("For The Win"));

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn deleting_missing_acronym_still_redirects_home() {
    let (app, _db, db_path) = test_app("acronym-delete-missing").await;
    let store = register(&app, "alice").await;

    let resp = app
        .clone()
        .oneshot(form_post(
            "/acronyms/9999/delete",
            &store,
            String::new(),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        "/"
    );

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn only_the_owner_may_edit_or_delete() {
    let (app, db, db_path) = test_app("acronym-ownership").await;
    let owner = register(&app, "alice").await;

    let user = db
        .find_user_by_username("alice".to_string())
        .await
        .unwrap()
        .unwrap();
    let acronym = db
        .create_acronym(til::db::AcronymCreate {
            short: "BRB".to_string(),
            long: "Be Right Back".to_string(),
            user_id: user.id,
        })
        .await
        .unwrap();

    // The owner can open the edit form.
    let resp = app
        .clone()
        .oneshot(get(&format!("/acronyms/{}/edit", acronym.id), &owner))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // Another account cannot.
    let intruder = register(&app, "mallory").await;
    let resp = app
        .clone()
        .oneshot(get(&format!("/acronyms/{}/edit", acronym.id), &intruder))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(form_post(
            &format!("/acronyms/{}/delete", acronym.id),
            &intruder,
            String::new(),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(db.get_acronym(acronym.id).await.unwrap().is_some());

    let _ = std::fs::remove_file(&db_path);
}
