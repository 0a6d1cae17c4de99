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

/// Fetch a form page, record its cookies, and return the embedded token.
async fn fetch_form_token(app: &Router, uri: &str, store: &mut CookieStore) -> String {
    let resp = app
        .clone()
        .oneshot(get(uri, store))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    store.update(resp.headers());
    extract_form_token(&body_string(resp).await)
}

#[tokio::test]
async fn edit_reconciles_categories_by_set_difference() {
    let (app, db, db_path) = test_app("reconcile").await;

    let resp = app
        .clone()
        .oneshot(form_post(
            "/register",
            &CookieStore::default(),
            "name=Test&username=alice&password=password123&confirm_password=password123"
                .to_string(),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    let mut store = CookieStore::default();
    store.update(resp.headers());

    // Create the acronym with categories {Alpha, Beta}.
    let token = fetch_form_token(&app, "/acronyms/create", &mut store).await;
    let resp = app
        .clone()
        .oneshot(form_post(
            "/acronyms/create",
            &store,
            format!(
                "short=TIL&long=Today+I+Learned&categories=Alpha&categories=Beta&csrf_token={token}"
            ),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    store.update(resp.headers());

    let acronym_id = db.list_acronyms().await.unwrap()[0].id;
    let before = db.categories_for_acronym(acronym_id).await.unwrap();
    let names: Vec<&str> = before.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta"]);
    let beta_id = before[1].id;

    // The edit form is prefilled with the current categories.
    let token = fetch_form_token(&app, &format!("/acronyms/{acronym_id}/edit"), &mut store).await;

    // Submitting {Beta, Gamma} attaches Gamma and detaches Alpha, leaving Beta as-is.
    let resp = app
        .clone()
        .oneshot(form_post(
            &format!("/acronyms/{acronym_id}/edit"),
            &store,
            format!(
                "short=TIL&long=Today+I+Learned&categories=Beta&categories=Gamma&csrf_token={token}"
            ),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        format!("/acronyms/{acronym_id}")
    );

    let after = db.categories_for_acronym(acronym_id).await.unwrap();
    let names: Vec<&str> = after.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Beta", "Gamma"]);
    // Beta kept its original row: the association was never touched.
    assert_eq!(after[0].id, beta_id);

    // Detaching removes the association only; category rows are never deleted.
    let all = db.list_categories().await.unwrap();
    let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn edit_requires_matching_form_token() {
    let (app, db, db_path) = test_app("reconcile-csrf").await;

    let resp = app
        .clone()
        .oneshot(form_post(
            "/register",
            &CookieStore::default(),
            "name=Test&username=alice&password=password123&confirm_password=password123"
                .to_string(),
        ))
        .await
        .expect("request failed");
    assert!(resp.status().is_redirection());
    let mut store = CookieStore::default();
    store.update(resp.headers());

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

    // Posting an edit without fetching the form first is rejected.
    let resp = app
        .clone()
        .oneshot(form_post(
            &format!("/acronyms/{}/edit", acronym.id),
            &store,
            "short=BRB&long=Changed&csrf_token=forged".to_string(),
        ))
        .await
        .expect("request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let unchanged = db.get_acronym(acronym.id).await.unwrap().unwrap();
    assert_eq!(unchanged.long, "Be Right Back");

    let _ = std::fs::remove_file(&db_path);
}
