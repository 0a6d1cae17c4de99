use crate::db::{AcronymCreate, AcronymUpdate};
use crate::error::TilError;
use crate::server::guards::session::{self, SessionUser};
use crate::server::router::TilState;
use crate::views::{self, CreateAcronymPage};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{Form, cookie::PrivateCookieJar};
use base64::Engine as _;
use futures::future::try_join_all;
use rand::RngCore;
use serde::Deserialize;
use std::collections::HashSet;
use subtle::ConstantTimeEq;

fn generate_form_token() -> String {
    // 128 bits => 22 chars base64url (no padding).
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn check_form_token(expected: Option<String>, submitted: &str) -> Result<(), TilError> {
    let Some(expected) = expected else {
        return Err(TilError::FormTokenMismatch);
    };
    if !bool::from(expected.as_bytes().ct_eq(submitted.as_bytes())) {
        return Err(TilError::FormTokenMismatch);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct AcronymFormData {
    pub short: String,
    pub long: String,
    /// Repeated `categories` inputs; blank entries are ignored.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub csrf_token: String,
}

/// Normalize the repeated form inputs into a set of non-blank names.
fn category_names(categories: Vec<String>) -> HashSet<String> {
    categories
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// GET /acronyms/create
pub async fn create_form(
    State(state): State<TilState>,
    SessionUser(_user): SessionUser,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, TilError> {
    let token = generate_form_token();
    let jar = jar.add(session::form_token_cookie(
        token.clone(),
        !state.insecure_cookie,
    ));

    let page = CreateAcronymPage {
        title: "Create An Acronym",
        editing: false,
        acronym_id: 0,
        short: String::new(),
        long: String::new(),
        csrf_token: token,
        categories: Vec::new(),
    };
    Ok((jar, views::render(&page)?))
}

/// POST /acronyms/create
pub async fn create_submit(
    State(state): State<TilState>,
    SessionUser(user): SessionUser,
    jar: PrivateCookieJar,
    Form(data): Form<AcronymFormData>,
) -> Result<Response, TilError> {
    let (jar, expected) = session::take_form_token(jar);
    if let Err(err) = check_form_token(expected, &data.csrf_token) {
        return Ok((jar, err.into_response()).into_response());
    }

    let acronym = state
        .db
        .create_acronym(AcronymCreate {
            short: data.short,
            long: data.long,
            user_id: user.id,
        })
        .await?;

    // All attachments must land before the browser is sent to the detail page.
    let attach = category_names(data.categories)
        .into_iter()
        .map(|name| {
            let db = state.db.clone();
            let id = acronym.id;
            async move { db.attach_category(id, name).await }
        });
    try_join_all(attach).await?;

    Ok((jar, Redirect::to(&format!("/acronyms/{}", acronym.id))).into_response())
}

/// GET /acronyms/{id}/edit
pub async fn edit_form(
    State(state): State<TilState>,
    SessionUser(user): SessionUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, TilError> {
    let acronym = state.db.get_acronym(id).await?.ok_or(TilError::NotFound)?;
    if acronym.user_id != user.id {
        return Err(TilError::Forbidden);
    }
    let categories = state.db.categories_for_acronym(id).await?;

    let token = generate_form_token();
    let jar = jar.add(session::form_token_cookie(
        token.clone(),
        !state.insecure_cookie,
    ));

    let page = CreateAcronymPage {
        title: "Edit Acronym",
        editing: true,
        acronym_id: acronym.id,
        short: acronym.short,
        long: acronym.long,
        csrf_token: token,
        categories,
    };
    Ok((jar, views::render(&page)?))
}

/// POST /acronyms/{id}/edit
pub async fn edit_submit(
    State(state): State<TilState>,
    SessionUser(user): SessionUser,
    jar: PrivateCookieJar,
    Path(id): Path<i64>,
    Form(data): Form<AcronymFormData>,
) -> Result<Response, TilError> {
    let (jar, expected) = session::take_form_token(jar);
    if let Err(err) = check_form_token(expected, &data.csrf_token) {
        return Ok((jar, err.into_response()).into_response());
    }

    let acronym = state.db.get_acronym(id).await?.ok_or(TilError::NotFound)?;
    if acronym.user_id != user.id {
        return Err(TilError::Forbidden);
    }

    state
        .db
        .update_acronym(AcronymUpdate {
            id,
            short: data.short,
            long: data.long,
            user_id: user.id,
        })
        .await?;

    // Reconcile associations to exactly the submitted set: attach the new names,
    // detach the dropped ones. Both batches run concurrently and are awaited in full
    // before redirecting; no transaction wraps the set.
    let existing = state.db.categories_for_acronym(id).await?;
    let existing_names: HashSet<String> = existing.into_iter().map(|c| c.name).collect();
    let submitted = category_names(data.categories);

    let attach = submitted.difference(&existing_names).cloned().map(|name| {
        let db = state.db.clone();
        async move { db.attach_category(id, name).await }
    });
    let detach = existing_names.difference(&submitted).cloned().map(|name| {
        let db = state.db.clone();
        async move { db.detach_category(id, name).await }
    });

    let (attached, detached) = futures::join!(try_join_all(attach), try_join_all(detach));
    attached?;
    detached?;

    Ok((jar, Redirect::to(&format!("/acronyms/{id}"))).into_response())
}

/// POST /acronyms/{id}/delete
pub async fn delete(
    State(state): State<TilState>,
    SessionUser(user): SessionUser,
    Path(id): Path<i64>,
) -> Result<Response, TilError> {
    // Delete-if-exists: a missing id still lands back on the home page.
    if let Some(acronym) = state.db.get_acronym(id).await? {
        if acronym.user_id != user.id {
            return Err(TilError::Forbidden);
        }
        state.db.delete_acronym(id).await?;
    }

    Ok(Redirect::to("/").into_response())
}
