//! Askama page values, one struct per rendered template.

use crate::db::{DbAcronym, DbCategory, DbUser};
use crate::error::TilError;
use askama::Template;
use axum::response::Html;

/// Render a page into an HTML response body.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, TilError> {
    Ok(Html(page.render()?))
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub title: &'static str,
    pub acronyms: Vec<DbAcronym>,
    pub user_logged_in: bool,
    pub show_cookie_message: bool,
}

#[derive(Template)]
#[template(path = "acronym.html")]
pub struct AcronymPage {
    pub title: String,
    pub acronym: DbAcronym,
    pub user: DbUser,
    pub categories: Vec<DbCategory>,
}

#[derive(Template)]
#[template(path = "user.html")]
pub struct UserPage {
    pub title: String,
    pub user: DbUser,
    pub acronyms: Vec<DbAcronym>,
}

#[derive(Template)]
#[template(path = "all_users.html")]
pub struct AllUsersPage {
    pub title: &'static str,
    pub users: Vec<DbUser>,
}

#[derive(Template)]
#[template(path = "all_categories.html")]
pub struct AllCategoriesPage {
    pub title: &'static str,
    pub categories: Vec<DbCategory>,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryPage {
    pub title: String,
    pub category: DbCategory,
    pub acronyms: Vec<DbAcronym>,
}

/// Shared by the create and edit flows; `editing` switches the form target and labels.
#[derive(Template)]
#[template(path = "create_acronym.html")]
pub struct CreateAcronymPage {
    pub title: &'static str,
    pub editing: bool,
    pub acronym_id: i64,
    pub short: String,
    pub long: String,
    pub csrf_token: String,
    pub categories: Vec<DbCategory>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub title: &'static str,
    pub login_error: bool,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterPage {
    pub title: &'static str,
    pub message: Option<String>,
}
