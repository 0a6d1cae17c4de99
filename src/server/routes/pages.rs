use crate::error::TilError;
use crate::server::guards::session::OptionalUser;
use crate::server::router::TilState;
use crate::views::{
    self, AcronymPage, AllCategoriesPage, AllUsersPage, CategoryPage, IndexPage, UserPage,
};
use axum::{
    extract::{Path, State},
    response::Html,
};
use axum_extra::extract::CookieJar;

/// Set client-side once the visitor dismisses the banner.
const COOKIE_CONSENT: &str = "cookies-accepted";

/// GET /
pub async fn index(
    State(state): State<TilState>,
    OptionalUser(user): OptionalUser,
    jar: CookieJar,
) -> Result<Html<String>, TilError> {
    let acronyms = state.db.list_acronyms().await?;
    let page = IndexPage {
        title: "Homepage",
        acronyms,
        user_logged_in: user.is_some(),
        show_cookie_message: jar.get(COOKIE_CONSENT).is_none(),
    };
    views::render(&page)
}

/// GET /acronyms/{id}
pub async fn acronym_detail(
    State(state): State<TilState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, TilError> {
    let acronym = state.db.get_acronym(id).await?.ok_or(TilError::NotFound)?;
    let user = state
        .db
        .get_user(acronym.user_id)
        .await?
        .ok_or(TilError::NotFound)?;
    let categories = state.db.categories_for_acronym(id).await?;

    let page = AcronymPage {
        title: acronym.short.clone(),
        acronym,
        user,
        categories,
    };
    views::render(&page)
}

/// GET /users/{id}
pub async fn user_detail(
    State(state): State<TilState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, TilError> {
    let user = state.db.get_user(id).await?.ok_or(TilError::NotFound)?;
    let acronyms = state.db.acronyms_for_user(id).await?;

    let page = UserPage {
        title: user.name.clone(),
        user,
        acronyms,
    };
    views::render(&page)
}

/// GET /users
pub async fn all_users(State(state): State<TilState>) -> Result<Html<String>, TilError> {
    let users = state.db.list_users().await?;
    views::render(&AllUsersPage {
        title: "All Users",
        users,
    })
}

/// GET /categories
pub async fn all_categories(State(state): State<TilState>) -> Result<Html<String>, TilError> {
    let categories = state.db.list_categories().await?;
    views::render(&AllCategoriesPage {
        title: "All Categories",
        categories,
    })
}

/// GET /categories/{id}
pub async fn category_detail(
    State(state): State<TilState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, TilError> {
    let category = state.db.get_category(id).await?.ok_or(TilError::NotFound)?;
    let acronyms = state.db.acronyms_for_category(id).await?;

    let page = CategoryPage {
        title: category.name.clone(),
        category,
        acronyms,
    };
    views::render(&page)
}
