//! Google OAuth plumbing: the oauth2-crate client wrappers and the user-info call.

pub mod endpoints;
pub mod userinfo;

pub use userinfo::GoogleUserInfo;
