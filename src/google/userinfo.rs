use crate::config::GoogleResolvedConfig;
use crate::error::TilError;
use axum::http::StatusCode;
use serde::Deserialize;

/// Subset of Google's user-info payload the login flow needs.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub email: String,
    pub name: String,
}

/// Fetch the signed-in identity from Google's user-info endpoint.
///
/// An unauthorized response means the access token was not accepted; the caller turns
/// that into a fresh run of the consent flow. Any other failure status is terminal.
pub async fn fetch_user_info(
    cfg: &GoogleResolvedConfig,
    access_token: &str,
    client: &reqwest::Client,
) -> Result<GoogleUserInfo, TilError> {
    let resp = client
        .get(cfg.userinfo_url.clone())
        .bearer_auth(access_token)
        .send()
        .await?;

    if resp.status() == StatusCode::UNAUTHORIZED {
        return Err(TilError::OauthReauth);
    }
    if !resp.status().is_success() {
        return Err(TilError::UpstreamStatus(resp.status()));
    }

    Ok(resp.json::<GoogleUserInfo>().await?)
}
