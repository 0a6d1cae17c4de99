use crate::config::GoogleResolvedConfig;
use crate::error::TilError;
use oauth2::{
    AuthUrl, AuthorizationCode, Client as OAuth2Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    StandardRevocableToken, TokenUrl,
    basic::{
        BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
        BasicTokenResponse,
    },
};
use tracing::info;

/// Stateless Google OAuth endpoints, configured per call from the resolved settings so
/// they can be pointed at a local server in tests.
pub(crate) struct GoogleOauthEndpoints;

impl GoogleOauthEndpoints {
    /// Build the Google OAuth2 client with redirect configured.
    fn client(cfg: &GoogleResolvedConfig) -> GoogleOauth2Client {
        OAuth2Client::new(ClientId::new(cfg.client_id.clone()))
            .set_client_secret(ClientSecret::new(cfg.client_secret.clone()))
            .set_auth_uri(AuthUrl::from_url(cfg.auth_url.clone()))
            .set_token_uri(TokenUrl::from_url(cfg.token_url.clone()))
            .set_redirect_uri(RedirectUrl::from_url(cfg.callback_url.clone()))
    }

    /// Build a consent-screen URL with the login scopes and PKCE challenge preset.
    pub(crate) fn build_authorize_url(
        cfg: &GoogleResolvedConfig,
        pkce_challenge: PkceCodeChallenge,
    ) -> (url::Url, CsrfToken) {
        Self::client(cfg)
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .url()
    }

    /// Exchange an authorization code (PKCE) for tokens.
    pub(crate) async fn exchange_authorization_code(
        cfg: &GoogleResolvedConfig,
        code: AuthorizationCode,
        verifier: PkceCodeVerifier,
        http_client: reqwest::Client,
    ) -> Result<BasicTokenResponse, TilError> {
        let token_result = Self::client(cfg)
            .exchange_code(code)
            .set_pkce_verifier(verifier)
            .request_async(&http_client)
            .await
            .map_err(|e| TilError::OauthFlow {
                code: "TOKEN_EXCHANGE_FAILED".to_string(),
                message: format!("Token exchange failed: {e}"),
            })?;
        info!("OAuth2 code exchange completed successfully");
        Ok(token_result)
    }
}

pub(crate) type GoogleOauth2Client<
    HasAuthUrl = EndpointSet,
    HasDeviceAuthUrl = EndpointNotSet,
    HasIntrospectionUrl = EndpointNotSet,
    HasRevocationUrl = EndpointNotSet,
    HasTokenUrl = EndpointSet,
> = OAuth2Client<
    BasicErrorResponse,
    BasicTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    HasAuthUrl,
    HasDeviceAuthUrl,
    HasIntrospectionUrl,
    HasRevocationUrl,
    HasTokenUrl,
>;
