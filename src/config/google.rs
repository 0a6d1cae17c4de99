use serde::{Deserialize, Serialize};
use url::Url;

/// Google OAuth configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleConfig {
    /// OAuth client id issued by the Google Cloud console.
    /// TOML: `google.client_id`.
    #[serde(default)]
    pub client_id: String,

    /// OAuth client secret paired with `client_id`.
    /// TOML: `google.client_secret`.
    #[serde(default)]
    pub client_secret: String,

    /// Consent-screen authorization endpoint.
    /// TOML: `google.auth_url`. Default: Google's v2 endpoint.
    #[serde(default = "default_auth_url")]
    pub auth_url: Url,

    /// Token exchange endpoint.
    /// TOML: `google.token_url`. Default: Google's endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: Url,

    /// User-info endpoint queried with the access token after the exchange.
    /// TOML: `google.userinfo_url`. Default: Google's v1 endpoint.
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: Url,

    /// Redirect URL registered with Google. The callback route is mounted at this URL's
    /// path. TOML: `google.callback_url`. No default; `Config::from_toml()` refuses to
    /// start without it.
    #[serde(default)]
    pub callback_url: Option<Url>,
}

/// Validated Google settings with the callback URL unwrapped.
#[derive(Debug, Clone)]
pub struct GoogleResolvedConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub callback_url: Url,
}

impl GoogleConfig {
    /// Returns `None` when `callback_url` is unset.
    pub fn resolve(&self) -> Option<GoogleResolvedConfig> {
        Some(GoogleResolvedConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: self.auth_url.clone(),
            token_url: self.token_url.clone(),
            userinfo_url: self.userinfo_url.clone(),
            callback_url: self.callback_url.clone()?,
        })
    }
}

impl GoogleResolvedConfig {
    /// Router mount point for the OAuth callback handler.
    pub fn callback_path(&self) -> String {
        self.callback_url.path().to_string()
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            callback_url: None,
        }
    }
}

fn default_auth_url() -> Url {
    Url::parse("https://accounts.google.com/o/oauth2/v2/auth").expect("valid auth url")
}

fn default_token_url() -> Url {
    Url::parse("https://oauth2.googleapis.com/token").expect("valid token url")
}

fn default_userinfo_url() -> Url {
    Url::parse("https://www.googleapis.com/oauth2/v1/userinfo?alt=json").expect("valid userinfo url")
}
