use std::env;

use anyhow::anyhow;
use rocket::figment::Figment;
use serde_derive::Deserialize;

use crate::auth::OAuth;

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_userinfo_url() -> String {
    "https://www.googleapis.com/oauth2/v3/userinfo".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:8000/callback".to_string()
}

fn default_scopes() -> Vec<String> {
    vec![
        "https://www.googleapis.com/auth/userinfo.profile".to_string(),
        "https://www.googleapis.com/auth/userinfo.email".to_string(),
    ]
}

/// Provider endpoints, redirect URI and scopes. Parsed from the
/// "oauth.google" table of the Figment; every field falls back to the
/// Google defaults.
#[derive(Debug, Deserialize)]
struct ProviderConfig {
    #[serde(default = "default_auth_url")]
    auth_url: String,
    #[serde(default = "default_token_url")]
    token_url: String,
    #[serde(default = "default_userinfo_url")]
    userinfo_url: String,
    #[serde(default = "default_redirect_uri")]
    redirect_uri: String,
    #[serde(default = "default_scopes")]
    scopes: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            userinfo_url: default_userinfo_url(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }
}

/// Immutable configuration for the login flow, built once at startup.
/// Credentials come from the environment, endpoints from the Figment.
#[derive(Debug)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl AuthConfig {
    pub fn load(figment: &Figment) -> Result<AuthConfig, anyhow::Error> {
        let provider: ProviderConfig = figment
            .extract_inner("oauth.google")
            .unwrap_or_default();

        let client_id = env::var("CLIENT_ID")
            .map_err(|_| anyhow!("CLIENT_ID must be set!"))?;
        let client_secret = env::var("CLIENT_SECRET")
            .map_err(|_| anyhow!("CLIENT_SECRET must be set!"))?;

        Ok(AuthConfig {
            client_id,
            client_secret,
            auth_url: provider.auth_url,
            token_url: provider.token_url,
            userinfo_url: provider.userinfo_url,
            redirect_uri: provider.redirect_uri,
            scopes: provider.scopes,
        })
    }
}

/// Creates a new OAuth client from AuthConfig.
impl TryFrom<&AuthConfig> for OAuth {
    type Error = anyhow::Error;

    fn try_from(config: &AuthConfig) -> Result<Self, Self::Error> {
        Ok(OAuth::new(
            oauth2::ClientId::new(config.client_id.clone()),
            Some(oauth2::ClientSecret::new(config.client_secret.clone())),
            oauth2::AuthUrl::new(config.auth_url.clone())?,
            Some(oauth2::TokenUrl::new(config.token_url.clone())?),
        ).set_redirect_uri(oauth2::RedirectUrl::new(config.redirect_uri.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::Figment;
    use rocket::figment::providers::{Format, Toml};
    use super::ProviderConfig;

    #[test]
    fn test_provider_defaults() {
        let provider = ProviderConfig::default();
        assert!(provider.auth_url.starts_with("https://accounts.google.com"));
        assert!(provider.token_url.starts_with("https://oauth2.googleapis.com"));
        assert_eq!(provider.scopes.len(), 2);
    }

    #[test]
    fn test_partial_figment_keeps_defaults() {
        let figment = Figment::from(Toml::string(r#"
            [oauth.google]
            redirect_uri = "http://localhost:5000/callback"
        "#));

        let provider: ProviderConfig = figment
            .extract_inner("oauth.google")
            .unwrap_or_default();

        assert_eq!(provider.redirect_uri, "http://localhost:5000/callback");
        assert!(provider.userinfo_url.starts_with("https://www.googleapis.com"));
    }
}
