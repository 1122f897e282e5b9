use std::time::Duration;

use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthError;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Profile claims of the logged in user. Extra provider fields are
/// ignored.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
}

impl UserInfo {
    fn parse(doc: &Value) -> Option<UserInfo> {
        Some(UserInfo {
            name: doc.get("name")?.as_str()?.to_string(),
            email: doc.get("email")?.as_str()?.to_string(),
        })
    }
}

/// Client for the provider's userinfo endpoint, bound to one access
/// token.
pub struct UserInfoClient {
    endpoint: String,
    access_token: String,
    http: reqwest::Client,
}

impl UserInfoClient {
    pub fn new(endpoint: &str, access_token: &str) -> UserInfoClient {
        UserInfoClient {
            endpoint: endpoint.to_string(),
            access_token: access_token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Fetches name and email for the token's subject. A body missing
    /// either field comes back as `IncompleteUserInfo` carrying the raw
    /// payload.
    pub async fn fetch(&self) -> Result<UserInfo, AuthError> {
        let response = self.http
            .get(&self.endpoint)
            .bearer_auth(&self.access_token)
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await
            .map_err(|_| AuthError::ProviderUnavailable)?;

        let body = response.text().await
            .map_err(|_| AuthError::ProviderUnavailable)?;

        let doc: Value = serde_json::from_str(&body)
            .map_err(|_| AuthError::IncompleteUserInfo(body.clone()))?;

        UserInfo::parse(&doc).ok_or(AuthError::IncompleteUserInfo(body))
    }
}
