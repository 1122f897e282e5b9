use oauth2::CsrfToken;
use oauth2::basic::BasicTokenResponse;

/// Per-session login progress. `oauth_state` is written at login start
/// and consumed by the callback; `oauth_token` is only ever written
/// after the callback state was verified.
#[derive(Debug, Default)]
pub struct AuthSession {
    pub(crate) oauth_state: Option<CsrfToken>,
    pub(crate) oauth_token: Option<BasicTokenResponse>,
}
