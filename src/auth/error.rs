/// Everything that can go wrong between the login redirect and the
/// profile page. None of these are fatal to the process; each one maps
/// to a redirect or an error page in the route layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Callback reached without a pending login in this session.
    #[error("no login attempt pending for this session")]
    MissingSessionState,

    /// The state returned by the provider does not match the nonce
    /// stored at login start. The flow must abort before any token
    /// endpoint contact.
    #[error("callback state does not match the stored login state")]
    StateMismatch,

    /// The provider rejected the authorization code, or the exchange
    /// response could not be read.
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Userinfo response is missing "name" or "email". Carries the raw
    /// body so it can be shown for diagnosis.
    #[error("userinfo response missing required fields")]
    IncompleteUserInfo(String),

    /// Timeout or connection failure talking to the provider.
    #[error("identity provider is unreachable")]
    ProviderUnavailable,
}
