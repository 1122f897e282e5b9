use std::time::Duration;

use oauth2::reqwest::async_http_client;
use oauth2::{AuthorizationCode, CsrfToken, Scope, TokenResponse};
use rocket::Responder;
use rocket::State;
use rocket::http::{Cookie, CookieJar};
use rocket::response::Redirect;
use rocket::tokio::time::timeout;
use rocket_dyn_templates::{context, Template};

use crate::auth::{AuthConfig, AuthError, AuthSession, OAuth};
use crate::session::{Session, SessionManager};
use crate::userinfo::UserInfoClient;

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Responder)]
pub enum FlowResponse {
    Redirect(Redirect),
    Page(Template),
    #[response(status = 502)]
    Failure(Template),
}

fn error_page(error: AuthError) -> FlowResponse {
    FlowResponse::Failure(Template::render("error", context! {
        message: error.to_string(),
    }))
}

/// Checks the callback state against the nonce stored at login start.
/// This is the only place the check happens; nothing may contact the
/// token endpoint unless it passed.
fn verify_callback_state(stored: Option<&CsrfToken>, returned: Option<&str>) -> Result<(), AuthError> {
    let stored = stored.ok_or(AuthError::MissingSessionState)?;
    match returned {
        Some(returned) if returned == stored.secret().as_str() => Ok(()),
        _ => Err(AuthError::StateMismatch),
    }
}

/// Landing page with the "Sign in with Google" link.
#[get("/")]
pub fn index() -> Template {
    Template::render("index", context! {})
}

/// Starts the login flow: builds the authorization URL, stores the
/// state nonce in the session and redirects the client to the provider.
#[get("/login")]
pub async fn login(oauth: &State<OAuth>, config: &State<AuthConfig>, session: Session<AuthSession>) -> Redirect {
    let (auth_url, csrf_token) = oauth
        .authorize_url(CsrfToken::new_random)
        .add_scopes(config.scopes.iter().cloned().map(Scope::new))
        .add_extra_param("access_type", "offline")
        .add_extra_param("prompt", "select_account")
        .url();

    {
        let mut session_data = session.get_value().await;
        session_data.oauth_state = Some(csrf_token);
    }

    Redirect::to(auth_url.to_string())
}

/// Callback after the provider login. Consumes the stored state nonce,
/// verifies it against the returned one and only then exchanges the
/// authorization code for a token. The session token is untouched on
/// every failure path.
#[get("/callback?<code>&<state>&<error>")]
pub async fn callback(
    oauth: &State<OAuth>,
    session: Session<AuthSession>,
    code: Option<&str>,
    state: Option<&str>,
    error: Option<&str>,
) -> FlowResponse {
    let stored_state = {
        let mut session_data = session.get_value().await;
        session_data.oauth_state.take()
    };

    if let Err(e) = verify_callback_state(stored_state.as_ref(), state) {
        warn!("[{}] {}", session.get_id(), e);
        return FlowResponse::Redirect(Redirect::to("/login"));
    }

    if let Some(error) = error {
        warn!("[{}] Provider returned error: {}", session.get_id(), error);
        return error_page(AuthError::TokenExchange(format!("provider returned \"{error}\"")));
    }

    let code = match code {
        None => {
            warn!("[{}] Callback is missing the authorization code", session.get_id());
            return error_page(AuthError::TokenExchange("callback is missing the authorization code".to_string()));
        }
        Some(code) => code,
    };

    // The code is single use: one exchange per callback, never retried.
    let exchange = oauth
        .exchange_code(AuthorizationCode::new(code.to_string()))
        .request_async(async_http_client);

    let token = match timeout(EXCHANGE_TIMEOUT, exchange).await {
        Err(_) => {
            warn!("[{}] Token endpoint timed out", session.get_id());
            return error_page(AuthError::ProviderUnavailable);
        }
        Ok(Err(e)) => {
            warn!("[{}] Could not retrieve token: {:?}", session.get_id(), e);
            return error_page(AuthError::TokenExchange(e.to_string()));
        }
        Ok(Ok(token)) => token,
    };

    {
        let mut session_data = session.get_value().await;
        session_data.oauth_token = Some(token);
    }

    FlowResponse::Redirect(Redirect::to("/profile"))
}

/// Shows name and email of the logged in user. The userinfo endpoint is
/// queried fresh on every view; nothing about the user is cached.
#[get("/profile")]
pub async fn profile(config: &State<AuthConfig>, session: Session<AuthSession>) -> FlowResponse {
    let access_token = {
        let session_data = session.get_value().await;
        session_data.oauth_token.as_ref().map(|t| t.access_token().secret().clone())
    };

    let access_token = match access_token {
        None => return FlowResponse::Redirect(Redirect::to("/login")),
        Some(access_token) => access_token,
    };

    let client = UserInfoClient::new(&config.userinfo_url, &access_token);
    match client.fetch().await {
        Ok(user) => FlowResponse::Page(Template::render("profile", context! {
            name: user.name,
            email: user.email,
        })),
        Err(AuthError::IncompleteUserInfo(raw)) => {
            warn!("[{}] Incomplete userinfo response: {}", session.get_id(), raw);
            FlowResponse::Page(Template::render("diagnostic", context! { raw: raw }))
        }
        Err(e) => {
            warn!("[{}] Could not fetch userinfo: {}", session.get_id(), e);
            error_page(e)
        }
    }
}

/// Removes the session id from the cookie and deletes the session from
/// the session manager. Safe to call at any time.
#[get("/logout")]
pub async fn logout(cookies: &CookieJar<'_>, manager: &State<SessionManager<AuthSession>>, session: Session<AuthSession>) -> Redirect {
    cookies.remove_private(Cookie::build("sid"));
    manager.remove_session(session.get_id()).await;
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use oauth2::CsrfToken;
    use crate::auth::AuthError;
    use super::verify_callback_state;

    #[test]
    fn test_matching_state_passes() {
        let stored = CsrfToken::new("abc123".to_string());
        assert!(verify_callback_state(Some(&stored), Some("abc123")).is_ok());
    }

    #[test]
    fn test_mismatched_state_is_rejected() {
        let stored = CsrfToken::new("abc123".to_string());
        for returned in ["wrong", "", "abc12", "abc1234", "ABC123"] {
            let result = verify_callback_state(Some(&stored), Some(returned));
            assert!(matches!(result, Err(AuthError::StateMismatch)));
        }
    }

    #[test]
    fn test_absent_returned_state_is_rejected() {
        let stored = CsrfToken::new("abc123".to_string());
        let result = verify_callback_state(Some(&stored), None);
        assert!(matches!(result, Err(AuthError::StateMismatch)));
    }

    #[test]
    fn test_empty_session_is_rejected() {
        let result = verify_callback_state(None, Some("abc123"));
        assert!(matches!(result, Err(AuthError::MissingSessionState)));
    }
}
