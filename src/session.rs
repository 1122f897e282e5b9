use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use rocket::futures::lock::{Mutex, MutexGuard};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use uuid::Uuid;

const SESSION_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24);

/// Server side session store, keyed by the session id from the private
/// "sid" cookie. Sessions are created lazily on first access and pruned
/// once they have been idle for longer than the timeout.
#[derive(Debug)]
pub struct SessionManager<T> {
    sessions: Mutex<HashMap<Uuid, Entry<T>>>,
    timeout: Duration,
}

#[derive(Debug)]
struct Entry<T> {
    last_access: Instant,
    value: Arc<Mutex<T>>,
}

/// Handle to one session's data. Cloning is cheap; all clones share the
/// same underlying value.
#[derive(Debug, Clone)]
pub struct Session<T> {
    id: Uuid,
    value: Arc<Mutex<T>>,
}

impl<T> Session<T> {
    pub fn get_id(&self) -> Uuid {
        self.id
    }

    pub async fn get_value<'a>(&'a self) -> MutexGuard<'a, T> {
        self.value.lock().await
    }
}

impl<T> Default for SessionManager<T> {
    fn default() -> Self {
        SessionManager {
            sessions: Default::default(),
            timeout: SESSION_TIMEOUT,
        }
    }
}

impl<T> SessionManager<T>
    where T: Default
{
    pub fn with_timeout(timeout: Duration) -> Self {
        SessionManager {
            sessions: Default::default(),
            timeout,
        }
    }

    pub async fn get_session(&self, sid: Uuid) -> Session<T> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        let timeout = self.timeout;
        sessions.retain(|_, entry| now < entry.last_access + timeout);

        let entry = sessions.entry(sid).or_insert_with(|| Entry {
            last_access: now,
            value: Arc::new(Mutex::new(T::default())),
        });
        entry.last_access = now;

        Session {
            id: sid,
            value: entry.value.clone(),
        }
    }

    pub async fn remove_session(&self, sid: Uuid) {
        self.sessions.lock().await.remove(&sid);
    }
}

/// This trait is used to store and retrieve session ids
trait SessionIdStore {
    fn get_session_id(&self) -> Uuid;
}

/// Implements SessionIdStore for cookies.
/// The value is stored in "sid".
impl SessionIdStore for CookieJar<'_> {
    fn get_session_id(&self) -> Uuid {
        self
            .get_private("sid")
            .and_then(|c| Uuid::parse_str(c.value()).ok())
            .unwrap_or_else(|| {
                let sid = Uuid::new_v4();
                self.add_private(
                    Cookie::build(("sid", sid.to_string()))
                        .same_site(SameSite::Lax)
                        .build());
                sid
            })
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Session<T>
    where T: Sync + Send + Default + 'r + 'static
{
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Outcome::Success(session_manager) = request.guard::<&State<SessionManager<T>>>().await {
            let sid = request.cookies().get_session_id();
            let session = session_manager.get_session(sid).await;
            Outcome::Success(session)
        } else {
            Outcome::Error((Status::InternalServerError, anyhow!("Could not get application state!")))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use uuid::Uuid;
    use crate::session::SessionManager;

    #[rocket::async_test]
    async fn test_same_sid_shares_data() {
        let manager: SessionManager<i64> = SessionManager::default();
        let sid = Uuid::new_v4();

        {
            let session = manager.get_session(sid).await;
            *session.get_value().await = 42;
        }

        let session = manager.get_session(sid).await;
        assert_eq!(*session.get_value().await, 42);

        let other = manager.get_session(Uuid::new_v4()).await;
        assert_eq!(*other.get_value().await, 0);
    }

    #[rocket::async_test]
    async fn test_remove_session_resets_data() {
        let manager: SessionManager<i64> = SessionManager::default();
        let sid = Uuid::new_v4();

        *manager.get_session(sid).await.get_value().await = 7;
        manager.remove_session(sid).await;

        let session = manager.get_session(sid).await;
        assert_eq!(*session.get_value().await, 0);
    }

    #[rocket::async_test]
    async fn test_idle_sessions_are_pruned() {
        let manager: SessionManager<i64> = SessionManager::with_timeout(Duration::from_micros(0));
        let sid = Uuid::new_v4();

        *manager.get_session(sid).await.get_value().await = 7;

        let session = manager.get_session(sid).await;
        assert_eq!(*session.get_value().await, 0);
    }
}
