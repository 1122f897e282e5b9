mod config;
mod error;
mod routes;
mod session_data;

pub use config::AuthConfig;
pub use error::AuthError;
pub use routes::{callback, index, login, logout, profile};
pub use session_data::AuthSession;

pub type OAuth = oauth2::basic::BasicClient;
