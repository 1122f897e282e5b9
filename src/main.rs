mod auth;
mod session;
mod userinfo;


#[macro_use]
extern crate rocket;

use std::env;

use rocket::figment::Figment;
use rocket::{Build, Rocket};
use rocket_dyn_templates::Template;

use crate::auth::{AuthConfig, AuthSession, OAuth};
use crate::session::SessionManager;

fn server(figment: Figment, config: AuthConfig) -> Rocket<Build> {
    let oauth = OAuth::try_from(&config).expect("OAuth2 client could not be built!");

    rocket::custom(figment)
        .manage(oauth)
        .manage(config)
        .manage::<SessionManager<AuthSession>>(SessionManager::default())
        .mount("/", routes![auth::index, auth::login, auth::callback, auth::profile, auth::logout])
        .attach(Template::fairing())
}

#[launch]
fn rocket() -> _ {
    let secret_key = env::var("SECRET_KEY").expect("SECRET_KEY must be set!");
    let figment = rocket::Config::figment().merge(("secret_key", secret_key));
    let config = AuthConfig::load(&figment).expect("OAuth2 config could not be loaded!");

    server(figment, config)
}
