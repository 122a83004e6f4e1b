#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine};
use lastweek::{
    config::Config, models::user, sessions::SessionStore, utils::mail::Mailer, State,
};
use lettre::{address::Envelope, transport::stub::AsyncStubTransport};
use sea_orm::Database;

pub const SECRET: [u8; 32] = [42; 32];

pub async fn state_with(configure: impl FnOnce(&mut Config)) -> Arc<State> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    entity::schema::create_schema(&db).await.unwrap();

    let mut config = Config::with_secret(SECRET);
    configure(&mut config);

    Arc::new(State {
        db,
        sessions: SessionStore::memory(),
        mailer: Mailer::Stub(AsyncStubTransport::new_ok()),
        config,
    })
}

pub async fn state() -> Arc<State> {
    state_with(|_| {}).await
}

/// A test server that keeps cookies between requests, like a browser.
pub fn server(state: Arc<State>) -> TestServer {
    TestServer::builder()
        .save_cookies()
        .build(lastweek::app(state))
        .unwrap()
}

pub async fn add_user(state: &State, email: &str, password: &str, confirmed: bool) -> user::Model {
    let name = email.split('@').next().unwrap();
    user::create(&state.db, email, name, password, confirmed)
        .await
        .unwrap()
}

pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

pub async fn sent_mail(state: &State) -> Vec<(Envelope, String)> {
    match &state.mailer {
        Mailer::Stub(transport) => transport.messages().await,
        Mailer::Smtp(_) => panic!("tests use the stub mailer"),
    }
}

pub fn recipients(envelope: &Envelope) -> Vec<String> {
    envelope.to().iter().map(|a| a.to_string()).collect()
}

pub fn location(response: &axum_test::TestResponse) -> String {
    response
        .header("location")
        .to_str()
        .unwrap()
        .to_owned()
}
