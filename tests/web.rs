mod common;

use axum_test::TestServer;
use common::{add_user, location, recipients, sent_mail, server, state};
use lastweek::{
    models::{snippet, user},
    sessions::SessionStore,
    tokens::{self, Purpose},
    week::{this_week, IsoWeek},
};

async fn login(server: &TestServer, email: &str, password: &str) {
    let response = server
        .post("/login")
        .form(&[("email", email), ("password", password)])
        .await;
    response.assert_status_see_other();
}

fn current_edit_url() -> String {
    let week = this_week();
    format!("/edit/{}/{}", week.year, week.week)
}

#[tokio::test]
async fn test_index_anonymous() {
    let state = state().await;
    let server = server(state);

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text_contains("Log in");
}

#[tokio::test]
async fn test_login_required() {
    let state = state().await;
    let server = server(state);

    let response = server.get("/edit/2017/9").await;
    response.assert_status_see_other();
    assert_eq!(location(&response), "/login?next=%2Fedit%2F2017%2F9");

    let response = server.get(&location(&response)).await;
    response.assert_text_contains("Please log in to access this page.");

    let response = server.get("/login").await;
    response.assert_status_ok();
    assert!(!response.text().contains("Please log in to access this page."));
}

#[tokio::test]
async fn test_login_flow() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);

    let response = server
        .post("/login")
        .form(&[("email", "john@example.com"), ("password", "cat")])
        .await;
    response.assert_status_see_other();
    assert_eq!(location(&response), "/");

    let response = server.get("/").await;
    assert_eq!(location(&response), "/edit");

    let response = server.get("/edit").await;
    assert_eq!(location(&response), current_edit_url());

    let response = server.get(&current_edit_url()).await;
    response.assert_status_ok();
    response.assert_text_contains("Week of");
}

#[tokio::test]
async fn test_login_next() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);

    let response = server
        .post("/login")
        .add_query_param("next", "/history")
        .form(&[("email", "john@example.com"), ("password", "cat")])
        .await;
    assert_eq!(location(&response), "/history");

    let response = server
        .post("/login")
        .add_query_param("next", "http://example.org/")
        .form(&[("email", "john@example.com"), ("password", "cat")])
        .await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);

    let response = server
        .post("/login")
        .form(&[("email", "john@example.com"), ("password", "dog")])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Invalid username or password");

    let response = server
        .post("/login")
        .form(&[("email", "not an email"), ("password", "dog")])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Invalid email address");

    server.get("/history").await.assert_status_see_other();
}

#[tokio::test]
async fn test_edit_and_history() {
    let state = state().await;
    let user = add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state.clone());
    login(&server, "john@example.com", "cat").await;

    let response = server
        .post("/edit/2017/9")
        .form(&[("text", "hello *world*"), ("tags", "red, blue,red, ")])
        .await;
    response.assert_status_see_other();
    assert_eq!(location(&response), "/edit/2017/9");

    let stored = snippet::get_by_week(&state.db, user.id, IsoWeek::new(2017, 9))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.text, "hello *world*");
    assert_eq!(stored.tags, ["blue", "red"]);

    let response = server.get("/edit/2017/9").await;
    response.assert_status_ok();
    response.assert_text_contains("Week of February 27, 2017");
    response.assert_text_contains("<em>world</em>");
    response.assert_text_contains(r#"value="blue, red""#);

    let response = server.get("/history").await;
    response.assert_status_ok();
    response.assert_text_contains("<em>world</em>");

    let response = server.get("/history").add_query_param("tag", "green").await;
    response.assert_status_ok();
    response.assert_text_contains("Nothing here yet.");

    server
        .get("/history")
        .add_query_param("page", 5)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_history_huge_page() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);
    login(&server, "john@example.com", "cat").await;

    let response = server
        .get("/history")
        .add_query_param("page", u64::MAX.to_string())
        .await;
    response.assert_status_not_found();
    response.assert_text_contains("Page not found");
}

#[tokio::test]
async fn test_anonymous_requests_store_no_sessions() {
    let state = state().await;
    let server = TestServer::new(lastweek::app(state.clone())).unwrap();

    for _ in 0..50 {
        let response = server.get("/edit").await;
        response.assert_status_see_other();
        assert_eq!(location(&response), "/login?next=%2Fedit");
    }
    let response = server.get("/login").add_query_param("next", "/edit").await;
    response.assert_text_contains("Please log in to access this page.");

    match &state.sessions {
        SessionStore::Memory { sessions, .. } => assert!(sessions.lock().await.is_empty()),
        SessionStore::Redis(_) => panic!("tests keep sessions in memory"),
    }
}

#[tokio::test]
async fn test_edit_invalid_week() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);
    login(&server, "john@example.com", "cat").await;

    let response = server.get("/edit/2099/1").await;
    response.assert_status_see_other();
    assert_eq!(location(&response), current_edit_url());

    let response = server.get(&current_edit_url()).await;
    response.assert_text_contains("invalid ISO week date");

    server
        .post("/edit/2017/54")
        .form(&[("text", "x"), ("tags", "")])
        .await
        .assert_status_see_other();
}

#[tokio::test]
async fn test_logout() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state);
    login(&server, "john@example.com", "cat").await;

    let response = server.get("/logout").await;
    assert_eq!(location(&response), "/");

    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text_contains("You have been logged out");

    server.get("/edit").await.assert_status_see_other();
    let response = server.get("/edit").await;
    assert!(location(&response).starts_with("/login"));
}

#[tokio::test]
async fn test_register() {
    let state = state().await;
    let server = server(state.clone());

    let response = server
        .post("/register")
        .form(&[
            ("name", "John"),
            ("email", "john@example.com"),
            ("password", "cat"),
            ("password2", "dog"),
        ])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Passwords must match!");

    let response = server
        .post("/register")
        .form(&[
            ("name", "John"),
            ("email", "john@example.com"),
            ("password", "cat"),
            ("password2", "cat"),
        ])
        .await;
    response.assert_status_see_other();
    assert_eq!(location(&response), "/login");

    let user = user::find_by_email(&state.db, "john@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(!user.confirmed);
    let mail = sent_mail(&state).await;
    assert_eq!(mail.len(), 1);
    assert_eq!(recipients(&mail[0].0), ["john@example.com"]);

    let response = server.get("/login").await;
    response.assert_text_contains("A confirmation link has been sent to you via email");

    let response = server
        .post("/register")
        .form(&[
            ("name", "Johnny"),
            ("email", "john@example.com"),
            ("password", "cat"),
            ("password2", "cat"),
        ])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Email already registered");
}

#[tokio::test]
async fn test_concurrent_registrations() {
    let state = state().await;
    let first = server(state.clone());
    let second = server(state.clone());
    let form = [
        ("name", "John"),
        ("email", "john@example.com"),
        ("password", "cat"),
        ("password2", "cat"),
    ];

    let (a, b) = tokio::join!(
        async { first.post("/register").form(&form).await },
        async { second.post("/register").form(&form).await },
    );
    let mut statuses = [a.status_code().as_u16(), b.status_code().as_u16()];
    statuses.sort();
    assert_eq!(statuses, [200, 303]);
    let rejected = if a.status_code().as_u16() == 200 { a } else { b };
    rejected.assert_text_contains("Email already registered");
}

#[tokio::test]
async fn test_confirm_account() {
    let state = state().await;
    let john = add_user(&state, "john@example.com", "cat", false).await;
    let jane = add_user(&state, "jane@example.com", "dog", false).await;
    let server = server(state.clone());
    login(&server, "john@example.com", "cat").await;

    let response = server.get("/edit").await;
    assert_eq!(location(&response), "/unconfirmed");
    let response = server.get("/unconfirmed").await;
    response.assert_status_ok();
    response.assert_text_contains("not confirmed");

    // jane's token does not confirm john
    let token = tokens::seal(&state.config.secret_key, Purpose::Confirm, jane.id, 3600).unwrap();
    server.get(&format!("/confirm/{token}")).await;
    let john_now = user::find_by_id(&state.db, john.id).await.unwrap().unwrap();
    assert!(!john_now.confirmed);
    let response = server.get("/unconfirmed").await;
    response.assert_text_contains("The confirmation link is invalid or has expired.");

    let token = tokens::seal(&state.config.secret_key, Purpose::Confirm, john.id, 3600).unwrap();
    let response = server.get(&format!("/confirm/{token}")).await;
    assert_eq!(location(&response), "/");
    let john_now = user::find_by_id(&state.db, john.id).await.unwrap().unwrap();
    assert!(john_now.confirmed);
    let jane_now = user::find_by_id(&state.db, jane.id).await.unwrap().unwrap();
    assert!(!jane_now.confirmed);

    server.get(&current_edit_url()).await.assert_status_ok();
}

#[tokio::test]
async fn test_resend_confirmation() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", false).await;
    let server = server(state.clone());
    login(&server, "john@example.com", "cat").await;

    let response = server.get("/confirm").await;
    assert_eq!(location(&response), "/");
    let mail = sent_mail(&state).await;
    assert_eq!(mail.len(), 1);
    assert_eq!(recipients(&mail[0].0), ["john@example.com"]);
}

#[tokio::test]
async fn test_change_password() {
    let state = state().await;
    add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state.clone());
    login(&server, "john@example.com", "cat").await;

    let response = server
        .post("/settings")
        .form(&[
            ("old_password", "dog"),
            ("new_password", "bird"),
            ("new_password2", "bird"),
        ])
        .await;
    response.assert_status_ok();
    response.assert_text_contains("Incorrect current password");

    let response = server
        .post("/settings")
        .form(&[
            ("old_password", "cat"),
            ("new_password", "bird"),
            ("new_password2", "bird"),
        ])
        .await;
    assert_eq!(location(&response), "/settings");

    let authenticated = user::authenticate(&state.db, "john@example.com", "bird")
        .await
        .unwrap();
    assert!(authenticated.is_some());
}

#[tokio::test]
async fn test_reset_password() {
    let state = state().await;
    let john = add_user(&state, "john@example.com", "cat", true).await;
    let server = server(state.clone());

    let response = server
        .post("/request_reset")
        .form(&[("email", "john@example.com")])
        .await;
    assert_eq!(location(&response), "/login");
    let response = server
        .post("/request_reset")
        .form(&[("email", "nobody@example.com")])
        .await;
    assert_eq!(location(&response), "/login");
    assert_eq!(sent_mail(&state).await.len(), 1);

    let response = server
        .post("/reset/garbage")
        .form(&[("new_password", "bird"), ("new_password2", "bird")])
        .await;
    assert_eq!(location(&response), "/login");
    let response = server.get("/login").await;
    response.assert_text_contains("Password reset failed. Please try again");

    let token = tokens::seal(&state.config.secret_key, Purpose::Reset, john.id, 3600).unwrap();
    let response = server
        .post(&format!("/reset/{token}"))
        .form(&[("new_password", "bird"), ("new_password2", "bird")])
        .await;
    assert_eq!(location(&response), "/login");

    login(&server, "john@example.com", "bird").await;
    server.get(&current_edit_url()).await.assert_status_ok();
}

#[tokio::test]
async fn test_unknown_page() {
    let state = state().await;
    let server = server(state);

    let response = server.get("/nothing/here").await;
    response.assert_status_not_found();
    response.assert_text_contains("Page not found");
}
