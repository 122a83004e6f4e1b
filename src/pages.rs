//! Server-rendered HTML.

use axum::{http::StatusCode, response::Html};
use chrono::NaiveDate;
use pulldown_cmark_escape::escape_html;

use crate::{
    models::{
        snippet::{Snippet, SnippetPage},
        user,
    },
    utils::markdown,
};

/// Escape text for use in HTML content and double-quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // writing into a String cannot fail
    let _ = escape_html(&mut escaped, text);
    escaped
}

/// Build `path?key=value&...`, leaving out `None` values.
pub fn url_with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let params: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
        .collect();
    match serde_urlencoded::to_string(&params) {
        Ok(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_owned(),
    }
}

fn layout(title: &str, user: Option<&user::Model>, flashes: &[String], body: &str) -> Html<String> {
    let nav = match user {
        Some(user) => format!(
            r#"<a href="/edit">This week</a> <a href="/history">History</a> <a href="/settings">{name}</a> <a href="/logout">Log out</a>"#,
            name = escape(&user.name)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/register">Register</a>"#.to_owned(),
    };
    let flashes: String = flashes
        .iter()
        .map(|message| format!(r#"<div class="flash">{}</div>"#, escape(message)))
        .collect();
    Html(format!(
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="UTF-8"><title>{title} - lastweek</title></head><body><nav><a href="/">lastweek</a> {nav}</nav>{flashes}<main>{body}</main></body></html>"#,
        title = escape(title),
    ))
}

fn errors_list(errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape(e)))
        .collect();
    format!(r#"<ul class="errors">{}</ul>"#, items)
}

pub fn index(flashes: &[String]) -> Html<String> {
    layout(
        "Welcome",
        None,
        flashes,
        r#"<h1>lastweek</h1><p>Write down what you did this week, tag it, and find it again later.</p><p><a href="/login">Log in</a> or <a href="/register">register</a> to get started.</p>"#,
    )
}

pub fn login(flashes: &[String], errors: &[String], email: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Log in</h1>{errors}<form method="post"><label>Email <input type="email" name="email" value="{email}" required></label><label>Password <input type="password" name="password" required></label><button type="submit">Log in</button></form><p><a href="/request_reset">Forgot your password?</a></p><p>New user? <a href="/register">Register</a></p>"#,
        errors = errors_list(errors),
        email = escape(email),
    );
    layout("Log in", None, flashes, &body)
}

pub fn register(flashes: &[String], errors: &[String], name: &str, email: &str) -> Html<String> {
    let body = format!(
        r#"<h1>Register</h1>{errors}<form method="post"><label>Name <input type="text" name="name" value="{name}" required></label><label>Email <input type="email" name="email" value="{email}" required></label><label>Password <input type="password" name="password" required></label><label>Confirm password <input type="password" name="password2" required></label><button type="submit">Register</button></form>"#,
        errors = errors_list(errors),
        name = escape(name),
        email = escape(email),
    );
    layout("Register", None, flashes, &body)
}

pub fn unconfirmed(user: &user::Model, flashes: &[String]) -> Html<String> {
    let body = format!(
        r#"<h1>Hello, {name}!</h1><p>You have not confirmed your account yet. Please check your inbox at {email} for the confirmation link.</p><p>Need another one? <a href="/confirm">Send a new confirmation email</a></p>"#,
        name = escape(&user.name),
        email = escape(&user.email),
    );
    layout("Confirm your account", Some(user), flashes, &body)
}

pub fn settings(user: &user::Model, flashes: &[String], errors: &[String]) -> Html<String> {
    let body = format!(
        r#"<h1>Settings</h1><p>Member since {since}</p><h2>Change password</h2>{errors}<form method="post"><label>Current password <input type="password" name="old_password" required></label><label>New password <input type="password" name="new_password" required></label><label>Confirm new password <input type="password" name="new_password2" required></label><button type="submit">Update password</button></form>"#,
        since = user.member_since,
        errors = errors_list(errors),
    );
    layout("Settings", Some(user), flashes, &body)
}

pub fn request_reset(flashes: &[String], errors: &[String]) -> Html<String> {
    let body = format!(
        r#"<h1>Reset your password</h1>{errors}<form method="post"><label>Email <input type="email" name="email" required></label><button type="submit">Send reset email</button></form>"#,
        errors = errors_list(errors),
    );
    layout("Reset your password", None, flashes, &body)
}

pub fn reset(flashes: &[String], errors: &[String]) -> Html<String> {
    let body = format!(
        r#"<h1>Set a new password</h1>{errors}<form method="post"><label>New password <input type="password" name="new_password" required></label><label>Confirm password <input type="password" name="new_password2" required></label><button type="submit">Reset password</button></form>"#,
        errors = errors_list(errors),
    );
    layout("Set a new password", None, flashes, &body)
}

fn tag_links(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| {
            format!(
                r#"<a class="tag" href="{href}">{text}</a> "#,
                href = escape(&url_with_query("/history", &[("tag", Some(tag.clone()))])),
                text = escape(tag),
            )
        })
        .collect()
}

pub fn edit(
    user: &user::Model,
    flashes: &[String],
    snippet: &Snippet,
    week_begin: NaiveDate,
) -> Html<String> {
    let preview = if snippet.text.is_empty() {
        String::new()
    } else {
        format!(r#"<section class="preview">{}</section>"#, markdown::render(&snippet.text))
    };
    let body = format!(
        r#"<h1>Week of {week_begin}</h1><p>{name}, what have you done this week?</p>{preview}<p>{tags}</p><form method="post" action="/edit/{year}/{week}"><textarea name="text" rows="12">{text}</textarea><label>Tags <input type="text" name="tags" value="{tag_list}"></label><button type="submit">Save</button></form>"#,
        week_begin = week_begin.format("%B %-d, %Y"),
        name = escape(&user.name),
        tags = tag_links(&snippet.tags),
        year = snippet.week.year,
        week = snippet.week.week,
        text = escape(&snippet.text),
        tag_list = escape(&snippet.tags.join(", ")),
    );
    layout(&format!("Week {}", snippet.week), Some(user), flashes, &body)
}

pub fn history(
    user: &user::Model,
    flashes: &[String],
    page: &SnippetPage,
    tag: Option<&str>,
) -> Html<String> {
    let snippets: String = page
        .snippets
        .iter()
        .map(|snippet| {
            let heading = match snippet.week.monday() {
                Some(monday) => format!("Week of {}", monday.format("%B %-d, %Y")),
                None => snippet.week.to_string(),
            };
            format!(
                r#"<article><h2><a href="/edit/{year}/{week}">{heading}</a></h2>{content}<p>{tags}</p></article>"#,
                year = snippet.week.year,
                week = snippet.week.week,
                heading = heading,
                content = markdown::render(&snippet.text),
                tags = tag_links(&snippet.tags),
            )
        })
        .collect();

    let link = |number: u64| {
        escape(&url_with_query(
            "/history",
            &[
                ("page", Some(number.to_string())),
                ("tag", tag.map(str::to_owned)),
            ],
        ))
    };
    let mut pagination = String::new();
    if page.has_prev() {
        pagination.push_str(&format!(r#"<a rel="prev" href="{}">Newer</a> "#, link(page.page - 1)));
    }
    if page.has_next() {
        pagination.push_str(&format!(r#"<a rel="next" href="{}">Older</a>"#, link(page.page + 1)));
    }

    let title = match tag {
        Some(tag) => format!("History: {}", tag),
        None => "History".to_owned(),
    };
    let body = if page.snippets.is_empty() {
        format!("<h1>{}</h1><p>Nothing here yet.</p>", escape(&title))
    } else {
        format!(
            r#"<h1>{title}</h1>{snippets}<nav class="pagination">{pagination}</nav>"#,
            title = escape(&title),
        )
    };
    layout(&title, Some(user), flashes, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = match status {
        StatusCode::NOT_FOUND => "Page not found",
        StatusCode::INTERNAL_SERVER_ERROR => "Internal server error",
        _ => status.canonical_reason().unwrap_or("Error"),
    };
    let body = format!(
        r#"<h1>{title}</h1><p>{message}</p><p><a href="/">Back home</a></p>"#,
        title = escape(title),
        message = escape(message),
    );
    layout(title, None, &[], &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; 'Jerry'&lt;/a&gt;"
        );
    }

    #[test]
    fn test_url_with_query() {
        assert_eq!(url_with_query("/history", &[("tag", None)]), "/history");
        assert_eq!(
            url_with_query(
                "/api/weeks/",
                &[("page", Some("2".into())), ("tag", Some("a b&c".into()))]
            ),
            "/api/weeks/?page=2&tag=a+b%26c"
        );
    }

    #[test]
    fn test_error_page() {
        let Html(page) = error_page(StatusCode::NOT_FOUND, "resource not found");
        assert!(page.contains("Page not found"));
        assert!(page.contains("resource not found"));
    }

    #[test]
    fn test_edit_page_escapes_text() {
        let user = user::Model {
            id: 1,
            email: "john@example.com".into(),
            name: "John".into(),
            password_hash: String::new(),
            confirmed: true,
            member_since: NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
        };
        let snippet = Snippet {
            week: crate::week::IsoWeek::new(2017, 9),
            text: "<script>".into(),
            tags: vec!["blue".into(), "red".into()],
            saved: true,
        };
        let Html(page) = edit(&user, &[], &snippet, NaiveDate::from_ymd_opt(2017, 2, 27).unwrap());
        assert!(page.contains("Week of February 27, 2017"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
        assert!(page.contains(r#"value="blue, red""#));
    }
}
