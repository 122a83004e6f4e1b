//! Markdown rendering for snippet text.

use pulldown_cmark::{html, Event, Options, Parser};

/// Render markdown to HTML. Raw HTML in the source is escaped, not passed through.
pub fn render(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_list() {
        let out = render("- one\n- two\n");
        assert!(out.contains("<ul>"));
        assert!(out.contains("<li>one</li>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let out = render("<script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }
}
