use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// Renders assistant replies. Raw HTML in the input is shown as text, never
/// passed through, and links or images pointing anywhere but http(s), mailto
/// or a relative path are pointed at `#`.
pub fn render(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    if is_safe_url(&url) { url } else { CowStr::Borrowed("#") }
}

fn is_safe_url(url: &str) -> bool {
    let url = url.trim();
    // No scheme at all: relative path, fragment or query.
    let scheme_end = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if url[i..].starts_with(':') => {
            let scheme = url[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        },
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_lists() {
        let out = render("Try **Arrival**.\n\n- Heat\n- Ronin\n");
        assert!(out.contains("<strong>Arrival</strong>"));
        assert!(out.contains("<li>Heat</li>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let out = render("hello <script>alert(1)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_links_are_defused() {
        let out = render("[click](javascript:alert(document.cookie))");
        assert!(!out.contains("javascript:"), "{out}");
        assert!(out.contains(r##"<a href="#">click</a>"##), "{out}");

        let out = render("![x](JavaScript:alert(1)) [y](data:text/html,hi)");
        assert!(!out.to_lowercase().contains("javascript:"), "{out}");
        assert!(!out.contains("data:"), "{out}");
    }

    #[test]
    fn ordinary_links_are_kept() {
        let out = render("[tmdb](https://www.themoviedb.org) [home](/movies/1) [mail](mailto:a@b.c)");
        assert!(out.contains(r#"href="https://www.themoviedb.org""#), "{out}");
        assert!(out.contains(r#"href="/movies/1""#), "{out}");
        assert!(out.contains(r#"href="mailto:"#), "{out}");
    }
}
