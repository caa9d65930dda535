//! Streaming HTML rewriting for proxied documents.
//!
//! One pass over the document with `lol_html` applies every URL-bearing
//! context at once:
//! - `<form action>` path-absolute → `<proxy origin>/proxy?url=<encoded absolute>`
//! - `<img|video|audio|source src>` path-absolute → absolute on the original site
//! - inline `style` `url(...)` path-absolute → absolute, quoting preserved
//! - bootstrap script appended to `<head>` (or to the document end without one)
//!
//! A reference that fails to resolve stays as written; the rest of the
//! document is still rewritten. Output of a rewrite fed back in comes out
//! unchanged.

use std::cell::Cell;
use std::sync::LazyLock;

use lol_html::html_content::ContentType;
use encoding_rs::Encoding;
use lol_html::{element, end, HtmlRewriter, Settings};
use regex::{Captures, Regex};
use thiserror::Error;
use url::Url;

use crate::observability::metrics;
use crate::rewrite::bootstrap::{bootstrap_script, BOOTSTRAP_MARKER};
use crate::rewrite::charset::rewriter_encoding;
use crate::rewrite::resolver::{is_path_absolute, resolve, to_proxied_at};

/// `url(...)` inside a style attribute. Group 1 is the quote, group 2 the reference.
static STYLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(["']?)([^"')]+?)\s*["']?\s*\)"#)
        .expect("STYLE_URL_RE: hardcoded regex is valid")
});

/// Whole-document failure. Per-attribute problems never surface here.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite failed: {0}")]
    Parser(String),
}

/// What a rewrite pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub forms: usize,
    pub media: usize,
    pub styles: usize,
    /// References left untouched because they did not resolve.
    pub skipped: usize,
    pub bootstrap_injected: bool,
}

/// A transformed document, in the encoding it was parsed with.
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    pub body: Vec<u8>,
    pub encoding: &'static Encoding,
    pub stats: RewriteStats,
}

/// Stateless document transform; safe to share across requests.
#[derive(Debug, Clone, Copy)]
pub struct PageRewriter {
    inject_bootstrap: bool,
}

impl Default for PageRewriter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PageRewriter {
    pub fn new(inject_bootstrap: bool) -> Self {
        Self { inject_bootstrap }
    }

    /// Rewrite `html` fetched from `original_url` for serving from `proxy_origin`.
    ///
    /// Bytes outside rewritten attributes pass through unchanged, so the
    /// result stays in `encoding`.
    pub fn rewrite(
        &self,
        html: &[u8],
        encoding: &'static Encoding,
        original_url: &Url,
        proxy_origin: &str,
    ) -> Result<RewrittenPage, RewriteError> {
        let script = bootstrap_script(proxy_origin, original_url.as_str());
        let inject = self.inject_bootstrap;

        let forms = Cell::new(0usize);
        let media = Cell::new(0usize);
        let styles = Cell::new(0usize);
        let skipped = Cell::new(0usize);
        let injected = Cell::new(false);

        let mut output = Vec::with_capacity(html.len() + script.len());
        let marker_selector = format!("script[{}]", BOOTSTRAP_MARKER);

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![
                    // A previous pass's bootstrap is replaced, never stacked.
                    element!(marker_selector, |el| {
                        if inject {
                            el.remove();
                        }
                        Ok(())
                    }),
                    element!("head", |el| {
                        if inject && !injected.get() {
                            el.append(&script, ContentType::Html);
                            injected.set(true);
                        }
                        Ok(())
                    }),
                    element!("form[action]", |el| {
                        let Some(action) = el.get_attribute("action") else {
                            return Ok(());
                        };
                        if !is_path_absolute(&action) {
                            return Ok(());
                        }
                        match resolve(&action, original_url) {
                            Ok(absolute) => {
                                el.set_attribute("action", &to_proxied_at(proxy_origin, &absolute))?;
                                forms.set(forms.get() + 1);
                            }
                            Err(e) => skip("action", &action, &e, &skipped),
                        }
                        Ok(())
                    }),
                    element!("img[src], video[src], audio[src], source[src]", |el| {
                        let Some(src) = el.get_attribute("src") else {
                            return Ok(());
                        };
                        if !is_path_absolute(&src) {
                            return Ok(());
                        }
                        match resolve(&src, original_url) {
                            Ok(absolute) => {
                                el.set_attribute("src", &absolute)?;
                                media.set(media.get() + 1);
                            }
                            Err(e) => skip("src", &src, &e, &skipped),
                        }
                        Ok(())
                    }),
                    element!("[style]", |el| {
                        let Some(style) = el.get_attribute("style") else {
                            return Ok(());
                        };
                        if !style.contains("url(") {
                            return Ok(());
                        }
                        let (rewritten, changed, failed) = rewrite_style(&style, original_url);
                        skipped.set(skipped.get() + failed);
                        if changed > 0 {
                            el.set_attribute("style", &rewritten)?;
                            styles.set(styles.get() + changed);
                        }
                        Ok(())
                    }),
                ],
                document_content_handlers: vec![end!(|end| {
                    if inject && !injected.get() {
                        end.append(&script, ContentType::Html);
                        injected.set(true);
                    }
                    Ok(())
                })],
                encoding: rewriter_encoding(encoding),
                ..Settings::default()
            },
            |chunk: &[u8]| output.extend_from_slice(chunk),
        );

        rewriter
            .write(html)
            .map_err(|e| RewriteError::Parser(e.to_string()))?;
        rewriter
            .end()
            .map_err(|e| RewriteError::Parser(e.to_string()))?;

        let stats = RewriteStats {
            forms: forms.get(),
            media: media.get(),
            styles: styles.get(),
            skipped: skipped.get(),
            bootstrap_injected: injected.get(),
        };
        if stats.skipped > 0 {
            metrics::record_rewrite_skips(stats.skipped);
        }

        Ok(RewrittenPage {
            body: output,
            encoding,
            stats,
        })
    }
}

fn skip(attribute: &str, value: &str, error: &dyn std::fmt::Display, skipped: &Cell<usize>) {
    tracing::debug!(attribute, value = %value, error = %error, "Leaving unresolvable reference untouched");
    skipped.set(skipped.get() + 1);
}

/// Rewrite path-absolute `url(...)` references in one style attribute.
///
/// Returns the new text, how many references changed and how many failed.
fn rewrite_style(style: &str, base: &Url) -> (String, usize, usize) {
    let mut changed = 0;
    let mut failed = 0;
    let rewritten = STYLE_URL_RE.replace_all(style, |caps: &Captures<'_>| {
        let quote = &caps[1];
        let reference = &caps[2];
        if !is_path_absolute(reference) {
            return caps[0].to_string();
        }
        match resolve(reference, base) {
            Ok(absolute) => {
                changed += 1;
                format!("url({quote}{absolute}{quote})")
            }
            Err(e) => {
                tracing::debug!(attribute = "style", value = %reference, error = %e, "Leaving unresolvable reference untouched");
                failed += 1;
                caps[0].to_string()
            }
        }
    });
    (rewritten.into_owned(), changed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, UTF_8, WINDOWS_1252};

    const ORIGIN: &str = "http://localhost:3000";

    fn base() -> Url {
        Url::parse("https://site.com/page").unwrap()
    }

    struct Page {
        html: String,
        stats: RewriteStats,
    }

    fn run(html: &str) -> Page {
        let page = PageRewriter::new(false)
            .rewrite(html.as_bytes(), UTF_8, &base(), ORIGIN)
            .unwrap();
        Page {
            html: String::from_utf8(page.body).unwrap(),
            stats: page.stats,
        }
    }

    fn run_with_bootstrap(html: &str) -> String {
        let page = PageRewriter::default()
            .rewrite(html.as_bytes(), UTF_8, &base(), ORIGIN)
            .unwrap();
        String::from_utf8(page.body).unwrap()
    }

    #[test]
    fn test_form_action_goes_through_proxy() {
        let page = run(r#"<form action="/submit"><input name="q"></form>"#);
        assert_eq!(
            page.html,
            r#"<form action="http://localhost:3000/proxy?url=https%3A%2F%2Fsite.com%2Fsubmit"><input name="q"></form>"#
        );
        assert_eq!(page.stats.forms, 1);
    }

    #[test]
    fn test_media_sources_become_absolute() {
        let page = run(concat!(
            r#"<img src="/a.png"><video src="/v.mp4"></video>"#,
            r#"<audio src="/s.mp3"></audio><picture><source src="/b.webp"></picture>"#
        ));
        assert!(page.html.contains(r#"<img src="https://site.com/a.png">"#));
        assert!(page.html.contains(r#"<video src="https://site.com/v.mp4">"#));
        assert!(page.html.contains(r#"<audio src="https://site.com/s.mp3">"#));
        assert!(page.html.contains(r#"<source src="https://site.com/b.webp">"#));
        assert_eq!(page.stats.media, 4);
    }

    #[test]
    fn test_scheme_qualified_and_relative_untouched() {
        let html = r#"<img src="https://cdn.com/x.png"><img src="rel.png"><form action="https://other.com/go"></form><img src="data:image/gif;base64,R0lG">"#;
        let page = run(html);
        assert_eq!(page.html, html);
        assert_eq!(page.stats, RewriteStats::default());
    }

    #[test]
    fn test_elements_without_attribute_are_skipped() {
        let html = r#"<form method="post"></form><img alt="x"><div style="color: red"></div>"#;
        assert_eq!(run(html).html, html);
    }

    #[test]
    fn test_style_urls_keep_quoting_and_other_declarations() {
        let page = run(concat!(
            r#"<div style="color: red; background: url('/bg.png') no-repeat; "#,
            r#"border-image: url(/b.png) 30; cursor: url(https://c.com/c.cur)"></div>"#
        ));
        assert!(page.html.contains("color: red; background: url('https://site.com/bg.png') no-repeat;"));
        assert!(page.html.contains("border-image: url(https://site.com/b.png) 30;"));
        assert!(page.html.contains("cursor: url(https://c.com/c.cur)"));
        assert_eq!(page.stats.styles, 2);
    }

    #[test]
    fn test_double_quoted_style_url() {
        let page = run(r#"<span style='background-image: url("/hero.jpg")'></span>"#);
        assert!(page.html.contains("https://site.com/hero.jpg"));
        assert!(!page.html.contains("\"/hero.jpg"));
        assert_eq!(page.stats.styles, 1);
    }

    #[test]
    fn test_bad_attribute_does_not_abort_document() {
        let page = run(r#"<img src="//exa mple.com/x.png"><img src="/ok.png"><form action="/send"></form>"#);
        assert!(page.html.contains(r#"<img src="//exa mple.com/x.png">"#));
        assert!(page.html.contains(r#"<img src="https://site.com/ok.png">"#));
        assert!(page.html.contains("proxy?url=https%3A%2F%2Fsite.com%2Fsend"));
        assert_eq!(page.stats.skipped, 1);
    }

    #[test]
    fn test_bootstrap_lands_in_head() {
        let html = run_with_bootstrap("<html><head><title>t</title></head><body></body></html>");
        let script_at = html.find("<script data-relay-bootstrap>").unwrap();
        assert!(script_at > html.find("<title>").unwrap());
        assert!(script_at < html.find("</head>").unwrap());
        assert!(html.contains(r#"var originalUrl = "https://site.com/page";"#));
        assert!(html.contains(r#"var proxyBase = "http://localhost:3000";"#));
    }

    #[test]
    fn test_bootstrap_without_head_goes_to_end() {
        let html = run_with_bootstrap("<p>fragment</p>");
        assert!(html.starts_with("<p>fragment</p><script data-relay-bootstrap>"));
        assert!(html.ends_with("</script>"));
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let inputs = [
            concat!(
                r#"<html><head><title>x</title></head><body>"#,
                r#"<form action="/login"></form><img src="/a.png">"#,
                r#"<div style="background:url('/bg.png')"></div><a href="/next">n</a>"#,
                r#"</body></html>"#
            ),
            r#"<div><img src="/x.png"></div>"#,
        ];
        for input in inputs {
            let once = run_with_bootstrap(input);
            let twice = run_with_bootstrap(&once);
            assert_eq!(once, twice);
            assert_eq!(once.matches(BOOTSTRAP_MARKER).count(), 1);
        }
    }

    #[test]
    fn test_single_byte_encoding_survives() {
        let html = b"<html><head><meta charset=\"iso-8859-1\"></head><body><p>caf\xe9 \xa9</p><img src=\"/a.png\"></body></html>";
        let page = PageRewriter::default()
            .rewrite(html, WINDOWS_1252, &base(), ORIGIN)
            .unwrap();

        assert_eq!(page.encoding, WINDOWS_1252);
        assert!(find(&page.body, b"<p>caf\xe9 \xa9</p>"));
        assert!(find(&page.body, b"<img src=\"https://site.com/a.png\">"));
        assert!(find(&page.body, b"data-relay-bootstrap"));
    }

    #[test]
    fn test_multi_byte_encoding_survives() {
        let (encoded, _, _) = SHIFT_JIS.encode("<p>\u{65e5}\u{672c}\u{8a9e}</p><form action=\"/s\"></form>");
        let page = PageRewriter::new(false)
            .rewrite(&encoded, SHIFT_JIS, &base(), ORIGIN)
            .unwrap();

        let (decoded, _, had_errors) = SHIFT_JIS.decode(&page.body);
        assert!(!had_errors);
        assert!(decoded.contains("<p>\u{65e5}\u{672c}\u{8a9e}</p>"));
        assert!(decoded.contains("proxy?url=https%3A%2F%2Fsite.com%2Fs"));
    }

    fn find(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|window| window == needle)
    }
}
