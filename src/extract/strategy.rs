use super::profile::ExtractionProfile;
use super::text::clean_text;
use scraper::{Html, Selector};

/// Where the extracted text came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOrigin {
    /// A content-container selector matched (the raw selector string)
    Selector(String),
    /// No selector matched; the cleaned `<body>` was used
    Body,
    /// Nothing usable was found
    Nothing,
}

/// Extracted article text and its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub origin: ExtractionOrigin,
}

impl Extraction {
    fn nothing() -> Self {
        Self {
            text: String::new(),
            origin: ExtractionOrigin::Nothing,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Extracts clean article text from an HTML snapshot
///
/// Returns `""` when neither a content container nor the body yields text.
pub fn extract(html: &str, profile: &ExtractionProfile) -> String {
    extract_detailed(html, profile).text
}

/// Like [`extract`], also reporting which path produced the text
///
/// Selector order is respected: once a selector's first match yields
/// non-empty text, later selectors and the body fallback are not consulted.
pub fn extract_detailed(html: &str, profile: &ExtractionProfile) -> Extraction {
    let document = Html::parse_document(html);

    for (raw, selector) in profile.selectors() {
        let Some(element) = document.select(selector).next() else {
            continue;
        };
        let text = clean_text(element, profile.denylist());
        if !text.is_empty() {
            tracing::debug!(
                "Profile '{}' matched '{}' ({} chars)",
                profile.name(),
                raw,
                text.len()
            );
            return Extraction {
                text,
                origin: ExtractionOrigin::Selector(raw.clone()),
            };
        }
    }

    if !profile.body_fallback() {
        return Extraction::nothing();
    }

    let Ok(body_selector) = Selector::parse("body") else {
        return Extraction::nothing();
    };
    match document.select(&body_selector).next() {
        Some(body) => {
            let text = clean_text(body, profile.denylist());
            if text.is_empty() {
                Extraction::nothing()
            } else {
                tracing::debug!("Profile '{}' fell back to body", profile.name());
                Extraction {
                    text,
                    origin: ExtractionOrigin::Body,
                }
            }
        }
        None => Extraction::nothing(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ProfileRegistry;

    fn generic() -> std::sync::Arc<ExtractionProfile> {
        ProfileRegistry::builtin().get("generic")
    }

    #[test]
    fn test_article_selector_wins() {
        let html = r#"<html><body>
            <div class="promo">Subscribe now</div>
            <article><h1>Title</h1><p>Body text.</p></article>
        </body></html>"#;
        let result = extract_detailed(html, &generic());
        assert_eq!(result.text, "Title\nBody text.");
        assert_eq!(result.origin, ExtractionOrigin::Selector("article".to_string()));
    }

    #[test]
    fn test_primary_match_never_uses_body() {
        let html = r#"<html><body>
            <p>Outside</p>
            <main><p>Inside main</p></main>
        </body></html>"#;
        let result = extract_detailed(html, &generic());
        assert_eq!(result.origin, ExtractionOrigin::Selector("main".to_string()));
        assert!(!result.text.contains("Outside"));
    }

    #[test]
    fn test_empty_container_moves_to_next_selector() {
        let html = r#"<html><body>
            <article><script>track()</script></article>
            <div class="markdown-body"><p>Readme text</p></div>
        </body></html>"#;
        let result = extract_detailed(html, &generic());
        assert_eq!(
            result.origin,
            ExtractionOrigin::Selector(".markdown-body".to_string())
        );
        assert_eq!(result.text, "Readme text");
    }

    #[test]
    fn test_body_fallback_strips_denylist() {
        let html = r#"<html><body>
            <header>Site header</header>
            <nav>Home | About</nav>
            <div><p>Plain page text</p></div>
            <div class="cookie-notice">We use cookies</div>
            <footer>Copyright</footer>
        </body></html>"#;
        let result = extract_detailed(html, &generic());
        assert_eq!(result.origin, ExtractionOrigin::Body);
        assert_eq!(result.text, "Plain page text");
    }

    #[test]
    fn test_whitespace_inside_matched_container() {
        let html = "<html><body><article>Hello\n\n\n   World  \t\n</article></body></html>";
        assert_eq!(extract(html, &generic()), "Hello\nWorld");
    }

    #[test]
    fn test_discussion_thread_profile() {
        let html = r#"<html><body><table id="hnmain">
            <tr><td><table class="fatitem"><tr><td>Show HN: A thing</td></tr></table></td></tr>
            <tr><td><table class="comment-tree"><tr><td>First comment</td></tr></table></td></tr>
        </table></body></html>"#;
        let registry = ProfileRegistry::builtin();
        let result = extract_detailed(html, &registry.discussion());
        assert_eq!(
            result.origin,
            ExtractionOrigin::Selector(".comment-tree".to_string())
        );
        assert_eq!(result.text, "First comment");
    }

    #[test]
    fn test_huggingface_prose() {
        let html = r#"<html><body>
            <div class="hub-header">Hub</div>
            <div class="prose"><h1>Blog post</h1><p>Paragraph</p><button>Copy</button></div>
        </body></html>"#;
        let registry = ProfileRegistry::builtin();
        assert_eq!(
            extract(html, &registry.get("huggingface_blog")),
            "Blog post\nParagraph"
        );
    }

    #[test]
    fn test_empty_document() {
        let result = extract_detailed("", &generic());
        assert_eq!(result.origin, ExtractionOrigin::Nothing);
        assert!(result.is_empty());
    }

    #[test]
    fn test_no_body_fallback_when_disabled() {
        let profile = ExtractionProfile::new("strict", &["article"], &["nav"], false).unwrap();
        let result = extract_detailed("<html><body><p>text</p></body></html>", &profile);
        assert_eq!(result.origin, ExtractionOrigin::Nothing);
    }
}
