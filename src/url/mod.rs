//! Item URL canonicalisation
//!
//! Listing pages and feeds hand out the same article under slightly
//! different URLs (relative hrefs, tracking parameters, fragments). The
//! canonical form produced here is the within-source dedup key.

use url::Url;

/// Query parameters that only carry campaign or click tracking
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "mc_cid", "igshid"];

/// href schemes that never lead to an article
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Canonicalises a listing href
///
/// Resolves `href` against `base`, drops the fragment and tracking
/// parameters, and lowercases the host. Returns `None` for links that
/// cannot lead to an article: empty or fragment-only hrefs,
/// `javascript:`/`mailto:`/`tel:`/`data:` links, and anything that does
/// not resolve to http(s).
///
/// # Examples
///
/// ```
/// use news_harvester::url::canonical_item_url;
/// use url::Url;
///
/// let base = Url::parse("https://Example.com/blog/").unwrap();
/// assert_eq!(
///     canonical_item_url("post-1?utm_source=x#top", Some(&base)).as_deref(),
///     Some("https://example.com/blog/post-1")
/// );
/// assert_eq!(canonical_item_url("mailto:me@example.com", Some(&base)), None);
/// ```
pub fn canonical_item_url(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let mut url = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_lowercase();
    url.set_host(Some(&host)).ok()?;
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Some(url.to_string())
}
