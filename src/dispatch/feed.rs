use crate::model::RawItem;
use crate::url::canonical_item_url;
use chrono::{DateTime, Utc};
use url::Url;

/// Parses RSS XML into raw items
///
/// Items without a usable link are skipped. `pubDate` (RFC 2822) is
/// converted to RFC 3339; a `comments` link pointing elsewhere becomes the
/// discussion URL.
pub fn parse_feed(bytes: &[u8], base: &Url) -> Result<Vec<RawItem>, rss::Error> {
    let channel = rss::Channel::read_from(bytes)?;

    let items = channel
        .items()
        .iter()
        .filter_map(|item| {
            let url = canonical_item_url(item.link()?, Some(base))?;
            let title = item
                .title()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| url.clone());
            let date = item.pub_date().and_then(|d| {
                DateTime::parse_from_rfc2822(d.trim())
                    .ok()
                    .map(|parsed| parsed.with_timezone(&Utc).to_rfc3339())
            });
            let discussion_url = item
                .comments()
                .and_then(|c| canonical_item_url(c, Some(base)))
                .filter(|c| c != &url);

            Some(RawItem {
                title,
                url,
                date,
                upvotes: None,
                discussion_url,
            })
        })
        .collect();

    Ok(items)
}
