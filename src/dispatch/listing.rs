//! Listing-page parsers
//!
//! Each parser is a pure function of a listing page's HTML snapshot and
//! the listing URL (for resolving relative hrefs).

use crate::model::{ListingProfile, RawItem};
use crate::url::canonical_item_url;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use url::Url;

const HACKER_NEWS_ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

/// Listing entries for a known site profile
pub fn parse_listing(profile: ListingProfile, html: &str, base: &Url) -> Vec<RawItem> {
    match profile {
        ListingProfile::HuggingFaceBlog => parse_huggingface_listing(html, base),
        ListingProfile::HackerNews => parse_hacker_news_listing(html, base),
    }
}

#[derive(Debug, Deserialize)]
struct CardProps {
    blog: Option<BlogCard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlogCard {
    title: Option<String>,
    slug: Option<String>,
    published_at: Option<String>,
    upvotes: Option<i64>,
}

/// Blog cards hydrated from JSON `data-props` attributes
pub fn parse_huggingface_listing(html: &str, base: &Url) -> Vec<RawItem> {
    let document = Html::parse_document(html);
    let Ok(cards) = Selector::parse("[data-props]") else {
        return Vec::new();
    };

    document
        .select(&cards)
        .filter_map(|card| {
            let raw = card.value().attr("data-props")?;
            let props: CardProps = match serde_json::from_str(raw) {
                Ok(props) => props,
                Err(e) => {
                    tracing::debug!("Skipping card with unreadable data-props: {}", e);
                    return None;
                }
            };
            let blog = props.blog?;
            let slug = blog.slug?;
            let url = canonical_item_url(&format!("/blog/{}", slug.trim_start_matches('/')), Some(base))?;
            Some(RawItem {
                title: blog.title.unwrap_or_else(|| slug.clone()),
                url,
                date: blog.published_at,
                upvotes: blog.upvotes,
                discussion_url: None,
            })
        })
        .collect()
}

/// Story rows (`.athing`) with score and age from the following subtext row
pub fn parse_hacker_news_listing(html: &str, base: &Url) -> Vec<RawItem> {
    let document = Html::parse_document(html);
    let (Ok(rows), Ok(title_link), Ok(score), Ok(age)) = (
        Selector::parse(".athing"),
        Selector::parse(".titleline > a"),
        Selector::parse(".score"),
        Selector::parse(".age"),
    ) else {
        return Vec::new();
    };

    document
        .select(&rows)
        .filter_map(|row| {
            let anchor = row.select(&title_link).next()?;
            let url = canonical_item_url(anchor.value().attr("href")?, Some(base))?;
            let title = element_text(anchor);

            let subtext = row.next_siblings().find_map(ElementRef::wrap);
            let upvotes = subtext
                .and_then(|s| s.select(&score).next())
                .and_then(|s| leading_number(&element_text(s)));
            let date = subtext
                .and_then(|s| s.select(&age).next())
                .and_then(|a| a.value().attr("title"))
                .and_then(parse_age_title);

            let discussion_url = row
                .value()
                .attr("id")
                .filter(|id| !id.is_empty())
                .map(|id| format!("{}{}", HACKER_NEWS_ITEM_URL, id));

            Some(RawItem {
                title,
                url,
                date,
                upvotes,
                discussion_url,
            })
        })
        .collect()
}

/// Anchors matched by `selector`, or the first `a[href]` inside each match
pub fn parse_generic_listing(html: &str, base: &Url, selector: &str) -> Vec<RawItem> {
    let document = Html::parse_document(html);
    let (Ok(matches), Ok(anchor)) = (Selector::parse(selector), Selector::parse("a[href]")) else {
        tracing::warn!("Invalid listing selector '{}'", selector);
        return Vec::new();
    };

    document
        .select(&matches)
        .filter_map(|element| {
            let link = if element.value().name() == "a" {
                element
            } else {
                element.select(&anchor).next()?
            };
            let url = canonical_item_url(link.value().attr("href")?, Some(base))?;
            let mut title = element_text(element);
            if title.is_empty() {
                title = url.clone();
            }
            Some(RawItem::new(title, url))
        })
        .collect()
}

fn element_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn leading_number(text: &str) -> Option<i64> {
    let digits: String = text.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// `.age[title]` holds an ISO timestamp, sometimes followed by a unix time
fn parse_age_title(title: &str) -> Option<String> {
    let stamp = title.split_whitespace().next()?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(stamp) {
        return Some(parsed.with_timezone(&Utc).to_rfc3339());
    }
    NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).to_rfc3339())
}
