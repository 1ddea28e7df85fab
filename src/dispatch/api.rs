use super::{get_json, DispatchSettings};
use crate::model::{ApiConfig, RawItem};
use crate::url::canonical_item_url;
use crate::{HarvestError, Result};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;

/// Resolves an `api` source
///
/// With an `item-url` template the source URL is a story index: the top
/// identifiers are read from it and each detail is fetched sequentially,
/// pausing `item_delay` between requests. Otherwise the endpoint is
/// expected to return the items themselves.
pub(super) async fn resolve_api(
    client: &Client,
    url: &str,
    config: &ApiConfig,
    settings: &DispatchSettings,
) -> Result<Vec<RawItem>> {
    let payload = get_json(client, url).await?;

    let Some(item_template) = config.item_url.as_deref() else {
        let items = items_from_payload(&payload, config.discussion_url.as_deref());
        tracing::info!("Fetched {} items from {}", items.len(), url);
        return Ok(items);
    };

    let top_n = config.top_n.unwrap_or(settings.api_top_n);
    let ids = story_ids(&payload, top_n).ok_or_else(|| HarvestError::Api {
        url: url.to_string(),
        message: "story index is not an array of identifiers".to_string(),
    })?;
    tracing::info!("Fetching {} stories from {}", ids.len(), url);

    let mut items = Vec::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if i > 0 && !settings.item_delay.is_zero() {
            tokio::time::sleep(settings.item_delay).await;
        }

        let detail_url = item_template.replace("{id}", id);
        match get_json(client, &detail_url).await {
            Ok(detail) => match item_from_value(&detail, config.discussion_url.as_deref()) {
                Some(item) => items.push(item),
                None => tracing::debug!("Story {} has no external URL, skipping", id),
            },
            Err(e) => tracing::warn!("Failed to fetch story {}: {}", id, e),
        }
    }

    tracing::info!("Resolved {} of {} stories", items.len(), ids.len());
    Ok(items)
}

/// First `top_n` identifiers of a story index
fn story_ids(payload: &Value, top_n: usize) -> Option<Vec<String>> {
    let ids = payload.as_array()?;
    Some(
        ids.iter()
            .filter_map(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .take(top_n)
            .collect(),
    )
}

/// Items from a plain API payload: an array, or an object wrapping one
fn items_from_payload(payload: &Value, discussion_template: Option<&str>) -> Vec<RawItem> {
    let list = match payload {
        Value::Array(list) => Some(list),
        Value::Object(map) => ["items", "data", "results", "articles"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    };

    list.map(|list| {
        list.iter()
            .filter_map(|value| item_from_value(value, discussion_template))
            .collect()
    })
    .unwrap_or_default()
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn first_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_i64))
}

/// Maps one JSON object to a raw item; `None` without an external URL
fn item_from_value(value: &Value, discussion_template: Option<&str>) -> Option<RawItem> {
    let url = canonical_item_url(first_str(value, &["url", "link"])?, None)?;
    let title = first_str(value, &["title", "name"])
        .map(str::to_string)
        .unwrap_or_else(|| url.clone());

    let date = first_str(value, &["date", "published_at", "publishedAt"])
        .map(str::to_string)
        .or_else(|| {
            value
                .get("time")
                .and_then(Value::as_i64)
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .map(|t: DateTime<Utc>| t.to_rfc3339())
        });

    let id = value.get("id").and_then(|id| match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    });
    let discussion_url = first_str(value, &["discussion_url"])
        .map(str::to_string)
        .or_else(|| Some(discussion_template?.replace("{id}", &id?)));

    Some(RawItem {
        title,
        url,
        date,
        upvotes: first_i64(value, &["score", "upvotes", "points"]),
        discussion_url,
    })
}
