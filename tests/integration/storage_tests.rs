//! Storage integration tests against an on-disk database

use news_harvester::config::load_config_with_hash;
use news_harvester::model::{EnrichedItem, RawItem};
use news_harvester::storage::{open_storage, ItemSink, SourceRegistry};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

fn item(url: &str, content: &str) -> EnrichedItem {
    EnrichedItem::new(RawItem::new("Story", url), content.to_string())
}

#[tokio::test]
async fn test_repeated_upsert_keeps_one_record_across_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("harvest.db");

    {
        let storage = open_storage(&db_path).expect("Failed to open storage");
        let batch = vec![item("https://example.com/a", "first"), item("https://example.com/b", "")];
        storage.upsert("Blog", &batch).await.unwrap();
        storage.upsert("Blog", &batch).await.unwrap();
    }

    // Reopen and upsert again with updated content
    let storage = open_storage(&db_path).expect("Failed to reopen storage");
    storage
        .upsert("Blog", &[item("https://example.com/a", "second")])
        .await
        .unwrap();

    assert_eq!(storage.count_items().unwrap(), 2);
    let record = storage
        .get_item("Blog", "https://example.com/a")
        .unwrap()
        .expect("item should exist");
    assert_eq!(record.content, "second");
}

#[tokio::test]
async fn test_config_sources_sync_into_registry() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("harvest.db");

    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    write!(
        file,
        r#"
[output]
database-path = "{}"

[[source]]
name = "Hacker News"
type = "api"
url = "https://hacker-news.firebaseio.com/v0/topstories.json"

[source.config]
item-url = "https://hacker-news.firebaseio.com/v0/item/{{id}}.json"
discussion-url = "https://news.ycombinator.com/item?id={{id}}"

[[source]]
name = "Hugging Face Blog"
type = "scrape"
url = "https://huggingface.co/blog"

[source.config]
strategy = "huggingface_blog"
"#,
        db_path.display()
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(file.path()).expect("config should load");
    assert_eq!(hash.len(), 64);

    let storage = open_storage(&db_path).unwrap();
    storage.sync_sources(&config.sources).unwrap();
    storage.sync_sources(&config.sources).unwrap();

    let registered = storage.list_sources().await.unwrap();
    assert_eq!(registered.len(), 2);
    for source in &config.sources {
        assert!(registered.contains(source), "missing {}", source.name);
    }
}
