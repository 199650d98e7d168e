//! Thin Confluence REST client: paginated space fetch, single pages,
//! attachments, comments. Responses are navigated as JSON values and
//! projected into raw records; missing fields become typed defaults.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::info;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::models::{RawAttachment, RawComment, RawPage};
use crate::rate_limit::RateLimiter;

const PAGE_LIMIT: usize = 100;
const EXPAND: &str = "body.storage,version";
const SPACE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const PAGE_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

pub struct ConfluenceClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
    cache: Option<TtlCache>,
    limiter: RateLimiter,
    metrics: Option<Arc<Metrics>>,
}

impl ConfluenceClient {
    pub fn new(config: &Config) -> Self {
        ConfluenceClient {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            cache: config.cache_enabled.then(TtlCache::new),
            limiter: RateLimiter::new(config.rate_limit, config.rate_window),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// All pages of a space, paginated until the API returns an empty batch.
    pub async fn space_pages(&self, space_key: &str) -> Result<Vec<RawPage>> {
        let cache_key = TtlCache::key("space_content", &[space_key]);
        if let Some(pages) = self.cached::<Vec<RawPage>>(&cache_key) {
            info!("Space {} served from cache ({} pages)", space_key, pages.len());
            return Ok(pages);
        }

        let mut pages = Vec::new();
        let mut start = 0usize;
        loop {
            let batch = self
                .get_json(
                    "space_content",
                    "/rest/api/content",
                    &[
                        ("spaceKey", space_key.to_string()),
                        ("type", "page".to_string()),
                        ("start", start.to_string()),
                        ("limit", PAGE_LIMIT.to_string()),
                        ("expand", EXPAND.to_string()),
                    ],
                )
                .await?;

            let results = batch
                .get("results")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if results.is_empty() {
                break;
            }
            for value in &results {
                let id = json_id(value);
                let url = format!(
                    "{}/wiki/spaces/{}/pages/{}",
                    self.base_url, space_key, id
                );
                pages.push(page_from_value(value, url));
            }
            start += PAGE_LIMIT;
        }

        info!("Fetched {} pages from space {}", pages.len(), space_key);
        self.store(&cache_key, &pages, SPACE_CACHE_TTL);
        Ok(pages)
    }

    /// One page by id.
    pub async fn page(&self, page_id: &str) -> Result<RawPage> {
        let cache_key = TtlCache::key("single_page", &[page_id]);
        if let Some(page) = self.cached::<RawPage>(&cache_key) {
            return Ok(page);
        }

        let value = self
            .get_json(
                "single_page",
                &format!("/rest/api/content/{}", page_id),
                &[("expand", EXPAND.to_string())],
            )
            .await?;
        let url = format!("{}/wiki/pages/{}", self.base_url, json_id(&value));
        let page = page_from_value(&value, url);
        self.store(&cache_key, &page, PAGE_CACHE_TTL);
        Ok(page)
    }

    /// Attachment records for a page.
    pub async fn attachments(&self, page_id: &str) -> Result<Vec<RawAttachment>> {
        let value = self
            .get_json(
                "attachments",
                &format!("/rest/api/content/{}/child/attachment", page_id),
                &[("expand", "metadata".to_string())],
            )
            .await?;
        Ok(results(&value)
            .iter()
            .map(|v| attachment_from_value(v, &self.base_url, page_id))
            .collect())
    }

    /// Comment records for a page, bodies still in storage markup.
    pub async fn comments(&self, page_id: &str) -> Result<Vec<RawComment>> {
        let value = self
            .get_json(
                "comments",
                &format!("/rest/api/content/{}/child/comment", page_id),
                &[("expand", EXPAND.to_string())],
            )
            .await?;
        Ok(results(&value).iter().map(comment_from_value).collect())
    }

    async fn get_json(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        if self.limiter.is_limited(operation) {
            if let Some(metrics) = &self.metrics {
                metrics.record_error("rate_limited");
            }
            return Err(Error::RateLimited {
                operation: operation.to_string(),
            });
        }

        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .query(query)
            .send()
            .await;

        if let Some(metrics) = &self.metrics {
            let ok = matches!(&response, Ok(r) if r.status().is_success());
            metrics.record_request("GET", ok);
            metrics.record_duration(operation, started.elapsed().as_secs_f64());
        }

        let response = response?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api(format!("GET {} returned {}", path, status)));
        }
        Ok(response.json::<Value>().await?)
    }

    fn cached<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.as_ref()?.get(key)?;
        serde_json::from_value(value).ok()
    }

    fn store<T: serde::Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if let Some(cache) = &self.cache {
            if let Ok(json) = serde_json::to_value(value) {
                cache.set(key, json, ttl);
            }
        }
    }
}

fn results(value: &Value) -> Vec<Value> {
    value
        .get("results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn json_str(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// Content ids come back as strings on cloud and numbers on some servers.
fn json_id(value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn page_from_value(value: &Value, url: String) -> RawPage {
    RawPage {
        id: json_id(value),
        title: json_str(value, "/title"),
        content: json_str(value, "/body/storage/value"),
        url,
        version: value
            .pointer("/version/number")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        last_modified: json_str(value, "/version/when"),
        attachments: Vec::new(),
        comments: Vec::new(),
    }
}

fn attachment_from_value(value: &Value, base_url: &str, page_id: &str) -> RawAttachment {
    let title = json_str(value, "/title");
    RawAttachment {
        id: json_id(value),
        filename: title.clone(),
        media_type: json_str(value, "/metadata/mediaType"),
        size: value
            .pointer("/extensions/fileSize")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        url: format!(
            "{}/wiki/download/attachments/{}/{}",
            base_url, page_id, title
        ),
        title,
    }
}

fn comment_from_value(value: &Value) -> RawComment {
    RawComment {
        id: json_id(value),
        author: json_str(value, "/author/displayName"),
        created: json_str(value, "/created"),
        content: json_str(value, "/body/storage/value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_projection_from_api_shape() {
        let value = json!({
            "id": "123",
            "title": "Runbook",
            "body": {"storage": {"value": "<p>Hello</p>"}},
            "version": {"number": 4, "when": "2024-01-01T00:00:00.000Z"}
        });
        let page = page_from_value(&value, "https://wiki/x/123".to_string());
        assert_eq!(page.id, "123");
        assert_eq!(page.title, "Runbook");
        assert_eq!(page.content, "<p>Hello</p>");
        assert_eq!(page.version, 4);
        assert_eq!(page.last_modified, "2024-01-01T00:00:00.000Z");
        assert_eq!(page.url, "https://wiki/x/123");
    }

    #[test]
    fn sparse_page_defaults_instead_of_failing() {
        let page = page_from_value(&json!({}), String::new());
        assert_eq!(page.id, "");
        assert_eq!(page.content, "");
        assert_eq!(page.version, 0);
    }

    #[test]
    fn numeric_ids_are_stringified() {
        assert_eq!(json_id(&json!({"id": 987})), "987");
        assert_eq!(json_id(&json!({"id": "987"})), "987");
        assert_eq!(json_id(&json!({})), "");
    }

    #[test]
    fn attachment_projection_builds_download_url() {
        let value = json!({
            "id": "att1",
            "title": "diagram.png",
            "metadata": {"mediaType": "image/png"},
            "extensions": {"fileSize": 2048}
        });
        let att = attachment_from_value(&value, "https://wiki", "123");
        assert_eq!(att.filename, "diagram.png");
        assert_eq!(att.media_type, "image/png");
        assert_eq!(att.size, 2048);
        assert_eq!(att.url, "https://wiki/wiki/download/attachments/123/diagram.png");
    }

    #[test]
    fn comment_projection_keeps_raw_markup() {
        let value = json!({
            "id": "c1",
            "author": {"displayName": "Ada"},
            "created": "2024-02-02T10:00:00.000Z",
            "body": {"storage": {"value": "<p>ship it</p>"}}
        });
        let comment = comment_from_value(&value);
        assert_eq!(comment.author, "Ada");
        assert_eq!(comment.content, "<p>ship it</p>");
    }
}
