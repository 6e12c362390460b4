//! URL Module
//!
//! Watches channel traffic for HTTP links and announces what they point
//! to: media type, size and, for HTML pages, the document title.

use lazy_static::lazy_static;
use marvin_core::{async_trait, Client, Error, Hook, Message, Module, Result, Settings};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default pattern for spotting links in messages
pub const DEFAULT_PATTERN: &str = r"https?://[A-Za-z0-9.-]+\.[A-Za-z]{2,}(?::[0-9]+)?(?:/[^\s]*)?";

lazy_static! {
    static ref TITLE: Regex = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid");
}

/// Configuration for the URL module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Pattern used to find links
    pub regex: String,
    /// Hosts whose links are never fetched
    pub exclude: Vec<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Module announcing the content behind posted links
pub struct UrlModule {
    config: UrlConfig,
}

impl UrlModule {
    pub fn new() -> Self {
        Self {
            config: UrlConfig::default(),
        }
    }
}

impl Default for UrlModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for UrlModule {
    fn name(&self) -> &str {
        "url"
    }

    fn help(&self) -> &str {
        "Displays HTML titles for HTTP links."
    }

    fn defaults(&mut self) {
        self.config.regex = DEFAULT_PATTERN.to_string();
        self.config.timeout_seconds = 10;
    }

    fn settings(&mut self) -> &mut dyn Settings {
        &mut self.config
    }

    fn load(&mut self, client: &mut Client) -> Result<()> {
        let pattern = Regex::new(&self.config.regex)
            .map_err(|e| Error::Config(format!("Invalid url regex: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(concat!("marvin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Module(format!("Failed to create HTTP client: {}", e)))?;

        client.register_hook(
            "privmsg",
            LinkInfo {
                pattern,
                exclude: self.config.exclude.clone(),
                http,
            },
        );
        Ok(())
    }
}

/// Hook looking up the first link of every message
struct LinkInfo {
    pattern: Regex,
    exclude: Vec<String>,
    http: reqwest::Client,
}

impl LinkInfo {
    /// First link in `text` that is worth fetching
    fn find_link(&self, text: &str) -> Option<::url::Url> {
        let link = self.pattern.find(text)?;
        let url = ::url::Url::parse(link.as_str()).ok()?;
        let host = url.host_str()?;
        if self.exclude.iter().any(|h| h == host) {
            debug!("Ignoring link to excluded host {}", host);
            return None;
        }
        Some(url)
    }
}

#[async_trait]
impl Hook for LinkInfo {
    async fn call(&self, client: &Client, message: &Message) -> Result<()> {
        let Some(url) = self.find_link(message.text()) else {
            return Ok(());
        };
        let Some(receiver) = message.receiver.as_deref() else {
            return Ok(());
        };

        debug!("Fetching {}", url);
        let response = self
            .http
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Error::Module(format!("Failed to fetch {}: {}", url, e)))?;

        let (content_type, content_length) = {
            let headers = response.headers();
            (
                header_value(headers, reqwest::header::CONTENT_TYPE),
                header_value(headers, reqwest::header::CONTENT_LENGTH),
            )
        };

        let body = if media_type(content_type.as_deref()).as_deref() == Some("text/html") {
            response.text().await.ok()
        } else {
            None
        };

        let info = describe(content_type.as_deref(), content_length.as_deref(), body.as_deref())?;
        client.write(format!("NOTICE {} :{}", receiver, info)).await
    }
}

fn header_value(headers: &reqwest::header::HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Essence of a Content-Type header, lowercased and without parameters
fn media_type(content_type: Option<&str>) -> Option<String> {
    let essence = content_type?.split(';').next()?.trim();
    if essence.is_empty() || !essence.contains('/') {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}

/// Build the notice text for a fetched link
fn describe(content_type: Option<&str>, content_length: Option<&str>, body: Option<&str>) -> Result<String> {
    let content_type = content_type.ok_or_else(|| Error::Module("missing content-type header".to_string()))?;
    let mime = media_type(Some(content_type))
        .ok_or_else(|| Error::Module(format!("invalid content-type {:?}", content_type)))?;

    let mut info = format!("URL -- Type: {}", mime);
    if let Some(size) = content_length.filter(|s| !s.is_empty()) {
        info.push_str(&format!(". Size: {} bytes", size));
    }
    if mime == "text/html" {
        if let Some(title) = body.and_then(extract_title) {
            info.push_str(&format!(". Title: {}", title));
        }
    }
    Ok(info)
}

/// Decoded, single-line title of an HTML document
fn extract_title(html: &str) -> Option<String> {
    let raw = TITLE.captures(html)?.get(1)?.as_str();
    let title = sanitize(&decode_entities(raw));
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Fold line breaks and collapse runs of whitespace
fn sanitize(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start + 1..];
        match candidate.find(';').filter(|&end| end > 0 && end <= 10) {
            Some(end) => {
                out.push_str(&decode_entity(&candidate[..end]));
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('&');
                rest = candidate;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> String {
    match entity {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        "nbsp" => " ".to_string(),
        s if s.starts_with('#') => {
            let num = &s[1..];
            let codepoint = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            codepoint
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("&{};", entity))
        }
        _ => format!("&{};", entity),
    }
}
