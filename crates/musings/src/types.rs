use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            base_url: default_base_url(),
            description: default_description(),
            author: None,
            language: default_language(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL of a post page.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/{}.html", self.base_url.trim_end_matches('/'), slug)
    }
}

pub fn default_title() -> String {
    "My Blog".to_string()
}

pub fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

pub fn default_description() -> String {
    "A blog about technology and programming".to_string()
}

pub fn default_language() -> String {
    "en-us".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub title: String,
    pub content: String,
    pub content_html: String,
    pub content_snippet: String,
    pub content_snippet_html: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub slug: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub published: bool,
    pub path: PathBuf,
}

/// Key/value pairs from a post's metadata block, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    pub entries: Vec<(String, String)>,
}

impl Frontmatter {
    /// Looks up a key. A repeated key resolves to its last occurrence.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).map(|value| value.eq_ignore_ascii_case("true"))
    }

    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)
            .map(|value| value.split(',').map(|item| item.trim().to_string()).collect())
    }
}
