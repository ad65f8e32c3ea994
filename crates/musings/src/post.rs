use crate::clock::{Clock, SystemClock};
use crate::error::{MusingsError, Result};
use crate::parsing::{
    FRONTMATTER_SEPARATOR, MarkdownRenderer, SourceDocument, UNTITLED, content_snippet,
    extract_frontmatter, find_title, format_timestamp, parse_timestamp, post_content, slugify,
};
use crate::types::Post;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

pub const CREATED_DATE_KEY: &str = "CreatedDate";
pub const UPDATED_DATE_KEY: &str = "UpdatedDate";
pub const TAGS_KEY: &str = "Tags";
pub const PUBLISHED_KEY: &str = "Published";

/// A parsed post and, when its dates had to be filled in, the source text that
/// persists them.
#[derive(Debug, Clone)]
pub struct NormalizedPost {
    pub post: Post,
    pub repaired_source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateState {
    Valid,
    Missing,
    Malformed,
}

impl DateState {
    fn needs_repair(self) -> bool {
        self != DateState::Valid
    }
}

fn read_date(
    document: &SourceDocument,
    key: &str,
    path: &Path,
) -> (Option<DateTime<Utc>>, DateState) {
    match document.frontmatter.get(key) {
        None => (None, DateState::Missing),
        Some(value) => match parse_timestamp(value) {
            Some(date) => (Some(date), DateState::Valid),
            None => {
                log::warn!(
                    "Invalid {} in {}. Must be in format 'YYYY-MM-DD HH:MM:SS'",
                    key,
                    path.display()
                );
                (None, DateState::Malformed)
            }
        },
    }
}

/// Turns the raw text of a post into a [`Post`]. Missing or malformed dates
/// fall back to `now` (created) and the created date (updated).
pub fn normalize(
    source: &str,
    path: &Path,
    now: DateTime<Utc>,
    renderer: &MarkdownRenderer,
) -> NormalizedPost {
    let document = extract_frontmatter(source);

    let (created, created_state) = read_date(&document, CREATED_DATE_KEY, path);
    let created_date = created.unwrap_or_else(|| {
        log::info!("No valid CreatedDate in {}, setting to current time", path.display());
        now
    });

    let (updated, updated_state) = read_date(&document, UPDATED_DATE_KEY, path);
    let updated_date = updated.unwrap_or_else(|| {
        log::info!(
            "No valid UpdatedDate in {}, setting same as CreatedDate",
            path.display()
        );
        created_date
    });

    let repaired_source = (created_state.needs_repair() || updated_state.needs_repair()).then(|| {
        repair_source(
            &document,
            (created_state, created_date),
            (updated_state, updated_date),
        )
    });

    let (title_line, title) = match find_title(&document.body_lines) {
        Some((index, title)) => (Some(index), title),
        None => (None, UNTITLED.to_string()),
    };

    let content = post_content(&document.body_lines, title_line);
    let content_html = renderer.render(&content);
    let snippet = content_snippet(&content);
    let snippet_html = renderer.render(&snippet);

    let tags = document.frontmatter.get_list(TAGS_KEY).unwrap_or_default();
    let published = document.frontmatter.get_bool(PUBLISHED_KEY).unwrap_or(false);

    NormalizedPost {
        post: Post {
            slug: slugify(&title),
            title,
            content,
            content_html,
            content_snippet: snippet,
            content_snippet_html: snippet_html,
            created_date,
            updated_date,
            tags,
            published,
            path: path.to_path_buf(),
        },
        repaired_source,
    }
}

fn date_line(key: &str, date: &DateTime<Utc>) -> String {
    format!("{}: {}", key, format_timestamp(date))
}

fn metadata_key(line: &str) -> Option<&str> {
    line.split_once(':').map(|(key, _)| key.trim())
}

/// Rebuilds the source so both dates are present and valid. Every other
/// metadata line and the whole body are kept as they were.
fn repair_source(
    document: &SourceDocument,
    created: (DateState, DateTime<Utc>),
    updated: (DateState, DateTime<Utc>),
) -> String {
    let mut output = String::new();
    output.push_str(FRONTMATTER_SEPARATOR);
    output.push('\n');

    if document.has_metadata {
        for line in &document.metadata_lines {
            if line == FRONTMATTER_SEPARATOR {
                continue;
            }
            let rewritten = match metadata_key(line) {
                Some(CREATED_DATE_KEY) if created.0 == DateState::Malformed => {
                    date_line(CREATED_DATE_KEY, &created.1)
                }
                Some(UPDATED_DATE_KEY) if updated.0 == DateState::Malformed => {
                    date_line(UPDATED_DATE_KEY, &updated.1)
                }
                _ => line.clone(),
            };
            output.push_str(&rewritten);
            output.push('\n');
        }
    }

    if created.0 == DateState::Missing {
        output.push_str(&date_line(CREATED_DATE_KEY, &created.1));
        output.push('\n');
    }
    if updated.0 == DateState::Missing {
        output.push_str(&date_line(UPDATED_DATE_KEY, &updated.1));
        output.push('\n');
    }

    output.push_str(FRONTMATTER_SEPARATOR);
    output.push('\n');

    for line in &document.body_lines {
        output.push_str(line);
        output.push('\n');
    }

    output
}

/// Reads posts from disk. Reading may write: a post whose dates were filled in
/// is rewritten so the next load sees them.
pub struct PostLoader {
    renderer: MarkdownRenderer,
    clock: Box<dyn Clock>,
}

impl Default for PostLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PostLoader {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            renderer: MarkdownRenderer::new(),
            clock: Box::new(clock),
        }
    }

    /// Fails only when the file cannot be read as UTF-8 text. A failed
    /// rewrite is logged and the parsed post is still returned.
    pub fn load_and_maybe_repair(&self, path: &Path) -> Result<Post> {
        let source = fs::read_to_string(path).map_err(|source| MusingsError::Post {
            path: path.to_path_buf(),
            source,
        })?;
        let normalized = normalize(&source, path, self.clock.now(), &self.renderer);

        if let Some(repaired) = normalized.repaired_source {
            write_repaired(path, &repaired);
        }

        Ok(normalized.post)
    }
}

/// Persists a repaired source. Returns whether the file was updated.
fn write_repaired(path: &Path, repaired: &str) -> bool {
    match fs::write(path, repaired) {
        Ok(()) => {
            log::info!("Added missing date fields to {}", path.display());
            true
        }
        Err(error) => {
            log::warn!(
                "Could not update {} with missing date fields: {}",
                path.display(),
                error
            );
            false
        }
    }
}
