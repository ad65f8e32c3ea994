use crate::error::{IoContext, Result};
use crate::types::{Post, SiteConfig};
use crate::xml::escape;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::Path;

pub const RSS_FILE: &str = "rss.xml";
pub const ATOM_FILE: &str = "atom.xml";

const RFC1123_NUMERIC_ZONE: &str = "%a, %d %b %Y %H:%M:%S %z";

fn published(posts: &[Post]) -> impl Iterator<Item = &Post> {
    posts.iter().filter(|post| post.published)
}

fn rss_date(date: &DateTime<Utc>) -> String {
    date.format(RFC1123_NUMERIC_ZONE).to_string()
}

fn atom_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RSS 2.0 document for the published posts, in the order given.
pub fn render_rss(config: &SiteConfig, posts: &[Post]) -> String {
    let base_url = config.base_url.trim_end_matches('/');

    let mut channel_pub_date = None;
    let mut items = String::new();
    for post in published(posts) {
        let post_url = config.post_url(&post.slug);
        let pub_date = rss_date(&post.created_date);
        channel_pub_date.get_or_insert_with(|| pub_date.clone());

        items.push_str(&format!(
            r#"    <item>
      <title>{}</title>
      <link>{}</link>
      <description>{}</description>
      <pubDate>{}</pubDate>
      <guid>{}</guid>
    </item>
"#,
            escape(&post.title),
            escape(&post_url),
            escape(&post.content_snippet_html),
            pub_date,
            escape(&post_url),
        ));
    }

    let pub_date_line = channel_pub_date
        .map(|date| format!("    <pubDate>{date}</pubDate>\n"))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>{}</language>
{}{}  </channel>
</rss>
"#,
        escape(&config.title),
        escape(base_url),
        escape(&config.description),
        escape(&config.language),
        pub_date_line,
        items
    )
}

/// Atom document for the published posts. `now` stands in for the feed's
/// `updated` when nothing is published.
pub fn render_atom(config: &SiteConfig, posts: &[Post], now: DateTime<Utc>) -> String {
    let base_url = config.base_url.trim_end_matches('/');

    let mut feed_updated = None;
    let mut entries = String::new();
    for post in published(posts) {
        let post_url = config.post_url(&post.slug);
        let updated = atom_date(&post.updated_date);
        feed_updated.get_or_insert_with(|| updated.clone());

        entries.push_str(&format!(
            r#"  <entry>
    <title>{title}</title>
    <id>{url}</id>
    <link href="{url}" rel="alternate"/>
    <updated>{updated}</updated>
    <summary type="html">{summary}</summary>
    <content type="html">{content}</content>
  </entry>
"#,
            title = escape(&post.title),
            url = escape(&post_url),
            updated = updated,
            summary = escape(&post.content_snippet_html),
            content = escape(&post.content_html),
        ));
    }

    let updated = feed_updated.unwrap_or_else(|| atom_date(&now));
    let author_name = config.author.as_deref().unwrap_or(&config.title);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>{title}</title>
  <subtitle>{description}</subtitle>
  <id>{base_url}</id>
  <link href="{base_url}/" rel="alternate"/>
  <link href="{base_url}/{atom_file}" rel="self"/>
  <updated>{updated}</updated>
  <author>
    <name>{author}</name>
  </author>
{entries}</feed>
"#,
        title = escape(&config.title),
        description = escape(&config.description),
        base_url = escape(base_url),
        atom_file = ATOM_FILE,
        updated = updated,
        author = escape(author_name),
        entries = entries,
    )
}

pub fn generate_rss(config: &SiteConfig, posts: &[Post], output_dir: &Path) -> Result<()> {
    let path = output_dir.join(RSS_FILE);
    fs::write(&path, render_rss(config, posts)).io_context("writing RSS feed", &path)?;
    log::info!("Generated RSS feed: {}", path.display());
    Ok(())
}

pub fn generate_atom(
    config: &SiteConfig,
    posts: &[Post],
    output_dir: &Path,
    now: DateTime<Utc>,
) -> Result<()> {
    let path = output_dir.join(ATOM_FILE);
    fs::write(&path, render_atom(config, posts, now)).io_context("writing Atom feed", &path)?;
    log::info!("Generated Atom feed: {}", path.display());
    Ok(())
}
