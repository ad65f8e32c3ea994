use crate::types::Frontmatter;
use chrono::{DateTime, NaiveDateTime, Utc};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

pub const FRONTMATTER_SEPARATOR: &str = "---";
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const SNIPPET_LENGTH: usize = 150;
pub const UNTITLED: &str = "Untitled";

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

struct PendingHeading<'a> {
    start: Tag<'a>,
    text: String,
    events: Vec<Event<'a>>,
}

struct PendingCodeBlock {
    lang: Option<String>,
    content: String,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    pub fn render(&self, content: &str) -> String {
        let parsed: Vec<Event> = Parser::new_ext(content, markdown_options()).collect();

        let mut events: Vec<Event> = Vec::new();
        let mut heading: Option<PendingHeading> = None;
        let mut code_block: Option<PendingCodeBlock> = None;
        let mut heading_ids = HeadingIds::default();

        // Explicit ids are claimed before any id is generated.
        for event in &parsed {
            if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
                heading_ids.reserve(id);
            }
        }

        for event in parsed {
            if code_block.is_some() {
                match event {
                    Event::Text(text) => {
                        if let Some(block) = code_block.as_mut() {
                            block.content.push_str(&text);
                        }
                    }
                    Event::End(TagEnd::CodeBlock) => {
                        if let Some(block) = code_block.take() {
                            events.push(Event::Html(self.highlight(&block).into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                            lang.split_whitespace().next().map(String::from)
                        }
                        _ => None,
                    };
                    code_block = Some(PendingCodeBlock {
                        lang,
                        content: String::new(),
                    });
                }
                Event::Start(start @ Tag::Heading { .. }) => {
                    heading = Some(PendingHeading {
                        start,
                        text: String::new(),
                        events: Vec::new(),
                    });
                }
                Event::End(TagEnd::Heading(level)) => {
                    if let Some(pending) = heading.take() {
                        let start = match pending.start {
                            Tag::Heading {
                                id, classes, attrs, ..
                            } => {
                                let id = match id {
                                    Some(explicit) => explicit,
                                    None => CowStr::from(heading_ids.assign(&pending.text)),
                                };
                                Tag::Heading {
                                    level,
                                    id: Some(id),
                                    classes,
                                    attrs,
                                }
                            }
                            other => other,
                        };
                        events.push(Event::Start(start));
                        events.extend(pending.events);
                        events.push(Event::End(TagEnd::Heading(level)));
                    }
                }
                other => match heading.as_mut() {
                    Some(pending) => {
                        if let Event::Text(text) | Event::Code(text) = &other {
                            pending.text.push_str(text);
                        }
                        pending.events.push(other);
                    }
                    None => events.push(other),
                },
            }
        }

        let mut html_output = String::with_capacity(content.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html_output, finish_inline(events).into_iter());
        html_output
    }

    fn highlight(&self, block: &PendingCodeBlock) -> String {
        let Some(lang) = block.lang.as_deref() else {
            return format!("<pre><code>{}</code></pre>\n", escape_html(&block.content));
        };

        let syntax = self.syntax_set.find_syntax_by_token(lang);
        let theme = self.theme_set.themes.get(HIGHLIGHT_THEME);

        match (syntax, theme) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(&block.content, &self.syntax_set, syntax, theme)
                    .unwrap_or_else(|_| {
                        format!("<pre><code>{}</code></pre>\n", escape_html(&block.content))
                    })
            }
            _ => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(lang),
                escape_html(&block.content)
            ),
        }
    }
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options.insert(Options::ENABLE_DEFINITION_LIST);
    options.insert(Options::ENABLE_MATH);
    options.insert(Options::ENABLE_SUPERSCRIPT);
    options.insert(Options::ENABLE_SUBSCRIPT);
    options
}

/// Inline rules the parser leaves out: intraword `x^2^` / `H~2~O` spans and
/// `target="_blank"` on links that are not relative to the site.
fn finish_inline(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut output = Vec::with_capacity(events.len());
    let mut text = String::new();
    let mut image_depth = 0usize;
    let mut new_tab_links: Vec<bool> = Vec::new();

    for event in events {
        if let Event::Text(chunk) = &event {
            text.push_str(chunk);
            continue;
        }
        flush_text(&mut text, image_depth > 0, &mut output);

        match event {
            Event::Start(Tag::Image { .. }) => {
                image_depth += 1;
                output.push(event);
            }
            Event::End(TagEnd::Image) => {
                image_depth = image_depth.saturating_sub(1);
                output.push(event);
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) if link_type != LinkType::Email && !is_relative_link(&dest_url) => {
                let mut anchor = format!("<a href=\"{}\"", escape_html(&dest_url));
                if !title.is_empty() {
                    anchor.push_str(&format!(" title=\"{}\"", escape_html(&title)));
                }
                anchor.push_str(" target=\"_blank\">");
                new_tab_links.push(true);
                output.push(Event::InlineHtml(anchor.into()));
            }
            Event::Start(Tag::Link { .. }) => {
                new_tab_links.push(false);
                output.push(event);
            }
            Event::End(TagEnd::Link) => {
                if new_tab_links.pop() == Some(true) {
                    output.push(Event::InlineHtml("</a>".into()));
                } else {
                    output.push(event);
                }
            }
            other => output.push(other),
        }
    }
    flush_text(&mut text, image_depth > 0, &mut output);

    output
}

fn flush_text<'a>(text: &mut String, literal: bool, output: &mut Vec<Event<'a>>) {
    if text.is_empty() {
        return;
    }
    let text = std::mem::take(text);
    if literal {
        output.push(Event::Text(text.into()));
        return;
    }

    let mut rest = text.as_str();
    while let Some((before, tag, inner, after)) = next_script_span(rest) {
        if !before.is_empty() {
            output.push(Event::Text(before.to_string().into()));
        }
        output.push(Event::InlineHtml(format!("<{tag}>").into()));
        output.push(Event::Text(inner.to_string().into()));
        output.push(Event::InlineHtml(format!("</{tag}>").into()));
        rest = after;
    }
    if !rest.is_empty() {
        output.push(Event::Text(rest.to_string().into()));
    }
}

/// Finds the first `^body^` or `~body~` whose body is non-empty and has no
/// whitespace. Returns the text before it, the tag name, the body and the rest.
fn next_script_span(text: &str) -> Option<(&str, &'static str, &str, &str)> {
    let mut search_from = 0;

    while let Some(offset) = text[search_from..].find(['^', '~']) {
        let open = search_from + offset;
        let marker = char::from(text.as_bytes()[open]);
        let body_start = open + 1;
        let body_end = text[body_start..]
            .find(|c: char| c == marker || c.is_whitespace())
            .map(|len| body_start + len);

        match body_end {
            Some(close) if close > body_start && text[close..].starts_with(marker) => {
                let tag = if marker == '^' { "sup" } else { "sub" };
                return Some((
                    &text[..open],
                    tag,
                    &text[body_start..close],
                    &text[close + 1..],
                ));
            }
            _ => search_from = body_start,
        }
    }

    None
}

fn is_relative_link(link: &str) -> bool {
    link.is_empty()
        || link.starts_with('#')
        || (link.starts_with('/') && !link.starts_with("//"))
        || link.starts_with("./")
        || link.starts_with("../")
}

/// Hands out unique heading anchors within one document.
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }

    fn assign(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "heading".to_string();
        }

        let Some(&used) = self.seen.get(&base) else {
            self.seen.insert(base.clone(), 0);
            return base;
        };

        let mut count = used;
        loop {
            count += 1;
            let candidate = format!("{base}-{count}");
            if !self.seen.contains_key(&candidate) {
                self.seen.insert(base, count);
                self.seen.insert(candidate.clone(), 0);
                return candidate;
            }
        }
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A markdown source split into its metadata block and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub frontmatter: Frontmatter,
    /// Raw lines between the separators, separators excluded.
    pub metadata_lines: Vec<String>,
    /// The first line of the file was a separator.
    pub has_metadata: bool,
    /// A closing separator was found.
    pub metadata_closed: bool,
    pub body_lines: Vec<String>,
}

pub fn extract_frontmatter(content: &str) -> SourceDocument {
    let mut document = SourceDocument::default();
    let mut lines = content.lines();

    match lines.next() {
        Some(FRONTMATTER_SEPARATOR) => document.has_metadata = true,
        Some(first) => document.body_lines.push(first.to_string()),
        None => return document,
    }

    let mut in_metadata = document.has_metadata;
    for line in lines {
        if in_metadata {
            if line == FRONTMATTER_SEPARATOR {
                in_metadata = false;
                document.metadata_closed = true;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                document
                    .frontmatter
                    .entries
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
            document.metadata_lines.push(line.to_string());
        } else {
            document.body_lines.push(line.to_string());
        }
    }

    document
}

/// Finds the first `# ` heading, returning its line index and trimmed text.
pub fn find_title(lines: &[String]) -> Option<(usize, String)> {
    lines.iter().enumerate().find_map(|(index, line)| {
        line.strip_prefix("# ")
            .map(|title| (index, title.trim().to_string()))
    })
}

/// Body markdown without the title heading line and without leading blank lines.
pub fn post_content(lines: &[String], title_line: Option<usize>) -> String {
    let content = lines
        .iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != title_line)
        .map(|(_, line)| line.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    content.trim_start_matches('\n').to_string()
}

pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let hyphenated = lowered.split_whitespace().collect::<Vec<_>>().join("-");

    let kept: String = hyphenated
        .chars()
        .filter(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || *character == '-'
        })
        .collect();

    // Dropped characters can leave hyphen runs behind ("c++-&-go").
    kept.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn content_snippet(content: &str) -> String {
    match content.char_indices().nth(SNIPPET_LENGTH) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}
