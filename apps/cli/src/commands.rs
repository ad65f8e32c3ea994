use musings::{Blog, CONFIG_FILE, Post, PostLoader, SiteGenerator, ThemeEngine, load_config};
use std::fs;
use std::path::Path;
use std::time::Instant;

const SAMPLE_POST: &str = r#"---
Tags: welcome, first-post
Published: false
---
# Hello World

This is your first post. Start writing!

You can use **markdown** formatting, including:

- Lists
- Tables and footnotes[^1]
- Code blocks

```rust
fn main() {
    println!("Hello, world!");
}
```

[^1]: Set `Published: true` to include a post in the feeds.
"#;

fn escape_toml_string(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for character in input.chars() {
        match character {
            '\\' => output.push_str("\\\\"),
            '"' => output.push_str("\\\""),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            control if control < '\u{0020}' => {
                output.push_str(&format!("\\u{:04X}", control as u32));
            }
            other => output.push(other),
        }
    }
    output
}

pub fn publish(
    posts: &Path,
    output: &Path,
    theme: &str,
    config_path: &Path,
    base_url: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Publishing blog posts...");
    let start = Instant::now();

    let config = load_config(config_path)?;
    let theme_engine = ThemeEngine::new(theme)?;

    let mut generator = SiteGenerator::new(posts, output)
        .config(config)
        .theme(theme_engine);

    if let Some(url) = base_url {
        generator = generator.base_url(url);
    }

    let blog = generator.generate()?;

    log::info!(
        "Published {} posts ({} in feeds) to {} in {:.2?}",
        blog.posts.len(),
        blog.published().count(),
        output.display(),
        start.elapsed()
    );

    Ok(())
}

pub fn sync(posts: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Syncing blog posts to external platforms...");

    let mut blog = Blog::new(posts);
    blog.load_posts(&PostLoader::new())?;

    for post in blog.published() {
        log::debug!("Ready to sync: {} ({})", post.title, post.slug);
    }

    if json {
        let published: Vec<&Post> = blog.published().collect();
        println!("{}", serde_json::to_string_pretty(&published)?);
    }

    log::info!(
        "Loaded {} posts, {} published; no external platform is configured",
        blog.posts.len(),
        blog.published().count()
    );

    Ok(())
}

pub fn init(posts: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let current_dir = std::env::current_dir()?;
    let config_path = current_dir.join(CONFIG_FILE);

    if config_path.exists() {
        return Err(format!("{CONFIG_FILE} already exists in this directory").into());
    }

    let name = current_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "My Blog".to_string());

    let escaped_name = escape_toml_string(&name);
    let config = format!(
        r#"title = "{escaped_name}"
base_url = "http://localhost:8080"
description = "A blog about technology and programming"
language = "en-us"
"#
    );
    fs::write(&config_path, config)?;

    fs::create_dir_all(posts.join("images"))?;
    let sample = posts.join("hello-world.md");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_POST)?;
    }

    println!("Initialized blog in {}", current_dir.display());
    println!("  write posts in {}", posts.display());
    println!("  musings publish");

    Ok(())
}
