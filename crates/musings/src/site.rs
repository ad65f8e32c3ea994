use crate::blog::Blog;
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::error::{IoContext, MusingsError, Result};
use crate::feeds::{generate_atom, generate_rss};
use crate::post::PostLoader;
use crate::theme::ThemeEngine;
use crate::types::SiteConfig;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const CONFIG_FILE: &str = "musings.toml";
pub const IMAGES_DIR: &str = "images";

/// Reads site settings. A missing file is not an error: every key has a default.
pub fn load_config(path: &Path) -> Result<SiteConfig> {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(SiteConfig::default());
    }

    let content = fs::read_to_string(path).io_context("reading config", path)?;
    let mut config: SiteConfig =
        toml::from_str(&content).map_err(|error| MusingsError::TomlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

    config.base_url = config.base_url.trim_end_matches('/').to_string();

    Ok(config)
}

pub struct SiteGenerator {
    posts_dir: PathBuf,
    output_dir: PathBuf,
    config: SiteConfig,
    theme: Option<ThemeEngine>,
    clock: Option<Box<dyn Clock>>,
}

impl SiteGenerator {
    pub fn new(posts_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            posts_dir: posts_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
            config: SiteConfig::default(),
            theme: None,
            clock: None,
        }
    }

    pub fn config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn theme(mut self, theme: ThemeEngine) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Builds the whole site. Stops at the first failing step; files written
    /// before the failure stay in place.
    pub fn generate(self) -> Result<Blog> {
        let SiteGenerator {
            posts_dir,
            output_dir,
            config,
            theme,
            clock,
        } = self;

        let now = match clock {
            Some(clock) => clock.now(),
            None => SystemClock.now(),
        };
        let theme = match theme {
            Some(theme) => theme,
            None => ThemeEngine::builtin_default()?,
        };

        fs::create_dir_all(&output_dir).io_context("creating output directory", &output_dir)?;

        // One instant for the whole run.
        let loader = PostLoader::with_clock(FixedClock(now));
        let mut blog = Blog::new(&posts_dir);
        blog.load_posts(&loader)?;

        theme.write_stylesheet(&output_dir)?;
        copy_images(&posts_dir, &output_dir)?;

        theme.render_index(&config, &blog.posts, &output_dir)?;
        for post in &blog.posts {
            theme.render_post(&config, post, &output_dir)?;
        }

        generate_rss(&config, &blog.posts, &output_dir)?;
        generate_atom(&config, &blog.posts, &output_dir, now)?;

        log::info!(
            "Generated {} posts into {}",
            blog.posts.len(),
            output_dir.display()
        );

        Ok(blog)
    }
}

/// Mirrors `<posts>/images` into `<output>/images`. No source directory, nothing to do.
pub fn copy_images(posts_dir: &Path, output_dir: &Path) -> Result<()> {
    let source = posts_dir.join(IMAGES_DIR);
    if !source.is_dir() {
        return Ok(());
    }

    let dest_root = output_dir.join(IMAGES_DIR);
    fs::create_dir_all(&dest_root).io_context("creating images directory", &dest_root)?;

    for entry in WalkDir::new(&source).min_depth(1) {
        let entry = entry.map_err(|error| MusingsError::WalkDir {
            path: source.clone(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(&source)
            .map_err(|_| MusingsError::WalkDir {
                path: path.to_path_buf(),
                message: "entry outside images directory".to_string(),
            })?;
        let dest = dest_root.join(relative);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).io_context("creating images directory", parent)?;
        }

        fs::copy(path, &dest).io_context("copying image", path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::{ATOM_FILE, RSS_FILE};
    use crate::theme::{INDEX_FILE, STYLESHEET_FILE};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn create_test_blog() -> TempDir {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(posts.join("images/diagrams")).unwrap();

        fs::write(
            posts.join("hello.md"),
            "---\nCreatedDate: 2024-01-02 15:04:05\nUpdatedDate: 2024-01-03 09:00:00\nTags: go, blogging\nPublished: true\n---\n# Hello World\nFirst post.",
        )
        .unwrap();
        fs::write(
            posts.join("draft.md"),
            "---\nCreatedDate: 2024-02-01 10:00:00\nUpdatedDate: 2024-02-01 10:00:00\nPublished: false\n---\n# Work In Progress\nNot ready.",
        )
        .unwrap();
        fs::write(posts.join("undated.md"), "# Fresh Thoughts\nNo dates yet.").unwrap();
        fs::write(posts.join("images/photo.png"), [1u8, 2, 3]).unwrap();
        fs::write(posts.join("images/diagrams/flow.svg"), "<svg/>").unwrap();

        dir
    }

    fn fixed_now() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 5, 5, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_generate_full_site() {
        let dir = create_test_blog();
        let output = dir.path().join("public");

        let blog = SiteGenerator::new(dir.path().join("posts"), &output)
            .base_url("https://blog.example.com/")
            .clock(fixed_now())
            .generate()
            .unwrap();

        assert_eq!(blog.posts.len(), 3);
        assert_eq!(blog.posts[0].slug, "fresh-thoughts");

        for file in [
            INDEX_FILE,
            STYLESHEET_FILE,
            RSS_FILE,
            ATOM_FILE,
            "hello-world.html",
            "work-in-progress.html",
            "fresh-thoughts.html",
            "images/photo.png",
            "images/diagrams/flow.svg",
        ] {
            assert!(output.join(file).is_file(), "missing {file}");
        }

        let rss = fs::read_to_string(output.join(RSS_FILE)).unwrap();
        assert_eq!(rss.matches("<item>").count(), 1);
        assert!(rss.contains("https://blog.example.com/hello-world.html"));
        assert!(!rss.contains("work-in-progress"));

        let atom = fs::read_to_string(output.join(ATOM_FILE)).unwrap();
        assert_eq!(atom.matches("<entry>").count(), 1);
        assert!(atom.contains("<updated>2024-01-03T09:00:00Z</updated>"));
    }

    #[test]
    fn test_generate_repairs_undated_post() {
        let dir = create_test_blog();
        let output = dir.path().join("public");

        SiteGenerator::new(dir.path().join("posts"), &output)
            .clock(fixed_now())
            .generate()
            .unwrap();

        let repaired = fs::read_to_string(dir.path().join("posts/undated.md")).unwrap();
        assert_eq!(
            repaired,
            "---\nCreatedDate: 2025-05-05 12:00:00\nUpdatedDate: 2025-05-05 12:00:00\n---\n# Fresh Thoughts\nNo dates yet.\n"
        );
    }

    #[test]
    fn test_generate_without_images() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(
            posts.join("only.md"),
            "---\nCreatedDate: 2024-01-01 00:00:00\nUpdatedDate: 2024-01-01 00:00:00\n---\n# Only\nText",
        )
        .unwrap();
        let output = dir.path().join("public");

        SiteGenerator::new(&posts, &output)
            .clock(fixed_now())
            .generate()
            .unwrap();

        assert!(output.join("only.html").is_file());
        assert!(!output.join(IMAGES_DIR).exists());
    }

    #[test]
    fn test_generate_fresh_blog() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("posts");
        let output = dir.path().join("public");

        let blog = SiteGenerator::new(&posts, &output)
            .clock(fixed_now())
            .generate()
            .unwrap();

        assert!(blog.posts.is_empty());
        assert!(posts.is_dir());
        let atom = fs::read_to_string(output.join(ATOM_FILE)).unwrap();
        assert!(atom.contains("<updated>2025-05-05T12:00:00Z</updated>"));
    }

    #[test]
    fn test_failure_keeps_earlier_output() {
        let dir = create_test_blog();
        let output = dir.path().join("public");
        fs::create_dir_all(output.join(RSS_FILE)).unwrap();

        let result = SiteGenerator::new(dir.path().join("posts"), &output)
            .clock(fixed_now())
            .generate();

        assert!(result.is_err());
        assert!(output.join(INDEX_FILE).is_file());
        assert!(output.join("hello-world.html").is_file());
        assert!(!output.join(ATOM_FILE).exists());
    }

    #[test]
    fn test_load_config_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, SiteConfig::default());
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "title = \"Musings\"\nbase_url = \"https://example.com/\"\nauthor = \"Sam\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.title, "Musings");
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.author.as_deref(), Some("Sam"));
        assert_eq!(config.language, "en-us");
    }

    #[test]
    fn test_load_config_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "title = ").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(MusingsError::TomlParse { .. })));
    }
}
