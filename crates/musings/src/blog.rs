use crate::error::{IoContext, MusingsError, Result};
use crate::post::PostLoader;
use crate::types::Post;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// All posts found under one directory, newest first.
#[derive(Debug, Clone)]
pub struct Blog {
    pub path: PathBuf,
    pub posts: Vec<Post>,
}

impl Blog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            posts: Vec::new(),
        }
    }

    /// Replaces `posts` with a fresh load of the directory.
    pub fn load_posts(&mut self, loader: &PostLoader) -> Result<()> {
        self.posts = load_all(&self.path, loader)?;

        for post in &self.posts {
            log::info!("Loaded post: {}", post.title);
        }

        Ok(())
    }

    pub fn published(&self) -> impl Iterator<Item = &Post> {
        self.posts.iter().filter(|post| post.published)
    }

    /// The newest `count` posts.
    pub fn latest(&self, count: usize) -> &[Post] {
        &self.posts[..self.posts.len().min(count)]
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|extension| extension == "md")
        .unwrap_or(false)
}

/// Loads every `.md` file below `path`, creating the directory when it does
/// not exist yet. A post that cannot be read as UTF-8 text fails the whole
/// load and is left untouched.
pub fn load_all(path: &Path, loader: &PostLoader) -> Result<Vec<Post>> {
    fs::create_dir_all(path).io_context("creating posts directory", path)?;

    let mut posts = Vec::new();

    for entry in WalkDir::new(path).min_depth(1) {
        let entry = entry.map_err(|error| MusingsError::WalkDir {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

        let file_path = entry.path();

        if !entry.file_type().is_file() || !is_markdown(file_path) {
            continue;
        }

        log::debug!("Reading {}", file_path.display());

        posts.push(loader.load_and_maybe_repair(file_path)?);
    }

    posts.sort_by(|a, b| b.created_date.cmp(&a.created_date));

    warn_on_slug_collisions(&posts);

    Ok(posts)
}

/// Posts sharing a slug are written to the same page; the last one rendered wins.
pub fn slug_collisions(posts: &[Post]) -> Vec<(&Post, &Post)> {
    let mut seen: HashMap<&str, &Post> = HashMap::new();
    let mut collisions = Vec::new();

    for post in posts {
        match seen.get(post.slug.as_str()) {
            Some(existing) => collisions.push((*existing, post)),
            None => {
                seen.insert(post.slug.as_str(), post);
            }
        }
    }

    collisions
}

fn warn_on_slug_collisions(posts: &[Post]) {
    for (first, second) in slug_collisions(posts) {
        log::warn!(
            "Duplicate post slug '{}' in {} conflicts with {}",
            second.slug,
            second.path.display(),
            first.path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn loader() -> PostLoader {
        PostLoader::with_clock(FixedClock(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn write_post(dir: &Path, name: &str, title: &str, created: &str, published: bool) {
        fs::write(
            dir.join(name),
            format!(
                "---\nCreatedDate: {created}\nUpdatedDate: {created}\nPublished: {published}\n---\n# {title}\nBody of {title}."
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let posts_dir = dir.path().join("posts");

        let posts = load_all(&posts_dir, &loader()).unwrap();

        assert!(posts.is_empty());
        assert!(posts_dir.is_dir());
    }

    #[test]
    fn test_only_markdown_files_are_loaded() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();

        write_post(dir.path(), "one.md", "One", "2024-01-01 00:00:00", true);
        write_post(&dir.path().join("nested"), "two.md", "Two", "2024-01-02 00:00:00", true);
        write_post(
            &dir.path().join("nested/deeper"),
            "three.md",
            "Three",
            "2024-01-03 00:00:00",
            false,
        );
        fs::write(dir.path().join("notes.txt"), "# Not a post").unwrap();
        fs::write(dir.path().join("upper.MD"), "# Wrong case").unwrap();
        fs::write(dir.path().join("images/cat.png"), [0u8, 1, 2]).unwrap();

        let posts = load_all(dir.path(), &loader()).unwrap();
        assert_eq!(posts.len(), 3);
    }

    #[test]
    fn test_posts_sorted_newest_first() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "middle.md", "Middle", "2024-02-01 12:00:00", true);
        write_post(dir.path(), "oldest.md", "Oldest", "2023-12-31 23:59:59", true);
        write_post(dir.path(), "newest.md", "Newest", "2024-03-01 08:30:00", false);

        let mut blog = Blog::new(dir.path());
        blog.load_posts(&loader()).unwrap();

        let titles: Vec<&str> = blog.posts.iter().map(|post| post.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);

        for pair in blog.posts.windows(2) {
            assert!(pair[0].created_date >= pair[1].created_date);
        }
    }

    #[test]
    fn test_published_filter_and_latest() {
        let dir = TempDir::new().unwrap();
        for day in 1..=6 {
            write_post(
                dir.path(),
                &format!("post-{day}.md"),
                &format!("Post {day}"),
                &format!("2024-01-0{day} 00:00:00"),
                day % 2 == 0,
            );
        }

        let mut blog = Blog::new(dir.path());
        blog.load_posts(&loader()).unwrap();

        let published: Vec<&str> = blog.published().map(|post| post.slug.as_str()).collect();
        assert_eq!(published, vec!["post-6", "post-4", "post-2"]);

        let latest: Vec<&str> = blog.latest(4).iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(latest, vec!["post-6", "post-5", "post-4", "post-3"]);
        assert_eq!(Blog::new(dir.path()).latest(4).len(), 0);
    }

    #[test]
    fn test_missing_dates_are_repaired_on_load() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("undated.md"), "# Undated\nText").unwrap();

        let first = load_all(dir.path(), &loader()).unwrap();
        let rewritten = fs::read_to_string(dir.path().join("undated.md")).unwrap();
        assert!(rewritten.contains("CreatedDate: 2025-01-01 00:00:00"));
        assert!(rewritten.contains("UpdatedDate: 2025-01-01 00:00:00"));

        let other_clock = PostLoader::with_clock(FixedClock(
            Utc.with_ymd_and_hms(2031, 6, 6, 6, 6, 6).unwrap(),
        ));
        let second = load_all(dir.path(), &other_clock).unwrap();
        assert_eq!(first[0].created_date, second[0].created_date);
        assert_eq!(
            rewritten,
            fs::read_to_string(dir.path().join("undated.md")).unwrap()
        );
    }

    #[test]
    fn test_non_utf8_post_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "good.md", "Good", "2024-01-01 00:00:00", true);
        fs::write(dir.path().join("latin1.md"), b"# Caf\xe9\nbody").unwrap();

        let error = load_all(dir.path(), &loader()).unwrap_err();
        assert!(matches!(error, MusingsError::Post { .. }));
        assert_eq!(error.to_string().matches("latin1.md").count(), 1);
        assert_eq!(
            fs::read(dir.path().join("latin1.md")).unwrap(),
            b"# Caf\xe9\nbody"
        );
    }

    #[test]
    fn test_slug_collisions_detected() {
        let dir = TempDir::new().unwrap();
        write_post(dir.path(), "a.md", "Same Title", "2024-01-01 00:00:00", true);
        write_post(dir.path(), "b.md", "Same Title", "2024-01-02 00:00:00", true);
        write_post(dir.path(), "c.md", "Other", "2024-01-03 00:00:00", true);

        let posts = load_all(dir.path(), &loader()).unwrap();
        let collisions = slug_collisions(&posts);

        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions[0].0.slug, "same-title");
        assert_ne!(collisions[0].0.path, collisions[0].1.path);
    }
}
