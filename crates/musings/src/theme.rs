use crate::error::{IoContext, MusingsError, Result};
use crate::types::{Post, SiteConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

const DEFAULT_BASE_TEMPLATE: &str = include_str!("../themes/default/templates/base.html");
const DEFAULT_INDEX_TEMPLATE: &str = include_str!("../themes/default/templates/index.html");
const DEFAULT_POST_TEMPLATE: &str = include_str!("../themes/default/templates/post.html");
const DEFAULT_STYLESHEET: &str = include_str!("../themes/default/style.css");

pub const STYLESHEET_FILE: &str = "style.css";
pub const INDEX_FILE: &str = "index.html";
pub const LATEST_POSTS: usize = 4;

enum Stylesheet {
    Builtin(&'static str),
    File(PathBuf),
}

pub struct ThemeEngine {
    tera: Tera,
    stylesheet: Stylesheet,
}

impl ThemeEngine {
    /// `"default"` selects the built-in theme, anything else is a theme
    /// directory holding `templates/` and `style.css`.
    pub fn new(theme: &str) -> Result<Self> {
        let theme_path = Path::new(theme);

        if theme_path.is_dir() {
            Self::from_directory(theme_path)
        } else if theme == "default" {
            Self::builtin_default()
        } else {
            Err(MusingsError::ThemeNotFound {
                name: theme.to_string(),
            })
        }
    }

    pub fn builtin_default() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_template("base.html", DEFAULT_BASE_TEMPLATE)?;
        tera.add_raw_template("index.html", DEFAULT_INDEX_TEMPLATE)?;
        tera.add_raw_template("post.html", DEFAULT_POST_TEMPLATE)?;

        Ok(Self {
            tera,
            stylesheet: Stylesheet::Builtin(DEFAULT_STYLESHEET),
        })
    }

    fn from_directory(theme_dir: &Path) -> Result<Self> {
        let pattern = theme_dir.join("templates").join("**").join("*.html");
        let tera = Tera::new(&pattern.to_string_lossy())?;

        Ok(Self {
            tera,
            stylesheet: Stylesheet::File(theme_dir.join(STYLESHEET_FILE)),
        })
    }

    pub fn write_stylesheet(&self, output_dir: &Path) -> Result<()> {
        let dest = output_dir.join(STYLESHEET_FILE);
        match &self.stylesheet {
            Stylesheet::Builtin(css) => {
                fs::write(&dest, css).io_context("writing stylesheet", &dest)?;
            }
            Stylesheet::File(source) => {
                fs::copy(source, &dest).io_context("copying stylesheet", source)?;
            }
        }
        Ok(())
    }

    pub fn render_index(&self, config: &SiteConfig, posts: &[Post], output_dir: &Path) -> Result<()> {
        let mut context = Context::new();
        context.insert("site", config);
        context.insert("posts", posts);
        context.insert("latest_posts", &posts[..posts.len().min(LATEST_POSTS)]);

        let rendered = self.tera.render("index.html", &context)?;
        let output_path = output_dir.join(INDEX_FILE);
        fs::write(&output_path, rendered).io_context("writing index page", &output_path)?;

        Ok(())
    }

    pub fn render_post(&self, config: &SiteConfig, post: &Post, output_dir: &Path) -> Result<()> {
        let mut context = Context::new();
        context.insert("site", config);
        context.insert("post", post);

        let rendered = self.tera.render("post.html", &context)?;
        let output_path = output_dir.join(format!("{}.html", post.slug));
        fs::write(&output_path, rendered).io_context("writing post page", &output_path)?;

        Ok(())
    }
}
