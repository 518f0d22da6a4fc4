//! Defines the [`Config`] type, which tells the scanner where to find posts
//! and the synchronizer where (and how) to write tag pages.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The name of the optional project file.
pub const PROJECT_FILE: &str = "tagpages.yaml";

/// The shape of [`PROJECT_FILE`]. Every field is optional.
#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct Project {
    posts_directory: Option<PathBuf>,
    tags_directory: Option<PathBuf>,
    layout: Option<String>,
    permalink_prefix: Option<String>,
    reserved_pages: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The directory containing post source files (Jekyll's `_posts`).
    pub posts_directory: PathBuf,

    /// The directory owned by the generator, holding one page per tag.
    pub tags_directory: PathBuf,

    /// The `layout` written into each tag page.
    pub layout: String,

    /// Prefix for each tag page's `permalink`; the page for `python` gets
    /// `{permalink_prefix}python/`.
    pub permalink_prefix: String,

    /// File stems in `tags_directory` that aren't generated and must never
    /// be deleted (e.g. the hand-written `index.md` listing all tags).
    pub reserved_pages: Vec<String>,
}

impl Config {
    /// Builds the default configuration for a site rooted at `root`.
    pub fn with_root(root: &Path) -> Config {
        Config {
            posts_directory: root.join("_posts"),
            tags_directory: root.join("tags"),
            layout: String::from("tag"),
            permalink_prefix: String::from("/tags/"),
            reserved_pages: vec![String::from("index")],
        }
    }

    /// Looks for [`PROJECT_FILE`] in `dir` and each of its ancestors. If none
    /// is found, falls back to [`Config::with_root`] for `dir`.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
        }
        log::debug!(
            "no `{}` found above `{}`; using defaults",
            PROJECT_FILE,
            dir.display()
        );
        Ok(Config::with_root(dir))
    }

    /// Loads a project file. Relative directories are resolved against the
    /// directory containing the project file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = if contents.trim().is_empty() {
            Project::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|err| Error::DeserializeYaml {
                path: path.to_owned(),
                err,
            })?
        };
        let root = path.parent().unwrap_or_else(|| Path::new("."));
        let defaults = Config::with_root(root);
        Ok(Config {
            posts_directory: project
                .posts_directory
                .map(|p| root.join(p))
                .unwrap_or(defaults.posts_directory),
            tags_directory: project
                .tags_directory
                .map(|p| root.join(p))
                .unwrap_or(defaults.tags_directory),
            layout: project.layout.unwrap_or(defaults.layout),
            permalink_prefix: project
                .permalink_prefix
                .unwrap_or(defaults.permalink_prefix),
            reserved_pages: project.reserved_pages.unwrap_or(defaults.reserved_pages),
        })
    }

    /// Returns true if `stem` names a page the generator doesn't own.
    pub fn is_reserved(&self, stem: &str) -> bool {
        self.reserved_pages.iter().any(|r| r == stem)
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the project file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid.
    DeserializeYaml {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "opening project file `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "loading project file `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { err, .. } => Some(err),
            Error::DeserializeYaml { err, .. } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults_when_no_project_file() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_directory(dir.path())?;
        assert_eq!(config, Config::with_root(dir.path()));
        assert_eq!(config.posts_directory, dir.path().join("_posts"));
        assert_eq!(config.tags_directory, dir.path().join("tags"));
        assert!(config.is_reserved("index"));
        Ok(())
    }

    #[test]
    fn test_project_file_found_in_ancestor() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PROJECT_FILE),
            "posts_directory: content/posts\ntags_directory: topics\nlayout: topic\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested)?;
        assert_eq!(config.posts_directory, dir.path().join("content/posts"));
        assert_eq!(config.tags_directory, dir.path().join("topics"));
        assert_eq!(config.layout, "topic");
        assert_eq!(config.permalink_prefix, "/tags/");
        assert_eq!(config.reserved_pages, vec!["index"]);
        Ok(())
    }

    #[test]
    fn test_empty_project_file_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "").unwrap();
        assert_eq!(Config::from_project_file(&path)?, Config::with_root(dir.path()));
        Ok(())
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "post_dir: oops\n").unwrap();
        assert!(matches!(
            Config::from_project_file(&path),
            Err(Error::DeserializeYaml { .. })
        ));
    }
}
