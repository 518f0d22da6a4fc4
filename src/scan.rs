//! The post scanner: walks the posts directory, parses each post's front
//! matter and builds the [`TagIndex`] of every tag in use.
//!
//! A post that can't be parsed is logged, recorded in
//! [`Collection::failures`], and skipped; it never stops the scan.

use crate::post::{self, Post};
use crate::tag::TagIndex;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Enumerates the posts under a directory.
pub struct Scanner<'a> {
    posts_directory: &'a Path,
}

impl<'a> Scanner<'a> {
    pub fn new(posts_directory: &'a Path) -> Scanner<'a> {
        Scanner { posts_directory }
    }

    /// Returns a lazy iterator over the posts, parsing each one as it's
    /// reached. Files are visited in file name order, so two calls over an
    /// unchanged directory yield the same sequence. Hidden files and
    /// directories are skipped, and symlinks are followed. If the posts
    /// directory doesn't exist the iterator is empty.
    pub fn posts(&self) -> impl Iterator<Item = post::Result<Post>> + 'a {
        let root = self.posts_directory;
        WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.path() == root || !is_hidden(entry))
            .filter_map(move |result| match result {
                Ok(entry) => {
                    if entry.file_type().is_file() && is_markdown(entry.path()) {
                        Some(Post::from_file(entry.path()))
                    } else {
                        None
                    }
                }
                // The root not existing just means there are no posts yet.
                Err(err) if err.depth() == 0 && is_not_found(&err) => None,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_owned)
                        .unwrap_or_else(|| root.to_owned());
                    Some(Err(post::Error::Io {
                        path,
                        err: err.into(),
                    }))
                }
            })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

/// Everything the scanner learned from one pass over the posts.
#[derive(Debug, Default)]
pub struct Collection {
    /// The distinct tags, with the posts that carry them.
    pub tags: TagIndex,

    /// Posts that were skipped because they couldn't be read or parsed.
    pub failures: Vec<post::Error>,

    /// The number of posts parsed successfully.
    pub posts: usize,
}

/// Scans `posts_directory` and collects the distinct, normalized tags of
/// every post. A missing directory yields an empty collection; a path that
/// exists but isn't a directory is an error.
pub fn collect_tags(posts_directory: &Path) -> Result<Collection> {
    match std::fs::metadata(posts_directory) {
        Ok(meta) if !meta.is_dir() => {
            return Err(Error::NotADirectory(posts_directory.to_owned()));
        }
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!(
                "posts directory `{}` not found; no tags",
                posts_directory.display()
            );
            return Ok(Collection::default());
        }
        Err(err) => {
            return Err(Error::Io {
                path: posts_directory.to_owned(),
                err,
            })
        }
    }

    let mut collection = Collection::default();
    for result in Scanner::new(posts_directory).posts() {
        let post = match result {
            Ok(post) => post,
            Err(err) => {
                log::warn!("skipping post: {}", err);
                collection.failures.push(err);
                continue;
            }
        };
        collection.posts += 1;
        for raw in &post.tags {
            if collection.tags.insert(raw, &post.path).is_none() {
                log::warn!(
                    "ignoring tag {:?} in `{}`: no letters or digits",
                    raw,
                    post.path.display()
                );
            }
        }
    }
    log::debug!(
        "scanned {} posts ({} skipped), found {} tags",
        collection.posts,
        collection.failures.len(),
        collection.tags.len()
    );
    Ok(collection)
}

/// The result of a fallible scan.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that prevents scanning altogether.
#[derive(Debug)]
pub enum Error {
    /// Returned when the posts path exists but isn't a directory.
    NotADirectory(PathBuf),

    /// Returned when the posts directory can't be inspected.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotADirectory(path) => {
                write!(f, "posts path `{}` is not a directory", path.display())
            }
            Error::Io { path, err } => {
                write!(f, "reading posts directory `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotADirectory(_) => None,
            Error::Io { err, .. } => Some(err),
        }
    }
}
