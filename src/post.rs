//! Defines the [`Post`] type and the logic for reading a post source file
//! into memory.

use crate::frontmatter;
use std::fmt;
use std::path::{Path, PathBuf};

/// A post source file, reduced to what tag generation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    /// The location of the source file.
    pub path: PathBuf,

    /// The raw tags from the post's front matter, in the order they appear.
    pub tags: Vec<String>,
}

impl Post {
    /// Reads and parses the post at `path`. The file must begin with a YAML
    /// front matter block, e.g.:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// tags: [greet]
    /// ---
    /// # Hello
    /// ```
    pub fn from_file(path: &Path) -> Result<Post> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        Post::from_str(path, &contents)
    }

    /// Parses a post from its source text. `path` is only recorded, never
    /// read.
    pub fn from_str(path: &Path, input: &str) -> Result<Post> {
        let annotate = |err| Error::Frontmatter {
            path: path.to_owned(),
            err,
        };
        let tags = frontmatter::parse(input)
            .and_then(|fm| fm.tags())
            .map_err(annotate)?;
        Ok(Post {
            path: path.to_owned(),
            tags,
        })
    }
}

/// The result of a fallible post-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading a [`Post`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the source file can't be read (including when it isn't
    /// valid UTF-8).
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the front matter is missing or malformed.
    Frontmatter {
        path: PathBuf,
        err: frontmatter::Error,
    },
}

impl Error {
    /// The post the error concerns.
    pub fn path(&self) -> &Path {
        match self {
            Error::Io { path, .. } => path,
            Error::Frontmatter { path, .. } => path,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "reading post `{}`: {}", path.display(), err),
            Error::Frontmatter { path, err } => {
                write!(f, "parsing post `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            Error::Frontmatter { err, .. } => Some(err),
        }
    }
}
