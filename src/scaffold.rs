//! Scaffolds new post source files named the way Jekyll expects:
//! `{posts_directory}/{YYYY-MM-DD}-{name}.md`.

use chrono::NaiveDate;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Turns a free-form name into the file name part of a post: trimmed,
/// spaces replaced with `-`, lowercased.
pub fn sanitize_name(name: &str) -> String {
    name.trim().replace(' ', "-").to_lowercase()
}

/// Derives a title from a sanitized name, e.g. `solid-in-python` becomes
/// `Solid In Python`.
pub fn title_from_name(name: &str) -> String {
    name.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// Double-quoted YAML scalar.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Writes a new post dated `date` and returns its path. Existing files are
/// never overwritten.
pub fn new_post(posts_directory: &Path, name: &str, date: NaiveDate) -> Result<PathBuf> {
    let name = sanitize_name(name);
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let date = date.format("%Y-%m-%d").to_string();
    let path = posts_directory.join(format!("{}-{}.md", date, name));
    let title = title_from_name(&name);
    let contents = format!(
        "---\nlayout: post\ntitle: {quoted}\ndate: {date}\ncategories: []\ntags: []\n---\n\n\
         # {title}\nWrite your content here.\n",
        quoted = quote(&title),
        title = title,
        date = date,
    );

    fs::create_dir_all(posts_directory).map_err(|err| Error::Io {
        path: posts_directory.to_owned(),
        err,
    })?;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::Exists(path));
        }
        Err(err) => return Err(Error::Io { path, err }),
    };
    if let Err(err) = file.write_all(contents.as_bytes()) {
        return Err(Error::Io { path, err });
    }
    log::info!("post created: {}", path.display());
    Ok(path)
}

/// The result of a fallible scaffolding operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error scaffolding a post.
#[derive(Debug)]
pub enum Error {
    /// Returned when the name is blank.
    EmptyName,

    /// Returned when a post with the same date and name already exists.
    Exists(PathBuf),

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::EmptyName => write!(f, "post name must not be empty"),
            Error::Exists(path) => write!(f, "post `{}` already exists", path.display()),
            Error::Io { path, err } => write!(f, "writing `{}`: {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { err, .. } => Some(err),
            _ => None,
        }
    }
}
