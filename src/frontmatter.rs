//! Splits the YAML front matter block off of a post source file and parses it
//! into a loosely-typed [`Frontmatter`] mapping. The only typed accessor is
//! [`Frontmatter::tags`]; callers are expected to pull out what they need
//! right away rather than pass the mapping around.

use serde_yaml::{Mapping, Value};
use std::fmt;

const FENCE: &str = "---";

/// Returns the YAML between the opening and closing fences, and the body
/// following the closing fence. Both fences must sit on lines of their own,
/// and the opening fence must be the first line of the input.
pub fn split(input: &str) -> Result<(&str, &str)> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut lines = input.split_inclusive('\n');
    match lines.next() {
        Some(first) if is_fence(first) => {}
        _ => return Err(Error::MissingStartFence),
    }

    let yaml_start = input
        .find('\n')
        .map(|i| i + 1)
        .ok_or(Error::MissingEndFence)?;
    let mut offset = yaml_start;
    for line in lines {
        if is_fence(line) {
            return Ok((&input[yaml_start..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::MissingEndFence)
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

/// Parses the front matter block of `input`.
pub fn parse(input: &str) -> Result<Frontmatter> {
    let (yaml, _) = split(input)?;
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(fields) => Ok(Frontmatter { fields }),
        Value::Null => Ok(Frontmatter::default()),
        _ => Err(Error::NotAMapping),
    }
}

/// The key-value pairs of a front matter block. Values can be of any YAML
/// type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    fields: Mapping,
}

impl Frontmatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(&Value::String(key.to_owned()))
    }

    /// Extracts the `tags` field. A missing or null field yields no tags. A
    /// sequence yields one tag per scalar item, and a single string is split
    /// on whitespace (as Jekyll does for `tags: foo bar`).
    pub fn tags(&self) -> Result<Vec<String>> {
        match self.get("tags") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(s.split_whitespace().map(str::to_owned).collect()),
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Null => None,
                    Value::String(s) => Some(Ok(s.clone())),
                    Value::Number(n) => Some(Ok(n.to_string())),
                    Value::Bool(b) => Some(Ok(b.to_string())),
                    _ => Some(Err(Error::InvalidTags)),
                })
                .collect(),
            Some(_) => Err(Error::InvalidTags),
        }
    }
}

/// The result of a fallible front matter operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error extracting front matter from a post.
#[derive(Debug)]
pub enum Error {
    /// Returned when the input doesn't begin with a `---` line.
    MissingStartFence,

    /// Returned when the opening `---` line has no matching closing line.
    MissingEndFence,

    /// Returned when the front matter isn't valid YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the front matter is valid YAML but not a mapping.
    NotAMapping,

    /// Returned when the `tags` field is neither a string nor a sequence of
    /// scalars.
    InvalidTags,
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingStartFence => write!(f, "front matter must begin with `---`"),
            Error::MissingEndFence => write!(f, "missing closing `---`"),
            Error::DeserializeYaml(err) => write!(f, "invalid front matter: {}", err),
            Error::NotAMapping => write!(f, "front matter must be a mapping"),
            Error::InvalidTags => {
                write!(f, "`tags` must be a string or a list of strings")
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeserializeYaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}
