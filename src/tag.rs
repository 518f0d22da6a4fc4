//! Defines the [`Tag`] and [`TagIndex`] types and the [`slugify`] function
//! which normalizes raw tag names.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Normalizes a raw tag name into a slug. Surrounding whitespace is trimmed,
/// letters are lowercased (and transliterated to ASCII), and runs of
/// non-alphanumeric characters collapse into a single `-`. The result never
/// starts or ends with `-`, so `slugify(&slugify(s)) == slugify(s)`.
pub fn slugify(raw: &str) -> String {
    slug::slugify(raw.trim())
}

/// Represents a tag found in one or more posts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The display name, as written in the front matter of the first post
    /// that carried this tag.
    pub name: String,

    /// The normalized name. See [`slugify`].
    pub slug: String,

    /// The posts carrying this tag, in scan order.
    pub posts: Vec<PathBuf>,
}

/// The distinct tags found across all posts, keyed by slug.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIndex {
    tags: BTreeMap<String, Tag>,
}

impl TagIndex {
    pub fn new() -> TagIndex {
        TagIndex::default()
    }

    /// Records that the post at `post` carries the tag `raw`. Returns the
    /// slug, or `None` if the tag normalizes to the empty string. When two
    /// raw names share a slug, the first one inserted keeps the display name.
    pub fn insert(&mut self, raw: &str, post: &Path) -> Option<&str> {
        let slug = slugify(raw);
        if slug.is_empty() {
            return None;
        }

        let tag = match self.tags.entry(slug) {
            btree_map::Entry::Occupied(entry) => entry.into_mut(),
            btree_map::Entry::Vacant(entry) => {
                let slug = entry.key().clone();
                entry.insert(Tag {
                    name: raw.trim().to_owned(),
                    slug,
                    posts: Vec::new(),
                })
            }
        };
        if !tag.posts.iter().any(|p| p == post) {
            tag.posts.push(post.to_owned());
        }
        Some(tag.slug.as_str())
    }

    pub fn get(&self, slug: &str) -> Option<&Tag> {
        self.tags.get(slug)
    }

    /// Returns the set of slugs, which is what the synchronizer diffs
    /// against.
    pub fn slugs(&self) -> BTreeSet<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates over the tags in slug order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }
}
