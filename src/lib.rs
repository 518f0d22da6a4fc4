//! The library code for the `tagpages` generator, which keeps a blog's
//! per-tag pages in step with the tags its posts use. A run has two steps:
//!
//! 1. Scanning posts for tags ([`crate::scan`])
//! 2. Reconciling the tags directory against those tags ([`crate::sync`])
//!
//! The second step never rebuilds the directory from scratch. It compares
//! the page files already on disk with the tags that were found, writes pages
//! for new tags, deletes pages for tags nobody uses anymore, and leaves every
//! other page alone, so running it twice in a row changes nothing the second
//! time.
//!
//! [`crate::generate`] glues the two steps together and [`crate::scaffold`]
//! creates new, empty posts.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod config;
pub mod frontmatter;
pub mod generate;
pub mod post;
pub mod scaffold;
pub mod scan;
pub mod sync;
pub mod tag;
