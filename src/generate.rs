//! Exports the [`generate`] function which stitches together the two steps of
//! a run: collecting tags from the posts ([`crate::scan`]) and reconciling
//! the tag pages with them ([`crate::sync`]).

use crate::config::Config;
use crate::post;
use crate::scan::{self, collect_tags};
use crate::sync::{self, Plan, Report, Synchronizer};
use crate::tag::TagIndex;
use std::fmt;

/// The outcome of a run.
#[derive(Debug)]
pub struct Summary {
    pub tags: TagIndex,

    /// The number of posts that parsed.
    pub posts: usize,

    /// Posts skipped because they couldn't be parsed.
    pub post_failures: Vec<post::Error>,

    /// What was done, or for a dry run, what would have been done.
    pub outcome: Outcome,
}

#[derive(Debug)]
pub enum Outcome {
    Planned(Plan),
    Applied(Report),
}

impl Summary {
    /// True only if every post parsed and every page operation succeeded.
    pub fn is_success(&self) -> bool {
        self.post_failures.is_empty()
            && match &self.outcome {
                Outcome::Planned(_) => true,
                Outcome::Applied(report) => report.is_success(),
            }
    }
}

impl fmt::Display for Summary {
    /// Renders the one-line summary printed at the end of a run.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} tags from {} posts", self.tags.len(), self.posts)?;
        match &self.outcome {
            Outcome::Planned(plan) => write!(
                f,
                "; would create {}, delete {}, keep {}",
                plan.to_create.len(),
                plan.to_delete.len(),
                plan.unchanged
            )?,
            Outcome::Applied(report) => write!(
                f,
                "; created {}, deleted {}, kept {}",
                report.created.len(),
                report.deleted.len(),
                report.unchanged
            )?,
        }
        let repairs = match &self.outcome {
            Outcome::Planned(plan) => plan.to_repair.len(),
            Outcome::Applied(report) => report.repaired.len(),
        };
        if repairs > 0 {
            write!(f, ", repaired {}", repairs)?;
        }
        let page_failures = match &self.outcome {
            Outcome::Planned(_) => 0,
            Outcome::Applied(report) => report.failures.len(),
        };
        if !self.post_failures.is_empty() || page_failures > 0 {
            write!(
                f,
                " ({} posts skipped, {} page operations failed)",
                self.post_failures.len(),
                page_failures
            )?;
        }
        Ok(())
    }
}

/// Runs the generator described by `config`. With `dry_run`, the tags
/// directory is diffed but nothing is written or deleted.
pub fn generate(config: &Config, dry_run: bool) -> Result<Summary> {
    let collection = collect_tags(&config.posts_directory)?;
    if collection.tags.is_empty() {
        log::info!("no tags found in posts");
    } else {
        let names: Vec<&str> = collection.tags.iter().map(|t| t.slug.as_str()).collect();
        log::info!("found tags: {}", names.join(", "));
    }

    let synchronizer = Synchronizer::new(config);
    let outcome = if dry_run {
        let plan = synchronizer.plan(&collection.tags)?;
        for slug in &plan.to_create {
            log::info!("would create `{}`", synchronizer.page_path(slug).display());
        }
        for slug in &plan.to_delete {
            log::info!("would remove `{}`", synchronizer.page_path(slug).display());
        }
        for slug in &plan.to_repair {
            log::info!("would rewrite `{}`", synchronizer.page_path(slug).display());
        }
        Outcome::Planned(plan)
    } else {
        Outcome::Applied(synchronizer.synchronize(&collection.tags)?)
    };

    Ok(Summary {
        tags: collection.tags,
        posts: collection.posts,
        post_failures: collection.failures,
        outcome,
    })
}

/// The result of a fallible run.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for a run that couldn't proceed at all.
#[derive(Debug)]
pub enum Error {
    /// Returned when the posts directory can't be scanned.
    Scan(scan::Error),

    /// Returned when the tags directory can't be reconciled.
    Sync(sync::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan(err) => err.fmt(f),
            Error::Sync(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::Sync(err) => Some(err),
        }
    }
}

impl From<scan::Error> for Error {
    /// Converts [`scan::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: scan::Error) -> Error {
        Error::Scan(err)
    }
}

impl From<sync::Error> for Error {
    /// Converts [`sync::Error`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: sync::Error) -> Error {
        Error::Sync(err)
    }
}
