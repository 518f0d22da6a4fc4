//! The tag page synchronizer. The tags directory is the only record of what
//! was generated before: each `{slug}.md` file in it stands for one tag, so
//! reconciling is a matter of diffing the file stems against the current
//! [`TagIndex`] ([`Synchronizer::plan`]) and then writing and deleting the
//! difference ([`Synchronizer::apply`]). Pages for tags that still exist
//! are never rewritten unless their front matter is unreadable, which is
//! what a write cut short leaves behind.

use crate::config::Config;
use crate::frontmatter;
use crate::tag::{Tag, TagIndex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const PAGE_EXTENSION: &str = "md";

/// The changes needed to bring the tags directory in line with a
/// [`TagIndex`]. The two sets are always disjoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub to_create: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,

    /// Pages for current tags whose contents are empty or truncated.
    pub to_repair: BTreeSet<String>,

    /// The number of existing pages that are already correct.
    pub unchanged: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty() && self.to_repair.is_empty()
    }
}

/// What a call to [`Synchronizer::apply`] actually did.
#[derive(Debug, Default)]
pub struct Report {
    pub created: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub repaired: BTreeSet<String>,
    pub unchanged: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    /// True if every planned write and delete succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Delete,
    Repair,
}

/// A single page that couldn't be written or deleted.
#[derive(Debug)]
pub struct Failure {
    pub slug: String,
    pub path: PathBuf,
    pub operation: Operation,
    pub err: io::Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let verb = match self.operation {
            Operation::Create => "creating",
            Operation::Delete => "deleting",
            Operation::Repair => "repairing",
        };
        write!(
            f,
            "{} tag page `{}`: {}",
            verb,
            self.path.display(),
            self.err
        )
    }
}

/// The front matter of a generated tag page.
#[derive(Serialize)]
struct TagPage<'a> {
    layout: &'a str,
    tag: &'a str,
    slug: &'a str,
    permalink: String,
}

/// Reconciles the tags directory named by a [`Config`].
pub struct Synchronizer<'a> {
    config: &'a Config,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a Config) -> Synchronizer<'a> {
        Synchronizer { config }
    }

    /// The location of the page for `slug`. [`Synchronizer::existing`]
    /// inverts this by taking the file stem.
    pub fn page_path(&self, slug: &str) -> PathBuf {
        self.config
            .tags_directory
            .join(format!("{}.{}", slug, PAGE_EXTENSION))
    }

    // Pages are written here first and then moved into place, so a page
    // path only ever holds a complete page. The leading `.` and trailing
    // extension keep it out of [`Synchronizer::existing`].
    fn temporary_path(&self, slug: &str) -> PathBuf {
        self.config
            .tags_directory
            .join(format!(".{}.{}.tmp", slug, PAGE_EXTENSION))
    }

    /// True if the page for `slug` can be read and its front matter parses.
    /// Every page the generator writes ends with the closing fence, so a
    /// page missing it was never finished.
    pub fn is_intact(&self, slug: &str) -> bool {
        fs::read_to_string(self.page_path(slug))
            .map(|contents| frontmatter::parse(&contents).is_ok())
            .unwrap_or(false)
    }

    /// Returns the slugs of the generated pages currently on disk. Reserved
    /// pages, directories and files without the page extension aren't
    /// generated and are left out. A missing directory has no pages.
    pub fn existing(&self) -> Result<BTreeSet<String>> {
        let dir = &self.config.tags_directory;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(BTreeSet::new());
            }
            Err(err) => return Err(self.directory_error(err)),
        };

        let mut slugs = BTreeSet::new();
        for result in entries {
            let entry = result.map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PAGE_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if !self.config.is_reserved(stem) => {
                    slugs.insert(stem.to_owned());
                }
                _ => {}
            }
        }
        Ok(slugs)
    }

    /// Diffs the pages on disk against `tags`. Nothing is written.
    pub fn plan(&self, tags: &TagIndex) -> Result<Plan> {
        let existing = self.existing()?;
        let mut desired = tags.slugs();
        desired.retain(|slug| {
            let reserved = self.config.is_reserved(slug);
            if reserved {
                log::warn!(
                    "not generating a page for tag `{}`: `{}` is reserved",
                    slug,
                    self.page_path(slug).display()
                );
            }
            !reserved
        });

        let (unchanged, to_repair): (Vec<String>, Vec<String>) = existing
            .intersection(&desired)
            .cloned()
            .partition(|slug| self.is_intact(slug));
        Ok(Plan {
            to_create: desired.difference(&existing).cloned().collect(),
            to_delete: existing.difference(&desired).cloned().collect(),
            to_repair: to_repair.into_iter().collect(),
            unchanged: unchanged.len(),
        })
    }

    /// Carries out `plan`. Each page is handled on its own: a failure is
    /// logged and recorded in the [`Report`], and the rest of the plan still
    /// runs. Only a tags directory that can't be created is fatal.
    pub fn apply(&self, plan: &Plan, tags: &TagIndex) -> Result<Report> {
        let mut report = Report {
            unchanged: plan.unchanged,
            ..Report::default()
        };

        for slug in &plan.to_delete {
            let path = self.page_path(slug);
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("removed tag page `{}`", path.display());
                    report.deleted.insert(slug.clone());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::debug!("tag page `{}` already gone", path.display());
                }
                Err(err) => self.fail(&mut report, slug, path, Operation::Delete, err),
            }
        }

        if !plan.to_create.is_empty() || !plan.to_repair.is_empty() {
            self.ensure_directory()?;
        }
        for slug in &plan.to_create {
            let path = self.page_path(slug);
            match self.write_page(slug, tags, false) {
                Ok(()) => {
                    log::info!("created tag page `{}`", path.display());
                    report.created.insert(slug.clone());
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("tag page `{}` already exists", path.display());
                    report.unchanged += 1;
                }
                Err(err) => self.fail(&mut report, slug, path, Operation::Create, err),
            }
        }
        for slug in &plan.to_repair {
            let path = self.page_path(slug);
            match self.write_page(slug, tags, true) {
                Ok(()) => {
                    log::warn!("rewrote incomplete tag page `{}`", path.display());
                    report.repaired.insert(slug.clone());
                }
                Err(err) => self.fail(&mut report, slug, path, Operation::Repair, err),
            }
        }

        Ok(report)
    }

    /// Plans and applies in one step. After a successful run with no
    /// failures, the pages on disk match `tags` exactly.
    pub fn synchronize(&self, tags: &TagIndex) -> Result<Report> {
        let plan = self.plan(tags)?;
        self.apply(&plan, tags)
    }

    /// Renders the contents of the page for `tag`.
    pub fn render(&self, tag: &Tag) -> Result<String> {
        let page = TagPage {
            layout: &self.config.layout,
            tag: &tag.name,
            slug: &tag.slug,
            permalink: format!("{}{}/", self.config.permalink_prefix, tag.slug),
        };
        let yaml = serde_yaml::to_string(&page)?;
        let yaml = yaml.strip_prefix("---\n").unwrap_or(&yaml);
        let mut contents = String::with_capacity(yaml.len() + 8);
        contents.push_str("---\n");
        contents.push_str(yaml);
        if !yaml.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str("---\n");
        Ok(contents)
    }

    // Writes the page for `slug` through its temporary file. Without
    // `replace`, an existing page is left alone and `AlreadyExists` is
    // returned.
    fn write_page(&self, slug: &str, tags: &TagIndex, replace: bool) -> io::Result<()> {
        let tag = tags.get(slug).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "tag is not in the index")
        })?;
        let contents = self
            .render(tag)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        let temporary = self.temporary_path(slug);
        let path = self.page_path(slug);
        let result = fs::write(&temporary, contents).and_then(|()| match replace {
            true => fs::rename(&temporary, &path),
            false => fs::hard_link(&temporary, &path),
        });
        if !(replace && result.is_ok()) {
            remove_if_present(&temporary);
        }
        result
    }

    fn ensure_directory(&self) -> Result<()> {
        let dir = &self.config.tags_directory;
        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(Error::NotADirectory(dir.to_owned())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(dir).map_err(|err| self.directory_error(err))
            }
            Err(err) => Err(self.directory_error(err)),
        }
    }

    fn directory_error(&self, err: io::Error) -> Error {
        let dir = &self.config.tags_directory;
        if dir.exists() && !dir.is_dir() {
            Error::NotADirectory(dir.to_owned())
        } else {
            Error::Io {
                path: dir.to_owned(),
                err,
            }
        }
    }

    fn fail(
        &self,
        report: &mut Report,
        slug: &str,
        path: PathBuf,
        operation: Operation,
        err: io::Error,
    ) {
        let failure = Failure {
            slug: slug.to_owned(),
            path,
            operation,
            err,
        };
        log::error!("{}", failure);
        report.failures.push(failure);
    }
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => log::debug!("leaving `{}` behind: {}", path.display(), err),
    }
}

/// The result of a fallible synchronization.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error that stops synchronization as a whole. Failures of
/// individual pages are reported through [`Report::failures`] instead.
#[derive(Debug)]
pub enum Error {
    /// Returned when the tags path exists but isn't a directory.
    NotADirectory(PathBuf),

    /// Returned when the tags directory can't be listed or created.
    Io { path: PathBuf, err: io::Error },

    /// Returned when a page's front matter can't be serialized.
    SerializeYaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotADirectory(path) => {
                write!(f, "tags path `{}` is not a directory", path.display())
            }
            Error::Io { path, err } => {
                write!(f, "tags directory `{}`: {}", path.display(), err)
            }
            Error::SerializeYaml(err) => write!(f, "rendering tag page: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotADirectory(_) => None,
            Error::Io { err, .. } => Some(err),
            Error::SerializeYaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] serialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::SerializeYaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frontmatter;
    use serde_yaml::Value;

    fn index(raw: &[&str]) -> TagIndex {
        let mut tags = TagIndex::new();
        for t in raw {
            tags.insert(t, Path::new("post.md"));
        }
        tags
    }

    fn set(slugs: &[&str]) -> BTreeSet<String> {
        slugs.iter().map(|s| s.to_string()).collect()
    }

    fn setup() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_root(dir.path());
        (dir, config)
    }

    const SEEDED: &str = "---\nseeded: true\n---\n";

    fn seed(config: &Config, slugs: &[&str]) {
        fs::create_dir_all(&config.tags_directory).unwrap();
        for slug in slugs {
            fs::write(config.tags_directory.join(format!("{}.md", slug)), SEEDED).unwrap();
        }
    }

    #[test]
    fn test_existing_ignores_reserved_and_foreign_files() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["python", "index"]);
        fs::write(config.tags_directory.join("notes.txt"), "").unwrap();
        fs::create_dir(config.tags_directory.join("assets.md")).unwrap();

        let sync = Synchronizer::new(&config);
        assert_eq!(sync.existing()?, set(&["python"]));
        Ok(())
    }

    #[test]
    fn test_existing_missing_directory() -> Result<()> {
        let (_dir, config) = setup();
        assert!(Synchronizer::new(&config).existing()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_creates_only_new_tags() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["python"]);
        let sync = Synchronizer::new(&config);

        let report = sync.synchronize(&index(&["python", "solid"]))?;
        assert_eq!(report.created, set(&["solid"]));
        assert!(report.deleted.is_empty());
        assert_eq!(report.unchanged, 1);
        assert_eq!(
            fs::read_to_string(sync.page_path("python")).unwrap(),
            SEEDED
        );
        Ok(())
    }

    #[test]
    fn test_deletes_only_stale_tags() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["python", "solid", "obsolete", "index"]);
        let sync = Synchronizer::new(&config);

        let report = sync.synchronize(&index(&["python", "solid"]))?;
        assert!(report.created.is_empty());
        assert_eq!(report.deleted, set(&["obsolete"]));
        assert!(!sync.page_path("obsolete").exists());
        assert!(config.tags_directory.join("index.md").exists());
        assert_eq!(sync.existing()?, set(&["python", "solid"]));
        Ok(())
    }

    #[test]
    fn test_second_run_is_a_no_op() -> Result<()> {
        let (_dir, config) = setup();
        let sync = Synchronizer::new(&config);
        let tags = index(&["python", "solid"]);

        let first = sync.synchronize(&tags)?;
        assert_eq!(first.created, set(&["python", "solid"]));

        let plan = sync.plan(&tags)?;
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 2);
        let second = sync.apply(&plan, &tags)?;
        assert!(second.created.is_empty() && second.deleted.is_empty());
        assert!(second.is_success());
        Ok(())
    }

    #[test]
    fn test_empty_index_deletes_everything_generated() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["a", "b", "index"]);
        let sync = Synchronizer::new(&config);

        let report = sync.synchronize(&TagIndex::new())?;
        assert_eq!(report.deleted, set(&["a", "b"]));
        assert!(sync.existing()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_unslugged_leftover_pages_are_pruned() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["Design Patterns"]);
        let sync = Synchronizer::new(&config);

        let report = sync.synchronize(&index(&["Design Patterns"]))?;
        assert_eq!(report.created, set(&["design-patterns"]));
        assert_eq!(report.deleted, set(&["Design Patterns"]));
        assert_eq!(sync.existing()?, set(&["design-patterns"]));
        Ok(())
    }

    #[test]
    fn test_reserved_slug_is_not_generated() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["index"]);
        let sync = Synchronizer::new(&config);

        let plan = sync.plan(&index(&["Index", "rust"]))?;
        assert_eq!(plan.to_create, set(&["rust"]));
        assert!(plan.to_delete.is_empty());
        Ok(())
    }

    #[test]
    fn test_tags_path_is_a_file() {
        let (_dir, config) = setup();
        fs::write(&config.tags_directory, "").unwrap();
        let result = Synchronizer::new(&config).synchronize(&index(&["rust"]));
        assert!(matches!(result, Err(Error::NotADirectory(_))));
    }

    #[test]
    fn test_rendered_page_round_trips() -> Result<()> {
        let (_dir, config) = setup();
        let sync = Synchronizer::new(&config);
        let tags = index(&["Domain: Driven #Design"]);
        sync.synchronize(&tags)?;

        let path = sync.page_path("domain-driven-design");
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("---\n"));
        assert!(contents.ends_with("---\n"));

        let fm = frontmatter::parse(&contents).unwrap();
        let field = |key: &str| fm.get(key).and_then(Value::as_str).map(str::to_owned);
        assert_eq!(field("layout").as_deref(), Some("tag"));
        assert_eq!(field("tag").as_deref(), Some("Domain: Driven #Design"));
        assert_eq!(field("slug").as_deref(), Some("domain-driven-design"));
        assert_eq!(
            field("permalink").as_deref(),
            Some("/tags/domain-driven-design/")
        );
        Ok(())
    }

    #[test]
    fn test_partial_run_converges() -> Result<()> {
        let (_dir, config) = setup();
        let sync = Synchronizer::new(&config);
        let tags = index(&["a", "b", "c"]);

        // Simulate a run interrupted after writing one page and before
        // deleting a stale one.
        let plan = sync.plan(&tags)?;
        sync.apply(
            &Plan {
                to_create: set(&["a"]),
                ..plan
            },
            &tags,
        )?;
        seed(&config, &["stale"]);

        let report = sync.synchronize(&tags)?;
        assert_eq!(report.created, set(&["b", "c"]));
        assert_eq!(report.deleted, set(&["stale"]));
        assert_eq!(sync.existing()?, tags.slugs());
        Ok(())
    }

    #[test]
    fn test_per_page_failure_does_not_stop_the_rest() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["stale"]);
        let sync = Synchronizer::new(&config);
        let tags = index(&["new"]);

        // A directory squatting on a page path can't be removed as a file,
        // and a slug missing from the index can't be rendered.
        fs::create_dir(sync.page_path("squatter")).unwrap();
        let plan = Plan {
            to_create: set(&["ghost", "new"]),
            to_delete: set(&["squatter", "stale"]),
            to_repair: BTreeSet::new(),
            unchanged: 0,
        };
        let report = sync.apply(&plan, &tags)?;
        assert!(!report.is_success());
        assert_eq!(report.created, set(&["new"]));
        assert_eq!(report.deleted, set(&["stale"]));

        let failed: Vec<(&str, Operation)> = report
            .failures
            .iter()
            .map(|f| (f.slug.as_str(), f.operation))
            .collect();
        assert_eq!(
            failed,
            vec![("squatter", Operation::Delete), ("ghost", Operation::Create)]
        );
        Ok(())
    }

    #[test]
    fn test_incomplete_pages_are_rewritten() -> Result<()> {
        let (_dir, config) = setup();
        seed(&config, &["python"]);
        let sync = Synchronizer::new(&config);
        fs::write(sync.page_path("rust"), "").unwrap();
        fs::write(sync.page_path("go"), "---\nlayout: tag\nta").unwrap();
        let tags = index(&["python", "rust", "go"]);

        let plan = sync.plan(&tags)?;
        assert_eq!(plan.to_repair, set(&["go", "rust"]));
        assert_eq!(plan.unchanged, 1);

        let report = sync.apply(&plan, &tags)?;
        assert!(report.is_success());
        assert_eq!(report.repaired, set(&["go", "rust"]));
        assert!(sync.is_intact("rust") && sync.is_intact("go"));
        assert_eq!(fs::read_to_string(sync.page_path("python")).unwrap(), SEEDED);
        assert!(!sync.temporary_path("rust").exists());
        assert!(sync.plan(&tags)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_write_leaves_no_page_behind() -> Result<()> {
        let (_dir, config) = setup();
        let sync = Synchronizer::new(&config);
        fs::create_dir_all(sync.temporary_path("rust")).unwrap();

        let report = sync.synchronize(&index(&["rust"]))?;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].operation, Operation::Create);
        assert!(!sync.page_path("rust").exists());
        assert!(sync.existing()?.is_empty());
        Ok(())
    }
}
