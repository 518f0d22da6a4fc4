use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use std::process;
use tagpages::config::Config;
use tagpages::generate::generate;
use tagpages::scaffold::new_post;

fn main() {
    let matches = app().get_matches();

    let sub = matches.subcommand().1;
    init_logging(
        matches
            .occurrences_of("verbose")
            .max(sub.map(|m| m.occurrences_of("verbose")).unwrap_or(0)),
    );

    if let Err(err) = run(&matches) {
        log::error!("{}", err);
        process::exit(1);
    }
}

fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("tagpages")
        .version(crate_version!())
        .about("Generates and prunes per-tag pages for a Jekyll-style blog")
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .takes_value(true)
                .help("Project file to use instead of searching for tagpages.yaml"),
        )
        .arg(
            Arg::with_name("posts")
                .long("posts")
                .global(true)
                .value_name("DIR")
                .takes_value(true)
                .help("Directory containing posts [default: _posts]"),
        )
        .arg(
            Arg::with_name("output")
                .long("output")
                .global(true)
                .value_name("DIR")
                .takes_value(true)
                .help("Directory of generated tag pages [default: tags]"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .global(true)
                .help("Logs more detail; repeat for even more"),
        )
        .arg(dry_run_arg())
        .subcommand(
            SubCommand::with_name("generate")
                .about("Creates missing tag pages and removes stale ones (default)")
                .arg(dry_run_arg()),
        )
        .subcommand(
            SubCommand::with_name("new")
                .about("Scaffolds a new post dated today")
                .arg(
                    Arg::with_name("name")
                        .required(true)
                        .multiple(true)
                        .help("Name of the post, e.g. `solid in python`"),
                ),
        )
}

fn dry_run_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("dry-run")
        .long("dry-run")
        .help("Reports what would change without touching the tags directory")
}

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn run(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    match matches.subcommand() {
        ("new", Some(sub)) => {
            let name: Vec<&str> = sub.values_of("name").into_iter().flatten().collect();
            let today = chrono::Local::now().naive_local().date();
            new_post(&config.posts_directory, &name.join(" "), today)?;
            Ok(())
        }
        (_, sub) => {
            let dry_run = matches.is_present("dry-run")
                || sub.map(|m| m.is_present("dry-run")).unwrap_or(false);
            let summary = generate(&config, dry_run)?;
            if summary.is_success() {
                log::info!("{}", summary);
                Ok(())
            } else {
                log::error!("{}", summary);
                process::exit(1);
            }
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    // Global options may be given before or after the subcommand.
    let sub = matches.subcommand().1;
    let value_of = |name: &str| {
        sub.and_then(|m| m.value_of(name))
            .or_else(|| matches.value_of(name))
    };
    let mut config = match value_of("config") {
        Some(path) => Config::from_project_file(&cwd.join(path))?,
        None => Config::from_directory(&cwd)?,
    };
    if let Some(posts) = value_of("posts") {
        config.posts_directory = cwd.join(posts);
    }
    if let Some(output) = value_of("output") {
        config.tags_directory = cwd.join(output);
    }
    log::debug!(
        "posts: `{}`, tags: `{}`",
        config.posts_directory.display(),
        config.tags_directory.display()
    );
    Ok(config)
}

#[cfg(test)]
mod test {
    use super::*;

    fn posts_option(args: &[&str]) -> Option<String> {
        let matches = app().get_matches_from_safe(args).unwrap();
        let sub = matches.subcommand().1;
        sub.and_then(|m| m.value_of("posts"))
            .or_else(|| matches.value_of("posts"))
            .map(str::to_owned)
    }

    #[test]
    fn test_path_options_accepted_on_either_side_of_subcommand() {
        let wanted = Some(String::from("content"));
        assert_eq!(posts_option(&["tagpages", "--posts", "content"]), wanted);
        assert_eq!(posts_option(&["tagpages", "--posts", "content", "generate"]), wanted);
        assert_eq!(posts_option(&["tagpages", "generate", "--posts", "content"]), wanted);
        assert_eq!(posts_option(&["tagpages", "new", "hello", "--posts", "content"]), wanted);
        assert_eq!(posts_option(&["tagpages", "generate", "--dry-run"]), None);
    }

    #[test]
    fn test_new_requires_a_name() {
        assert!(app().get_matches_from_safe(&["tagpages", "new"]).is_err());
    }
}
