use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgMatches, CommandFactory, FromArgMatches, parser::ValueSource};
use olyshare_core::import::{MOVIE_CONTENT_TYPES, RAW_CONTENT_TYPES};
use olyshare_core::{ImportJob, UndatedPolicy};

use crate::app_config::FileConfig;
use crate::cli::Args;

/// Which arguments were given explicitly on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CliValueSources {
    pub(crate) cam_ip: bool,
    pub(crate) image_dir: bool,
    pub(crate) cache_dir: bool,
    pub(crate) no_cache: bool,
    pub(crate) out_dir: bool,
    pub(crate) copy_days: bool,
    pub(crate) import_routines: bool,
    pub(crate) skip_movie: bool,
    pub(crate) skip_raw: bool,
    pub(crate) skip_types: bool,
    pub(crate) skip_undated: bool,
    pub(crate) connect_timeout: bool,
    pub(crate) read_timeout: bool,
}

pub(crate) fn parse_cli_with_sources() -> (Args, CliValueSources) {
    let matches = Args::command().get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    let sources = sources_from_matches(&matches);
    (args, sources)
}

fn sources_from_matches(matches: &ArgMatches) -> CliValueSources {
    CliValueSources {
        cam_ip: is_commandline_value(matches, "cam_ip"),
        image_dir: is_commandline_value(matches, "image_dir"),
        cache_dir: is_commandline_value(matches, "cache_dir"),
        no_cache: is_commandline_value(matches, "no_cache"),
        out_dir: is_commandline_value(matches, "out_dir"),
        copy_days: is_commandline_value(matches, "copy_days"),
        import_routines: is_commandline_value(matches, "import_routines"),
        skip_movie: is_commandline_value(matches, "skip_movie"),
        skip_raw: is_commandline_value(matches, "skip_raw"),
        skip_types: is_commandline_value(matches, "skip_types"),
        skip_undated: is_commandline_value(matches, "skip_undated"),
        connect_timeout: is_commandline_value(matches, "connect_timeout"),
        read_timeout: is_commandline_value(matches, "read_timeout"),
    }
}

fn is_commandline_value(matches: &ArgMatches, id: &str) -> bool {
    matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Fills every argument not given on the command line from the config file.
pub(crate) fn apply_config_defaults(
    mut args: Args,
    cli_sources: &CliValueSources,
    file_config: Option<&FileConfig>,
) -> Result<Args> {
    let Some(file_config) = file_config else {
        return Ok(args);
    };
    file_config.validate()?;

    if !cli_sources.cam_ip
        && let Some(cam_ip) = &file_config.cam_ip
    {
        args.cam_ip.clone_from(cam_ip);
    }
    if !cli_sources.image_dir
        && let Some(image_dir) = &file_config.image_dir
    {
        args.image_dir.clone_from(image_dir);
    }
    if !cli_sources.cache_dir
        && let Some(cache_dir) = &file_config.cache_dir
    {
        args.cache_dir.clone_from(cache_dir);
    }
    if !cli_sources.no_cache
        && let Some(no_cache) = file_config.no_cache
    {
        args.no_cache = no_cache;
    }
    if !cli_sources.out_dir
        && let Some(out_dir) = &file_config.out_dir
    {
        args.out_dir.clone_from(out_dir);
    }
    if !cli_sources.copy_days
        && let Some(copy_days) = file_config.copy_days
    {
        args.copy_days = copy_days;
    }
    if !cli_sources.import_routines
        && let Some(import_routines) = file_config.import_routines
    {
        args.import_routines = import_routines;
    }
    if !cli_sources.skip_movie
        && let Some(skip_movie) = file_config.skip_movie
    {
        args.skip_movie = skip_movie;
    }
    if !cli_sources.skip_raw
        && let Some(skip_raw) = file_config.skip_raw
    {
        args.skip_raw = skip_raw;
    }
    if !cli_sources.skip_types
        && let Some(skip_types) = &file_config.skip_types
    {
        args.skip_types.clone_from(skip_types);
    }
    if !cli_sources.skip_undated
        && let Some(skip_undated) = file_config.skip_undated
    {
        args.skip_undated = skip_undated;
    }
    if !cli_sources.connect_timeout
        && let Some(secs) = file_config.connect_timeout_secs
    {
        args.connect_timeout = secs;
    }
    if !cli_sources.read_timeout
        && let Some(secs) = file_config.read_timeout_secs
    {
        args.read_timeout = secs;
    }

    Ok(args)
}

/// Content types excluded by the skip flags, not yet normalized.
pub(crate) fn excluded_content_types(args: &Args) -> Vec<String> {
    let mut types = Vec::new();
    if args.skip_movie {
        types.extend(MOVIE_CONTENT_TYPES.iter().map(ToString::to_string));
    }
    if args.skip_raw {
        types.extend(RAW_CONTENT_TYPES.iter().map(ToString::to_string));
    }
    types.extend(args.skip_types.iter().cloned());
    types
}

/// Builds the import job described by the merged arguments.
pub(crate) fn build_import_job(args: &Args) -> ImportJob {
    let policy = if args.skip_undated {
        UndatedPolicy::Skip
    } else {
        UndatedPolicy::Abort
    };
    ImportJob::new(args.out_dir.clone())
        .with_retention_days(args.copy_days)
        .with_workers(args.import_routines)
        .exclude_content_types(excluded_content_types(args))
        .with_undated_policy(policy)
}

/// Returns the cache directory, or `None` when caching is disabled.
pub(crate) fn cache_dir(args: &Args) -> Option<PathBuf> {
    (!args.no_cache).then(|| args.cache_dir.clone())
}
