//! marian-io - inspect and copy corpus files through the scoped file streams.
//!
//! Gzip is handled transparently on both sides based on the `.gz` suffix.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use marian_io::logging::{self, Level};
use marian_io::{InputFileStream, IoConfig, OutputFileStream, TemporaryFile};
use std::io::{self, Write};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("marian-io")
        .version(marian_io::VERSION)
        .about("Stream, copy and probe (optionally gzipped) corpus files")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .global(true)
                .help("trace, debug, info, warn, error or critical"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .action(ArgAction::Append)
                .global(true)
                .help("Also append log records to FILE (repeatable)"),
        )
        .arg(
            Arg::new("valid-log")
                .long("valid-log")
                .value_name("FILE")
                .action(ArgAction::Append)
                .global(true)
                .help("Also append validation records to FILE (repeatable)"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Do not log to stderr"),
        )
        .subcommand(
            Command::new("cat")
                .about("Write a file's (decompressed) content to stdout")
                .arg(Arg::new("path").required(true).index(1)),
        )
        .subcommand(
            Command::new("copy")
                .about("Copy SRC to DST, re-framing by their suffixes")
                .arg(Arg::new("src").required(true).index(1))
                .arg(Arg::new("dst").required(true).index(2))
                .arg(
                    Arg::new("create")
                        .long("create")
                        .action(ArgAction::SetTrue)
                        .help("Create DST first if it does not exist"),
                ),
        )
        .subcommand(
            Command::new("probe")
                .about("Report compression, emptiness and token count of a file")
                .arg(Arg::new("path").required(true).index(1)),
        )
        .subcommand(
            Command::new("scratch")
                .about("Round-trip stdin through a temporary file to stdout")
                .arg(
                    Arg::new("dir")
                        .long("dir")
                        .value_name("DIR")
                        .help("Base directory for the temporary file"),
                )
                .arg(
                    Arg::new("keep")
                        .long("keep")
                        .action(ArgAction::SetTrue)
                        .help("Keep the name visible until exit instead of unlinking early"),
                ),
        )
}

fn path_arg(matches: &ArgMatches, name: &str) -> PathBuf {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn load_config(matches: &ArgMatches) -> Result<IoConfig> {
    #[cfg(feature = "config")]
    let mut config = {
        let path = matches.get_one::<String>("config").map(PathBuf::from);
        IoConfig::load_or_default(path.as_deref())?
    };
    #[cfg(not(feature = "config"))]
    let mut config = {
        if matches.get_one::<String>("config").is_some() {
            anyhow::bail!("--config requires the `config` feature");
        }
        IoConfig::default()
    };

    if let Some(name) = matches.get_one::<String>("log-level") {
        config.logging.level =
            Level::from_name(name).with_context(|| format!("Unknown log level '{name}'"))?;
    }
    if let Some(files) = matches.get_many::<String>("log-file") {
        config.logging.log_files.extend(files.map(PathBuf::from));
    }
    if let Some(files) = matches.get_many::<String>("valid-log") {
        config.logging.valid_log_files.extend(files.map(PathBuf::from));
    }
    if matches.get_flag("quiet") {
        config.logging.quiet = true;
    }
    config.validate()?;
    Ok(config)
}

fn cat(matches: &ArgMatches, config: &IoConfig) -> Result<()> {
    let path = path_arg(matches, "path");
    let mut input = InputFileStream::open_with(&path, &config.streams);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let mut output = OutputFileStream::from_writer(&mut handle);
    let copied = io::copy(&mut input, &mut output)
        .with_context(|| format!("Failed to stream {}", path.display()))?;
    output.finish()?;

    marian_io::log_at!(debug, "[cat] {} bytes from '{}'", copied, path.display());
    Ok(())
}

fn copy(matches: &ArgMatches, config: &IoConfig) -> Result<()> {
    let src = path_arg(matches, "src");
    let dst = path_arg(matches, "dst");
    if matches.get_flag("create") && !dst.exists() {
        std::fs::File::create(&dst).with_context(|| format!("Failed to create {}", dst.display()))?;
    }

    let mut input = InputFileStream::open_with(&src, &config.streams);
    let mut output = OutputFileStream::open_with(&dst, &config.streams);
    let copied = io::copy(&mut input, &mut output)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    output.finish()?;

    marian_io::log_at!(
        info,
        "[copy] {} bytes '{}' ({}) -> '{}' ({})",
        copied,
        src.display(),
        input.compression().name(),
        dst.display(),
        output.compression().name()
    );
    Ok(())
}

fn probe(matches: &ArgMatches, config: &IoConfig) -> Result<()> {
    let path = path_arg(matches, "path");
    let mut input = InputFileStream::open_with(&path, &config.streams);

    let empty = input.empty();
    let mut tokens = 0u64;
    while input.read_value::<String>().is_some() {
        tokens += 1;
    }

    marian_io::log_valid!(
        info,
        "[probe] {} tokens in '{}' ({})",
        tokens,
        path.display(),
        input.compression().name()
    );

    let mut out = io::stdout().lock();
    writeln!(out, "path: {}", path.display())?;
    writeln!(out, "compression: {}", input.compression().name())?;
    writeln!(out, "empty: {empty}")?;
    writeln!(out, "tokens: {tokens}")?;
    Ok(())
}

fn scratch(matches: &ArgMatches, config: &IoConfig) -> Result<()> {
    let base = matches
        .get_one::<String>("dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.temp.base.clone());
    let early_unlink = config.temp.early_unlink && !matches.get_flag("keep");
    let temp = TemporaryFile::new(&base, early_unlink);
    eprintln!("{}", temp.file_name().display());

    {
        let mut output = OutputFileStream::from_temp_with(&temp, &config.streams);
        io::copy(&mut io::stdin().lock(), &mut output).context("Failed to fill scratch file")?;
        output.finish()?;
    }

    let mut input = InputFileStream::from_temp_with(&temp, &config.streams);
    let mut stdout = io::stdout().lock();
    io::copy(&mut input, &mut stdout).context("Failed to read scratch file")?;
    stdout.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let (command, sub) = matches.subcommand().context("missing subcommand")?;
    let config = match load_config(sub) {
        Ok(config) => config,
        Err(err) => marian_io::abort!("{:#}", err),
    };
    logging::create_loggers(&config.logging)?;

    match command {
        "cat" => cat(sub, &config),
        "copy" => copy(sub, &config),
        "probe" => probe(sub, &config),
        "scratch" => scratch(sub, &config),
        other => anyhow::bail!("Unknown subcommand '{other}'"),
    }
}
