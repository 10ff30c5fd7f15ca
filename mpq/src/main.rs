use std::path::PathBuf;

use mpq_bridge::{Bridge, Engine};
use structopt::clap::AppSettings::*;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod protocol;
mod util;

use error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
    Memory,
    StormLib,
}

#[cfg(feature = "stormlib")]
const DEFAULT_ENGINE: &str = "stormlib";
#[cfg(not(feature = "stormlib"))]
const DEFAULT_ENGINE: &str = "memory";

fn parse_engine(src: &str) -> Result<EngineKind> {
    match src {
        "memory" => Ok(EngineKind::Memory),
        "stormlib" => Ok(EngineKind::StormLib),
        _ => Err(Error::UnknownEngine(src.to_string())),
    }
}

fn engine(kind: EngineKind) -> Result<Box<dyn Engine>> {
    match kind {
        EngineKind::Memory => Ok(Box::new(mpq_bridge::MemoryEngine::new())),
        #[cfg(feature = "stormlib")]
        EngineKind::StormLib => Ok(Box::new(mpq_bridge::StormLib)),
        #[cfg(not(feature = "stormlib"))]
        EngineKind::StormLib => Err(Error::EngineUnavailable("stormlib")),
    }
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(about = "Answer JSON-lines requests from stdin on stdout")]
    Serve,

    #[structopt(about = "Run a file of JSON-lines requests, printing each response")]
    Run {
        #[structopt(parse(from_os_str), help = "Path to the request script")]
        script: PathBuf,
    },

    #[structopt(name = "l", visible_alias = "list", about = "List files of an archive")]
    List {
        #[structopt(parse(from_os_str), help = "Path to the .mpq archive")]
        archive: PathBuf,

        #[structopt(short, long, default_value = "*", help = "Wildcard mask for names")]
        mask: String,
    },

    #[structopt(about = "Write archived files to stdout")]
    Cat {
        #[structopt(parse(from_os_str), help = "Path to the .mpq archive")]
        archive: PathBuf,

        #[structopt(required = true, help = "Archived names to print")]
        names: Vec<String>,
    },

    #[structopt(name = "a", visible_alias = "add", about = "Add files to an archive")]
    Add {
        #[structopt(short, long, help = "Create the archive instead of opening it")]
        create: bool,

        #[structopt(
            long,
            default_value = "1024",
            help = "Capacity of a newly created archive"
        )]
        max_files: u32,

        #[structopt(
            short = "C",
            long,
            parse(try_from_str = util::parse_compression),
            hide_default_value = true,
            default_value = "zlib",
            help = "Compression to be used for a file [default: zlib]"
        )]
        compression: u32,

        #[structopt(short, long, help = "Replace files that are already archived")]
        replace: bool,

        #[structopt(parse(from_os_str), help = "Path to the .mpq archive")]
        archive: PathBuf,

        #[structopt(parse(from_os_str), required = true, help = "Files to add")]
        files: Vec<PathBuf>,
    },

    #[structopt(about = "Remove files from an archive")]
    Rm {
        #[structopt(parse(from_os_str), help = "Path to the .mpq archive")]
        archive: PathBuf,

        #[structopt(required = true, help = "Archived names to remove")]
        names: Vec<String>,
    },

    #[structopt(about = "Rebuild an archive without unused space")]
    Compact {
        #[structopt(parse(from_os_str), help = "Path to the .mpq archive")]
        archive: PathBuf,

        #[structopt(long, parse(from_os_str), help = "List file naming the archived files")]
        listfile: Option<PathBuf>,
    },
}

impl Commands {
    /// Subcommand name, when it reads or writes archive files on disk.
    fn disk_command(&self) -> Option<&'static str> {
        match self {
            Commands::Serve | Commands::Run { .. } => None,
            Commands::List { .. } => Some("list"),
            Commands::Cat { .. } => Some("cat"),
            Commands::Add { .. } => Some("add"),
            Commands::Rm { .. } => Some("rm"),
            Commands::Compact { .. } => Some("compact"),
        }
    }
}

/// The memory engine keeps its archives inside the process, so only the
/// request-driven commands make sense with it.
fn check_engine(kind: EngineKind, cmd: &Commands) -> Result<()> {
    match (kind, cmd.disk_command()) {
        (EngineKind::Memory, Some(name)) => Err(Error::NeedsDiskEngine(name)),
        _ => Ok(()),
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "mpq",
    about = "Open, read, write and enumerate MPQ archives.",
    settings = &[SubcommandRequiredElseHelp, DisableHelpSubcommand, VersionlessSubcommands]
)]
struct CliOpts {
    #[structopt(short, long, help = "Show verbose output", global = true)]
    verbose: bool,

    #[structopt(
        long,
        parse(try_from_str = parse_engine),
        default_value = DEFAULT_ENGINE,
        help = "Archive engine: memory or stormlib",
        global = true
    )]
    engine: EngineKind,

    #[structopt(subcommand)]
    cmd: Commands,
}

fn main() -> anyhow::Result<()> {
    let opts = CliOpts::from_iter(wild::args_os());

    let default_level = if opts.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    check_engine(opts.engine, &opts.cmd)?;
    let bridge = Bridge::new(engine(opts.engine)?);
    tracing::debug!(engine = ?opts.engine, "engine ready");

    match opts.cmd {
        Commands::Serve => commands::serve(bridge)?,
        Commands::Run { script } => commands::run(bridge, &script)?,
        Commands::List { archive, mask } => commands::list(&bridge, &archive, &mask)?,
        Commands::Cat { archive, names } => commands::cat(&bridge, &archive, &names)?,
        Commands::Add {
            create,
            max_files,
            compression,
            replace,
            archive,
            files,
        } => commands::add(
            &bridge,
            &archive,
            &files,
            commands::AddOptions {
                create,
                max_files,
                compression,
                replace,
            },
        )?,
        Commands::Rm { archive, names } => commands::rm(&bridge, &archive, &names)?,
        Commands::Compact { archive, listfile } => {
            commands::compact(&bridge, &archive, listfile.as_deref())?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_names() {
        assert_eq!(parse_engine("memory").unwrap(), EngineKind::Memory);
        assert_eq!(parse_engine("stormlib").unwrap(), EngineKind::StormLib);
        assert!(matches!(
            parse_engine("storm"),
            Err(Error::UnknownEngine(name)) if name == "storm"
        ));
    }

    #[test]
    fn memory_engine_is_always_available() {
        assert!(engine(EngineKind::Memory).is_ok());
    }

    #[cfg(not(feature = "stormlib"))]
    #[test]
    fn stormlib_needs_the_feature() {
        assert!(matches!(
            engine(EngineKind::StormLib),
            Err(Error::EngineUnavailable("stormlib"))
        ));
    }

    #[test]
    fn memory_engine_refuses_disk_commands() {
        let opts = CliOpts::from_iter(&["mpq", "--engine", "memory", "a", "-c", "a.mpq", "x.txt"]);
        assert!(matches!(
            check_engine(opts.engine, &opts.cmd),
            Err(Error::NeedsDiskEngine("add"))
        ));

        let opts = CliOpts::from_iter(&["mpq", "--engine", "memory", "list", "a.mpq"]);
        assert!(matches!(
            check_engine(opts.engine, &opts.cmd),
            Err(Error::NeedsDiskEngine("list"))
        ));

        let opts = CliOpts::from_iter(&["mpq", "--engine", "memory", "serve"]);
        assert!(check_engine(opts.engine, &opts.cmd).is_ok());
        assert!(check_engine(EngineKind::StormLib, &Commands::Rm {
            archive: "a.mpq".into(),
            names: vec!["x".into()],
        })
        .is_ok());
    }

    #[test]
    fn cli_parses_add() {
        let opts = CliOpts::from_iter(&[
            "mpq", "--engine", "memory", "a", "-c", "-C", "bzip2", "out.mpq", "a.txt", "b.txt",
        ]);
        assert_eq!(opts.engine, EngineKind::Memory);
        match opts.cmd {
            Commands::Add {
                create,
                compression,
                files,
                ..
            } => {
                assert!(create);
                assert_eq!(compression, mpq_bridge::flags::compression::BZIP2);
                assert_eq!(files.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
