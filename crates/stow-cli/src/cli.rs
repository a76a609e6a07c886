use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use stow_fs::{Access, Algorithm};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "stow",
    about = "Put files into a store and get them back",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Repeat for more detail (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Store chain options. Each one overrides the matching `--config` entry.
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// TOML file describing the store chain
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory backing the store
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
    /// Store files under their content digest (sha256, blake3)
    #[arg(long, global = true, value_parser = parse_algorithm)]
    pub hash: Option<Algorithm>,
    /// Maximum file size, e.g. 4096, 64K, 32M, 1G
    #[arg(long, global = true, value_parser = parse_size)]
    pub limit: Option<u64>,
    /// Refuse to overwrite existing files
    #[arg(long, global = true)]
    pub unique: bool,
    /// read-write, read-only or write-only
    #[arg(long, global = true, value_parser = parse_access)]
    pub access: Option<Access>,
    /// Scope every command to this sub-directory
    #[arg(long, global = true)]
    pub sub: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a local file (`-` reads stdin)
    Put(PutArgs),
    /// Copy a stored file to stdout or a local file
    Get(GetArgs),
    /// Show a stored file's metadata
    Stat(StatArgs),
    /// Remove a stored file
    Rm(RmArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub path: PathBuf,
    /// Name to store under; defaults to the file name of PATH
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: String,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatArgs {
    pub name: String,
}

#[derive(Args)]
pub struct RmArgs {
    pub name: String,
}

fn parse_algorithm(s: &str) -> Result<Algorithm, String> {
    s.parse().map_err(|e: stow_fs::Error| e.to_string())
}

fn parse_access(s: &str) -> Result<Access, String> {
    s.parse().map_err(|e: stow_fs::Error| e.to_string())
}

/// Byte count with an optional binary suffix (K, M, G, T).
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    let n: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size: {s:?}"))?;
    let shift = match suffix.to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KIB" => 10,
        "M" | "MB" | "MIB" => 20,
        "G" | "GB" | "GIB" => 30,
        "T" | "TB" | "TIB" => 40,
        _ => return Err(format!("invalid size suffix: {suffix:?}")),
    };
    n.checked_mul(1 << shift)
        .ok_or_else(|| format!("size out of range: {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_put() {
        let cli = Cli::try_parse_from(["stow", "put", "report.pdf"]).unwrap();
        let Command::Put(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.path, PathBuf::from("report.pdf"));
        assert!(args.name.is_none());
    }

    #[test]
    fn parse_put_stdin_with_name() {
        let cli = Cli::try_parse_from(["stow", "put", "-", "--name", "notes.txt"]).unwrap();
        let Command::Put(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.path, PathBuf::from("-"));
        assert_eq!(args.name, Some("notes.txt".into()));
    }

    #[test]
    fn parse_get_output() {
        let cli = Cli::try_parse_from(["stow", "get", "abc", "-o", "out.bin"]).unwrap();
        let Command::Get(args) = cli.command else {
            panic!("wrong command");
        };
        assert_eq!(args.name, "abc");
        assert_eq!(args.output, Some(PathBuf::from("out.bin")));
    }

    #[test]
    fn parse_stat_and_rm() {
        let cli = Cli::try_parse_from(["stow", "stat", "a"]).unwrap();
        assert!(matches!(cli.command, Command::Stat(_)));
        let cli = Cli::try_parse_from(["stow", "rm", "a"]).unwrap();
        assert!(matches!(cli.command, Command::Rm(_)));
    }

    #[test]
    fn parse_store_flags_anywhere() {
        let cli = Cli::try_parse_from([
            "stow", "--root", "/srv", "put", "f", "--hash", "blake3", "--limit", "32M",
            "--unique", "--access", "wo", "--sub", "avatars", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.store.root, Some(PathBuf::from("/srv")));
        assert_eq!(cli.store.hash, Some(Algorithm::Blake3));
        assert_eq!(cli.store.limit, Some(32 << 20));
        assert!(cli.store.unique);
        assert_eq!(cli.store.access, Some(Access::WriteOnly));
        assert_eq!(cli.store.sub, Some("avatars".into()));
        assert_eq!(cli.log_level(), Level::TRACE);
    }

    #[test]
    fn parse_rejects_unknown_hash() {
        assert!(Cli::try_parse_from(["stow", "--hash", "md5", "stat", "a"]).is_err());
    }

    #[test]
    fn default_log_level_is_warn() {
        let cli = Cli::try_parse_from(["stow", "stat", "a"]).unwrap();
        assert_eq!(cli.log_level(), Level::WARN);
        let cli = Cli::try_parse_from(["stow", "-v", "stat", "a"]).unwrap();
        assert_eq!(cli.log_level(), Level::DEBUG);
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size("4096"), Ok(4096));
        assert_eq!(parse_size("64K"), Ok(64 << 10));
        assert_eq!(parse_size("1gib"), Ok(1 << 30));
        assert_eq!(parse_size("2TB"), Ok(2 << 40));
        assert!(parse_size("").is_err());
        assert!(parse_size("12X").is_err());
        assert!(parse_size("99999999999T").is_err());
    }
}
