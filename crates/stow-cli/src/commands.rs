use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use colored::Colorize;
use stow_fs::materialize::is_scratch_dir;
use stow_fs::{human_size, read_file, read_os_file, OsFile, Store, StoreConfig};
use tracing::warn;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = store_config(&cli.store)?;
    let store = config
        .build()
        .with_context(|| format!("cannot open store at {}", config.root.display()))?;

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Put(args) => cmd_put(store.as_ref(), args, &mut out),
        Command::Get(args) => cmd_get(store.as_ref(), args, &mut out),
        Command::Stat(args) => cmd_stat(store.as_ref(), args, &mut out),
        Command::Rm(args) => cmd_rm(store.as_ref(), args, &mut out),
    }
}

/// `--config` file (if any) with the individual flags layered on top.
fn store_config(args: &StoreArgs) -> anyhow::Result<StoreConfig> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &args.root {
        config.root = root.clone();
    }
    if args.hash.is_some() {
        config.hash = args.hash;
    }
    if args.limit.is_some() {
        config.limit = args.limit;
    }
    config.unique |= args.unique;
    if let Some(access) = args.access {
        config.access = access;
    }
    if let Some(sub) = &args.sub {
        config.sub = Some(sub.clone());
    }
    Ok(config)
}

fn cmd_put(store: &dyn Store, args: PutArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let upload = if args.path == Path::new("-") {
        let Some(name) = args.name.as_deref() else {
            bail!("--name is required when reading from stdin");
        };
        read_file(name, io::stdin()).context("cannot read stdin")?
    } else {
        let name = match args.name {
            Some(name) => name,
            None => args
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .with_context(|| format!("cannot derive a name from {}", args.path.display()))?,
        };
        let file = OsFile::open(&args.path)
            .with_context(|| format!("cannot read {}", args.path.display()))?;
        read_os_file(&name, file)
    };

    // Large stdin uploads are spooled to a scratch directory we own.
    let scratch: Option<PathBuf> = upload
        .path()
        .and_then(Path::parent)
        .filter(|dir| is_scratch_dir(dir))
        .map(Path::to_path_buf);

    let result = store.put(upload);
    if let Some(dir) = scratch {
        if let Err(err) = fs::remove_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %err, "failed to remove upload scratch directory");
        }
    }

    let mut stored = result?;
    let info = stored.stat()?;
    stored.close()?;

    writeln!(
        out,
        "{} stored {} ({})",
        "✓".green().bold(),
        info.name.bold(),
        human_size(info.size)
    )?;
    Ok(())
}

fn cmd_get(store: &dyn Store, args: GetArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let mut file = store.open(&args.name)?;
    match &args.output {
        Some(path) => {
            let mut dst = fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let n = io::copy(&mut file, &mut dst)?;
            dst.sync_all()?;
            writeln!(
                out,
                "{} wrote {} to {} ({})",
                "✓".green().bold(),
                args.name.bold(),
                path.display(),
                human_size(n)
            )?;
        }
        None => {
            io::copy(&mut file, &mut *out)?;
            out.flush()?;
        }
    }
    file.close()?;
    Ok(())
}

fn cmd_stat(store: &dyn Store, args: StatArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let info = store.stat(&args.name)?;
    let modified: DateTime<Utc> = info.modified.into();

    writeln!(out, "{}", info.name.bold())?;
    writeln!(out, "  size:     {} ({})", info.size, human_size(info.size))?;
    writeln!(out, "  mode:     {:04o}", info.mode)?;
    writeln!(out, "  modified: {}", modified.to_rfc3339().cyan())?;
    if info.is_dir {
        writeln!(out, "  {}", "directory".yellow())?;
    }
    Ok(())
}

fn cmd_rm(store: &dyn Store, args: RmArgs, out: &mut impl Write) -> anyhow::Result<()> {
    store.remove(&args.name)?;
    writeln!(out, "{} removed {}", "✓".green().bold(), args.name.bold())?;
    Ok(())
}
