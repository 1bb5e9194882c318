use anyhow::Result;
use margin_config::Config;
use margin_engine::{FilePageStorage, io};
use std::{env, path::PathBuf, process};

mod browse;
mod commands;

use commands::Command;

const USAGE: &str = "\
Usage: margin-cli [--pages <dir>] <command>

Commands:
  browse                             Browse pages in a terminal UI
  list                               List pages, most recently updated first
  new <title>                        Create an empty page
  show <id>                          Print a page's blocks with their flat offsets
  delete <id>                        Delete a page
  share <id>                         Make a page public and print its share token
  unshare <id>                       Make a page private again
  shared <token>                     Print the public page behind a share token
  select <id> <block> <start> <end>  Map an in-block selection to a flat range";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (pages_arg, rest) = match split_pages_arg(&args) {
        Ok(split) => split,
        Err(message) => usage_error(&message),
    };
    let command = match Command::parse(&rest) {
        Ok(command) => command,
        Err(message) => usage_error(&message),
    };

    // Determine pages path from CLI args or config file
    let config_path = Config::config_path();
    let (pages_path, from_config) = match pages_arg {
        Some(path) => (path, false),
        None => match Config::load() {
            Ok(Some(config)) => (config.pages_path, true),
            Ok(None) => {
                eprintln!("Error: No pages path provided and no config file found");
                eprintln!("Pass --pages <dir> or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                process::exit(1);
            }
        },
    };

    let mut storage = if command.creates_pages_dir() {
        FilePageStorage::create(&pages_path)?
    } else {
        if let Err(e) = io::validate_pages_dir(&pages_path) {
            let source = if from_config {
                format!(" from config file '{}'", config_path.display())
            } else {
                String::new()
            };
            eprintln!(
                "Error: Pages path '{}'{} is invalid: {e}",
                pages_path.display(),
                source
            );
            process::exit(1);
        }
        FilePageStorage::open(&pages_path)?
    };

    if let Command::Browse = command {
        return browse::run(&storage);
    }
    commands::run(command, &mut storage, &mut std::io::stdout().lock())
}

/// Pull `--pages <dir>` out of the argument list
fn split_pages_arg(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>), String> {
    let mut pages = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--pages" {
            let dir = iter.next().ok_or("--pages needs a directory")?;
            pages = Some(PathBuf::from(dir));
        } else {
            rest.push(arg.clone());
        }
    }
    Ok((pages, rest))
}

fn usage_error(message: &str) -> ! {
    eprintln!("Error: {message}\n");
    eprintln!("{USAGE}");
    process::exit(2);
}
