// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Command line of the renderer process.

use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(
    name = "fxbridge-server",
    about = "Renders a page into a named shared segment and feeds it host input",
    disable_help_flag = true
)]
struct Cli {
    /// Name of the shared segment to create or delete.
    #[arg(short = 'n', long, value_name = "NAME")]
    name: Option<String>,

    /// Content to load at startup.
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Delete the named segment and exit.
    #[arg(short = 'd', long)]
    delete: bool,

    /// JSON configuration file.
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Input tick period in milliseconds.
    #[arg(long = "tick-ms", value_name = "MS")]
    tick_ms: Option<u64>,

    /// Print this help.
    #[arg(short = 'h', long, action = ArgAction::SetTrue)]
    help: bool,
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub name: String,
    pub url: Option<String>,
    pub delete: bool,
    pub config: Option<PathBuf>,
    pub tick_ms: Option<u64>,
}

/// The command line cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    #[error("help requested")]
    Help,
    #[error("{0}")]
    Parse(String),
    #[error("a segment name is required (-n/--name)")]
    MissingName,
}

/// Parses `args`, the first item being the program name.
pub fn parse_from<I, T>(args: I) -> Result<Invocation, ArgsError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|e| ArgsError::Parse(e.to_string()))?;
    if cli.help {
        return Err(ArgsError::Help);
    }

    let name = cli
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or(ArgsError::MissingName)?;

    Ok(Invocation {
        name,
        url: cli.url,
        delete: cli.delete,
        config: cli.config,
        tick_ms: cli.tick_ms,
    })
}

/// The usage text.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_forms_parse() {
        let short = parse_from(["fxbridge-server", "-n", "view", "-d"]).unwrap();
        let long = parse_from(["fxbridge-server", "--name", "view", "--delete"]).unwrap();
        assert_eq!(short, long);
        assert_eq!(short.name, "view");
        assert!(short.delete);
    }

    #[test]
    fn optional_flags_are_carried_through() {
        let invocation = parse_from([
            "fxbridge-server",
            "--name=/view",
            "--url",
            "https://example.org",
            "-c",
            "bridge.json",
            "--tick-ms",
            "16",
        ])
        .unwrap();

        assert_eq!(invocation.url.as_deref(), Some("https://example.org"));
        assert_eq!(invocation.config, Some(PathBuf::from("bridge.json")));
        assert_eq!(invocation.tick_ms, Some(16));
        assert!(!invocation.delete);
    }

    #[test]
    fn help_wins_over_everything_else() {
        assert_eq!(parse_from(["fxbridge-server", "-h"]), Err(ArgsError::Help));
        assert_eq!(
            parse_from(["fxbridge-server", "-n", "view", "--help"]),
            Err(ArgsError::Help)
        );
    }

    #[test]
    fn name_is_required() {
        assert_eq!(parse_from(["fxbridge-server"]), Err(ArgsError::MissingName));
        assert_eq!(
            parse_from(["fxbridge-server", "--name", " "]),
            Err(ArgsError::MissingName)
        );
    }

    #[test]
    fn malformed_flags_are_rejected() {
        assert!(matches!(
            parse_from(["fxbridge-server", "-n", "view", "--bogus"]),
            Err(ArgsError::Parse(_))
        ));
        assert!(matches!(
            parse_from(["fxbridge-server", "-n", "view", "--tick-ms", "soon"]),
            Err(ArgsError::Parse(_))
        ));
    }

    #[test]
    fn usage_lists_the_flags() {
        let text = usage();
        for flag in ["--name", "--url", "--delete", "--config", "--tick-ms", "--help"] {
            assert!(text.contains(flag), "usage is missing {flag}");
        }
    }
}
