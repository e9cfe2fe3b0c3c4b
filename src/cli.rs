//! Command-line options for the `patchcheck` binary

use std::path::PathBuf;

use crate::commands::HarnessCommand;
use crate::constants::HARNESS_CONFIG_FILE;

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Commands to issue one per frame; empty means run the automated catalog
    pub commands: Vec<HarnessCommand>,
    pub config_path: PathBuf,
    pub results_dir: Option<PathBuf>,
    pub keep_running: bool,
    pub help: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            config_path: PathBuf::from(HARNESS_CONFIG_FILE),
            results_dir: None,
            keep_running: false,
            help: false,
        }
    }
}

pub const USAGE: &str = "\
Usage: patchcheck [options]

With no --command, runs the automated test catalog and exits.

Options:
  --command <name[:value]>  Issue a named command (repeatable), e.g. midi-cc, float:0.25
  --config <path>           Harness config file (default config/harness.json)
  --results-dir <dir>       Directory for TestResults files
  --keep-running            Do not exit when done
  --help                    Show this message";

impl CliArgs {
    /// Parse arguments, excluding the program name
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut cli = Self::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--command" | "-c" => {
                    let value = value_of(args, i)?;
                    cli.commands.push(HarnessCommand::parse(value)?);
                    i += 1;
                }
                "--config" => {
                    cli.config_path = PathBuf::from(value_of(args, i)?);
                    i += 1;
                }
                "--results-dir" => {
                    cli.results_dir = Some(PathBuf::from(value_of(args, i)?));
                    i += 1;
                }
                "--keep-running" => cli.keep_running = true,
                "--help" | "-h" => cli.help = true,
                other => return Err(format!("Unknown argument '{}'", other)),
            }
            i += 1;
        }
        Ok(cli)
    }

    /// Commands to queue: the given ones, or a full automated run
    pub fn queued_commands(&self) -> Vec<HarnessCommand> {
        if self.commands.is_empty() {
            vec![HarnessCommand::RunAutomatedTests]
        } else {
            self.commands.clone()
        }
    }
}

fn value_of(args: &[String], i: usize) -> Result<&str, String> {
    args.get(i + 1)
        .map(|s| s.as_str())
        .ok_or_else(|| format!("{} needs a value", args[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_runs_catalog() {
        let cli = CliArgs::parse(&[]).unwrap();
        assert_eq!(cli.config_path, PathBuf::from("config/harness.json"));
        assert_eq!(cli.queued_commands(), vec![HarnessCommand::RunAutomatedTests]);
    }

    #[test]
    fn test_repeated_commands_keep_order() {
        let cli = CliArgs::parse(&args(&[
            "--command",
            "midi-cc",
            "--command",
            "float:0.25",
            "--results-dir",
            "out",
            "--keep-running",
        ]))
        .unwrap();
        assert_eq!(
            cli.queued_commands(),
            vec![HarnessCommand::MidiCc, HarnessCommand::Float(0.25)]
        );
        assert_eq!(cli.results_dir, Some(PathBuf::from("out")));
        assert!(cli.keep_running);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(CliArgs::parse(&args(&["--command"])).is_err());
        assert!(CliArgs::parse(&args(&["--command", "nope"])).is_err());
        assert!(CliArgs::parse(&args(&["--frobnicate"])).is_err());
    }
}
