use std::{path::PathBuf, time::Duration};

use anyhow::{Result, anyhow};
use bulker_model::{DEFAULT_GRACE_PERIOD, InputSource, RunConfig};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "bulker",
    version,
    about = "Run a command-line tool in parallel over chunks of an input file"
)]
pub struct Cli {
    /// Tool catalog (TOML). Defaults to the first of ./config.toml,
    /// ~/.config/bulker/config.toml, ~/config.toml.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level directive, e.g. `debug` or `info,bulker_exec=trace`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: text, json or journald.
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a tool over the input file.
    Run(RunArgs),
    /// List the tools in the catalog.
    List,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Tool name from the catalog.
    pub tool: String,

    /// Arguments passed to every invocation. Put them after `--`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tool_args: Vec<String>,

    /// Input file, one entry per line; `-` reads standard input.
    #[arg(short, long)]
    pub input: String,

    /// Consolidated output file. An existing file is backed up first.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of tools running at once.
    #[arg(short = 't', long = "threads", default_value_t = 4)]
    pub workers: usize,

    /// Extra tool arguments, split with shell quoting: -e '--timeout 30'.
    #[arg(short = 'e', long = "extra-args", allow_hyphen_values = true)]
    pub extra_args: Vec<String>,

    /// Wordlist for tools whose template uses `{wordlist}`.
    #[arg(short, long)]
    pub wordlist: Option<PathBuf>,

    /// Seconds to wait for running tools after an interrupt.
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD.as_secs())]
    pub grace_secs: u64,

    /// Directory for chunk files and temporary outputs.
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Positional tool args followed by every split `-e` value.
    pub fn tool_args(&self) -> Result<Vec<String>> {
        let mut args = self.tool_args.clone();
        for raw in &self.extra_args {
            let split =
                shlex::split(raw).ok_or_else(|| anyhow!("unbalanced quotes in -e {raw:?}"))?;
            args.extend(split);
        }
        Ok(args)
    }

    pub fn to_config(&self) -> Result<RunConfig> {
        let mut cfg = RunConfig::new(
            self.tool.as_str(),
            InputSource::parse(&self.input),
            self.output.clone(),
        )
        .with_workers(self.workers)
        .with_args(self.tool_args()?)
        .with_grace_period(Duration::from_secs(self.grace_secs))
        .with_signals(true);
        if let Some(wordlist) = &self.wordlist {
            cfg = cfg.with_wordlist(wordlist.clone());
        }
        if let Some(dir) = &self.staging_dir {
            cfg = cfg.with_staging_dir(dir.clone());
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Run(args) => args,
            Command::List => panic!("expected run"),
        }
    }

    #[test]
    fn run_defaults() {
        let args = run_args(&["bulker", "run", "httpx", "-i", "in.txt", "-o", "out.txt"]);
        assert_eq!(args.tool, "httpx");
        assert_eq!(args.workers, 4);
        assert_eq!(args.grace_secs, 10);
        assert!(args.tool_args.is_empty());

        let cfg = args.to_config().unwrap();
        assert_eq!(cfg.input, InputSource::File(PathBuf::from("in.txt")));
        assert!(cfg.listen_for_signals);
        assert_eq!(cfg.grace_period, Duration::from_secs(10));
    }

    #[test]
    fn trailing_args_keep_their_dashes() {
        let args = run_args(&[
            "bulker", "run", "-i", "-", "-o", "out.txt", "-t", "8", "arjun", "--", "-oJ",
            "res.json", "--stable",
        ]);
        assert_eq!(args.tool, "arjun");
        assert_eq!(args.workers, 8);
        assert_eq!(args.tool_args, ["-oJ", "res.json", "--stable"]);
        assert_eq!(args.to_config().unwrap().input, InputSource::Stdin);
    }

    #[test]
    fn extra_args_split_with_quotes() {
        let args = run_args(&[
            "bulker",
            "run",
            "nuclei",
            "-i",
            "in.txt",
            "-o",
            "out.txt",
            "-e",
            "--timeout 30",
            "-e",
            "-H 'X-Token: a b'",
        ]);
        assert_eq!(
            args.tool_args().unwrap(),
            ["--timeout", "30", "-H", "X-Token: a b"]
        );
    }

    #[test]
    fn unbalanced_extra_args_are_rejected() {
        let args = run_args(&[
            "bulker", "run", "nuclei", "-i", "in.txt", "-o", "out.txt", "-e", "'open",
        ]);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn input_and_output_are_required() {
        assert!(Cli::try_parse_from(["bulker", "run", "httpx", "-o", "out.txt"]).is_err());
        assert!(Cli::try_parse_from(["bulker", "run", "httpx", "-i", "in.txt"]).is_err());
    }

    #[test]
    fn config_is_global() {
        let cli = Cli::try_parse_from(["bulker", "list", "-c", "tools.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("tools.toml")));
        assert!(matches!(cli.command, Command::List));
    }
}
