//! External expansion of `\input`/`\include` into one merged text.
//!
//! The expansion tool is a black box: it gets the main file plus options and
//! prints the merged document on stdout. `LATEXPORT_EXPAND_COMMAND` swaps the
//! program (shell-word split) without changing how options are passed.
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const EXPAND_COMMAND_ENV: &str = "LATEXPORT_EXPAND_COMMAND";
const DEFAULT_PROGRAM: &str = "latexpand";

/// Produces the merged text for a main document.
pub trait Expander {
    fn expand(&self, main_file: &Path, options: &[String]) -> Result<String>;
}

/// Runs `latexpand` (or the configured replacement) as a child process.
#[derive(Debug, Clone)]
pub struct Latexpand {
    program: PathBuf,
    leading_args: Vec<String>,
}

impl Latexpand {
    /// Build from the environment override, falling back to `latexpand` on `PATH`.
    pub fn from_env() -> Result<Self> {
        let argv = match env::var(EXPAND_COMMAND_ENV) {
            Ok(raw) if !raw.trim().is_empty() => shell_words::split(&raw)
                .with_context(|| format!("parse {EXPAND_COMMAND_ENV}"))?,
            _ => vec![DEFAULT_PROGRAM.to_string()],
        };
        Self::from_argv(argv)
    }

    pub fn from_argv(mut argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(anyhow!("expansion command is empty"));
        }
        let name = argv.remove(0);
        let program = which::which(&name)
            .with_context(|| format!("find expansion command {name:?} (is latexpand installed?)"))?;
        Ok(Self {
            program,
            leading_args: argv,
        })
    }
}

impl Expander for Latexpand {
    fn expand(&self, main_file: &Path, options: &[String]) -> Result<String> {
        tracing::info!(
            program = %self.program.display(),
            main = %main_file.display(),
            options = ?options,
            "expanding document"
        );
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(options)
            .arg(main_file)
            .output()
            .with_context(|| format!("run {}", self.program.display()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = match stderr.trim() {
                "" => format!("status {}", output.status),
                trimmed => trimmed.to_string(),
            };
            return Err(anyhow!("{} failed: {detail}", self.program.display()));
        }
        String::from_utf8(output.stdout).context("expanded document is not valid UTF-8")
    }
}

/// Split the `--params` string the way a shell would.
pub fn split_params(raw: &str) -> Result<Vec<String>> {
    shell_words::split(raw).with_context(|| format!("parse expansion params {raw:?}"))
}
