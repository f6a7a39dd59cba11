//! Workflow plan step.
//!
//! Planning fills in every default that depends on the main document so the
//! export step only deals with concrete paths.
use crate::cli::ExportArgs;
use crate::expand::split_params;
use crate::util::normalize;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const BBL_OPTION: &str = "--expand-bbl";

/// Concrete inputs for one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub main_file: PathBuf,
    pub out: PathBuf,
    pub config_path: PathBuf,
    pub params: Vec<String>,
    pub bibtex: bool,
    pub force: bool,
}

impl ExportPlan {
    /// Resolve CLI arguments against `cwd`.
    pub fn from_args(args: &ExportArgs, cwd: &Path) -> Result<Self> {
        let main_file = match &args.file {
            Some(file) => file.clone(),
            None => detect_main_file(cwd)?,
        };
        let out = args
            .out
            .clone()
            .unwrap_or_else(|| main_file.with_extension("merged.zip"));
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| main_file.with_extension("ltxpconfig"));
        Ok(Self {
            main_file,
            out,
            config_path,
            params: split_params(&args.params)?,
            bibtex: args.bibtex,
            force: args.force,
        })
    }

    /// Refuse to clobber an existing archive unless `--force` was given.
    pub fn check_output(&self) -> Result<()> {
        if self.out.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                self.out.display()
            ));
        }
        Ok(())
    }

    /// Options for the expansion tool: `--params`, then config `args`, then
    /// the `.bbl` expansion unless bibtex mode is on or it was already given.
    pub fn expansion_options(&self, config_args: &[String]) -> Result<Vec<String>> {
        let mut options = self.params.clone();
        options.extend(config_args.iter().cloned());
        let has_bbl = options
            .iter()
            .any(|opt| opt == BBL_OPTION || opt.starts_with(&format!("{BBL_OPTION}=")));
        if !self.bibtex && !has_bbl {
            let bbl = self.main_file.with_extension("bbl");
            if !bbl.is_file() {
                return Err(anyhow!(
                    "{} not found; pass --bibtex, pass -p \"{BBL_OPTION} BBLFILE\", or generate the bbl file",
                    bbl.display()
                ));
            }
            options.push(BBL_OPTION.to_string());
            options.push(bbl.display().to_string());
        }
        Ok(options)
    }
}

/// Pick the only `.tex` file in `dir`.
fn detect_main_file(dir: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tex") {
            candidates.push(path);
        }
    }
    candidates.sort();
    match candidates.as_slice() {
        [only] => Ok(normalize(only)),
        [] => Err(anyhow!(
            "no .tex file in {}; pass the main tex file",
            dir.display()
        )),
        many => Err(anyhow!(
            "{} .tex files in {}; pass the main tex file",
            many.len(),
            dir.display()
        )),
    }
}
