//! CLI argument parsing for a single export run.
//!
//! The CLI only gathers paths and flags; defaults that depend on the main
//! document are filled in by [`crate::workflow::ExportPlan`].
use clap::Parser;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "latexport",
    version,
    about = "Merge a multi-file LaTeX project into a single submission-ready zip",
    after_help = "Examples:\n  latexport                      Use the only .tex file in the current directory\n  latexport paper.tex -b         Ship .bib/.bst files instead of expanding the .bbl\n  latexport paper.tex -p \"--keep-comments\" -o submission.zip"
)]
pub struct ExportArgs {
    /// Main tex file (default: the only .tex file in the working directory)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Output zip (default: <main tex file>.merged.zip)
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Extra options passed to latexpand
    #[arg(short, long, value_name = "PARAMS", default_value = "", allow_hyphen_values = true)]
    pub params: String,

    /// Ship .bib/.bst files instead of expanding the bibliography from the .bbl file
    #[arg(short, long)]
    pub bibtex: bool,

    /// Config file (default: <main tex file>.ltxpconfig, created if missing)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Replace an existing output zip
    #[arg(long)]
    pub force: bool,

    /// Print a JSON summary of the archive on stdout
    #[arg(long)]
    pub json: bool,

    /// Emit debug-level logs (overridden by LATEXPORT_LOG)
    #[arg(long)]
    pub verbose: bool,
}
