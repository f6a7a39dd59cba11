//! Shared test infrastructure for integration tests.

use std::env;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway LaTeX project that runs the real binary with a fake expander.
pub struct Project {
    _temp: TempDir,
    pub root: PathBuf,
}

/// Exit status and captured streams of one `latexport` run.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
}

impl Project {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp project");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> &Self {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write project file");
        self
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Where the fake expander records the arguments it received.
    pub fn expand_log(&self) -> PathBuf {
        self.root.join("expand-args.log")
    }

    /// Run `latexport` inside the project with the given arguments.
    pub fn run(&self, args: &[&str]) -> RunResult {
        let script = manifest_dir().join("tests/fake-latexpand.sh");
        let command = shell_words::join(["sh", script.to_string_lossy().as_ref()]);
        Command::new(env!("CARGO_BIN_EXE_latexport"))
            .args(args)
            .current_dir(&self.root)
            .env("LATEXPORT_EXPAND_COMMAND", command)
            .env("FAKE_EXPAND_LOG", self.expand_log())
            .env_remove("LATEXPORT_LOG")
            .output()
            .expect("spawn latexport")
            .into()
    }

    /// Entry names and contents of the zip at `rel`, in archive order.
    pub fn read_zip(&self, rel: &str) -> Vec<(String, Vec<u8>)> {
        read_zip(&self.path(rel))
    }
}

pub fn read_zip(path: &Path) -> Vec<(String, Vec<u8>)> {
    let file = fs::File::open(path).expect("open zip");
    let mut zip = zip::ZipArchive::new(file).expect("read zip");
    (0..zip.len())
        .map(|idx| {
            let mut entry = zip.by_index(idx).expect("zip entry");
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).expect("read entry");
            (entry.name().to_string(), bytes)
        })
        .collect()
}
