use super::*;
use crate::config::parse_config;
use crate::error::PackError;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

/// Returns canned merged text and records the options it was called with.
struct CannedExpander {
    text: String,
    calls: RefCell<Vec<Vec<String>>>,
}

impl CannedExpander {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl Expander for CannedExpander {
    fn expand(&self, _main_file: &Path, options: &[String]) -> Result<String> {
        self.calls.borrow_mut().push(options.to_vec());
        Ok(self.text.clone())
    }
}

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp project");
        let root = dir.path().to_path_buf();
        Self { _dir: dir, root }
    }

    fn touch(&self, rel: &str) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, rel.as_bytes()).expect("write file");
    }

    fn plan(&self, bibtex: bool) -> ExportPlan {
        let main_file = self.root.join("main.tex");
        ExportPlan {
            out: main_file.with_extension("merged.zip"),
            config_path: main_file.with_extension("ltxpconfig"),
            main_file,
            params: Vec::new(),
            bibtex,
            force: false,
        }
    }
}

fn config(text: &str) -> ExportConfig {
    ExportConfig::from_rules(parse_config(text).expect("parse config"))
}

fn main_text(outcome: &ExportOutcome) -> String {
    let bytes = outcome.archive.get("main.tex").expect("main entry");
    String::from_utf8(bytes.to_vec()).expect("utf-8 main entry")
}

#[test]
fn single_figure_is_renamed_and_rewritten() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("imgs/plot.png");
    let expander = CannedExpander::new(
        "\\documentclass{article}\n\\begin{document}\n\\includegraphics{imgs/plot.png}\n\\end{document}\n",
    );

    let outcome =
        build_archive(&project.plan(false), &ExportConfig::default(), &expander).expect("export");

    let text = main_text(&outcome);
    assert!(text.contains(r"\includegraphics{fig1_plot.png}"));
    assert!(!text.contains("imgs/plot.png"));
    assert_eq!(outcome.summary.entries, vec!["fig1_plot.png", "main.tex"]);
    assert_eq!(outcome.summary.skipped, vec!["article"]);
    assert_eq!(
        outcome.archive.get("fig1_plot.png"),
        Some("imgs/plot.png".as_bytes())
    );
}

#[test]
fn bbl_is_passed_to_expander_outside_bibtex_mode() {
    let project = Project::new();
    project.touch("main.bbl");
    let expander = CannedExpander::new(r"\documentclass{article}");

    build_archive(&project.plan(false), &config("args --keep-comments\n"), &expander)
        .expect("export");

    let calls = expander.calls.borrow();
    assert_eq!(
        calls[0],
        vec![
            "--keep-comments".to_string(),
            "--expand-bbl".to_string(),
            project.root.join("main.bbl").display().to_string(),
        ]
    );
}

#[test]
fn entries_follow_pipeline_order() {
    let project = Project::new();
    project.touch("cls/mystyle.cls");
    project.touch("refs.bib");
    project.touch("sty/journal.bst");
    project.touch("figs/a.pdf");
    project.touch("figs/b.png");
    project.touch("extra/cover letter.pdf");
    let expander = CannedExpander::new(
        r"\documentclass[final]{cls/mystyle}
\includegraphics{figs/a}
\includegraphics[scale=0.5]{figs/b.png}
\includegraphics{figs/a}
\bibliographystyle{sty/journal}
\bibliography{refs}
",
    );

    let outcome = build_archive(
        &project.plan(true),
        &config("add extra/cover\\ letter.pdf\n"),
        &expander,
    )
    .expect("export");

    assert_eq!(
        outcome.summary.entries,
        vec![
            "mystyle.cls",
            "refs.bib",
            "journal.bst",
            "fig1_a.pdf",
            "fig2_b.png",
            "cover letter.pdf",
            "main.tex",
        ]
    );
    let text = main_text(&outcome);
    assert!(text.starts_with(r"\documentclass[final]{mystyle}"));
    assert_eq!(text.matches(r"\includegraphics{fig1_a}").count(), 2);
    assert!(text.contains(r"\includegraphics[scale=0.5]{fig2_b.png}"));
    assert!(text.contains(r"\bibliographystyle{journal}"));
    assert!(text.contains(r"\bibliography{refs}"));
}

#[test]
fn same_basename_figures_do_not_collide() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("left/x.png");
    project.touch("right/x.png");
    let expander = CannedExpander::new(
        r"\documentclass{article}\includegraphics{left/x.png}\includegraphics{right/x.png}",
    );

    let outcome =
        build_archive(&project.plan(false), &ExportConfig::default(), &expander).expect("export");

    assert_eq!(
        outcome.summary.entries,
        vec!["fig1_x.png", "fig2_x.png", "main.tex"]
    );
    assert_eq!(outcome.archive.get("fig2_x.png"), Some("right/x.png".as_bytes()));
}

#[test]
fn missing_bib_fails_but_missing_bst_does_not() {
    let project = Project::new();
    let expander = CannedExpander::new(
        r"\documentclass{article}\bibliographystyle{plainnat}\bibliography{refs}",
    );

    let err = build_archive(&project.plan(true), &ExportConfig::default(), &expander)
        .expect_err("missing bib");
    let pack = err.downcast_ref::<PackError>().expect("typed cause");
    assert!(pack.is_asset_missing());

    project.touch("refs.bib");
    let outcome = build_archive(&project.plan(true), &ExportConfig::default(), &expander)
        .expect("export with bib");
    assert_eq!(outcome.summary.skipped, vec!["article", "plainnat"]);
    assert_eq!(outcome.summary.entries, vec!["refs.bib", "main.tex"]);
}

#[test]
fn bibliography_is_ignored_outside_bibtex_mode() {
    let project = Project::new();
    project.touch("main.bbl");
    let expander = CannedExpander::new(r"\documentclass{article}\bibliography{refs}");

    let outcome =
        build_archive(&project.plan(false), &ExportConfig::default(), &expander).expect("export");
    assert_eq!(outcome.summary.entries, vec!["main.tex"]);
}

#[test]
fn bibliography_lists_resolve_each_database() {
    let project = Project::new();
    project.touch("refs.bib");
    project.touch("data/more.bib");
    let expander = CannedExpander::new(r"\documentclass{article}\bibliography{refs, data/more}");

    let outcome =
        build_archive(&project.plan(true), &ExportConfig::default(), &expander).expect("export");
    assert_eq!(
        outcome.summary.entries,
        vec!["refs.bib", "more.bib", "main.tex"]
    );
    assert!(main_text(&outcome).contains(r"\bibliography{refs, more}"));
}

#[test]
fn missing_document_class_is_fatal() {
    let project = Project::new();
    project.touch("main.bbl");
    let expander = CannedExpander::new(r"\begin{document}\end{document}");

    let err = build_archive(&project.plan(false), &ExportConfig::default(), &expander)
        .expect_err("no class");
    assert!(matches!(
        err.downcast_ref::<PackError>(),
        Some(PackError::NotFound { .. })
    ));
}

#[test]
fn class_extension_goes_on_archive_name_only() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("mystyle.cls");
    let expander = CannedExpander::new(r"\documentclass{mystyle}");

    let outcome =
        build_archive(&project.plan(false), &ExportConfig::default(), &expander).expect("export");
    assert_eq!(outcome.summary.entries, vec!["mystyle.cls", "main.tex"]);
    assert_eq!(outcome.summary.assets[0].rewritten, "mystyle");
    assert_eq!(main_text(&outcome), r"\documentclass{mystyle}");
}

#[test]
fn ambiguous_figure_is_fatal() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("figs/p.png");
    project.touch("figs/p.eps");
    let expander = CannedExpander::new(r"\documentclass{article}\includegraphics{figs/p}");

    let err = build_archive(&project.plan(false), &ExportConfig::default(), &expander)
        .expect_err("ambiguous figure");
    assert!(matches!(
        err.downcast_ref::<PackError>(),
        Some(PackError::AmbiguousAsset { candidates, .. }) if candidates.len() == 2
    ));
}

#[test]
fn substitutions_run_after_asset_rewrites() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("imgs/plot.png");
    let expander = CannedExpander::new(
        "\\documentclass{article}\n\\includegraphics{imgs/plot.png}\nKeep \\deleted{remove this} more\n",
    );
    let rules = config(
        "replace \\\\deleted\\{\\c1c\\}\nreplace imgs/plot\\.png WRONG\nreplace fig1_(\\w+) fig1-\\1\n",
    );

    let outcome = build_archive(&project.plan(false), &rules, &expander).expect("export");

    let text = main_text(&outcome);
    assert!(text.contains("Keep  more"));
    assert!(!text.contains("WRONG"));
    assert!(text.contains(r"\includegraphics{fig1-plot.png}"));
    assert_eq!(outcome.summary.substitutions, 3);
}

#[test]
fn bad_substitution_aborts_without_output() {
    let project = Project::new();
    project.touch("main.bbl");
    let plan = project.plan(false);
    fs::write(&plan.config_path, "replace (?P<a>x) \\g<b>\n").expect("write config");
    let expander = CannedExpander::new(r"\documentclass{article} x");

    let err = run_export(&plan, &expander, false).expect_err("bad rule");
    assert!(matches!(
        err.downcast_ref::<PackError>(),
        Some(PackError::SubstitutionError { .. })
    ));
    assert!(!plan.out.exists());
}

#[test]
fn add_files_with_same_basename_collide() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("a/notes.txt");
    project.touch("b/notes.txt");
    let expander = CannedExpander::new(r"\documentclass{article}");

    let err = build_archive(
        &project.plan(false),
        &config("add a/notes.txt\nadd b/notes.txt\n"),
        &expander,
    )
    .expect_err("duplicate");
    assert!(matches!(
        err.downcast_ref::<PackError>(),
        Some(PackError::DuplicateEntry(name)) if name == "notes.txt"
    ));
}

#[test]
fn run_export_writes_zip_and_sample_config() {
    let project = Project::new();
    project.touch("main.bbl");
    project.touch("imgs/plot.png");
    let plan = project.plan(false);
    let expander = CannedExpander::new(r"\documentclass{article}\includegraphics{imgs/plot}");

    run_export(&plan, &expander, true).expect("export");

    assert!(plan.config_path.is_file());
    let file = fs::File::open(&plan.out).expect("open zip");
    let zip = zip::ZipArchive::new(file).expect("read zip");
    let names: Vec<&str> = zip.file_names().collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"fig1_plot.png"));
    assert!(names.contains(&"main.tex"));

    let err = run_export(&plan, &expander, false).expect_err("output exists");
    assert!(err.to_string().contains("--force"));
}

#[test]
fn unbundled_class_and_style_still_use_flat_names() {
    let project = Project::new();
    project.touch("refs.bib");
    let expander = CannedExpander::new(
        r"\documentclass{styles/aastex631}\bibliographystyle{bst/aasjournal}\bibliography{refs}",
    );

    let outcome =
        build_archive(&project.plan(true), &ExportConfig::default(), &expander).expect("export");

    assert_eq!(
        outcome.summary.skipped,
        vec!["styles/aastex631", "bst/aasjournal"]
    );
    assert_eq!(
        main_text(&outcome),
        r"\documentclass{aastex631}\bibliographystyle{aasjournal}\bibliography{refs}"
    );
    assert_eq!(outcome.summary.entries, vec!["refs.bib", "main.tex"]);
}
