//! Workflow export step.
//!
//! The stages run in a fixed order over one owned [`MergedDocument`]:
//! expansion, class file, bibliography files, figures, `add` files, user
//! substitutions, and finally the document itself as the last archive entry.
//! Asset rewrites always happen before user substitutions.
use super::plan::ExportPlan;
use crate::archive::Archive;
use crate::assets::{flatten, relocate, AssetReference, ExtensionFilter};
use crate::config::{load_or_create, ExportConfig};
use crate::document::MergedDocument;
use crate::expand::Expander;
use crate::references::{
    extract_bibliography, extract_bibliography_style, extract_document_class, extract_graphics,
    split_bibliography_list,
};
use crate::util::{display_path, file_name_str};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Machine-readable record of what went into the archive.
#[derive(Debug, Serialize)]
pub struct ExportSummary {
    pub main_file: String,
    pub output: String,
    pub entries: Vec<String>,
    pub assets: Vec<AssetReference>,
    /// References left untouched because the file is not bundled (standard class or style).
    pub skipped: Vec<String>,
    pub substitutions: usize,
}

/// Archive contents plus the summary of how they were produced.
#[derive(Debug)]
pub struct ExportOutcome {
    pub archive: Archive,
    pub summary: ExportSummary,
}

/// Load config, expand, relocate assets, substitute, and assemble the archive in memory.
pub fn build_archive(
    plan: &ExportPlan,
    config: &ExportConfig,
    expander: &dyn Expander,
) -> Result<ExportOutcome> {
    let options = plan.expansion_options(&config.args)?;
    let merged = expander
        .expand(&plan.main_file, &options)
        .with_context(|| format!("expand {}", plan.main_file.display()))?;
    let mut document = MergedDocument::new(merged);

    let class = extract_document_class(document.as_str())?;
    let graphics = extract_graphics(document.as_str());
    let (bib_data, bib_styles) = if plan.bibtex {
        let data = extract_bibliography(document.as_str())
            .iter()
            .flat_map(|arg| split_bibliography_list(arg))
            .collect::<Vec<_>>();
        (data, extract_bibliography_style(document.as_str()))
    } else {
        (Vec::new(), Vec::new())
    };

    let mut stage = Stage {
        main_file: &plan.main_file,
        document: &mut document,
        archive: Archive::new(),
        assets: Vec::new(),
        skipped: Vec::new(),
    };

    stage.optional(&class, ExtensionFilter::Class)?;
    for bib in unique(&bib_data) {
        stage.required(bib, ExtensionFilter::BibData, "")?;
    }
    for bst in unique(&bib_styles) {
        stage.optional(bst, ExtensionFilter::BibStyle)?;
    }
    for (idx, figure) in unique(&graphics).enumerate() {
        stage.required(figure, ExtensionFilter::Any, &format!("fig{}_", idx + 1))?;
    }
    for add in &config.add_files {
        stage.required(add, ExtensionFilter::Any, "")?;
    }

    let Stage {
        mut archive,
        assets,
        skipped,
        ..
    } = stage;

    document
        .apply_substitutions(&config.replacements)
        .context("apply config replacements")?;

    let main_name = file_name_str(&plan.main_file)?.to_string();
    archive.insert(main_name, document.into_string().into_bytes())?;

    let summary = ExportSummary {
        main_file: plan.main_file.display().to_string(),
        output: plan.out.display().to_string(),
        entries: archive.names().map(str::to_string).collect(),
        assets,
        skipped,
        substitutions: config.replacements.len(),
    };
    Ok(ExportOutcome { archive, summary })
}

/// Run a full export for `plan`, writing the zip only after every stage succeeded.
pub fn run_export(plan: &ExportPlan, expander: &dyn Expander, json: bool) -> Result<()> {
    plan.check_output()?;
    let config = load_or_create(&plan.config_path)?;
    for message in &config.echoes {
        if json {
            eprintln!("{message}");
        } else {
            println!("{message}");
        }
    }

    let outcome = build_archive(plan, &config, expander)?;
    outcome.archive.write_zip(&plan.out)?;

    if json {
        let text = serde_json::to_string_pretty(&outcome.summary)?;
        println!("{text}");
    } else {
        println!(
            "Wrote {} ({} entries) to {}",
            outcome.summary.main_file,
            outcome.archive.len(),
            plan.out.display()
        );
    }
    Ok(())
}

struct Stage<'a> {
    main_file: &'a Path,
    document: &'a mut MergedDocument,
    archive: Archive,
    assets: Vec<AssetReference>,
    skipped: Vec<String>,
}

impl Stage<'_> {
    /// Relocate a reference whose absence fails the run.
    fn required(&mut self, reference: &str, filter: ExtensionFilter, prefix: &str) -> Result<()> {
        let asset = relocate(self.document, reference, self.main_file, filter, prefix)
            .with_context(|| format!("resolve {reference:?}"))?;
        self.store(asset)
    }

    /// Relocate a reference that may name a file the TeX installation provides.
    fn optional(&mut self, reference: &str, filter: ExtensionFilter) -> Result<()> {
        match relocate(self.document, reference, self.main_file, filter, "") {
            Ok(asset) => self.store(asset),
            Err(err) if err.is_asset_missing() => {
                tracing::warn!(reference, "not bundled; assuming the TeX installation provides it");
                flatten(self.document, reference);
                self.skipped.push(reference.to_string());
                Ok(())
            }
            Err(err) => Err(anyhow::Error::from(err).context(format!("resolve {reference:?}"))),
        }
    }

    fn store(&mut self, asset: AssetReference) -> Result<()> {
        let base = self.main_file.parent();
        tracing::debug!(
            source = %display_path(&asset.resolved, base),
            entry = %asset.archive_name,
            "bundling asset"
        );
        self.archive
            .insert_file(&asset.archive_name, &asset.resolved)
            .with_context(|| format!("bundle {}", asset.original))?;
        self.assets.push(asset);
        Ok(())
    }
}

/// References in first-seen order, each once.
fn unique(references: &[String]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    references
        .iter()
        .map(String::as_str)
        .filter(move |reference| seen.insert(*reference))
}

#[cfg(test)]
#[path = "export_tests.rs"]
mod tests;
