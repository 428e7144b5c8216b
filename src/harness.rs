use crate::pipeline::{ScrapeOptions, scrape_to_dir};
use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub config_path: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub records: usize,
    pub skipped: usize,
    pub files_compared: usize,
    pub identical: bool,
    pub mismatched: Vec<String>,
    pub digests: BTreeMap<String, String>,
}

pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    if options.out_dir.exists() {
        std::fs::remove_dir_all(&options.out_dir)?;
    }

    let first_dir = options.out_dir.join("run-1");
    let second_dir = options.out_dir.join("run-2");

    let first = scrape_to_dir(&ScrapeOptions {
        config_path: options.config_path.clone(),
        out_dir: first_dir.clone(),
    })?;
    scrape_to_dir(&ScrapeOptions {
        config_path: options.config_path.clone(),
        out_dir: second_dir.clone(),
    })?;

    let first_digests = digest_tree(&first_dir)?;
    let second_digests = digest_tree(&second_dir)?;

    let mut mismatched: Vec<String> = first_digests
        .iter()
        .filter(|(name, digest)| second_digests.get(*name) != Some(*digest))
        .map(|(name, _)| name.clone())
        .collect();
    mismatched.extend(
        second_digests
            .keys()
            .filter(|name| !first_digests.contains_key(*name))
            .cloned(),
    );

    Ok(HarnessReport {
        records: first.records,
        skipped: first.skipped.len(),
        files_compared: first_digests.len(),
        identical: mismatched.is_empty(),
        mismatched,
        digests: first_digests,
    })
}

fn digest_tree(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut digests = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .display()
            .to_string();
        digests.insert(relative, hex::encode(Sha256::digest(&bytes)));
    }
    Ok(digests)
}
