use crate::dataset::{LONG_COLUMNS, LongDataset, WideDataset};
use crate::model::RunReport;
use crate::stats::StatsReport;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

pub const WIDE_CSV: &str = "panels_wide.csv";
pub const WIDE_BIN: &str = "panels_wide.bin";
pub const LONG_CSV: &str = "panels_long.csv";
pub const LONG_BIN: &str = "panels_long.bin";
pub const REPORT_JSON: &str = "run_report.json";
pub const FREQUENCY_CSV: &str = "ngram_frequency.csv";
pub const TFIDF_CSV: &str = "ngram_tfidf.csv";

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    ensure_parent(path)?;
    csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_order(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_wide_csv(path: &Path, wide: &WideDataset) -> Result<()> {
    wide.check_widths()?;
    let mut writer = csv_writer(path)?;
    writer.write_record(wide.columns())?;
    for row in &wide.rows {
        let mut record = vec![row.id.clone(), row.title.clone()];
        record.extend(row.organizers.iter().map(opt));
        record.push(row.posted.clone());
        record.push(row.description.clone());
        record.extend(row.keywords.iter().map(opt));
        record.extend(row.themes.iter().map(opt));
        record.push(row.has_unseparated_suffix.to_string());
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_long_csv(path: &Path, long: &LongDataset) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer.write_record(LONG_COLUMNS)?;
    for row in &long.rows {
        writer.write_record([
            row.id.clone(),
            row.title.clone(),
            opt_order(row.organizer_order),
            opt(&row.organizer),
            opt_order(row.keyword_order),
            opt(&row.keyword),
            opt_order(row.theme_order),
            opt(&row.theme),
            row.description.clone(),
            row.posted.clone(),
            row.has_unseparated_suffix.to_string(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_binary<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let encoded = bincode::serialize(value)
        .with_context(|| format!("failed to encode {}", path.display()))?;
    std::fs::write(path, encoded).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn read_binary<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value = bincode::deserialize(&bytes)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(value)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let serialized = serde_json::to_string_pretty(value)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn write_scrape_artifacts(
    dir: &Path,
    wide: &WideDataset,
    long: &LongDataset,
    report: &RunReport,
) -> Result<Vec<PathBuf>> {
    let paths = vec![
        dir.join(WIDE_CSV),
        dir.join(WIDE_BIN),
        dir.join(LONG_CSV),
        dir.join(LONG_BIN),
        dir.join(REPORT_JSON),
    ];
    write_wide_csv(&paths[0], wide)?;
    write_binary(&paths[1], wide)?;
    write_long_csv(&paths[2], long)?;
    write_binary(&paths[3], long)?;
    write_json(&paths[4], report)?;
    Ok(paths)
}

pub fn write_stats_artifacts(dir: &Path, report: &StatsReport) -> Result<Vec<PathBuf>> {
    let frequency_path = dir.join(FREQUENCY_CSV);
    let mut writer = csv_writer(&frequency_path)?;
    writer.write_record(["group", "ngram", "count"])?;
    for group in &report.groups {
        for c in &group.frequencies {
            writer.write_record([group.group.clone(), c.ngram.clone(), c.count.to_string()])?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", frequency_path.display()))?;

    let tfidf_path = dir.join(TFIDF_CSV);
    let mut writer = csv_writer(&tfidf_path)?;
    writer.write_record(["group", "document", "ngram", "count", "tf", "idf", "tf_idf"])?;
    for group in &report.groups {
        for row in &group.tfidf {
            writer.write_record([
                group.group.clone(),
                row.document.clone(),
                row.ngram.clone(),
                row.count.to_string(),
                format!("{:.6}", row.tf),
                format!("{:.6}", row.idf),
                format!("{:.6}", row.tf_idf),
            ])?;
        }
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", tfidf_path.display()))?;

    Ok(vec![frequency_path, tfidf_path])
}
