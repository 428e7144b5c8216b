use anyhow::Result;
use panelcorpus::config::{GroupBy, load_config};
use panelcorpus::fetch::page_source_for;
use panelcorpus::harness::{HarnessOptions, run_harness};
use panelcorpus::pipeline::{
    ScrapeOptions, StatsOptions, ValidateOptions, compute_stats, run_scrape, scrape_to_dir,
    validate_config,
};
use panelcorpus::store::{
    FREQUENCY_CSV, LONG_BIN, LONG_CSV, REPORT_JSON, TFIDF_CSV, WIDE_BIN, WIDE_CSV,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

#[test]
fn scrape_collects_records_and_skips_broken_pages() -> Result<()> {
    let env = setup_fixture_env()?;
    let loaded = load_config(&env.config_path)?;
    let source = page_source_for(&loaded)?;

    let outcome = run_scrape(&loaded, source.as_ref())?;
    let report = &outcome.report;

    assert_eq!(report.listing_pages, 2);
    assert_eq!(report.listing_entries, 5);
    assert_eq!(report.detail_urls, 6);
    assert_eq!(report.records, 2);
    assert_eq!(report.theme_pages, 2);
    assert_eq!(report.theme_members, 5);
    assert_eq!(report.documents_fetched, 10);

    assert_eq!(report.skipped.len(), 5);
    assert_eq!(report.skipped_of_kind("malformed_page"), 3);
    assert_eq!(report.skipped_of_kind("id_mismatch"), 1);
    assert_eq!(report.skipped_of_kind("fetch"), 1);
    assert!(
        report
            .skipped
            .iter()
            .any(|s| s.kind == "fetch" && s.url.contains("047-never-saved"))
    );

    let ids: Vec<&str> = outcome.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["042", "043"]);

    let gender = &outcome.records[0];
    assert_eq!(gender.title, "Gender and Technology");
    assert_eq!(gender.organizers, vec!["Jane Doe", "John Smith"]);
    assert_eq!(gender.posted, "2019-05-13");
    assert_eq!(gender.description, "Foo bar baz. The global south matters.");
    assert_eq!(gender.keywords, vec!["alpha", "beta"]);
    assert!(!gender.has_unseparated_suffix);

    let data = &outcome.records[1];
    assert_eq!(data.posted, "2019-05-02");
    assert_eq!(data.keywords, vec!["data", "colonialism", "global south"]);
    assert!(data.has_unseparated_suffix);

    let labels = |id: &str| -> Vec<String> {
        outcome
            .membership
            .get(id)
            .map(|labels| labels.to_vec())
            .unwrap_or_default()
    };
    assert_eq!(labels("042"), vec!["Gender", "Data"], "menu order");
    assert_eq!(labels("043"), vec!["Data"]);
    assert_eq!(labels("045"), vec!["Gender"]);

    assert_eq!(outcome.wide.rows.len(), 2);
    assert_eq!(outcome.wide.organizer_width, 2);
    assert_eq!(outcome.wide.keyword_width, 3);
    assert_eq!(outcome.wide.theme_width, 2);
    assert_eq!(outcome.long.rows.len(), 8 + 3);

    Ok(())
}

#[test]
fn scrape_writes_every_artifact() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = scrape_to_dir(&ScrapeOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
    })?;
    assert_eq!(report.records, 2);

    let site_dir = env.out_dir.join("test-panels");
    for name in [WIDE_CSV, WIDE_BIN, LONG_CSV, LONG_BIN, REPORT_JSON] {
        assert!(site_dir.join(name).exists(), "{name} missing");
    }

    let wide = fs::read_to_string(site_dir.join(WIDE_CSV))?;
    assert!(wide.contains("042,Gender and Technology,Jane Doe,John Smith,2019-05-13"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(site_dir.join(REPORT_JSON))?)?;
    assert_eq!(json["site_key"], "test.panels");
    assert_eq!(json["skipped"].as_array().map(Vec::len), Some(5));

    Ok(())
}

#[test]
fn stats_read_the_scraped_long_dataset() -> Result<()> {
    let env = setup_fixture_env()?;
    scrape_to_dir(&ScrapeOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
    })?;

    let report = compute_stats(&StatsOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
        ..StatsOptions::default()
    })?;

    assert_eq!(report.n, 2);
    assert_eq!(report.groups.len(), 1);
    let all = &report.groups[0];
    assert_eq!(all.documents, 2);
    let global_south = all
        .frequencies
        .iter()
        .find(|c| c.ngram == "global south")
        .map(|c| c.count);
    assert_eq!(global_south, Some(3));
    assert!(
        all.tfidf
            .iter()
            .filter(|row| row.ngram == "global south")
            .all(|row| row.tf_idf == 0.0)
    );

    let site_dir = env.out_dir.join("test-panels");
    assert!(site_dir.join(FREQUENCY_CSV).exists());
    assert!(site_dir.join(TFIDF_CSV).exists());

    let by_theme = compute_stats(&StatsOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
        group_by: Some(GroupBy::Theme),
        n: Some(1),
        ..StatsOptions::default()
    })?;
    let groups: Vec<(&str, usize)> = by_theme
        .groups
        .iter()
        .map(|g| (g.group.as_str(), g.documents))
        .collect();
    assert_eq!(groups, vec![("Data", 2), ("Gender", 1)]);

    Ok(())
}

#[test]
fn stats_reject_zero_ngram_size() -> Result<()> {
    let env = setup_fixture_env()?;
    scrape_to_dir(&ScrapeOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
    })?;

    let result = compute_stats(&StatsOptions {
        config_path: env.config_path.clone(),
        out_dir: env.out_dir.clone(),
        n: Some(0),
        ..StatsOptions::default()
    });
    assert!(result.is_err());
    Ok(())
}

#[test]
fn validate_accepts_fixture_config() -> Result<()> {
    let env = setup_fixture_env()?;
    let messages = validate_config(&ValidateOptions {
        config_path: env.config_path.clone(),
    })?;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("OK: test.panels"));
    Ok(())
}

#[test]
fn harness_reports_identical_runs() -> Result<()> {
    let env = setup_fixture_env()?;

    let report = run_harness(&HarnessOptions {
        config_path: env.config_path,
        out_dir: env.out_dir,
    })?;

    assert!(report.identical, "mismatched: {:?}", report.mismatched);
    assert_eq!(report.records, 2);
    assert_eq!(report.skipped, 5);
    assert_eq!(report.files_compared, 5);

    Ok(())
}

struct FixtureEnv {
    config_path: PathBuf,
    out_dir: PathBuf,
}

fn setup_fixture_env() -> Result<FixtureEnv> {
    let temp = tempdir()?;
    let root = temp.keep();

    let fixture_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    copy_dir(&fixture_root, &root.join("fixtures"))?;

    Ok(FixtureEnv {
        config_path: root.join("fixtures").join("panels.toml"),
        out_dir: root.join("out"),
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&src_path, &dst_path)?;
        } else {
            fs::copy(src_path, dst_path)?;
        }
    }

    Ok(())
}
