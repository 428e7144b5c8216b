use anyhow::Result;
use panelcorpus::config::{GroupBy, StatsConfig, StopwordMode};
use panelcorpus::dataset::{build_wide, to_long};
use panelcorpus::error::ScrapeError;
use panelcorpus::model::{PanelRecord, ThemeMembership};
use panelcorpus::ngram::{StopwordFilter, count, filter_stopwords, tokenize};
use panelcorpus::stats::{Corpus, UNGROUPED, analyze, group_documents};
use std::collections::HashSet;

fn no_filter() -> StopwordFilter {
    StopwordFilter::new(Vec::<String>::new(), Vec::<String>::new(), StopwordMode::None)
}

fn record(id: &str, organizers: &[&str], description: &str) -> PanelRecord {
    PanelRecord {
        id: id.to_string(),
        title: format!("Panel {id}"),
        organizers: organizers.iter().map(|s| s.to_string()).collect(),
        posted: String::new(),
        description: description.to_string(),
        keywords: vec!["k1".to_string(), "k2".to_string()],
        themes: Vec::new(),
        has_unseparated_suffix: false,
    }
}

#[test]
fn tokenize_yields_overlapping_lowercase_windows() {
    let bigrams: Vec<String> = tokenize("The Global-South, matters!", 2).collect();
    assert_eq!(bigrams, vec!["the global", "global south", "south matters"]);

    let unigrams = tokenize("Ünïcode wörds here", 1);
    assert_eq!(unigrams.len(), 3);

    assert_eq!(tokenize("too short", 3).count(), 0);
    assert_eq!(tokenize("anything", 0).count(), 0);
}

#[test]
fn tokenize_is_restartable() {
    let text = "we study the global south";
    let first: Vec<String> = tokenize(text, 2).collect();
    let second: Vec<String> = tokenize(text, 2).collect();
    assert_eq!(first, second);
}

#[test]
fn bigram_shared_by_two_documents_counts_twice() {
    let corpus = Corpus::build(
        [("a", "the global south matters"), ("b", "we study the global south")],
        2,
        &no_filter(),
    );

    let frequencies = corpus.frequencies();
    let global_south = frequencies
        .iter()
        .find(|c| c.ngram == "global south")
        .map(|c| c.count);
    assert_eq!(global_south, Some(2));
    assert_eq!(corpus.documents_containing("global south"), 2);
}

#[test]
fn ties_keep_first_seen_order() {
    let counts = count(
        ["zeta", "alpha", "zeta", "beta", "alpha", "gamma"]
            .into_iter()
            .map(String::from),
    );
    let order: Vec<(&str, usize)> = counts.iter().map(|c| (c.ngram.as_str(), c.count)).collect();
    assert_eq!(
        order,
        vec![("zeta", 2), ("alpha", 2), ("beta", 1), ("gamma", 1)]
    );
}

#[test]
fn ngram_in_every_document_has_zero_idf_and_tfidf() -> Result<()> {
    let corpus = Corpus::build(
        [
            ("a", "global south global south politics"),
            ("b", "the global south"),
            ("c", "global south rising"),
        ],
        2,
        &no_filter(),
    );

    assert_eq!(corpus.inverse_document_frequency("global south")?, 0.0);
    for doc in ["a", "b", "c"] {
        assert_eq!(corpus.tfidf(doc, "global south")?, 0.0);
    }
    assert!(corpus.tfidf("a", "south politics")? > 0.0);
    Ok(())
}

#[test]
fn tfidf_values_are_never_negative() {
    let corpus = Corpus::build(
        [
            ("a", "one two three one two"),
            ("b", "two three four"),
            ("c", "four five six"),
        ],
        1,
        &no_filter(),
    );

    let rows = corpus.tfidf_rows();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|row| row.tf_idf >= 0.0 && row.idf >= 0.0));
    assert!(rows.windows(2).all(|w| w[0].tf_idf >= w[1].tf_idf));
}

#[test]
fn unseen_ngram_and_unknown_document_are_errors() -> Result<()> {
    let corpus = Corpus::build([("a", "global south")], 2, &no_filter());

    assert_eq!(
        corpus.tfidf("a", "north pole"),
        Err(ScrapeError::UnseenNgram("north pole".to_string()))
    );
    assert_eq!(
        corpus.term_frequency("zzz", "global south"),
        Err(ScrapeError::UnknownDocument("zzz".to_string()))
    );
    assert_eq!(corpus.term_frequency("a", "global south")?, 1.0);
    Ok(())
}

#[test]
fn absent_ngram_has_zero_term_frequency() -> Result<()> {
    let corpus = Corpus::build([("a", "global south"), ("b", "north pole")], 2, &no_filter());
    assert_eq!(corpus.term_frequency("b", "global south")?, 0.0);
    Ok(())
}

#[test]
fn duplicate_document_ids_are_merged() -> Result<()> {
    let corpus = Corpus::build([("a", "alpha beta"), ("a", "alpha gamma")], 1, &no_filter());

    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.document_ids().collect::<Vec<_>>(), vec!["a"]);
    let alpha = corpus.counts("a")?.iter().find(|c| c.ngram == "alpha").map(|c| c.count);
    assert_eq!(alpha, Some(2));
    Ok(())
}

#[test]
fn stopword_modes_trade_phrases_for_noise() {
    let stopwords: HashSet<String> = ["of".to_string()].into_iter().collect();

    assert!(!filter_stopwords(
        "state of exception",
        &stopwords,
        StopwordMode::AnyConstituent
    ));
    assert!(filter_stopwords("state of exception", &stopwords, StopwordMode::None));
    assert!(filter_stopwords(
        "state exception",
        &stopwords,
        StopwordMode::AnyConstituent
    ));
}

#[test]
fn stop_ngrams_apply_in_every_mode() {
    let filter = StopwordFilter::new(
        Vec::<String>::new(),
        vec!["Global South".to_string()],
        StopwordMode::None,
    );
    assert!(!filter.keep("global south"));
    assert!(filter.keep("the global"));
}

#[test]
fn default_stopwords_are_opt_in() {
    let mut config = StatsConfig::default();
    assert!(StopwordFilter::from_config(&config).keep("the"));

    config.use_default_stopwords = true;
    assert!(!StopwordFilter::from_config(&config).keep("the"));
    assert!(StopwordFilter::from_config(&config).keep("south"));
}

#[test]
fn grouping_by_theme_partitions_distinct_documents() {
    let records = vec![
        record("042", &["Jane Doe", "John Smith"], "the global south matters"),
        record("043", &["Ana Silva"], "we study the global south"),
        record("044", &["Lee Park"], "no theme at all"),
    ];
    let mut themes = ThemeMembership::new();
    themes.insert(
        "042".to_string(),
        ["Data", "Gender"].iter().map(|s| s.to_string()).collect(),
    );
    themes.insert(
        "043".to_string(),
        ["Data"].iter().map(|s| s.to_string()).collect(),
    );
    let long = to_long(&build_wide(&records, &themes));

    let all = group_documents(&long, GroupBy::None);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, UNGROUPED);
    assert_eq!(all[0].documents.len(), 3);

    let by_theme = group_documents(&long, GroupBy::Theme);
    let shape: Vec<(&str, usize)> = by_theme
        .iter()
        .map(|g| (g.name.as_str(), g.documents.len()))
        .collect();
    assert_eq!(shape, vec![("Data", 2), ("Gender", 1)]);

    let config = StatsConfig {
        n: 2,
        stopword_mode: StopwordMode::None,
        group_by: GroupBy::Theme,
        ..StatsConfig::default()
    };
    let report = analyze(&long, &config);
    let data = &report.groups[0];
    assert_eq!(data.group, "Data");
    let global_south = data
        .frequencies
        .iter()
        .find(|c| c.ngram == "global south")
        .map(|c| c.count);
    assert_eq!(global_south, Some(2), "cross-join duplicates are not counted");
}

#[test]
fn min_count_trims_frequencies() {
    let records = vec![
        record("042", &["Jane Doe"], "the global south matters"),
        record("043", &["Ana Silva"], "we study the global south"),
    ];
    let long = to_long(&build_wide(&records, &ThemeMembership::new()));
    let config = StatsConfig {
        n: 2,
        stopword_mode: StopwordMode::None,
        min_count: 2,
        ..StatsConfig::default()
    };

    let report = analyze(&long, &config);
    let kept: Vec<&str> = report.groups[0]
        .frequencies
        .iter()
        .map(|c| c.ngram.as_str())
        .collect();
    assert_eq!(kept, vec!["the global", "global south"]);
    assert_eq!(report.groups[0].tfidf.len(), 7);
}
