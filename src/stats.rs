use crate::config::{GroupBy, StatsConfig, StopwordMode};
use crate::dataset::LongDataset;
use crate::error::ScrapeError;
use crate::ngram::{NgramCount, StopwordFilter, at_least, count, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone)]
struct DocumentCounts {
    id: String,
    ngrams: Vec<String>,
    counts: Vec<NgramCount>,
    lookup: HashMap<String, usize>,
}

impl DocumentCounts {
    fn new(id: String, ngrams: Vec<String>) -> Self {
        let counts = count(ngrams.iter().cloned());
        let lookup = counts
            .iter()
            .map(|c| (c.ngram.clone(), c.count))
            .collect();
        Self {
            id,
            ngrams,
            counts,
            lookup,
        }
    }

    fn total(&self) -> usize {
        self.ngrams.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfRow {
    pub document: String,
    pub ngram: String,
    pub count: usize,
    pub tf: f64,
    pub idf: f64,
    pub tf_idf: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<DocumentCounts>,
    positions: HashMap<String, usize>,
    document_frequency: HashMap<String, usize>,
}

impl Corpus {
    pub fn build<'a, I>(documents: I, n: usize, filter: &StopwordFilter) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut order: Vec<String> = Vec::new();
        let mut collected: HashMap<String, Vec<String>> = HashMap::new();
        for (id, text) in documents {
            let bucket = collected.entry(id.to_string()).or_insert_with(|| {
                order.push(id.to_string());
                Vec::new()
            });
            bucket.extend(tokenize(text, n).filter(|ngram| filter.keep(ngram)));
        }

        let mut corpus = Corpus::default();
        for id in order {
            let ngrams = collected.remove(&id).unwrap_or_default();
            let doc = DocumentCounts::new(id.clone(), ngrams);
            for c in &doc.counts {
                *corpus.document_frequency.entry(c.ngram.clone()).or_default() += 1;
            }
            corpus.positions.insert(id, corpus.documents.len());
            corpus.documents.push(doc);
        }
        corpus
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document_ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.id.as_str())
    }

    fn document(&self, doc_id: &str) -> Result<&DocumentCounts, ScrapeError> {
        self.positions
            .get(doc_id)
            .map(|&at| &self.documents[at])
            .ok_or_else(|| ScrapeError::UnknownDocument(doc_id.to_string()))
    }

    pub fn counts(&self, doc_id: &str) -> Result<&[NgramCount], ScrapeError> {
        Ok(&self.document(doc_id)?.counts)
    }

    pub fn documents_containing(&self, ngram: &str) -> usize {
        self.document_frequency.get(ngram).copied().unwrap_or(0)
    }

    pub fn term_frequency(&self, doc_id: &str, ngram: &str) -> Result<f64, ScrapeError> {
        if self.documents_containing(ngram) == 0 {
            return Err(ScrapeError::UnseenNgram(ngram.to_string()));
        }
        let doc = self.document(doc_id)?;
        match doc.lookup.get(ngram) {
            Some(&raw) => Ok(raw as f64 / doc.total() as f64),
            None => Ok(0.0),
        }
    }

    pub fn inverse_document_frequency(&self, ngram: &str) -> Result<f64, ScrapeError> {
        let containing = self.documents_containing(ngram);
        if containing == 0 {
            return Err(ScrapeError::UnseenNgram(ngram.to_string()));
        }
        Ok((self.len() as f64 / containing as f64).ln())
    }

    pub fn tfidf(&self, doc_id: &str, ngram: &str) -> Result<f64, ScrapeError> {
        Ok(self.term_frequency(doc_id, ngram)? * self.inverse_document_frequency(ngram)?)
    }

    pub fn frequencies(&self) -> Vec<NgramCount> {
        count(
            self.documents
                .iter()
                .flat_map(|doc| doc.ngrams.iter().cloned()),
        )
    }

    pub fn tfidf_rows(&self) -> Vec<TfIdfRow> {
        let n_docs = self.len() as f64;
        let mut rows = Vec::new();
        for doc in &self.documents {
            let total = doc.total() as f64;
            for c in &doc.counts {
                let containing = self.documents_containing(&c.ngram) as f64;
                let tf = c.count as f64 / total;
                let idf = (n_docs / containing).ln();
                rows.push(TfIdfRow {
                    document: doc.id.clone(),
                    ngram: c.ngram.clone(),
                    count: c.count,
                    tf,
                    idf,
                    tf_idf: tf * idf,
                });
            }
        }
        rows.sort_by(|a, b| b.tf_idf.total_cmp(&a.tf_idf));
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentGroup {
    pub name: String,
    pub documents: Vec<(String, String)>,
}

pub const UNGROUPED: &str = "all";

pub fn group_documents(long: &LongDataset, group_by: GroupBy) -> Vec<DocumentGroup> {
    if group_by == GroupBy::None {
        let mut seen = HashSet::new();
        let documents = long
            .rows
            .iter()
            .filter(|row| seen.insert(row.id.as_str()))
            .map(|row| (row.id.clone(), row.description.clone()))
            .collect();
        return vec![DocumentGroup {
            name: UNGROUPED.to_string(),
            documents,
        }];
    }

    // long rows repeat a description per family combination; count each (group, id) once
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut groups: BTreeMap<&str, Vec<(String, String)>> = BTreeMap::new();
    for row in &long.rows {
        let key = match group_by {
            GroupBy::Theme => row.theme.as_deref(),
            GroupBy::Organizer => row.organizer.as_deref(),
            GroupBy::None => None,
        };
        let Some(key) = key else {
            continue;
        };
        if seen.insert((key, row.id.as_str())) {
            groups
                .entry(key)
                .or_default()
                .push((row.id.clone(), row.description.clone()));
        }
    }

    groups
        .into_iter()
        .map(|(name, documents)| DocumentGroup {
            name: name.to_string(),
            documents,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupStats {
    pub group: String,
    pub documents: usize,
    pub frequencies: Vec<NgramCount>,
    pub tfidf: Vec<TfIdfRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub n: usize,
    pub stopword_mode: StopwordMode,
    pub group_by: GroupBy,
    pub min_count: usize,
    pub top_n: usize,
    pub groups: Vec<GroupStats>,
}

pub fn analyze(long: &LongDataset, config: &StatsConfig) -> StatsReport {
    let filter = StopwordFilter::from_config(config);
    let groups = group_documents(long, config.group_by)
        .into_iter()
        .map(|group| {
            let corpus = Corpus::build(
                group
                    .documents
                    .iter()
                    .map(|(id, text)| (id.as_str(), text.as_str())),
                config.n,
                &filter,
            );
            GroupStats {
                group: group.name,
                documents: corpus.len(),
                frequencies: at_least(corpus.frequencies(), config.min_count),
                tfidf: corpus.tfidf_rows(),
            }
        })
        .collect();

    StatsReport {
        n: config.n,
        stopword_mode: config.stopword_mode,
        group_by: config.group_by,
        min_count: config.min_count,
        top_n: config.top_n,
        groups,
    }
}
