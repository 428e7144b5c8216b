use crate::config::{StatsConfig, StopwordMode};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "of", "off", "on", "once", "only", "or",
    "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "would", "you", "your", "yours", "yourself", "yourselves",
];

pub fn words(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

#[derive(Debug, Clone)]
pub struct Ngrams {
    words: Vec<String>,
    n: usize,
    position: usize,
}

impl Iterator for Ngrams {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.n == 0 || self.position + self.n > self.words.len() {
            return None;
        }
        let window = self.words[self.position..self.position + self.n].join(" ");
        self.position += 1;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.n == 0 {
            0
        } else {
            (self.words.len() + 1).saturating_sub(self.position + self.n)
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Ngrams {}

pub fn tokenize(text: &str, n: usize) -> Ngrams {
    Ngrams {
        words: words(text),
        n,
        position: 0,
    }
}

pub fn filter_stopwords(ngram: &str, stopwords: &HashSet<String>, mode: StopwordMode) -> bool {
    match mode {
        StopwordMode::None => true,
        StopwordMode::AnyConstituent => !ngram.split(' ').any(|word| stopwords.contains(word)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct StopwordFilter {
    stopwords: HashSet<String>,
    stop_ngrams: HashSet<String>,
    mode: StopwordMode,
}

impl StopwordFilter {
    pub fn new(
        stopwords: impl IntoIterator<Item = String>,
        stop_ngrams: impl IntoIterator<Item = String>,
        mode: StopwordMode,
    ) -> Self {
        Self {
            stopwords: stopwords.into_iter().map(|w| w.to_lowercase()).collect(),
            stop_ngrams: stop_ngrams.into_iter().map(|w| w.to_lowercase()).collect(),
            mode,
        }
    }

    pub fn from_config(config: &StatsConfig) -> Self {
        let mut stopwords: Vec<String> = config.custom_stopwords.iter().cloned().collect();
        if config.use_default_stopwords {
            stopwords.extend(DEFAULT_STOPWORDS.iter().map(|w| w.to_string()));
        }
        Self::new(
            stopwords,
            config.custom_stop_ngrams.iter().cloned(),
            config.stopword_mode,
        )
    }

    pub fn keep(&self, ngram: &str) -> bool {
        !self.stop_ngrams.contains(ngram) && filter_stopwords(ngram, &self.stopwords, self.mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NgramCount {
    pub ngram: String,
    pub count: usize,
}

pub fn count<I>(ngrams: I) -> Vec<NgramCount>
where
    I: IntoIterator<Item = String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<NgramCount> = Vec::new();
    for ngram in ngrams {
        match index.get(&ngram) {
            Some(&at) => counts[at].count += 1,
            None => {
                index.insert(ngram.clone(), counts.len());
                counts.push(NgramCount { ngram, count: 1 });
            }
        }
    }
    // sort_by is stable, so equal counts stay in insertion order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn at_least(counts: Vec<NgramCount>, min_count: usize) -> Vec<NgramCount> {
    counts.into_iter().filter(|c| c.count >= min_count).collect()
}
