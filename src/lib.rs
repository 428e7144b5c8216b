pub mod config;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod harness;
pub mod listing;
pub mod model;
pub mod ngram;
pub mod pipeline;
pub mod record;
pub mod stats;
pub mod store;
pub mod themes;
