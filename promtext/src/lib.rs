//! `promtext` parses the Prometheus text exposition format
//!
//! A scrape payload goes in as one string, an ordered list of
//! [`MetricFamily`](crate::parser::MetricFamily) records comes out. Histogram
//! and summary families are collapsed into a single aggregate sample carrying
//! nested `buckets`/`quantiles` maps. Values stay raw strings (`NaN`, `+Inf`
//! and friends are the caller's problem), and sample timestamps are ignored.

#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

/// Classifies and tokenizes the lines of an exposition document
pub mod lexer;

/// Folds classified lines into metric families and reshapes histograms/summaries.
pub mod parser;


/// Indicates that a line of the exposition document violated the grammar
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParseError {
    /// Carries the offending line verbatim
    #[error("Invalid line: {0}")]
    InvalidLine(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parses an exposition document into a [`Vec`] of
/// [`MetricFamily`](crate::parser::MetricFamily) records, ordered as their
/// names first appear in the document.
pub fn parse(data: &str) -> Result<Vec<parser::MetricFamily>> {
    let tokens = lexer::exposition(data)?;
    let metric_families = parser::parse(tokens);
    Ok(metric_families)
}
