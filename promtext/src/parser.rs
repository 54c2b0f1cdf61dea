#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use std::collections::BTreeMap;
use std::mem;

use itertools::{Itertools, Position};
use serde_derive::Serialize;

use crate::lexer::{LineToken, RawSample};

/// A metric family: every sample sharing one base name, one HELP description,
/// and one TYPE.
#[derive(Debug, PartialEq, Serialize)]
pub struct MetricFamily {
    pub name: String,
    /// HELP text with its escapes resolved; empty if never declared.
    pub help: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub metrics: Vec<Sample>,
}

/// [`MetricFamily`] type. Defaults to `Untyped` when no TYPE line appeared.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricType {
    /// Counters only go up.
    Counter,
    /// Gauges are point-in-time measurements and may go down.
    Gauge,
    /// Summaries expose pre-computed quantiles next to a count and a sum.
    Summary,
    /// Histograms expose cumulative `le` buckets next to a count and a sum.
    Histogram,
    /// No TYPE declared, or the declared token wasn't one of the above.
    Untyped,
}

/// One observed sample, or, after reshaping a summary/histogram family, the
/// family's single aggregate record.
///
/// Values are the raw tokens from the document; numeric interpretation
/// (including `NaN`/`+Inf`/`-Inf`) is left to the caller.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Sample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantiles: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
struct Builder {
    name: Option<String>,
    help: Option<String>,
    metric_type: Option<MetricType>,
    samples: Vec<Sample>,
    families: Vec<MetricFamily>,
}

impl MetricType {
    /// Maps a TYPE directive's token, compared upper-cased; unrecognized
    /// tokens fall back to `Untyped`.
    fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "COUNTER" => Self::Counter,
            "GAUGE" => Self::Gauge,
            "SUMMARY" => Self::Summary,
            "HISTOGRAM" => Self::Histogram,
            _ => Self::Untyped,
        }
    }
}

impl Builder {
    fn line(&mut self, token: LineToken<'_>, last: bool) {
        let mut line_metric: Option<String> = None;
        let mut line_help: Option<String> = None;
        let mut line_type: Option<MetricType> = None;
        let mut line_sample: Option<RawSample> = None;

        match token {
            LineToken::Blank | LineToken::Comment => {}
            LineToken::Help { metric, text } => {
                line_metric = Some(metric.to_owned());
                line_help = Some(text.into_owned());
            }
            LineToken::Type { metric, token } => {
                line_metric = Some(metric.to_owned());
                line_type = Some(MetricType::from_token(token));
            }
            LineToken::Sample(sample) => {
                line_metric = Some(sample.name.clone());
                line_sample = Some(sample);
            }
        }

        // Metadata always names the family it describes. First occurrence
        // wins; a directive line carries either help or type, never both.
        if line_metric == self.name {
            if self.help.is_none() && line_help.as_deref().is_some_and(|help| !help.is_empty()) {
                self.help = line_help.clone();
            } else if self.metric_type.is_none() && line_type.is_some() {
                self.metric_type = line_type;
            }
        }

        // A new family starts on the document's last line or on a name
        // outside the current family's allowed set.
        let boundary = line_metric
            .as_deref()
            .is_some_and(|metric| !metric.is_empty() && !self.allows(metric));
        if last || boundary {
            self.finish_family();
            self.name = line_metric;
            self.help = line_help.filter(|help| !help.is_empty());
            self.metric_type = line_type;
            self.samples.clear();
        }

        if let Some(sample) = line_sample {
            self.push_sample(sample);
        }
    }

    /// Sample names admitted by the current family, given its declared type.
    fn allows(&self, line_metric: &str) -> bool {
        let Some(name) = self.name.as_deref() else {
            return false;
        };
        if line_metric == name {
            return true;
        }
        let Some(suffix) = line_metric.strip_prefix(name) else {
            return false;
        };
        match self.metric_type {
            Some(MetricType::Summary) => matches!(suffix, "_count" | "_sum"),
            Some(MetricType::Histogram) => matches!(suffix, "_count" | "_sum" | "_bucket"),
            _ => false,
        }
    }

    /// Files a tokenized sample under the current family: a suffixed name
    /// moves the value into the matching typed field (dropping the generic
    /// one), then adjacent samples with equal label sets are merged into a
    /// single record.
    fn push_sample(&mut self, sample: RawSample) {
        let RawSample {
            name,
            value,
            labels,
        } = sample;

        let mut sample = Sample {
            labels,
            ..Sample::default()
        };

        if self.name.as_deref() == Some(name.as_str()) {
            sample.value = Some(value);
        } else if let Some(family) = self.name.as_deref() {
            match (self.metric_type, name.strip_prefix(family)) {
                (Some(MetricType::Summary | MetricType::Histogram), Some("_count")) => {
                    sample.count = Some(value);
                }
                (Some(MetricType::Summary | MetricType::Histogram), Some("_sum")) => {
                    sample.sum = Some(value);
                }
                (Some(MetricType::Histogram), Some("_bucket")) => {
                    sample.bucket = Some(value);
                }
                _ => {}
            }
        }

        match self.samples.last_mut() {
            // label-set equality is shallow string comparison, absent and
            // empty label sets are distinct
            Some(last) if last.labels == sample.labels => {
                let Sample {
                    labels: _,
                    value,
                    count,
                    sum,
                    bucket,
                    quantiles: _,
                    buckets: _,
                } = sample;
                if let Some(value) = value {
                    last.value = Some(value);
                }
                if let Some(count) = count {
                    last.count = Some(count);
                }
                if let Some(sum) = sum {
                    last.sum = Some(sum);
                }
                if let Some(bucket) = bucket {
                    last.bucket = Some(bucket);
                }
            }
            _ => self.samples.push(sample),
        }
    }

    /// Closes the family under construction, reshaping summary/histogram
    /// samples into their aggregate form, and appends it to the output.
    fn finish_family(&mut self) {
        let Some(name) = self.name.take() else {
            return;
        };

        let metric_type = self.metric_type.take().unwrap_or(MetricType::Untyped);
        let samples = mem::take(&mut self.samples);
        let metrics = match metric_type {
            MetricType::Summary | MetricType::Histogram => flatten(samples, metric_type),
            _ => samples,
        };

        debug!(family = %name, ?metric_type, metrics = metrics.len(), "closing metric family");

        self.families.push(MetricFamily {
            name,
            help: self.help.take().unwrap_or_default(),
            metric_type,
            metrics,
        });
    }
}

/// Collapses a summary's per-quantile samples (or a histogram's per-bucket
/// samples) into one aggregate record with a nested map, picking up `count`
/// and `sum` from the unlabeled sample. Families with no qualifying samples
/// come back unchanged.
fn flatten(samples: Vec<Sample>, metric_type: MetricType) -> Vec<Sample> {
    let summary = match metric_type {
        MetricType::Summary => true,
        MetricType::Histogram => false,
        _ => return samples,
    };
    let key_label = if summary { "quantile" } else { "le" };

    let mut flattened: Option<Sample> = None;
    for sample in &samples {
        let key = sample
            .labels
            .as_ref()
            .and_then(|labels| labels.get(key_label))
            .filter(|key| !key.is_empty());
        let entry = if summary {
            sample.value.as_ref()
        } else {
            sample.bucket.as_ref()
        }
        .filter(|value| !value.is_empty());

        if let (Some(key), Some(entry)) = (key, entry) {
            let flat = flattened.get_or_insert_with(Sample::default);
            let group = if summary {
                flat.quantiles.get_or_insert_with(BTreeMap::new)
            } else {
                flat.buckets.get_or_insert_with(BTreeMap::new)
            };
            group.insert(key.clone(), entry.clone());
        } else if sample.labels.is_none() {
            if let (Some(count), Some(sum)) = (sample.count.as_ref(), sample.sum.as_ref()) {
                if !count.is_empty() && !sum.is_empty() {
                    let flat = flattened.get_or_insert_with(Sample::default);
                    flat.count = Some(count.clone());
                    flat.sum = Some(sum.clone());
                }
            }
        }
    }

    match flattened {
        Some(flat) => vec![flat],
        None => samples,
    }
}

/// Folds classified lines into finished metric families, in document order.
#[tracing::instrument(skip_all)]
pub fn parse(tokens: Vec<LineToken<'_>>) -> Vec<MetricFamily> {
    let mut builder = Builder::default();
    for position in tokens.into_iter().with_position() {
        let (token, last) = match position {
            Position::First(token) | Position::Middle(token) => (token, false),
            Position::Only(token) | Position::Last(token) => (token, true),
        };
        builder.line(token, last);
    }
    builder.families
}
