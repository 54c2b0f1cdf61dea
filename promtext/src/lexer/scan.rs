#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use std::collections::BTreeMap;
use std::mem;

use crate::{ParseError, Result};

use super::RawSample;

/// Scanner states for one sample line.
///
/// The transition function below is total over this enum, so adding a state
/// without handling it fails to compile.
#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Name,
    EndOfName,
    StartOfLabelName,
    LabelName,
    LabelValueEquals,
    LabelValueQuote,
    LabelValue,
    LabelValueSlash,
    NextLabel,
    EndOfLabels,
    Value,
}

/// Scans `name{label="value",...} value` into a [`RawSample`].
///
/// Running out of line in the middle of a construct yields a sample with an
/// empty value rather than an error; only an out-of-grammar character in the
/// strict label states aborts. The first whitespace after the value token
/// ends the scan, discarding any trailing timestamp.
#[tracing::instrument]
pub(super) fn sample_line(line: &str) -> Result<RawSample> {
    let mut name = String::new();
    let mut labelname = String::new();
    let mut labelvalue = String::new();
    let mut value = String::new();
    let mut labels = None;
    let mut state = State::Name;

    for ch in line.chars() {
        match state {
            State::Name => match ch {
                '{' => state = State::StartOfLabelName,
                ' ' | '\t' => state = State::EndOfName,
                _ => name.push(ch),
            },
            State::EndOfName => match ch {
                ' ' | '\t' => {}
                '{' => state = State::StartOfLabelName,
                _ => {
                    value.push(ch);
                    state = State::Value;
                }
            },
            State::StartOfLabelName => match ch {
                ' ' | '\t' => {}
                '}' => state = State::EndOfLabels,
                _ => {
                    labelname.push(ch);
                    state = State::LabelName;
                }
            },
            State::LabelName => match ch {
                '=' => state = State::LabelValueQuote,
                '}' => state = State::EndOfLabels,
                // space before the `=` is tolerated
                ' ' | '\t' => state = State::LabelValueEquals,
                _ => labelname.push(ch),
            },
            State::LabelValueEquals => match ch {
                '=' => state = State::LabelValueQuote,
                ' ' | '\t' => {}
                _ => return Err(ParseError::InvalidLine(line.to_owned())),
            },
            State::LabelValueQuote => match ch {
                '"' => state = State::LabelValue,
                ' ' | '\t' => {}
                _ => return Err(ParseError::InvalidLine(line.to_owned())),
            },
            State::LabelValue => match ch {
                '\\' => state = State::LabelValueSlash,
                '"' => {
                    labels
                        .get_or_insert_with(BTreeMap::new)
                        .insert(mem::take(&mut labelname), mem::take(&mut labelvalue));
                    state = State::NextLabel;
                }
                _ => labelvalue.push(ch),
            },
            State::LabelValueSlash => {
                state = State::LabelValue;
                match ch {
                    '\\' => labelvalue.push('\\'),
                    'n' => labelvalue.push('\n'),
                    '"' => labelvalue.push('"'),
                    other => {
                        labelvalue.push('\\');
                        labelvalue.push(other);
                    }
                }
            }
            State::NextLabel => match ch {
                ',' => state = State::LabelName,
                '}' => state = State::EndOfLabels,
                ' ' | '\t' => {}
                _ => return Err(ParseError::InvalidLine(line.to_owned())),
            },
            State::EndOfLabels => match ch {
                ' ' | '\t' => {}
                _ => {
                    value.push(ch);
                    state = State::Value;
                }
            },
            State::Value => match ch {
                // timestamps are not supported, drop the rest of the line
                ' ' | '\t' => break,
                _ => value.push(ch),
            },
        }
    }

    trace!(%name, %value, "scanned sample line");

    Ok(RawSample {
        name,
        value,
        labels,
    })
}
