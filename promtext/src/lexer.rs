#[allow(unused)]
use tracing::{debug, error, info, span, trace, warn, Instrument, Level};

use std::borrow::Cow;
use std::collections::BTreeMap;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    combinator::{cut, eof, map, rest, value},
    sequence::{terminated, tuple},
    IResult,
};

use crate::{ParseError, Result};

mod scan;

/// One classified line of an exposition document.
#[derive(Clone, Debug, PartialEq)]
pub enum LineToken<'a> {
    Blank,
    Comment,
    Help {
        metric: &'a str,
        text: Cow<'a, str>,
    },
    Type {
        metric: &'a str,
        token: &'a str,
    },
    Sample(RawSample),
}

/// Tokenizer output for a single sample line.
///
/// Transient: the parser consumes it immediately and never retains it. The
/// value is the raw token as written (`NaN`, `+Inf`, `1.7e9`, ...); `labels`
/// is present only if at least one pair was scanned.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawSample {
    pub name: String,
    pub value: String,
    pub labels: Option<BTreeMap<String, String>>,
}

/// ```text
/// # HELP <metricname> <escaped help text>
/// ```
/// The help text runs to the end of the line and may contain spaces.
fn help_directive<'a>(input: &'a str) -> IResult<&'a str, LineToken<'a>> {
    map(
        tuple((tag("HELP "), take_while(|c| c != ' '), tag(" "), rest)),
        |(_, metric, _, text)| LineToken::Help {
            metric,
            text: unescape_help(text),
        },
    )(input)
}

/// ```text
/// # TYPE <metricname> <type>
/// ```
/// A type token with an embedded space is a hard parse failure, not a comment.
fn type_directive<'a>(input: &'a str) -> IResult<&'a str, LineToken<'a>> {
    map(
        tuple((
            tag("TYPE "),
            take_while(|c| c != ' '),
            tag(" "),
            cut(terminated(take_while(|c| c != ' '), eof)),
        )),
        |(_, metric, _, token)| LineToken::Type { metric, token },
    )(input)
}

/// Anything after `# ` that isn't a well-formed HELP/TYPE directive is a
/// plain comment and carries no signal.
fn directive<'a>(input: &'a str) -> IResult<&'a str, LineToken<'a>> {
    alt((
        help_directive,
        type_directive,
        value(LineToken::Comment, rest),
    ))(input)
}

/// Classifies one trimmed line.
pub fn classify(line: &str) -> Result<LineToken<'_>> {
    if line.is_empty() {
        return Ok(LineToken::Blank);
    }

    if let Some(data) = line.strip_prefix("# ") {
        let (_, token) = directive(data).map_err(|_| ParseError::InvalidLine(line.to_owned()))?;
        return Ok(token);
    }

    // Everything else, including `#`-without-space lines, scans as a sample.
    scan::sample_line(line).map(LineToken::Sample)
}

/// Splits a document into trimmed, classified lines.
///
/// The format mandates line-feed termination; trimming each line also eats
/// any stray `\r`.
#[tracing::instrument(skip(input))]
pub fn exposition(input: &str) -> Result<Vec<LineToken<'_>>> {
    input.split('\n').map(|line| classify(line.trim())).collect()
}

/// Unescapes HELP text: `\\` and `\n` are rewritten, any other escape keeps
/// its backslash, and a dangling trailing backslash is preserved.
pub(crate) fn unescape_help(text: &str) -> Cow<'_, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len());
    let mut slash = false;
    for ch in text.chars() {
        if slash {
            match ch {
                '\\' => result.push('\\'),
                'n' => result.push('\n'),
                other => {
                    result.push('\\');
                    result.push(other);
                }
            }
            slash = false;
        } else if ch == '\\' {
            slash = true;
        } else {
            result.push(ch);
        }
    }
    if slash {
        result.push('\\');
    }

    Cow::Owned(result)
}
