//! Operator splitting and command classification.
//!
//! A line is split in two fixed levels: `&&` outermost, then `;` inside each
//! `&&` chain. Splitting is purely lexical. Segments containing `|` are only
//! flagged here; they are broken into stages by [`split_pipeline`] right
//! before the pipeline is launched.

use crate::lexer;
use std::fmt;

/// Default ceiling on chains per line, segments per chain and stages per pipeline.
pub const MAX_SEGMENTS: usize = 10;

pub const AND_OPERATOR: &str = "&&";
pub const SEQUENCE_OPERATOR: &str = ";";
pub const PIPE_OPERATOR: &str = "|";

/// Kind of redirection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    /// `<`: the file replaces standard input and must already exist.
    Input,
    /// `>`: the file replaces standard output, created or truncated.
    Output,
    /// `>>`: the file replaces standard output, created or appended to.
    Append,
}

impl RedirectKind {
    /// Recognizes a redirection operator token. Only exact matches count.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(RedirectKind::Input),
            ">" => Some(RedirectKind::Output),
            ">>" => Some(RedirectKind::Append),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            RedirectKind::Input => "<",
            RedirectKind::Output => ">",
            RedirectKind::Append => ">>",
        }
    }
}

/// Redirection attached to a simple command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: String,
}

/// A classified, non-pipeline command.
///
/// `argv` never contains the redirection operator, its target, or anything
/// that followed them on the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleCommand {
    pub argv: Vec<String>,
    pub redirect: Option<Redirection>,
}

/// One command's text between sequencing operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Simple(String),
    /// Text still holding its `|` operators.
    Pipeline(String),
}

/// A whole input line split into `&&` chains of `;` segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub chains: Vec<Vec<Segment>>,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Ceilings applied while splitting and tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_tokens: usize,
    pub max_segments: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_tokens: lexer::MAX_TOKENS,
            max_segments: MAX_SEGMENTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    MissingRedirectTarget(RedirectKind),
    MissingCommand(RedirectKind),
    EmptyPipelineStage,
    TooManySegments { operator: &'static str, limit: usize },
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsingError::MissingRedirectTarget(kind) => write!(
                f,
                "redirection syntax error: missing filename after `{}`",
                kind.symbol()
            ),
            ParsingError::MissingCommand(kind) => write!(
                f,
                "redirection syntax error: missing command before `{}`",
                kind.symbol()
            ),
            ParsingError::EmptyPipelineStage => {
                write!(f, "syntax error: empty command in pipeline")
            }
            ParsingError::TooManySegments { operator, limit } => write!(
                f,
                "too many segments around `{operator}` (at most {limit} allowed)"
            ),
        }
    }
}

impl std::error::Error for ParsingError {}

/// Splits `text` on exact occurrences of `delimiter`, dropping blank segments.
fn split_segments<'a>(
    text: &'a str,
    delimiter: &'static str,
    limit: usize,
) -> Result<Vec<&'a str>, ParsingError> {
    let segments: Vec<&str> = text
        .split(delimiter)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if segments.len() > limit {
        return Err(ParsingError::TooManySegments {
            operator: delimiter,
            limit,
        });
    }
    Ok(segments)
}

/// Splits a raw line into `&&` chains of `;` segments.
pub fn parse_line(line: &str, limits: &Limits) -> Result<CommandLine, ParsingError> {
    let mut chains = Vec::new();
    for chain in split_segments(line, AND_OPERATOR, limits.max_segments)? {
        let segments: Vec<Segment> = split_segments(chain, SEQUENCE_OPERATOR, limits.max_segments)?
            .into_iter()
            .map(|text| {
                if text.contains(PIPE_OPERATOR) {
                    Segment::Pipeline(text.to_string())
                } else {
                    Segment::Simple(text.to_string())
                }
            })
            .collect();
        if !segments.is_empty() {
            chains.push(segments);
        }
    }
    Ok(CommandLine { chains })
}

/// Tokenizes one command, logging when the token ceiling cuts it short.
pub fn tokenize(text: &str, max_tokens: usize) -> Vec<String> {
    let mut tokens = lexer::split_with_limit(text, max_tokens);
    let argv: Vec<String> = tokens.by_ref().collect();
    if tokens.truncated() {
        tracing::warn!(limit = max_tokens, "discarding tokens beyond the limit");
    }
    argv
}

/// Breaks a pipeline segment into the argument vectors of its stages.
pub fn split_pipeline(segment: &str, limits: &Limits) -> Result<Vec<Vec<String>>, ParsingError> {
    let stages: Vec<&str> = segment.split(PIPE_OPERATOR).collect();
    if stages.len() > limits.max_segments {
        return Err(ParsingError::TooManySegments {
            operator: PIPE_OPERATOR,
            limit: limits.max_segments,
        });
    }
    stages
        .into_iter()
        .map(|stage| {
            let argv = tokenize(stage, limits.max_tokens);
            if argv.is_empty() {
                Err(ParsingError::EmptyPipelineStage)
            } else {
                Ok(argv)
            }
        })
        .collect()
}

/// Index of the first token that is exactly `<`, `>` or `>>`.
pub fn find_redirection(argv: &[String]) -> Option<usize> {
    locate_redirection(argv).map(|(index, _)| index)
}

/// Index and kind of the first redirection operator.
pub fn locate_redirection(argv: &[String]) -> Option<(usize, RedirectKind)> {
    argv.iter()
        .enumerate()
        .find_map(|(i, token)| RedirectKind::from_token(token).map(|kind| (i, kind)))
}

/// Tokenizes a non-pipeline segment and detects its redirection, if any.
pub fn classify(segment: &str, limits: &Limits) -> Result<SimpleCommand, ParsingError> {
    let mut argv = tokenize(segment, limits.max_tokens);
    let Some((index, kind)) = locate_redirection(&argv) else {
        return Ok(SimpleCommand {
            argv,
            redirect: None,
        });
    };

    let target = argv
        .get(index + 1)
        .cloned()
        .ok_or(ParsingError::MissingRedirectTarget(kind))?;
    argv.truncate(index);
    if argv.is_empty() {
        return Err(ParsingError::MissingCommand(kind));
    }

    Ok(SimpleCommand {
        argv,
        redirect: Some(Redirection { kind, target }),
    })
}
