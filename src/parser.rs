//! Groups a token stream into a [`Pipeline`] of [`Segment`]s.
//!
//! Grammar (from the specification):
//!
//! ```text
//! pipeline := segment ( '|' segment )*
//! segment  := word ( word | redirect )*
//! redirect := '<' word | '>' word | '>>' word
//! ```

use crate::lexer::{Quoting, Token};
use thiserror::Error;

/// Whether a `>` redirection truncates or appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Truncate,
    Append,
}

/// One word as produced by the lexer, carrying whether it was quoted.
///
/// Alias and variable expansion consult `quoting` to decide whether `$...`
/// should be expanded (§4.2: no expansion inside quotes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWord {
    pub text: String,
    pub quoting: Quoting,
}

/// A single command in a pipeline: a program name, its argv, and at most
/// one active input/output redirection (last one wins per §4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub argv: Vec<RawWord>,
    pub stdin_redirect: Option<RawWord>,
    pub stdout_redirect: Option<(RawWord, OutputMode)>,
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.argv[0].text
    }
}

/// A left-to-right sequence of [`Segment`]s connected by pipes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error: empty command")]
    EmptySegment,
    #[error("syntax error: expected a word after redirection operator")]
    RedirectMissingWord,
    #[error("syntax error: empty pipeline")]
    EmptyPipeline,
}

/// Parse a token stream (already alias/variable expanded) into a [`Pipeline`].
pub fn parse(tokens: Vec<Token>) -> Result<Pipeline, ParseError> {
    let mut segments = Vec::new();
    let mut iter = tokens.into_iter().peekable();

    loop {
        let segment = parse_segment(&mut iter)?;
        segments.push(segment);

        match iter.peek() {
            Some(Token::Pipe) => {
                iter.next();
                continue;
            }
            Some(_) => unreachable!("parse_segment consumes until Pipe or end"),
            None => break,
        }
    }

    if segments.is_empty() {
        return Err(ParseError::EmptyPipeline);
    }

    Ok(Pipeline { segments })
}

fn parse_segment(
    iter: &mut std::iter::Peekable<std::vec::IntoIter<Token>>,
) -> Result<Segment, ParseError> {
    let mut argv = Vec::new();
    let mut stdin_redirect = None;
    let mut stdout_redirect = None;

    while let Some(tok) = iter.peek() {
        match tok {
            Token::Pipe => break,
            Token::Word(..) => {
                let Some(Token::Word(text, quoting)) = iter.next() else {
                    unreachable!()
                };
                argv.push(RawWord { text, quoting });
            }
            Token::Less => {
                iter.next();
                stdin_redirect = Some(expect_word(iter)?);
            }
            Token::Great => {
                iter.next();
                stdout_redirect = Some((expect_word(iter)?, OutputMode::Truncate));
            }
            Token::GreatGreat => {
                iter.next();
                stdout_redirect = Some((expect_word(iter)?, OutputMode::Append));
            }
        }
    }

    if argv.is_empty() {
        return Err(ParseError::EmptySegment);
    }

    Ok(Segment {
        argv,
        stdin_redirect,
        stdout_redirect,
    })
}

fn expect_word(
    iter: &mut std::iter::Peekable<std::vec::IntoIter<Token>>,
) -> Result<RawWord, ParseError> {
    match iter.next() {
        Some(Token::Word(text, quoting)) => Ok(RawWord { text, quoting }),
        _ => Err(ParseError::RedirectMissingWord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_line(line: &str) -> Result<Pipeline, ParseError> {
        parse(tokenize(line))
    }

    #[test]
    fn simple_pipeline() {
        let p = parse_line("echo hello | tr a-z A-Z").unwrap();
        assert_eq!(p.segments.len(), 2);
        assert_eq!(p.segments[0].name(), "echo");
        assert_eq!(p.segments[1].name(), "tr");
    }

    #[test]
    fn redirections() {
        let p = parse_line("cmd < in.txt > out.txt").unwrap();
        assert_eq!(p.segments.len(), 1);
        assert_eq!(p.segments[0].stdin_redirect.as_ref().unwrap().text, "in.txt");
        let (w, mode) = p.segments[0].stdout_redirect.as_ref().unwrap();
        assert_eq!(w.text, "out.txt");
        assert_eq!(*mode, OutputMode::Truncate);
    }

    #[test]
    fn append_redirect() {
        let p = parse_line("cmd >> out.txt").unwrap();
        let (w, mode) = p.segments[0].stdout_redirect.as_ref().unwrap();
        assert_eq!(w.text, "out.txt");
        assert_eq!(*mode, OutputMode::Append);
    }

    #[test]
    fn last_redirect_wins() {
        let p = parse_line("cmd > a.txt > b.txt").unwrap();
        let (w, _) = p.segments[0].stdout_redirect.as_ref().unwrap();
        assert_eq!(w.text, "b.txt");
    }

    #[test]
    fn empty_segment_in_pipeline_is_error() {
        assert_eq!(parse_line("echo hi | | cat"), Err(ParseError::EmptySegment));
        assert_eq!(parse_line("| cat"), Err(ParseError::EmptySegment));
        assert_eq!(parse_line("cat |"), Err(ParseError::EmptySegment));
    }

    #[test]
    fn redirect_without_word_is_error() {
        assert_eq!(parse_line("cmd >"), Err(ParseError::RedirectMissingWord));
        assert_eq!(parse_line("cmd <"), Err(ParseError::RedirectMissingWord));
    }

    #[test]
    fn empty_line_is_empty_pipeline_error() {
        assert_eq!(parse_line(""), Err(ParseError::EmptyPipeline));
    }
}
