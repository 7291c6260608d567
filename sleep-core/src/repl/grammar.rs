#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the operator console.
//!
//! `regal` turns a line into a bounded token stream; the parser then walks the
//! tokens against the [`catalog`](super::catalog) entry named by the first
//! keyword.

use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;

use super::catalog::{self, ArgSpec, CommandTag};
use crate::deployable::ExecutionContext;

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 16;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Number with an `ms`, `s`, or `m` suffix.
    #[regex(r"[0-9]+(?:\.[0-9]+)?(?:ms|s|m)", priority = 2)]
    Duration,
    /// Unsuffixed decimal literal.
    #[regex(r"[0-9]+(?:\.[0-9]+)?")]
    Number,
    /// Keyword; matched case-insensitively by the parser.
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Anything the lexer does not recognize.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    TooManyTokens { processed: usize },
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => f.write_str("lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarError<'a> {
    UnknownCommand {
        lexeme: &'a str,
        span: Range<usize>,
    },
    UnexpectedToken {
        expected: &'static str,
        lexeme: &'a str,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidNumber {
        span: Range<usize>,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    InvalidToken {
        lexeme: &'a str,
        span: Range<usize>,
    },
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        match token {
            Some(token) if token.kind != TokenKind::Eol => GrammarError::UnexpectedToken {
                expected,
                lexeme: token.lexeme,
                span: token.span.clone(),
            },
            _ => GrammarError::UnexpectedEnd { expected },
        }
    }
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnknownCommand { lexeme, .. } => {
                write!(f, "unknown command `{lexeme}`")
            }
            GrammarError::UnexpectedToken {
                expected,
                lexeme,
                span,
            } => write!(f, "expected {expected}, found `{lexeme}` at {span:?}"),
            GrammarError::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarError::InvalidNumber { span } => write!(f, "invalid number at {span:?}"),
            GrammarError::InvalidDuration { span } => {
                write!(f, "invalid duration at {span:?}")
            }
            GrammarError::InvalidToken { lexeme, span } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq)]
pub enum Command<'a> {
    Sleep,
    /// Bindable sleep action, available even when the button is not.
    SleepAction,
    /// Raw value; validated by the executor.
    Minutes(f32),
    Status,
    Events,
    Help(HelpCommand<'a>),
    Rig(RigCommand),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

/// Commands that manipulate the simulated surroundings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RigCommand {
    Advance(Duration),
    Context(ExecutionContext),
    Extend,
    Retract,
    Mobility(bool),
    Break,
    Repair,
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if !record.skipped {
            push_token(&mut buffer, line, record.token, record.start..record.end)?;
        }
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let span = partial.start..partial.start + partial.fragment.len();
        push_token(&mut buffer, line, TokenKind::Error, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    line: &'a str,
    kind: TokenKind,
    span: Range<usize>,
) -> Result<(), LexError> {
    let lexeme = &line[span.clone()];
    buffer
        .push(Token { kind, lexeme, span })
        .map_err(|_| LexError::TooManyTokens {
            processed: buffer.len() + 1,
        })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::InvalidToken {
            lexeme: token.lexeme,
            span: token.span.clone(),
        }));
    }

    let mut input = tokens.as_slice();
    let command = command(&mut input).map_err(ParseError::Grammar)?;

    while let Some((token, rest)) = input.split_first() {
        if token.kind != TokenKind::Eol {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
        input = rest;
    }

    Ok(command)
}

type Input<'src, 'slice> = &'slice [Token<'src>];

fn command<'src>(input: &mut Input<'src, '_>) -> Result<Command<'src>, GrammarError<'src>> {
    let keyword = expect_kind(input, TokenKind::Ident, "command keyword")?;
    let spec = catalog::find(keyword.lexeme).ok_or_else(|| GrammarError::UnknownCommand {
        lexeme: keyword.lexeme,
        span: keyword.span.clone(),
    })?;

    let command = match (spec.tag, spec.arg) {
        (CommandTag::Sleep, _) => Command::Sleep,
        (CommandTag::Action, ArgSpec::Choice(choices)) => {
            choice(input, choices)?;
            Command::SleepAction
        }
        (CommandTag::Minutes, _) => {
            let token = expect_kind(input, TokenKind::Number, "minutes")?;
            Command::Minutes(parse_number(&token)?)
        }
        (CommandTag::Status, _) => Command::Status,
        (CommandTag::Events, _) => Command::Events,
        (CommandTag::Help, _) => Command::Help(HelpCommand {
            topic: optional_ident(input)?,
        }),
        (CommandTag::Advance, _) => Command::Rig(RigCommand::Advance(duration(input)?)),
        (CommandTag::Context, ArgSpec::Choice(choices)) => {
            let context = match choice(input, choices)? {
                "editor" => ExecutionContext::Editor,
                "flight" => ExecutionContext::Flight,
                _ => ExecutionContext::Other,
            };
            Command::Rig(RigCommand::Context(context))
        }
        (CommandTag::Mobile, ArgSpec::Choice(choices)) => {
            Command::Rig(RigCommand::Mobility(choice(input, choices)? == "on"))
        }
        (CommandTag::Action | CommandTag::Context | CommandTag::Mobile, _) => {
            return Err(GrammarError::unexpected("choice", None));
        }
        (CommandTag::Extend, _) => Command::Rig(RigCommand::Extend),
        (CommandTag::Retract, _) => Command::Rig(RigCommand::Retract),
        (CommandTag::Break, _) => Command::Rig(RigCommand::Break),
        (CommandTag::Repair, _) => Command::Rig(RigCommand::Repair),
    };

    Ok(command)
}

fn expect_kind<'src>(
    input: &mut Input<'src, '_>,
    kind: TokenKind,
    label: &'static str,
) -> Result<Token<'src>, GrammarError<'src>> {
    match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        other => Err(GrammarError::unexpected(label, other.map(|(token, _)| token))),
    }
}

fn optional_ident<'src>(input: &mut Input<'src, '_>) -> Result<Option<&'src str>, GrammarError<'src>> {
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            *input = rest;
            Ok(Some(token.lexeme))
        }
        Some((token, _)) if token.kind != TokenKind::Eol => {
            Err(GrammarError::unexpected("command name", Some(token)))
        }
        _ => Ok(None),
    }
}

fn choice<'src>(
    input: &mut Input<'src, '_>,
    choices: &'static [&'static str],
) -> Result<&'static str, GrammarError<'src>> {
    let label = choices.first().copied().unwrap_or("keyword");
    let token = expect_kind(input, TokenKind::Ident, label)?;
    choices
        .iter()
        .copied()
        .find(|choice| choice.eq_ignore_ascii_case(token.lexeme))
        .ok_or_else(|| GrammarError::unexpected(label, Some(&token)))
}

fn duration<'src>(input: &mut Input<'src, '_>) -> Result<Duration, GrammarError<'src>> {
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Duration => {
            *input = rest;
            parse_duration(token)
        }
        Some((token, rest)) if token.kind == TokenKind::Number => {
            *input = rest;
            seconds(token, parse_number(token)?.into())
        }
        other => Err(GrammarError::unexpected(
            "duration",
            other.map(|(token, _)| token),
        )),
    }
}

fn parse_number<'a>(token: &Token<'a>) -> Result<f32, GrammarError<'a>> {
    token
        .lexeme
        .parse::<f32>()
        .map_err(|_| GrammarError::InvalidNumber {
            span: token.span.clone(),
        })
}

fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let invalid = || GrammarError::InvalidDuration {
        span: token.span.clone(),
    };
    let text = token.lexeme;
    let (digits, scale) = if let Some(rest) = text.strip_suffix("ms") {
        (rest, 0.001)
    } else if let Some(rest) = text.strip_suffix('s') {
        (rest, 1.0)
    } else if let Some(rest) = text.strip_suffix('m') {
        (rest, 60.0)
    } else {
        return Err(invalid());
    };
    let value = digits.parse::<f64>().map_err(|_| invalid())?;
    seconds(token, value * scale)
}

fn seconds<'a>(token: &Token<'a>, value: f64) -> Result<Duration, GrammarError<'a>> {
    Duration::try_from_secs_f64(value).map_err(|_| GrammarError::InvalidDuration {
        span: token.span.clone(),
    })
}
