#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the operator console.
//!
//! The lexer uses `regal` to produce a bounded token stream; the parser
//! composes `winnow` combinators over those tokens and lowers each line to a
//! [`ConsoleCommand`].

use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
use winnow::combinator::{alt, opt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;

use super::ConsoleCommand;
use super::catalog::{self, CommandTag};
use crate::protocol::{ArithmeticOp, Command, TimeRequest};

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 32;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal ending in `ms` or `s`.
    #[regex(r"[0-9]+(?:\.[0-9]+)?(?:ms|s)", priority = 2)]
    Duration,
    /// Signed decimal literal.
    #[regex(r"-?[0-9]+(?:\.[0-9]+)?")]
    Number,
    /// Identifier or keyword, matched case-insensitively by the parser.
    #[regex(r"[A-Za-z][A-Za-z0-9_-]*")]
    Ident,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: TokenKind,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        // A bare line ending counts as running out of input.
        let kind = match token {
            Some(token) if token.kind != TokenKind::Eol => GrammarErrorKind::UnexpectedToken {
                expected,
                found: token.kind,
                span: token.span.clone(),
            },
            _ => GrammarErrorKind::UnexpectedEnd { expected },
        };
        GrammarError { kind }
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
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

/// Tokenize the provided line.
///
/// # Errors
///
/// Returns [`LexError`] when the line holds more than [`MAX_TOKENS`] tokens.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }
        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(&mut buffer, record.token, lexeme, span)?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let span = partial.start..partial.start + partial.fragment.len();
        push_token(&mut buffer, TokenKind::Error, partial.fragment, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    kind: TokenKind,
    lexeme: &'a str,
    span: Range<usize>,
) -> Result<(), LexError> {
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

/// Parse one console line.
///
/// # Errors
///
/// Returns [`ParseError`] for unsupported characters, unknown commands,
/// malformed arguments and trailing input.
pub fn parse(line: &str) -> Result<ConsoleCommand<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let mut rest = tokens.as_slice();
    let command = command(&mut rest).map_err(ParseError::Grammar)?;

    match rest.iter().find(|token| token.kind != TokenKind::Eol) {
        Some(token) => Err(ParseError::Grammar(GrammarError::unexpected(
            "end of command",
            Some(token),
        ))),
        None => Ok(command),
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

fn command<'src>(input: &mut Input<'src, '_>) -> Result<ConsoleCommand<'src>, GrammarError<'src>> {
    let Some((head, rest)) = input.split_first() else {
        return Err(GrammarError::unexpected("command keyword", None));
    };
    let spec = (head.kind == TokenKind::Ident)
        .then(|| catalog::find(head.lexeme))
        .flatten()
        .ok_or_else(|| GrammarError::unexpected("command keyword", Some(head)))?;

    *input = rest;
    match arguments(spec.tag, input) {
        Ok(command) => Ok(command),
        Err(_) => Err(GrammarError::unexpected(spec.usage, input.first())),
    }
}

fn arguments<'src>(
    tag: CommandTag,
    input: &mut Input<'src, '_>,
) -> winnow::Result<ConsoleCommand<'src>> {
    let command = match tag {
        CommandTag::Restart => Command::Restart,
        CommandTag::Add => arithmetic(ArithmeticOp::Add, input)?,
        CommandTag::Sub => arithmetic(ArithmeticOp::Subtract, input)?,
        CommandTag::Mul => arithmetic(ArithmeticOp::Multiply, input)?,
        CommandTag::Div => arithmetic(ArithmeticOp::Divide, input)?,
        CommandTag::Time => time(input)?,
        CommandTag::Encoder => match schedule(input)? {
            Some(period_ms) => Command::EncoderEvery { period_ms },
            None => Command::Encoder,
        },
        CommandTag::Battery => match schedule(input)? {
            Some(period_ms) => Command::BatteryEvery {
                period_s: period_ms / 1_000.0,
            },
            None => Command::Battery,
        },
        CommandTag::Info => match schedule(input)? {
            Some(period_ms) => Command::SysInfoEvery { period_ms },
            None => Command::SysInfo,
        },
        CommandTag::Pwm => {
            let (left, right, duration_ms) =
                (integer, integer, opt(run_for)).parse_next(input)?;
            Command::Pwm {
                left,
                right,
                duration_ms,
            }
        }
        CommandTag::Stop => Command::Stop,
        CommandTag::Distance => {
            let (linear, angular, duration_ms) = (number, number, opt(run_for)).parse_next(input)?;
            Command::Distance {
                linear,
                angular,
                duration_ms,
            }
        }
        CommandTag::Velocity => {
            let (linear, angular, duration_ms) = (number, number, opt(run_for)).parse_next(input)?;
            Command::Velocity {
                linear,
                angular,
                duration_ms,
            }
        }
        CommandTag::Wait => {
            let wait = duration_millis
                .verify_map(|millis| Duration::try_from_secs_f32(millis / 1_000.0).ok())
                .parse_next(input)?;
            return Ok(ConsoleCommand::Wait(wait));
        }
        CommandTag::Help => {
            let topic = opt(expect_kind(TokenKind::Ident)).parse_next(input)?;
            return Ok(ConsoleCommand::Help(topic.map(|token| token.lexeme)));
        }
    };
    Ok(ConsoleCommand::Send(command))
}

fn arithmetic(op: ArithmeticOp, input: &mut Input<'_, '_>) -> winnow::Result<Command> {
    let (lhs, rhs) = (number, number).parse_next(input)?;
    Ok(Command::Arithmetic { op, lhs, rhs })
}

fn time(input: &mut Input<'_, '_>) -> winnow::Result<Command> {
    alt((
        keyword("cancel").value(Command::TimeCancel),
        preceded(keyword("every"), (duration_millis, opt(time_request))).map(
            |(period_ms, request)| Command::TimeEvery {
                request: request.unwrap_or(TimeRequest::Now),
                period_ms,
            },
        ),
        opt(time_request).map(|request| Command::Time(request.unwrap_or(TimeRequest::Now))),
    ))
    .parse_next(input)
}

fn time_request(input: &mut Input<'_, '_>) -> winnow::Result<TimeRequest> {
    alt((
        keyword("now").value(TimeRequest::Now),
        keyword("loop").value(TimeRequest::LoopTime),
        keyword("float").value(TimeRequest::FloatSend),
    ))
    .parse_next(input)
}

/// `every <duration>` yields the period, `cancel` yields zero, nothing asks for
/// a single report.
fn schedule(input: &mut Input<'_, '_>) -> winnow::Result<Option<f32>> {
    opt(alt((
        preceded(keyword("every"), duration_millis),
        keyword("cancel").value(0.0),
    )))
    .parse_next(input)
}

fn run_for(input: &mut Input<'_, '_>) -> winnow::Result<f32> {
    preceded(keyword("for"), duration_millis).parse_next(input)
}

fn number(input: &mut Input<'_, '_>) -> winnow::Result<f32> {
    expect_kind(TokenKind::Number)
        .verify_map(|token| {
            token
                .lexeme
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
        })
        .parse_next(input)
}

fn integer(input: &mut Input<'_, '_>) -> winnow::Result<i16> {
    expect_kind(TokenKind::Number)
        .verify_map(|token| token.lexeme.parse::<i16>().ok())
        .parse_next(input)
}

fn duration_millis(input: &mut Input<'_, '_>) -> winnow::Result<f32> {
    expect_kind(TokenKind::Duration)
        .verify_map(|token| parse_millis(token.lexeme))
        .parse_next(input)
}

fn parse_millis(text: &str) -> Option<f32> {
    let millis = if let Some(rest) = text.strip_suffix("ms") {
        rest.parse::<f32>().ok()?
    } else {
        text.strip_suffix('s')?.parse::<f32>().ok()? * 1_000.0
    };
    millis.is_finite().then_some(millis)
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, ContextError>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| -> winnow::Result<Token<'src>> {
        match input.split_first() {
            Some((token, rest)) if token.kind == kind => {
                *input = rest;
                Ok(token.clone())
            }
            _ => Err(ContextError::new()),
        }
    }
}

fn keyword<'src, 'slice>(word: &'static str) -> impl Parser<Input<'src, 'slice>, (), ContextError>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| -> winnow::Result<()> {
        match input.split_first() {
            Some((token, rest))
                if token.kind == TokenKind::Ident && token.lexeme.eq_ignore_ascii_case(word) =>
            {
                *input = rest;
                Ok(())
            }
            _ => Err(ContextError::new()),
        }
    }
}
