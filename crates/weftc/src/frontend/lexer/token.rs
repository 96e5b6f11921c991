//! Token definitions using logos

use crate::common::Span;
use logos::Logos;
use std::fmt;

/// A token with its kind and source location
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords - Declarations
    #[token("func")]
    Func,
    #[token("task")]
    Task,

    // Keywords - Control Flow
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,

    // Keywords - Values
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("len")]
    Len,
    #[token("now")]
    Now,

    // Types
    #[token("i8")]
    I8,
    #[token("i16")]
    I16,
    #[token("i32")]
    I32,
    #[token("i64")]
    I64,
    #[token("u8")]
    U8,
    #[token("u16")]
    U16,
    #[token("u32")]
    U32,
    #[token("u64")]
    U64,
    #[token("f32")]
    F32,
    #[token("f64")]
    F64,
    #[token("string")]
    String,
    #[token("timestamp")]
    TimeStamp,
    #[token("timespan")]
    TimeSpan,
    #[token("series")]
    Series,
    #[token("chan")]
    Chan,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    IntLiteral(String),
    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().to_string())]
    FloatLiteral(String),
    /// Duration such as `100ms` or `1.5s`
    #[regex(r"[0-9]+(\.[0-9]+)?(ns|us|ms|s|m|h)", |lex| lex.slice().to_string())]
    TemporalLiteral(String),
    /// Rate such as `10hz` or `1khz`
    #[regex(r"[0-9]+(\.[0-9]+)?(hz|khz|mhz)", |lex| lex.slice().to_string())]
    FrequencyLiteral(String),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    StringLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Declaration and channel operators
    #[token(":=")]
    Declare,
    #[token("$=")]
    StatefulDeclare,
    #[token("=")]
    Eq,
    #[token("->")]
    Arrow,
    #[token("<-")]
    LeftArrow,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    // Comparison and logic
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!")]
    Bang,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    /// End of input (not produced by logos)
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Func => write!(f, "func"),
            TokenKind::Task => write!(f, "task"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Len => write!(f, "len"),
            TokenKind::Now => write!(f, "now"),
            TokenKind::I8 => write!(f, "i8"),
            TokenKind::I16 => write!(f, "i16"),
            TokenKind::I32 => write!(f, "i32"),
            TokenKind::I64 => write!(f, "i64"),
            TokenKind::U8 => write!(f, "u8"),
            TokenKind::U16 => write!(f, "u16"),
            TokenKind::U32 => write!(f, "u32"),
            TokenKind::U64 => write!(f, "u64"),
            TokenKind::F32 => write!(f, "f32"),
            TokenKind::F64 => write!(f, "f64"),
            TokenKind::String => write!(f, "string"),
            TokenKind::TimeStamp => write!(f, "timestamp"),
            TokenKind::TimeSpan => write!(f, "timespan"),
            TokenKind::Series => write!(f, "series"),
            TokenKind::Chan => write!(f, "chan"),
            TokenKind::IntLiteral(s) |
            TokenKind::FloatLiteral(s) |
            TokenKind::TemporalLiteral(s) |
            TokenKind::FrequencyLiteral(s) |
            TokenKind::StringLiteral(s) => write!(f, "{s}"),
            TokenKind::Identifier(s) => write!(f, "identifier '{s}'"),
            TokenKind::Declare => write!(f, ":="),
            TokenKind::StatefulDeclare => write!(f, "$="),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::LeftArrow => write!(f, "<-"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::AmpAmp => write!(f, "&&"),
            TokenKind::PipePipe => write!(f, "||"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
