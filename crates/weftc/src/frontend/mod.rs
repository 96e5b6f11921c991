//! Lexing and parsing of Weft source into a syntax tree

pub mod ast;
pub mod lexer;
pub mod parser;

pub use lexer::Lexer;
pub use parser::Parser;

use crate::common::CompileResult;
use ast::{Program, TypeExpr};

/// Parse a complete source file
pub fn parse(source: &str) -> CompileResult<Program> {
    Parser::new(source).parse_program()
}

/// Parse a type written on its own, outside any declaration
pub fn parse_type(source: &str) -> CompileResult<TypeExpr> {
    Parser::new(source).parse_type_annotation()
}

/// Render the token stream, one token per line
pub fn dump_tokens(source: &str) -> CompileResult<String> {
    let tokens = Lexer::new(source).tokenize_all()?;
    let mut output = String::new();
    for token in &tokens {
        output.push_str(&format!(
            "{}:{}\t{:?}\n",
            token.span.line, token.span.column, token.kind
        ));
    }
    Ok(output)
}
