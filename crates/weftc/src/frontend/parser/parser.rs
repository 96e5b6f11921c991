//! Weft recursive descent parser

use crate::common::{CompileError, CompileResult, Span};
use crate::frontend::ast::*;
use crate::frontend::lexer::{Lexer, Token, TokenKind};

/// Weft parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// Span of the most recently consumed token
    prev: Span,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            prev: Span::default(),
        }
    }

    /// Parse a complete source file
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let start = self.lexer.peek()?.span;
        let mut items = Vec::new();

        while !self.check(&TokenKind::Eof)? {
            items.push(self.parse_item()?);
        }

        let end = self.lexer.peek()?.span;
        Ok(Program::new(items, start.to(end)))
    }

    /// Parse a lone type annotation such as `f64` or `series i32`
    pub fn parse_type_annotation(&mut self) -> CompileResult<TypeExpr> {
        let ty = self.parse_type()?;
        self.expect(TokenKind::Eof)?;
        Ok(ty)
    }

    // ==================== Items ====================

    fn parse_item(&mut self) -> CompileResult<Item> {
        let start = self.lexer.peek()?.span;

        let kind = if self.check(&TokenKind::Func)? {
            ItemKind::Function(self.parse_func_decl()?)
        } else if self.check(&TokenKind::Task)? {
            ItemKind::Task(self.parse_task_decl()?)
        } else {
            ItemKind::Flow(self.parse_flow_stmt()?)
        };

        Ok(Item::new(kind, start.to(self.prev)))
    }

    fn parse_func_decl(&mut self) -> CompileResult<FuncDecl> {
        let start = self.expect(TokenKind::Func)?.span;
        let name = self.expect_identifier()?;

        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let ret = self.parse_return_type()?;
        let body = self.parse_block()?;

        Ok(FuncDecl {
            name,
            params,
            ret,
            body,
            span: start.to(self.prev),
        })
    }

    fn parse_task_decl(&mut self) -> CompileResult<TaskDecl> {
        let start = self.expect(TokenKind::Task)?.span;
        let name = self.expect_identifier()?;

        let mut config = Vec::new();
        if self.match_token(&TokenKind::LBrace)? {
            while !self.check(&TokenKind::RBrace)? {
                config.push(self.parse_param()?);
                self.match_token(&TokenKind::Comma)?;
            }
            self.expect(TokenKind::RBrace)?;
        }

        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let ret = self.parse_return_type()?;
        let body = self.parse_block()?;

        Ok(TaskDecl {
            name,
            config,
            params,
            ret,
            body,
            span: start.to(self.prev),
        })
    }

    fn parse_params(&mut self) -> CompileResult<Vec<Param>> {
        let mut params = Vec::new();

        if !self.check(&TokenKind::RParen)? {
            params.push(self.parse_param()?);
            while self.match_token(&TokenKind::Comma)? {
                if self.check(&TokenKind::RParen)? {
                    break;
                }
                params.push(self.parse_param()?);
            }
        }

        Ok(params)
    }

    fn parse_param(&mut self) -> CompileResult<Param> {
        let start = self.lexer.peek()?.span;
        let name = self.expect_identifier()?;
        let ty = self.parse_type()?;
        Ok(Param {
            name,
            ty,
            span: start.to(self.prev),
        })
    }

    fn parse_return_type(&mut self) -> CompileResult<Option<TypeExpr>> {
        if self.is_type_start(0)? {
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    // ==================== Flows ====================

    fn parse_flow_stmt(&mut self) -> CompileResult<FlowStmt> {
        let start = self.lexer.peek()?.span;
        let mut nodes = vec![self.parse_flow_node()?];

        if !self.check(&TokenKind::Arrow)? {
            let token = self.lexer.peek()?.clone();
            return Err(CompileError::parser(
                format!("expected {} in flow statement, found {}", TokenKind::Arrow, token.kind),
                token.span,
            ));
        }

        while self.match_token(&TokenKind::Arrow)? {
            nodes.push(self.parse_flow_node()?);
        }

        Ok(FlowStmt {
            nodes,
            span: start.to(self.prev),
        })
    }

    fn parse_flow_node(&mut self) -> CompileResult<FlowNode> {
        let start = self.lexer.peek()?.span;

        if self.check(&TokenKind::Identifier(String::new()))?
            && self.lexer.check_at(1, &TokenKind::LBrace)?
        {
            let name = self.expect_identifier()?;
            let config = self.parse_config_values()?;
            return Ok(FlowNode {
                kind: FlowNodeKind::Task(TaskInvocation { name, config }),
                span: start.to(self.prev),
            });
        }

        let expr = self.parse_expr()?;
        let span = expr.span;
        let kind = if let ExprKind::Identifier(name) = &expr.kind {
            FlowNodeKind::Channel(name.clone())
        } else {
            FlowNodeKind::Expr(expr)
        };
        Ok(FlowNode { kind, span })
    }

    fn parse_config_values(&mut self) -> CompileResult<ConfigValues> {
        self.expect(TokenKind::LBrace)?;

        if self.match_token(&TokenKind::RBrace)? {
            return Ok(ConfigValues::Named(Vec::new()));
        }

        let named = self.check(&TokenKind::Identifier(String::new()))?
            && self.lexer.check_at(1, &TokenKind::Colon)?;

        let config = if named {
            let mut values = Vec::new();
            loop {
                let start = self.lexer.peek()?.span;
                let name = self.expect_identifier()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expr()?;
                values.push(NamedValue {
                    name,
                    value,
                    span: start.to(self.prev),
                });
                if !self.match_token(&TokenKind::Comma)? || self.check(&TokenKind::RBrace)? {
                    break;
                }
            }
            ConfigValues::Named(values)
        } else {
            let mut values = vec![self.parse_expr()?];
            while self.match_token(&TokenKind::Comma)? {
                if self.check(&TokenKind::RBrace)? {
                    break;
                }
                values.push(self.parse_expr()?);
            }
            ConfigValues::Anonymous(values)
        };

        self.expect(TokenKind::RBrace)?;
        Ok(config)
    }

    // ==================== Types ====================

    fn parse_type(&mut self) -> CompileResult<TypeExpr> {
        let start = self.lexer.peek()?.span;

        if let Some(prim) = self.try_parse_primitive_type()? {
            return Ok(TypeExpr::new(TypeExprKind::Primitive(prim), start));
        }

        if self.match_token(&TokenKind::Series)? {
            let Some(elem) = self.try_parse_primitive_type()? else {
                let token = self.lexer.peek()?.clone();
                return Err(CompileError::parser(
                    format!("series element must be a primitive type, found {}", token.kind),
                    token.span,
                ));
            };
            return Ok(TypeExpr::new(TypeExprKind::Series(elem), start.to(self.prev)));
        }

        let direction = if self.check(&TokenKind::LeftArrow)? {
            self.advance()?;
            ChanDirection::Recv
        } else if self.check(&TokenKind::Arrow)? {
            self.advance()?;
            ChanDirection::Send
        } else {
            ChanDirection::Both
        };

        if self.match_token(&TokenKind::Chan)? {
            let elem = self.parse_type()?;
            return Ok(TypeExpr::new(
                TypeExprKind::Chan {
                    elem: Box::new(elem),
                    direction,
                },
                start.to(self.prev),
            ));
        }

        let token = self.advance()?;
        Err(CompileError::parser(
            format!("expected type, found {}", token.kind),
            token.span,
        ))
    }

    fn try_parse_primitive_type(&mut self) -> CompileResult<Option<PrimitiveType>> {
        let prim = Self::primitive_of(&self.lexer.peek()?.kind);
        if prim.is_some() {
            self.advance()?;
        }
        Ok(prim)
    }

    fn primitive_of(kind: &TokenKind) -> Option<PrimitiveType> {
        Some(match kind {
            TokenKind::I8 => PrimitiveType::I8,
            TokenKind::I16 => PrimitiveType::I16,
            TokenKind::I32 => PrimitiveType::I32,
            TokenKind::I64 => PrimitiveType::I64,
            TokenKind::U8 => PrimitiveType::U8,
            TokenKind::U16 => PrimitiveType::U16,
            TokenKind::U32 => PrimitiveType::U32,
            TokenKind::U64 => PrimitiveType::U64,
            TokenKind::F32 => PrimitiveType::F32,
            TokenKind::F64 => PrimitiveType::F64,
            TokenKind::String => PrimitiveType::String,
            TokenKind::TimeStamp => PrimitiveType::TimeStamp,
            TokenKind::TimeSpan => PrimitiveType::TimeSpan,
            _ => return None,
        })
    }

    /// Whether a type annotation starts `offset` tokens ahead
    fn is_type_start(&mut self, offset: usize) -> CompileResult<bool> {
        let kind = self.lexer.peek_at(offset)?.kind.clone();
        Ok(match kind {
            TokenKind::Series | TokenKind::Chan => true,
            TokenKind::LeftArrow | TokenKind::Arrow => {
                self.lexer.check_at(offset + 1, &TokenKind::Chan)?
            }
            other => Self::primitive_of(&other).is_some(),
        })
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace)? {
            if self.check(&TokenKind::Eof)? {
                let token = self.lexer.peek()?.clone();
                return Err(CompileError::parser("unclosed block", token.span));
            }
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Block::new(stmts, start.to(self.prev)))
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        let start = self.lexer.peek()?.span;

        if self.check(&TokenKind::If)? {
            let stmt = self.parse_if_stmt()?;
            return Ok(Stmt::new(StmtKind::If(stmt), start.to(self.prev)));
        }

        if self.match_token(&TokenKind::Return)? {
            let value = if self.ends_statement(start)? {
                None
            } else {
                Some(self.parse_expr()?)
            };
            return Ok(Stmt::new(StmtKind::Return(value), start.to(self.prev)));
        }

        if self.check(&TokenKind::Identifier(String::new()))? {
            if let Some(kind) = self.try_parse_named_stmt()? {
                return Ok(Stmt::new(kind, start.to(self.prev)));
            }
        }

        let expr = self.parse_expr()?;
        if self.match_token(&TokenKind::Arrow)? {
            let channel_span = self.lexer.peek()?.span;
            let channel = self.expect_identifier()?;
            return Ok(Stmt::new(
                StmtKind::ChannelWrite {
                    channel,
                    channel_span,
                    value: expr,
                },
                start.to(self.prev),
            ));
        }

        Ok(Stmt::new(StmtKind::Expr(expr), start.to(self.prev)))
    }

    /// Statements introduced by `IDENT <op>`: declarations, assignment,
    /// blocking reads and channel writes. Returns `None` (consuming nothing)
    /// when the identifier starts an ordinary expression.
    fn try_parse_named_stmt(&mut self) -> CompileResult<Option<StmtKind>> {
        let next = self.lexer.peek_at(1)?.kind.clone();
        let typed = self.is_type_start(1)?;

        match next {
            TokenKind::Declare | TokenKind::StatefulDeclare => {}
            TokenKind::Eq | TokenKind::LeftArrow if !typed => {}
            _ if typed => {}
            _ => return Ok(None),
        }

        let name_span = self.lexer.peek()?.span;
        let name = self.expect_identifier()?;

        if self.match_token(&TokenKind::Eq)? {
            let value = self.parse_expr()?;
            return Ok(Some(StmtKind::Assign {
                target: name,
                target_span: name_span,
                value,
            }));
        }

        if !typed && self.match_token(&TokenKind::LeftArrow)? {
            let value = self.parse_expr()?;
            return Ok(Some(StmtKind::ChannelWrite {
                channel: name,
                channel_span: name_span,
                value,
            }));
        }

        let ty = if typed { Some(self.parse_type()?) } else { None };

        if self.match_token(&TokenKind::StatefulDeclare)? {
            let value = self.parse_expr()?;
            return Ok(Some(StmtKind::Stateful(VarDecl { name, ty, value })));
        }

        self.expect(TokenKind::Declare)?;

        if ty.is_none() && self.match_token(&TokenKind::LeftArrow)? {
            let channel_span = self.lexer.peek()?.span;
            let channel = self.expect_identifier()?;
            return Ok(Some(StmtKind::BlockingRead {
                name,
                channel,
                channel_span,
            }));
        }

        let value = self.parse_expr()?;
        Ok(Some(StmtKind::Local(VarDecl { name, ty, value })))
    }

    fn parse_if_stmt(&mut self) -> CompileResult<IfStmt> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let block = self.parse_block()?;
        let mut branches = vec![(cond, block)];
        let mut else_block = None;

        while self.match_token(&TokenKind::Else)? {
            if self.match_token(&TokenKind::If)? {
                let cond = self.parse_expr()?;
                let block = self.parse_block()?;
                branches.push((cond, block));
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(IfStmt {
            branches,
            else_block,
        })
    }

    /// A bare `return` ends at a closing brace or at a token on a later line
    fn ends_statement(&mut self, keyword: Span) -> CompileResult<bool> {
        let next = self.lexer.peek()?;
        Ok(matches!(next.kind, TokenKind::RBrace | TokenKind::Eof) || next.span.line > keyword.line)
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        self.parse_expr_with_precedence(0)
    }

    fn parse_expr_with_precedence(&mut self, min_prec: u8) -> CompileResult<Expr> {
        let mut left = self.parse_unary_expr()?;

        while let Some(op) = self.peek_binary_op()? {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.advance()?;
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let right = self.parse_expr_with_precedence(next_min)?;

            let span = left.span.to(right.span);
            left = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn peek_binary_op(&mut self) -> CompileResult<Option<BinOp>> {
        Ok(match &self.lexer.peek()?.kind {
            TokenKind::PipePipe => Some(BinOp::Or),
            TokenKind::AmpAmp => Some(BinOp::And),
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::NotEq => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::LtEq => Some(BinOp::Le),
            TokenKind::GtEq => Some(BinOp::Ge),
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Rem),
            TokenKind::Caret => Some(BinOp::Pow),
            _ => None,
        })
    }

    fn parse_unary_expr(&mut self) -> CompileResult<Expr> {
        let start = self.lexer.peek()?.span;

        let op = if self.match_token(&TokenKind::Minus)? {
            UnaryOp::Neg
        } else if self.match_token(&TokenKind::Bang)? {
            UnaryOp::Not
        } else {
            return self.parse_postfix_expr();
        };

        let operand = self.parse_unary_expr()?;
        let span = start.to(operand.span);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix_expr(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            // Postfix operators must start on the same line as their target
            if self.lexer.peek()?.span.line != self.prev.line {
                break;
            }

            if self.match_token(&TokenKind::LBracket)? {
                let start = if self.check(&TokenKind::Colon)? {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };

                if self.match_token(&TokenKind::Colon)? {
                    let end = if self.check(&TokenKind::RBracket)? {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(TokenKind::RBracket)?;
                    let span = expr.span.to(self.prev);
                    expr = Expr::new(
                        ExprKind::Slice {
                            target: Box::new(expr),
                            start,
                            end,
                        },
                        span,
                    );
                } else {
                    self.expect(TokenKind::RBracket)?;
                    let Some(index) = start else {
                        return Err(CompileError::parser("expected index expression", self.prev));
                    };
                    let span = expr.span.to(self.prev);
                    expr = Expr::new(
                        ExprKind::Index {
                            target: Box::new(expr),
                            index,
                        },
                        span,
                    );
                }
            } else if self.match_token(&TokenKind::LParen)? {
                let args = self.parse_call_args()?;
                self.expect(TokenKind::RParen)?;
                let span = expr.span.to(self.prev);
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_call_args(&mut self) -> CompileResult<Vec<Expr>> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RParen)? {
            args.push(self.parse_expr()?);
            while self.match_token(&TokenKind::Comma)? {
                if self.check(&TokenKind::RParen)? {
                    break;
                }
                args.push(self.parse_expr()?);
            }
        }

        Ok(args)
    }

    fn parse_primary_expr(&mut self) -> CompileResult<Expr> {
        let token = self.advance()?;
        let start = token.span;

        let kind = match token.kind {
            TokenKind::IntLiteral(text) => {
                let value = text.parse::<u64>().map_err(|_| {
                    CompileError::parser(format!("integer literal {text} out of range"), start)
                })?;
                ExprKind::Literal(Literal::Integer(value))
            }
            TokenKind::FloatLiteral(text) => {
                let value = text.parse::<f64>().map_err(|_| {
                    CompileError::parser(format!("invalid float literal {text}"), start)
                })?;
                ExprKind::Literal(Literal::Float(value))
            }
            TokenKind::TemporalLiteral(text) => {
                ExprKind::Literal(Literal::Duration(Self::parse_duration(&text, start)?))
            }
            TokenKind::FrequencyLiteral(text) => {
                ExprKind::Literal(Literal::Frequency(Self::parse_frequency(&text, start)?))
            }
            TokenKind::StringLiteral(text) => {
                ExprKind::Literal(Literal::String(Self::parse_string_literal(&text)))
            }
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Identifier(name) => ExprKind::Identifier(name),

            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }

            TokenKind::LBracket => {
                let mut elems = Vec::new();
                if !self.check(&TokenKind::RBracket)? {
                    elems.push(self.parse_expr()?);
                    while self.match_token(&TokenKind::Comma)? {
                        if self.check(&TokenKind::RBracket)? {
                            break;
                        }
                        elems.push(self.parse_expr()?);
                    }
                }
                self.expect(TokenKind::RBracket)?;
                ExprKind::Series(elems)
            }

            TokenKind::Len => self.parse_builtin_args(Builtin::Len)?,
            TokenKind::Now => self.parse_builtin_args(Builtin::Now)?,

            other => match Self::primitive_of(&other) {
                Some(ty) => {
                    self.expect(TokenKind::LParen)?;
                    let inner = self.parse_expr()?;
                    self.expect(TokenKind::RParen)?;
                    ExprKind::Cast {
                        ty,
                        expr: Box::new(inner),
                    }
                }
                None => {
                    return Err(CompileError::parser(
                        format!("expected expression, found {other}"),
                        start,
                    ));
                }
            },
        };

        Ok(Expr::new(kind, start.to(self.prev)))
    }

    fn parse_builtin_args(&mut self, func: Builtin) -> CompileResult<ExprKind> {
        self.expect(TokenKind::LParen)?;
        let args = self.parse_call_args()?;
        self.expect(TokenKind::RParen)?;
        Ok(ExprKind::Builtin { func, args })
    }

    /// `100ms` to nanoseconds
    fn parse_duration(text: &str, span: Span) -> CompileResult<u64> {
        let (value, unit) = Self::split_unit(text, span)?;
        let scale = match unit {
            "ns" => 1.0,
            "us" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => {
                return Err(CompileError::parser(format!("unknown time unit {unit}"), span));
            }
        };
        Ok((value * scale).round() as u64)
    }

    /// `10hz` to hertz
    fn parse_frequency(text: &str, span: Span) -> CompileResult<f64> {
        let (value, unit) = Self::split_unit(text, span)?;
        let scale = match unit {
            "hz" => 1.0,
            "khz" => 1e3,
            "mhz" => 1e6,
            _ => {
                return Err(CompileError::parser(format!("unknown frequency unit {unit}"), span));
            }
        };
        Ok(value * scale)
    }

    fn split_unit(text: &str, span: Span) -> CompileResult<(f64, &str)> {
        let split = text
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let value = number
            .parse::<f64>()
            .map_err(|_| CompileError::parser(format!("invalid numeric literal {text}"), span))?;
        Ok((value, unit))
    }

    fn parse_string_literal(text: &str) -> String {
        let inner = text
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(text);

        let mut result = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                result.push(c);
                continue;
            }
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            }
        }
        result
    }

    // ==================== Helpers ====================

    fn advance(&mut self) -> CompileResult<Token> {
        let token = self.lexer.next_token()?;
        self.prev = token.span;
        Ok(token)
    }

    fn check(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        self.lexer.check(expected)
    }

    fn match_token(&mut self, expected: &TokenKind) -> CompileResult<bool> {
        if self.check(expected)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, expected: TokenKind) -> CompileResult<Token> {
        let token = self.lexer.expect(expected)?;
        self.prev = token.span;
        Ok(token)
    }

    fn expect_identifier(&mut self) -> CompileResult<String> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            other => Err(CompileError::parser(
                format!("expected identifier, found {other}"),
                token.span,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source).parse_program().unwrap()
    }

    fn body_of(program: &Program) -> &Block {
        match &program.items[0].kind {
            ItemKind::Function(f) => &f.body,
            ItemKind::Task(t) => &t.body,
            ItemKind::Flow(_) => panic!("expected declaration"),
        }
    }

    #[test]
    fn test_parse_function() {
        let program = parse("func add(x f64, y f64) f64 {\n\treturn x + y\n}");

        assert_eq!(program.items.len(), 1);
        match &program.items[0].kind {
            ItemKind::Function(f) => {
                assert_eq!(f.name, "add");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.params[1].name, "y");
                assert_eq!(f.ret.as_ref().unwrap().to_type().to_string(), "f64");
                assert_eq!(f.body.stmts.len(), 1);
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_parse_task_with_config() {
        let program = parse("task alarm{input chan f64 threshold f64}(value f64) u8 {\n\treturn 1\n}");

        match &program.items[0].kind {
            ItemKind::Task(t) => {
                assert_eq!(t.name, "alarm");
                assert_eq!(t.config.len(), 2);
                assert_eq!(t.config[0].ty.to_type().to_string(), "chan f64");
                assert_eq!(t.params.len(), 1);
                assert!(t.ret.is_some());
            }
            _ => panic!("expected task"),
        }
    }

    #[test]
    fn test_parse_directional_chan_types() {
        let program = parse("task relay{src <-chan f64 dst ->chan f64}() {}");
        let ItemKind::Task(t) = &program.items[0].kind else {
            panic!("expected task");
        };
        match &t.config[0].ty.kind {
            TypeExprKind::Chan { direction, .. } => assert_eq!(*direction, ChanDirection::Recv),
            _ => panic!("expected chan type"),
        }
        match &t.config[1].ty.kind {
            TypeExprKind::Chan { direction, .. } => assert_eq!(*direction, ChanDirection::Send),
            _ => panic!("expected chan type"),
        }
    }

    #[test]
    fn test_parse_declarations() {
        let program = parse(
            "func f() {\n\
             \tx := 1\n\
             \ty i32 := 2\n\
             \tcount $= 0\n\
             \ttotal f64 $= 0.5\n\
             \tv := <-sensor\n\
             \tx = x + 1\n\
             }",
        );
        let stmts = &body_of(&program).stmts;
        assert_eq!(stmts.len(), 6);
        assert!(matches!(&stmts[0].kind, StmtKind::Local(d) if d.name == "x" && d.ty.is_none()));
        assert!(matches!(&stmts[1].kind, StmtKind::Local(d) if d.ty.is_some()));
        assert!(matches!(&stmts[2].kind, StmtKind::Stateful(d) if d.name == "count"));
        assert!(matches!(&stmts[3].kind, StmtKind::Stateful(d) if d.ty.is_some()));
        assert!(matches!(&stmts[4].kind, StmtKind::BlockingRead { name, channel, .. }
            if name == "v" && channel == "sensor"));
        assert!(matches!(&stmts[5].kind, StmtKind::Assign { target, .. } if target == "x"));
    }

    #[test]
    fn test_parse_channel_writes() {
        let program = parse("func f() {\n\tout <- 1\n\t2 -> out\n}");
        let stmts = &body_of(&program).stmts;
        assert!(matches!(&stmts[0].kind, StmtKind::ChannelWrite { channel, .. } if channel == "out"));
        assert!(matches!(&stmts[1].kind, StmtKind::ChannelWrite { channel, value, .. }
            if channel == "out" && value.is_literal()));
    }

    #[test]
    fn test_parse_if_else_chain() {
        let program = parse(
            "func f(x i32) {\n\
             \tif x > 0 {\n\t\ty := 1\n\t} else if x < 0 {\n\t\ty := 2\n\t} else {\n\t\ty := 3\n\t}\n\
             }",
        );
        match &body_of(&program).stmts[0].kind {
            StmtKind::If(stmt) => {
                assert_eq!(stmt.branches.len(), 2);
                assert!(stmt.else_block.is_some());
            }
            _ => panic!("expected if"),
        }
    }

    #[test]
    fn test_parse_bare_return() {
        let program = parse("func f() {\n\treturn\n\tx := 1\n}");
        let stmts = &body_of(&program).stmts;
        assert_eq!(stmts.len(), 2);
        assert!(matches!(&stmts[0].kind, StmtKind::Return(None)));
    }

    #[test]
    fn test_precedence() {
        let program = parse("func f() {\n\tx := 1 + 2 * 3 > 4 && 5 == 5\n}");
        let StmtKind::Local(decl) = &body_of(&program).stmts[0].kind else {
            panic!("expected declaration");
        };
        match &decl.value.kind {
            ExprKind::Binary { op, left, .. } => {
                assert_eq!(*op, BinOp::And);
                match &left.kind {
                    ExprKind::Binary { op, left, .. } => {
                        assert_eq!(*op, BinOp::Gt);
                        assert!(matches!(&left.kind, ExprKind::Binary { op: BinOp::Add, .. }));
                    }
                    _ => panic!("expected comparison"),
                }
            }
            _ => panic!("expected binary"),
        }
    }

    #[test]
    fn test_power_is_right_associative() {
        let program = parse("func f() {\n\tx := 2 ^ 3 ^ 2\n}");
        let StmtKind::Local(decl) = &body_of(&program).stmts[0].kind else {
            panic!("expected declaration");
        };
        match &decl.value.kind {
            ExprKind::Binary { op: BinOp::Pow, left, right } => {
                assert!(left.is_literal());
                assert!(matches!(&right.kind, ExprKind::Binary { op: BinOp::Pow, .. }));
            }
            _ => panic!("expected power"),
        }
    }

    #[test]
    fn test_parse_literals() {
        let program = parse("func f() {\n\ta := 100ms\n\tb := 10hz\n\tc := \"hi\\n\"\n\td := [1, 2, 3]\n}");
        let values: Vec<&ExprKind> = body_of(&program)
            .stmts
            .iter()
            .map(|s| match &s.kind {
                StmtKind::Local(d) => &d.value.kind,
                _ => panic!("expected declaration"),
            })
            .collect();
        assert!(matches!(values[0], ExprKind::Literal(Literal::Duration(100_000_000))));
        assert!(matches!(values[1], ExprKind::Literal(Literal::Frequency(f)) if (*f - 10.0).abs() < f64::EPSILON));
        assert!(matches!(values[2], ExprKind::Literal(Literal::String(s)) if s == "hi\n"));
        assert!(matches!(values[3], ExprKind::Series(elems) if elems.len() == 3));
    }

    #[test]
    fn test_parse_postfix_and_builtins() {
        let program = parse("func f(s series f64) {\n\ta := s[0]\n\tb := s[1:]\n\tc := len(s)\n\td := f32(a)\n\te := g(a, b)\n}");
        let stmts = &body_of(&program).stmts;
        let value = |i: usize| match &stmts[i].kind {
            StmtKind::Local(d) => &d.value.kind,
            _ => panic!("expected declaration"),
        };
        assert!(matches!(value(0), ExprKind::Index { .. }));
        assert!(matches!(value(1), ExprKind::Slice { start: Some(_), end: None, .. }));
        assert!(matches!(value(2), ExprKind::Builtin { func: Builtin::Len, .. }));
        assert!(matches!(value(3), ExprKind::Cast { ty: PrimitiveType::F32, .. }));
        assert!(matches!(value(4), ExprKind::Call { args, .. } if args.len() == 2));
    }

    #[test]
    fn test_parse_flow() {
        let source = "sensor -> average{window: 10} -> ox > 100 -> alarm{}";
        let program = parse(source);
        let ItemKind::Flow(flow) = &program.items[0].kind else {
            panic!("expected flow");
        };
        assert_eq!(flow.nodes.len(), 4);
        assert!(matches!(&flow.nodes[0].kind, FlowNodeKind::Channel(c) if c == "sensor"));
        match &flow.nodes[1].kind {
            FlowNodeKind::Task(inv) => {
                assert_eq!(inv.name, "average");
                let ConfigValues::Named(values) = &inv.config else {
                    panic!("expected named config");
                };
                assert_eq!(values[0].name, "window");
                assert_eq!(values[0].value.span.slice(source), "10");
            }
            _ => panic!("expected task invocation"),
        }
        assert!(matches!(&flow.nodes[2].kind, FlowNodeKind::Expr(e) if e.span.slice(source) == "ox > 100"));
        assert!(matches!(&flow.nodes[3].kind, FlowNodeKind::Task(inv) if inv.config.is_empty()));
    }

    #[test]
    fn test_parse_anonymous_config() {
        let program = parse("sensor -> average{10, 20}");
        let ItemKind::Flow(flow) = &program.items[0].kind else {
            panic!("expected flow");
        };
        assert!(matches!(&flow.nodes[1].kind,
            FlowNodeKind::Task(TaskInvocation { config: ConfigValues::Anonymous(v), .. }) if v.len() == 2));
    }

    #[test]
    fn test_flow_requires_arrow() {
        let err = Parser::new("sensor").parse_program().unwrap_err();
        assert!(matches!(err, CompileError::Parser { .. }));
    }

    #[test]
    fn test_parse_type_annotation() {
        let ty = Parser::new("series i32").parse_type_annotation().unwrap();
        assert_eq!(ty.to_type(), crate::types::Type::series(crate::types::Type::I32));
        assert!(Parser::new("f64 f64").parse_type_annotation().is_err());
        assert!(Parser::new("sensor").parse_type_annotation().is_err());
    }

    #[test]
    fn test_series_requires_primitive() {
        let err = Parser::new("func f(s series chan f64) {}").parse_program().unwrap_err();
        assert!(matches!(err, CompileError::Parser { .. }));
    }
}
