//! Recursive-descent parser. Consumes the token stream from [`crate::lexer`]
//! and produces a [`crate::ast::Program`]. No backtracking except the
//! single-token rewind used to disambiguate `for (NAME in ...)` from
//! C-style `for (init; cond; update)`, and the lookahead used to recognize
//! multi-assignment targets.

use crate::ast::*;
use crate::error::{Span, VaError};
use crate::lexer::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

type PResult<T> = Result<T, VaError>;

impl Parser {
    pub fn new(tokens: Vec<Token>, file: impl Into<String>) -> Self {
        Parser {
            tokens,
            pos: 0,
            file: file.into(),
        }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn error_here(&self, message: impl Into<String>, hint: Option<&str>) -> VaError {
        VaError::syntax(
            Span::new(self.file.clone(), self.cur().line, self.cur().column),
            message,
            hint.map(|s| s.to_string()),
        )
    }

    fn expect(&mut self, kind: TokenKind, role: &str) -> PResult<Token> {
        if self.cur().kind == kind {
            Ok(self.advance())
        } else {
            let hint = match kind {
                TokenKind::Semicolon => Some("statements must end with ';' or a newline"),
                TokenKind::RBrace => Some("is a closing '}' missing?"),
                TokenKind::RParen => Some("is a closing ')' missing?"),
                _ => None,
            };
            Err(self.error_here(
                format!(
                    "expected {role}, found '{}'",
                    if self.cur().text.is_empty() {
                        format!("{:?}", self.cur().kind)
                    } else {
                        self.cur().text.clone()
                    }
                ),
                hint,
            ))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.cur().kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn end_statement(&mut self) {
        if matches!(self.cur().kind, TokenKind::Semicolon | TokenKind::Newline) {
            self.advance();
        }
        self.skip_newlines();
    }

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut functions = Vec::new();
        let mut top_level = Vec::new();
        self.skip_newlines();
        while self.cur().kind != TokenKind::Eof {
            if self.cur().kind == TokenKind::Func {
                functions.push(self.parse_function()?);
            } else {
                top_level.push(self.parse_statement()?);
            }
            self.skip_newlines();
        }
        Ok(Program {
            functions,
            top_level,
        })
    }

    fn parse_function(&mut self) -> PResult<FunctionDef> {
        let start = self.advance(); // `func`
        let name_tok = self.expect(TokenKind::Identifier, "function name")?;
        self.expect(TokenKind::LParen, "'(' after function name")?;
        let mut params = Vec::new();
        if self.cur().kind != TokenKind::RParen {
            loop {
                let p = self.expect(TokenKind::Identifier, "parameter name")?;
                params.push(p.text);
                if self.cur().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')' after parameters")?;
        let body = self.parse_block()?;
        Ok(FunctionDef {
            name: name_tok.text,
            params,
            body,
            line: start.line,
            column: start.column,
        })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        self.skip_newlines();
        let mut stmts = Vec::new();
        while self.cur().kind != TokenKind::RBrace && self.cur().kind != TokenKind::Eof {
            stmts.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> PResult<Stmt> {
        match self.cur().kind {
            TokenKind::Define => self.parse_define(),
            TokenKind::Immut => self.parse_immut(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Break => {
                let t = self.advance();
                self.end_statement();
                Ok(Stmt::Break(t.line, t.column))
            }
            TokenKind::Continue => {
                let t = self.advance();
                self.end_statement();
                Ok(Stmt::Continue(t.line, t.column))
            }
            TokenKind::Return => {
                let t = self.advance();
                let expr = if matches!(
                    self.cur().kind,
                    TokenKind::Semicolon | TokenKind::Newline | TokenKind::RBrace
                ) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.end_statement();
                Ok(Stmt::Return(expr, t.line, t.column))
            }
            TokenKind::Throw => {
                let t = self.advance();
                let expr = if matches!(
                    self.cur().kind,
                    TokenKind::Semicolon | TokenKind::Newline | TokenKind::RBrace
                ) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.end_statement();
                Ok(Stmt::Throw(expr, t.line, t.column))
            }
            _ => self.parse_expression_or_multi_assign_statement(),
        }
    }

    fn parse_define(&mut self) -> PResult<Stmt> {
        let t = self.advance(); // `define`
        let name = self.expect(TokenKind::Identifier, "variable name")?;
        self.end_statement();
        Ok(Stmt::Define {
            name: name.text,
            line: t.line,
            column: t.column,
        })
    }

    fn parse_immut(&mut self) -> PResult<Stmt> {
        let t = self.advance(); // `immut`
        let name = self.expect(TokenKind::Identifier, "constant name")?;
        self.expect(TokenKind::Assign, "'=' after constant name")?;
        let value = self.parse_expression()?;
        self.end_statement();
        Ok(Stmt::Expression(Expr::Assign {
            name: name.text,
            is_constant: true,
            value: Box::new(value),
            line: t.line,
            column: t.column,
        }))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        self.advance(); // `if`
        let cond = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let mut else_ifs = Vec::new();
        let mut else_body = None;
        loop {
            self.skip_newlines_peek_branch();
            if self.cur().kind == TokenKind::ElseIf {
                self.advance();
                let c = self.parse_expression()?;
                let b = self.parse_block()?;
                else_ifs.push((c, b));
            } else if self.cur().kind == TokenKind::Else {
                self.advance();
                else_body = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }
        Ok(Stmt::If {
            cond,
            then_body,
            else_ifs,
            else_body,
        })
    }

    /// `else`/`else-if` may appear on the next line after a closing `}`; this
    /// looks ahead across newlines without consuming them if nothing matches.
    fn skip_newlines_peek_branch(&mut self) {
        let save = self.pos;
        while self.cur().kind == TokenKind::Newline {
            self.advance();
        }
        if !matches!(self.cur().kind, TokenKind::ElseIf | TokenKind::Else) {
            self.pos = save;
        }
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        self.advance();
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.advance(); // `for`
        self.expect(TokenKind::LParen, "'(' after 'for'")?;
        // Disambiguate `for (NAME in ITER)` vs C-style with a one-token rewind.
        if self.cur().kind == TokenKind::Identifier && self.peek_at(1).kind == TokenKind::In {
            let var = self.advance().text;
            self.advance(); // `in`
            let iterable = self.parse_expression()?;
            self.expect(TokenKind::RParen, "')' after for-in iterable")?;
            let body = self.parse_block()?;
            return Ok(Stmt::ForIn {
                var,
                iterable,
                body,
            });
        }
        let init = if self.cur().kind == TokenKind::Semicolon {
            None
        } else {
            Some(Box::new(self.parse_expression_or_multi_assign_statement()?))
        };
        if self.cur().kind == TokenKind::Semicolon {
            self.advance();
        }
        let cond = if self.cur().kind == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';' after for-condition")?;
        let update = if self.cur().kind == TokenKind::RParen {
            None
        } else {
            Some(Box::new(Stmt::Expression(self.parse_expression()?)))
        };
        self.expect(TokenKind::RParen, "')' after for-clauses")?;
        let body = self.parse_block()?;
        Ok(Stmt::ForC {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        self.advance();
        let subject = self.parse_expression()?;
        self.expect(TokenKind::LBrace, "'{' after switch subject")?;
        self.skip_newlines();
        let mut cases = Vec::new();
        let mut default = None;
        while self.cur().kind != TokenKind::RBrace && self.cur().kind != TokenKind::Eof {
            if self.cur().kind == TokenKind::Case {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Colon, "':' after case value")?;
                self.skip_newlines();
                let mut body = Vec::new();
                while !matches!(
                    self.cur().kind,
                    TokenKind::Case | TokenKind::Default | TokenKind::RBrace
                ) {
                    body.push(self.parse_statement()?);
                    self.skip_newlines();
                }
                cases.push(SwitchCase { value, body });
            } else if self.cur().kind == TokenKind::Default {
                self.advance();
                self.expect(TokenKind::Colon, "':' after default")?;
                self.skip_newlines();
                let mut body = Vec::new();
                while !matches!(
                    self.cur().kind,
                    TokenKind::Case | TokenKind::Default | TokenKind::RBrace
                ) {
                    body.push(self.parse_statement()?);
                    self.skip_newlines();
                }
                default = Some(body);
            } else {
                return Err(self.error_here("expected 'case' or 'default'", None));
            }
        }
        self.expect(TokenKind::RBrace, "'}' to close switch")?;
        Ok(Stmt::Switch {
            subject,
            cases,
            default,
        })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        self.advance();
        let body = self.parse_block()?;
        self.skip_newlines_peek_catch_finally();
        let mut catch = None;
        if self.cur().kind == TokenKind::Catch {
            self.advance();
            let mut error_type = None;
            let mut var = None;
            if self.cur().kind == TokenKind::LParen {
                self.advance();
                if self.cur().kind == TokenKind::Identifier {
                    error_type = Some(self.advance().text);
                }
                self.expect(TokenKind::RParen, "')' after catch type filter")?;
            }
            if self.cur().kind == TokenKind::Identifier && self.cur().text == "as" {
                self.advance();
                var = Some(self.expect(TokenKind::Identifier, "catch variable name")?.text);
            }
            let cbody = self.parse_block()?;
            catch = Some(CatchClause {
                error_type,
                var,
                body: cbody,
            });
        }
        self.skip_newlines_peek_catch_finally();
        let finally = if self.cur().kind == TokenKind::Finally {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::Try {
            body,
            catch,
            finally,
        })
    }

    fn skip_newlines_peek_catch_finally(&mut self) {
        let save = self.pos;
        while self.cur().kind == TokenKind::Newline {
            self.advance();
        }
        if !matches!(self.cur().kind, TokenKind::Catch | TokenKind::Finally) {
            self.pos = save;
        }
    }

    fn parse_import(&mut self) -> PResult<Stmt> {
        let t = self.advance();
        let mut path = vec![self.expect(TokenKind::Identifier, "module path segment")?.text];
        while self.cur().kind == TokenKind::Dot {
            self.advance();
            path.push(self.expect(TokenKind::Identifier, "module path segment")?.text);
        }
        let alias = if self.cur().kind == TokenKind::Using {
            self.advance();
            Some(self.expect(TokenKind::Identifier, "alias name")?.text)
        } else {
            None
        };
        self.end_statement();
        Ok(Stmt::Import {
            path,
            alias,
            line: t.line,
            column: t.column,
        })
    }

    fn parse_expression_or_multi_assign_statement(&mut self) -> PResult<Stmt> {
        if self.cur().kind == TokenKind::Identifier && self.peek_at(1).kind == TokenKind::Comma {
            let save = self.pos;
            let mut targets = vec![self.advance().text];
            let mut ok = true;
            while self.cur().kind == TokenKind::Comma {
                self.advance();
                if self.cur().kind == TokenKind::Identifier {
                    targets.push(self.advance().text);
                } else {
                    ok = false;
                    break;
                }
            }
            if ok && self.cur().kind == TokenKind::Assign {
                let (line, column) = (self.cur().line, self.cur().column);
                self.advance();
                let value = self.parse_expression()?;
                self.end_statement();
                return Ok(Stmt::Expression(Expr::MultiAssign {
                    targets,
                    value: Box::new(value),
                    line,
                    column,
                }));
            }
            self.pos = save;
        }
        let expr = self.parse_expression()?;
        self.end_statement();
        Ok(Stmt::Expression(expr))
    }

    // ---- expressions, precedence low to high ----

    fn parse_expression(&mut self) -> PResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> PResult<Expr> {
        let left = self.parse_logical_or()?;
        if self.cur().kind == TokenKind::Assign {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let value = self.parse_assignment()?;
            if let Expr::Identifier(name, _, _) = left {
                return Ok(Expr::Assign {
                    name,
                    is_constant: false,
                    value: Box::new(value),
                    line,
                    column,
                });
            }
            return Err(self.error_here("invalid assignment target", None));
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_logical_and()?;
        while matches!(self.cur().kind, TokenKind::PipePipe | TokenKind::Or) {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_logical_and()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: "||".into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_equality()?;
        while matches!(self.cur().kind, TokenKind::AmpAmp | TokenKind::And) {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: "&&".into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitwise_or()?;
        while matches!(self.cur().kind, TokenKind::EqEq | TokenKind::NotEq) {
            let op = if self.cur().kind == TokenKind::EqEq {
                "=="
            } else {
                "!="
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_bitwise_or()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitwise_xor()?;
        while self.cur().kind == TokenKind::Pipe {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_bitwise_xor()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: "|".into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> PResult<Expr> {
        let mut left = self.parse_bitwise_and()?;
        while self.cur().kind == TokenKind::CaretCaret {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_bitwise_and()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: "^^".into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_shift()?;
        while self.cur().kind == TokenKind::Amp {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: "&".into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        let mut left = self.parse_comparison()?;
        while matches!(self.cur().kind, TokenKind::Shl | TokenKind::Shr) {
            let op = if self.cur().kind == TokenKind::Shl {
                "<<"
            } else {
                ">>"
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        while matches!(
            self.cur().kind,
            TokenKind::Less | TokenKind::Greater | TokenKind::LessEq | TokenKind::GreaterEq
        ) {
            let op = match self.cur().kind {
                TokenKind::Less => "<",
                TokenKind::Greater => ">",
                TokenKind::LessEq => "<=",
                _ => ">=",
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        while matches!(self.cur().kind, TokenKind::Plus | TokenKind::Minus) {
            let op = if self.cur().kind == TokenKind::Plus {
                "+"
            } else {
                "-"
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        while matches!(
            self.cur().kind,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        ) {
            let op = match self.cur().kind {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                _ => "%",
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: op.into(),
                right: Box::new(right),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if matches!(
            self.cur().kind,
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang
        ) {
            let op = match self.cur().kind {
                TokenKind::Minus => "-",
                TokenKind::Plus => "+",
                _ => "!",
            };
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: op.into(),
                operand: Box::new(operand),
                line,
                column,
            });
        }
        self.parse_power()
    }

    /// `^` is the one genuine right-associative binary operator here (its
    /// right-hand side recurses back into `parse_power`, so `a ^ b ^ c`
    /// nests as `a ^ (b ^ c)`). `^3`/`^N` are lexer sugar for "raise to this
    /// literal exponent" with no right-hand expression of their own, so a
    /// run of them (`base^2^3`) folds left, each suffix applying to the
    /// power expression built so far.
    fn parse_power(&mut self) -> PResult<Expr> {
        let mut left = self.parse_postfix()?;
        if self.cur().kind == TokenKind::Caret {
            let (line, column) = (self.cur().line, self.cur().column);
            self.advance();
            let right = self.parse_power()?;
            return Ok(Expr::Binary {
                left: Box::new(left),
                op: "^".into(),
                right: Box::new(right),
                line,
                column,
            });
        }
        while matches!(self.cur().kind, TokenKind::Power3 | TokenKind::PowerN) {
            let (line, column) = (self.cur().line, self.cur().column);
            let exponent = if self.cur().kind == TokenKind::Power3 {
                self.advance();
                3
            } else {
                let text = self.advance().text;
                text.trim_start_matches('^').parse().unwrap_or(0)
            };
            left = Expr::Binary {
                left: Box::new(left),
                op: "^".into(),
                right: Box::new(Expr::IntLiteral(exponent, line, column)),
                line,
                column,
            };
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.cur().kind {
                TokenKind::LParen => {
                    let (line, column) = (self.cur().line, self.cur().column);
                    self.advance();
                    let (args, named_args) = self.parse_call_arguments()?;
                    self.expect(TokenKind::RParen, "')' to close call")?;
                    expr = match expr {
                        Expr::Identifier(name, _, _) => Expr::Call {
                            callee: name,
                            args,
                            named_args,
                            line,
                            column,
                        },
                        Expr::Member { object, property, .. } => {
                            if let Expr::Identifier(obj_name, _, _) = object.as_ref() {
                                Expr::Call {
                                    callee: format!("{obj_name}.{property}"),
                                    args,
                                    named_args,
                                    line,
                                    column,
                                }
                            } else {
                                Expr::CallExpr {
                                    callee: Box::new(Expr::Member {
                                        object,
                                        property,
                                        line,
                                        column,
                                    }),
                                    args,
                                    named_args,
                                    line,
                                    column,
                                }
                            }
                        }
                        other => Expr::CallExpr {
                            callee: Box::new(other),
                            args,
                            named_args,
                            line,
                            column,
                        },
                    };
                }
                TokenKind::Dot => {
                    let (line, column) = (self.cur().line, self.cur().column);
                    self.advance();
                    let prop = if matches!(
                        self.cur().kind,
                        TokenKind::Identifier | TokenKind::Print | TokenKind::Input
                    ) {
                        self.advance().text
                    } else {
                        return Err(self.error_here("expected identifier after '.'", None));
                    };
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: prop,
                        line,
                        column,
                    };
                }
                TokenKind::LBracket => {
                    let (line, column) = (self.cur().line, self.cur().column);
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']' to close index")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        line,
                        column,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> PResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let mut args = Vec::new();
        let mut named = Vec::new();
        if self.cur().kind == TokenKind::RParen {
            return Ok((args, named));
        }
        loop {
            if self.cur().kind == TokenKind::Identifier && self.peek_at(1).kind == TokenKind::Colon
            {
                let name = self.advance().text;
                self.advance(); // ':'
                let value = self.parse_expression()?;
                named.push((name, value));
            } else {
                args.push(self.parse_expression()?);
            }
            if self.cur().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok((args, named))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let t = self.cur().clone();
        match t.kind {
            TokenKind::Number => {
                self.advance();
                if t.text.contains('.') {
                    Ok(Expr::FloatLiteral(t.text.parse().unwrap_or(0.0), t.line, t.column))
                } else {
                    Ok(Expr::IntLiteral(t.text.parse().unwrap_or(0), t.line, t.column))
                }
            }
            TokenKind::String | TokenKind::RawString => {
                self.advance();
                Ok(Expr::StringLiteral(t.text, t.line, t.column))
            }
            TokenKind::FString => {
                self.advance();
                Ok(Expr::FString(t.text, t.line, t.column))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLiteral(true, t.line, t.column))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLiteral(false, t.line, t.column))
            }
            TokenKind::System => {
                self.advance();
                Ok(Expr::Identifier("System".into(), t.line, t.column))
            }
            TokenKind::Print => {
                self.advance();
                Ok(Expr::Identifier("print".into(), t.line, t.column))
            }
            TokenKind::Input => {
                self.advance();
                Ok(Expr::Identifier("input".into(), t.line, t.column))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Identifier(t.text, t.line, t.column))
            }
            TokenKind::Lambda => {
                self.advance();
                let mut params = Vec::new();
                if self.cur().kind == TokenKind::Identifier {
                    params.push(self.advance().text);
                    while self.cur().kind == TokenKind::Comma {
                        self.advance();
                        params.push(self.expect(TokenKind::Identifier, "lambda parameter")?.text);
                    }
                }
                self.expect(TokenKind::Arrow, "'->' in lambda")?;
                let body = self.parse_expression()?;
                Ok(Expr::Lambda {
                    params,
                    body: Box::new(body),
                    line: t.line,
                    column: t.column,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let first = self.parse_expression()?;
                if self.cur().kind == TokenKind::Comma {
                    let mut elems = vec![first];
                    while self.cur().kind == TokenKind::Comma {
                        self.advance();
                        elems.push(self.parse_expression()?);
                    }
                    self.expect(TokenKind::RParen, "')' to close tuple")?;
                    Ok(Expr::Tuple(elems, t.line, t.column))
                } else {
                    self.expect(TokenKind::RParen, "')' to close expression")?;
                    Ok(first)
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elems = Vec::new();
                if self.cur().kind != TokenKind::RBracket {
                    elems.push(self.parse_expression()?);
                    while self.cur().kind == TokenKind::Comma {
                        self.advance();
                        elems.push(self.parse_expression()?);
                    }
                }
                self.expect(TokenKind::RBracket, "']' to close array")?;
                Ok(Expr::Array(elems, t.line, t.column))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                self.skip_newlines();
                if self.cur().kind != TokenKind::RBrace {
                    entries.push(self.parse_dict_entry()?);
                    self.skip_newlines();
                    while self.cur().kind == TokenKind::Comma {
                        self.advance();
                        self.skip_newlines();
                        if self.cur().kind == TokenKind::RBrace {
                            break;
                        }
                        entries.push(self.parse_dict_entry()?);
                        self.skip_newlines();
                    }
                }
                self.expect(TokenKind::RBrace, "'}' to close dict")?;
                Ok(Expr::Dict(entries, t.line, t.column))
            }
            _ => Err(self.error_here(
                format!(
                    "unexpected token '{}'",
                    if t.text.is_empty() {
                        format!("{:?}", t.kind)
                    } else {
                        t.text
                    }
                ),
                None,
            )),
        }
    }

    fn parse_dict_entry(&mut self) -> PResult<(Expr, Expr)> {
        let key = if self.cur().kind == TokenKind::Identifier
            && self.peek_at(1).kind == TokenKind::Colon
        {
            let t = self.advance();
            Expr::StringLiteral(t.text, t.line, t.column)
        } else {
            self.parse_expression()?
        };
        self.expect(TokenKind::Colon, "':' in dict entry")?;
        let value = self.parse_expression()?;
        Ok((key, value))
    }
}

pub fn parse(source: &str, file: impl Into<String>) -> Result<Program, VaError> {
    let file = file.into();
    let tokens = crate::lexer::lex(source, file.clone())?;
    Parser::new(tokens, file).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hello_world_function() {
        let program = parse(r#"func main() { System.print("Hello World!"); }"#, "t.va").unwrap();
        assert_eq!(program.functions.len(), 1);
        assert_eq!(program.functions[0].name, "main");
    }

    #[test]
    fn parses_immut_declaration() {
        let program = parse("func main() { immut k = 7; }", "t.va").unwrap();
        match &program.functions[0].body[0] {
            Stmt::Expression(Expr::Assign { is_constant, .. }) => assert!(*is_constant),
            other => panic!("expected immut assign, got {other:?}"),
        }
    }

    #[test]
    fn parses_for_in_vs_c_style() {
        let program = parse(
            "func main() { for (x in [1,2,3]) { } for (i = 0; i < 3; i = i + 1) { } }",
            "t.va",
        )
        .unwrap();
        assert!(matches!(program.functions[0].body[0], Stmt::ForIn { .. }));
        assert!(matches!(program.functions[0].body[1], Stmt::ForC { .. }));
    }

    #[test]
    fn parses_try_catch_finally() {
        let program = parse(
            r#"func main() { try { throw "bad"; } catch () as e { } finally { } }"#,
            "t.va",
        )
        .unwrap();
        assert!(matches!(program.functions[0].body[0], Stmt::Try { .. }));
    }

    #[test]
    fn parses_multi_assign() {
        let program = parse("func main() { a, b = [1, 2]; }", "t.va").unwrap();
        match &program.functions[0].body[0] {
            Stmt::Expression(Expr::MultiAssign { targets, .. }) => {
                assert_eq!(targets, &vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("expected multi-assign, got {other:?}"),
        }
    }

    #[test]
    fn parses_precedence_of_arithmetic() {
        let program = parse("func main() { return 1 + 2 * 3; }", "t.va").unwrap();
        match &program.functions[0].body[0] {
            Stmt::Return(Some(Expr::Binary { op, right, .. }), ..) => {
                assert_eq!(op, "+");
                assert!(matches!(right.as_ref(), Expr::Binary { op, .. } if op == "*"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn power_operator_is_right_associative() {
        // Spaced so the lexer emits plain `Caret` tokens rather than the
        // `^3`/`^N` digit-suffix sugar; `a ^ b ^ c` should nest as `a ^ (b ^ c)`.
        let program = parse("func main() { return 2 ^ 2 ^ 3; }", "t.va").unwrap();
        match &program.functions[0].body[0] {
            Stmt::Return(Some(Expr::Binary { op, right, .. }), ..) => {
                assert_eq!(op, "^");
                assert!(matches!(right.as_ref(), Expr::Binary { op, .. } if op == "^"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chained_power_suffix_sugar_folds_left_without_a_parse_error() {
        // `^2` and `^3` are digit-suffix sugar with no right-hand expression
        // of their own, so back-to-back suffixes (`2^2^3`) fold onto the
        // running base instead of recursing: `(2^2)^3`.
        let program = parse("func main() { return 2^2^3; }", "t.va").unwrap();
        match &program.functions[0].body[0] {
            Stmt::Return(Some(Expr::Binary { op, left, .. }), ..) => {
                assert_eq!(op, "^");
                assert!(matches!(left.as_ref(), Expr::Binary { op, .. } if op == "^"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn tuple_requires_two_or_more_elements() {
        let program = parse("func main() { return (1, 2, 3); }", "t.va").unwrap();
        assert!(matches!(
            program.functions[0].body[0],
            Stmt::Return(Some(Expr::Tuple(_, ..)), ..)
        ));
    }

    #[test]
    fn missing_closing_brace_is_syntax_error() {
        let err = parse("func main() { System.print(1);", "t.va").unwrap_err();
        assert_eq!(err.kind_name(), "SyntaxError");
    }
}
