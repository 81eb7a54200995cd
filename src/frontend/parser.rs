//! Parser for the kernel dialect.
//!
//! A recursive descent parser over a C subset: functions, declarations,
//! expression statements, `for`/`while`/`if`/`return` and blocks, with
//! `@attribute` annotations. Identifiers are resolved to variable identities
//! while parsing.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::semantic::{Scopes, VarTable};
use crate::frontend::token::{Token, TokenKind};
use crate::utils::errors::{ParseError, ParseErrorKind};
use crate::utils::intern::Symbol;
use crate::utils::location::Span;
use anyhow::{Result, bail};

/// A parser for kernel source.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    errors: Vec<ParseError>,
    vars: VarTable,
    scopes: Scopes,
}

impl<'a> Parser<'a> {
    /// Create a new parser from a lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let first_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current: first_token.clone(),
            previous: first_token,
            errors: Vec::new(),
            vars: VarTable::new(),
            scopes: Scopes::new(),
        })
    }

    /// Parse a complete translation unit.
    pub fn parse_program(mut self) -> Result<Program> {
        let start = self.current.span;
        let mut functions = Vec::new();

        while !self.is_at_end() {
            match self.parse_function() {
                Ok(func) => functions.push(func),
                Err(e) => {
                    self.record(e);
                    self.synchronize();
                }
            }
        }

        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
            bail!("Parse errors:\n  {}", messages.join("\n  "));
        }

        Ok(Program {
            functions,
            vars: self.vars,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_attributes(&mut self) -> Result<Vec<Attribute>> {
        let mut attributes = Vec::new();

        while self.check(TokenKind::At) {
            let start = self.current.span;
            self.advance()?;
            let name = Symbol::intern(&self.consume_identifier("Expected attribute name")?);

            let args = if self.match_token(TokenKind::LeftParen)? {
                let args = self.parse_args()?;
                self.consume(TokenKind::RightParen, "Expected ')' after attribute arguments")?;
                args
            } else {
                Vec::new()
            };

            attributes.push(Attribute {
                name,
                args,
                span: start.merge(&self.previous.span),
            });
        }

        Ok(attributes)
    }

    fn parse_function(&mut self) -> Result<Function> {
        let attributes = self.parse_attributes()?;
        let start = self.current.span;
        let return_type = self.parse_type()?;
        let name = Symbol::intern(&self.consume_identifier("Expected function name")?);

        self.scopes.push_scope();
        let result = self.parse_function_rest(name, return_type, attributes, start);
        self.scopes.pop_scope();
        result
    }

    fn parse_function_rest(
        &mut self,
        name: Symbol,
        return_type: Type,
        attributes: Vec<Attribute>,
        start: Span,
    ) -> Result<Function> {
        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;
        let params = self.parse_parameters()?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
        let body = self.parse_block()?;

        Ok(Function {
            name,
            return_type,
            params,
            body,
            attributes,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<VarRef>> {
        let mut params = Vec::new();
        if self.check(TokenKind::RightParen) {
            return Ok(params);
        }
        // `f(void)`
        if self.check(TokenKind::Void) {
            let base = self.parse_type()?;
            if self.check(TokenKind::RightParen) {
                return Ok(params);
            }
            params.push(self.parse_parameter(base)?);
            if !self.match_token(TokenKind::Comma)? {
                return Ok(params);
            }
        }

        loop {
            let base = self.parse_type()?;
            params.push(self.parse_parameter(base)?);
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }
        Ok(params)
    }

    fn parse_parameter(&mut self, mut ty: Type) -> Result<VarRef> {
        while self.match_token(TokenKind::Star)? {
            ty = Type::Pointer(Box::new(ty));
        }
        let name_span = self.current.span;
        let name = Symbol::intern(&self.consume_identifier("Expected parameter name")?);
        while self.match_token(TokenKind::LeftBracket)? {
            if !self.check(TokenKind::RightBracket) {
                self.parse_expression()?;
            }
            self.consume(TokenKind::RightBracket, "Expected ']'")?;
            ty = Type::Pointer(Box::new(ty));
        }
        Ok(self.declare(name, ty, name_span))
    }

    fn parse_type(&mut self) -> Result<Type> {
        let mut ty = match self.current.kind {
            TokenKind::Void => Type::Void,
            TokenKind::Char => Type::Char,
            TokenKind::Short => Type::Short,
            TokenKind::Int => Type::Int,
            TokenKind::Long => Type::Long,
            TokenKind::FloatType => Type::Float,
            TokenKind::Double => Type::Double,
            TokenKind::Bool => Type::Bool,
            _ => return Err(self.error("Expected a type", ParseErrorKind::ExpectedType)),
        };
        self.advance()?;
        // `long long` and `long int` are still `long`.
        if ty == Type::Long {
            while self.check(TokenKind::Long) || self.check(TokenKind::Int) {
                self.advance()?;
            }
        }
        while self.match_token(TokenKind::Star)? {
            ty = Type::Pointer(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.current.span;
        self.consume(TokenKind::LeftBrace, "Expected '{'")?;
        self.scopes.push_scope();

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let before = self.current.span;
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.record(e);
                    self.synchronize_statement(before);
                }
            }
        }

        self.scopes.pop_scope();
        self.consume(TokenKind::RightBrace, "Expected '}'")?;

        Ok(Block {
            statements,
            span: start.merge(&self.previous.span),
        })
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let attributes = self.parse_attributes()?;
        let start = self.current.span;

        let kind = match self.current.kind {
            TokenKind::For => return self.parse_for_statement(attributes),
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Semicolon => {
                self.advance()?;
                StmtKind::Empty
            }
            kind if kind.is_type() => self.parse_declaration()?,
            _ => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::Semicolon, "Expected ';' after expression")?;
                StmtKind::Expression(expr)
            }
        };

        Ok(Stmt::new(kind, start.merge(&self.previous.span)).with_attributes(attributes))
    }

    /// `for (init; check; update [; @attr...]) body`
    ///
    /// The header opens a scope so the iterator is only visible to the loop.
    fn parse_for_statement(&mut self, mut attributes: Vec<Attribute>) -> Result<Stmt> {
        let start = self.current.span;
        self.consume(TokenKind::For, "Expected 'for'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        self.scopes.push_scope();
        let result = self.parse_for_rest(&mut attributes);
        self.scopes.pop_scope();
        let for_stmt = result?;

        Ok(Stmt::new(StmtKind::For(for_stmt), start.merge(&self.previous.span)).with_attributes(attributes))
    }

    fn parse_for_rest(&mut self, attributes: &mut Vec<Attribute>) -> Result<ForStmt> {
        let init_start = self.current.span;
        let init = if self.check(TokenKind::Semicolon) {
            self.advance()?;
            Stmt::new(StmtKind::Empty, init_start)
        } else if self.current.kind.is_type() {
            let kind = self.parse_declaration()?;
            Stmt::new(kind, init_start.merge(&self.previous.span))
        } else {
            let expr = self.parse_expression()?;
            let span = expr.span;
            self.consume(TokenKind::Semicolon, "Expected ';' after for-loop init")?;
            Stmt::new(StmtKind::Expression(expr), span)
        };

        let check = if self.check(TokenKind::Semicolon) {
            Stmt::new(StmtKind::Empty, self.current.span)
        } else {
            let expr = self.parse_expression()?;
            let span = expr.span;
            Stmt::new(StmtKind::Expression(expr), span)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after for-loop condition")?;

        let update = if self.check(TokenKind::RightParen) || self.check(TokenKind::Semicolon) {
            Stmt::new(StmtKind::Empty, self.current.span)
        } else {
            let expr = self.parse_expression()?;
            let span = expr.span;
            Stmt::new(StmtKind::Expression(expr), span)
        };

        if self.match_token(TokenKind::Semicolon)? {
            attributes.extend(self.parse_attributes()?);
        }
        self.consume(TokenKind::RightParen, "Expected ')' after for-loop header")?;

        let body = self.parse_statement()?;

        Ok(ForStmt {
            init: Box::new(init),
            check: Box::new(check),
            update: Box::new(update),
            body: Box::new(body),
        })
    }

    fn parse_if_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::If, "Expected 'if'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If { condition, then_branch, else_branch })
    }

    fn parse_while_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::While, "Expected 'while'")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::While { condition, body })
    }

    fn parse_return_statement(&mut self) -> Result<StmtKind> {
        self.consume(TokenKind::Return, "Expected 'return'")?;
        let value = if !self.check(TokenKind::Semicolon) { Some(self.parse_expression()?) } else { None };
        self.consume(TokenKind::Semicolon, "Expected ';' after return")?;
        Ok(StmtKind::Return(value))
    }

    /// `type declarator (, declarator)* ;`
    ///
    /// Each declarator is visible to the initializers that follow it.
    fn parse_declaration(&mut self) -> Result<StmtKind> {
        let base = self.parse_type()?;
        let mut decls = Vec::new();

        loop {
            let start = self.current.span;
            let mut ty = base.clone();
            while self.match_token(TokenKind::Star)? {
                ty = Type::Pointer(Box::new(ty));
            }
            let name_span = self.current.span;
            let name = Symbol::intern(&self.consume_identifier("Expected variable name")?);
            while self.match_token(TokenKind::LeftBracket)? {
                self.parse_expression()?;
                self.consume(TokenKind::RightBracket, "Expected ']' after array size")?;
                ty = Type::Pointer(Box::new(ty));
            }

            let value = if self.match_token(TokenKind::Equal)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            let var = self.declare(name, ty, name_span);
            decls.push(VarDecl { var, value, span: start.merge(&self.previous.span) });

            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }

        self.consume(TokenKind::Semicolon, "Expected ';' after declaration")?;
        Ok(StmtKind::Declaration(decls))
    }

    fn declare(&mut self, name: Symbol, ty: Type, span: Span) -> VarRef {
        let (var, duplicate) = self.scopes.declare(&mut self.vars, name, ty, span);
        if duplicate {
            self.errors.push(ParseError {
                message: format!("Redefinition of '{}'", name),
                span,
                kind: ParseErrorKind::InvalidSyntax,
                found: None,
            });
        }
        var
    }

    // Expression parsing with C precedence

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment_expr()
    }

    fn parse_assignment_expr(&mut self) -> Result<Expr> {
        let left = self.parse_or_expr()?;
        let op = match self.current.kind {
            TokenKind::Equal => BinaryOp::Assign,
            TokenKind::PlusEqual => BinaryOp::AddAssign,
            TokenKind::MinusEqual => BinaryOp::SubAssign,
            TokenKind::StarEqual => BinaryOp::MulAssign,
            TokenKind::SlashEqual => BinaryOp::DivAssign,
            _ => return Ok(left),
        };
        self.advance()?;
        let right = self.parse_assignment_expr()?;
        let span = left.span.merge(&right.span);
        Ok(Expr::binary(op, left, right, span))
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.match_token(TokenKind::PipePipe)? {
            let right = self.parse_and_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(BinaryOp::Or, left, right, span);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality_expr()?;
        while self.match_token(TokenKind::AmpAmp)? {
            let right = self.parse_equality_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(BinaryOp::And, left, right, span);
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqualEqual => BinaryOp::Eq,
                TokenKind::BangEqual => BinaryOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_comparison_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(op, left, right, span);
        }
        Ok(left)
    }

    fn parse_comparison_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Less => BinaryOp::Lt,
                TokenKind::LessEqual => BinaryOp::Le,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::GreaterEqual => BinaryOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(op, left, right, span);
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(op, left, right, span);
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expr()?;
            let span = left.span.merge(&right.span);
            left = Expr::binary(op, left, right, span);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr> {
        let start = self.current.span;
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::PlusPlus => UnaryOp::Increment,
            TokenKind::MinusMinus => UnaryOp::Decrement,
            _ => return self.parse_postfix_expr(),
        };
        self.advance()?;
        let value = self.parse_unary_expr()?;
        let span = start.merge(&value.span);
        Ok(Expr::new(ExprKind::LeftUnary { op, value: Box::new(value) }, span))
    }

    fn parse_postfix_expr(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::PlusPlus => UnaryOp::Increment,
                TokenKind::MinusMinus => UnaryOp::Decrement,
                TokenKind::LeftBracket => {
                    self.advance()?;
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket, "Expected ']'")?;
                    let span = expr.span.merge(&self.previous.span);
                    expr = Expr::new(
                        ExprKind::Subscript { array: Box::new(expr), index: Box::new(index) },
                        span,
                    );
                    continue;
                }
                _ => break,
            };
            self.advance()?;
            let span = expr.span.merge(&self.previous.span);
            expr = Expr::new(ExprKind::RightUnary { op, value: Box::new(expr) }, span);
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr> {
        let start = self.current.span;

        match self.current.kind {
            TokenKind::Integer => {
                let value: i64 = self.current.lexeme.parse()
                    .map_err(|_| self.error("Invalid integer literal", ParseErrorKind::InvalidSyntax))?;
                self.advance()?;
                Ok(Expr::int_lit(value, start))
            }
            TokenKind::Float => {
                let text = self.current.lexeme.trim_end_matches(['f', 'F']);
                let value: f64 = text.parse()
                    .map_err(|_| self.error("Invalid float literal", ParseErrorKind::InvalidSyntax))?;
                self.advance()?;
                Ok(Expr::new(ExprKind::Primitive(Primitive::Float(value)), start))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(TokenKind::True);
                self.advance()?;
                Ok(Expr::new(ExprKind::Primitive(Primitive::Bool(value)), start))
            }
            TokenKind::Identifier => {
                let name = Symbol::intern(&self.current.lexeme);
                self.advance()?;
                if self.match_token(TokenKind::LeftParen)? {
                    let args = self.parse_args()?;
                    self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
                    Ok(Expr::new(ExprKind::Call { function: name, args }, start.merge(&self.previous.span)))
                } else {
                    let var = self.scopes.resolve_or_declare(&mut self.vars, name, start);
                    Ok(Expr::var(var, start))
                }
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')'")?;
                Ok(Expr::new(ExprKind::Parentheses(Box::new(inner)), start.merge(&self.previous.span)))
            }
            _ => Err(self.error("Expected an expression", ParseErrorKind::ExpectedExpression)),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_assignment_expr()?);
                if !self.match_token(TokenKind::Comma)? { break; }
            }
        }
        Ok(args)
    }

    // Helper methods
    fn check(&self, kind: TokenKind) -> bool { self.current.kind == kind }
    fn is_at_end(&self) -> bool { self.current.kind == TokenKind::Eof }

    fn advance(&mut self) -> Result<&Token> {
        let next = self.lexer.next_token()?;
        self.previous = std::mem::replace(&mut self.current, next);
        Ok(&self.previous)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.error(&format!("{}: expected {}", message, kind), ParseErrorKind::UnexpectedToken))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> Result<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current.lexeme.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.error(message, ParseErrorKind::UnexpectedToken))
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<bool> {
        if self.check(kind) { self.advance()?; Ok(true) } else { Ok(false) }
    }

    fn error(&self, message: &str, kind: ParseErrorKind) -> anyhow::Error {
        ParseError {
            message: message.to_string(),
            span: self.current.span,
            kind,
            found: Some(self.current.kind.to_string()),
        }
        .into()
    }

    fn record(&mut self, error: anyhow::Error) {
        match error.downcast::<ParseError>() {
            Ok(parse_error) => self.errors.push(parse_error),
            Err(other) => self.errors.push(ParseError {
                message: other.to_string(),
                span: self.current.span,
                kind: ParseErrorKind::InvalidSyntax,
                found: None,
            }),
        }
    }

    /// Skip to the start of the next function.
    fn synchronize(&mut self) {
        if !self.is_at_end() && self.advance().is_err() {
            self.skip_to_end();
            return;
        }
        while !self.is_at_end() {
            if self.previous.kind == TokenKind::RightBrace && (self.check(TokenKind::At) || self.current.kind.is_type()) {
                return;
            }
            if self.advance().is_err() {
                self.skip_to_end();
                return;
            }
        }
    }

    /// Skip to the end of the current statement. A statement that failed on
    /// its first token (still at `start`) always loses that token.
    fn synchronize_statement(&mut self, start: Span) {
        if self.current.span == start && !self.is_at_end() && !self.check(TokenKind::RightBrace) {
            if self.advance().is_err() {
                self.skip_to_end();
                return;
            }
        }
        while !self.is_at_end() && !self.check(TokenKind::RightBrace) {
            if self.previous.kind == TokenKind::Semicolon { return; }
            if matches!(self.current.kind, TokenKind::For | TokenKind::If | TokenKind::While | TokenKind::Return) {
                return;
            }
            if self.advance().is_err() {
                self.skip_to_end();
                return;
            }
        }
    }

    /// Lexer failures are unrecoverable: stop at a synthetic EOF.
    fn skip_to_end(&mut self) {
        self.current = Token::new(TokenKind::Eof, self.current.span, String::new());
    }
}
