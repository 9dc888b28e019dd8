//! Recursive-descent parser.
//!
//! Grammar productions run inside savepoints: entering a production records
//! the lexer position, and the savepoint commits only when the production
//! returns a node. A production that returns `None` rolls the lexer back,
//! which is how speculative parsing works without a backtracking stack.
//!
//! Error state is sticky: the first [`ParseError`] raised wins and later
//! ones are suppressed. Reaching the end of input with the whole program
//! consumed clears any error left over from speculation that ultimately
//! succeeded.
//!
//! Unary `-`/`+` maintain a sign context around their operand parse. Binary
//! `+`/`-` tokens parsed inside a negated context are flipped when the
//! `BinOp` node is built, which is what makes the right-leaning binop climb
//! arithmetically left-associative: `1 - 2 - 3` builds `Sub(1, Add(2, 3))`.

use crate::{
    ast::{Ast, AstKind, BinOpKind, FunctionParts, NodeId, ObjectParts, UnOpKind},
    error::ParseError,
    lexer::{Lexer, Token, TokenKind},
};

/// Maximum expression nesting before the parser refuses the input. Keeps
/// deeply nested sources from overflowing the stack.
pub const MAX_NESTING_DEPTH: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Normal,
    Negated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Termination {
    SkipTrailingCr,
    LeaveTrailingCr,
}

/// Parses a source buffer into an [`Ast`] rooted in a synthetic top-level
/// function literal.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    Parser::new(source).run()
}

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    ast: Ast,
    error: Option<ParseError>,
    sign: Sign,
    depth: u16,
}

impl<'src> Parser<'src> {
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
            ast: Ast::new(),
            error: None,
            sign: Sign::Normal,
            depth: 0,
        }
    }

    pub fn run(mut self) -> Result<Ast, ParseError> {
        let root = self
            .ast
            .alloc(AstKind::FunctionLiteral(Box::default()), 0);
        self.ast.set_root(root);

        while let Some(stmt) = self.parse_statement(Termination::SkipTrailingCr) {
            self.ast.node_mut(root).children.push(stmt);
        }

        // A parse that consumed the whole input is successful; clear any
        // error left behind by speculation.
        if self.peek().is(TokenKind::End) {
            self.error = None;
        }

        match self.error {
            Some(error) => Err(error),
            None => Ok(self.ast),
        }
    }

    fn peek(&mut self) -> Token {
        self.lexer.peek()
    }

    fn skip(&mut self) {
        self.lexer.skip();
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Records the first error only; later calls are suppressed until the
    /// parse completes.
    fn set_error(&mut self, message: &'static str) {
        if self.error.is_none() {
            let offset = self.peek().offset;
            self.error = Some(ParseError::new(message, offset));
        }
    }

    /// Runs a production inside a savepoint. `None` rolls the lexer back to
    /// where the production started.
    fn pos<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.lexer.checkpoint();
        let result = f(self);
        if result.is_none() {
            self.lexer.rewind(checkpoint);
        }
        result
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self, term: Termination) -> Option<NodeId> {
        self.pos(|p| {
            // Leading statement separators are silently consumed; this is
            // what makes `{\n stmts \n}` work.
            while p.at(TokenKind::Cr) {
                p.skip();
            }

            let start = p.peek().offset;
            let result = match p.peek().kind {
                TokenKind::Return => {
                    p.skip();
                    let node = p.ast.alloc(AstKind::Return, start);
                    let value = match p.parse_expression(0) {
                        Some(value) => value,
                        None => p.ast.alloc(AstKind::Nil, start),
                    };
                    p.ast.node_mut(node).children.push(value);
                    Some(node)
                }
                TokenKind::Break => {
                    p.skip();
                    Some(p.ast.alloc(AstKind::Break, start))
                }
                TokenKind::Continue => {
                    p.skip();
                    Some(p.ast.alloc(AstKind::Continue, start))
                }
                TokenKind::If => p.parse_if(start),
                TokenKind::While => p.parse_while(start),
                TokenKind::BraceOpen => p.parse_block(None),
                _ => p.parse_expression(0),
            };

            let tail = p.peek();
            if !tail.is(TokenKind::End)
                && !tail.is(TokenKind::Cr)
                && !tail.is(TokenKind::BraceClose)
            {
                p.set_error("Expected CR, EOF, or '}' after statement");
                return None;
            }
            if term == Termination::SkipTrailingCr && p.at(TokenKind::Cr) {
                p.skip();
            }

            result
        })
    }

    fn parse_if(&mut self, start: u32) -> Option<NodeId> {
        self.skip();

        if !self.at(TokenKind::ParenOpen) {
            self.set_error("Expected '(' before if's condition");
            return None;
        }
        self.skip();

        let Some(cond) = self.parse_expression(0) else {
            self.set_error("Expected if's condition");
            return None;
        };

        if !self.at(TokenKind::ParenClose) {
            self.set_error("Expected ')' after if's condition");
            return None;
        }
        self.skip();

        let body = if self.at(TokenKind::BraceOpen) {
            self.parse_block(None)
        } else {
            self.parse_statement(Termination::LeaveTrailingCr)
        };
        let Some(body) = body else {
            self.set_error("Expected if's body");
            return None;
        };

        let mut else_body = None;
        if self.at(TokenKind::Else) {
            self.skip();
            else_body = if self.at(TokenKind::BraceOpen) {
                self.parse_block(None)
            } else {
                self.parse_statement(Termination::LeaveTrailingCr)
            };
            if else_body.is_none() {
                self.set_error("Expected else's body");
                return None;
            }
        }

        let node = self.ast.alloc(AstKind::If, start);
        self.ast.node_mut(node).children.push(cond);
        self.ast.node_mut(node).children.push(body);
        if let Some(else_body) = else_body {
            self.ast.node_mut(node).children.push(else_body);
        }
        Some(node)
    }

    fn parse_while(&mut self, start: u32) -> Option<NodeId> {
        self.skip();

        if !self.at(TokenKind::ParenOpen) {
            self.set_error("Expected '(' before while's condition");
            return None;
        }
        self.skip();

        let Some(cond) = self.parse_expression(0) else {
            self.set_error("Expected while's condition");
            return None;
        };

        if !self.at(TokenKind::ParenClose) {
            self.set_error("Expected ')' after while's condition");
            return None;
        }
        self.skip();

        let body = self.parse_block(None)?;

        let node = self.ast.alloc(AstKind::While, start);
        self.ast.node_mut(node).children.push(cond);
        self.ast.node_mut(node).children.push(body);
        Some(node)
    }

    /// Parses a braced statement list. With `fn_node` set, the statements
    /// become the function's body instead of a fresh `Block` node.
    fn parse_block(&mut self, fn_node: Option<NodeId>) -> Option<NodeId> {
        if !self.at(TokenKind::BraceOpen) {
            self.set_error("Expected '{'");
            return None;
        }

        self.pos(|p| {
            let start = p.peek().offset;
            p.skip();

            let block = match fn_node {
                Some(node) => node,
                None => p.ast.alloc(AstKind::Block, start),
            };

            while !p.at(TokenKind::End) && !p.at(TokenKind::BraceClose) {
                match p.parse_statement(Termination::SkipTrailingCr) {
                    Some(stmt) => p.ast.node_mut(block).children.push(stmt),
                    None => {
                        p.set_error("Expected statement after '{'");
                        break;
                    }
                }
            }
            if !p.at(TokenKind::BraceClose) {
                return None;
            }
            p.skip();

            // Later passes may assume bodies are non-empty.
            if p.ast.node(block).children.is_empty() {
                let nop = p.ast.alloc(AstKind::Nop, start);
                p.ast.node_mut(block).children.push(nop);
            }

            Some(block)
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expression(&mut self, priority: u8) -> Option<NodeId> {
        if self.depth >= MAX_NESTING_DEPTH {
            self.set_error("Expression nesting too deep");
            return None;
        }
        self.depth += 1;
        let result = self.parse_expression_inner(priority);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, priority: u8) -> Option<NodeId> {
        self.pos(|p| {
            let head = p.peek().kind;
            let member = match head {
                TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::Not
                | TokenKind::Add
                | TokenKind::Sub => p.parse_prefix_unop(head),
                TokenKind::BraceOpen => p.parse_object_literal(),
                TokenKind::ArrayOpen => p.parse_array_literal(),
                TokenKind::Typeof
                | TokenKind::Sizeof
                | TokenKind::Keysof
                | TokenKind::Delete
                | TokenKind::Clone => p.parse_keyword_prefix(head),
                _ => p.parse_member(),
            };

            // Assignment binds a full expression on the right, which makes
            // `a = b = c` nest naturally.
            let result = if p.at(TokenKind::Assign) {
                let Some(member) = member else {
                    p.set_error("Expected lhs before '='");
                    return None;
                };
                p.skip();
                let Some(value) = p.parse_expression(0) else {
                    p.set_error("Expected rhs after '='");
                    return None;
                };
                let node = p.ast.alloc(AstKind::Assign, p.ast.node(member).offset);
                p.ast.node_mut(node).children.push(member);
                p.ast.node_mut(node).children.push(value);
                Some(node)
            } else {
                member
            };
            let mut result = result?;

            // Postfix increment and decrement, applied once.
            match p.peek().kind {
                TokenKind::Inc => {
                    p.skip();
                    result = p.wrap_unop(UnOpKind::PostInc, result);
                }
                TokenKind::Dec => {
                    p.skip();
                    result = p.wrap_unop(UnOpKind::PostDec, result);
                }
                _ => {}
            }

            // Binary operators by priority. A pass walks the levels from
            // the requested one down to the tightest; the loop repeats while
            // anything was consumed, which lets lower levels pick up after a
            // tighter parse completed.
            loop {
                let initial = result;
                for level in priority.max(1)..=6 {
                    let t = p.peek().kind;
                    if binop_level(t) == Some(level) {
                        match p.parse_binop(t, result, level) {
                            Some(node) => result = node,
                            None => {
                                p.set_error("Failed to parse binary operation");
                                return None;
                            }
                        }
                    }
                }
                if result == initial {
                    break;
                }
            }

            Some(result)
        })
    }

    fn wrap_unop(&mut self, op: UnOpKind, operand: NodeId) -> NodeId {
        let node = self
            .ast
            .alloc(AstKind::UnOp(op), self.ast.node(operand).offset);
        self.ast.node_mut(node).children.push(operand);
        node
    }

    fn parse_prefix_unop(&mut self, token: TokenKind) -> Option<NodeId> {
        self.pos(|p| {
            let start = p.peek().offset;
            p.skip();

            let saved = p.sign;
            p.enter_sign(token);
            let expr = p.parse_expression(7);
            p.sign = saved;

            let Some(expr) = expr else {
                p.set_error("Expected expression after unary operation");
                return None;
            };

            let op = match p.negate_token(token) {
                TokenKind::Inc => UnOpKind::PreInc,
                TokenKind::Dec => UnOpKind::PreDec,
                TokenKind::Not => UnOpKind::Not,
                TokenKind::Add => UnOpKind::Plus,
                TokenKind::Sub => UnOpKind::Minus,
                _ => return None,
            };
            let node = p.ast.alloc(AstKind::UnOp(op), start);
            p.ast.node_mut(node).children.push(expr);
            Some(node)
        })
    }

    fn parse_binop(&mut self, token: TokenKind, lhs: NodeId, level: u8) -> Option<NodeId> {
        self.pos(|p| {
            p.skip();

            let saved = p.sign;
            p.enter_sign(token);
            let rhs = p.parse_expression(level);
            p.sign = saved;

            let Some(rhs) = rhs else {
                p.set_error("Expected rhs for binary operation");
                return None;
            };

            let op = binop_kind(p.negate_token(token))?;
            let node = p.ast.alloc(AstKind::BinOp(op), p.ast.node(lhs).offset);
            p.ast.node_mut(node).children.push(lhs);
            p.ast.node_mut(node).children.push(rhs);
            Some(node)
        })
    }

    fn parse_keyword_prefix(&mut self, token: TokenKind) -> Option<NodeId> {
        self.pos(|p| {
            let start = p.peek().offset;
            let kind = match token {
                TokenKind::Typeof => AstKind::Typeof,
                TokenKind::Sizeof => AstKind::Sizeof,
                TokenKind::Keysof => AstKind::Keysof,
                TokenKind::Delete => AstKind::Delete,
                TokenKind::Clone => AstKind::Clone,
                _ => return None,
            };
            p.skip();

            let Some(expr) = p.parse_expression(7) else {
                p.set_error("Expected body of prefix operation");
                return None;
            };

            let node = p.ast.alloc(kind, start);
            p.ast.node_mut(node).children.push(expr);
            Some(node)
        })
    }

    fn parse_primary(&mut self) -> Option<NodeId> {
        self.pos(|p| {
            let token = p.peek();
            let kind = match token.kind {
                TokenKind::Name => AstKind::Name,
                TokenKind::Number => AstKind::Number,
                TokenKind::String => AstKind::String,
                TokenKind::True => AstKind::True,
                TokenKind::False => AstKind::False,
                TokenKind::Nil => AstKind::Nil,
                TokenKind::ParenOpen => {
                    p.skip();
                    let expr = p.parse_expression(0);
                    if !p.at(TokenKind::ParenClose) {
                        p.set_error("Expected closing paren for primary expression");
                        return None;
                    }
                    p.skip();
                    // A grouped expression must not capture a following
                    // block as a function body.
                    if p.at(TokenKind::BraceOpen) {
                        p.set_error("Unexpected '{' after expression in parens");
                        return None;
                    }
                    return expr;
                }
                _ => return None,
            };

            let node = p.ast.alloc(kind, token.offset);
            p.ast.node_mut(node).length = token.length;
            p.skip();
            Some(node)
        })
    }

    fn parse_member(&mut self) -> Option<NodeId> {
        self.pos(|p| {
            let mut result = p.parse_primary();

            loop {
                let token = p.peek();
                if token.is(TokenKind::End) || token.is(TokenKind::Cr) {
                    break;
                }
                match token.kind {
                    TokenKind::ParenOpen => {
                        result = p.parse_call_or_declaration(result, false);
                        if result.is_none() {
                            break;
                        }
                    }
                    TokenKind::Colon => {
                        let Some(recv) = result else {
                            p.set_error("Unexpected ':'");
                            break;
                        };
                        p.skip();
                        let name = p.peek();
                        if !name.is(TokenKind::Name) {
                            p.set_error("Expected method name after ':'");
                            result = None;
                            break;
                        }
                        let prop = p.ast.alloc(AstKind::Property, name.offset);
                        p.ast.node_mut(prop).length = name.length;
                        p.skip();
                        if !p.at(TokenKind::ParenOpen) {
                            p.set_error("Expected '(' after method name");
                            result = None;
                            break;
                        }
                        let member = p
                            .ast
                            .alloc(AstKind::Member { computed: false }, p.ast.node(recv).offset);
                        p.ast.node_mut(member).children.push(recv);
                        p.ast.node_mut(member).children.push(prop);
                        result = p.parse_call_or_declaration(Some(member), true);
                        if result.is_none() {
                            break;
                        }
                    }
                    TokenKind::Dot => {
                        let Some(recv) = result else {
                            p.set_error("Unexpected '.' or '['");
                            break;
                        };
                        p.skip();
                        let Some(next) = p.parse_primary() else {
                            break;
                        };
                        if matches!(p.ast.node(next).kind, AstKind::Name) {
                            p.ast.node_mut(next).kind = AstKind::Property;
                        }
                        let member = p
                            .ast
                            .alloc(AstKind::Member { computed: false }, p.ast.node(recv).offset);
                        p.ast.node_mut(member).children.push(recv);
                        p.ast.node_mut(member).children.push(next);
                        result = Some(member);
                    }
                    TokenKind::ArrayOpen => {
                        let Some(recv) = result else {
                            p.set_error("Unexpected '.' or '['");
                            break;
                        };
                        p.skip();
                        let mut next = p.parse_expression(0);
                        if p.at(TokenKind::ArrayClose) {
                            p.skip();
                        } else {
                            next = None;
                        }
                        let Some(next) = next else {
                            break;
                        };
                        let member = p
                            .ast
                            .alloc(AstKind::Member { computed: true }, p.ast.node(recv).offset);
                        p.ast.node_mut(member).children.push(recv);
                        p.ast.node_mut(member).children.push(next);
                        result = Some(member);
                    }
                    _ => break,
                }
            }

            result
        })
    }

    /// Parses `(` argument list `)` with an optional body, unifying calls
    /// and function declarations in one staging node, then validates which
    /// of the two it actually is.
    fn parse_call_or_declaration(&mut self, callee: Option<NodeId>, method: bool) -> Option<NodeId> {
        let paren = self.peek().offset;
        let fn_node = self.ast.alloc(
            AstKind::FunctionLiteral(Box::new(FunctionParts {
                name: callee,
                params: Vec::new(),
                method,
            })),
            paren,
        );
        self.skip();

        while !self.at(TokenKind::ParenClose) && !self.at(TokenKind::End) {
            let Some(mut expr) = self.parse_expression(0) else {
                break;
            };
            if self.at(TokenKind::Ellipsis) {
                self.skip();
                expr = self.wrap_vararg(expr);
            }
            if let AstKind::FunctionLiteral(parts) = &mut self.ast.node_mut(fn_node).kind {
                parts.params.push(expr);
            }
            if self.at(TokenKind::Comma) {
                self.skip();
            }
        }
        if !self.at(TokenKind::ParenClose) {
            self.set_error("Failed to parse function's arguments");
            return None;
        }
        self.skip();

        // Optional body turns the call into a declaration.
        if self.at(TokenKind::BraceOpen) {
            self.parse_block(Some(fn_node));
        }

        if !self.check_declaration(fn_node) {
            self.set_error("Incorrect function declaration or call");
            return None;
        }

        Some(self.end_function(fn_node))
    }

    fn wrap_vararg(&mut self, inner: NodeId) -> NodeId {
        let node = self
            .ast
            .alloc(AstKind::VarArg, self.ast.node(inner).offset);
        self.ast.node_mut(node).children.push(inner);
        node
    }

    /// A declaration needs simple names for every parameter (a trailing
    /// rest parameter counts) and a simple name (or nothing) as the
    /// declared target; a call needs a callee and must not carry a body.
    fn check_declaration(&mut self, fn_node: NodeId) -> bool {
        let node = self.ast.node(fn_node);
        let AstKind::FunctionLiteral(parts) = &node.kind else {
            return false;
        };
        let has_body = !node.children.is_empty();

        if !has_body {
            return parts.name.is_some();
        }
        if parts.method {
            return false;
        }
        if let Some(name) = parts.name {
            if !matches!(self.ast.node(name).kind, AstKind::Name) {
                return false;
            }
        }
        let params = parts.params.clone();
        let last = params.len().wrapping_sub(1);
        for (i, &param) in params.iter().enumerate() {
            match &self.ast.node(param).kind {
                AstKind::Name => {}
                AstKind::VarArg if i == last => {
                    let inner = self.ast.node(param).children[0];
                    if !matches!(self.ast.node(inner).kind, AstKind::Name) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Seals the staging node: declarations stay `FunctionLiteral`, a
    /// body-less one becomes a `Call` with `[callee, args...]` children.
    fn end_function(&mut self, fn_node: NodeId) -> NodeId {
        let end = self.peek().offset;
        let node = self.ast.node_mut(fn_node);
        node.length = end.saturating_sub(node.offset);

        let has_body = !node.children.is_empty();
        if has_body {
            return fn_node;
        }

        let AstKind::FunctionLiteral(parts) =
            std::mem::replace(&mut node.kind, AstKind::Nop)
        else {
            return fn_node;
        };
        let node = self.ast.node_mut(fn_node);
        node.kind = AstKind::Call {
            method: parts.method,
        };
        if let Some(callee) = parts.name {
            node.children.push(callee);
        }
        node.children.extend(parts.params);
        fn_node
    }

    fn parse_object_literal(&mut self) -> Option<NodeId> {
        self.pos(|p| {
            let start = p.peek().offset;
            p.skip();

            let mut parts = ObjectParts::default();
            while !p.at(TokenKind::BraceClose) && !p.at(TokenKind::End) {
                let token = p.peek();
                let key = match token.kind {
                    TokenKind::String | TokenKind::Name | TokenKind::Number => {
                        let key = p.ast.alloc(AstKind::Property, token.offset);
                        p.ast.node_mut(key).length = token.length;
                        p.skip();
                        key
                    }
                    _ => {
                        p.set_error("Expected string or number as object literal's key");
                        return None;
                    }
                };

                if !p.at(TokenKind::Colon) {
                    p.set_error("Expected colon after object literal's key");
                    return None;
                }
                p.skip();

                let Some(value) = p.parse_expression(0) else {
                    p.set_error("Expected expression after colon");
                    return None;
                };

                parts.keys.push(key);
                parts.values.push(value);

                if p.at(TokenKind::Comma) {
                    p.skip();
                } else if !p.at(TokenKind::BraceClose) {
                    p.set_error("Expected '}' or ','");
                    return None;
                }
            }

            if !p.at(TokenKind::BraceClose) {
                p.set_error("Expected '}'");
                return None;
            }
            p.skip();

            Some(p.ast.alloc(AstKind::ObjectLiteral(Box::new(parts)), start))
        })
    }

    fn parse_array_literal(&mut self) -> Option<NodeId> {
        self.pos(|p| {
            let start = p.peek().offset;
            p.skip();

            let node = p.ast.alloc(AstKind::ArrayLiteral, start);
            while !p.at(TokenKind::ArrayClose) && !p.at(TokenKind::End) {
                let Some(value) = p.parse_expression(0) else {
                    p.set_error("Expected expression after array literal's start");
                    return None;
                };
                p.ast.node_mut(node).children.push(value);

                if p.at(TokenKind::Comma) {
                    p.skip();
                } else if !p.at(TokenKind::ArrayClose) {
                    p.set_error("Expected ']' or ','");
                    return None;
                }
            }

            if !p.at(TokenKind::ArrayClose) {
                p.set_error("Expected ']'");
                return None;
            }
            p.skip();

            Some(node)
        })
    }

    // ------------------------------------------------------------------
    // Sign context
    // ------------------------------------------------------------------

    fn enter_sign(&mut self, token: TokenKind) {
        if self.sign == Sign::Normal && token == TokenKind::Sub {
            self.sign = Sign::Negated;
        } else if self.sign == Sign::Negated && token == TokenKind::Add {
            self.sign = Sign::Normal;
        }
    }

    fn negate_token(&self, token: TokenKind) -> TokenKind {
        if self.sign == Sign::Normal {
            return token;
        }
        match token {
            TokenKind::Add => TokenKind::Sub,
            TokenKind::Sub => TokenKind::Add,
            _ => token,
        }
    }
}

fn binop_level(token: TokenKind) -> Option<u8> {
    Some(match token {
        TokenKind::LOr | TokenKind::LAnd => 1,
        TokenKind::Eq | TokenKind::Ne | TokenKind::StrictEq | TokenKind::StrictNe => 2,
        TokenKind::Lt | TokenKind::Gt | TokenKind::Le | TokenKind::Ge => 3,
        TokenKind::BOr | TokenKind::BAnd | TokenKind::BXor => 4,
        TokenKind::Add | TokenKind::Sub => 5,
        TokenKind::Mul | TokenKind::Div => 6,
        _ => return None,
    })
}

fn binop_kind(token: TokenKind) -> Option<BinOpKind> {
    Some(match token {
        TokenKind::Add => BinOpKind::Add,
        TokenKind::Sub => BinOpKind::Sub,
        TokenKind::Mul => BinOpKind::Mul,
        TokenKind::Div => BinOpKind::Div,
        TokenKind::BAnd => BinOpKind::BAnd,
        TokenKind::BOr => BinOpKind::BOr,
        TokenKind::BXor => BinOpKind::BXor,
        TokenKind::LAnd => BinOpKind::LAnd,
        TokenKind::LOr => BinOpKind::LOr,
        TokenKind::Eq => BinOpKind::Eq,
        TokenKind::Ne => BinOpKind::Ne,
        TokenKind::StrictEq => BinOpKind::StrictEq,
        TokenKind::StrictNe => BinOpKind::StrictNe,
        TokenKind::Lt => BinOpKind::Lt,
        TokenKind::Gt => BinOpKind::Gt,
        TokenKind::Le => BinOpKind::Le,
        TokenKind::Ge => BinOpKind::Ge,
        _ => return None,
    })
}
