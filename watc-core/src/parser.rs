use crate::ast::{
    AssignOp, BinaryOp, Block, Expr, ExprKind, FunctionDecl, Ident, Param, Program, Stmt, TypeName, UnaryOp,
};
use crate::error::CoreError;
use crate::lexer::{Token, TokenKind, tokenize};
use crate::span::Span;

/// Lex and parse `input` into a [`Program`].
pub fn parse(input: &str) -> Result<Program, CoreError> {
    parse_tokens(tokenize(input))
}

/// Parse an already lexed token stream.
pub fn parse_tokens<'src, I>(tokens: I) -> Result<Program, CoreError>
where
    I: Iterator<Item = Result<Token<'src>, CoreError>>,
{
    let mut parser = Parser::new(tokens)?;
    parser.parse_program()
}

/// Deepest expression tree the parser builds. Resolution and code
/// generation recurse over expressions, one frame per level.
pub const MAX_EXPR_DEPTH: usize = 256;

struct Parser<'src, I> {
    tokens: I,
    current: Token<'src>,
    /// Open parentheses, negations and assignments around the token
    /// being parsed.
    nesting: usize,
}

impl<'src, I> Parser<'src, I>
where
    I: Iterator<Item = Result<Token<'src>, CoreError>>,
{
    fn new(mut tokens: I) -> Result<Self, CoreError> {
        let current = next_or_eof(&mut tokens, 0)?;
        Ok(Parser {
            tokens,
            current,
            nesting: 0,
        })
    }

    fn parse_program(&mut self) -> Result<Program, CoreError> {
        let mut functions = Vec::new();
        while self.current.kind != TokenKind::Eof {
            functions.push(self.parse_function()?);
        }
        Ok(Program { functions })
    }

    fn parse_function(&mut self) -> Result<FunctionDecl, CoreError> {
        let start = self.current.span;
        let exported = self.eat(TokenKind::Export)?;
        self.expect(TokenKind::Fn)?;
        let name = self.expect_ident("function name")?;

        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while self.current.kind != TokenKind::RParen {
            params.push(self.parse_param()?);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        self.expect(TokenKind::Colon)?;
        let result = self.parse_type()?;
        let body = self.parse_block()?;

        Ok(FunctionDecl {
            span: start.to(body.span),
            name,
            exported,
            params,
            result,
            body,
        })
    }

    fn parse_param(&mut self) -> Result<Param, CoreError> {
        let name = self.expect_ident("parameter name")?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        Ok(Param { name, ty })
    }

    fn parse_type(&mut self) -> Result<TypeName, CoreError> {
        let ident = self.expect_ident("type name")?;
        Ok(TypeName {
            name: ident.name,
            span: ident.span,
        })
    }

    fn parse_block(&mut self) -> Result<Block, CoreError> {
        let open = self.expect(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(self.unexpected("`}`")),
                _ => {}
            }
            let stmt = self.parse_stmt()?;
            let ends_block = matches!(
                stmt,
                Stmt::Expr {
                    has_trailing_separator: false,
                    ..
                }
            );
            stmts.push(stmt);
            if ends_block {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: open.to(close),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, CoreError> {
        match self.current.kind {
            TokenKind::Return => {
                let start = self.bump()?.span;
                let expr = self.parse_expr()?;
                let end = self.expect(TokenKind::Semi)?;
                Ok(Stmt::Return {
                    expr,
                    span: start.to(end),
                })
            }
            TokenKind::Let => {
                self.bump()?;
                let name = self.expect_ident("binding name")?;
                let ty = if self.eat(TokenKind::Colon)? {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                self.expect(TokenKind::Equal)?;
                let init = self.parse_expr()?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Let { name, ty, init })
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.eat(TokenKind::Semi)? {
                    Ok(Stmt::Expr {
                        expr,
                        has_trailing_separator: true,
                    })
                } else if self.current.kind == TokenKind::RBrace {
                    Ok(Stmt::Expr {
                        expr,
                        has_trailing_separator: false,
                    })
                } else {
                    Err(self.unexpected("`;` or `}`"))
                }
            }
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, CoreError> {
        let (expr, _) = self.parse_assignment()?;
        Ok(expr)
    }

    /// `target op= value`, right-associative and looser than any binary
    /// operator. Only identifiers can be assigned to.
    fn parse_assignment(&mut self) -> Result<(Expr, usize), CoreError> {
        let (target, height) = self.parse_binary(0)?;
        let Some(op) = assign_op(self.current.kind) else {
            return Ok((target, height));
        };
        let ExprKind::Identifier(name) = target.kind else {
            return Err(self.unexpected("identifier before assignment operator"));
        };

        let position = self.bump()?.span.start;
        self.enter(position)?;
        let (value, value_height) = self.parse_assignment()?;
        self.nesting -= 1;

        let height = value_height + 1;
        self.check_height(height, position)?;
        let span = target.span.to(value.span);
        Ok((
            Expr::new(
                ExprKind::Assign {
                    op,
                    target: Ident {
                        name,
                        span: target.span,
                    },
                    value: Box::new(value),
                },
                span,
            ),
            height,
        ))
    }

    /// Precedence climbing over binary operators. Operators binding at
    /// least as tight as `min_precedence` are folded into the left operand.
    ///
    /// Alongside each expression the parser returns the height of its
    /// tree; later passes recurse over it, so it is capped.
    fn parse_binary(&mut self, min_precedence: u8) -> Result<(Expr, usize), CoreError> {
        let (mut lhs, mut height) = self.parse_unary()?;

        while let Some(op) = binary_op(self.current.kind) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            let position = self.bump()?.span.start;
            let (rhs, rhs_height) = self.parse_binary(precedence + 1)?;
            height = height.max(rhs_height) + 1;
            self.check_height(height, position)?;

            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }

        Ok((lhs, height))
    }

    fn parse_unary(&mut self) -> Result<(Expr, usize), CoreError> {
        if self.current.kind == TokenKind::Minus {
            let start = self.bump()?.span;
            self.enter(start.start)?;
            let (operand, operand_height) = self.parse_unary()?;
            self.nesting -= 1;

            let height = operand_height + 1;
            self.check_height(height, start.start)?;
            let span = start.to(operand.span);
            return Ok((
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ),
                height,
            ));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<(Expr, usize), CoreError> {
        match self.current.kind {
            TokenKind::IntLiteral(value) => {
                let token = self.bump()?;
                Ok((Expr::new(ExprKind::IntLiteral(value), token.span), 1))
            }
            TokenKind::Ident => {
                let token = self.bump()?;
                let expr = Expr::new(ExprKind::Identifier(token.text.to_string()), token.span);
                Ok((expr, 1))
            }
            TokenKind::LParen => {
                let open = self.bump()?.span;
                self.enter(open.start)?;
                let inner = self.parse_binary(0)?;
                self.nesting -= 1;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Step into a nested sub-expression (parentheses, negation,
    /// assigned value).
    fn enter(&mut self, position: usize) -> Result<(), CoreError> {
        self.nesting += 1;
        if self.nesting > MAX_EXPR_DEPTH {
            return Err(CoreError::ExpressionTooDeep {
                limit: MAX_EXPR_DEPTH,
                position,
            });
        }
        Ok(())
    }

    fn check_height(&self, height: usize, position: usize) -> Result<(), CoreError> {
        if height > MAX_EXPR_DEPTH {
            return Err(CoreError::ExpressionTooDeep {
                limit: MAX_EXPR_DEPTH,
                position,
            });
        }
        Ok(())
    }

    /// Advance to the next token, returning the one just consumed.
    fn bump(&mut self) -> Result<Token<'src>, CoreError> {
        let position = self.current.span.end;
        let next = next_or_eof(&mut self.tokens, position)?;
        Ok(core::mem::replace(&mut self.current, next))
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool, CoreError> {
        if self.current.kind == kind {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span, CoreError> {
        if self.current.kind == kind {
            Ok(self.bump()?.span)
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Ident, CoreError> {
        if self.current.kind == TokenKind::Ident {
            let token = self.bump()?;
            Ok(Ident {
                name: token.text.to_string(),
                span: token.span,
            })
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> CoreError {
        CoreError::parse(expected, self.current.found(), self.current.span.start)
    }
}

fn next_or_eof<'src, I>(tokens: &mut I, position: usize) -> Result<Token<'src>, CoreError>
where
    I: Iterator<Item = Result<Token<'src>, CoreError>>,
{
    match tokens.next() {
        Some(token) => token,
        None => Ok(Token {
            kind: TokenKind::Eof,
            span: Span::new(position, position),
            text: "",
        }),
    }
}

fn assign_op(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Equal => Some(AssignOp::Set),
        TokenKind::PlusEqual => Some(AssignOp::Add),
        TokenKind::MinusEqual => Some(AssignOp::Sub),
        TokenKind::StarEqual => Some(AssignOp::Mul),
        TokenKind::SlashEqual => Some(AssignOp::Div),
        _ => None,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        _ => None,
    }
}
