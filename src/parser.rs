use anyhow::{Result, bail};

use crate::ast::{Expression, Program, Statement};
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    current: Token,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, ""));
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
        }
    }

    pub fn parse_program(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current.kind {
            TokenKind::Print => self.parse_print_statement(),
            TokenKind::Var => self.parse_var_declaration(),
            TokenKind::LeftBrace => self.parse_block(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Statement> {
        let expr = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression")?;
        Ok(Statement::Expression(expr))
    }

    fn parse_print_statement(&mut self) -> Result<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'print'")?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after print expression")?;
        self.consume(TokenKind::Semicolon, "Expect ';' after print statement")?;
        Ok(Statement::Print(expr))
    }

    fn parse_var_declaration(&mut self) -> Result<Statement> {
        self.advance();
        let name = self.consume(TokenKind::Identifier, "Expect variable name")?;
        let initializer = if self.matches(TokenKind::Equal) {
            self.parse_expression()?
        } else {
            // A declaration without `=` initializes to null.
            Expression::Literal(Token::new(TokenKind::Null, "null"))
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Statement::VarDecl { name, initializer })
    }

    fn parse_block(&mut self) -> Result<Statement> {
        self.advance();
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block")?;
        Ok(Statement::Block(statements))
    }

    fn parse_if_statement(&mut self) -> Result<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.matches(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after while condition")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While { condition, body })
    }

    /// `for (init; cond; inc) body` desugars to
    /// `{ init  while (cond) { body  inc } }`.
    fn parse_for_statement(&mut self) -> Result<Statement> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'")?;

        let initializer = if self.matches(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::Var) {
            Some(self.parse_var_declaration()?)
        } else {
            Some(self.parse_expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            // An absent condition loops forever.
            Expression::Literal(Token::new(TokenKind::Bool, "true"))
        } else {
            self.parse_expression()?
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition")?;

        let increment = if self.check(TokenKind::RightParen) {
            Statement::Expression(Expression::Literal(Token::new(TokenKind::Number, "0")))
        } else {
            Statement::Expression(self.parse_expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses")?;

        let body = self.parse_statement()?;

        let loop_body = Statement::Block(vec![body, increment]);
        let while_loop = Statement::While {
            condition,
            body: Box::new(loop_body),
        };
        let mut statements = Vec::new();
        if let Some(initializer) = initializer {
            statements.push(initializer);
        }
        statements.push(while_loop);
        Ok(Statement::Block(statements))
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression> {
        let expr = self.parse_equality()?;

        if self.matches(TokenKind::Equal) {
            let value = self.parse_assignment()?;
            return match expr {
                Expression::Variable(name) => Ok(Expression::Assignment {
                    name,
                    value: Box::new(value),
                }),
                _ => bail!("Invalid assignment target"),
            };
        }

        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        let mut expr = self.parse_comparison()?;
        while self.check(TokenKind::EqualEqual) || self.check(TokenKind::BangEqual) {
            let op = self.advance();
            let right = self.parse_comparison()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;
        while self.check(TokenKind::Less)
            || self.check(TokenKind::LessEqual)
            || self.check(TokenKind::Greater)
            || self.check(TokenKind::GreaterEqual)
        {
            let op = self.advance();
            let right = self.parse_term()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_factor()?;
        while self.check(TokenKind::Plus) || self.check(TokenKind::Minus) {
            let op = self.advance();
            let right = self.parse_factor()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        while self.check(TokenKind::Star) || self.check(TokenKind::Slash) {
            let op = self.advance();
            let right = self.parse_primary()?;
            expr = Expression::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        match self.current.kind {
            TokenKind::Number | TokenKind::Str | TokenKind::Bool | TokenKind::Null => {
                Ok(Expression::Literal(self.advance()))
            }
            TokenKind::Identifier => Ok(Expression::Variable(self.advance())),
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error("Expect expression")),
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn advance(&mut self) -> Token {
        let next = self
            .tokens
            .get(self.pos + 1)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, ""));
        self.pos = self.pos.saturating_add(1);
        std::mem::replace(&mut self.current, next)
    }

    fn error(&self, message: &str) -> anyhow::Error {
        anyhow::anyhow!(
            "{message}, got {:?} '{}'",
            self.current.kind,
            self.current.text
        )
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> Result<Program> {
    Parser::new(tokens).parse_program()
}
