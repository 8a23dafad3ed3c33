use super::ast::{
    BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement,
};
use super::lexer::{self, Token};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("illegal token `{0}`")]
    IllegalToken(String),
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("expected `{expected}`, got `{got}`")]
    UnexpectedToken { expected: String, got: String },
    #[error("`{0}` cannot start an expression")]
    NoPrefixRule(String),
}

type Result<T> = std::result::Result<T, Error>;

/// Parse one source text into a program.
pub fn parse(source: &str) -> Result<Program> {
    let tokens = lexer::tokenize(source).map_err(Error::IllegalToken)?;
    Parser::new(tokens).parse_program()
}

/// Binding powers, weakest first. An infix loop continues while the next
/// operator binds tighter than the context it appears in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(token: &Token) -> Precedence {
    match token {
        Token::Equal | Token::NotEqual => Precedence::Equals,
        Token::LessThan | Token::GreaterThan => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Slash | Token::Asterisk => Precedence::Product,
        Token::LeftParen => Precedence::Call,
        Token::LeftBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    fn parse_program(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Some(Token::Let) => self.parse_let_statement(),
            Some(Token::Return) => self.parse_return_statement(),
            _ => {
                let value = self.parse_expression(Precedence::Lowest)?;
                self.skip_semicolon();
                Ok(Statement::Expression(value))
            }
        }
    }

    fn parse_let_statement(&mut self) -> Result<Statement> {
        self.advance()?; // let
        let name = self.expect_identifier()?;
        self.expect(&Token::Assign)?;

        let mut value = self.parse_expression(Precedence::Lowest)?;
        // A function literal bound directly to a name knows that name, so
        // its body can call itself.
        if let Expression::FunctionLiteral {
            name: function_name, ..
        } = &mut value
        {
            *function_name = Some(name.clone());
        }

        self.skip_semicolon();
        Ok(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Statement> {
        self.advance()?; // return
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Ok(Statement::Return(value))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression> {
        let mut left = self.parse_prefix()?;

        while !self.peek_is(&Token::Semicolon) && precedence < self.peek_precedence() {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression> {
        match self.advance()? {
            Token::Identifier(name) => Ok(Expression::Identifier(name)),
            Token::Integer(value) => Ok(Expression::IntegerLiteral(value)),
            Token::Str(value) => Ok(Expression::StringLiteral(value)),
            Token::True => Ok(Expression::BooleanLiteral(true)),
            Token::False => Ok(Expression::BooleanLiteral(false)),
            Token::Bang => self.parse_prefix_operation(PrefixOp::Bang),
            Token::Minus => self.parse_prefix_operation(PrefixOp::Minus),
            Token::LeftParen => {
                let value = self.parse_expression(Precedence::Lowest)?;
                self.expect(&Token::RightParen)?;
                Ok(value)
            }
            Token::If => self.parse_if_expression(),
            Token::Function => self.parse_function_literal(),
            Token::LeftBracket => {
                let elements = self.parse_expression_list(&Token::RightBracket)?;
                Ok(Expression::ArrayLiteral(elements))
            }
            Token::LeftBrace => self.parse_hash_literal(),
            other => Err(Error::NoPrefixRule(other.to_string())),
        }
    }

    fn parse_prefix_operation(&mut self, op: PrefixOp) -> Result<Expression> {
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expression::Prefix {
            op,
            right: Box::new(right),
        })
    }

    fn parse_infix(&mut self, left: Expression) -> Result<Expression> {
        let token = self.advance()?;

        let op = match token {
            Token::Plus => InfixOp::Add,
            Token::Minus => InfixOp::Sub,
            Token::Asterisk => InfixOp::Mul,
            Token::Slash => InfixOp::Div,
            Token::LessThan => InfixOp::Lt,
            Token::GreaterThan => InfixOp::Gt,
            Token::Equal => InfixOp::Eq,
            Token::NotEqual => InfixOp::NotEq,
            Token::LeftParen => {
                let arguments = self.parse_expression_list(&Token::RightParen)?;
                return Ok(Expression::Call {
                    function: Box::new(left),
                    arguments,
                });
            }
            Token::LeftBracket => {
                let index = self.parse_expression(Precedence::Lowest)?;
                self.expect(&Token::RightBracket)?;
                return Ok(Expression::Index {
                    left: Box::new(left),
                    index: Box::new(index),
                });
            }
            other => {
                return Err(Error::UnexpectedToken {
                    expected: "an infix operator".to_string(),
                    got: other.to_string(),
                })
            }
        };

        let right = self.parse_expression(precedence_of(&token))?;
        Ok(Expression::Infix {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_if_expression(&mut self) -> Result<Expression> {
        self.expect(&Token::LeftParen)?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(&Token::RightParen)?;

        let consequence = self.parse_block()?;
        let alternative = if self.peek_is(&Token::Else) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expression::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_function_literal(&mut self) -> Result<Expression> {
        self.expect(&Token::LeftParen)?;

        let mut parameters = Vec::new();
        if !self.peek_is(&Token::RightParen) {
            parameters.push(self.expect_identifier()?);
            while self.peek_is(&Token::Comma) {
                self.advance()?;
                parameters.push(self.expect_identifier()?);
            }
        }
        self.expect(&Token::RightParen)?;

        let body = self.parse_block()?;
        Ok(Expression::FunctionLiteral {
            name: None,
            parameters,
            body,
        })
    }

    fn parse_hash_literal(&mut self) -> Result<Expression> {
        let mut pairs = Vec::new();

        if !self.peek_is(&Token::RightBrace) {
            loop {
                let key = self.parse_expression(Precedence::Lowest)?;
                self.expect(&Token::Colon)?;
                let value = self.parse_expression(Precedence::Lowest)?;
                pairs.push((key, value));

                if !self.peek_is(&Token::Comma) {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(&Token::RightBrace)?;

        Ok(Expression::HashLiteral(pairs))
    }

    fn parse_block(&mut self) -> Result<BlockStatement> {
        self.expect(&Token::LeftBrace)?;

        let mut statements = Vec::new();
        loop {
            match self.peek() {
                None => return Err(Error::UnexpectedEof),
                Some(Token::RightBrace) => break,
                Some(_) => statements.push(self.parse_statement()?),
            }
        }
        self.advance()?; // }

        Ok(BlockStatement { statements })
    }

    fn parse_expression_list(&mut self, end: &Token) -> Result<Vec<Expression>> {
        let mut elements = Vec::new();

        if !self.peek_is(end) {
            elements.push(self.parse_expression(Precedence::Lowest)?);
            while self.peek_is(&Token::Comma) {
                self.advance()?;
                elements.push(self.parse_expression(Precedence::Lowest)?);
            }
        }
        self.expect(end)?;

        Ok(elements)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn peek_precedence(&self) -> Precedence {
        self.peek().map(precedence_of).unwrap_or(Precedence::Lowest)
    }

    fn advance(&mut self) -> Result<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token.ok_or(Error::UnexpectedEof)
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        let token = self.advance()?;
        if &token == expected {
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: expected.to_string(),
                got: token.to_string(),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.advance()? {
            Token::Identifier(name) => Ok(name),
            other => Err(Error::UnexpectedToken {
                expected: "an identifier".to_string(),
                got: other.to_string(),
            }),
        }
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(&Token::Semicolon) {
            self.position += 1;
        }
    }
}
