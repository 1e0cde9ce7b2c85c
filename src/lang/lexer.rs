//! Lexer (Tokenizer)
//!
//! This module converts command text into a stream of line-tracked tokens.

use super::token::{LocatedToken, Token};
use crate::error::{Error, Result};

/// Command lexer
pub struct Lexer {
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
    /// Current 1-based line
    line: usize,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.token == Token::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<LocatedToken> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let token = self.scan()?;
        Ok(LocatedToken::new(token, line))
    }

    fn scan(&mut self) -> Result<Token> {
        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let ch = self.current_char();

        // Single character tokens
        let token = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '.' => Some(Token::Dot),
            '|' => Some(Token::Pipe),
            '#' => Some(Token::Hash),
            '=' => Some(Token::Eq),
            // Greek letters count as alphabetic, so they are matched before identifiers
            'π' => Some(Token::Project),
            'σ' => Some(Token::Select),
            '⋈' => Some(Token::Join),
            '∪' => Some(Token::Union),
            '∩' => Some(Token::Intersect),
            '×' => Some(Token::Times),
            _ => None,
        };

        if let Some(token) = token {
            self.advance();
            return Ok(token);
        }

        match ch {
            ':' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    return Ok(Token::Assign);
                }
                Err(Error::UnexpectedCharacter(':', self.line))
            }
            '-' => {
                self.advance();
                // Check for negative number
                if !self.is_at_end() && self.current_char().is_ascii_digit() {
                    return self.read_number(true);
                }
                Ok(Token::Minus)
            }
            '<' => {
                self.advance();
                if !self.is_at_end() {
                    match self.current_char() {
                        '=' => {
                            self.advance();
                            return Ok(Token::Lte);
                        }
                        '>' => {
                            self.advance();
                            return Ok(Token::Neq);
                        }
                        _ => {}
                    }
                }
                Ok(Token::Lt)
            }
            '>' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    return Ok(Token::Gte);
                }
                Ok(Token::Gt)
            }
            '!' => {
                self.advance();
                if !self.is_at_end() && self.current_char() == '=' {
                    self.advance();
                    return Ok(Token::Neq);
                }
                Err(Error::UnexpectedCharacter('!', self.line))
            }
            '\'' | '"' => self.read_string(ch),
            c if c.is_ascii_digit() => self.read_number(false),
            c if c.is_alphabetic() || c == '_' => Ok(self.read_identifier()),
            other => Err(Error::UnexpectedCharacter(other, self.line)),
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get the current character
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Peek at the next character
    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) {
        if self.current_char() == '\n' {
            self.line += 1;
        }
        self.position += 1;
    }

    /// Skip whitespace and `--` line comments
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while !self.is_at_end() && self.current_char().is_whitespace() {
                self.advance();
            }

            if !self.is_at_end() && self.current_char() == '-' && self.peek_char() == Some('-') {
                while !self.is_at_end() && self.current_char() != '\n' {
                    self.advance();
                }
            } else {
                return;
            }
        }
    }

    /// Read a string literal; a doubled quote inside it is an escaped quote
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let start_line = self.line;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == quote {
                if self.peek_char() == Some(quote) {
                    value.push(quote);
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::StringLiteral(value));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::UnterminatedString(start_line))
    }

    /// Read a number (integer or float); the sign is parsed with the digits
    fn read_number(&mut self, negative: bool) -> Result<Token> {
        let mut value = String::from(if negative { "-" } else { "" });
        let mut is_float = false;

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                // A dot not followed by a digit belongs to the next token
                match self.peek_char() {
                    Some(next) if next.is_ascii_digit() => {
                        is_float = true;
                        value.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            } else if ch == 'e' || ch == 'E' {
                // Scientific notation
                is_float = true;
                value.push(ch);
                self.advance();

                if !self.is_at_end() && (self.current_char() == '+' || self.current_char() == '-') {
                    value.push(self.current_char());
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            value
                .parse::<f64>()
                .map(Token::FloatLiteral)
                .map_err(|_| Error::InvalidNumber(self.line))
        } else {
            value
                .parse::<i64>()
                .map(Token::IntegerLiteral)
                .map_err(|_| Error::InvalidNumber(self.line))
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if (ch.is_alphanumeric() || ch == '_') && ch != 'π' && ch != 'σ' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::from_keyword(&value).unwrap_or(Token::Identifier(value))
    }
}
