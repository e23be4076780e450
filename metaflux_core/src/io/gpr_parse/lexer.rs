//! Lex a GPR string into a series of tokens for later parsing
//!
//! Tokens are split on whitespace and parentheses, anything else (including `.`, `-` and
//! `:` which show up in gene ids) is part of a word.

use crate::io::gpr_parse::token::Token;
use thiserror::Error;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(&mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        self.tokens.push(Token::Eof);
        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c = self.advance();
        match c {
            '(' => self.tokens.push(Token::LeftParen),
            ')' => self.tokens.push(Token::RightParen),
            c if c.is_whitespace() => {}
            c if c.is_control() => return Err(LexerError::InvalidCharacter(c, self.start)),
            _ => self.read_word(),
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn read_word(&mut self) {
        while !self.is_at_end() && Lexer::is_word_char(self.source[self.current]) {
            self.current += 1;
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::from_word(&text));
    }

    fn is_word_char(c: char) -> bool {
        !(c.is_whitespace() || c.is_control() || c == '(' || c == ')')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("Invalid character {0:?} at position {1}")]
    InvalidCharacter(char, usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_gene() {
        let tokens = Lexer::new("Rv0023").lex().unwrap();
        assert_eq!(
            tokens,
            vec![Token::Identifier(String::from("Rv0023")), Token::Eof]
        );
    }

    #[test]
    fn grouping() {
        let tokens = Lexer::new("(Rv0023 OR Rv0123)").lex().unwrap();
        let expected = vec![
            Token::LeftParen,
            Token::Identifier(String::from("Rv0023")),
            Token::Or,
            Token::Identifier(String::from("Rv0123")),
            Token::RightParen,
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn parentheses_without_spaces() {
        let tokens = Lexer::new("(b0001.1 and s0001)or not b2").lex().unwrap();
        let expected = vec![
            Token::LeftParen,
            Token::Identifier(String::from("b0001.1")),
            Token::And,
            Token::Identifier(String::from("s0001")),
            Token::RightParen,
            Token::Or,
            Token::Not,
            Token::Identifier(String::from("b2")),
            Token::Eof,
        ];
        assert_eq!(tokens, expected);
    }

    #[test]
    fn control_characters_rejected() {
        assert_eq!(
            Lexer::new("b1 \u{7} b2").lex(),
            Err(LexerError::InvalidCharacter('\u{7}', 3))
        );
    }
}
