use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let Some(ch) = self.peek_char() else {
            return Token::new(TokenKind::Eof, "");
        };

        match ch {
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            '"' => self.read_string(),
            _ => self.read_operator(ch),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.consume_while(|c| c == ' ' || c == '\t' || c == '\r' || c == '\n');

            if self.peek_char() == Some('/') && self.peek_next() == Some('/') {
                self.consume_while(|c| c != '\n');
                continue;
            }

            if self.peek_char() == Some('/') && self.peek_next() == Some('*') {
                self.consume_char();
                self.consume_char();
                // Non-nesting; an unterminated block comment runs to EOF.
                while let Some(c) = self.consume_char() {
                    if c == '*' && self.peek_char() == Some('/') {
                        self.consume_char();
                        break;
                    }
                }
                continue;
            }

            break;
        }
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_alphanumeric() || c == '_');

        let ident = &self.input[start..self.pos];
        let kind = match ident {
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "print" => TokenKind::Print,
            "true" | "false" => TokenKind::Bool,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, ident)
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.consume_while(|c| c.is_ascii_digit());
        // At most one decimal point; a second `.` terminates the number.
        if self.peek_char() == Some('.') {
            self.consume_char();
            self.consume_while(|c| c.is_ascii_digit());
        }

        let lexeme = &self.input[start..self.pos];
        if lexeme.contains('.') {
            match lexeme.parse::<f64>() {
                Ok(value) => Token::new(TokenKind::Number, float_spelling(value)),
                Err(_) => Token::new(TokenKind::Error, "Invalid number"),
            }
        } else {
            match lexeme.parse::<i64>() {
                Ok(value) => Token::new(TokenKind::Number, value.to_string()),
                Err(_) => Token::new(TokenKind::Error, "Invalid number"),
            }
        }
    }

    fn read_string(&mut self) -> Token {
        self.consume_char(); // opening quote
        let start = self.pos;
        self.consume_while(|c| c != '"');
        let content = &self.input[start..self.pos];

        if self.peek_char() == Some('"') {
            let token = Token::new(TokenKind::Str, content);
            self.consume_char(); // closing quote
            token
        } else {
            Token::new(TokenKind::Error, "Unterminated string")
        }
    }

    fn read_operator(&mut self, ch: char) -> Token {
        self.consume_char();
        match ch {
            '(' => Token::new(TokenKind::LeftParen, "("),
            ')' => Token::new(TokenKind::RightParen, ")"),
            '{' => Token::new(TokenKind::LeftBrace, "{"),
            '}' => Token::new(TokenKind::RightBrace, "}"),
            '[' => Token::new(TokenKind::LeftBracket, "["),
            ']' => Token::new(TokenKind::RightBracket, "]"),
            ',' => Token::new(TokenKind::Comma, ","),
            '.' => Token::new(TokenKind::Dot, "."),
            ';' => Token::new(TokenKind::Semicolon, ";"),
            ':' => Token::new(TokenKind::Colon, ":"),
            '+' => Token::new(TokenKind::Plus, "+"),
            '-' => Token::new(TokenKind::Minus, "-"),
            '*' => Token::new(TokenKind::Star, "*"),
            '/' => Token::new(TokenKind::Slash, "/"),
            '=' => {
                if self.consume_if('=') {
                    Token::new(TokenKind::EqualEqual, "==")
                } else {
                    Token::new(TokenKind::Equal, "=")
                }
            }
            '<' => {
                if self.consume_if('=') {
                    Token::new(TokenKind::LessEqual, "<=")
                } else {
                    Token::new(TokenKind::Less, "<")
                }
            }
            '>' => {
                if self.consume_if('=') {
                    Token::new(TokenKind::GreaterEqual, ">=")
                } else {
                    Token::new(TokenKind::Greater, ">")
                }
            }
            '!' => {
                if self.consume_if('=') {
                    Token::new(TokenKind::BangEqual, "!=")
                } else {
                    Token::new(TokenKind::Bang, "!")
                }
            }
            '&' => {
                if self.consume_if('&') {
                    Token::new(TokenKind::And, "&&")
                } else {
                    Token::new(TokenKind::Error, "Expected '&&'")
                }
            }
            '|' => {
                if self.consume_if('|') {
                    Token::new(TokenKind::Or, "||")
                } else {
                    Token::new(TokenKind::Error, "Expected '||'")
                }
            }
            _ => Token::new(TokenKind::Error, ch.to_string()),
        }
    }

    fn consume_while<P>(&mut self, keep_predicate: P)
    where
        P: Fn(char) -> bool,
    {
        while let Some(c) = self.peek_char() {
            if !keep_predicate(c) {
                break;
            }
            self.consume_char();
        }
    }

    fn consume_if(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.consume_char();
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    fn peek_next(&self) -> Option<char> {
        self.peek_char()
            .and_then(|c| self.char_at(self.pos + c.len_utf8()))
    }

    fn char_at(&self, index: usize) -> Option<char> {
        if index >= self.input.len() {
            None
        } else {
            self.input[index..].chars().next()
        }
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

/// Canonical spelling for a float literal. `Display` never uses an exponent,
/// and forcing a trailing `.0` onto integral values keeps the `.` the code
/// generator uses to tell floats from integers.
fn float_spelling(value: f64) -> String {
    let mut spelling = value.to_string();
    if !spelling.contains('.') {
        spelling.push_str(".0");
    }
    spelling
}

/// Scans the whole input, ending with an `Eof` token. Malformed input is
/// reported through `Error` tokens rather than a failed scan.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let is_eof = matches!(token.kind, TokenKind::Eof);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    tokens
}
