//! Lexical analysis (tokenizer)
use crate::tokens::{KeywordKind, Span, SymbolKind, Token, TokenKind, VarType};

use itertools::{multipeek, MultiPeek};
use std::{error, fmt, str::CharIndices};

/// Lexical analyzer.
///
/// Owns the character cursor. Calling [`next_token`](Lexer::next_token)
/// repeatedly pulls tokens off the front of the source until
/// [`TokenKind::EndOfFile`] is returned, which is then returned on
/// every subsequent call.
pub struct Lexer<'a> {
    source: SourceText<'a>,
    /// Start byte position of the token currently being scanned.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            source: SourceText::new(source_code),
            token_start: 0,
        }
    }

    /// Original source code that was passed in during construction.
    pub fn source_code(&self) -> &'a str {
        self.source.original
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Each call starts by erasing whitespace and `#` comment lines,
    /// then classifies the token by its first character.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_trivia();

        match self.source.next_char() {
            None => {
                self.token_start = self.source.offset();
                Ok(self.make_token(TokenKind::EndOfFile, ""))
            }
            Some((index, c)) => {
                self.token_start = index;
                match c {
                    '0'..='9' => Ok(self.consume_number(c)),
                    'a'..='z' | 'A'..='Z' => self.consume_word(c),
                    '"' => self.consume_string(),
                    _ => self.consume_symbol(c),
                }
            }
        }
    }

    /// Erase runs of whitespace and `#`-to-end-of-line comments until
    /// neither applies.
    fn skip_trivia(&mut self) {
        loop {
            while let Some((_, ' ' | '\t' | '\r' | '\n')) = self.source.peek_char() {
                self.source.next_char();
            }
            match self.source.peek_char() {
                Some((_, '#')) => {
                    // Comment runs to the end of the line. The newline
                    // itself is left for the whitespace loop.
                    while let Some((_, c)) = self.source.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.source.next_char();
                    }
                }
                _ => return,
            }
        }
    }

    /// Build a token spanning from the recorded start position to the
    /// current cursor position.
    fn make_token(&mut self, kind: TokenKind, text: &str) -> Token {
        let start = self.token_start;
        let end = self.source.next_offset();

        debug_assert!(end >= start);
        let span = Span::new(start as u32, (end - start) as u32);

        Token::new(kind, text, span)
    }

    /// Numeric literal: a maximal digit run, optionally followed by a
    /// single `.` and another digit run. No sign, no exponent; a
    /// second `.` starts a new token.
    fn consume_number(&mut self, first: char) -> Token {
        let mut num = String::new();
        num.push(first);

        while let Some((_, c)) = self.source.peek_char() {
            if !c.is_ascii_digit() {
                break;
            }
            num.push(c);
            self.source.next_char();
        }

        if let Some((_, '.')) = self.source.peek_char() {
            num.push('.');
            self.source.next_char();
            while let Some((_, c)) = self.source.peek_char() {
                if !c.is_ascii_digit() {
                    break;
                }
                num.push(c);
                self.source.next_char();
            }
            return self.make_token(TokenKind::Constant(VarType::Float), &num);
        }

        self.make_token(TokenKind::Constant(VarType::Int), &num)
    }

    /// Identifier or keyword.
    ///
    /// Exactly one letter not followed by another letter is a variable,
    /// typed by its spelling. Any longer letter run must match the
    /// keyword vocabulary; there are no multi-letter variables.
    fn consume_word(&mut self, first: char) -> Result<Token, LexError> {
        match self.source.peek_char() {
            Some((_, c)) if c.is_ascii_alphabetic() => {
                let mut word = String::new();
                word.push(first);
                while let Some((_, c)) = self.source.peek_char() {
                    if !c.is_ascii_alphabetic() {
                        break;
                    }
                    word.push(c);
                    self.source.next_char();
                }
                word.make_ascii_uppercase();
                match KeywordKind::parse(&word) {
                    Some(keyword) => Ok(self.make_token(TokenKind::Keyword(keyword), &word)),
                    None => Err(LexError::UnknownKeyword(word)),
                }
            }
            _ => {
                let var_type = VarType::of_letter(first);
                let name = first.to_string();
                Ok(self.make_token(TokenKind::Variable(var_type), &name))
            }
        }
    }

    /// String literal: raw characters, no escapes, up to the closing
    /// double quote.
    fn consume_string(&mut self) -> Result<Token, LexError> {
        let mut literal = String::new();
        loop {
            match self.source.next_char() {
                Some((_, '"')) => break,
                Some((_, c)) => literal.push(c),
                None => return Err(LexError::UnterminatedString),
            }
        }
        Ok(self.make_token(TokenKind::Constant(VarType::Str), &literal))
    }

    /// Symbol: greedily probe the two-character form against the
    /// symbol vocabulary before settling for the single character.
    ///
    /// Only vocabulary pairs combine (`==`, `!=`, `<=`, `>=`); any
    /// other adjacent pair, such as `<` then `>`, lexes as two tokens.
    fn consume_symbol(&mut self, first: char) -> Result<Token, LexError> {
        if let Some((_, next)) = self.source.peek_char() {
            let mut pair = String::new();
            pair.push(first);
            pair.push(next);
            if let Some(symbol) = SymbolKind::parse(&pair) {
                self.source.next_char();
                return Ok(self.make_token(TokenKind::Symbol(symbol), &pair));
            }
        }

        let single = first.to_string();
        match SymbolKind::parse(&single) {
            Some(symbol) => Ok(self.make_token(TokenKind::Symbol(symbol), &single)),
            None => Err(LexError::UnknownSymbol(single)),
        }
    }
}

/// Wrapper for source code that keeps a cursor position.
///
/// Allows single-character forward lookup via peeking.
struct SourceText<'a> {
    /// Keep a reference to the source so spans can be sliced from it.
    original: &'a str,

    /// Iterator over UTF-8 encoded source code.
    ///
    /// The `MultiPeek` wrapper buffers lookahead internally. This is
    /// required because UTF-8 characters are variable in width, so the
    /// string cannot simply be indexed per character.
    source: MultiPeek<CharIndices<'a>>,

    /// Byte position of the most recently consumed character.
    current: usize,
}

impl<'a> SourceText<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            original: source,
            source: multipeek(source.char_indices()),
            current: 0,
        }
    }

    /// Advance the cursor and return the consumed position and
    /// character, or `None` at the end of the source.
    fn next_char(&mut self) -> Option<(usize, char)> {
        match self.source.next() {
            Some((index, c)) => {
                self.current = index;
                Some((index, c))
            }
            None => {
                self.current = self.original.len();
                None
            }
        }
    }

    /// Look at the next character without consuming it.
    fn peek_char(&mut self) -> Option<(usize, char)> {
        let peeked = self.source.peek().cloned();
        self.source.reset_peek();
        peeked
    }

    /// Byte position of the most recently consumed character.
    fn offset(&self) -> usize {
        self.current
    }

    /// Byte position where the next token would start; the length of
    /// the source when it is exhausted.
    fn next_offset(&mut self) -> usize {
        match self.peek_char() {
            Some((index, _)) => index,
            None => self.original.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A character sequence matching neither the one- nor the
    /// two-character symbol vocabulary.
    UnknownSymbol(String),
    /// A multi-letter word outside the keyword vocabulary.
    UnknownKeyword(String),
    /// The source ended inside a string literal.
    UnterminatedString,
}

impl error::Error for LexError {}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LexError::UnknownSymbol(symbol) => write!(f, "unknown symbol '{}'", symbol),
            LexError::UnknownKeyword(word) => write!(f, "unknown keyword '{}'", word),
            LexError::UnterminatedString => write!(f, "unterminated string literal"),
        }
    }
}

impl<'a> IntoIterator for Lexer<'a> {
    type Item = Result<Token, LexError>;
    type IntoIter = LexerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        LexerIter {
            lexer: self,
            done: false,
        }
    }
}

/// Convenience iterator that wraps the lexer.
///
/// Yields the end-of-file token exactly once and then fuses; an error
/// also ends iteration, since the lexer cannot recover.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct LexerIter<'a> {
    lexer: Lexer<'a>,
    done: bool,
}

impl<'a> Iterator for LexerIter<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.lexer.next_token();
        match &result {
            Ok(token) if token.is_eof() => self.done = true,
            Err(_) => self.done = true,
            _ => {}
        }
        Some(result)
    }
}
