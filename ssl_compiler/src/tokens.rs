//! Tokens
use smol_str::SmolStr;
use std::fmt;

/// One lexical token.
///
/// Produced by the lexer, consumed and discarded by the parser.
/// The lexeme text is kept inline; lexemes in this language are tiny
/// (single letters, short keywords, literals).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub span: Span,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: &str, span: Span) -> Self {
        Self {
            kind,
            text: SmolStr::new(text),
            span,
        }
    }

    pub(crate) fn end_of_file() -> Self {
        Self::new(TokenKind::EndOfFile, "", Span::new(0, 0))
    }

    /// Keyword identity of a keyword token.
    ///
    /// Panics when called on any other token kind. A mismatched call
    /// is a bug in the caller, not a malformed source program.
    pub fn keyword(&self) -> KeywordKind {
        match self.kind {
            TokenKind::Keyword(keyword) => keyword,
            _ => panic!("keyword() called on {:?} token", self.kind),
        }
    }

    /// Symbol identity of a symbol token.
    ///
    /// Panics when called on any other token kind.
    pub fn symbol(&self) -> SymbolKind {
        match self.kind {
            TokenKind::Symbol(symbol) => symbol,
            _ => panic!("symbol() called on {:?} token", self.kind),
        }
    }

    /// Value type of a variable or constant token.
    ///
    /// Panics when called on any other token kind.
    pub fn var_type(&self) -> VarType {
        match self.kind {
            TokenKind::Variable(var_type) | TokenKind::Constant(var_type) => var_type,
            _ => panic!("var_type() called on {:?} token", self.kind),
        }
    }

    #[inline]
    pub fn is_keyword(&self, keyword: KeywordKind) -> bool {
        matches!(self.kind, TokenKind::Keyword(kw) if kw == keyword)
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfFile
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfFile => write!(f, "end-of-file"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier in the set of reserved words.
    Keyword(KeywordKind),
    /// Operator or assignment symbol.
    Symbol(SymbolKind),
    /// Single-letter variable reference, typed by its spelling.
    Variable(VarType),
    /// Literal constant.
    Constant(VarType),
    /// End-of-source.
    EndOfFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    If,
    Then,
    Else,
    EndIf,
    For,
    To,
    /// Reserved, but the grammar never consumes it. Loops always
    /// step by one.
    Step,
    EndFor,
    Print,
    PrintLn,
}

impl KeywordKind {
    /// Match an uppercased identifier against the keyword vocabulary.
    #[rustfmt::skip]
    pub fn parse(text: &str) -> Option<Self> {
        use KeywordKind as K;
        match text {
            "IF"      => Some(K::If),
            "THEN"    => Some(K::Then),
            "ELSE"    => Some(K::Else),
            "ENDIF"   => Some(K::EndIf),
            "FOR"     => Some(K::For),
            "TO"      => Some(K::To),
            "STEP"    => Some(K::Step),
            "ENDFOR"  => Some(K::EndFor),
            "PRINT"   => Some(K::Print),
            "PRINTLN" => Some(K::PrintLn),
            _ => None,
        }
    }
}

impl fmt::Display for KeywordKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use KeywordKind as K;
        match self {
            K::If      => write!(f, "IF"),
            K::Then    => write!(f, "THEN"),
            K::Else    => write!(f, "ELSE"),
            K::EndIf   => write!(f, "ENDIF"),
            K::For     => write!(f, "FOR"),
            K::To      => write!(f, "TO"),
            K::Step    => write!(f, "STEP"),
            K::EndFor  => write!(f, "ENDFOR"),
            K::Print   => write!(f, "PRINT"),
            K::PrintLn => write!(f, "PRINTLN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Plus,  // `+`
    Minus, // `-`
    Mult,  // `*`
    Div,   // `/`
    EqEq,  // `==`
    Eq,    // `=`
    Neq,   // `!=`
    Lt,    // `<`
    Gt,    // `>`
    Leq,   // `<=`
    Geq,   // `>=`
}

impl SymbolKind {
    /// Match a one- or two-character string against the symbol
    /// vocabulary.
    #[rustfmt::skip]
    pub fn parse(text: &str) -> Option<Self> {
        use SymbolKind as S;
        match text {
            "+"  => Some(S::Plus),
            "-"  => Some(S::Minus),
            "*"  => Some(S::Mult),
            "/"  => Some(S::Div),
            "==" => Some(S::EqEq),
            "="  => Some(S::Eq),
            "!=" => Some(S::Neq),
            "<"  => Some(S::Lt),
            ">"  => Some(S::Gt),
            "<=" => Some(S::Leq),
            ">=" => Some(S::Geq),
            _ => None,
        }
    }

    /// `=` is assignment, not a binary expression operator.
    #[inline]
    pub fn is_operator(self) -> bool {
        !matches!(self, SymbolKind::Eq)
    }

    #[inline]
    pub fn is_comparison(self) -> bool {
        use SymbolKind as S;
        matches!(self, S::EqEq | S::Neq | S::Lt | S::Gt | S::Leq | S::Geq)
    }
}

impl fmt::Display for SymbolKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SymbolKind as S;
        match self {
            S::Plus  => write!(f, "+"),
            S::Minus => write!(f, "-"),
            S::Mult  => write!(f, "*"),
            S::Div   => write!(f, "/"),
            S::EqEq  => write!(f, "=="),
            S::Eq    => write!(f, "="),
            S::Neq   => write!(f, "!="),
            S::Lt    => write!(f, "<"),
            S::Gt    => write!(f, ">"),
            S::Leq   => write!(f, "<="),
            S::Geq   => write!(f, ">="),
        }
    }
}

/// Static value type of a variable, constant or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    Float,
    Str,
    /// Result of a comparison. No variable can be declared `Bool`.
    Bool,
    NoType,
}

impl VarType {
    /// Variable type determined by the spelling of its single-letter
    /// name: `a`-`h` are floats, `i`-`n` are integers, the rest are
    /// strings. Case-insensitive.
    pub fn of_letter(letter: char) -> VarType {
        match letter.to_ascii_lowercase() {
            'a'..='h' => VarType::Float,
            'i'..='n' => VarType::Int,
            _ => VarType::Str,
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VarType::Int => write!(f, "INT"),
            VarType::Float => write!(f, "FLOAT"),
            VarType::Str => write!(f, "STR"),
            VarType::Bool => write!(f, "BOOL"),
            VarType::NoType => write!(f, "NONE"),
        }
    }
}

/// Chunk of source code, encoded as a starting byte position and a
/// size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub index: u32,
    pub size: u32,
}

impl Span {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    #[inline]
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        &text[(self.index as usize)..(self.index as usize + self.size as usize)]
    }

    /// Ending index of the span, exclusive.
    #[inline]
    pub fn end(&self) -> u32 {
        self.index + self.size
    }
}
