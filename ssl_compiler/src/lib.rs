pub mod compile;
pub mod lex;
pub mod tokens;

pub use compile::{CompileError, CompileResult, Compiler, SyntaxError, TypeError};
pub use lex::{LexError, Lexer};
pub use tokens::{KeywordKind, Span, SymbolKind, Token, TokenKind, VarType};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compile a source program into assembly lines.
///
/// The lines contain no trailing newlines; join with `'\n'` to form an
/// assembler input file.
pub fn compile_str(source: &str) -> CompileResult<Vec<String>> {
    Compiler::new(source).compile()
}
