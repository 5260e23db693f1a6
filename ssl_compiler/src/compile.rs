//! Single-pass parser and code generator.
//!
//! There is no syntax tree. Each grammar rule validates structure and
//! types while emitting x86-64 NASM assembly as a side effect of
//! recognizing the input, driven by one token of lookahead.
use crate::{
    lex::{LexError, Lexer},
    tokens::{KeywordKind, SymbolKind, Token, TokenKind, VarType},
};

use smol_str::SmolStr;
use std::{
    collections::{HashMap, HashSet},
    error, fmt,
};

pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Instruction sequence for a binary operator applied to operands of
/// the given type.
///
/// The left operand has been popped into the secondary slot (EBX or
/// XMM1), the right operand sits in the primary slot (EAX or XMM0).
/// Subtraction and division restore operand order first, since the
/// secondary slot holds the *left* value. These sequences are the
/// compiler's external contract; compatibility tests check them
/// verbatim.
#[rustfmt::skip]
fn opcode(var_type: VarType, symbol: SymbolKind) -> Option<&'static str> {
    use SymbolKind as S;
    use VarType as V;
    match (var_type, symbol) {
        (V::Int, S::Plus)  => Some("add EAX, EBX"),
        (V::Int, S::Mult)  => Some("imul EAX, EBX"),
        (V::Int, S::Minus) => Some("xchg EAX, EBX\n  sub EAX, EBX"),
        (V::Int, S::Div)   => Some("xchg EAX, EBX\n  cdq\n  idiv EBX"),
        (V::Int, S::EqEq)  => Some("cmp EBX, EAX\n  setz AL"),
        (V::Int, S::Neq)   => Some("cmp EBX, EAX\n  setnz AL"),
        (V::Int, S::Lt)    => Some("cmp EBX, EAX\n  setl AL"),
        (V::Int, S::Gt)    => Some("cmp EBX, EAX\n  setg AL"),
        (V::Int, S::Leq)   => Some("cmp EBX, EAX\n  setle AL"),
        (V::Int, S::Geq)   => Some("cmp EBX, EAX\n  setge AL"),

        (V::Float, S::Plus)  => Some("addsd XMM0, XMM1"),
        (V::Float, S::Mult)  => Some("mulsd XMM0, XMM1"),
        (V::Float, S::Minus) => Some("subsd XMM1, XMM0\n  movq XMM0, XMM1"),
        (V::Float, S::Div)   => Some("divsd XMM1, XMM0\n  movq XMM0, XMM1"),
        (V::Float, S::EqEq)  => Some("comisd XMM1, XMM0\n  setz AL"),
        (V::Float, S::Neq)   => Some("comisd XMM1, XMM0\n  setnz AL"),
        (V::Float, S::Lt)    => Some("comisd XMM1, XMM0\n  setb AL"),
        (V::Float, S::Gt)    => Some("comisd XMM1, XMM0\n  seta AL"),
        (V::Float, S::Leq)   => Some("comisd XMM1, XMM0\n  setbe AL"),
        (V::Float, S::Geq)   => Some("comisd XMM1, XMM0\n  setae AL"),

        _ => None,
    }
}

/// Compiler session scoped to a single compilation.
///
/// Owns the lexer, the lookahead token, and all mutable output state:
/// the code lines, the deduplicated static-data declarations, the
/// constant pool and the label counter. Nothing persists once
/// [`compile`](Compiler::compile) returns.
pub struct Compiler<'a> {
    lexer: Lexer<'a>,
    /// One token of lookahead.
    token: Token,
    /// Generated code lines, in emission order.
    code: Vec<String>,
    /// Static-data declarations, in first-declared order.
    data: Vec<String>,
    /// Guard set so repeated declarations collapse to one entry.
    data_seen: HashSet<String>,
    /// Maps (literal text, type) to the label of its hoisted storage.
    constants: HashMap<(SmolStr, VarType), String>,
    /// Shared by all label purposes; global uniqueness, no kind-local
    /// numbering.
    label_id: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
            token: Token::end_of_file(),
            code: vec![],
            data: vec![],
            data_seen: HashSet::new(),
            constants: HashMap::new(),
            label_id: 0,
        }
    }

    /// Run the single pass over the whole source.
    ///
    /// On success, returns the ordered assembly lines of one complete
    /// compilation unit: preamble, statement code, epilogue, and a
    /// data section when any static data was declared. Any violation
    /// aborts with no partial output.
    pub fn compile(mut self) -> CompileResult<Vec<String>> {
        self.advance()?;

        self.emit0("global main");
        self.emit0("section .text");
        self.emit0("main:");

        self.statements(&[])?;

        self.emit("extern exit");
        self.emit("call exit\n");

        if !self.data.is_empty() {
            self.emit0("section .data");
            let data = std::mem::take(&mut self.data);
            for entry in &data {
                self.emit(entry);
            }
        }

        Ok(self.code)
    }

    fn advance(&mut self) -> CompileResult<()> {
        self.token = self.lexer.next_token()?;
        Ok(())
    }

    /// Parse statements until end-of-file or one of the terminating
    /// keywords is the lookahead. The terminator is not consumed.
    fn statements(&mut self, terminators: &[KeywordKind]) -> CompileResult<()> {
        while !self.token.is_eof() && !self.at_terminator(terminators) {
            self.statement()?;
        }
        Ok(())
    }

    fn at_terminator(&self, terminators: &[KeywordKind]) -> bool {
        match self.token.kind {
            TokenKind::Keyword(keyword) => terminators.contains(&keyword),
            _ => false,
        }
    }

    fn statement(&mut self) -> CompileResult<()> {
        match self.token.kind {
            TokenKind::Variable(_) => self.assignment(),
            TokenKind::Keyword(KeywordKind::Print) | TokenKind::Keyword(KeywordKind::PrintLn) => {
                self.print_stmt()
            }
            TokenKind::Keyword(KeywordKind::If) => self.if_stmt(),
            TokenKind::Keyword(KeywordKind::For) => self.for_stmt(),
            _ => Err(SyntaxError::Unexpected(self.token.clone()).into()),
        }
    }

    /// `assignment := VARIABLE '=' expr`
    ///
    /// Declares the variable's static storage on first reference and
    /// stores the primary slot into it.
    fn assignment(&mut self) -> CompileResult<()> {
        let name = self.token.text.clone();
        let var_type = self.token.var_type();
        self.advance()?;

        self.expect_symbol(SymbolKind::Eq)?;

        let expr_type = self.expr()?;
        self.check_types(var_type, expr_type)?;

        match var_type {
            VarType::Int => {
                self.add_data(format!("_{}: dd 0", name));
                self.emit(&format!("mov [_{}], EAX", name));
            }
            VarType::Float => {
                self.add_data(format!("_{}: dq 0.0", name));
                self.emit(&format!("movq [_{}], XMM0", name));
            }
            VarType::Str => {
                self.add_data(format!("_{}: dq 0", name));
                self.emit(&format!("mov [_{}], RAX", name));
            }
            _ => return Err(TypeError::Assignment(var_type).into()),
        }
        Ok(())
    }

    /// `ifStmt := IF expr THEN statement* (ELSE statement*)? ENDIF`
    ///
    /// The endif label is emitted only when an ELSE branch exists;
    /// without one, the else label is the sole join point.
    fn if_stmt(&mut self) -> CompileResult<()> {
        self.expect_keyword(KeywordKind::If)?;

        let cond_type = self.expr()?;
        self.check_types(VarType::Bool, cond_type)?;

        let else_label = self.next_label("else");
        let endif_label = self.next_label("endif");

        self.emit("cmp AL, 0x01");
        self.emit(&format!("jne {}", else_label));

        self.expect_keyword(KeywordKind::Then)?;

        self.statements(&[KeywordKind::Else, KeywordKind::EndIf])?;
        if self.token.is_eof() {
            return Err(SyntaxError::UnexpectedEof.into());
        }

        let has_else = self.token.is_keyword(KeywordKind::Else);
        if has_else {
            // Falling out of the THEN branch must skip the ELSE branch.
            self.emit(&format!("jmp {}", endif_label));
        }
        self.emit_label(&else_label);

        if has_else {
            self.advance()?;
            self.statements(&[KeywordKind::EndIf])?;
        }

        self.expect_keyword(KeywordKind::EndIf)?;

        if has_else {
            self.emit_label(&endif_label);
        }
        Ok(())
    }

    /// `forStmt := FOR VARIABLE '=' expr TO expr statement* ENDFOR`
    ///
    /// Ascending, exclusive upper bound, always stepping by one. The
    /// control variable must be an integer; that is checked before any
    /// loop code is emitted.
    fn for_stmt(&mut self) -> CompileResult<()> {
        self.expect_keyword(KeywordKind::For)?;

        let var_type = match self.token.kind {
            TokenKind::Variable(var_type) => var_type,
            _ => {
                return Err(SyntaxError::ExpectedVariable {
                    found: self.token.clone(),
                }
                .into())
            }
        };
        if var_type != VarType::Int {
            return Err(TypeError::LoopVariable(var_type).into());
        }
        let name = self.token.text.clone();
        self.add_data(format!("_{}: dd 0", name));
        let var_ref = format!("[_{}]", name);
        self.advance()?;

        self.expect_symbol(SymbolKind::Eq)?;

        let from_type = self.expr()?;
        self.check_types(VarType::Int, from_type)?;
        self.emit(&format!("mov {}, EAX", var_ref));

        self.expect_keyword(KeywordKind::To)?;

        let for_label = self.next_label("for");
        self.emit_label(&for_label);
        let endfor_label = self.next_label("endfor");

        // The bound is evaluated fresh on every iteration.
        let to_type = self.expr()?;
        self.check_types(VarType::Int, to_type)?;

        self.emit(&format!("cmp {}, EAX", var_ref));
        self.emit(&format!("jge {}", endfor_label));

        self.statements(&[KeywordKind::EndFor])?;
        self.expect_keyword(KeywordKind::EndFor)?;

        self.emit(&format!("inc DWORD {}", var_ref));
        self.emit(&format!("jmp {}", for_label));
        self.emit_label(&endfor_label);
        Ok(())
    }

    /// `printStmt := (PRINT|PRINTLN) expr`
    ///
    /// Dispatches on the expression type, then calls `printf` under
    /// the Win64 convention with its shadow-space reservation; PRINTLN
    /// appends a `putchar` newline inside the same reservation.
    fn print_stmt(&mut self) -> CompileResult<()> {
        let is_println = self.token.is_keyword(KeywordKind::PrintLn);
        self.advance()?;

        let expr_type = self.expr()?;
        match expr_type {
            VarType::Int => {
                self.add_data("INT_FMT: db '%d', 0".to_string());
                self.emit("mov RCX, INT_FMT");
                self.emit("mov EDX, EAX");
            }
            VarType::Float => {
                self.add_data("FLOAT_FMT: db '%.16g', 0".to_string());
                self.emit("mov RCX, FLOAT_FMT");
                self.emit("movq RDX, XMM0");
            }
            VarType::Str => {
                self.emit("mov RCX, RAX");
            }
            VarType::Bool => {
                self.add_data("TRUE: db 'true', 0".to_string());
                self.add_data("FALSE: db 'false', 0".to_string());
                // Branchless selection between the two fixed strings.
                self.emit("cmp AL, 1");
                self.emit("mov RCX, FALSE");
                self.emit("mov RDX, TRUE");
                self.emit("cmovz RCX, RDX");
            }
            VarType::NoType => return Err(TypeError::Print(expr_type).into()),
        }

        self.emit("sub RSP, 0x20");
        self.emit("extern printf");
        self.emit("call printf");
        if is_println {
            self.emit("extern putchar");
            self.emit("mov rcx, 10");
            self.emit("call putchar");
        }
        self.emit("add RSP, 0x20");
        Ok(())
    }

    /// `expr := atom (symbol atom)?`
    ///
    /// At most one operator, no precedence, no parentheses. The left
    /// value is saved on the stack while the right atom claims the
    /// primary register slot, then popped into the secondary slot.
    fn expr(&mut self) -> CompileResult<VarType> {
        let left_type = self.atom()?;

        let op = match self.token.kind {
            TokenKind::Symbol(symbol) if symbol.is_operator() => symbol,
            _ => return Ok(left_type),
        };

        match left_type {
            VarType::Int => self.emit("push RAX"),
            VarType::Float => {
                self.emit("sub RSP, 0x08");
                self.emit("movq [RSP], XMM0");
            }
            _ => return Err(TypeError::Operand(left_type).into()),
        }

        self.advance()?;
        let right_type = self.atom()?;
        self.check_types(left_type, right_type)?;

        match left_type {
            VarType::Int => self.emit("pop RBX"),
            VarType::Float => {
                self.emit("movq XMM1, [RSP]");
                self.emit("add RSP, 0x08");
            }
            _ => {}
        }

        match opcode(left_type, op) {
            Some(code) => self.emit(code),
            None => return Err(TypeError::Operand(left_type).into()),
        }

        if op.is_comparison() {
            Ok(VarType::Bool)
        } else {
            Ok(left_type)
        }
    }

    /// `atom := CONSTANT | VARIABLE`
    ///
    /// Leaves the value in the primary slot for its type. Integer
    /// literals are immediates; float and string literals are hoisted
    /// to deduplicated labels in the data section.
    fn atom(&mut self) -> CompileResult<VarType> {
        match self.token.kind {
            TokenKind::Constant(var_type) => {
                let text = self.token.text.clone();
                match var_type {
                    VarType::Int => self.emit(&format!("mov EAX, {}", text)),
                    VarType::Float => {
                        let name = self.float_constant(&text);
                        self.emit(&format!("movq XMM0, [{}]", name));
                    }
                    VarType::Str => {
                        let name = self.string_constant(&text);
                        self.emit(&format!("mov RAX, {}", name));
                    }
                    _ => return Err(SyntaxError::Unexpected(self.token.clone()).into()),
                }
                self.advance()?;
                Ok(var_type)
            }
            TokenKind::Variable(var_type) => {
                let name = self.token.text.clone();
                match var_type {
                    VarType::Int => self.emit(&format!("mov EAX, [_{}]", name)),
                    VarType::Float => self.emit(&format!("movq XMM0, [_{}]", name)),
                    VarType::Str => self.emit(&format!("mov RAX, [_{}]", name)),
                    _ => return Err(SyntaxError::Unexpected(self.token.clone()).into()),
                }
                self.advance()?;
                Ok(var_type)
            }
            _ => Err(SyntaxError::Unexpected(self.token.clone()).into()),
        }
    }
}

/// Output plumbing.
impl<'a> Compiler<'a> {
    fn expect_keyword(&mut self, expected: KeywordKind) -> CompileResult<()> {
        if self.token.is_keyword(expected) {
            self.advance()
        } else {
            Err(SyntaxError::ExpectedKeyword {
                expected,
                found: self.token.clone(),
            }
            .into())
        }
    }

    fn expect_symbol(&mut self, expected: SymbolKind) -> CompileResult<()> {
        match self.token.kind {
            TokenKind::Symbol(symbol) if symbol == expected => self.advance(),
            _ => Err(SyntaxError::ExpectedSymbol {
                expected,
                found: self.token.clone(),
            }
            .into()),
        }
    }

    fn check_types(&self, expected: VarType, found: VarType) -> CompileResult<()> {
        if expected == found {
            Ok(())
        } else {
            Err(TypeError::Mismatch { expected, found }.into())
        }
    }

    /// Allocate a fresh label. The counter is shared by every label
    /// purpose, so numbers are globally unique but not contiguous per
    /// kind.
    fn next_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.label_id);
        self.label_id += 1;
        label
    }

    /// Record a static-data declaration, once.
    fn add_data(&mut self, entry: String) {
        if self.data_seen.insert(entry.clone()) {
            self.data.push(entry);
        }
    }

    /// Label for a literal, pooled by (text, type) so identical
    /// literals share one storage location.
    fn constant_label(&mut self, text: &SmolStr, var_type: VarType) -> String {
        if let Some(name) = self.constants.get(&(text.clone(), var_type)) {
            return name.clone();
        }
        let name = self.next_label(&var_type.to_string());
        self.constants.insert((text.clone(), var_type), name.clone());
        name
    }

    fn float_constant(&mut self, text: &SmolStr) -> String {
        let name = self.constant_label(text, VarType::Float);
        self.add_data(format!("{}: dq {}", name, text));
        name
    }

    fn string_constant(&mut self, text: &SmolStr) -> String {
        let name = self.constant_label(text, VarType::Str);
        self.add_data(format!("{}: db '{}', 0", name, text));
        name
    }

    fn emit0(&mut self, line: &str) {
        self.code.push(line.to_owned());
    }

    fn emit(&mut self, line: &str) {
        self.code.push(format!("  {}", line));
    }

    fn emit_label(&mut self, label: &str) {
        self.code.push(format!("{}:", label));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(LexError),
    Syntax(SyntaxError),
    Type(TypeError),
}

impl error::Error for CompileError {}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Lex(err) => fmt::Display::fmt(err, f),
            CompileError::Syntax(err) => fmt::Display::fmt(err, f),
            CompileError::Type(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<LexError> for CompileError {
    fn from(err: LexError) -> Self {
        CompileError::Lex(err)
    }
}

impl From<SyntaxError> for CompileError {
    fn from(err: SyntaxError) -> Self {
        CompileError::Syntax(err)
    }
}

impl From<TypeError> for CompileError {
    fn from(err: TypeError) -> Self {
        CompileError::Type(err)
    }
}

/// Error returned when the token sequence does not match the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    ExpectedKeyword { expected: KeywordKind, found: Token },
    ExpectedSymbol { expected: SymbolKind, found: Token },
    ExpectedVariable { found: Token },
    Unexpected(Token),
    UnexpectedEof,
}

impl error::Error for SyntaxError {}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SyntaxError as E;
        match self {
            E::ExpectedKeyword { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            E::ExpectedSymbol { expected, found } => {
                write!(f, "expected '{}', found {}", expected, found)
            }
            E::ExpectedVariable { found } => write!(f, "expected a variable, found {}", found),
            E::Unexpected(token) => write!(f, "unexpected token {}", token),
            E::UnexpectedEof => write!(f, "unexpected end of input"),
        }
    }
}

/// Error returned when operand types do not line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeError {
    Mismatch { expected: VarType, found: VarType },
    /// Operators apply to INT and FLOAT operands only.
    Operand(VarType),
    /// FOR control variables must be integers.
    LoopVariable(VarType),
    Assignment(VarType),
    Print(VarType),
}

impl error::Error for TypeError {}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use TypeError as E;
        match self {
            E::Mismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            E::Operand(var_type) => {
                write!(f, "operators cannot be applied to {} operands", var_type)
            }
            E::LoopVariable(var_type) => {
                write!(f, "FOR variable must be INT, was {}", var_type)
            }
            E::Assignment(var_type) => write!(f, "cannot assign a value of type {}", var_type),
            E::Print(var_type) => write!(f, "cannot print a value of type {}", var_type),
        }
    }
}
