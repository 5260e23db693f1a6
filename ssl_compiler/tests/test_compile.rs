use ssl_compiler::{
    compile::{CompileError, SyntaxError, TypeError},
    compile_str,
    tokens::VarType,
};

fn compile(source: &str) -> Vec<String> {
    compile_str(source).unwrap()
}

fn compile_err(source: &str) -> CompileError {
    compile_str(source).unwrap_err()
}

#[test]
fn test_empty_program() {
    assert_eq!(
        compile(""),
        vec![
            "global main",
            "section .text",
            "main:",
            "  extern exit",
            "  call exit\n",
        ]
    );

    // Comment-only source is also an empty program, with no data
    // section.
    let lines = compile("# nothing here\n");
    assert!(!lines.iter().any(|line| line.contains("section .data")));
}

#[test]
fn test_assignment_int() {
    assert_eq!(
        compile("i = 1 + 1"),
        vec![
            "global main",
            "section .text",
            "main:",
            "  mov EAX, 1",
            "  push RAX",
            "  mov EAX, 1",
            "  pop RBX",
            "  add EAX, EBX",
            "  mov [_i], EAX",
            "  extern exit",
            "  call exit\n",
            "section .data",
            "  _i: dd 0",
        ]
    );
}

#[test]
fn test_variable_load_and_storage_declared_once() {
    let lines = compile("i = 3\nprintln i\ni = 4");

    assert!(lines.contains(&"  mov [_i], EAX".to_string()));
    assert!(lines.contains(&"  mov EAX, [_i]".to_string()));

    let decls = lines.iter().filter(|line| *line == "  _i: dd 0").count();
    assert_eq!(decls, 1);
}

#[test]
fn test_int_operators() {
    let lines = compile("i = 6 - 2");
    assert!(lines.contains(&"  xchg EAX, EBX\n  sub EAX, EBX".to_string()));

    let lines = compile("i = 6 / 2");
    assert!(lines.contains(&"  xchg EAX, EBX\n  cdq\n  idiv EBX".to_string()));

    let lines = compile("i = 6 * 2");
    assert!(lines.contains(&"  imul EAX, EBX".to_string()));
}

#[test]
fn test_float_expression() {
    let lines = compile("a = 1.5 + 2.5");

    assert_eq!(
        &lines[3..9],
        &[
            "  movq XMM0, [FLOAT_0]",
            "  sub RSP, 0x08",
            "  movq [RSP], XMM0",
            "  movq XMM0, [FLOAT_1]",
            "  movq XMM1, [RSP]",
            "  add RSP, 0x08",
        ]
    );
    assert!(lines.contains(&"  addsd XMM0, XMM1".to_string()));
    assert!(lines.contains(&"  movq [_a], XMM0".to_string()));
    assert!(lines.contains(&"  FLOAT_0: dq 1.5".to_string()));
    assert!(lines.contains(&"  FLOAT_1: dq 2.5".to_string()));
    assert!(lines.contains(&"  _a: dq 0.0".to_string()));
}

#[test]
fn test_float_comparison_operand_order() {
    let lines = compile("a = 1.0\nif a < 2.0 then endif");
    assert!(lines.contains(&"  comisd XMM1, XMM0\n  setb AL".to_string()));
}

#[test]
fn test_constant_pool_dedup() {
    let lines = compile("a = 1.5\nb = 1.5");

    let pooled = lines
        .iter()
        .filter(|line| *line == "  FLOAT_0: dq 1.5")
        .count();
    assert_eq!(pooled, 1);
    assert!(!lines.iter().any(|line| line.contains("FLOAT_1")));

    // Both loads reference the shared label.
    let loads = lines
        .iter()
        .filter(|line| *line == "  movq XMM0, [FLOAT_0]")
        .count();
    assert_eq!(loads, 2);

    // Data entries appear in first-declared order: the literal is
    // evaluated before either variable's storage is declared.
    let pos = |needle: &str| lines.iter().position(|line| line == needle).unwrap();
    assert!(pos("  FLOAT_0: dq 1.5") < pos("  _a: dq 0.0"));
    assert!(pos("  _a: dq 0.0") < pos("  _b: dq 0.0"));
}

#[test]
fn test_string_assignment_and_print() {
    let lines = compile("s = \"hi\"\nprint s");

    assert!(lines.contains(&"  mov RAX, STR_0".to_string()));
    assert!(lines.contains(&"  mov [_s], RAX".to_string()));
    assert!(lines.contains(&"  mov RAX, [_s]".to_string()));
    assert!(lines.contains(&"  mov RCX, RAX".to_string()));
    assert!(lines.contains(&"  STR_0: db 'hi', 0".to_string()));
    assert!(lines.contains(&"  _s: dq 0".to_string()));
}

#[test]
fn test_print_int() {
    assert_eq!(
        compile("print 7"),
        vec![
            "global main",
            "section .text",
            "main:",
            "  mov EAX, 7",
            "  mov RCX, INT_FMT",
            "  mov EDX, EAX",
            "  sub RSP, 0x20",
            "  extern printf",
            "  call printf",
            "  add RSP, 0x20",
            "  extern exit",
            "  call exit\n",
            "section .data",
            "  INT_FMT: db '%d', 0",
        ]
    );
}

#[test]
fn test_println_appends_newline() {
    let lines = compile("println 7");

    let start = lines.iter().position(|line| line == "  sub RSP, 0x20").unwrap();
    assert_eq!(
        &lines[start..start + 7],
        &[
            "  sub RSP, 0x20",
            "  extern printf",
            "  call printf",
            "  extern putchar",
            "  mov rcx, 10",
            "  call putchar",
            "  add RSP, 0x20",
        ]
    );
}

#[test]
fn test_print_float_format() {
    let lines = compile("print 1.5");
    assert!(lines.contains(&"  mov RCX, FLOAT_FMT".to_string()));
    assert!(lines.contains(&"  movq RDX, XMM0".to_string()));
    assert!(lines.contains(&"  FLOAT_FMT: db '%.16g', 0".to_string()));
}

#[test]
fn test_print_bool() {
    let lines = compile("print 1 == 2");

    let start = lines.iter().position(|line| line == "  cmp AL, 1").unwrap();
    assert_eq!(
        &lines[start..start + 4],
        &[
            "  cmp AL, 1",
            "  mov RCX, FALSE",
            "  mov RDX, TRUE",
            "  cmovz RCX, RDX",
        ]
    );
    assert!(lines.contains(&"  TRUE: db 'true', 0".to_string()));
    assert!(lines.contains(&"  FALSE: db 'false', 0".to_string()));
}

#[test]
fn test_if_without_else() {
    let lines = compile("if 1 == 2 then print 3 endif");

    assert!(lines.contains(&"  cmp AL, 0x01".to_string()));
    assert!(lines.contains(&"  jne else_0".to_string()));
    assert!(lines.contains(&"else_0:".to_string()));

    // Without an ELSE branch there is no jump over it and no join
    // label.
    assert!(!lines.iter().any(|line| line.contains("jmp endif")));
    assert!(!lines.iter().any(|line| line.contains("endif_1:")));
}

#[test]
fn test_if_with_else() {
    let lines = compile("if 1 == 2 then print 3 else print 4 endif");

    let pos = |needle: &str| lines.iter().position(|line| line == needle).unwrap();
    assert!(pos("  jne else_0") < pos("  jmp endif_1"));
    assert!(pos("  jmp endif_1") < pos("else_0:"));
    assert!(pos("else_0:") < pos("endif_1:"));
}

#[test]
fn test_for_loop() {
    let lines = compile("for i = 0 to 3 println i endfor");

    let pos = |needle: &str| lines.iter().position(|line| line == needle).unwrap();

    // Initialization precedes the loop label, the bound check sits
    // inside the loop.
    assert!(pos("  mov [_i], EAX") < pos("for_0:"));
    assert!(pos("for_0:") < pos("  cmp [_i], EAX"));
    assert!(pos("  cmp [_i], EAX") < pos("  jge endfor_1"));
    assert!(pos("  jge endfor_1") < pos("  inc DWORD [_i]"));
    assert!(pos("  inc DWORD [_i]") < pos("  jmp for_0"));
    assert!(pos("  jmp for_0") < pos("endfor_1:"));

    let incs = lines
        .iter()
        .filter(|line| *line == "  inc DWORD [_i]")
        .count();
    assert_eq!(incs, 1);
}

#[test]
fn test_for_control_variable_must_be_int() {
    assert_eq!(
        compile_err("for a = 0 to 3 endfor"),
        CompileError::Type(TypeError::LoopVariable(VarType::Float))
    );
}

#[test]
fn test_shared_label_counter() {
    // The IF consumes labels 0 and 1, so the float constant inside
    // the branch is numbered 2.
    let lines = compile("if 1 == 1 then a = 2.5 endif");
    assert!(lines.contains(&"  FLOAT_2: dq 2.5".to_string()));
}

#[test]
fn test_assignment_type_mismatch() {
    assert_eq!(
        compile_err("i = 1.5"),
        CompileError::Type(TypeError::Mismatch {
            expected: VarType::Int,
            found: VarType::Float,
        })
    );
}

#[test]
fn test_condition_must_be_bool() {
    assert_eq!(
        compile_err("if 1 then endif"),
        CompileError::Type(TypeError::Mismatch {
            expected: VarType::Bool,
            found: VarType::Int,
        })
    );
}

#[test]
fn test_operator_operands_must_be_numeric() {
    assert_eq!(
        compile_err("s = \"a\" + \"b\""),
        CompileError::Type(TypeError::Operand(VarType::Str))
    );
}

#[test]
fn test_mixed_operand_types() {
    assert_eq!(
        compile_err("i = 1 + 1.5"),
        CompileError::Type(TypeError::Mismatch {
            expected: VarType::Int,
            found: VarType::Float,
        })
    );
}

#[test]
fn test_unterminated_if() {
    assert_eq!(
        compile_err("if 1 == 1 then print 1"),
        CompileError::Syntax(SyntaxError::UnexpectedEof)
    );
}

#[test]
fn test_missing_assignment_symbol() {
    match compile_err("i 3") {
        CompileError::Syntax(SyntaxError::ExpectedSymbol { found, .. }) => {
            assert_eq!(found.text, "3");
        }
        err => panic!("unexpected error {:?}", err),
    }
}

#[test]
fn test_step_keyword_is_not_a_statement() {
    match compile_err("for i = 0 to 3 step endfor") {
        CompileError::Syntax(SyntaxError::Unexpected(token)) => {
            assert_eq!(token.text, "STEP");
        }
        err => panic!("unexpected error {:?}", err),
    }
}

#[test]
fn test_lex_error_propagates() {
    match compile_err("i = 1 ;") {
        CompileError::Lex(_) => {}
        err => panic!("unexpected error {:?}", err),
    }
}
