//! Entrypoint for CLI
use std::{env, error::Error, fs};

use log::error;
use ssl_compiler::{compile_str, Lexer, TokenKind, IMPL_VERSION};

static USAGE: &str = r#"
usage: sslc [--tokens] FILE

options:
    --tokens    List the lexed tokens instead of compiling

examples:
    sslc fizzbuzz.ssl
    sslc --tokens fizzbuzz.ssl
"#;

fn compile_file(filepath: impl AsRef<str>) -> Result<(), Box<dyn Error>> {
    let source_code = fs::read_to_string(filepath.as_ref())?;

    match compile_str(source_code.as_str()) {
        Ok(lines) => {
            for line in &lines {
                println!("{line}");
            }
            Ok(())
        }
        Err(err) => {
            error!("compile error: {err}");
            Err(err.into())
        }
    }
}

fn list_tokens(filepath: impl AsRef<str>) -> Result<(), Box<dyn Error>> {
    use TokenKind as TK;

    let source_code = fs::read_to_string(filepath.as_ref())?;

    let lexer = Lexer::new(source_code.as_str());
    let source = lexer.source_code();

    println!("offset | len | token       | fragment ");
    for result in lexer {
        let token = result?;

        let offset = token.span.index;
        let len = token.span.size;
        let kind = format!("{:?}", token.kind); // cannot format debug print {:?} into columns
        match token.kind {
            TK::EndOfFile => println!("{offset:7}:{len: <3} {kind: <20}"),
            _ => {
                let fragment = token.span.fragment(source);
                println!("{offset:7}:{len: <3} {kind: <20} \"{fragment}\"")
            }
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Compile { filepath }) => compile_file(filepath)?,
        Some(Cmd::Tokens { filepath }) => list_tokens(filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(arg) => match arg.as_str() {
            "--tokens" => Some(Cmd::Tokens {
                filepath: args.next()?,
            }),
            "--help" | "-h" => None,
            filepath => Some(Cmd::Compile {
                filepath: filepath.to_string(),
            }),
        },
        None => None,
    }
}

fn print_usage() {
    println!("sslc v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Compile the file and write assembly to stdout
    Compile { filepath: String },
    /// Dump the token table
    Tokens { filepath: String },
}
