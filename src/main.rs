mod ast;
mod bytecode;
mod lexer;
mod parser;
mod parser_error;
mod runtime;
mod token;

use std::{env, fs, path::Path, process};

use crate::bytecode::ProgramBc;
use crate::bytecode::compile::compile;
use crate::bytecode::disasm::print_bc;
use crate::bytecode::encode::encode_ops;
use crate::bytecode::resolve::resolve;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::runtime::Vm;

struct Options {
    filename: Option<String>,
    tokens_only: bool,
    pretty: bool,
    output: Option<String>,
    image: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        filename: None,
        tokens_only: false,
        pretty: false,
        output: None,
        image: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tokens" => options.tokens_only = true,
            "--pretty" | "-p" => options.pretty = true,
            "-o" | "--out" => {
                i += 1;
                options.output = Some(
                    args.get(i)
                        .ok_or("expected a file name after -o")?
                        .clone(),
                );
            }
            "--image" => {
                i += 1;
                options.image = Some(
                    args.get(i)
                        .ok_or("expected a file name after --image")?
                        .clone(),
                );
            }
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            flag if flag.starts_with('-') => {
                return Err(format!("unknown flag '{}'", flag));
            }
            _ => {
                if options.filename.is_some() {
                    return Err("more than one input file given".to_string());
                }
                options.filename = Some(args[i].clone());
            }
        }
        i += 1;
    }

    Ok(options)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage();
            process::exit(1);
        }
    };

    let filename = match &options.filename {
        Some(filename) => filename,
        None => {
            print_usage();
            process::exit(1);
        }
    };

    ensure_extension(filename);

    let source = match fs::read_to_string(filename) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", filename, e);
            process::exit(1);
        }
    };

    if options.tokens_only {
        dump_tokens(&source);
        return;
    }

    let bc = compile_program(&source);

    if options.pretty {
        print_bc(&bc);
    } else if let Some(path) = &options.output {
        // raw instruction stream for the main body only
        write_file(path, &encode_ops(&bc.main));
    } else if let Some(path) = &options.image {
        // postcard image of the whole program, function table included
        let image = match bc.to_image() {
            Ok(image) => image,
            Err(e) => {
                eprintln!("Failed to serialize program image: {}", e);
                process::exit(1);
            }
        };
        write_file(path, &image);
    } else {
        run_program(&bc);
    }
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("math") {
        eprintln!("Error: expected a .math file, got {}", filename);
        process::exit(1);
    }
}

fn dump_tokens(source: &str) {
    let mut lexer = Lexer::new(source);
    match lexer.tokenize() {
        Ok(tokens) => {
            for spanned in tokens {
                println!(
                    "{}:{}\t{:?}",
                    spanned.span.line, spanned.span.col, spanned.token
                );
            }
        }
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            process::exit(1);
        }
    }
}

fn compile_program(source: &str) -> ProgramBc {
    let mut lexer = Lexer::new(source);
    let tokens = match lexer.tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("Lexer error: {}", e);
            process::exit(1);
        }
    };

    let mut parser = Parser::new(tokens);
    let program = match parser.parse() {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };

    let resolved = match resolve(&program) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Resolve error: {}", e);
            process::exit(1);
        }
    };

    compile(&resolved)
}

fn run_program(bc: &ProgramBc) {
    let mut vm = Vm::new();
    match vm.run(bc) {
        Ok(result) => println!("{}", result),
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(1);
        }
    }
}

fn write_file(path: &str, bytes: &[u8]) {
    if let Err(e) = fs::write(path, bytes) {
        eprintln!("Failed to write '{}': {}", path, e);
        process::exit(1);
    }
}

fn print_usage() {
    println!("FLINT - math-script bytecode compiler and VM");
    println!();
    println!("Usage:");
    println!("  flint <file.math>               Compile and run, print the result");
    println!("  flint --pretty <file.math>      Print the disassembly");
    println!("  flint --tokens <file.math>      Show tokens only");
    println!("  flint -o <out> <file.math>      Write the main body's raw bytecode");
    println!("  flint --image <out> <file.math> Write the full program image");
    println!("  flint --help, -h                Show this help");
}
