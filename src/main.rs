use std::fs;

use anyhow::{Context, Result, bail};
use tinyscript::{bytecode, lexer, parser, vm};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("Usage: tinyscript <input_file>");
    };
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?;

    let tokens = lexer::tokenize(&source);
    let program = parser::parse_tokens(tokens)?;
    let compiled = bytecode::compile(&program)?;

    let mut vm = vm::Vm::new();
    let result = vm.run(&compiled);
    // Flush whatever executed before a runtime error stopped the program.
    print!("{}", vm.output());
    result?;
    Ok(())
}
