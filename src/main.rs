use std::{fs, path::PathBuf, process::exit};

use argh::FromArgs;
use chronc::{compile, CompilationResult, Error};
use ron::ser::PrettyConfig;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// CLI options
#[derive(FromArgs)]
struct Opts {
    #[argh(subcommand)]
    cmd: Cmd,
}

/// Command
#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Compile(CompileCmd),
}

/// Compile a program
#[derive(FromArgs)]
#[argh(subcommand, name = "compile")]
struct CompileCmd {
    #[argh(positional)]
    source: PathBuf,
    #[argh(switch, description = "show the token stream")]
    tokens: bool,
    #[argh(switch, description = "show the concrete syntax tree")]
    cst: bool,
    #[argh(switch, description = "show the abstract syntax tree")]
    ast: bool,
    #[argh(switch, description = "show the symbol table")]
    symbols: bool,
    #[argh(switch, description = "show a disassembly of the generated code")]
    listing: bool,
    #[argh(switch, description = "show the whole compilation result as RON")]
    ron: bool,
    #[argh(switch, short = 'v', description = "trace every compiler stage")]
    verbose: bool,
}

fn print_ron<T: Serialize>(value: &T) -> Result<(), Error> {
    println!(
        "{}",
        ron::ser::to_string_pretty(
            value,
            PrettyConfig::default()
                .struct_names(true)
                .indentor("  ")
                .compact_arrays(true)
        )?
    );

    Ok(())
}

fn print_result(cmd: &CompileCmd, result: &CompilationResult) {
    if cmd.tokens {
        for token in result.tokens.iter() {
            println!("{:>4} {:<20} {}", token.span.line, token.kind.name(), token.value);
        }

        println!();
    }

    if cmd.cst {
        if let Some(cst) = &result.cst {
            println!("{cst}\n");
        }
    }

    if cmd.ast {
        if let Some(ast) = &result.ast {
            println!("{ast}\n");
        }
    }

    if cmd.symbols {
        if let Some(symbols) = &result.symbols {
            println!("{symbols}");
        }
    }

    for diagnostic in result.diagnostics.iter() {
        println!("{diagnostic}");
    }

    if let Some(code) = &result.code {
        if cmd.listing {
            println!();

            for instruction in code.disassemble() {
                println!("{instruction}");
            }
        }

        println!("\n{code}");
    }
}

fn cmd(opts: Opts) -> Result<bool, Error> {
    match opts.cmd {
        Cmd::Compile(cmd) => {
            let source = fs::read_to_string(&cmd.source)?;
            let result = compile(&source)?;

            if cmd.ron {
                print_ron(&result)?;
            } else {
                print_result(&cmd, &result);
            }

            Ok(!result.has_errors())
        }
    }
}

fn main() {
    let opts: Opts = argh::from_env();

    let Cmd::Compile(CompileCmd { verbose, .. }) = &opts.cmd;
    let filter = if *verbose {
        EnvFilter::new("chronc=trace")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cmd(opts) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    }
}
