//! cellsh-scan - dump the token stream of shell input
//!
//! Usage:
//!   cellsh-scan              Scan stdin (interactive when it is a terminal)
//!   cellsh-scan -c "text"    Scan the given text
//!   cellsh-scan script.sh    Scan a file

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Cursor, IsTerminal, Write};
use std::process::ExitCode;

use cellsh::{Config, EditorSource, LineSource, ReaderSource, Scanner, TokenKind};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"cellsh-scan {} - print the tokens of shell input

USAGE:
    cellsh-scan                 Scan stdin
    cellsh-scan -c <text>       Scan the given text
    cellsh-scan <file>          Scan a file
    cellsh-scan -l, --literals  Also print the value of literal tokens
    cellsh-scan --help          Show this help message
    cellsh-scan --version       Show version

ENVIRONMENT:
    CELLSH_PROMPT               Interactive prompt (default "> ")
    CELLSH_HISTORY              History file (default ~/.cellsh_history)
    RUST_LOG                    Log filter, e.g. cellsh=debug"#,
        VERSION
    );
}

struct CliArgs {
    command: Option<String>,
    script: Option<String>,
    literals: bool,
    help: bool,
    version: bool,
}

fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs {
        command: None,
        script: None,
        literals: false,
        help: false,
        version: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                if i + 1 < args.len() {
                    cli.command = Some(args[i + 1..].join(" "));
                    break;
                }
            }
            "-l" | "--literals" => cli.literals = true,
            "--help" | "-h" => cli.help = true,
            "--version" | "-V" => cli.version = true,
            path => {
                if !path.starts_with('-') {
                    cli.script = Some(path.to_string());
                }
            }
        }
        i += 1;
    }

    cli
}

/// Print every token until end of input; returns false if any fault was seen
fn dump<S: LineSource>(mut scanner: Scanner<S>, literals: bool) -> bool {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut clean = true;

    loop {
        match scanner.next_token() {
            Ok(token) => {
                let line = match (literals, token.literal()) {
                    (true, Some(value)) => format!("{}\t{}\t=> {}", token.line, token, value),
                    _ => format!("{}\t{}", token.line, token),
                };
                if writeln!(out, "{}", line).is_err() {
                    return clean;
                }
                if token.kind == TokenKind::End {
                    return clean;
                }
            }
            // Lexical faults were already reported by the scanner's handler.
            Err(e) => {
                log::debug!("{}", e);
                clean = false;
            }
        }
    }
}

fn scan_interactive(literals: bool) -> io::Result<bool> {
    let config = Config::from_env();
    let source = EditorSource::new(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let scanner = Scanner::new("stdin", source);

    #[cfg(unix)]
    let scanner = match cellsh::ControllingTerminal::stdin() {
        Some(tty) => scanner.with_foreground(Box::new(tty)),
        None => scanner,
    };

    Ok(dump(scanner, literals))
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env().init();

    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args);

    if cli.help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        println!("cellsh-scan {}", VERSION);
        return ExitCode::SUCCESS;
    }

    let clean = if let Some(text) = cli.command {
        let source = ReaderSource::new(Cursor::new(text));
        dump(Scanner::new("-c", source), cli.literals)
    } else if let Some(path) = cli.script {
        match File::open(&path) {
            Ok(file) => {
                let source = ReaderSource::new(BufReader::new(file));
                dump(Scanner::new(path, source), cli.literals)
            }
            Err(e) => {
                eprintln!("cellsh-scan: {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        }
    } else if io::stdin().is_terminal() {
        match scan_interactive(cli.literals) {
            Ok(clean) => clean,
            Err(e) => {
                eprintln!("cellsh-scan: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        let source = ReaderSource::new(io::stdin().lock());
        dump(Scanner::new("stdin", source), cli.literals)
    };

    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
