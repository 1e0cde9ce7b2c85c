//! relshell - interactive relational algebra shell

use std::env;
use std::io::{self, Write};
use std::process;

use anyhow::Context as _;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use tracing_subscriber::EnvFilter;

use relshell::executor::ExecutionEngine;
use relshell::format::format_result;

const USAGE: &str = "Usage: relshell [PROGRAM_FILE]";

/// An algebra operator offered on TAB
struct Operator {
    symbol: &'static str,
    name: &'static str,
    syntax: &'static str,
}

const OPERATORS: &[Operator] = &[
    Operator { symbol: "π", name: "projection", syntax: "π columns (R)" },
    Operator { symbol: "σ", name: "restriction", syntax: "σ condition (R)" },
    Operator { symbol: "⋈", name: "join", syntax: "R ⋈ S | condition" },
    Operator { symbol: "U", name: "union", syntax: "R U S" },
    Operator { symbol: "∩", name: "intersection", syntax: "R ∩ S" },
    Operator { symbol: "-", name: "difference", syntax: "R - S" },
    Operator { symbol: "X", name: "product", syntax: "R X S" },
];

/// Operators matching the word before `pos`, by symbol or by name, and the
/// byte offset where that word starts
fn operator_candidates(line: &str, pos: usize) -> (usize, Vec<&'static Operator>) {
    let before = &line[..pos];
    let start = before
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || *c == '(' || *c == ')')
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);

    let word = before[start..].to_lowercase();
    let matches = OPERATORS
        .iter()
        .filter(|op| op.name.starts_with(&word) || op.symbol.to_lowercase().starts_with(&word))
        .collect();
    (start, matches)
}

/// Line editor helper completing algebra operators
struct ShellHelper;

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, operators) = operator_candidates(line, pos);
        let pairs = operators
            .into_iter()
            .map(|op| Pair {
                display: format!("{}  {:<12} {}", op.symbol, op.name, op.syntax),
                replacement: op.symbol.to_string(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// Print welcome banner
fn print_banner() {
    println!(
        r#"
          _     _          _ _
 _ __ ___| |___| |__   ___| | |
| '__/ _ \ / __| '_ \ / _ \ | |
| | |  __/ \__ \ | | |  __/ | |
|_|  \___|_|___/_| |_|\___|_|_|

 An interactive relational algebra shell
 Type '.help' for help, '.quit' to exit
"#
    );
}

/// Print help message
fn print_help() {
    println!(
        r#"
Commands:
  .help              Show this help message
  .model             Show the relational model
  .raw_model         Show the relational model without styling
  .quit, .exit       Exit relshell
  .clear             Clear screen

Statements (end with ';' or an empty line):
  Name(_key, attr, #fk)          Define relations, one or more at once
      fk references Other.key    Declare the foreign key of #fk
  insert R(v1, v2, ...)          Insert a tuple, checking keys
  force insert R(v1, v2, ...)    Insert a tuple, skipping foreign keys
  delete R where a = v           Delete tuples, checking references
  force delete R where a = v     Delete tuples, skipping references
  T := expr                      Bind an expression to a temporary relation
  expr                           Evaluate and print an expression
  print R                        Print a relation

Operators (press TAB to insert one):
  π a, b (R)        project       σ a > 1 (R)       select
  R ⋈ S | a = b     join          R ∪ S, R U S      union
  R ∩ S             intersect     R - S             minus
  R × S, R X S      times
"#
    );
}

/// Parse, execute and print one buffered statement
fn execute_statement(source: &str, engine: &mut ExecutionEngine) -> bool {
    let source = source.trim();
    if source.is_empty() {
        return false;
    }

    match engine.execute_source(source) {
        Ok(result) => {
            print!("{}", format_result(&result));
            result.exit
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            false
        }
    }
}

/// Handle special dot commands. Returns true when the shell should exit.
fn handle_special_command(cmd: &str, engine: &mut ExecutionEngine) -> bool {
    match cmd.split_whitespace().next() {
        Some(".help") => print_help(),
        Some(".clear") => {
            print!("\x1B[2J\x1B[1;1H");
            let _ = io::stdout().flush();
        }
        Some(".quit") | Some(".exit") => return true,
        Some(".model") | Some(".raw_model") => return execute_statement(cmd, engine),
        Some(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Type '.help' for available commands.");
        }
        None => {}
    }
    false
}

/// Main REPL loop
fn run_repl(engine: &mut ExecutionEngine) -> anyhow::Result<()> {
    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut editor: Editor<ShellHelper, DefaultHistory> =
        Editor::with_config(config).context("failed to start line editor")?;
    editor.set_helper(Some(ShellHelper));

    print_banner();
    if !engine.catalog().is_empty() {
        execute_statement(".model", engine);
    }

    let mut input_buffer = String::new();

    loop {
        let prompt = if input_buffer.is_empty() {
            "relshell> "
        } else {
            "     ...> "
        };

        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                input_buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };

        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let _ = editor.add_history_entry(trimmed);
        }

        // Handle special commands
        if input_buffer.is_empty() && trimmed.starts_with('.') {
            if handle_special_command(trimmed, engine) {
                break;
            }
            continue;
        }

        // An empty line runs whatever has been typed so far
        if trimmed.is_empty() {
            if !input_buffer.is_empty() {
                let source = std::mem::take(&mut input_buffer);
                if execute_statement(&source, engine) {
                    break;
                }
            }
            continue;
        }

        input_buffer.push_str(&line);
        input_buffer.push('\n');

        if trimmed.ends_with(';') {
            let source = std::mem::take(&mut input_buffer);
            if execute_statement(&source, engine) {
                break;
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut program_file = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ if program_file.is_none() => program_file = Some(arg),
            _ => {
                eprintln!("{}", USAGE);
                process::exit(2);
            }
        }
    }

    let mut engine = ExecutionEngine::new();
    if let Some(path) = program_file {
        if let Err(e) = engine.load_file(&path) {
            eprintln!("{}: {}", path, e);
            process::exit(1);
        }
    }

    run_repl(&mut engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(line: &str) -> (usize, Vec<&'static str>) {
        let (start, ops) = operator_candidates(line, line.len());
        (start, ops.into_iter().map(|op| op.symbol).collect())
    }

    #[test]
    fn test_empty_word_offers_every_operator() {
        let (start, found) = symbols("Emp ");
        assert_eq!(start, 4);
        assert_eq!(found, vec!["π", "σ", "⋈", "U", "∩", "-", "X"]);
    }

    #[test]
    fn test_operator_names_complete_to_symbols() {
        assert_eq!(symbols("proj"), (0, vec!["π"]));
        assert_eq!(symbols("pro"), (0, vec!["π", "X"]));
        assert_eq!(symbols("Emp J"), (4, vec!["⋈"]));
        assert_eq!(symbols("π name (res"), (8, vec!["σ"]));
        assert_eq!(symbols("Emp u"), (4, vec!["U"]));
        assert!(symbols("Emp").1.is_empty());
    }

    #[test]
    fn test_word_start_after_multibyte_symbols() {
        // π is two bytes long
        let (start, found) = symbols("π id (Emp) ∩ σ");
        assert_eq!(start, "π id (Emp) ∩ ".len());
        assert_eq!(found, vec!["σ"]);
    }
}
