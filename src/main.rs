use std::{
    fs,
    io::{self, stdin, IsTerminal},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use quill::{InterpretErr, Interpreter, NativeFunctions};
use rustyline::validate::MatchingBracketValidator;
use rustyline::Editor;
use rustyline::{
    error::ReadlineError, Cmd, ConditionalEventHandler, Event, EventContext, EventHandler, Highlighter,
    KeyEvent, Movement, RepeatCount,
};
use rustyline::{Completer, Helper, Hinter, Validator};

/// Run quill modules, or start an interactive prompt when no files are given.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Module source files; exactly one of them must be `module Main`.
    files: Vec<PathBuf>,

    /// Don't provide clock, print, parseNum and readString.
    #[arg(long)]
    no_natives: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let natives = if cli.no_natives {
        NativeFunctions::new()
    } else {
        NativeFunctions::standard()
    };
    let mut interpreter = Interpreter::with_natives(natives);

    let res = if !cli.files.is_empty() {
        run_files(&cli.files, &mut interpreter)
    } else if !stdin().is_terminal() {
        run_stdin(&mut interpreter)
    } else {
        run_prompt(&mut interpreter)
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

// Interpreter errors hold `Rc`s, so they are rendered before crossing into anyhow.
fn report(err: InterpretErr) -> anyhow::Error {
    anyhow!("{err}")
}

fn run_files(files: &[PathBuf], interpreter: &mut Interpreter) -> Result<()> {
    for path in files {
        let source =
            fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))?;
        interpreter
            .load(&source)
            .map_err(report)
            .with_context(|| format!("in {}", path.display()))?;
    }
    println!("{}", interpreter.run().map_err(report)?);
    Ok(())
}

fn run_stdin(interpreter: &mut Interpreter) -> Result<()> {
    let source = io::read_to_string(stdin().lock()).context("could not read stdin")?;
    interpreter.load(&source).map_err(report)?;
    println!("{}", interpreter.run().map_err(report)?);
    Ok(())
}

struct TabEventHandler;
impl ConditionalEventHandler for TabEventHandler {
    fn handle(&self, _: &Event, _n: RepeatCount, _: bool, _: &EventContext) -> Option<Cmd> {
        Some(Cmd::Indent(Movement::WholeLine))
    }
}

#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
struct PromptHelper {
    #[rustyline(Completer)]
    completer: (),
    #[rustyline(Validator)]
    validator: MatchingBracketValidator,
}

/// Each entry is one module. Libraries stay loaded; a `Main` runs the program
/// and is dropped again afterwards.
fn prompt_entry(line: &str, interpreter: &mut Interpreter) -> Result<(), InterpretErr> {
    let name = interpreter.load(line)?;
    if name.as_str() != "Main" {
        println!("loaded {name}");
        return Ok(());
    }
    let res = interpreter.run();
    interpreter.unload(&name);
    println!("{}", res?);
    Ok(())
}

fn run_prompt(interpreter: &mut Interpreter) -> Result<()> {
    let h = PromptHelper {
        completer: (),
        validator: MatchingBracketValidator::new(),
    };
    let mut rl = Editor::new()?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabEventHandler)),
    );

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                if let Err(err) = prompt_entry(&line, interpreter) {
                    println!("error: {err}");
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
    }
}
