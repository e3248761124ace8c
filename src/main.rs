use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};

use lox::diagnostic::{self, ansi::AnsiRenderer};
use lox::{compile, disassembler, InterpretError, ResultCode, Vm};

/// sysexits EX_IOERR.
const EXIT_IO_ERROR: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "lox", version, about = "Compile and run lox expressions on a bytecode VM")]
struct Cli {
    /// Script to run; starts an interactive prompt when omitted
    path: Option<PathBuf>,

    /// Print the compiled bytecode instead of running it
    #[arg(long)]
    disassemble: bool,

    /// Report diagnostics as JSON, one object per line (listings too, with --disassemble)
    #[arg(long)]
    json: bool,

    /// Disable coloured diagnostics
    #[arg(long)]
    no_color: bool,

    /// Log every executed instruction and the stack to stderr
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.trace);

    let reporter = Reporter::new(&cli);
    let code = match &cli.path {
        Some(path) => run_file(path, &cli, &reporter),
        None => repl(&cli, &reporter),
    };
    ExitCode::from(code)
}

fn init_logging(trace: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format(|buf, record| writeln!(buf, "{}", record.args()));
    if trace {
        builder.filter_module("lox", LevelFilter::Trace);
    }
    builder.init();
}

/// Writes diagnostics to stderr in the selected format.
struct Reporter {
    json: bool,
    ansi: AnsiRenderer,
}

impl Reporter {
    fn new(cli: &Cli) -> Self {
        let use_color = !cli.no_color
            && std::env::var_os("NO_COLOR").is_none()
            && io::stderr().is_terminal();
        Reporter { json: cli.json, ansi: AnsiRenderer { use_color } }
    }

    fn report(&self, err: &InterpretError, source: &str) {
        for d in diagnostic::from_interpret_error(err, source) {
            if self.json {
                eprintln!("{}", diagnostic::json::render(&d));
            } else {
                eprint!("{}", self.ansi.render(&d));
            }
        }
    }
}

fn run_file(path: &Path, cli: &Cli, reporter: &Reporter) -> u8 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {}", path.display(), e);
            return EXIT_IO_ERROR;
        }
    };
    debug!("running {}", path.display());

    if cli.disassemble {
        return disassemble(&source, cli, reporter).exit_code();
    }

    let result = Vm::new().interpret(&source);
    match &result {
        Ok(value) => println!("{value}"),
        Err(e) => reporter.report(e, &source),
    }
    ResultCode::from(&result).exit_code()
}

fn disassemble(source: &str, cli: &Cli, reporter: &Reporter) -> ResultCode {
    match compile(source) {
        Ok(chunk) => {
            if cli.json {
                println!("{}", disassembler::to_json(&chunk, "code"));
            } else {
                print!("{}", disassembler::disassemble_chunk(&chunk, "code"));
            }
            ResultCode::Ok
        }
        Err(e) => {
            let err = InterpretError::from(e);
            reporter.report(&err, source);
            err.result_code()
        }
    }
}

/// Reads one expression per line until end of input. Errors are reported
/// and the session carries on with the same VM.
fn repl(cli: &Cli, reporter: &Reporter) -> u8 {
    let mut vm = Vm::new();
    let mut lines = io::stdin().lock().lines();

    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("{e}");
                return EXIT_IO_ERROR;
            }
            None => {
                println!();
                return 0;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        if cli.disassemble {
            disassemble(&line, cli, reporter);
            continue;
        }
        match vm.interpret(&line) {
            Ok(value) => println!("{value}"),
            Err(e) => reporter.report(&e, &line),
        }
    }
}
