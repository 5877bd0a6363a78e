use ansi_term::Colour;
use clap::Parser;
use lc3_monitor::config::Options;
use lc3_monitor::debugger::Machine;
use lc3_monitor::debugger::run::CancellationToken;
use lc3_monitor::errors::MonitorError;
use lc3_monitor::hardware::{
    KeyboardInputProvider, Memory, NoKeyboard, ReaderInputProvider, TerminalInputProvider, model,
};
use lc3_monitor::shell::output::Printer;
use lc3_monitor::shell::{Editor, Shell};
use lc3_monitor::terminal::{self, ConsoleOut};
use std::io;
use std::io::{IsTerminal, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let options = Options::parse();
    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", Colour::Red.bold().paint(e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn print_banner(printer: &mut Printer<impl Write>) -> io::Result<()> {
    printer.info(format!("iit3503 Simulator Version {}", env!("CARGO_PKG_VERSION")))?;
    printer.info("Welcome to the iit3503 interactive debugger.\n")?;
    printer.info("Type \"help\" for help.")?;
    printer.info("Type ctrl+d or \"quit\" to quit.\n")
}

fn run(options: &Options) -> Result<(), MonitorError> {
    let on_terminal = terminal::is_interactive_terminal();
    let mut printer = Printer::new(io::stdout(), on_terminal);
    print_banner(&mut printer)?;

    let memory = Memory::from_files(&options.binary, options.os_image.as_deref())?;
    let model = model::connect(options.trace.as_deref())?;

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())?;

    let keyboard: Box<dyn KeyboardInputProvider> = if on_terminal {
        Box::new(TerminalInputProvider::new(cancel.clone()))
    } else if io::stdin().is_terminal() {
        // stdout redirected, the terminal is never switched to raw mode
        Box::new(NoKeyboard)
    } else {
        Box::new(ReaderInputProvider::new(io::stdin()))
    };
    let console = Box::new(ConsoleOut::new(io::stdout(), on_terminal));
    let mut machine = Machine::new(model, memory, options.machine_config(), keyboard, console);
    machine.reset()?;
    printer.plain("Reset.")?;
    printer.plain("Starting Simulation.")?;

    let mut editor = Editor::new(options.history.clone())?;
    let mut shell = Shell::new(machine, cancel, printer, on_terminal);
    let result = shell.run(&mut editor, options.interactive);
    editor.save_history();
    result
}
