use std::io;
use std::process;

use boardcfg_agent::{CancelToken, SerialTransport};
use boardcfg_runner::{execute, init_logging, Cli, RunOptions};
use clap::Parser;
use tracing::warn;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level, cli.verbose) {
        eprintln!("warning: {}", e);
    }

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        warn!("cannot install Ctrl-C handler: {}", e);
    }

    let transport = SerialTransport::new(cli.serial_params());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(e) = execute(&cli.command, transport, &cancel, &RunOptions::default(), &mut out) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
