//! `taxa completions <shell>`: print a completion script for the taxa CLI.
//!
//! Install with e.g. `taxa completions bash > ~/.local/share/bash-completion/completions/taxa`.

use crate::cli::Cli;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

pub fn execute(args: CompletionsArgs) -> Result<(), Box<dyn std::error::Error>> {
    write_script(args.shell, &mut io::stdout())
}

/// Render the script for `shell` into `out`
pub fn write_script(shell: Shell, out: &mut dyn Write) -> Result<(), Box<dyn std::error::Error>> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    generate(shell, &mut command, bin_name, out);
    out.flush()?;
    Ok(())
}
