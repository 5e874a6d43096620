//! # Shell Completion Module
//!
//! Generates completion scripts for Melodex through clap's completion system.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! melodex completion bash > ~/.local/share/bash-completion/completions/melodex
//!
//! # Generate zsh completions
//! melodex completion zsh > ~/.config/zsh/completions/_melodex
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::Write;

/// Write the completion script for `cmd` to `out`.
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

impl From<Shell> for CompletionShell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => CompletionShell::Bash,
            Shell::Zsh => CompletionShell::Zsh,
            Shell::Fish => CompletionShell::Fish,
            Shell::PowerShell => CompletionShell::PowerShell,
            Shell::Elvish => CompletionShell::Elvish,
        }
    }
}
