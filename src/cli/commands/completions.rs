//! Shell completion generation.

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;
use crate::error::FieldsyncError;

/// Generate completions for the given shell to a string.
///
/// # Errors
///
/// Returns an error if the generated script is not valid UTF-8.
pub fn completions(shell: Shell) -> Result<String, FieldsyncError> {
    let mut cmd = Cli::command();
    let mut buffer = Vec::new();

    clap_complete::generate(shell, &mut cmd, "fieldsync", &mut buffer);

    String::from_utf8(buffer)
        .map_err(|e| FieldsyncError::Config(format!("Invalid completion output: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_mention_subcommands() {
        let script = completions(Shell::Bash).unwrap();
        assert!(script.contains("fieldsync"));
        assert!(script.contains("status"));
    }
}
