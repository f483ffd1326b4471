mod completion;

pub use completion::CompletionArgs;

use crate::Command;

/// Handles auxiliary (e.g., completion) commands.
/// Returns Ok(true) if an auxiliary command was handled.
pub fn handle_auxiliary_command(command: Option<&Command>) -> anyhow::Result<bool> {
    match command {
        Some(Command::Completion(args)) => {
            completion::handle(args)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
