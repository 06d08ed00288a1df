// Host boundary: the only place where a fatal tally error ends the process.
use tracing::error;

use crate::error::{KdeError, Result};

/// Exit status used for fatal tally errors
pub const FATAL_EXIT_CODE: i32 = 1;

/// Unwrap `result`, or report the error and terminate the process.
///
/// Meant for the outermost host-integration layer; library code returns
/// [`KdeError`] instead.
pub fn exit_on_fatal<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => fatal(&err),
    }
}

/// Report a fatal error on the diagnostic stream and stderr, then exit
pub fn fatal(err: &KdeError) -> ! {
    error!(error = %err, "fatal KDE mesh tally error");
    eprintln!("Error: {}", err);
    std::process::exit(FATAL_EXIT_CODE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(exit_on_fatal(Ok::<_, KdeError>(7)), 7);
    }
}
