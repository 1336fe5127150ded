//! Reporting errors that end up at the top of a command or task.

pub fn print_error(err: anyhow::Error) {
    log::error!("{:?}", err);
}

/// Format an error for a client, including its chain of causes on one line.
pub fn format_error(err: &anyhow::Error) -> String {
    format!("{:#}", err)
}
