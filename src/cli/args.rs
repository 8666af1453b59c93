//! Command-line argument parsing for opencode-events.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Consume the event stream (default). The server address comes from
    /// the first positional argument, falling back to `OPENCODE_URL`.
    Run { url: Option<String> },
}

/// Parse command-line arguments and return the command to execute.
///
/// # Examples
///
/// ```
/// use opencode_events::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["opencode-events".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut url = None;
    for arg in args.skip(1) {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            flag if flag.starts_with('-') => {}
            _ => {
                if url.is_none() {
                    url = Some(arg);
                }
            }
        }
    }
    CliCommand::Run { url }
}
