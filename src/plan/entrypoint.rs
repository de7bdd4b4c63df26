//! Proxy-runner entrypoint synthesis
//!
//! The container runs `mcp-proxy`, which spawns the stdio server and
//! exposes it over HTTP on [`PROXY_PORT`].

use super::StartCommand;

pub const PROXY_PROGRAM: &str = "mcp-proxy";
pub const PROXY_PORT: u16 = 8000;
pub const ARG_SEPARATOR: &str = "--";

/// Flags passed to the proxy before the wrapped program
pub const PROXY_FLAGS: [&str; 4] = ["--debug", "--port", "8000", "--shell"];

/// Command used when nothing was resolved
pub const DEFAULT_COMMAND: [&str; 3] = ["python", "-m", "server"];

/// Wraps a start command in the proxy-runner invocation.
///
/// `[prog]` becomes `proxy.. prog`, `[prog, a, b]` becomes
/// `proxy.. prog -- a b`. `None` appends [`DEFAULT_COMMAND`] verbatim.
pub fn synthesize_entrypoint(command: Option<&StartCommand>) -> StartCommand {
    let mut tokens: Vec<String> = Vec::with_capacity(8);
    tokens.push(PROXY_PROGRAM.to_string());
    tokens.extend(PROXY_FLAGS.iter().map(|s| s.to_string()));

    match command {
        Some(cmd) => append_wrapped(&mut tokens, cmd.program(), cmd.args()),
        None => tokens.extend(DEFAULT_COMMAND.iter().map(|s| s.to_string())),
    }

    StartCommand(tokens)
}

fn append_wrapped(tokens: &mut Vec<String>, program: &str, args: &[String]) {
    tokens.push(program.to_string());
    if !args.is_empty() {
        tokens.push(ARG_SEPARATOR.to_string());
        tokens.extend(args.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefix() -> Vec<String> {
        ["mcp-proxy", "--debug", "--port", "8000", "--shell"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn cmd(tokens: &[&str]) -> StartCommand {
        StartCommand::new(tokens.iter().copied()).unwrap()
    }

    #[test]
    fn test_single_token() {
        let mut expected = prefix();
        expected.push("x".into());
        assert_eq!(synthesize_entrypoint(Some(&cmd(&["x"]))).tokens(), expected);
    }

    #[test]
    fn test_arguments_follow_separator() {
        let mut expected = prefix();
        expected.extend(["x", "--", "a", "b"].iter().map(|s| s.to_string()));
        assert_eq!(
            synthesize_entrypoint(Some(&cmd(&["x", "a", "b"]))).tokens(),
            expected
        );
    }

    #[test]
    fn test_none_uses_default() {
        let mut expected = prefix();
        expected.extend(["python", "-m", "server"].iter().map(|s| s.to_string()));
        assert_eq!(synthesize_entrypoint(None).tokens(), expected);
    }

    #[test]
    fn test_arguments_are_not_rewritten() {
        let command = cmd(&["uvx", "--from", ".", "srv", "--", "--flag"]);
        let entry = synthesize_entrypoint(Some(&command));
        assert_eq!(&entry.tokens()[5..], ["uvx", "--", "--from", ".", "srv", "--", "--flag"]);
    }

    #[test]
    fn test_deterministic() {
        let command = cmd(&["node", "dist/index.js"]);
        assert_eq!(
            synthesize_entrypoint(Some(&command)),
            synthesize_entrypoint(Some(&command))
        );
    }
}
