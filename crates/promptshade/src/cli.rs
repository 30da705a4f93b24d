use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "promptshade",
    author,
    version,
    about = "Text-to-shader preview and calculator"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate an arithmetic expression, or read one per line from stdin.
    Calc(CalcArgs),
    /// Generate a fragment shader from a prompt and preview it in a window.
    Shader(ShaderArgs),
}

#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Expression to evaluate (e.g. `2 + 2`).
    #[arg(value_name = "EXPR")]
    pub expr: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct ShaderArgs {
    /// Describe the shader you want. Further prompts can be typed on stdin
    /// while the preview window is open.
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Render a local fragment shader instead of asking the generation service.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["print_only", "prompt"])]
    pub file: Option<PathBuf>,

    /// Shader generation endpoint.
    #[arg(long, value_name = "URL", env = "PROMPTSHADE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Preview window size (e.g. `800x600`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Request timeout in seconds (0 disables the timeout).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Reject generated text that does not declare `void main`.
    #[arg(long)]
    pub require_main: bool,

    /// Print the generated code and exit without opening a window.
    #[arg(long, requires = "prompt")]
    pub print_only: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{trimmed}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{trimmed}'"))?;
    if width == 0 || height == 0 {
        return Err("size dimensions must be greater than zero".to_string());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_surface_sizes() {
        assert_eq!(parse_surface_size("800x600"), Ok((800, 600)));
        assert_eq!(parse_surface_size(" 1280X720 "), Ok((1280, 720)));
        assert!(parse_surface_size("800").is_err());
        assert!(parse_surface_size("0x600").is_err());
        assert!(parse_surface_size("axb").is_err());
    }

    #[test]
    fn shader_flags_parse() {
        let cli = Cli::try_parse_from([
            "promptshade",
            "shader",
            "a red background",
            "--size",
            "640x480",
            "--timeout",
            "5",
            "--require-main",
        ])
        .unwrap();
        let Command::Shader(args) = cli.command else {
            panic!("expected shader command");
        };
        assert_eq!(args.prompt.as_deref(), Some("a red background"));
        assert_eq!(args.size, Some((640, 480)));
        assert_eq!(args.timeout, Some(5));
        assert!(args.require_main);
        assert!(!args.print_only);
    }

    #[test]
    fn print_only_needs_a_prompt() {
        assert!(Cli::try_parse_from(["promptshade", "shader", "--print-only"]).is_err());
    }

    #[test]
    fn file_and_prompt_are_exclusive() {
        assert!(Cli::try_parse_from([
            "promptshade",
            "shader",
            "a red background",
            "--file",
            "effect.frag",
        ])
        .is_err());
        assert!(
            Cli::try_parse_from(["promptshade", "shader", "--file", "effect.frag"]).is_ok()
        );
    }

    #[test]
    fn calc_expression_is_optional() {
        let cli = Cli::try_parse_from(["promptshade", "calc"]).unwrap();
        assert!(matches!(cli.command, Command::Calc(CalcArgs { expr: None })));
    }
}
