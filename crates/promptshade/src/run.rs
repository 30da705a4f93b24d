use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{never, select, unbounded, Receiver, Sender};
use renderer::{RendererConfig, WindowRuntime, WindowSignal};
use shaderprompt::{GeneratedShader, PromptClient, PromptConfig, PromptError, PromptPipeline};
use tracing_subscriber::EnvFilter;

use crate::cli::{CalcArgs, Cli, Command, ShaderArgs};
use crate::config::{FileConfig, ShaderSettings};
use crate::paths::AppPaths;

type Pipeline = Arc<PromptPipeline<PromptClient>>;
type Generation = Result<GeneratedShader, PromptError>;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();
    match cli.command {
        Command::Calc(args) => run_calc(args),
        Command::Shader(args) => run_shader(args),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run_calc(args: CalcArgs) -> Result<()> {
    if let Some(expr) = args.expr {
        let value = calculator::calc(&expr)?;
        println!("{value}");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read expression from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "Result: {}", calc_line(&line))?;
    }
    Ok(())
}

/// Formats one calculator line the way the result panel shows it.
fn calc_line(expr: &str) -> String {
    match calculator::calc(expr) {
        Ok(value) => value,
        Err(err) => format!("Error: {err}"),
    }
}

fn run_shader(args: ShaderArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let file_config = FileConfig::load(&paths.config_file())?;
    let settings = ShaderSettings::resolve(&args, &file_config);
    tracing::debug!(?settings, config_dir = %paths.config_dir().display(), "resolved settings");

    let pipeline = build_pipeline(&settings)?;

    if args.print_only {
        let prompt = args.prompt.as_deref().unwrap_or_default();
        return match pipeline.submit(prompt) {
            Ok(generated) => {
                println!("{}", generated.code);
                Ok(())
            }
            Err(err) => {
                println!("{}", error_comment(&err));
                Err(err.into())
            }
        };
    }

    let config = RendererConfig::default()
        .with_surface_size(settings.surface_size.0, settings.surface_size.1)
        .with_title("promptshade");
    let window = WindowRuntime::spawn(config).context("failed to open preview window")?;

    let (results_tx, results_rx) = unbounded::<Generation>();
    if let Some(path) = &args.file {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read shader {}", path.display()))?;
        show_shader(&window, &source);
    } else if let Some(prompt) = args.prompt.clone() {
        spawn_generation(&pipeline, prompt, results_tx.clone());
    }

    eprintln!("Type a prompt and press Enter to generate a new shader; close the window to quit.");
    let prompts = spawn_stdin_reader();
    let stdin_closed = never();
    let mut stdin_open = true;
    loop {
        select! {
            recv(if stdin_open { &prompts } else { &stdin_closed }) -> line => match line {
                Ok(prompt) => {
                    if pipeline.is_busy() {
                        println!("{}", error_comment(&PromptError::Busy));
                    } else {
                        spawn_generation(&pipeline, prompt, results_tx.clone());
                    }
                }
                Err(_) => {
                    tracing::debug!("stdin closed; waiting for the window to close");
                    stdin_open = false;
                }
            },
            recv(results_rx) -> result => {
                let Ok(result) = result else { continue };
                deliver_generation(result, &mut io::stdout().lock(), |code| {
                    show_shader(&window, code)
                })?;
            },
            recv(window.signals()) -> signal => match signal {
                Ok(WindowSignal::LoopStopped { reason }) => {
                    eprintln!("Error: rendering stopped: {reason}");
                }
                Ok(WindowSignal::Closed) | Err(_) => break,
            },
        }
    }

    window.shutdown()
}

fn build_pipeline(settings: &ShaderSettings) -> Result<Pipeline> {
    let config = PromptConfig::new(&settings.endpoint)?.with_timeout(settings.timeout);
    let client = PromptClient::new(config)?;
    tracing::info!(endpoint = %client.endpoint(), "using shader generation service");
    Ok(Arc::new(
        PromptPipeline::new(client).require_entry_point(settings.require_main),
    ))
}

fn spawn_generation(
    pipeline: &Pipeline,
    prompt: String,
    results: Sender<Generation>,
) {
    let pipeline = Arc::clone(pipeline);
    let spawned = thread::Builder::new()
        .name("promptshade-generate".into())
        .spawn(move || {
            let _ = results.send(pipeline.submit(&prompt));
        });
    if let Err(err) = spawned {
        tracing::error!("failed to spawn generation worker: {err}");
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = unbounded();
    let spawned = thread::Builder::new()
        .name("promptshade-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        tracing::error!("failed to spawn stdin reader: {err}");
        return never();
    }
    rx
}

/// Prints a finished generation; only successful code reaches `load`.
fn deliver_generation(
    result: Generation,
    out: &mut impl Write,
    load: impl FnOnce(&str),
) -> io::Result<()> {
    match result {
        Ok(generated) => {
            writeln!(out, "{}", generated.code)?;
            load(&generated.code);
        }
        Err(err) => {
            tracing::warn!(error = %err, remote = err.is_remote(), "shader generation failed");
            writeln!(out, "{}", error_comment(&err))?;
        }
    }
    Ok(())
}

fn show_shader(window: &WindowRuntime, source: &str) {
    if let Err(err) = window.load_shader(source) {
        eprintln!("Error: {err}");
    }
}

/// Comment line printed in place of the generated code when generation fails.
fn error_comment(err: &PromptError) -> String {
    format!("// Error: {err}")
}
