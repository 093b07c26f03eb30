use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use previewconfig::PreviewConfig;
use renderer::{transpile_fragment_with, HeadlessBackend, LoopState, VERTEX_SHADER};
use serde::Serialize;
use sessionhost::{Notification, SessionHost};
use shaderdoc::{extract, has_shader_extension, ShaderDocument};
use tracing_subscriber::EnvFilter;

use crate::bindings::{loop_options, transpile_options};
use crate::cli::{CheckArgs, Cli, Command, InspectArgs, TranspileArgs};
use crate::paths::AppPaths;

const SIMULATED_REFRESH_HZ: f64 = 60.0;

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Transpile(args) => run_transpile(&config, args),
        Command::Inspect(args) => run_inspect(&config, args),
        Command::Check(args) => run_check(&config, args),
    }
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<PreviewConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let paths = AppPaths::discover()?;
            let path = paths.config_file();
            if !path.exists() {
                tracing::debug!(
                    config = %path.display(),
                    "no configuration file found; using defaults"
                );
                return Ok(PreviewConfig::default());
            }
            path
        }
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let config = PreviewConfig::from_toml_str(&raw)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::debug!(config = %path.display(), "loaded configuration");
    Ok(config)
}

fn load_document(config: &PreviewConfig, path: &Path) -> Result<ShaderDocument> {
    if !has_shader_extension(path, &config.extensions) {
        bail!(
            "{} is not a shader document; expected one of: {}",
            path.display(),
            config
                .extensions
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.')))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    ShaderDocument::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn run_transpile(config: &PreviewConfig, args: TranspileArgs) -> Result<()> {
    let document = load_document(config, &args.file)?;
    let output = if args.vertex {
        VERTEX_SHADER.to_string()
    } else {
        let extracted = extract(&document);
        let parameters = extracted.metadata.bindable_parameters();
        let mut source =
            transpile_fragment_with(&extracted.body, &parameters, &transpile_options(config))
                .source;
        if !source.ends_with('\n') {
            source.push('\n');
        }
        source
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &output)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(output = %path.display(), "wrote transpiled shader");
        }
        None => print!("{output}"),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct InspectReport<'a> {
    document: &'a str,
    author: &'a str,
    parameters: Vec<ParameterReport<'a>>,
    issues: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ParameterReport<'a> {
    name: &'a str,
    min: f32,
    max: f32,
    default: f32,
    step: Option<f32>,
}

fn run_inspect(config: &PreviewConfig, args: InspectArgs) -> Result<()> {
    let document = load_document(config, &args.file)?;
    let extracted = extract(&document);
    let metadata = &extracted.metadata;
    let report = InspectReport {
        document: document.name(),
        author: &metadata.author,
        parameters: metadata
            .parameters
            .iter()
            .map(|param| ParameterReport {
                name: &param.name,
                min: param.min,
                max: param.max,
                default: param.initial_value(),
                step: param.slider_step(),
            })
            .collect(),
        issues: metadata.validate(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} by {}", report.document, report.author);
    if report.parameters.is_empty() {
        println!("No parameters.");
    } else {
        println!("Parameters:");
        for param in &report.parameters {
            let step = param
                .step
                .map(|step| format!("step={step}"))
                .unwrap_or_else(|| "step=n/a".to_string());
            println!(
                "  {:<16} min={:<8} max={:<8} default={:<8} {step}",
                param.name, param.min, param.max, param.default
            );
        }
    }
    for issue in &report.issues {
        println!("warning: {issue}");
    }
    Ok(())
}

fn run_check(config: &PreviewConfig, args: CheckArgs) -> Result<()> {
    let document = load_document(config, &args.file)?;
    let mut host = SessionHost::new(loop_options(config));
    let start = Instant::now();
    let id = host.open(|| Ok(HeadlessBackend::new()), &document, args.size, start)?;

    let started = host
        .session(id)
        .is_some_and(|session| session.state() != LoopState::Uninitialized);
    if !started {
        for (_, notification) in host.tick(start) {
            if let Notification::Error { error } = notification {
                eprintln!("{error}");
            }
        }
        bail!("{} failed to build", document.name());
    }

    let mut last_fps = None;
    for frame in 1..=args.frames {
        let now = start + Duration::from_secs_f64(f64::from(frame) / SIMULATED_REFRESH_HZ);
        for (_, notification) in host.tick(now) {
            match notification {
                Notification::Fps { fps } => last_fps = Some(fps),
                Notification::Error { error } => eprintln!("{error}"),
            }
        }
    }

    let session = host
        .session(id)
        .context("preview session closed unexpectedly")?;
    let render = session.render_loop();
    let resolved = render
        .program()
        .map(|program| program.resolved_names().join(", "))
        .unwrap_or_default();

    println!("{} by {}: ok", document.name(), session.author());
    println!("  uniforms: {resolved}");
    println!(
        "  frames:   {} at {}x{}",
        render.backend().draw_calls(),
        args.size.width,
        args.size.height
    );
    println!("  time:     {:.3}s", render.params().time());
    if let Some(fps) = last_fps {
        println!("  fps:      {fps}");
    }
    host.close(id);
    Ok(())
}
