//! `semantiva` binary: `run`, `inspect`, `dev lint` (§6).
//!
//! Grounded on `semantiva/cli.py`'s `_parse_args`/`_run`/`_inspect` (exit codes, override/context
//! parsing, trace driver selection); `dev lint` has no counterpart there and is specified only by
//! `spec.md`'s one-liner ("validator") so its shape is ours, built from `semantiva-contracts`'
//! `validate_components`/`validate_nodes`/`Catalog`.

mod bootstrap;
mod document;
mod extensions;
mod report;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};

use semantiva_contracts::{Catalog, Severity};
use semantiva_engine::{
    build_pipeline, build_pipeline_inspection, expand_fanout, expand_run_space, compute_spec_id, fresh_launch_id,
    validate_pipeline, PipelineExecutor, RunMetadata, RunSpaceExecContext,
};
use semantiva_trace::{
    JsonlTraceDriver, NullTraceDriver, RunSpaceEnd, RunSpaceEndType, RunSpaceStart, RunSpaceStartType, TraceDriver,
};
use semantiva_types::{Context, DataValue, Payload, TypeHierarchy};

use document::{DocumentError, FanoutOrRunSpace};

const EXIT_SUCCESS: i32 = 0;
const EXIT_CLI_ERROR: i32 = 1;
const EXIT_FILE_ERROR: i32 = 2;
const EXIT_CONFIG_ERROR: i32 = 3;
const EXIT_RUNTIME_ERROR: i32 = 4;

#[derive(Parser)]
#[command(name = "semantiva", version, about = "Run, inspect, and lint declarative Semantiva pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline from a YAML file
    Run(RunArgs),
    /// Inspect a pipeline configuration from a YAML file
    Inspect(InspectArgs),
    /// Developer utilities
    Dev {
        #[command(subcommand)]
        command: DevCommands,
    },
}

#[derive(Subcommand)]
enum DevCommands {
    /// Statically validate a pipeline's processors and nodes against the contract rule catalog
    Lint(LintArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TraceDriverKind {
    None,
    Jsonl,
    Pluggable,
}

#[derive(Parser)]
struct RunArgs {
    /// Path to the pipeline YAML file
    pipeline: PathBuf,
    /// Build the graph without executing nodes
    #[arg(long)]
    dry_run: bool,
    /// Validate configuration only
    #[arg(long)]
    validate: bool,
    /// Override configuration values (dotted paths), e.g. --set pipeline.nodes.0.parameters.n=3
    #[arg(long = "set", value_name = "KEY=VAL")]
    overrides: Vec<String>,
    /// Inject context key-value pairs, e.g. --context threshold=0.5
    #[arg(long, value_name = "KEY=VAL")]
    context: Vec<String>,
    /// Increase log verbosity
    #[arg(short, long)]
    verbose: bool,
    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
    /// Tracing driver to use
    #[arg(long = "trace-driver", value_enum)]
    trace_driver: Option<TraceDriverKind>,
    /// Trace output path (jsonl) or driver spec (pluggable)
    #[arg(long = "trace-output")]
    trace_output: Option<String>,
    /// Comma-separated trace detail flags: timings, hash, repr, context, all
    #[arg(long = "trace-detail", default_value = "timings")]
    trace_detail: String,
}

#[derive(Parser)]
struct InspectArgs {
    /// Path to the pipeline YAML file
    pipeline: PathBuf,
    /// Show extended inspection report
    #[arg(long)]
    extended: bool,
    #[arg(short, long)]
    verbose: bool,
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Parser)]
struct LintArgs {
    /// Path to the pipeline YAML file (omit with --help-rules)
    pipeline: Option<PathBuf>,
    /// Print the full SVA rule catalog instead of linting a pipeline
    #[arg(long)]
    help_rules: bool,
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(EXIT_CLI_ERROR);
        }
    };

    let code = match cli.command {
        Commands::Run(args) => run_command(args),
        Commands::Inspect(args) => inspect_command(args),
        Commands::Dev { command: DevCommands::Lint(args) } => lint_command(args),
    };
    std::process::exit(code);
}

fn configure_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// `yaml.safe_load(value_str)`, falling back to the raw string on a parse error, exactly as
/// `cli.py`'s `--set`/`--context` value coercion does.
fn parse_value_like_yaml(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn split_key_value(item: &str) -> Option<(&str, &str)> {
    item.split_once('=')
}

/// Loads the document, applies `--set` overrides, loads any declared extensions, and builds and
/// statically validates the pipeline once. Shared by `run` and `run --validate` so the pipeline
/// is never built twice.
fn load_and_build(
    path: &Path,
    overrides: &[String],
) -> Result<(Value, bootstrap::Registries, Vec<semantiva_processors::Node>, Vec<Map<String, Value>>), (i32, String)> {
    let mut config = document::load_yaml(path).map_err(|e| match e {
        DocumentError::FileNotFound(p) => (EXIT_FILE_ERROR, format!("File not found: {p}")),
        DocumentError::Yaml(e) => (EXIT_CONFIG_ERROR, format!("YAML error: {e}")),
        other => (EXIT_CONFIG_ERROR, other.to_string()),
    })?;

    for item in overrides {
        let Some((key, value_str)) = split_key_value(item) else {
            return Err((EXIT_CONFIG_ERROR, format!("Invalid override format: {item}")));
        };
        let value = parse_value_like_yaml(value_str);
        document::apply_override(&mut config, key, value)
            .map_err(|_| (EXIT_CONFIG_ERROR, format!("Unknown override key: {key}")))?;
    }

    let extension_names = document::extensions_of(&config);
    let registries = bootstrap::Registries::new();
    if !extension_names.is_empty() {
        registries
            .load_extensions(&extension_names)
            .map_err(|e| (EXIT_CONFIG_ERROR, format!("Invalid config: {e}")))?;
    }

    let node_configs =
        document::validate_structure(&config).map_err(|e| (EXIT_CONFIG_ERROR, format!("Invalid config: {e}")))?;

    let (nodes, params) = build_pipeline(
        &node_configs,
        &registries.processors,
        &registries.name_resolvers,
        &registries.parameter_resolvers,
    )
    .map_err(|e| (EXIT_CONFIG_ERROR, format!("Invalid config: {e}")))?;

    let inspection = build_pipeline_inspection(&nodes, &params, false);
    validate_pipeline(&inspection, &TypeHierarchy::with_builtins())
        .map_err(|e| (EXIT_CONFIG_ERROR, format!("Invalid config: {e}")))?;

    Ok((config, registries, nodes, params))
}

fn run_command(args: RunArgs) -> i32 {
    configure_logging(args.verbose, args.quiet);

    let (config, _registries, nodes, node_params) = match load_and_build(&args.pipeline, &args.overrides) {
        Ok(result) => result,
        Err((code, message)) => {
            eprintln!("{message}");
            return code;
        }
    };

    let mut ctx_dict: indexmap::IndexMap<String, Value> = indexmap::IndexMap::new();
    for item in &args.context {
        let Some((key, value_str)) = split_key_value(item) else {
            eprintln!("Invalid context format: {item}");
            return EXIT_CONFIG_ERROR;
        };
        ctx_dict.insert(key.to_string(), parse_value_like_yaml(value_str));
    }

    if args.validate {
        println!("Config valid.");
        return EXIT_SUCCESS;
    }

    if args.dry_run {
        println!("Graph: {} nodes.", nodes.len());
        println!("Dry run OK (no execution performed).");
        return EXIT_SUCCESS;
    }

    let mut driver: Box<dyn TraceDriver> = match build_trace_driver(&args, &config) {
        Ok(driver) => driver,
        Err(message) => {
            eprintln!("{message}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let pipeline_spec_canonical = config.get("pipeline").cloned().unwrap_or(json!({}));
    let mut executor =
        PipelineExecutor::new(nodes, node_params, TypeHierarchy::with_builtins(), pipeline_spec_canonical);
    let mut run_meta = BTreeMap::new();
    run_meta.insert("overrides".to_string(), json!(args.overrides));
    let trace_detail_flags: Vec<&str> = args.trace_detail.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    executor.set_run_metadata(RunMetadata {
        args: run_meta,
        trace_context: Some(json!({"detail": trace_detail_flags})),
        ..RunMetadata::default()
    });

    let cwd = args.pipeline.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

    let code = match document::fanout_or_run_space_of(&config) {
        Ok(Some(spec)) => run_with_run_space(&mut executor, driver.as_mut(), spec, &cwd, &ctx_dict, args.verbose),
        Ok(None) => run_single(&mut executor, driver.as_mut(), &ctx_dict, args.verbose),
        Err(e) => {
            eprintln!("Invalid config: {e}");
            EXIT_CONFIG_ERROR
        }
    };

    let _ = driver.close();
    code
}

fn run_single(
    executor: &mut PipelineExecutor,
    driver: &mut dyn TraceDriver,
    ctx_dict: &indexmap::IndexMap<String, Value>,
    verbose: bool,
) -> i32 {
    let context = Context::from_map(ctx_dict.clone());
    let payload = Payload::with_single_context(DataValue::NoData, context);

    let start = Instant::now();
    match executor.execute(payload, driver, None) {
        Ok(_) => {
            println!("Completed in {:.2}s", start.elapsed().as_secs_f64());
            EXIT_SUCCESS
        }
        Err(err) => {
            if verbose {
                eprintln!("Execution failed: {err:?}");
            } else {
                eprintln!("Execution failed: {err}");
            }
            EXIT_RUNTIME_ERROR
        }
    }
}

fn run_with_run_space(
    executor: &mut PipelineExecutor,
    driver: &mut dyn TraceDriver,
    spec: FanoutOrRunSpace,
    cwd: &Path,
    ctx_dict: &indexmap::IndexMap<String, Value>,
    verbose: bool,
) -> i32 {
    let (runs, spec_id) = match &spec {
        FanoutOrRunSpace::Fanout(fanout) => match expand_fanout(fanout, cwd) {
            Ok((runs, _meta, _hash)) => (runs, compute_spec_id(fanout)),
            Err(e) => {
                eprintln!("Invalid config: {e}");
                return EXIT_CONFIG_ERROR;
            }
        },
        FanoutOrRunSpace::RunSpace(run_space) => match expand_run_space(run_space, cwd) {
            Ok((runs, _metas, _inputs_id)) => (runs, compute_spec_id(run_space)),
            Err(e) => {
                eprintln!("Invalid config: {e}");
                return EXIT_CONFIG_ERROR;
            }
        },
    };

    let launch_id = fresh_launch_id();
    let attempt = 1u32;

    if let Err(e) = driver.on_run_space_start(&RunSpaceStart {
        record_type: RunSpaceStartType::RunSpaceStart,
        run_space_launch_id: launch_id.clone(),
        run_space_attempt: attempt,
        run_space_spec_id: spec_id,
        run_space_inputs_id: None,
        run_space_planned_run_count: Some(runs.len()),
        run_space_input_fingerprints: None,
    }) {
        eprintln!("Execution failed: {e}");
        return EXIT_RUNTIME_ERROR;
    }

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for (index, run) in runs.iter().enumerate() {
        let mut merged = ctx_dict.clone();
        for (key, value) in &run.context {
            merged.insert(key.clone(), value.clone());
        }
        let payload = Payload::with_single_context(DataValue::NoData, Context::from_map(merged));
        let run_space_ctx =
            RunSpaceExecContext { run_space_launch_id: launch_id.clone(), run_space_attempt: attempt, run_space_index: index };

        match executor.execute(payload, driver, Some(run_space_ctx)) {
            Ok(_) => succeeded += 1,
            Err(err) => {
                failed += 1;
                if verbose {
                    eprintln!("Run {index} failed: {err:?}");
                } else {
                    eprintln!("Run {index} failed: {err}");
                }
            }
        }
    }

    let _ = driver.on_run_space_end(&RunSpaceEnd {
        record_type: RunSpaceEndType::RunSpaceEnd,
        run_space_launch_id: launch_id,
        run_space_attempt: attempt,
        summary: json!({"total_runs": runs.len(), "succeeded": succeeded, "failed": failed}),
    });

    println!("Completed {succeeded}/{} runs ({failed} failed).", runs.len());
    if failed > 0 {
        EXIT_RUNTIME_ERROR
    } else {
        EXIT_SUCCESS
    }
}

/// CLI flags win when `--trace-driver` is given; otherwise falls back to the document's `trace:`
/// section (a field `cli.py` never reads, since its pipeline document has no such section).
fn build_trace_driver(args: &RunArgs, config: &Value) -> Result<Box<dyn TraceDriver>, String> {
    let section = document::trace_section_of(config);

    let kind = args.trace_driver.or_else(|| match section.as_ref().and_then(|s| s.driver.as_deref()) {
        Some("jsonl") => Some(TraceDriverKind::Jsonl),
        Some("pluggable") => Some(TraceDriverKind::Pluggable),
        _ => None,
    });

    let output = args.trace_output.clone().or_else(|| section.as_ref().and_then(|s| s.output_path.clone()));

    match kind {
        None | Some(TraceDriverKind::None) => Ok(Box::new(NullTraceDriver)),
        Some(TraceDriverKind::Jsonl) => {
            let path = output.ok_or_else(|| "--trace-output must specify a file path for jsonl".to_string())?;
            JsonlTraceDriver::create(&path).map(|d| Box::new(d) as Box<dyn TraceDriver>).map_err(|e| e.to_string())
        }
        Some(TraceDriverKind::Pluggable) => Err(
            "--trace-driver pluggable has no linked-in implementation in this binary; embed a TraceDriver and \
             rebuild, or use none|jsonl"
                .to_string(),
        ),
    }
}

fn inspect_command(args: InspectArgs) -> i32 {
    configure_logging(args.verbose, args.quiet);

    let config = match document::load_yaml(&args.pipeline) {
        Ok(config) => config,
        Err(DocumentError::FileNotFound(p)) => {
            eprintln!("File not found: {p}");
            return EXIT_FILE_ERROR;
        }
        Err(DocumentError::Yaml(e)) => {
            eprintln!("YAML error: {e}");
            return EXIT_CONFIG_ERROR;
        }
        Err(e) => {
            eprintln!("{e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let registries = bootstrap::Registries::new();
    let extension_names = document::extensions_of(&config);
    if !extension_names.is_empty() {
        if let Err(e) = registries.load_extensions(&extension_names) {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    }

    let node_configs = match document::validate_structure(&config) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let (nodes, params) = match build_pipeline(
        &node_configs,
        &registries.processors,
        &registries.name_resolvers,
        &registries.parameter_resolvers,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let inspection = build_pipeline_inspection(&nodes, &params, false);
    if let Err(e) = validate_pipeline(&inspection, &TypeHierarchy::with_builtins()) {
        eprintln!("Invalid config: {e}");
        return EXIT_CONFIG_ERROR;
    }

    let text = if args.extended { report::extended_report(&inspection) } else { report::summary_report(&inspection) };
    println!("{text}");
    EXIT_SUCCESS
}

fn lint_command(args: LintArgs) -> i32 {
    configure_logging(args.verbose, false);

    if args.help_rules {
        println!("{}", Catalog::to_markdown_table());
        return EXIT_SUCCESS;
    }

    let Some(path) = args.pipeline else {
        eprintln!("dev lint: a pipeline path is required unless --help-rules is given");
        return EXIT_CLI_ERROR;
    };

    let config = match document::load_yaml(&path) {
        Ok(config) => config,
        Err(DocumentError::FileNotFound(p)) => {
            eprintln!("File not found: {p}");
            return EXIT_FILE_ERROR;
        }
        Err(DocumentError::Yaml(e)) => {
            eprintln!("YAML error: {e}");
            return EXIT_CONFIG_ERROR;
        }
        Err(e) => {
            eprintln!("{e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let registries = bootstrap::Registries::new();
    let extension_names = document::extensions_of(&config);
    if !extension_names.is_empty() {
        if let Err(e) = registries.load_extensions(&extension_names) {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    }

    let node_configs = match document::validate_structure(&config) {
        Ok(nodes) => nodes,
        Err(e) => {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let (nodes, _params) = match build_pipeline(
        &node_configs,
        &registries.processors,
        &registries.name_resolvers,
        &registries.parameter_resolvers,
    ) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Invalid config: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let labels: Vec<String> =
        nodes.iter().enumerate().map(|(i, n)| format!("{i:04}-{}", n.metadata().class_name)).collect();
    let metadata: Vec<_> = nodes.iter().map(|n| n.metadata()).collect();

    let component_diags = semantiva_contracts::validate_components(
        labels.iter().zip(metadata.iter()).map(|(l, m)| (l.as_str(), m)),
    );
    let node_diags =
        semantiva_contracts::validate_nodes(labels.iter().zip(nodes.iter()).map(|(l, n)| (l.as_str(), n)));

    let mut has_error = false;
    for diag in component_diags.iter().chain(node_diags.iter()) {
        has_error |= diag.severity == Severity::Error;
        println!("[{}] {} ({}): {}", diag.severity.as_str(), diag.code, diag.component, diag.message);
    }

    if component_diags.is_empty() && node_diags.is_empty() {
        println!("No issues found.");
    }

    if has_error {
        EXIT_CONFIG_ERROR
    } else {
        EXIT_SUCCESS
    }
}

