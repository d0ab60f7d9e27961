//! GatedFlow CLI Entry Point
//!
//! Runs the approval-gated agent workflow from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Plan, ask for approval, execute
//! gatedflow "Create f1..f5 in webapp" --project webapp --items f1..f5
//!
//! # Use a specific agent configuration
//! gatedflow "Migrate flags" --config config/agent.yaml --items legacy-a,legacy-b
//!
//! # Rewire the workflow from a YAML edge table
//! gatedflow "Migrate flags" --definition config/flow.yaml --items f1..f3
//!
//! # Print the workflow graph and exit
//! gatedflow --describe
//!
//! # Keep a session open, one run per query
//! gatedflow --session --auto-approve
//! ```

use std::env;
use std::error::Error;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use colored::Colorize;
use log::{error, info, warn};

use gatedflow::agent::{agent_registry, build_workflow, describe_workflow, initial_state, parse_items};
use gatedflow::config::{AgentConfig, DEFAULT_CONFIG_PATH};
use gatedflow::execution::{ConsoleDecision, DecisionProvider, Executor, StaticDecision};
use gatedflow::workflow::{load_definition, Workflow};
use gatedflow::{DecisionError, WorkflowError, APP_NAME, VERSION};

/// Default project used when none is specified.
const DEFAULT_PROJECT: &str = "webapp";

/// Default item list used when none is specified.
const DEFAULT_ITEMS: &str = "f1..f5";

/// Environment variable overriding the default config path.
const CONFIG_ENV_VAR: &str = "GATEDFLOW_CONFIG";

/// Prompt shown between queries in session mode.
const SESSION_PROMPT: &str = "\nEnter a query (or 'exit'): ";

/// How gate decisions are made for this run.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ApprovalMode {
    Interactive,
    AutoApprove,
    AutoReject,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    instruction: Option<String>,
    config_path: Option<String>,
    definition_path: Option<String>,
    project: String,
    items: String,
    approval: ApprovalMode,
    max_steps: Option<usize>,
    describe: bool,
    session: bool,
    verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instruction: None,
            config_path: None,
            definition_path: None,
            project: DEFAULT_PROJECT.to_string(),
            items: DEFAULT_ITEMS.to_string(),
            approval: ApprovalMode::Interactive,
            max_steps: None,
            describe: false,
            session: false,
            verbose: false,
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Approval-Gated Workflow Executor");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: gatedflow [OPTIONS] <INSTRUCTION>");
    println!("       gatedflow [OPTIONS] --session");
    println!();
    println!("Arguments:");
    println!("  <INSTRUCTION>        What the agent should do");
    println!();
    println!("Options:");
    println!("  --config PATH        Agent configuration YAML (env: {})", CONFIG_ENV_VAR);
    println!("  --definition PATH    Workflow edge table YAML (default: built-in wiring)");
    println!("  --project NAME       Target project (default: {})", DEFAULT_PROJECT);
    println!("  --items LIST         Items to create, e.g. f1..f5,legacy (default: {})", DEFAULT_ITEMS);
    println!("  --auto-approve       Approve every gate without prompting");
    println!("  --auto-reject        Reject every gate without prompting");
    println!("  --max-steps N        Step invocation limit per run");
    println!("  --describe           Print the workflow graph and exit");
    println!("  --session            Read queries from stdin until 'exit'");
    println!("  --verbose            Enable debug logging and timeline output");
    println!("  --help               Show this help message");
    println!("  --version            Show version information");
    println!();
    println!("Examples:");
    println!("  gatedflow \"Create f1..f5 in webapp\"");
    println!("  gatedflow \"Create flags\" --items f1..f3 --auto-approve");
    println!("  gatedflow --describe --definition config/flow.yaml");
}

/// Returns the value following an option, advancing the cursor.
fn option_value(args: &[String], i: &mut usize, name: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} requires a value", name))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => config.verbose = true,
            "--describe" => config.describe = true,
            "--session" => config.session = true,
            "--auto-approve" => config.approval = ApprovalMode::AutoApprove,
            "--auto-reject" => config.approval = ApprovalMode::AutoReject,
            "--config" => config.config_path = Some(option_value(args, &mut i, arg)?),
            "--definition" => config.definition_path = Some(option_value(args, &mut i, arg)?),
            "--project" => config.project = option_value(args, &mut i, arg)?,
            "--items" => config.items = option_value(args, &mut i, arg)?,
            "--max-steps" => {
                let value = option_value(args, &mut i, arg)?;
                let max = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid max-steps value: {}", value))?;
                if max == 0 {
                    return Err("--max-steps must be at least 1".to_string());
                }
                config.max_steps = Some(max);
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown option: {}", other));
            }
            _ => {
                if config.instruction.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.instruction = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.instruction.is_none() && !config.describe && !config.session {
        return Err("Missing <INSTRUCTION> argument".to_string());
    }

    Ok(config)
}

/// Resolves the agent config path: flag, then environment, then default.
fn resolve_config_path(flag: Option<String>) -> String {
    flag.or_else(|| env::var(CONFIG_ENV_VAR).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.display().to_string())
}

/// Console bound to the process's stdin/stdout.
type StdConsole = ConsoleDecision<BufReader<Stdin>, Stdout>;

/// Picks the decision provider for the approval gate.
///
/// The interactive provider shares `console` with the session prompt so
/// both read from one buffer.
fn decision_provider(
    mode: ApprovalMode,
    console: Arc<StdConsole>,
) -> Box<dyn Fn(&str) -> Result<bool, DecisionError> + Send + Sync> {
    match mode {
        ApprovalMode::AutoApprove => {
            Box::new(|prompt: &str| StaticDecision::APPROVE.request_decision(prompt))
        }
        ApprovalMode::AutoReject => {
            Box::new(|prompt: &str| StaticDecision::REJECT.request_decision(prompt))
        }
        ApprovalMode::Interactive => {
            Box::new(move |prompt: &str| console.request_decision(prompt))
        }
    }
}

/// Loads the agent configuration, or falls back to the defaults when the
/// file is missing and `required` is false.
fn load_agent_config(path: &str, required: bool) -> Result<AgentConfig, Box<dyn Error>> {
    if !required && !Path::new(path).exists() {
        warn!("No agent config at '{}'; using defaults", path);
        return Ok(AgentConfig::default());
    }

    AgentConfig::load(path).map_err(|e| {
        error!("Failed to load agent config: {}", e);
        format!("Could not load agent config from '{}': {}", path, e).into()
    })
}

/// Renders the workflow graph without running it.
fn describe_graph(
    config_path: &str,
    config_required: bool,
    definition_path: Option<&str>,
) -> Result<String, Box<dyn Error>> {
    let agent = load_agent_config(config_path, config_required)?;
    let definition = definition_path.map(load_definition).transpose()?;
    Ok(describe_workflow(&agent, definition.as_ref())?.to_string())
}

/// Builds the workflow, from a YAML definition if one was given.
fn assemble_workflow(
    agent: &AgentConfig,
    definition_path: Option<&str>,
    mode: ApprovalMode,
    console: Arc<StdConsole>,
) -> Result<Workflow, Box<dyn Error>> {
    let provider = decision_provider(mode, console);

    let workflow = match definition_path {
        Some(path) => {
            let definition = load_definition(path)?;
            let registry = agent_registry(agent, provider)?;
            definition.bind(&registry)?
        }
        None => build_workflow(agent, provider)?,
    };

    Ok(workflow)
}

/// Runs one instruction and prints its summary.
fn run_instruction(
    engine: &Executor,
    instruction: &str,
    project: &str,
    items: &[String],
    verbose: bool,
) -> Result<(), WorkflowError> {
    info!(
        "Running '{}' on project '{}' ({} items)",
        instruction,
        project,
        items.len()
    );

    let report = engine.run_traced(initial_state(instruction, project, items))?;

    // Print summary
    println!();
    match report.state.get_str("summary") {
        Some(summary) => {
            println!("{}", "EXECUTION SUMMARY".bold());
            println!("{}", summary);
        }
        None => println!("{}", "Plan rejected; nothing executed.".yellow()),
    }
    println!();
    println!(
        "Workflow finished after {} step(s): {}",
        report.invocations,
        report.path.join(" -> ")
    );
    println!("Started at: {}", report.timeline.started_at().to_rfc3339());
    println!("Total execution time: {:.2?}", report.timeline.elapsed());

    println!();
    println!("Final state:\n{}", report.state.to_pretty_json());

    if verbose {
        println!("{}", report.timeline.gantt_chart());
    }

    Ok(())
}

/// Reads queries until `exit` or end of input, handing each to `on_query`.
///
/// Returns the number of queries handled.
fn run_session<R, W, F>(console: &ConsoleDecision<R, W>, mut on_query: F) -> Result<usize, DecisionError>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str),
{
    let mut handled = 0;

    while let Some(query) = console.read_line(SESSION_PROMPT)? {
        if query.eq_ignore_ascii_case("exit") {
            break;
        }
        if query.is_empty() {
            continue;
        }
        on_query(&query);
        handled += 1;
    }

    info!("Session closed ({} queries handled)", handled);
    Ok(handled)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(config.verbose);

    // Print banner
    print_banner();

    let explicit_config = config.config_path.is_some() || env::var_os(CONFIG_ENV_VAR).is_some();
    let config_path = resolve_config_path(config.config_path.clone());

    if config.describe {
        // An explicitly named config file must exist; the default may not.
        let graph = describe_graph(&config_path, explicit_config, config.definition_path.as_deref())?;
        print!("{}", graph);
        return Ok(());
    }

    // Load agent configuration
    let agent = load_agent_config(&config_path, true)?;

    if !agent.enabled {
        warn!("Agent '{}' is disabled by configuration; exiting.", agent.key);
        return Ok(());
    }

    info!("Agent config loaded. {}", agent.summary());

    let console = Arc::new(ConsoleDecision::stdio());
    let workflow = assemble_workflow(
        &agent,
        config.definition_path.as_deref(),
        config.approval,
        Arc::clone(&console),
    )?;

    let items = parse_items(&config.items)?;

    let mut engine = Executor::new(workflow);
    if let Some(max) = config.max_steps {
        engine.set_max_invocations(max);
    }

    if config.session {
        run_session(&*console, |query| {
            // A failed query ends that run only; the session stays open.
            if let Err(e) = run_instruction(&engine, query, &config.project, &items, config.verbose) {
                error!("{}", e);
            }
        })?;
        return Ok(());
    }

    let instruction = config.instruction.unwrap_or_default();
    run_instruction(&engine, &instruction, &config.project, &items, config.verbose)?;

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
