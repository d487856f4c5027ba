//! Diagnostic Probability Engine CLI.
//!
//! The main entry point for `dpe`, handling:
//! - One-shot calculations (posttest, both outcomes, likelihood ratios, tiers)
//! - Test planning against the configured thresholds
//! - The JSON request boundary (`dpe request`)
//! - File-backed differentials through the hypothesis store
//! - Policy inspection and validation

use clap::{Args, CommandFactory, Parser, Subcommand};
use dpe_common::{DiagnosisId, Error, HypothesisId, OutputFormat, StructuredError};
use dpe_config::{
    list_presets, load_policy, ConfigSnapshot, LoadedPolicy, Policy, PresetInfo, PresetName,
    ValidationError,
};
use dpe_core::api::{Engine, Operation};
use dpe_core::decision::{assess_posttest, plan_test, recommend_tier};
use dpe_core::exit_codes::ExitCode;
use dpe_core::logging::{event_names, generate_run_id, init_logging, LogConfig, LogLevel, Stage};
use dpe_core::output::{self, Render};
use dpe_core::store::{HypothesisStore, RecordFile, RetireOutcome, TestOutcome};
use dpe_math::{plan_both_outcomes, LikelihoodRatios, TestCharacteristics};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Sequential Bayesian diagnostic probability engine
#[derive(Parser)]
#[command(name = "dpe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Policy file (.json or .toml); overrides DPE_POLICY and config directories
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Built-in policy preset, used when no --policy is given
    #[arg(long, global = true)]
    preset: Option<PresetName>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Posttest probability after one or more likelihood ratios, with a tier
    Posttest(PosttestArgs),

    /// Posttest probability for both results of a test, before ordering it
    Outcomes(OutcomesArgs),

    /// Likelihood ratios from sensitivity and specificity
    Lr(LrArgs),

    /// Recommend the next action tier for a probability
    Tier(TierArgs),

    /// Whether either result of a test would change management
    Plan(OutcomesArgs),

    /// Serve one JSON request body (from --input or stdin)
    Request(RequestArgs),

    /// Maintain a differential stored in a JSON file
    Differential(DifferentialArgs),

    /// Policy management
    Config(ConfigArgs),

    /// Print the JSON Schema of an operation's request or response
    Schema(SchemaArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Command argument structs
// ============================================================================

#[derive(Args, Debug)]
struct PosttestArgs {
    /// Pretest probability in [0, 1]
    #[arg(long, allow_negative_numbers = true)]
    pretest: f64,

    /// Likelihood ratio to apply; repeat for independent tests, applied in order
    #[arg(long = "lr", required = true, allow_negative_numbers = true)]
    lrs: Vec<f64>,
}

/// Where a test's sensitivity and specificity come from.
#[derive(Args, Debug)]
struct CharacteristicsArgs {
    /// Test sensitivity in [0, 1]
    #[arg(long, requires = "specificity", allow_negative_numbers = true)]
    sensitivity: Option<f64>,

    /// Test specificity in [0, 1]
    #[arg(long, requires = "sensitivity", allow_negative_numbers = true)]
    specificity: Option<f64>,

    /// Name of a test in the policy's test catalog
    #[arg(long, conflicts_with_all = ["sensitivity", "specificity"])]
    test: Option<String>,
}

#[derive(Args, Debug)]
struct LrArgs {
    #[command(flatten)]
    characteristics: CharacteristicsArgs,
}

#[derive(Args, Debug)]
struct OutcomesArgs {
    /// Pretest probability in [0, 1]
    #[arg(long, allow_negative_numbers = true)]
    pretest: f64,

    /// Likelihood ratio of a positive result
    #[arg(long, requires = "lr_neg", conflicts_with_all = ["sensitivity", "test"], allow_negative_numbers = true)]
    lr_pos: Option<f64>,

    /// Likelihood ratio of a negative result
    #[arg(long, requires = "lr_pos", allow_negative_numbers = true)]
    lr_neg: Option<f64>,

    #[command(flatten)]
    characteristics: CharacteristicsArgs,
}

#[derive(Args, Debug)]
struct TierArgs {
    /// Probability in [0, 1]
    #[arg(long, allow_negative_numbers = true)]
    probability: f64,
}

#[derive(Args, Debug)]
struct RequestArgs {
    /// Operation to serve
    #[arg(value_enum)]
    operation: Operation,

    /// File holding the JSON body (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    #[arg(value_enum)]
    operation: Operation,

    /// Print the response schema instead of the request schema
    #[arg(long)]
    response: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the active policy and where it came from
    Show,
    /// Validate a policy file (default: the resolved policy)
    Validate {
        /// Policy file to validate
        path: Option<PathBuf>,
    },
    /// List built-in presets
    Presets,
}

#[derive(Args, Debug)]
struct DifferentialArgs {
    /// Differential file (a problem record in JSON)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// How long to wait for another writer to release the file
    #[arg(long, global = true, env = "DPE_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    lock_timeout_ms: u64,

    #[command(subcommand)]
    command: DifferentialCommands,
}

#[derive(Subcommand, Debug)]
enum DifferentialCommands {
    /// Start an empty differential
    New {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Add a candidate diagnosis
    Propose {
        #[arg(long)]
        diagnosis: String,
        #[arg(long, allow_negative_numbers = true)]
        pretest: f64,
    },
    /// Apply evidence to one hypothesis and rerank
    Evidence(EvidenceArgs),
    /// Rule out or confirm a hypothesis
    Retire {
        #[arg(long)]
        hypothesis: HypothesisId,
        #[arg(long, value_enum)]
        outcome: RetireOutcome,
    },
    /// Show the ranked differential
    Show,
}

#[derive(Args, Debug)]
struct EvidenceArgs {
    #[arg(long)]
    hypothesis: HypothesisId,

    /// Likelihood ratio to apply directly
    #[arg(long, conflicts_with_all = ["sensitivity", "test", "result"], allow_negative_numbers = true)]
    lr: Option<f64>,

    #[command(flatten)]
    characteristics: CharacteristicsArgs,

    /// Observed test result (with --test or --sensitivity/--specificity)
    #[arg(long, value_enum)]
    result: Option<TestOutcome>,
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            _ => Some(LogLevel::Debug),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, None));

    let run_id = generate_run_id();
    tracing::debug!(event = event_names::RUN_STARTED, stage = %Stage::Init, run_id = %run_id);

    let global = &cli.global;
    let result = match &cli.command {
        Commands::Posttest(args) => run_posttest(global, args),
        Commands::Outcomes(args) => run_outcomes(global, args),
        Commands::Lr(args) => run_lr(global, args),
        Commands::Tier(args) => run_tier(global, args),
        Commands::Plan(args) => run_plan(global, args),
        Commands::Request(args) => {
            let code = run_request(global, args);
            finish(&run_id, code)
        }
        Commands::Differential(args) => run_differential(global, args),
        Commands::Config(args) => run_config(global, args),
        Commands::Schema(args) => run_schema(args),
        Commands::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "dpe", &mut std::io::stdout());
            Ok(())
        }
    };

    let code = match result {
        Ok(()) => ExitCode::Clean,
        Err(err) => report_error(global, &err),
    };
    finish(&run_id, code)
}

fn finish(run_id: &str, code: ExitCode) -> ! {
    tracing::debug!(
        event = event_names::RUN_FINISHED,
        stage = %Stage::Init,
        run_id = %run_id,
        exit_code = code.as_i32()
    );
    std::process::exit(code.as_i32())
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load(global: &GlobalOpts) -> Result<LoadedPolicy, Error> {
    let loaded = load_policy(global.policy.as_deref(), global.preset).map_err(|e| {
        tracing::error!(event = event_names::CONFIG_ERROR, stage = %Stage::Init, error = %e);
        config_error(e)
    })?;
    if loaded.snapshot.policy_path.is_none() && global.preset.is_none() {
        tracing::debug!(event = event_names::CONFIG_DEFAULT_USED, stage = %Stage::Init);
    }
    tracing::info!(
        event = event_names::CONFIG_LOADED,
        stage = %Stage::Init,
        source = %loaded.snapshot.policy_source,
        policy_hash = %loaded.snapshot.short_id(),
        "policy loaded"
    );
    Ok(loaded)
}

fn config_error(err: ValidationError) -> Error {
    match err {
        ValidationError::IoError(message) => Error::Config(message),
        other => Error::InvalidPolicy(other.to_string()),
    }
}

fn emit<T: Render>(global: &GlobalOpts, payload: &T) -> Result<(), Error> {
    let text = output::render(global.format, payload)?;
    println!("{}", text.trim_end());
    Ok(())
}

fn report_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    write_error(global, StructuredError::from(err), &err.to_human(), code);
    code
}

fn write_error(global: &GlobalOpts, structured: StructuredError, human: &str, code: ExitCode) {
    match global.format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "status": "error",
                "exit_code": code.code_name(),
                "error": structured,
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&body).unwrap_or_else(|_| structured.to_json())
            );
        }
        OutputFormat::Md => eprintln!("{}", human),
        OutputFormat::Summary => eprintln!("error {}: {}", structured.code, structured.message),
    }
}

/// Likelihood ratios from --sensitivity/--specificity or a catalog --test.
fn resolve_characteristics(
    args: &CharacteristicsArgs,
    policy: &Policy,
) -> Result<Option<TestCharacteristics>, Error> {
    if let Some(name) = &args.test {
        let entry = policy.find_test(name).ok_or_else(|| Error::InvalidField {
            field: "test".to_string(),
            message: format!("'{}' is not in the policy test catalog", name),
        })?;
        return Ok(Some(entry.characteristics()?));
    }
    match (args.sensitivity, args.specificity) {
        (Some(sensitivity), Some(specificity)) => {
            Ok(Some(TestCharacteristics::new(sensitivity, specificity)?))
        }
        _ => Ok(None),
    }
}

fn resolve_ratio_pair(args: &OutcomesArgs, policy: &Policy) -> Result<(f64, f64), Error> {
    if let (Some(lr_pos), Some(lr_neg)) = (args.lr_pos, args.lr_neg) {
        return Ok((lr_pos, lr_neg));
    }
    let test = resolve_characteristics(&args.characteristics, policy)?.ok_or_else(|| {
        Error::MissingField {
            field: "--lr-pos/--lr-neg, --sensitivity/--specificity or --test".to_string(),
        }
    })?;
    let lrs = test.likelihood_ratios()?;
    Ok((lrs.lr_positive, lrs.lr_negative))
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_posttest(global: &GlobalOpts, args: &PosttestArgs) -> Result<(), Error> {
    let loaded = load(global)?;
    let assessment = assess_posttest(args.pretest, &args.lrs, &loaded.policy.thresholds)?;
    emit(global, &assessment)
}

fn run_outcomes(global: &GlobalOpts, args: &OutcomesArgs) -> Result<(), Error> {
    let loaded = load(global)?;
    let (lr_pos, lr_neg) = resolve_ratio_pair(args, &loaded.policy)?;
    emit(global, &plan_both_outcomes(args.pretest, lr_pos, lr_neg)?)
}

fn run_lr(global: &GlobalOpts, args: &LrArgs) -> Result<(), Error> {
    let loaded = load(global)?;
    let test = resolve_characteristics(&args.characteristics, &loaded.policy)?.ok_or_else(|| {
        Error::MissingField {
            field: "--sensitivity/--specificity or --test".to_string(),
        }
    })?;
    let lrs: LikelihoodRatios = test.likelihood_ratios()?;
    emit(global, &lrs)
}

fn run_tier(global: &GlobalOpts, args: &TierArgs) -> Result<(), Error> {
    let loaded = load(global)?;
    let rec = recommend_tier(args.probability, &loaded.policy.thresholds)?;
    tracing::info!(
        event = event_names::DECIDE_TIER,
        stage = %Stage::Decide,
        tier = %rec.tier,
        probability = rec.probability
    );
    emit(global, &rec)
}

fn run_plan(global: &GlobalOpts, args: &OutcomesArgs) -> Result<(), Error> {
    let loaded = load(global)?;
    let (lr_pos, lr_neg) = resolve_ratio_pair(args, &loaded.policy)?;
    let plan = plan_test(args.pretest, lr_pos, lr_neg, &loaded.policy.thresholds)?;
    tracing::info!(
        event = event_names::DECIDE_TEST_PLAN,
        stage = %Stage::Decide,
        changes_management = plan.changes_management
    );
    emit(global, &plan)
}

/// Boundary errors keep their HTTP-style status in the error body.
fn run_request(global: &GlobalOpts, args: &RequestArgs) -> ExitCode {
    let body = match read_body(args.input.as_deref()) {
        Ok(body) => body,
        Err(err) => return report_error(global, &err),
    };
    let engine = match load(global).and_then(|loaded| {
        Engine::from_loaded(loaded).map_err(|e| e.into_error())
    }) {
        Ok(engine) => engine,
        Err(err) => return report_error(global, &err),
    };

    match engine.handle_json(args.operation, &body) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::Clean
            }
            Err(err) => report_error(global, &Error::Json(err)),
        },
        Err(api_err) => {
            let code = ExitCode::from(&api_err);
            let human = api_err.to_string();
            write_error(global, api_err.to_structured(), &human, code);
            code
        }
    }
}

fn read_body(input: Option<&Path>) -> Result<String, Error> {
    match input {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            Ok(body)
        }
    }
}

fn run_schema(args: &SchemaArgs) -> Result<(), Error> {
    let schema = if args.response {
        args.operation.response_schema()
    } else {
        args.operation.request_schema()
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

// ============================================================================
// Config
// ============================================================================

#[derive(Serialize)]
struct ConfigView {
    snapshot: ConfigSnapshot,
    policy: Policy,
}

impl Render for ConfigView {
    fn to_markdown(&self) -> String {
        format!(
            "# Policy\n\n- source: {}\n- path: {}\n- hash: `{}`\n- test threshold: {}\n- treatment threshold: {}\n- elimination floor: {}\n- catalog tests: {}\n",
            self.snapshot.policy_source,
            self.snapshot.policy_path.as_deref().unwrap_or("(built-in)"),
            self.snapshot.short_id(),
            self.policy.thresholds.test_threshold,
            self.policy.thresholds.treatment_threshold,
            self.policy.store.elimination_floor,
            self.policy.test_catalog.len()
        )
    }

    fn to_summary(&self) -> String {
        format!(
            "{} test={} treatment={} [{}]",
            self.snapshot.policy_source,
            self.policy.thresholds.test_threshold,
            self.policy.thresholds.treatment_threshold,
            self.snapshot.short_id()
        )
    }
}

#[derive(Serialize)]
#[serde(transparent)]
struct PresetList(Vec<PresetInfo>);

impl Render for PresetList {
    fn to_markdown(&self) -> String {
        let mut out = String::from("# Presets\n\n| name | test | treatment | description |\n|---|---|---|---|\n");
        for p in &self.0 {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                p.name, p.thresholds.test_threshold, p.thresholds.treatment_threshold, p.description
            ));
        }
        out
    }

    fn to_summary(&self) -> String {
        self.0
            .iter()
            .map(|p| p.name.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> Result<(), Error> {
    match &args.command {
        ConfigCommands::Show => {
            let loaded = load(global)?;
            emit(
                global,
                &ConfigView {
                    snapshot: loaded.snapshot,
                    policy: loaded.policy,
                },
            )
        }
        ConfigCommands::Validate { path } => {
            let cli_path = path.as_deref().or(global.policy.as_deref());
            let loaded = load_policy(cli_path, global.preset).map_err(config_error)?;
            emit(
                global,
                &ConfigView {
                    snapshot: loaded.snapshot,
                    policy: loaded.policy,
                },
            )
        }
        ConfigCommands::Presets => emit(global, &PresetList(list_presets())),
    }
}

// ============================================================================
// Differential
// ============================================================================

fn run_differential(global: &GlobalOpts, args: &DifferentialArgs) -> Result<(), Error> {
    let path = args.file.as_deref().ok_or_else(|| Error::MissingField {
        field: "--file".to_string(),
    })?;
    let loaded = load(global)?;
    let store = HypothesisStore::new(loaded.policy.store).map_err(config_error)?;
    let file =
        RecordFile::new(path).with_lock_timeout(Duration::from_millis(args.lock_timeout_ms));

    let record = match &args.command {
        DifferentialCommands::New { force } => {
            let lock = file.lock()?;
            if file.exists() && !force {
                return Err(Error::InvalidField {
                    field: "--file".to_string(),
                    message: format!("{} exists; pass --force to replace it", path.display()),
                });
            }
            let problem = store.open_problem()?;
            let record = store.export_problem(problem)?;
            file.write(&record, &lock)?;
            record
        }
        DifferentialCommands::Propose { diagnosis, pretest } => {
            let diagnosis = DiagnosisId::parse(diagnosis).ok_or_else(|| Error::InvalidField {
                field: "--diagnosis".to_string(),
                message: "must not be blank".to_string(),
            })?;
            file.update(&store, |store, problem| {
                store.propose(problem, diagnosis, *pretest).map(|_| ())
            })?
        }
        DifferentialCommands::Evidence(evidence) => {
            let lr = match evidence.lr {
                Some(lr) => lr,
                None => evidence_ratio(evidence, &loaded.policy)?,
            };
            file.update(&store, |store, problem| {
                store
                    .record_evidence(problem, evidence.hypothesis, lr)
                    .map(|_| ())
            })?
        }
        DifferentialCommands::Retire {
            hypothesis,
            outcome,
        } => file.update(&store, |store, _| {
            store.retire(*hypothesis, *outcome).map(|_| ())
        })?,
        DifferentialCommands::Show => file.read()?,
    };

    emit(global, &record)
}

fn evidence_ratio(args: &EvidenceArgs, policy: &Policy) -> Result<f64, Error> {
    let test = resolve_characteristics(&args.characteristics, policy)?.ok_or_else(|| {
        Error::MissingField {
            field: "--lr, --test or --sensitivity/--specificity".to_string(),
        }
    })?;
    let result = args.result.ok_or_else(|| Error::MissingField {
        field: "--result".to_string(),
    })?;
    let lrs = test.likelihood_ratios()?;
    Ok(match result {
        TestOutcome::Positive => lrs.lr_positive,
        TestOutcome::Negative => lrs.lr_negative,
    })
}
