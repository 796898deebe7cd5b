//! Command-line consumer of the inference pipeline.
//!
//! Usage:
//!   jobimpact predict [--models <dir>] [--defaults] [--json] [--param key=value]...
//!   jobimpact demo-models <dir> [--binary]
//!
//! Options:
//!   --models <dir>      Artifact directory (default: $JOBIMPACT_MODEL_DIR or `models`)
//!   --defaults          Start from the input form defaults before applying --param
//!   --json              Print the tagged outcome as JSON
//!   --param key=value   Request parameter; numbers parse as numeric values
//!   --binary            Write native `.jim` artifacts instead of JSON
//!   --log-json          Emit logs as JSON lines on stderr

use std::path::PathBuf;
use std::process::ExitCode;

use jobimpact::config::ENV_MODEL_DIR;
use jobimpact::logging::{self, LogFormat};
use jobimpact::persist::Format;
use jobimpact::{testing, FeatureValue, JobPosting, Orchestrator, PredictionOutcome, RawParams};

const USAGE: &str = "\
jobimpact

  predict [--models <dir>] [--defaults] [--json] [--param key=value]...
  demo-models <dir> [--binary]

  --log-json    JSON log lines on stderr";

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug)]
enum Command {
    Predict {
        models: Option<PathBuf>,
        params: RawParams,
        json: bool,
    },
    DemoModels {
        dir: PathBuf,
        format: Format,
    },
    Help,
}

fn parse_param(arg: &str) -> Result<(String, FeatureValue), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("--param expects key=value, got `{arg}`"))?;
    if key.is_empty() {
        return Err(format!("--param has an empty key: `{arg}`"));
    }
    let value = match value.parse::<f64>() {
        Ok(v) => FeatureValue::Numeric(v),
        Err(_) if value.is_empty() => FeatureValue::Absent,
        Err(_) => FeatureValue::Categorical(value.to_string()),
    };
    Ok((key.to_string(), value))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<(Command, LogFormat), String> {
    let mut log_format = LogFormat::Text;
    let mut rest = Vec::new();
    for arg in args {
        if arg == "--log-json" {
            log_format = LogFormat::Json;
        } else {
            rest.push(arg);
        }
    }

    let mut it = rest.into_iter();
    let command = match it.next().as_deref() {
        None | Some("--help") | Some("help") => Command::Help,
        Some("predict") => {
            let mut models = None;
            let mut params = RawParams::new();
            let mut explicit = Vec::new();
            let mut defaults = false;
            let mut json = false;
            while let Some(arg) = it.next() {
                match arg.as_str() {
                    "--models" => models = Some(PathBuf::from(it.next().ok_or("--models requires a directory")?)),
                    "--param" => explicit.push(parse_param(&it.next().ok_or("--param requires key=value")?)?),
                    "--defaults" => defaults = true,
                    "--json" => json = true,
                    other => return Err(format!("unknown predict option `{other}`")),
                }
            }
            if defaults {
                params = JobPosting::default().into_params();
            }
            params.extend(explicit);
            Command::Predict { models, params, json }
        }
        Some("demo-models") => {
            let mut dir = None;
            let mut format = Format::Json;
            for arg in it {
                match arg.as_str() {
                    "--binary" => format = Format::Binary,
                    other if other.starts_with("--") => return Err(format!("unknown demo-models option `{other}`")),
                    other => dir = Some(PathBuf::from(other)),
                }
            }
            Command::DemoModels {
                dir: dir.ok_or("demo-models requires a target directory")?,
                format,
            }
        }
        Some(other) => return Err(format!("unknown command `{other}`")),
    };
    Ok((command, log_format))
}

// =============================================================================
// Commands
// =============================================================================

fn predict(models: Option<PathBuf>, params: &RawParams, json: bool) -> Result<bool, String> {
    // --models takes precedence over JOBIMPACT_MODEL_DIR
    let models = models.map(|dir| dir.to_string_lossy().into_owned());
    let orchestrator = Orchestrator::from_lookup(|key| match (key, &models) {
        (ENV_MODEL_DIR, Some(dir)) => Some(dir.clone()),
        _ => std::env::var(key).ok(),
    })
    .map_err(|e| e.to_string())?;
    let outcome = orchestrator.predict_outcome(params);

    if json {
        let text = serde_json::to_string_pretty(&outcome).map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(outcome.is_success());
    }

    match &outcome {
        PredictionOutcome::Success(result) => {
            let band = result.automation_risk_band();
            println!("Industry AI adoption stage: {}", result.adoption_stage);
            println!("Automation risk score:      {:.2} ({band})", result.automation_risk);
            println!("AI job displacement risk:   {}", result.displacement_risk);
            println!();
            println!("{}", band.recommendation());
        }
        PredictionOutcome::Failure { stage, message, .. } => match stage {
            Some(stage) => eprintln!("error: prediction failed at the {stage} stage: {message}"),
            None => eprintln!("error: prediction failed: {message}"),
        },
    }
    Ok(outcome.is_success())
}

fn demo_models(dir: PathBuf, format: Format) -> Result<bool, String> {
    let models = testing::demo_models().map_err(|e| e.to_string())?;
    let written = models.write(&dir, format).map_err(|e| e.to_string())?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(true)
}

fn main() -> ExitCode {
    let (command, log_format) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("error: {msg}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };
    logging::init(log_format);

    let result = match command {
        Command::Help => {
            eprintln!("{USAGE}");
            Ok(true)
        }
        Command::Predict { models, params, json } => predict(models, &params, json),
        Command::DemoModels { dir, format } => demo_models(dir, format),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(msg) => {
            tracing::error!(error = %msg, "command failed");
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}
