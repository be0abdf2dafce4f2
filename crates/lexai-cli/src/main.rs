//! LexAI command-line interface.
//!
//! ```text
//! lexai analyze --file lease.txt --industry SaaS --role Vendor
//! lexai chat --message "Can I terminate early?" --contract lease.txt
//! lexai prompt --text "..."            # print the analysis prompt, no network
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use lexai_core::{decode_contract, AnalysisProfile, AnalysisResult, ChatTurn};
use lexai_runtime::{prompts::build_analysis_prompt, LexAi, RuntimeConfig};

#[derive(Parser)]
#[command(name = "lexai")]
#[command(about = "Contract risk analysis and legal chat")]
#[command(version)]
struct Cli {
    /// YAML configuration file (defaults to $LEXAI_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a contract for risk
    Analyze {
        #[command(flatten)]
        input: ContractInput,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask a legal question, optionally about a contract
    Chat {
        #[arg(long)]
        message: String,

        /// Contract to ground the answer in
        #[arg(long)]
        contract: Option<PathBuf>,

        /// JSON array of prior turns: [{"role": "user", "content": "..."}]
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the analysis prompt without calling a model
    Prompt {
        #[command(flatten)]
        input: ContractInput,

        #[command(flatten)]
        profile: ProfileArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ContractInput {
    /// Contract file (UTF-8 text or PDF)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Contract text
    #[arg(long)]
    text: Option<String>,
}

impl ContractInput {
    fn read(&self) -> Result<String> {
        match (&self.file, &self.text) {
            (Some(path), _) => read_contract(path),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => bail!("Either --file or --text is required"),
        }
    }
}

#[derive(Args)]
struct ProfileArgs {
    #[arg(long, default_value = AnalysisProfile::DEFAULT_INDUSTRY)]
    industry: String,

    #[arg(long, default_value = AnalysisProfile::DEFAULT_RISK_TOLERANCE)]
    risk_tolerance: String,

    #[arg(long, default_value = AnalysisProfile::DEFAULT_ROLE)]
    role: String,
}

impl From<ProfileArgs> for AnalysisProfile {
    fn from(args: ProfileArgs) -> Self {
        AnalysisProfile::new(args.industry, args.risk_tolerance, args.role)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            profile,
            json,
        } => {
            let contract = input.read()?;
            let lexai = connect(cli.config.as_deref())?;
            let result = lexai.analyze(&contract, &profile.into()).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_analysis(&result));
            }
        }

        Commands::Chat {
            message,
            contract,
            history,
            json,
        } => {
            let contract = contract
                .as_deref()
                .map(read_contract)
                .transpose()?
                .unwrap_or_default();
            let history = history
                .as_deref()
                .map(read_history)
                .transpose()?
                .unwrap_or_default();

            let lexai = connect(cli.config.as_deref())?;
            let reply = lexai.chat(&message, &history, &contract, None).await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "response": reply, "session_id": null }))?
                );
            } else {
                println!("{}", reply);
            }
        }

        Commands::Prompt { input, profile } => {
            let contract = input.read()?;
            println!("{}", build_analysis_prompt(&contract, &profile.into()));
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn connect(config_path: Option<&Path>) -> Result<LexAi> {
    let config = RuntimeConfig::load(config_path).context("Failed to load configuration")?;
    LexAi::from_config(&config).context("Failed to create Gemini provider")
}

fn read_contract(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path.file_name().and_then(|name| name.to_str());
    decode_contract(file_name, bytes).with_context(|| path.display().to_string())
}

fn read_history(path: &Path) -> Result<Vec<ChatTurn>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of chat turns", path.display()))
}

fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall risk: {}/100", result.overall_risk_score);
    let _ = writeln!(out, "{}", result.summary);

    if result.clauses.is_empty() {
        return out;
    }

    let _ = writeln!(out, "\nClauses ({}):", result.clauses.len());
    for clause in &result.clauses {
        let _ = writeln!(out, "  [{}] {}", clause.risk_level, clause.clause_type);
        let _ = writeln!(out, "    \"{}\"", clause.text_snippet);
        let _ = writeln!(out, "    {}", clause.reasoning);
        if let Some(recommendation) = &clause.recommendation {
            let _ = writeln!(out, "    -> {}", recommendation);
        }
    }
    out
}
