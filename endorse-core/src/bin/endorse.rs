//! Endorse - command-line endorsement checker
//!
//! Evaluates ledger write requests against an endorsement constraint using a
//! registry seeded from a YAML configuration file.
//!
//! # Usage
//!
//! ```bash
//! # Check a request file against the default ENDORSER constraint
//! endorse --config ledger.yaml check --request req.json
//!
//! # Read the request from stdin, require two STEWARD signatures, print JSON
//! cat req.json | endorse --config ledger.yaml check --role STEWARD --sig-count 2 --output json
//!
//! # Resolve a DID's role in the committed view
//! endorse --config ledger.yaml role V4SGRU86Z58d6TV7PBUe6f --view committed
//! ```
//!
//! Log verbosity follows `RUST_LOG` (e.g. `RUST_LOG=endorse_core=debug`).

use clap::{Parser, Subcommand, ValueEnum};
use endorse_core::{
    config::{AuditSink, ConfigError, EndorseConfig, CONFIG_VERSION},
    AuthConstraint, Did, Request, RoleRegistry, View,
};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "endorse")]
#[command(about = "Ledger endorsement-policy checker", long_about = None)]
struct Cli {
    /// Configuration file (YAML). Can also be set via ENDORSE_CONFIG.
    #[arg(short, long, env = "ENDORSE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Output {
    ExitCode,
    Json,
    Quiet,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ViewArg {
    Committed,
    Uncommitted,
}

impl From<ViewArg> for View {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Committed => View::Committed,
            ViewArg::Uncommitted => View::Uncommitted,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a request against an endorsement constraint
    Check {
        /// Request JSON file, or - for stdin (default: stdin)
        #[arg(short, long)]
        request: Option<String>,

        /// Role the endorser must hold
        #[arg(long, default_value = "ENDORSER")]
        role: String,

        /// Minimum number of signers holding the role
        #[arg(long, default_value_t = 1)]
        sig_count: u32,

        /// Registry view (overrides the configured one)
        #[arg(long, value_enum)]
        view: Option<ViewArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "exit-code")]
        output: Output,
    },

    /// Print the role bound to a DID
    Role {
        did: String,

        #[arg(long, value_enum)]
        view: Option<ViewArg>,
    },

    /// Validate the configuration file
    Validate,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Check {
            request,
            role,
            sig_count,
            view,
            output,
        } => {
            let json = read_request(request)?;
            let req = Request::from_json(&json)?;
            let constraint = AuthConstraint::new(role.parse()?, sig_count)?;

            config.settings.audit = audit_sink_for(config.settings.audit, output);
            let registry = config.build_registry();
            let authorizer = config.build_authorizer(&registry);
            let view = view.map(View::from).unwrap_or(authorizer.view());
            let result = authorizer.authorize_in(&req, &constraint, view);

            match output {
                Output::ExitCode => {
                    if let Err(denial) = result {
                        eprintln!("Endorsement denied: {}", denial);
                        std::process::exit(1);
                    }
                }
                Output::Json => {
                    let json = serde_json::json!({
                        "authorized": result.is_ok(),
                        "reason": result.as_ref().err().map(|d| d.reason()),
                        "code": result.as_ref().err().map(|d| d.code().code()),
                        "author": req.identifier(),
                        "endorser": req.endorser(),
                        "constraint": constraint.to_string(),
                        "view": view,
                    });
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                Output::Quiet => {
                    if result.is_err() {
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Role { did, view } => {
            let did = Did::new(did)?;
            let registry = config.build_registry();
            let view = view.map(View::from).unwrap_or(config.settings.view);
            match registry.binding(&did, view) {
                Some(binding) => {
                    println!("{} {}", did, binding.effective_role());
                    println!("  seq_no: {}", binding.seq_no);
                    if let Some(verkey) = &binding.verkey {
                        println!("  verkey: {}", verkey);
                    }
                }
                None => println!(
                    "{} {} (no binding in {} view)",
                    did,
                    registry.role_of(&did, view),
                    view
                ),
            }
        }

        Commands::Validate => {
            println!(
                "Configuration valid: {} registry bindings, view {}",
                config.registry.len(),
                config.settings.view
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<EndorseConfig, ConfigError> {
    let config = match path {
        Some(path) => EndorseConfig::from_file(path)?,
        None => {
            tracing::warn!("no configuration given; using an empty registry");
            EndorseConfig {
                version: CONFIG_VERSION.to_string(),
                settings: Default::default(),
                registry: Vec::new(),
            }
        }
    };
    config.validate()?;
    Ok(config)
}

/// Stdout belongs to the verdict in JSON mode; audit lines move to stderr.
fn audit_sink_for(configured: AuditSink, output: Output) -> AuditSink {
    match (configured, output) {
        (AuditSink::Stdout, Output::Json) => AuditSink::Stderr,
        (sink, _) => sink,
    }
}

fn read_request(request: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match request {
        Some(path) if path != "-" => Ok(fs::read_to_string(path)?),
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}
