//! PALISADE — Sandbox Verifier Demo CLI
//!
//! Verifies compiled `.class` files against an allow-list policy, checks
//! bare class names, or re-renders a policy into canonical form.
//!
//! Usage:
//!   cargo run -p demo -- verify --policy base.policy Widget.class
//!   cargo run -p demo -- verify --manifest run.toml --json
//!   cargo run -p demo -- check-names --policy base.policy java.net.Socket
//!   cargo run -p demo -- render --policy base.policy

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use palisade_contracts::batch::NamedClassBytes;
use palisade_contracts::error::{PalisadeError, PalisadeResult};
use palisade_policy::PolicySet;
use palisade_scan::class_name_of;
use palisade_verify::SandboxVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// PALISADE — capability-based sandbox verifier for class bytecode.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "PALISADE sandbox verifier demo",
    long_about = "Scans compiled classes for every capability they request and\n\
                  rejects them unless an allow-list policy covers all of them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify class files against a policy; exits 1 on any violation.
    Verify {
        /// Policy files in canonical line format. Repeatable.
        #[arg(long = "policy")]
        policies: Vec<PathBuf>,
        /// Additional call-scoped policy lines. Repeatable.
        #[arg(long = "extra")]
        extra: Vec<String>,
        /// A TOML manifest naming policy files, extra lines, and classes.
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Emit the full outcome as JSON instead of a summary.
        #[arg(long)]
        json: bool,
        /// Class files to verify.
        classes: Vec<PathBuf>,
    },
    /// Check bare class names for instance-reference coverage.
    CheckNames {
        #[arg(long = "policy")]
        policies: Vec<PathBuf>,
        /// Fully-qualified dotted class names.
        names: Vec<String>,
    },
    /// Parse a policy and print its canonical rendering.
    Render {
        #[arg(long = "policy")]
        policies: Vec<PathBuf>,
    },
}

/// The optional TOML manifest for `verify`.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    policy: ManifestPolicy,
    #[serde(default)]
    input: ManifestInput,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestPolicy {
    #[serde(default)]
    files: Vec<PathBuf>,
    #[serde(default)]
    extra: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestInput {
    #[serde(default)]
    classes: Vec<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging. Set RUST_LOG=debug to watch the scan pipeline.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Verify { policies, extra, manifest, json, classes } => {
            run_verify(policies, extra, manifest, json, classes)
        }
        Command::CheckNames { policies, names } => run_check_names(policies, names),
        Command::Render { policies } => run_render(policies),
    };

    match result {
        Ok(passed) => {
            if !passed {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

// ── Subcommands ───────────────────────────────────────────────────────────────

fn run_verify(
    mut policy_files: Vec<PathBuf>,
    mut extra_lines: Vec<String>,
    manifest: Option<PathBuf>,
    json: bool,
    mut class_files: Vec<PathBuf>,
) -> PalisadeResult<bool> {
    if let Some(path) = manifest {
        let manifest = load_manifest(&path)?;
        policy_files.extend(manifest.policy.files);
        extra_lines.extend(manifest.policy.extra);
        class_files.extend(manifest.input.classes);
    }
    if class_files.is_empty() {
        return Err(PalisadeError::Config {
            reason: "no class files given (positional arguments or manifest [input].classes)"
                .to_string(),
        });
    }

    let baseline = load_policies(&policy_files)?;
    let extra = PolicySet::from_lines(extra_lines.iter().map(String::as_str))?;

    let mut batch = Vec::with_capacity(class_files.len());
    for path in &class_files {
        let bytes = read_file(path)?;
        let name = class_name_of(&bytes)?;
        batch.push(NamedClassBytes::new(name.class, bytes));
    }

    let verifier = SandboxVerifier::new(baseline);
    let outcome = verifier.verify(batch, &extra)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).map_err(|e| PalisadeError::Config {
                reason: format!("cannot serialize outcome: {}", e),
            })?
        );
    } else {
        println!("verification {}", outcome.id.0);
        for class in &outcome.accepted {
            println!("  accepted  {}", class.name);
        }
        for name in &outcome.rejected {
            println!("  rejected  {}", name);
        }
        if !outcome.passed() {
            println!("violations (add these lines to the policy to permit):");
            for violation in &outcome.violations {
                println!("  {}", violation);
            }
        }
    }

    Ok(outcome.passed())
}

fn run_check_names(policy_files: Vec<PathBuf>, names: Vec<String>) -> PalisadeResult<bool> {
    let baseline = load_policies(&policy_files)?;
    let verifier = SandboxVerifier::new(baseline);
    let outcome = verifier.verify_names(&names, &PolicySet::new());

    for name in &outcome.allowed {
        println!("  allowed   {}", name);
    }
    for violation in &outcome.violations {
        println!("  violation {}", violation);
    }
    Ok(outcome.passed())
}

fn run_render(policy_files: Vec<PathBuf>) -> PalisadeResult<bool> {
    let set = load_policies(&policy_files)?;
    for line in set.canonical_lines() {
        println!("{}", line);
    }
    Ok(true)
}

// ── Input loading ─────────────────────────────────────────────────────────────

fn load_policies(files: &[PathBuf]) -> PalisadeResult<PolicySet> {
    let mut set = PolicySet::new();
    for path in files {
        let text = String::from_utf8_lossy(&read_file(path)?).into_owned();
        set = set.merged_with(&PolicySet::from_text(&text)?);
    }
    Ok(set)
}

fn load_manifest(path: &Path) -> PalisadeResult<Manifest> {
    let text = String::from_utf8_lossy(&read_file(path)?).into_owned();
    toml::from_str(&text).map_err(|e| PalisadeError::Config {
        reason: format!("cannot parse manifest '{}': {}", path.display(), e),
    })
}

fn read_file(path: &Path) -> PalisadeResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| PalisadeError::Config {
        reason: format!("cannot read '{}': {}", path.display(), e),
    })
}
