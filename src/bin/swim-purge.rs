//! Delete Catalyst Center SWIM images by filters.
//!
//! Usage:
//!   swim-purge --base-url https://cc.example.net --family cat9k --golden false --dry-run
//!
//! Environment:
//!   CATALYST_BASE_URL   - controller URL (or --base-url)
//!   CATALYST_USERNAME   - API username
//!   CATALYST_PASSWORD   - API password
//!   CATALYST_TOKEN      - existing X-Auth-Token, skips login
//!   RUST_LOG            - log level (default: info)

use clap::{Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use swim_purge::{
    CatalystClient, Credentials, FilterOptions, FilterSpec, GoldenScope, ImageRecord, Operator,
    PurgeReport, PurgeWorkflow, RunOutcome, SwimError, WorkflowConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GoldenArg {
    True,
    False,
    Any,
}

impl GoldenArg {
    fn as_filter(self) -> Option<bool> {
        match self {
            GoldenArg::True => Some(true),
            GoldenArg::False => Some(false),
            GoldenArg::Any => None,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "swim-purge", about = "Delete Catalyst Center SWIM images by filters.")]
struct Cli {
    /// https://<catalyst-center-host>
    #[arg(long, env = "CATALYST_BASE_URL", help_heading = "Auth")]
    base_url: String,
    /// GUI/API username
    #[arg(long, env = "CATALYST_USERNAME", help_heading = "Auth")]
    username: Option<String>,
    /// GUI/API password
    #[arg(long, env = "CATALYST_PASSWORD", hide_env_values = true, help_heading = "Auth")]
    password: Option<String>,
    /// Use an existing X-Auth-Token instead of username/password
    #[arg(long, env = "CATALYST_TOKEN", hide_env_values = true, help_heading = "Auth")]
    token: Option<String>,
    /// Skip TLS verification
    #[arg(long, help_heading = "Auth")]
    insecure: bool,

    /// Device family filter (e.g. cat9k)
    #[arg(long, help_heading = "Filters")]
    family: Option<String>,
    /// Image type filter (e.g. bin, smu, rommon)
    #[arg(long = "type", help_heading = "Filters")]
    image_type: Option<String>,
    /// Substring match on image name
    #[arg(long, help_heading = "Filters")]
    name_contains: Option<String>,
    /// Regex on image name
    #[arg(long, help_heading = "Filters")]
    name_regex: Option<String>,
    /// Exact version match (e.g. 17.9.4a)
    #[arg(long, help_heading = "Filters")]
    version: Option<String>,
    /// Regex for version (e.g. '^17\.9\.')
    #[arg(long, help_heading = "Filters")]
    version_regex: Option<String>,
    /// Filter by golden status
    #[arg(long, value_enum, default_value = "any", help_heading = "Filters")]
    golden: GoldenArg,
    /// Only images older than N days
    #[arg(long, help_heading = "Filters")]
    older_than_days: Option<u32>,
    /// Delete only images not used by any device
    #[arg(long, help_heading = "Filters")]
    unused_only: bool,
    /// Stop after deleting N images (0 = no limit)
    #[arg(long, default_value_t = 0, help_heading = "Filters")]
    limit: usize,

    /// Site UUID; use -1 for Global
    #[arg(long, help_heading = "Golden tag (optional pre-step)")]
    site_id: Option<String>,
    /// Device family identifier (numeric string)
    #[arg(long, help_heading = "Golden tag (optional pre-step)")]
    device_family_identifier: Option<String>,
    /// Device role (ALL|ACCESS|DISTRIBUTION|CORE|BORDER ROUTER|UNKNOWN)
    #[arg(long, help_heading = "Golden tag (optional pre-step)")]
    device_role: Option<String>,

    /// Show what would be deleted; do nothing
    #[arg(long, help_heading = "Safety")]
    dry_run: bool,
    /// Do not prompt; proceed
    #[arg(long, help_heading = "Safety")]
    yes: bool,
    /// Print result JSON for automation
    #[arg(long, help_heading = "Safety")]
    json: bool,
}

impl Cli {
    fn credentials(&self) -> Result<Credentials, SwimError> {
        if let Some(token) = self.token.clone().filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token));
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(Credentials::Password {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(SwimError::Config(
                "provide either --token or --username/--password".into(),
            )),
        }
    }

    fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            family: self.family.clone(),
            name_contains: self.name_contains.clone(),
            name_regex: self.name_regex.clone(),
            version: self.version.clone(),
            version_regex: self.version_regex.clone(),
            image_type: self.image_type.clone(),
            golden: self.golden.as_filter(),
            older_than_days: self.older_than_days.filter(|d| *d > 0),
            unused_only: self.unused_only,
        }
    }

    fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            dry_run: self.dry_run,
            assume_yes: self.yes,
            limit: self.limit,
            golden_scope: GoldenScope::from_parts(
                self.site_id.clone(),
                self.device_family_identifier.clone(),
                self.device_role.clone(),
            ),
            ..Default::default()
        }
    }
}

/// Console operator: prints candidates and prompts on stdin.
struct ConsoleOperator {
    json: bool,
}

impl Operator for ConsoleOperator {
    fn present(&mut self, candidates: &[ImageRecord]) {
        if self.json {
            return;
        }
        println!();
        println!("Candidates:");
        for r in candidates {
            println!(
                "- {}  {}  v{}  fam={}  type={}  golden={}  used={}",
                r.display_id(),
                r.name,
                r.version,
                r.family,
                r.image_type,
                r.is_golden,
                r.used_device_count
            );
        }
        println!();
        println!("Total matches: {}", candidates.len());
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{} [y/N]: ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(input.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), SwimError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| SwimError::Decode(format!("failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_report(report: &PurgeReport, json: bool) -> Result<(), SwimError> {
    if json {
        return print_json(report);
    }
    println!();
    println!(
        "Done. Deleted: {}, Failed: {}",
        report.deleted.len(),
        report.failed.len()
    );
    if !report.failed.is_empty() {
        print_json(&report.failed)?;
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), SwimError> {
    let filter = FilterSpec::from_options(&cli.filter_options())?;
    let query = cli.filter_options().inventory_query();
    let credentials = cli.credentials()?;

    let client = CatalystClient::connect(&cli.base_url, credentials, !cli.insecure).await?;
    let workflow = PurgeWorkflow::new(&client, cli.workflow_config());
    let mut operator = ConsoleOperator { json: cli.json };

    match workflow.run(&query, &filter, &mut operator).await? {
        RunOutcome::DryRun { matches } => {
            if cli.json {
                print_json(&serde_json::json!({"dry_run": true, "matches": matches}))?;
            } else {
                println!();
                println!("DRY RUN: no deletions performed.");
            }
        }
        RunOutcome::NothingToDelete => println!("Nothing to delete (no matches)."),
        RunOutcome::Aborted { .. } => println!("Aborted."),
        RunOutcome::Completed(report) => print_report(&report, cli.json)?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr so --json output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("ERROR: {}", e);
            ExitCode::from(1)
        }
    }
}
