//! Land-Use Compliance CLI

use clap::{Parser, Subcommand};
use lu_client::RemoteAnalysisClient;
use lu_core::{
    report::{self, markdown, ReportFormat},
    AnalysisBackend, AnalysisOutcome, AnalysisState, Orchestrator, OrchestratorConfig,
    ServiceConfig,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lu-scan")]
#[command(about = "Land-use compliance analysis for drawn boundaries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a GeoJSON boundary can be analysed
    Validate {
        /// Path to a GeoJSON Polygon or Feature
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run the full built-up / encroachment / scoring analysis
    Analyze {
        /// Path to a GeoJSON Polygon or Feature
        #[arg(short, long)]
        file: PathBuf,

        /// Analysis service base URL (defaults to LANDUSE_SERVICE_URL)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Per-call timeout in milliseconds (defaults to LANDUSE_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output format (json, markdown)
        #[arg(short, long, default_value = "markdown")]
        output: String,

        /// Output file (defaults to stdout)
        #[arg(short = 'O', long)]
        output_file: Option<PathBuf>,
    },

    /// Compare a surveyed boundary with its allotted reference
    Compare {
        /// Reference (allotted) boundary
        #[arg(short, long)]
        reference: PathBuf,

        /// Current (surveyed) boundary
        #[arg(short, long)]
        current: PathBuf,

        /// Differences smaller than this many square metres are ignored
        #[arg(long)]
        tolerance_m2: Option<f64>,

        /// Analysis service base URL (defaults to LANDUSE_SERVICE_URL)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let code = match cli.command {
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Analyze {
            file,
            endpoint,
            timeout_ms,
            output,
            output_file,
        } => cmd_analyze(&file, endpoint, timeout_ms, &output, output_file).await,
        Commands::Compare {
            reference,
            current,
            tolerance_m2,
            endpoint,
        } => cmd_compare(&reference, &current, tolerance_m2, endpoint).await,
    };

    std::process::exit(code);
}

fn read_geojson(path: &Path) -> Result<Value, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("{} is not valid JSON: {}", path.display(), e))
}

fn service_config(endpoint: Option<String>, timeout_ms: Option<u64>) -> Result<ServiceConfig, String> {
    let mut config = ServiceConfig::from_env().map_err(|e| e.to_string())?;
    if let Some(endpoint) = endpoint {
        config.base_url = endpoint;
    }
    if let Some(timeout_ms) = timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    config.checked().map_err(|e| e.to_string())
}

fn cmd_validate(file: &Path) -> i32 {
    info!("Validating boundary: {}", file.display());

    let raw = match read_geojson(file) {
        Ok(raw) => raw,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    match lu_core::validate(&raw) {
        Ok(boundary) => {
            println!("\nBoundary\n{}", "=".repeat(50));
            println!("Vertices: {}", boundary.vertex_count());
            println!("Holes: {}", boundary.hole_count());
            if let Some(bbox) = boundary.bounding_box() {
                println!("West/South: {:.6}, {:.6}", bbox.min().x, bbox.min().y);
                println!("East/North: {:.6}, {:.6}", bbox.max().x, bbox.max().y);
            }
            println!("\nBoundary is VALID");
            0
        }
        Err(reason) => {
            println!("Boundary is INVALID: {}", reason);
            1
        }
    }
}

async fn cmd_analyze(
    file: &Path,
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> i32 {
    let format: ReportFormat = match output_format.parse() {
        Ok(format) => format,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let raw = match read_geojson(file) {
        Ok(raw) => raw,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let config = match service_config(endpoint, timeout_ms) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let client = match RemoteAnalysisClient::new(config.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return 1;
        }
    };

    info!("Analysing {} against {}", file.display(), config.base_url);

    let backend: Arc<dyn AnalysisBackend> = Arc::new(client);
    let orchestrator = Orchestrator::new(backend, OrchestratorConfig::from(&config));

    // Log stage changes as they happen
    let mut events = orchestrator.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(state) = events.recv().await {
            match state {
                AnalysisState::Complete { .. } | AnalysisState::Failed { .. } => break,
                other => info!("{}", other.label()),
            }
        }
    });

    let outcome = orchestrator.analyze(&raw).await;
    drop(orchestrator);
    let _ = progress.await;

    match outcome {
        AnalysisOutcome::Complete(result) => {
            info!(
                "Analysis completed: score {} ({})",
                result.compliance.compliance_score, result.compliance.severity
            );

            match report::generate_report(&result, format) {
                Ok(content) => write_output(&content, output_file),
                Err(e) => {
                    error!("Failed to generate report: {}", e);
                    1
                }
            }
        }
        AnalysisOutcome::Failed { stage, error } => {
            error!("Analysis failed at {}: {}", stage, error);
            eprintln!("{}", markdown::failure(stage, &error));
            1
        }
        AnalysisOutcome::Superseded { generation } => {
            debug!("Analysis {} was superseded", generation);
            1
        }
    }
}

async fn cmd_compare(
    reference: &Path,
    current: &Path,
    tolerance_m2: Option<f64>,
    endpoint: Option<String>,
) -> i32 {
    let load = |path: &Path| {
        read_geojson(path).and_then(|raw| {
            lu_core::validate(&raw).map_err(|e| format!("{}: {}", path.display(), e))
        })
    };
    let boundaries = load(reference).and_then(|allotted| load(current).map(|surveyed| (allotted, surveyed)));

    let (reference, current) = match boundaries {
        Ok(pair) => pair,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let client = match service_config(endpoint, None)
        .and_then(|config| RemoteAnalysisClient::new(config).map_err(|e| e.to_string()))
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create client: {}", e);
            return 1;
        }
    };

    match client.compare_boundaries(&reference, &current, tolerance_m2).await {
        Ok(comparison) => {
            println!("\nBoundary Comparison\n{}", "=".repeat(50));
            println!("Reference area: {:.2} m²", comparison.total_reference_area);
            println!("Overlap: {:.2} m²", comparison.overlap_area);
            println!("Encroachment: {:.2} m²", comparison.encroachment_area);
            println!(
                "Unused: {:.2} m² ({:.2}%)",
                comparison.unused_area, comparison.unused_percentage
            );
            if comparison.tolerance_applied {
                println!(
                    "Differences under {} m² were ignored",
                    comparison.tolerance_m2
                );
            }

            println!("\n{}", "=".repeat(50));
            if comparison.has_encroachment() {
                println!("Encroachment DETECTED");
                1
            } else {
                println!("No encroachment beyond the reference boundary");
                0
            }
        }
        Err(e) => {
            error!("Comparison failed: {}", e);
            1
        }
    }
}

fn write_output(content: &str, output_file: Option<PathBuf>) -> i32 {
    match output_file {
        Some(path) => match std::fs::write(&path, content) {
            Ok(()) => {
                info!("Report written to: {}", path.display());
                0
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                1
            }
        },
        None => {
            println!("{}", content);
            0
        }
    }
}
