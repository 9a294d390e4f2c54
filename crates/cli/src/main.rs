//! # intake
//!
//! Command-line front end for patient intake records.
//!
//! Capture files (see `intake template`) hold the raw text of each section. `save` turns one
//! into a rendered document plus its JSON sidecar; `load` and `search` read them back.
//!
//! ## Environment Variables
//! - `INTAKE_RECORDS_DIR`: root folder for records (default: "intake_records")
//! - `INTAKE_BACKEND_URL`: OCR and report backend (default: "http://127.0.0.1:8080")
//! - `INTAKE_REMOTE_TIMEOUT_SECS`: backend request budget (default: 300)
//! - `INTAKE_NOTIFY_WINDOW_MS`: error notification throttle window (default: 2000)

mod capture_file;
mod terminal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use intake_core::constants::DEFAULT_RECORDS_DIR;
use intake_core::{
    compute_bmi_or_fallback, ErrorNotifier, IntakeConfig, IntakeService, LabSlot, PickerFilter,
    Selection, PLACEHOLDER,
};
use intake_remote::{HttpReportEnhancer, HttpTextExtractor, RemoteConfig, DEFAULT_BACKEND_URL};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use terminal::{StderrSink, TerminalPrompt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Patient intake records CLI")]
struct Cli {
    /// Root folder holding Patients, AI_Report and Patients_Lab_Results
    #[arg(long, global = true, env = "INTAKE_RECORDS_DIR", default_value = DEFAULT_RECORDS_DIR)]
    records_dir: PathBuf,

    /// Base URL of the OCR and report backend
    #[arg(long, global = true, env = "INTAKE_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Budget for each backend request, in seconds
    #[arg(long, global = true, env = "INTAKE_REMOTE_TIMEOUT_SECS", default_value_t = 300)]
    remote_timeout_secs: u64,

    /// Repeated errors under the same key within this window are shown once
    #[arg(long, global = true, env = "INTAKE_NOTIFY_WINDOW_MS", default_value_t = 2000)]
    notify_window_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print an empty capture file
    Template,
    /// Save a capture file as a new intake document and sidecar
    Save {
        /// Capture file to save
        capture: PathBuf,
        /// Skip the enhanced report
        #[arg(long)]
        no_enhance: bool,
    },
    /// Print the record stored beside a document
    Load {
        /// Intake document (or its .json sidecar)
        document: PathBuf,
        /// Print the raw sidecar record instead of labelled fields
        #[arg(long)]
        json: bool,
    },
    /// Pick a stored intake interactively and print it as a capture file
    Search {
        /// Offer every PDF, not just intake documents
        #[arg(long)]
        any: bool,
        /// Write the capture file here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List stored intake documents, newest first
    List {
        /// List every PDF, not just intake documents
        #[arg(long)]
        any: bool,
    },
    /// Compute a BMI from a height and a weight
    Bmi {
        /// e.g. "170 cm", "1.70 m", "Height: 170"
        height: String,
        /// e.g. "70 kg", "154 lbs"
        weight: String,
        /// Printed when either value does not parse
        #[arg(long, default_value = PLACEHOLDER)]
        fallback: String,
    },
    /// Extract a lab result image into a capture file
    AttachLab {
        /// Capture file to update in place
        capture: PathBuf,
        /// Lab slot, 1 to 6
        #[arg(long)]
        slot: u8,
        /// Lab result image
        image: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("intake=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Template => {
            print!("{}", capture_file::template());
        }
        Commands::Bmi {
            height,
            weight,
            fallback,
        } => {
            println!("{}", compute_bmi_or_fallback(height, weight, fallback));
        }
        Commands::Save {
            capture,
            no_enhance,
        } => {
            let service = build_service(&cli, !no_enhance)?;
            let capture = read_capture(capture)?;
            let outcome = service.save_intake(&capture).await?;

            println!("Saved {}", outcome.saved.document_path.display());
            println!("Data  {}", outcome.saved.sidecar_path.display());
            if let Some(report) = outcome.report {
                match report.document_path {
                    Some(path) => println!("Report {}", path.display()),
                    None => println!("Report not written"),
                }
                println!("\n{}", report.text);
            }
        }
        Commands::Load { document, json } => {
            let service = build_service(&cli, false)?;
            let loaded = service.load_capture(document)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&loaded.record)?);
            } else {
                for field in loaded.record.fields() {
                    println!("{}: {}", field.label, field.value);
                }
            }
        }
        Commands::Search { any, output } => {
            let service = build_service(&cli, false)?;
            let mut prompt = TerminalPrompt::stdio();
            match service.search_and_load(&mut prompt, picker_filter(*any))? {
                Selection::Loaded { document, value } => {
                    let text = capture_file::render(&value.capture);
                    match output {
                        Some(path) => {
                            std::fs::write(path, text)
                                .with_context(|| format!("writing {}", path.display()))?;
                            eprintln!("Loaded {} into {}", document.display(), path.display());
                        }
                        None => print!("{text}"),
                    }
                }
                Selection::Cancelled => eprintln!("Cancelled."),
            }
        }
        Commands::List { any } => {
            let service = build_service(&cli, false)?;
            let candidates = service.store().list_candidates(picker_filter(*any))?;
            if candidates.is_empty() {
                println!("No intake documents found.");
            }
            for path in candidates {
                println!("{}", path.display());
            }
        }
        Commands::AttachLab {
            capture,
            slot,
            image,
        } => {
            let slot = LabSlot::new(*slot)?;
            let service = build_service(&cli, true)?;
            let mut text = read_capture(capture)?;
            let attachment = service.attach_lab_result(&mut text, slot, image).await;

            std::fs::write(capture, capture_file::render(&text))
                .with_context(|| format!("writing {}", capture.display()))?;
            if let Some(path) = &attachment.copied_to {
                eprintln!("Copied image to {}", path.display());
            }
            println!("Lab Result {}:\n{}", attachment.slot, attachment.preview);
        }
    }

    Ok(())
}

/// Resolves configuration once and wires the service. Remote collaborators are attached only
/// when `remote` is set.
fn build_service(cli: &Cli, remote: bool) -> Result<IntakeService> {
    let remote_timeout = Duration::from_secs(cli.remote_timeout_secs);
    let cfg = Arc::new(IntakeConfig::new(
        cli.records_dir.clone(),
        Duration::from_millis(cli.notify_window_ms),
        remote_timeout,
    )?);
    let notifier = Arc::new(ErrorNotifier::new(
        cfg.notify_window(),
        Box::new(StderrSink),
    ));

    let mut service = IntakeService::new(cfg, notifier);
    if remote {
        let remote_cfg = RemoteConfig::new(&cli.backend_url, remote_timeout)?;
        tracing::debug!(backend = remote_cfg.base_url(), "remote collaborators enabled");
        service = service
            .with_enhancer(Arc::new(HttpReportEnhancer::new(remote_cfg.clone())?))
            .with_extractor(Arc::new(HttpTextExtractor::new(remote_cfg)?));
    }
    Ok(service)
}

fn read_capture(path: &Path) -> Result<intake_core::IntakeCapture> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    capture_file::parse(&text).with_context(|| format!("parsing {}", path.display()))
}

fn picker_filter(any: bool) -> PickerFilter {
    if any {
        PickerFilter::AnyDocument
    } else {
        PickerFilter::Intake
    }
}
