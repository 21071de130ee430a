//! Upload one spreadsheet, show its preview counts and confirm every chunk.
//!
//! Usage: `polisa-import <file> [--config <path>]`

use color_eyre::eyre::{bail, eyre, WrapErr};
use polisa_client::{telemetry, ConsoleConfig, RestClient};
use polisa_core::ImportFile;
use polisa_engine::{BatchImportRunner, ImportOutcome, Notification, PreviewFilter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let file_path = file_arg(std::env::args().skip(1))
        .ok_or_else(|| eyre!("usage: polisa-import <file> [--config <path>]"))?;

    let config = ConsoleConfig::load()?;
    telemetry::init(&config.logging)?;
    let client = Arc::new(RestClient::new(&config)?);
    let mut runner = BatchImportRunner::new(client, config.import_config());

    let file = read_import_file(&file_path).await?;
    let summary = runner.start(file).await?;
    println!(
        "Session {}: {} rows ({} valid, {} invalid)",
        summary.session_id, summary.total_rows, summary.valid_rows, summary.invalid_rows
    );

    let invalid = runner.preview_page(PreviewFilter::Invalid, 1, config.page_size());
    for row in &invalid.items {
        println!("  row {}: {}", row.row_number, row.errors.join("; "));
    }
    if invalid.total_items > invalid.items.len() {
        println!("  ... {} more invalid rows", invalid.total_items - invalid.items.len());
    }
    if summary.valid_rows == 0 {
        runner.cancel();
        bail!("nothing to import: no valid rows");
    }

    let cancel = runner.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut progress = runner.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            let p = &snapshot.progress;
            println!(
                "  {}/{} processed ({} imported, {} duplicates, {} failed)",
                p.processed_so_far, p.total, p.success_count, p.duplicate_count, p.failed_count
            );
        }
    });

    let outcome = runner.confirm().await;
    drop(runner);
    let _ = reporter.await;

    if let Some(toast) = Notification::import(&outcome) {
        println!("{}", toast.message);
    }
    match outcome {
        ImportOutcome::Completed(progress) => {
            for error in &progress.errors {
                println!("  row {}: {}", error.row_number, error.message);
            }
            Ok(())
        }
        ImportOutcome::Aborted { .. } => bail!("import did not finish"),
        ImportOutcome::Ignored(phase) => bail!("nothing to confirm in phase {:?}", phase),
    }
}

/// First positional argument that is not the value of `--config`.
fn file_arg(args: impl IntoIterator<Item = String>) -> Option<PathBuf> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            args.next();
            continue;
        }
        if !arg.starts_with("--") {
            return Some(PathBuf::from(arg));
        }
    }
    None
}

async fn read_import_file(path: &Path) -> color_eyre::Result<ImportFile> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import.xlsx".to_string());
    Ok(ImportFile::new(file_name, bytes))
}
