mod assemble;
mod config;
mod db;
mod document;
mod error;
mod news;
mod parser;
mod report;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Settings;
use crate::document::{read_document, DocumentKind};
use crate::parser::CaseTexts;
use crate::report::{Sheet, SUMMARY_SHEET};

#[derive(Parser)]
#[command(
    name = "case_extractor",
    about = "Extract and classify property, registry and credit documents into a case record"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: read the three documents, classify, write the case artifact
    Run {
        /// Property title extract (STARS / SSCT)
        #[arg(long)]
        stars: PathBuf,
        /// Credit bureau report (CBS)
        #[arg(long)]
        cbs: PathBuf,
        /// Registry and litigation extract (SCCB / ACRA)
        #[arg(long)]
        sccb: PathBuf,
        /// Output artifact (.json for JSON, anything else for SQLite)
        #[arg(short, long, default_value = "Case_Output.sqlite")]
        out: PathBuf,
        /// Search for adverse news on the borrower
        #[arg(long)]
        adverse: bool,
        /// Reference date for age and lease arithmetic (default: today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Print one document's extracted fields as JSON
    Extract {
        #[arg(short, long, value_enum)]
        kind: DocumentKind,
        path: PathBuf,
    },
    /// Run only the adverse-news search
    News {
        #[arg(long)]
        name: String,
        /// Max hits (default from CASE_NEWS_LIMIT)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print the Summary sheet of a stored SQLite artifact
    Show {
        artifact: PathBuf,
        /// Print the stored case record as JSON instead
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "Could not load settings, using defaults");
        Settings::default()
    });

    let result = match cli.command {
        Commands::Run {
            stars,
            cbs,
            sccb,
            out,
            adverse,
            today,
        } => {
            for path in [&stars, &cbs, &sccb] {
                if !path.exists() {
                    bail!("File not found: {}", path.display());
                }
            }
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());
            info!(%today, out = %out.display(), "Processing case");

            let texts = CaseTexts {
                property: read_document(&stars)?,
                registry: read_document(&sccb)?,
                credit: read_document(&cbs)?,
            };
            let docs = parser::process_case(&texts);

            let hits = if adverse {
                let name = docs
                    .credit
                    .text(parser::extract::credit::CBS_NAME)
                    .or_else(|| {
                        docs.registry
                            .fields
                            .text(parser::extract::registry::INDIVIDUAL_NAME)
                    })
                    .unwrap_or_default();
                news::adverse_news(&settings, name, settings.news_limit).await
            } else {
                Vec::new()
            };
            let news_ran = adverse && !hits.is_empty();

            let attachments = [&stars, &cbs, &sccb]
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect();

            let record = assemble::assemble(
                &docs.property,
                &docs.registry,
                &docs.credit,
                hits,
                attachments,
                today,
            );
            report::renderer_for(&out)
                .render(&record)
                .with_context(|| format!("writing {}", out.display()))?;

            let workbook = report::build_workbook(&record);
            if let Some(summary) = workbook.sheet(SUMMARY_SHEET) {
                print_sheet(summary);
            }

            let news_note = if news_ran {
                format!(" Adverse-news: {} item(s).", record.adverse_news.len())
            } else {
                " Adverse-news: skipped or none.".to_string()
            };
            println!("\nWrote {} with sectioned sheets.{}", out.display(), news_note);
            Ok(())
        }
        Commands::Extract { kind, path } => {
            let text = read_document(&path)?;
            let json = match kind {
                DocumentKind::Property => {
                    serde_json::to_string_pretty(&parser::extract::property::extract(&text))?
                }
                DocumentKind::Registry => {
                    serde_json::to_string_pretty(&parser::extract::registry::extract(&text))?
                }
                DocumentKind::Credit => {
                    serde_json::to_string_pretty(&parser::extract::credit::extract(&text))?
                }
            };
            println!("{}", json);
            Ok(())
        }
        Commands::News { name, limit } => {
            if settings.news_credentials().is_none() {
                warn!("GOOGLE_CSE_API_KEY / GOOGLE_CSE_ENGINE_ID not set, nothing to search");
            }
            let limit = limit.unwrap_or(settings.news_limit);
            let hits = news::adverse_news(&settings, &name, limit).await;
            if hits.is_empty() {
                println!("No adverse news found for {}.", name);
                return Ok(());
            }
            for (i, hit) in hits.iter().enumerate() {
                println!("{:>2}. {}", i + 1, hit.title);
                println!("    {}", hit.link);
                if !hit.snippet.is_empty() {
                    println!("    {}", truncate(&hit.snippet, 160));
                }
            }
            Ok(())
        }
        Commands::Show { artifact, json } => show(&artifact, json),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn show(artifact: &Path, json: bool) -> anyhow::Result<()> {
    if !artifact.exists() {
        bail!("File not found: {}", artifact.display());
    }
    let conn = db::connect(artifact)?;
    if json {
        let record = db::fetch_record_json(&conn)?
            .with_context(|| format!("{} holds no case record", artifact.display()))?;
        let value: serde_json::Value = serde_json::from_str(&record)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    let sheets = db::list_sheets(&conn).context("not a case artifact")?;
    let Some(summary) = db::fetch_sheet(&conn, SUMMARY_SHEET)? else {
        bail!("{} has no {} sheet", artifact.display(), SUMMARY_SHEET);
    };
    print_sheet(&summary);

    let names: Vec<String> = sheets
        .iter()
        .map(|(name, hidden)| if *hidden { format!("{} (hidden)", name) } else { name.clone() })
        .collect();
    println!("\nSheets: {}", names.join(", "));
    Ok(())
}

/// Labels padded to one column, multi-line values indented under the first line.
fn print_sheet(sheet: &Sheet) {
    let width = sheet
        .rows
        .iter()
        .filter(|r| r.len() >= 2)
        .map(|r| r[0].chars().count())
        .max()
        .unwrap_or(0);
    for row in &sheet.rows {
        match row.as_slice() {
            [] => println!(),
            [title] => println!("{}", title),
            [label, value, ..] => {
                let mut lines = value.lines();
                println!("{:<width$}  {}", label, lines.next().unwrap_or(""), width = width);
                for line in lines {
                    println!("{:<width$}  {}", "", line, width = width);
                }
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
