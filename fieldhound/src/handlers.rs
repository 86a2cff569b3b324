use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use fieldhound_core::report::format_mapping;
use fieldhound_core::{
    AnalysisEvent, AnalysisOrchestrator, CapturedRequest, ConfigUpdate, EventSink,
    FieldMappingAnalyzer, ListConfig, Mapping, ReportFormat, RunOutcome, SearchResult,
    extract_list, load_capture, locate, locate_all, render_report, save_report,
};
use fieldhound_scanner::HttpTransport;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Expand a leading `~` in a user-supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

pub fn load_capture_file(path: &Path) -> Result<CapturedRequest> {
    let path = expand_path(path);
    load_capture(&path).with_context(|| format!("Failed to load capture {}", path.display()))
}

/// `--target` is a plain string unless `as_json` is set, in which case it is
/// parsed as a JSON literal so numbers and booleans compare strictly.
pub fn parse_target_value(raw: &str, as_json: bool) -> Result<Value> {
    if as_json {
        serde_json::from_str(raw).with_context(|| format!("--target is not valid JSON: {}", raw))
    } else {
        Ok(Value::String(raw.to_string()))
    }
}

pub fn list_config_from_args(args: &ArgMatches) -> ListConfig {
    let list_path = args
        .get_one::<String>("list-path")
        .map(String::as_str)
        .unwrap_or("data.list");
    let mut config = ListConfig::new(list_path);
    config.total_path = args.get_one::<String>("total-path").cloned();
    config
}

pub fn report_format_from_args(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::parse(f))
        .unwrap_or(ReportFormat::Text)
}

/// Infer the mapping from the list capture's recorded response body.
pub fn offline_mapping(
    list: &CapturedRequest,
    detail: &CapturedRequest,
    list_config: &ListConfig,
) -> Result<Mapping> {
    let response = list
        .response_json()
        .context("List capture has no usable response body")?;
    let items = extract_list(&response, list_config)?;
    Ok(FieldMappingAnalyzer::try_analyze(&items, detail)?)
}

pub fn locate_in_document(document: &Value, field: &str, all: bool) -> Vec<SearchResult<Value>> {
    if all {
        locate_all(&document, field)
            .iter()
            .map(|r| r.to_owned_value())
            .collect()
    } else {
        locate(&document, field)
            .map(|r| r.to_owned_value())
            .into_iter()
            .collect()
    }
}

/// Print to stdout, or save to `output` when given.
pub fn write_output(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            let path = expand_path(path);
            save_report(content, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Saved to {}", "✓".green().bold(), path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Drives a progress bar from analysis events.
pub fn progress_sink(bar: ProgressBar) -> EventSink {
    Arc::new(move |event: &AnalysisEvent| match event {
        AnalysisEvent::ListFetched { items, elapsed_ms } => {
            bar.set_length(*items as u64);
            bar.set_message(format!("list fetched in {}ms", elapsed_ms));
        }
        AnalysisEvent::MappingDiscovered { related_fields, .. } => {
            bar.println(format!(
                "{} Mapped fields: {}",
                "→".blue(),
                related_fields.join(", ").bright_white()
            ));
        }
        AnalysisEvent::ItemMatched {
            index, url, path, value, ..
        } => {
            bar.println(format!(
                "{} #{} {} ({} = {})",
                "✓".green().bold(),
                index + 1,
                url,
                path,
                value
            ));
        }
        AnalysisEvent::ItemFailed { index, error, .. } => {
            bar.println(format!("{} #{} {}", "✗".red().bold(), index + 1, error.red()));
        }
        AnalysisEvent::Progress { progress, total } => {
            bar.set_length(*total as u64);
            bar.set_position(*progress as u64);
        }
        AnalysisEvent::RunStopped { .. } => {
            bar.set_message("stopping, waiting for in-flight requests");
        }
        _ => {}
    })
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

pub async fn handle_analyze(args: &ArgMatches) -> Result<()> {
    let list = load_capture_file(required_path(args, "list")?)?;
    let detail = load_capture_file(required_path(args, "detail")?)?;
    let list_config = list_config_from_args(args);

    let search_field = args
        .get_one::<String>("search-field")
        .ok_or_else(|| anyhow!("--search-field is required"))?;
    let target = args
        .get_one::<String>("target")
        .ok_or_else(|| anyhow!("--target is required"))?;
    let target = parse_target_value(target, args.get_flag("target-json"))?;
    let concurrency = *args.get_one::<usize>("concurrency").unwrap_or(&5);
    let timeout = *args.get_one::<u64>("timeout").unwrap_or(&10);

    println!("\n🔎 Analyzing {}", list.url().bright_white());
    println!("Detail: {} {}", detail.method(), detail.url());
    println!("Search: {} == {}", search_field, target);
    println!("Concurrency: {}\n", concurrency);

    let transport = HttpTransport::with_timeout(timeout)?;
    let bar = progress_bar();
    let orchestrator = AnalysisOrchestrator::new(transport).with_event_sink(progress_sink(bar.clone()));
    orchestrator.update_config(
        ConfigUpdate::default()
            .search_field(search_field)
            .target_value(target)
            .max_concurrency(concurrency),
    )?;
    orchestrator.set_list_request(list);
    orchestrator.set_detail_request(detail);
    orchestrator.set_list_config(list_config);

    // Ctrl-C stops the run; in-flight requests are allowed to finish
    let run = orchestrator.start_analysis();
    tokio::pin!(run);
    let mut listening = true;
    let outcome = loop {
        tokio::select! {
            outcome = &mut run => break outcome,
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => {
                    orchestrator.stop_analysis();
                }
                Err(e) => {
                    tracing::warn!("Ctrl-C handler unavailable: {}", e);
                    listening = false;
                }
            },
        }
    };
    bar.finish_and_clear();

    match outcome {
        RunOutcome::Completed(summary) => {
            println!(
                "{} Analysis complete: {} of {} items matched\n",
                "✓".green().bold(),
                summary.matched,
                summary.processed
            );
            let rendered = render_report(&summary, report_format_from_args(args))?;
            write_output(&rendered, args.get_one::<PathBuf>("output"))
        }
        RunOutcome::Stopped { progress, total } => {
            println!(
                "{} Analysis stopped after {}/{} items",
                "⚠".yellow().bold(),
                progress,
                total
            );
            Ok(())
        }
        RunOutcome::Failed(e) => Err(e).context("Analysis failed"),
        RunOutcome::AlreadyRunning => bail!("An analysis is already running"),
    }
}

pub fn handle_mapping(args: &ArgMatches) -> Result<()> {
    let list = load_capture_file(required_path(args, "list")?)?;
    let detail = load_capture_file(required_path(args, "detail")?)?;
    let mapping = offline_mapping(&list, &detail, &list_config_from_args(args))?;

    let rendered = match report_format_from_args(args) {
        ReportFormat::Json => serde_json::to_string_pretty(&mapping)? + "\n",
        ReportFormat::Text => format_mapping(&mapping),
    };
    write_output(&rendered, args.get_one::<PathBuf>("output"))
}

pub fn handle_locate(args: &ArgMatches) -> Result<()> {
    let path = expand_path(required_path(args, "file")?);
    let field = args
        .get_one::<String>("field")
        .ok_or_else(|| anyhow!("--field is required"))?;

    let content =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let results = locate_in_document(&document, field, args.get_flag("all"));

    match report_format_from_args(args) {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        ReportFormat::Text if results.is_empty() => {
            println!("{} '{}' not found", "✗".yellow().bold(), field);
        }
        ReportFormat::Text => {
            for result in &results {
                println!("{} = {}", result.path.to_string().bright_white(), result.value);
            }
        }
    }
    Ok(())
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .ok_or_else(|| anyhow!("--{} is required", name))
}
