// Report rendering for completed analysis runs

use crate::mapping::Mapping;
use crate::outcome::{RunSummary, Verdict};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEAVY_RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const LIGHT_RULE: &str =
    "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn render_report(summary: &RunSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_analysis_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

pub fn generate_analysis_report(summary: &RunSummary) -> String {
    let mut report = String::new();

    report.push_str(HEAVY_RULE);
    report.push_str("                        FIELDHOUND ANALYSIS REPORT\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');

    report.push_str(&format!("Run ID:       {}\n", summary.run_id));
    report.push_str(&format!("Started:      {}\n", summary.started_at));
    report.push_str(&format!("Duration:     {:.2}s\n", summary.elapsed_ms as f64 / 1000.0));
    report.push_str(&format!("Items:        {}/{}\n", summary.processed, summary.total));
    report.push('\n');

    report.push_str(HEAVY_RULE);
    report.push_str("FIELD MAPPING\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(&format_mapping(&summary.mapping));
    report.push('\n');

    report.push_str(HEAVY_RULE);
    report.push_str("SUMMARY\n");
    report.push_str(HEAVY_RULE);
    report.push('\n');
    report.push_str(&format!("  [MATCH]     {}\n", summary.matched));
    report.push_str(&format!("  [MISMATCH]  {}\n", summary.mismatched));
    report.push_str(&format!("  [ERROR]     {}\n", summary.failed));
    report.push('\n');

    if summary.matched > 0 {
        report.push_str(HEAVY_RULE);
        report.push_str("MATCHES\n");
        report.push_str(HEAVY_RULE);
        report.push('\n');

        for item in summary.matches() {
            if let Verdict::Match { path, value } = &item.verdict {
                report.push_str(&format!("[{}] {}\n", item.index, item.url.as_deref().unwrap_or("-")));
                report.push_str(&format!("Path:         {}\n", path));
                report.push_str(&format!("Value:        {}\n", format_value(value)));
                report.push_str(&format!("Time:         {}ms\n", item.elapsed_ms));
                report.push_str(LIGHT_RULE);
            }
        }
        report.push('\n');
    }

    if summary.failed > 0 {
        report.push_str(HEAVY_RULE);
        report.push_str("ERRORS\n");
        report.push_str(HEAVY_RULE);
        report.push('\n');

        for item in summary.items.iter().filter(|i| i.is_error()) {
            if let Verdict::Error { message } = &item.verdict {
                report.push_str(&format!("[{}] {}\n", item.index, item.url.as_deref().unwrap_or("-")));
                report.push_str(&format!("Error:        {}\n", message));
            }
        }
        report.push('\n');
    }

    report.push_str(HEAVY_RULE);
    report.push_str("Generated by Fieldhound\n");
    report.push_str(HEAVY_RULE);

    report
}

pub fn generate_json_report(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

/// One line per template key, listing its candidate paths in traversal order.
pub fn format_mapping(mapping: &Mapping) -> String {
    if mapping.is_empty() {
        return "  (no template keys)\n".to_string();
    }

    let mut out = String::new();
    for entry in mapping.entries() {
        if entry.candidates.is_empty() {
            out.push_str(&format!("  {} <- (unmapped)\n", entry.key));
            continue;
        }
        let sources: Vec<String> = entry
            .candidates
            .iter()
            .map(|c| format!("{} = {}", c.path, format_value(&c.value)))
            .collect();
        out.push_str(&format!("  {} <- {}\n", entry.key, sources.join(" | ")));
    }
    out
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::SearchResult;
    use crate::outcome::ItemOutcome;
    use serde_json::json;

    fn sample_summary() -> RunSummary {
        let mut mapping = Mapping::new();
        mapping.insert(
            "userId",
            vec![SearchResult { value: json!("u1"), path: "userId".into() }],
        );
        mapping.insert("page", vec![]);

        let items = vec![
            ItemOutcome {
                index: 1,
                url: Some("http://api.test/detail?userId=u2".to_string()),
                verdict: Verdict::Match {
                    path: "status".into(),
                    value: json!("active"),
                },
                elapsed_ms: 12,
            },
            ItemOutcome::failed(0, None, "HTTP 500".to_string(), 4),
        ];

        RunSummary::new(3, "2026-01-01T00:00:00+00:00".to_string(), 2, items, mapping, 1500)
    }

    #[test]
    fn test_text_report_sections() {
        let report = generate_analysis_report(&sample_summary());

        assert!(report.contains("FIELDHOUND ANALYSIS REPORT"));
        assert!(report.contains("Items:        2/2"));
        assert!(report.contains("Duration:     1.50s"));
        assert!(report.contains("userId <- userId = \"u1\""));
        assert!(report.contains("page <- (unmapped)"));
        assert!(report.contains("[1] http://api.test/detail?userId=u2"));
        assert!(report.contains("Value:        \"active\""));
        assert!(report.contains("Error:        HTTP 500"));
    }

    #[test]
    fn test_text_report_skips_empty_sections() {
        let summary = RunSummary::new(1, "now".to_string(), 0, vec![], Mapping::new(), 0);
        let report = generate_analysis_report(&summary);

        assert!(!report.contains("MATCHES\n"));
        assert!(!report.contains("ERRORS\n"));
        assert!(report.contains("(no template keys)"));
    }

    #[test]
    fn test_json_report_is_parseable() {
        let rendered = render_report(&sample_summary(), ReportFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(parsed["matched"], json!(1));
        assert_eq!(parsed["items"][0]["verdict"]["kind"], json!("error"));
        assert_eq!(parsed["mapping"][0]["key"], json!("userId"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("text"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::parse("html"), None);
    }

    #[test]
    fn test_save_report_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        save_report("hello", &path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }
}
