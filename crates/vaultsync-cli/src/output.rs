use vaultsync_core::domain::VaultPath;
use vaultsync_sync::reconciler::SyncReport;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output with status marks
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// One JSON document per message
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// `"1 file"`, `"3 files"`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Prints a pass summary in the selected format
pub fn print_report(fmt: &dyn OutputFormatter, format: OutputFormat, report: &SyncReport) {
    if format.is_json() {
        let paths = |list: &[VaultPath]| list.iter().map(VaultPath::to_string).collect::<Vec<_>>();
        fmt.print_json(&serde_json::json!({
            "downloaded": paths(&report.downloaded),
            "created": paths(&report.created),
            "updated": paths(&report.updated),
            "failures": report.failures,
            "duration_ms": report.duration.as_millis() as u64,
        }));
        return;
    }

    let millis = report.duration.as_millis();
    let duration = if millis >= 1000 {
        format!("{:.1}s", millis as f64 / 1000.0)
    } else {
        format!("{millis}ms")
    };
    fmt.success(&format!("Sync completed in {duration}"));

    if !report.downloaded.is_empty() {
        fmt.info(&format!("Downloaded: {}", plural(report.downloaded.len(), "file")));
    }
    if !report.created.is_empty() {
        fmt.info(&format!("Created:    {}", plural(report.created.len(), "file")));
    }
    if !report.updated.is_empty() {
        fmt.info(&format!("Updated:    {}", plural(report.updated.len(), "file")));
    }

    if !report.is_clean() {
        fmt.error(&format!("{} occurred:", plural(report.failures.len(), "error")));
        for failure in &report.failures {
            fmt.info(&format!("  - {failure}"));
        }
    }
}
