use console::style;
use serde::Serialize;
use std::fmt::Display;

/// Human or JSON output, selected once at startup.
pub struct OutputWriter {
    json: bool,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn success(&self, message: impl Display) {
        if self.json {
            self.print_status("success", message);
        } else {
            println!("{} {}", style("✓").green().bold(), message);
        }
    }

    pub fn warning(&self, message: impl Display) {
        if self.json {
            let output = serde_json::json!({
                "status": "warning",
                "message": message.to_string(),
            });
            eprintln!("{}", output);
        } else {
            eprintln!("{} {}", style("⚠").yellow().bold(), message);
        }
    }

    pub fn error(&self, message: impl Display) {
        if self.json {
            let output = serde_json::json!({
                "status": "error",
                "message": message.to_string(),
            });
            eprintln!("{}", output);
        } else {
            eprintln!("{} {}", style("✗").red().bold(), message);
        }
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if !self.json {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let output = serde_json::json!({
            "status": "success",
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn print_status(&self, status: &str, message: impl Display) {
        let output = serde_json::json!({
            "status": status,
            "message": message.to_string(),
        });
        println!("{}", output);
    }
}
