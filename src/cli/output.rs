//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the CaseCrafter CLI.

use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the CaseCrafter banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "CaseCrafter".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   CaseCrafter v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print one processing status line
    pub fn progress(&self, attempt: u32, state: &str, percent: u8) {
        let percent = percent.min(100);
        let bar_width = 20;
        let filled = (percent as usize * bar_width) / 100;
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(bar_width - filled));
        if self.colored {
            println!(
                "  {} [{}] {:>3}% {}",
                format!("#{:<3}", attempt).dimmed(),
                bar.cyan(),
                percent,
                state.bright_white()
            );
        } else {
            println!("  #{:<3} [{}] {:>3}% {}", attempt, bar, percent, state);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Prompt for confirmation (returns true if user confirms)
    pub fn confirm(&self, message: &str) -> bool {
        if self.colored {
            print!(
                "  {} {} [y/N]: ",
                "?".bright_yellow().bold(),
                message.bright_white()
            );
        } else {
            print!("  [?] {} [y/N]: ", message);
        }

        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            let input = input.trim().to_lowercase();
            input == "y" || input == "yes"
        } else {
            false
        }
    }

    /// Prompt for a line of input; `None` on EOF or read failure
    pub fn prompt(&self, message: &str) -> Option<String> {
        if self.colored {
            print!("  {} {}: ", "?".bright_yellow().bold(), message.bright_white());
        } else {
            print!("  [?] {}: ", message);
        }
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = format_row(columns);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 16).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 16));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        println!("    {}", format_row(values));
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

fn format_row(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("{:<15}", truncate(v, 15)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut a cell to `width` characters, marking the cut with `…`
fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_new() {
        let output = Output::new();
        assert!(output.colored);
    }

    #[test]
    fn test_output_no_color() {
        let output = Output::no_color();
        assert!(!output.colored);
    }

    #[test]
    fn test_truncate_cells() {
        assert_eq!(truncate("short", 15), "short");
        assert_eq!(truncate("Payments platform rewrite", 15), "Payments platf…");
        assert_eq!(truncate("Überprüfung der Anmeldung", 5), "Über…");
    }

    #[test]
    fn test_row_alignment() {
        let row = format_row(&["1", "Login"]);
        assert_eq!(row, format!("{:<15} {:<15}", "1", "Login"));
    }

    #[test]
    fn test_output_methods_no_panic() {
        // Smoke test - ensure none of the output methods panic
        let output = Output::no_color();

        output.success("test success");
        output.info("test info");
        output.warning("test warning");
        output.error("test error");
        output.progress(1, "processing", 40);
        output.progress(2, "completed", 100);
        output.header("Test Header");
        output.subheader("Test Subheader");
        output.kv("key", "value");
        output.list_item("item");
        output.hint("hint message");
        output.command("some command");
        output.table_header(&["ID", "Name"]);
        output.table_row(&["1", "a very long project name indeed"]);
        output.table_row(&[]);
        output.newline();
    }

    #[test]
    fn test_output_methods_colored_no_panic() {
        let output = Output::new();

        output.banner();
        output.success("test success");
        output.warning("test warning");
        output.progress(3, "processing", 0);
        output.table_header(&["ID"]);
    }
}
