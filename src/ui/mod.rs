//! Terminal output for the `find` command.
//!
//! Colored headers, a box per citation, and a spinner while a request runs.

use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::models::Citation;

/// Get the current terminal width.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(100)
}

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Search => println!("{} {}", icon.yellow(), msg),
    }
}

/// Welcome banner for the application.
pub fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");

    println!();
    println!("╔═══════════════════════════════════════════════════════════════════════╗");
    println!(
        "║                     📚 Citation Finder v{:<10}                    ║",
        version
    );
    println!("║                                                                       ║");
    println!("║   Find PubMed Central articles that support a passage of text        ║");
    println!("║                                                                       ║");
    println!("║   Examples:                                                           ║");
    println!("║     citation-finder find \"Vitamin D reduces respiratory infections\"   ║");
    println!("║     citation-finder serve                                             ║");
    println!("║     citation-finder mcp                                               ║");
    println!("╚═══════════════════════════════════════════════════════════════════════╝");
    println!();
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print search results header.
pub fn print_search_header(text: &str, count: usize, duration: Duration) {
    let width = terminal_width().saturating_sub(20).max(20);
    println!();
    println!(
        "{} Citations for: \"{}\"",
        status_icon(Status::Search).yellow().bold(),
        truncate_with_ellipsis(text, width).cyan().bold()
    );
    println!(
        "{} Found {} in {:.2}s",
        "─".repeat(30).dimmed(),
        pluralize(count, "citation").green().bold(),
        duration.as_secs_f64()
    );
}

/// Print one citation in a box.
pub fn print_citation_box(position: usize, citation: &Citation) {
    let inner = terminal_width().clamp(40, 100) - 4;

    println!();
    println!("┌{}┐", "─".repeat(inner + 2));
    box_line(
        &format!("{}. {}", position, citation.title),
        inner,
        |s| s.blue().bold().to_string(),
    );
    println!("├{}┤", "─".repeat(inner + 2));
    for line in wrap_text(&citation.reference_list_citation, inner) {
        box_line(&line, inner, |s| s.to_string());
    }
    box_line(
        &format!("In-text:   {}", citation.in_text_citation),
        inner,
        |s| s.green().to_string(),
    );
    box_line(
        &format!("Published: {}", citation.publication_date),
        inner,
        |s| s.yellow().to_string(),
    );
    if let Some(doi) = &citation.doi {
        box_line(&format!("DOI:       {}", doi), inner, |s| s.to_string());
    }
    box_line(&format!("Link:      {}", citation.pmc_link), inner, |s| {
        s.cyan().to_string()
    });
    println!("├{}┤", "─".repeat(inner + 2));
    for line in wrap_text(&format!("“{}”", citation.supporting_passage), inner) {
        box_line(&line, inner, |s| s.italic().to_string());
    }
    println!("└{}┘", "─".repeat(inner + 2));
}

fn box_line(text: &str, inner: usize, style: impl Fn(&str) -> String) {
    let text = truncate_with_ellipsis(text, inner);
    let padding = inner.saturating_sub(display_width(&text));
    println!("│ {}{} │", style(&text), " ".repeat(padding));
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

fn display_width(text: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(text)
}

/// Greedy word wrap to `max_width` display columns.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            display_width(word)
        } else {
            display_width(&current) + 1 + display_width(word)
        };
        if needed > max_width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Truncate text to fit within the specified width using unicode-aware truncation.
pub fn truncate_with_ellipsis(text: &str, max_width: usize) -> String {
    if max_width <= 3 {
        return "...".to_string();
    }

    if display_width(text) <= max_width {
        return text.to_string();
    }

    let mut current_width = 0;
    let mut truncated = String::new();
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(1);
        if current_width + w > max_width - 3 {
            break;
        }
        current_width += w;
        truncated.push(c);
    }

    format!("{}...", truncated)
}

/// A loading spinner with message.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    /// Create a new spinner with the given message.
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(Self::style("{spinner:.cyan} {msg}", "⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    fn style(template: &str, ticks: &str) -> indicatif::ProgressStyle {
        indicatif::ProgressStyle::with_template(template)
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
            .tick_chars(ticks)
    }

    /// Finish with success message.
    pub fn finish_with_success(&self, msg: &str) {
        self.pb.set_style(Self::style("{spinner:.green} {msg}", "✓✓"));
        self.pb.finish_with_message(msg.to_string());
    }

    /// Finish with error message.
    pub fn finish_with_error(&self, msg: &str) {
        self.pb.set_style(Self::style("{spinner:.red} {msg}", "✗✗"));
        self.pb.finish_with_message(msg.to_string());
    }
}
