/// Console output formatting for the agent logger
///
/// Produces aligned, colorized log lines:
///   HH:MM:SS [TAG     ] [ACTION            ] message

use chrono::Local;
use colored::*;

use super::tags::LogTag;

/// Column widths for alignment
const TAG_WIDTH: usize = 9;
const ACTION_WIDTH: usize = 22;

/// Format and print one log line
pub fn write_line(tag: LogTag, action: &str, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();

    let tag_column = format!("{:<width$}", tag.as_str(), width = TAG_WIDTH);
    let action_column = format!("{:<width$}", action, width = ACTION_WIDTH);

    let line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        colorize_tag(tag, &tag_column),
        colorize_action(action, &action_column),
        message
    );

    // stdout may be a closed pipe when output is piped to head etc.
    // Ignore write failures instead of panicking mid-execution.
    use std::io::Write;
    let _ = writeln!(std::io::stdout(), "{}", line);
}

fn colorize_tag(tag: LogTag, text: &str) -> ColoredString {
    match tag {
        LogTag::Coordinator => text.bright_cyan().bold(),
        LogTag::Lookup => text.bright_blue().bold(),
        LogTag::Analysis => text.bright_magenta().bold(),
        LogTag::Builder => text.bright_green().bold(),
        LogTag::Transaction => text.bright_yellow().bold(),
        LogTag::Cache => text.cyan(),
        LogTag::Api => text.blue(),
        LogTag::Worker => text.green(),
        LogTag::System => text.bright_white().bold(),
    }
}

fn colorize_action(action: &str, text: &str) -> ColoredString {
    let upper = action.to_uppercase();
    if upper.contains("ERROR") || upper.contains("FAIL") {
        text.bright_red().bold()
    } else if upper.contains("WARN") || upper.contains("RETRY") || upper.contains("TIMEOUT") {
        text.yellow()
    } else if upper.contains("SUCCESS") || upper.contains("CONFIRMED") || upper.contains("DONE") {
        text.bright_green()
    } else {
        text.normal()
    }
}
