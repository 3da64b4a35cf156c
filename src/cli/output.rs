/// Standard output utilities for consistent command formatting
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};
use culicidae_catalog::Page;
use serde::Serialize;

/// Display a section header
pub fn section_header(title: &str) {
    println!("\n{}", title.bold().cyan());
}

/// Display a success message
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Display a warning message
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Display an empty/none indicator
pub fn empty(message: &str) {
    println!("{} {}", "◌".dimmed(), message);
}

/// Tree structure item
pub fn tree_item(is_last: bool, label: &str, value: Option<&str>) {
    let prefix = if is_last { "└─" } else { "├─" };
    if let Some(val) = value {
        println!("{} {}: {}", prefix.dimmed(), label, val);
    } else {
        println!("{} {}", prefix.dimmed(), label);
    }
}

/// Print `items` as tree rows under the current header
pub fn tree(items: &[(&str, String)]) {
    for (i, (label, value)) in items.iter().enumerate() {
        tree_item(i == items.len() - 1, label, Some(value));
    }
}

/// Create a standard table with our preferred styling
pub fn create_standard_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a standard header cell
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .add_attribute(Attribute::Bold)
        .fg(TableColor::Cyan)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One-line pagination summary under a table
pub fn page_footer<T>(page: &Page<T>) {
    let shown = page.results.len();
    let mut line = format!("{} of {} shown", shown, page.count);
    if let Some(next) = page.next {
        line.push_str(&format!(", next page: --offset {}", next.offset));
    }
    println!("{}", line.dimmed());
}

pub fn yes_no(flag: bool) -> String {
    if flag {
        "yes".green().to_string()
    } else {
        "no".dimmed().to_string()
    }
}
