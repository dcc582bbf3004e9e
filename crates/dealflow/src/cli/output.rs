//! Output formatting utilities for CLI commands

use chrono::{DateTime, Local, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use dealflow::export::CSV_HEADERS;
use dealflow::table::TablePage;
use dealflow::{Record, RunState};
use std::time::Duration;

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }

    println!("{}", table);
}

pub fn record_row(record: &Record) -> Vec<String> {
    vec![
        record.name.clone(),
        record.first_interaction.format("%Y-%m-%d").to_string(),
        record.last_interaction.format("%Y-%m-%d").to_string(),
        record.total_interactions.to_string(),
        if record.contact.is_empty() {
            "-".to_string()
        } else {
            record.contact.clone()
        },
        record.analysis_date.format("%Y-%m-%d").to_string(),
    ]
}

/// Render one page of records followed by a position footer.
pub fn print_record_page(page: &TablePage<'_>) {
    if page.rows.is_empty() {
        if page.filtered_count == 0 {
            println!("No records match the current filter.");
        } else {
            println!("Page {} is past the last page.", page.page);
        }
    } else {
        let rows = page.rows.iter().map(|record| record_row(record)).collect();
        print_table(&CSV_HEADERS, rows);
    }
    println!("{}", page_footer(page));
}

pub fn page_footer(page: &TablePage<'_>) -> String {
    let total_pages = page.total_pages.max(1);
    if page.rows.is_empty() {
        return format!(
            "Page {} of {} ({} of {} records)",
            page.page, total_pages, page.filtered_count, page.total_count
        );
    }
    let first = page.first_row_number();
    let last = first + page.rows.len() - 1;
    format!(
        "Page {} of {}, showing {}-{} of {} records ({} total)",
        page.page, total_pages, first, last, page.filtered_count, page.total_count
    )
}

pub fn state_color(state: RunState) -> Color {
    match state {
        RunState::Idle => Color::Grey,
        RunState::Starting | RunState::InProgress => Color::Yellow,
        RunState::Completed => Color::Green,
        RunState::Error => Color::Red,
    }
}

/// Print key/value pairs as a two-column table with a colored value column.
pub fn print_key_values(rows: Vec<(&str, String, Option<Color>)>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    for (key, value, color) in rows {
        let value_cell = match color {
            Some(c) => Cell::new(value).fg(c),
            None => Cell::new(value),
        };
        table.add_row(vec![Cell::new(key).fg(Color::Cyan), value_cell]);
    }
    println!("{}", table);
}

/// "5 minutes ago" style rendering, absolute after a week.
pub fn format_time_ago(time: DateTime<Utc>) -> String {
    match (Utc::now() - time).to_std() {
        Ok(duration) => format_duration_ago(duration, time),
        Err(_) => "just now".to_string(),
    }
}

fn format_duration_ago(duration: Duration, time: DateTime<Utc>) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{} second{} ago", secs, if secs == 1 { "" } else { "s" })
    } else if secs < 3600 {
        let mins = secs / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if secs < 86400 {
        let hours = secs / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if secs < 604800 {
        let days = secs / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
    }
}
