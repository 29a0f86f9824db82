//! CSV export of the dashboard and flags views.
//!
//! Each export is a projection of the same rows the JSON response carries,
//! column for column. Numbers use fixed decimals, absent values are empty
//! cells, and fields are quoted per RFC 4180 when needed.

use crate::report::{DashboardResponse, FlagsResponse};

pub const DASHBOARD_HEADER: [&str; 8] = [
    "user_id",
    "user_name",
    "peer_avg_overall",
    "self_avg_overall",
    "reviewers_count",
    "gcf",
    "spr",
    "suggested_grade",
];

pub const FLAGS_HEADER: [&str; 6] = [
    "user_id",
    "user_name",
    "spr",
    "gcf",
    "reviewers_count",
    "flags",
];

/// Quote `field` if it contains a delimiter, quote, CR or LF.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn fixed(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| fixed(v, decimals)).unwrap_or_default()
}

fn push_record(out: &mut String, fields: &[String]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    out.push_str(&line.join(","));
    out.push_str("\r\n");
}

fn header(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

pub fn dashboard_csv(response: &DashboardResponse) -> String {
    let mut out = String::new();
    push_record(&mut out, &header(&DASHBOARD_HEADER));
    for row in &response.items {
        push_record(
            &mut out,
            &[
                row.user_id.to_string(),
                row.user_name.clone(),
                fixed(row.peer_avg_overall, 2),
                optional(row.self_avg_overall, 2),
                row.reviewers_count.to_string(),
                fixed(row.gcf, 2),
                fixed(row.spr, 2),
                optional(row.suggested_grade, 1),
            ],
        );
    }
    out
}

/// Flags are rendered as `code:severity`, joined by `;`.
pub fn flags_csv(response: &FlagsResponse) -> String {
    let mut out = String::new();
    push_record(&mut out, &header(&FLAGS_HEADER));
    for row in &response.items {
        let flags: Vec<String> = row
            .flags
            .iter()
            .map(|f| format!("{}:{}", f.code.code(), f.severity.as_str()))
            .collect();
        push_record(
            &mut out,
            &[
                row.user_id.to_string(),
                row.user_name.clone(),
                fixed(row.spr, 2),
                fixed(row.gcf, 2),
                row.reviewers_count.to_string(),
                flags.join(";"),
            ],
        );
    }
    out
}
