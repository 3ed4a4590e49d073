// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Terminal tables.

use std::sync::Arc;

use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;
use tessel_core::Record;

/// Outcome of `tessel verify`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub operations: usize,
    pub inverse_operations: usize,
    pub digest_before: String,
    pub digest_after: String,
    pub digest_restored: String,
    pub restored: bool,
}

pub fn verify_table(report: &VerifyReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Check", "Value"]);
    table.add_row(vec![
        Cell::new("operations"),
        Cell::new(report.operations),
    ]);
    table.add_row(vec![
        Cell::new("inverse operations"),
        Cell::new(report.inverse_operations),
    ]);
    table.add_row(vec![Cell::new("digest before"), Cell::new(&report.digest_before)]);
    table.add_row(vec![Cell::new("digest after"), Cell::new(&report.digest_after)]);
    table.add_row(vec![
        Cell::new("digest restored"),
        Cell::new(&report.digest_restored),
    ]);
    let verdict = if report.restored {
        Cell::new("restored").fg(Color::Green)
    } else {
        Cell::new("MISMATCH").fg(Color::Red)
    };
    table.add_row(vec![Cell::new("result"), verdict]);
    table
}

pub fn records_table(records: &[Arc<Record>]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["type", "id", "keys", "attributes", "relationships"]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.kind),
            Cell::new(&record.id),
            Cell::new(compact(&record.keys)),
            Cell::new(compact(&record.attributes)),
            Cell::new(compact(&record.relationships)),
        ]);
    }
    table
}

fn compact<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "-".to_owned())
}
