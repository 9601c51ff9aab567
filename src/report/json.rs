//! JSON report output

use super::Summary;
use crate::status::ResultRow;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    summary: Summary,
    results: &'a [ResultRow],
}

pub fn write<W: Write>(writer: &mut W, rows: &[ResultRow]) -> io::Result<()> {
    let report = JsonReport {
        generated: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_rows(rows),
        results: rows,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)
}
