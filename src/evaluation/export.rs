// CSV export of evaluation records
use std::io::{self, Write};

use super::EvaluationRecord;

pub const CSV_HEADER: &str = "file,rouge_l,readability_grade,latency_seconds,timestamp";

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write_csv<W: Write>(records: &[EvaluationRecord], mut out: W) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for r in records {
        writeln!(
            out,
            "{},{:.6},{:.2},{:.3},{}",
            escape(&r.file_id),
            r.rouge_l,
            r.readability_grade,
            r.latency_seconds,
            r.timestamp.to_rfc3339(),
        )?;
    }
    out.flush()
}
