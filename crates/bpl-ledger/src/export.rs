//! Serialize filtered record sets to JSON or CSV.
//!
//! Exports apply the same [`QueryFilter`] predicates as the query engine.
//! Small ledgers materialize through [`QueryEngine::find`]; past the
//! configured threshold the formatter reads the ledger in batches and keeps
//! only matching records, so resident memory tracks the matched set rather
//! than the whole ledger. Output ordering follows the filter's sort on
//! either path.

use bpl_types::{format_canonical, BitemporalRecord, QueryFilter};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::query::{sort_records, QueryEngine};
use crate::traits::LedgerReader;

/// Output encodings supported by the formatter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// An array of record objects, fields in canonical order.
    Json,
    /// Header row plus one row per record, RFC 4180 quoting.
    Csv,
}

/// Fixed CSV column order. JSON objects carry the same fields in the same
/// order.
pub const EXPORT_COLUMNS: [&str; 16] = [
    "record_id",
    "sequence_number",
    "entity_id",
    "entity_type",
    "event_type",
    "field_name",
    "old_value",
    "new_value",
    "transaction_time",
    "valid_time",
    "user_id",
    "reason",
    "source_system",
    "correlation_id",
    "hash",
    "previous_hash",
];

pub struct ExportFormatter {
    engine: QueryEngine,
    stream_threshold: usize,
    batch_size: usize,
}

impl ExportFormatter {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            engine: QueryEngine::new(config),
            stream_threshold: config.export_stream_threshold,
            batch_size: config.export_batch_size,
        }
    }

    /// Export every record matching `filter` in the requested format,
    /// ordered by the filter's `sort_by`/`sort_order`.
    ///
    /// Filters carrying an explicit `limit`/`offset` are already bounded
    /// and always take the materialized path; unbounded exports of a large
    /// ledger read in batches instead.
    pub fn export<R: LedgerReader>(
        &self,
        reader: &R,
        filter: &QueryFilter,
        format: ExportFormat,
    ) -> Result<String, LedgerError> {
        filter
            .validate()
            .map_err(|e| LedgerError::Query(e.to_string()))?;

        let total = reader.record_count()? as usize;
        let bounded = filter.limit.is_some() || filter.offset.is_some();
        if bounded || total <= self.stream_threshold {
            let records = self.engine.find(reader, filter)?;
            render(format, records.iter())
        } else {
            self.stream(reader, filter, format)
        }
    }

    fn stream<R: LedgerReader>(
        &self,
        reader: &R,
        filter: &QueryFilter,
        format: ExportFormat,
    ) -> Result<String, LedgerError> {
        let total = reader.record_count()? as i64;
        let mut matched = Vec::new();

        let mut from = 1i64;
        while from <= total {
            let to = (from + self.batch_size as i64 - 1).min(total);
            for record in reader.read_range(from, to)? {
                if filter.matches(&record) {
                    matched.push(record);
                }
            }
            from = to + 1;
        }

        // Batches arrive in sequence order; the output contract is the
        // filter's sort, same as the materialized path.
        sort_records(&mut matched, filter.sort_by, filter.sort_order);
        render(format, matched.iter())
    }
}

fn render<'a>(
    format: ExportFormat,
    records: impl Iterator<Item = &'a BitemporalRecord>,
) -> Result<String, LedgerError> {
    match format {
        ExportFormat::Json => {
            let mut out = String::from("[");
            for (i, record) in records.enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&json_row(record)?);
            }
            out.push(']');
            Ok(out)
        }
        ExportFormat::Csv => {
            let mut out = String::new();
            out.push_str(&EXPORT_COLUMNS.join(","));
            out.push('\n');
            for record in records {
                out.push_str(&csv_row(record)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn json_row(record: &BitemporalRecord) -> Result<String, LedgerError> {
    serde_json::to_string(record).map_err(|e| LedgerError::Serialization(e.to_string()))
}

fn csv_row(record: &BitemporalRecord) -> Result<String, LedgerError> {
    let old_value = serde_json::to_string(&record.old_value)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let new_value = serde_json::to_string(&record.new_value)
        .map_err(|e| LedgerError::Serialization(e.to_string()))?;

    let sequence = record.sequence_number.to_string();
    let transaction_time = format_canonical(&record.transaction_time);
    let valid_time = format_canonical(&record.valid_time);

    let cells: [&str; 16] = [
        record.record_id.as_str(),
        sequence.as_str(),
        record.entity_id.as_str(),
        record.entity_type.as_str(),
        record.event_type.as_str(),
        record.field_name.as_str(),
        old_value.as_str(),
        new_value.as_str(),
        transaction_time.as_str(),
        valid_time.as_str(),
        record.user_id.as_str(),
        record.reason.as_deref().unwrap_or(""),
        record.source_system.as_deref().unwrap_or(""),
        record.correlation_id.as_deref().unwrap_or(""),
        record.hash.as_str(),
        record.previous_hash.as_str(),
    ];

    Ok(cells.map(csv_escape).join(","))
}

/// RFC 4180 quoting: wrap when the cell holds a comma, quote, or newline;
/// embedded quotes double.
fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
