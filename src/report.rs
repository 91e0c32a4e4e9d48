//! Audit report generation
//!
//! Pure formatting over a [`WriteResult`]: a human-readable report and an
//! auditable CSV. Output is byte-stable for equal inputs so reports can be
//! diffed across runs.

use crate::classify::{is_block0, is_trailer_block, sector_of};
use crate::executor::{WriteOperation, WriteResult};
use crate::plan::WriteMode;

/// Operations shown in full before the report truncates to a count
const REPORT_OPERATION_LIMIT: usize = 10;

/// Render a human-readable write report
pub fn generate_write_report(result: &WriteResult) -> String {
    let mut report = String::new();

    report.push_str("=== NFC WRITE REPORT ===\n\n");
    report.push_str(&format!(
        "Mode: {}\n",
        match result.mode {
            WriteMode::Test => "TEST (simulation)",
            WriteMode::Write => "WRITE (hardware)",
        }
    ));
    report.push_str(&format!(
        "Status: {}\n",
        if result.success { "success" } else { "failure" }
    ));
    report.push('\n');

    report.push_str("Statistics:\n");
    report.push_str(&format!("  Total blocks: {}\n", result.total_blocks));
    report.push_str(&format!("  Blocks written: {}\n", result.written_blocks));
    report.push_str(&format!("  Blocks skipped: {}\n", result.skipped_blocks));
    report.push_str(&format!("  Blocks failed: {}\n", result.failed_blocks));
    report.push('\n');

    if !result.errors.is_empty() {
        report.push_str("Errors:\n");
        for error in &result.errors {
            report.push_str(&format!("  {}\n", error));
        }
        report.push('\n');
    }

    if !result.warnings.is_empty() {
        report.push_str("Warnings:\n");
        for warning in &result.warnings {
            report.push_str(&format!("  {}\n", warning));
        }
        report.push('\n');
    }

    if !result.operations.is_empty() {
        report.push_str("Operations:\n");
        for op in result.operations.iter().take(REPORT_OPERATION_LIMIT) {
            let status = if op.verified { '✓' } else { '✗' };
            report.push_str(&format!(
                "  [{}] Block {:02} (sector {}): {}...\n",
                status,
                op.block,
                sector_of(op.block),
                &op.data[..op.data.len().min(16)]
            ));
        }

        if result.operations.len() > REPORT_OPERATION_LIMIT {
            report.push_str(&format!(
                "  ... and {} more operations\n",
                result.operations.len() - REPORT_OPERATION_LIMIT
            ));
        }
        report.push('\n');
    }

    report.push_str("=== END OF REPORT ===\n");

    report
}

fn operation_type(block: usize) -> &'static str {
    if is_block0(block) {
        "UID"
    } else if is_trailer_block(block) {
        "Trailer"
    } else {
        "Data"
    }
}

fn operation_status(op: &WriteOperation) -> &'static str {
    if op.verified {
        "Verified"
    } else if op.error.is_some() {
        "Failed"
    } else {
        "Written"
    }
}

/// Render an auditable CSV, one row per operation in ascending block order
pub fn generate_write_csv(result: &WriteResult) -> String {
    let mut rows: Vec<&WriteOperation> = result.operations.iter().collect();
    rows.sort_by_key(|op| op.block);

    let mut csv = String::from("Block,Sector,Type,Status,Data\n");
    for op in rows {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            op.block,
            sector_of(op.block),
            operation_type(op.block),
            operation_status(op),
            op.data
        ));
    }

    csv
}
