//! # MIFARE Guard - Dump Safety Engine
//!
//! `mifare-guard` validates MIFARE Classic 1K dumps and writes them back to a
//! physical tag without ever touching the regions that can brick the card:
//!
//! - **Block classification**: block 0 (UID) and the 16 sector trailers are
//!   permanently excluded from the writable set
//! - **Multi-stage validation**: size, header, BCC checksum, access bits, and
//!   pattern anomaly checks over the hex wire format
//! - **Defense-in-depth planning**: the block partition and an independent
//!   configuration gate both have to agree before anything is written
//! - **Simulate before write**: TEST mode produces the full operation list
//!   without any hardware access
//! - **Auditable results**: deterministic reports and CSV output
//!
//! ## Quick Start
//!
//! ```rust
//! use mifare_guard::{simulate, validate};
//!
//! // A captured dump: 2048 hex characters (64 blocks x 16 bytes)
//! let dump: String = (0..64)
//!     .map(|b| format!("{:02X}", b).repeat(16))
//!     .collect();
//!
//! // Inspect it
//! let validation = validate(&dump);
//! assert_eq!(validation.info.size, 1024);
//!
//! // Dry-run the write: nothing is transmitted
//! let result = simulate(&dump);
//! assert_eq!(result.written_blocks, 0);
//! assert_eq!(result.safe_blocks, 47);
//! ```
//!
//! ## Writing to hardware
//!
//! Real writes go through a [`TagTransport`] implementation supplied by the
//! hardware layer:
//!
//! ```rust,no_run
//! use mifare_guard::{write, TagTransport};
//!
//! fn flash<T: TagTransport>(dump: &str, transport: &mut T) {
//!     let result = write(dump, transport);
//!     println!("{}", mifare_guard::report::generate_write_report(&result));
//! }
//! ```

pub mod classify;
pub mod error;
pub mod executor;
pub mod plan;
pub mod report;
pub mod store;
pub mod validation;

pub use crate::classify::{BlockInfo, DumpAnalysis, MIFARE_1K_SIZE, TOTAL_BLOCKS};
pub use crate::error::{GuardError, Result};
pub use crate::executor::{TagTransport, WriteExecutor, WriteOperation, WriteResult};
pub use crate::plan::{
    WriteMode, WritePlan, WriteProtectionConfig, SAFE_WRITE_CONFIG, TEST_MODE_CONFIG,
};
pub use crate::store::{DumpRecord, DumpStore, WriteStatus};
pub use crate::validation::{DumpInfo, DumpSummary, ValidationResult};

use tracing::info;

/// Validate a dump against the MIFARE Classic 1K layout
///
/// Runs the full check pipeline; see [`validation::validate_dump`].
pub fn validate(hex_data: &str) -> ValidationResult {
    info!(size = hex_data.len() / 2, "validating dump");
    validation::validate_dump(hex_data)
}

/// Simulate a write without any hardware access
///
/// Equivalent to [`WriteExecutor::simulate`] on a fresh executor.
pub fn simulate(hex_data: &str) -> WriteResult {
    WriteExecutor::new().simulate(hex_data)
}

/// Write a dump to a tag through the given transport
///
/// Plans with [`SAFE_WRITE_CONFIG`], verifies every block, and never aborts
/// the batch on a single failure. Callers that need the concurrent-write
/// guard should hold a shared [`WriteExecutor`] instead.
pub fn write<T: TagTransport + ?Sized>(hex_data: &str, transport: &mut T) -> WriteResult {
    WriteExecutor::new().execute(hex_data, transport)
}
