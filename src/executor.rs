//! Write execution against a tag transport
//!
//! Drives TEST (simulate) or WRITE (execute + verify) runs over a
//! [`WritePlan`]. The transport session is held by an RAII guard so it is
//! released on every exit path, including early returns and panics mid-loop.
//! Per-block failures never abort the batch: every remaining safe block is
//! still attempted and the failure is recorded in the result.

use crate::classify::TOTAL_BLOCKS;
use crate::error::{GuardError, Result};
use crate::plan::{self, WriteMode, WritePlan, SAFE_WRITE_CONFIG, TEST_MODE_CONFIG};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// MIFARE Classic write command
pub const CMD_WRITE: u8 = 0xA0;

/// MIFARE Classic read command
pub const CMD_READ: u8 = 0x30;

/// External tag-transport capability
///
/// Implemented by the hardware layer, never by this crate. The executor only
/// composes command frames; technology discovery and key authentication happen
/// behind this trait.
pub trait TagTransport {
    /// Acquire an exclusive session with the tag
    fn acquire_session(&mut self) -> Result<()>;

    /// Exchange one command frame with the tag
    fn transceive(&mut self, payload: &[u8]) -> Result<Vec<u8>>;

    /// Release the session. Must be safe to call after a failed acquire.
    fn release_session(&mut self);
}

/// One attempted block write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOperation {
    pub block: usize,
    /// Block contents as 32 hex characters
    pub data: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of one TEST or WRITE run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResult {
    pub success: bool,
    pub mode: WriteMode,
    pub total_blocks: usize,
    pub safe_blocks: usize,
    pub written_blocks: usize,
    pub skipped_blocks: usize,
    pub failed_blocks: usize,
    pub operations: Vec<WriteOperation>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Releases the transport session when dropped
struct SessionGuard<'a, T: TagTransport + ?Sized> {
    transport: &'a mut T,
}

impl<'a, T: TagTransport + ?Sized> SessionGuard<'a, T> {
    fn open(transport: &'a mut T) -> Result<Self> {
        transport.acquire_session()?;
        Ok(SessionGuard { transport })
    }

    fn transceive(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.transport.transceive(payload)
    }
}

impl<T: TagTransport + ?Sized> Drop for SessionGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.release_session();
    }
}

/// Clears the executor's busy flag when dropped
struct BusyReset<'a>(&'a Mutex<bool>);

impl Drop for BusyReset<'_> {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

/// Drives TEST and WRITE runs
///
/// One executor instance refuses to start a second WRITE while one is in
/// progress. Simulations are pure and may run concurrently.
#[derive(Default)]
pub struct WriteExecutor {
    busy: Mutex<bool>,
}

impl WriteExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a write (TEST mode)
    ///
    /// Builds the plan and records a verified no-op operation per safe block.
    /// Never touches the transport; deterministic for a given dump.
    pub fn simulate(&self, hex_data: &str) -> WriteResult {
        info!("simulating write (TEST mode)");
        let plan = plan::create_write_plan(hex_data, &TEST_MODE_CONFIG);

        if !plan.is_valid {
            return Self::aborted(WriteMode::Test, plan);
        }

        let operations: Vec<WriteOperation> = plan
            .safe_blocks
            .iter()
            .map(|block| WriteOperation {
                block: block.block_number,
                data: block.data.clone(),
                verified: true,
                error: None,
            })
            .collect();

        let mut warnings =
            vec!["TEST mode active - no real writes were performed".to_string()];
        warnings.extend(plan.warnings);

        WriteResult {
            success: true,
            mode: WriteMode::Test,
            total_blocks: TOTAL_BLOCKS,
            safe_blocks: plan.safe_blocks.len(),
            written_blocks: 0,
            skipped_blocks: plan.unsafe_blocks.len(),
            failed_blocks: 0,
            operations,
            errors: plan.errors,
            warnings,
        }
    }

    /// Write a dump to hardware (WRITE mode) with per-block verification
    ///
    /// Plans against [`SAFE_WRITE_CONFIG`]; an invalid plan aborts before any
    /// hardware access. Safe blocks are written in ascending address order and
    /// each write is read back and compared. A failed block does not stop the
    /// loop; `success` is true only when every block verified.
    pub fn execute<T: TagTransport + ?Sized>(
        &self,
        hex_data: &str,
        transport: &mut T,
    ) -> WriteResult {
        {
            let mut busy = self.busy.lock();
            if *busy {
                warn!("refusing concurrent write attempt");
                return WriteResult {
                    success: false,
                    mode: WriteMode::Write,
                    total_blocks: TOTAL_BLOCKS,
                    safe_blocks: 0,
                    written_blocks: 0,
                    skipped_blocks: 0,
                    failed_blocks: 0,
                    operations: Vec::new(),
                    errors: vec![GuardError::SessionUnavailable(
                        "another write is already in progress on this executor".to_string(),
                    )
                    .to_string()],
                    warnings: Vec::new(),
                };
            }
            *busy = true;
        }
        let _reset = BusyReset(&self.busy);

        info!("starting write (WRITE mode)");
        let plan = plan::create_write_plan(hex_data, &SAFE_WRITE_CONFIG);

        if !plan.is_valid {
            warn!(errors = plan.errors.len(), "write aborted: invalid plan");
            return Self::aborted(WriteMode::Write, plan);
        }

        let mut session = match SessionGuard::open(transport) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "write aborted: session unavailable");
                let mut result = Self::aborted(WriteMode::Write, plan);
                result.errors.push(e.to_string());
                return result;
            }
        };

        let mut operations = Vec::with_capacity(plan.safe_blocks.len());
        let mut failed_blocks = 0;

        for block in &plan.safe_blocks {
            let operation = Self::write_and_verify(&mut session, block.block_number, &block.data);
            if !operation.verified {
                failed_blocks += 1;
                warn!(
                    block = operation.block,
                    error = operation.error.as_deref().unwrap_or("unknown"),
                    "block write failed"
                );
            } else {
                debug!(block = operation.block, "block written and verified");
            }
            operations.push(operation);
        }

        drop(session);

        let written_blocks = operations.iter().filter(|op| op.verified).count();
        let success = failed_blocks == 0;

        info!(
            success,
            written = written_blocks,
            failed = failed_blocks,
            "write finished"
        );

        WriteResult {
            success,
            mode: WriteMode::Write,
            total_blocks: TOTAL_BLOCKS,
            safe_blocks: plan.safe_blocks.len(),
            written_blocks,
            skipped_blocks: plan.unsafe_blocks.len(),
            failed_blocks,
            operations,
            errors: plan.errors,
            warnings: plan.warnings,
        }
    }

    /// Transmit one block and verify it by reading it back
    ///
    /// Any transport fault is converted into a failed operation; nothing
    /// propagates out of the write loop.
    fn write_and_verify<T: TagTransport + ?Sized>(
        session: &mut SessionGuard<'_, T>,
        block: usize,
        data_hex: &str,
    ) -> WriteOperation {
        let failed = |error: String| WriteOperation {
            block,
            data: data_hex.to_string(),
            verified: false,
            error: Some(error),
        };

        let bytes = match hex::decode(data_hex) {
            Ok(bytes) => bytes,
            Err(_) => return failed("block data is not valid hex".to_string()),
        };

        let mut frame = Vec::with_capacity(2 + bytes.len());
        frame.push(CMD_WRITE);
        frame.push(block as u8);
        frame.extend_from_slice(&bytes);

        if let Err(e) = session.transceive(&frame) {
            return failed(format!("write failed: {}", e));
        }

        let readback = match session.transceive(&[CMD_READ, block as u8]) {
            Ok(response) => response,
            Err(e) => return failed(format!("read-back failed: {}", e)),
        };

        if readback.len() < bytes.len() || readback[..bytes.len()] != bytes[..] {
            return failed(
                GuardError::BlockVerificationFailed {
                    block,
                    reason: "read-back does not match written data".to_string(),
                }
                .to_string(),
            );
        }

        WriteOperation {
            block,
            data: data_hex.to_string(),
            verified: true,
            error: None,
        }
    }

    /// Build a failed result from a plan that never reached hardware
    fn aborted(mode: WriteMode, plan: WritePlan) -> WriteResult {
        WriteResult {
            success: false,
            mode,
            total_blocks: TOTAL_BLOCKS,
            safe_blocks: plan.safe_blocks.len(),
            written_blocks: 0,
            skipped_blocks: plan.unsafe_blocks.len(),
            failed_blocks: 0,
            operations: Vec::new(),
            errors: plan.errors,
            warnings: plan.warnings,
        }
    }
}
