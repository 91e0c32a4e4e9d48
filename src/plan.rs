//! Write planning with defense-in-depth safety gates
//!
//! Two independent guards protect the card:
//!
//! 1. The block partition derived from [`crate::classify`] excludes block 0
//!    and every sector trailer from the writable set.
//! 2. [`validate_write_mode`] rejects any configuration that tries to widen
//!    that set, even though the partition would already have excluded those
//!    addresses.
//!
//! The redundancy is intentional: a corrupted or malicious configuration must
//! not be able to silently reach unsafe blocks.

use crate::classify::{self, BlockInfo, DUMP_HEX_LEN, MIFARE_1K_SIZE, TOTAL_BLOCKS};
use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Write operation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WriteMode {
    /// Simulate only; no hardware access
    Test,
    /// Write to hardware with per-block verification
    Write,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Test => write!(f, "TEST"),
            WriteMode::Write => write!(f, "WRITE"),
        }
    }
}

/// Safety configuration for a write attempt
///
/// The `allow_*` flags exist only to be asserted false: the planner rejects
/// any configuration that sets them. They are not escape hatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteProtectionConfig {
    pub mode: WriteMode,
    /// Must be false; block 0 writes brick the card
    pub allow_block0: bool,
    /// Must be false; trailer writes destroy keys and access bits
    pub allow_trailers: bool,
    /// Must be true; every sector write must be authenticated
    pub require_authentication: bool,
}

/// The only configuration accepted for real writes
pub const SAFE_WRITE_CONFIG: WriteProtectionConfig = WriteProtectionConfig {
    mode: WriteMode::Write,
    allow_block0: false,
    allow_trailers: false,
    require_authentication: true,
};

/// The only configuration accepted for simulations
pub const TEST_MODE_CONFIG: WriteProtectionConfig = WriteProtectionConfig {
    mode: WriteMode::Test,
    allow_block0: false,
    allow_trailers: false,
    require_authentication: true,
};

/// Outcome of the standalone configuration gate
#[derive(Debug, Clone)]
pub struct ModeValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a write configuration independently of any dump
///
/// Each unsafe flag is a blocking error on its own.
pub fn validate_write_mode(config: &WriteProtectionConfig) -> ModeValidation {
    let mut result = ModeValidation {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    if config.allow_block0 {
        result.errors.push(
            GuardError::ConfigurationRejected(
                "writes to block 0 (UID) are enabled - this can permanently brick the card"
                    .to_string(),
            )
            .to_string(),
        );
        result.is_valid = false;
    }

    if config.allow_trailers {
        result.errors.push(
            GuardError::ConfigurationRejected(
                "writes to sector trailers are enabled - this can permanently brick the card"
                    .to_string(),
            )
            .to_string(),
        );
        result.is_valid = false;
    }

    if config.mode == WriteMode::Test {
        result
            .warnings
            .push("TEST mode active - no writes will be performed (simulation only)".to_string());
    }

    if !config.require_authentication {
        result.errors.push(
            GuardError::ConfigurationRejected(
                "sector authentication is disabled - every write must be authenticated"
                    .to_string(),
            )
            .to_string(),
        );
        result.is_valid = false;
    }

    if !result.is_valid {
        warn!(errors = result.errors.len(), "write configuration rejected");
    }

    result
}

/// Per-block safety verdict under a given configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSafety {
    pub is_safe: bool,
    pub reason: Option<&'static str>,
}

/// Check one block against the configuration flags
pub fn is_write_operation_safe(block: usize, config: &WriteProtectionConfig) -> BlockSafety {
    if classify::is_block0(block) && !config.allow_block0 {
        return BlockSafety {
            is_safe: false,
            reason: Some("Block 0 (UID) is write-protected"),
        };
    }

    if classify::is_trailer_block(block) && !config.allow_trailers {
        return BlockSafety {
            is_safe: false,
            reason: Some("Sector trailer is write-protected"),
        };
    }

    BlockSafety {
        is_safe: true,
        reason: None,
    }
}

/// Executable plan for one write attempt
///
/// `safe_blocks` and `unsafe_blocks` partition the 64-block address space with
/// no overlap: 47 writable data blocks, 17 protected (block 0 + 16 trailers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritePlan {
    pub is_valid: bool,
    /// All 64 blocks in ascending address order
    pub blocks: Vec<BlockInfo>,
    pub safe_blocks: Vec<BlockInfo>,
    pub unsafe_blocks: Vec<BlockInfo>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Build a write plan from a dump and a configuration
///
/// Re-checks the dump size even for previously validated dumps and re-validates
/// the configuration even though the partition already excludes every protected
/// address. No stage trusts its predecessor.
pub fn create_write_plan(hex_data: &str, config: &WriteProtectionConfig) -> WritePlan {
    let mut result = WritePlan {
        is_valid: true,
        blocks: Vec::new(),
        safe_blocks: Vec::new(),
        unsafe_blocks: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    if hex_data.len() != DUMP_HEX_LEN {
        result.errors.push(format!(
            "Invalid dump size: {} bytes (expected: {} bytes)",
            hex_data.len() / 2,
            MIFARE_1K_SIZE
        ));
        result.is_valid = false;
        return result;
    }

    // ASCII hex digits only; block extraction and the UID warning slice by
    // byte offset
    if !hex_data.bytes().all(|b| b.is_ascii_hexdigit()) {
        result
            .errors
            .push("Dump contains non-hexadecimal characters".to_string());
        result.is_valid = false;
        return result;
    }

    for block in 0..TOTAL_BLOCKS {
        // Size was checked above, so extraction cannot fail here
        let info = match classify::block_info(hex_data, block) {
            Ok(info) => info,
            Err(e) => {
                result.errors.push(e.to_string());
                result.is_valid = false;
                return result;
            }
        };

        if info.is_safe {
            result.safe_blocks.push(info.clone());
        } else {
            result.unsafe_blocks.push(info.clone());
        }
        result.blocks.push(info);
    }

    let mode_validation = validate_write_mode(config);
    result.errors.extend(mode_validation.errors);
    result.warnings.extend(mode_validation.warnings);
    result.is_valid = result.is_valid && mode_validation.is_valid;

    if let Some(block0) = result.unsafe_blocks.iter().find(|b| b.is_block0) {
        result.warnings.push(format!(
            "Block 0 (UID: {}) will be SKIPPED (brick protection)",
            block0.data[..8].to_uppercase()
        ));
    }

    let trailer_count = result.unsafe_blocks.iter().filter(|b| b.is_trailer).count();
    if trailer_count > 0 {
        result.warnings.push(format!(
            "{} sector trailers will be SKIPPED (key and access bit protection)",
            trailer_count
        ));
    }

    result.warnings.push(format!(
        "{} safe blocks will be written",
        result.safe_blocks.len()
    ));

    debug!(
        valid = result.is_valid,
        safe = result.safe_blocks.len(),
        unsafe_count = result.unsafe_blocks.len(),
        "write plan created"
    );

    result
}
