//! Block classification for MIFARE Classic 1K memory
//!
//! Partitions the 64-block address space into UID, trailer, and data blocks.
//! These predicates are the single source of truth for write safety: every
//! other module derives block safety from here and nowhere else.

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};

/// Bytes per block
pub const BLOCK_SIZE: usize = 16;

/// Blocks per sector
pub const BLOCKS_PER_SECTOR: usize = 4;

/// Total blocks on a MIFARE Classic 1K card
pub const TOTAL_BLOCKS: usize = 64;

/// Total sectors on a MIFARE Classic 1K card
pub const TOTAL_SECTORS: usize = 16;

/// Card capacity in bytes
pub const MIFARE_1K_SIZE: usize = TOTAL_BLOCKS * BLOCK_SIZE;

/// Expected dump length in hex characters (2 per byte)
pub const DUMP_HEX_LEN: usize = MIFARE_1K_SIZE * 2;

/// Block 0 holds the UID and manufacturer data. Factory-fixed on genuine
/// cards; writing to it can permanently brick the card.
pub fn is_block0(block: usize) -> bool {
    block == 0
}

/// The trailer is the last block of each 4-block sector (blocks 3, 7, 11, ...).
/// It holds the authentication keys and access bits.
pub fn is_trailer_block(block: usize) -> bool {
    (block + 1) % BLOCKS_PER_SECTOR == 0
}

/// A block is safe to write iff it is neither block 0 nor a sector trailer.
pub fn is_safe_block(block: usize) -> bool {
    !is_block0(block) && !is_trailer_block(block)
}

/// Sector index for a block
pub fn sector_of(block: usize) -> usize {
    block / BLOCKS_PER_SECTOR
}

/// Read-only view over one block of a hex dump
///
/// Derived from the dump and the block address; never constructed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    /// Absolute block address (0..64)
    pub block_number: usize,
    /// Sector index (0..16)
    pub sector_number: usize,
    /// True for the UID/manufacturer block
    pub is_block0: bool,
    /// True for sector trailers
    pub is_trailer: bool,
    /// True iff the block may be written
    pub is_safe: bool,
    /// Block contents as 32 hex characters
    pub data: String,
}

/// Extract the [`BlockInfo`] view for one block of a dump
///
/// # Errors
///
/// Returns `InvalidBlockNumber` for addresses outside `[0, 64)` and
/// `SizeMismatch` when the dump is too short to contain the block.
pub fn block_info(hex_data: &str, block: usize) -> Result<BlockInfo> {
    if block >= TOTAL_BLOCKS {
        return Err(GuardError::InvalidBlockNumber(block));
    }

    let start = block * BLOCK_SIZE * 2;
    let end = start + BLOCK_SIZE * 2;
    let data = hex_data
        .get(start..end)
        .ok_or_else(|| GuardError::SizeMismatch {
            expected: MIFARE_1K_SIZE,
            found: hex_data.len() / 2,
        })?
        .to_string();

    Ok(BlockInfo {
        block_number: block,
        sector_number: sector_of(block),
        is_block0: is_block0(block),
        is_trailer: is_trailer_block(block),
        is_safe: is_safe_block(block),
        data,
    })
}

/// Every sector requires authentication before any block access. The engine
/// records the requirement; the transport capability executes it.
pub fn requires_sector_authentication(_block: usize) -> bool {
    true
}

/// The 47 writable block addresses, in ascending order
pub fn safe_block_list() -> Vec<usize> {
    (0..TOTAL_BLOCKS).filter(|&b| is_safe_block(b)).collect()
}

/// Per-block safety map for a dump
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpAnalysis {
    pub total_blocks: usize,
    pub safe_blocks: usize,
    pub unsafe_blocks: usize,
    pub block_map: Vec<BlockSafetyEntry>,
}

/// One row of the [`DumpAnalysis`] block map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSafetyEntry {
    pub block: usize,
    pub safe: bool,
    pub reason: String,
}

/// Build a per-block safety map for a dump
///
/// Tolerates truncated dumps: only the blocks actually present (capped at 64)
/// are analyzed. Use [`crate::validation::validate_dump`] for the strict gate.
pub fn analyze_dump(hex_data: &str) -> DumpAnalysis {
    let total_blocks = (hex_data.len() / (BLOCK_SIZE * 2)).min(TOTAL_BLOCKS);

    let mut safe_blocks = 0;
    let mut unsafe_blocks = 0;
    let mut block_map = Vec::with_capacity(total_blocks);

    for block in 0..total_blocks {
        let safe = is_safe_block(block);
        if safe {
            safe_blocks += 1;
        } else {
            unsafe_blocks += 1;
        }

        let reason = if is_block0(block) {
            "UID / manufacturer (DO NOT WRITE)".to_string()
        } else if !safe {
            "Sector trailer (DO NOT WRITE)".to_string()
        } else {
            "Data (OK)".to_string()
        };

        block_map.push(BlockSafetyEntry { block, safe, reason });
    }

    DumpAnalysis {
        total_blocks,
        safe_blocks,
        unsafe_blocks,
        block_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block0_detection() {
        assert!(is_block0(0));
        assert!(!is_block0(1));
        assert!(!is_block0(63));
    }

    #[test]
    fn test_trailer_detection() {
        assert!(is_trailer_block(3));
        assert!(is_trailer_block(7));
        assert!(is_trailer_block(63));
        assert!(!is_trailer_block(0));
        assert!(!is_trailer_block(4));
        assert!(!is_trailer_block(62));
    }

    #[test]
    fn test_safe_block_predicate() {
        assert!(!is_safe_block(0));
        assert!(!is_safe_block(3));
        assert!(!is_safe_block(7));
        assert!(is_safe_block(1));
        assert!(is_safe_block(62));
    }

    #[test]
    fn test_authentication_required_everywhere() {
        for block in 0..TOTAL_BLOCKS {
            assert!(requires_sector_authentication(block));
        }
    }

    #[test]
    fn test_safe_block_list_counts() {
        let safe = safe_block_list();
        assert_eq!(safe.len(), 47);
        assert!(!safe.contains(&0));
        assert!(safe.windows(2).all(|w| w[0] < w[1]));
        for b in &safe {
            assert!(!is_trailer_block(*b));
        }
    }

    #[test]
    fn test_block_info_extraction() {
        let hex: String = (0..TOTAL_BLOCKS)
            .map(|b| format!("{:02X}", b).repeat(BLOCK_SIZE))
            .collect();

        let info = block_info(&hex, 5).unwrap();
        assert_eq!(info.block_number, 5);
        assert_eq!(info.sector_number, 1);
        assert!(info.is_safe);
        assert_eq!(info.data, "05".repeat(16));

        let trailer = block_info(&hex, 7).unwrap();
        assert!(trailer.is_trailer);
        assert!(!trailer.is_safe);
    }

    #[test]
    fn test_block_info_out_of_range() {
        let hex = "00".repeat(MIFARE_1K_SIZE);
        assert!(matches!(
            block_info(&hex, 64),
            Err(GuardError::InvalidBlockNumber(64))
        ));
    }

    #[test]
    fn test_block_info_truncated_dump() {
        let hex = "00".repeat(32); // only two blocks
        assert!(block_info(&hex, 0).is_ok());
        assert!(matches!(
            block_info(&hex, 2),
            Err(GuardError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_analyze_full_dump() {
        let hex = "AB".repeat(MIFARE_1K_SIZE);
        let analysis = analyze_dump(&hex);
        assert_eq!(analysis.total_blocks, 64);
        assert_eq!(analysis.safe_blocks, 47);
        assert_eq!(analysis.unsafe_blocks, 17);
    }

    #[test]
    fn test_analyze_truncated_dump() {
        // 8 blocks worth of data
        let hex = "AB".repeat(8 * BLOCK_SIZE);
        let analysis = analyze_dump(&hex);
        assert_eq!(analysis.total_blocks, 8);
        // blocks 0, 3, 7 unsafe
        assert_eq!(analysis.unsafe_blocks, 3);
        assert_eq!(analysis.safe_blocks, 5);
    }
}
