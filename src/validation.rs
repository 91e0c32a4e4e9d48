//! Multi-stage validation for MIFARE Classic 1K dumps
//!
//! Runs independent structural and semantic checks over the hex wire format:
//!
//! 1. Size and character set (blocking, short-circuits on failure)
//! 2. Header / block 0 (blocking)
//! 3. BCC checksum (blocking)
//! 4. Access bits per sector (warning only)
//! 5. Pattern anomalies (warning only)
//!
//! A dump is valid iff the three blocking checks pass. The warning checks are
//! heuristic and never flip validity: real valid cards can trip them.

use crate::classify::{BLOCK_SIZE, MIFARE_1K_SIZE, TOTAL_BLOCKS, TOTAL_SECTORS};
use crate::error::GuardError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Known manufacturer IDs (first UID byte). Informational only.
static MANUFACTURERS: &[(u8, &str)] = &[
    (0x04, "NXP"),
    (0x02, "STMicroelectronics"),
    (0x05, "Infineon"),
    (0x06, "Fujitsu"),
    (0x07, "Texas Instruments"),
    (0x08, "Sony"),
];

/// SAK values commonly seen on MIFARE Classic family cards. Advisory only:
/// an unlisted SAK is a warning, never an error.
static VALID_SAKS: &[u8] = &[0x08, 0x09, 0x18, 0x19, 0x28, 0x88];

/// Summary metadata extracted while validating
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpInfo {
    /// Dump size in bytes
    pub size: usize,
    /// Expected size (1024 for a 1K card)
    pub expected_size: usize,
    /// Manufacturer name resolved from the first UID byte
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Card UID as 8 uppercase hex characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Outcome of the header check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_valid_header: Option<bool>,
    /// Outcome of the access-bits check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_valid_checksum: Option<bool>,
}

/// Aggregate outcome of [`validate_dump`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff size, header, and BCC checks all passed
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: DumpInfo,
}

/// Validate a complete dump
///
/// Checks run in a fixed order; a size failure short-circuits the rest since
/// every later check indexes into the 64-block layout.
pub fn validate_dump(hex_data: &str) -> ValidationResult {
    let mut result = ValidationResult {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        info: DumpInfo {
            size: hex_data.len() / 2,
            expected_size: MIFARE_1K_SIZE,
            ..DumpInfo::default()
        },
    };

    // 1. Size
    if let Err(errors) = validate_size(hex_data) {
        result.errors.extend(errors);
        result.is_valid = false;
        return result;
    }

    // 2. Header (block 0)
    let header = validate_header(hex_data);
    result.info.has_valid_header = Some(header.is_valid);
    result.info.manufacturer = header.manufacturer;
    result.info.uid = header.uid;
    if !header.is_valid {
        result.errors.extend(header.errors);
        result.is_valid = false;
    }
    result.warnings.extend(header.warnings);

    // 3. BCC
    if let Err(error) = validate_bcc(hex_data) {
        result.errors.push(error);
        result.is_valid = false;
    }

    // 4. Access bits (warning only)
    let access_warnings = validate_access_bits(hex_data);
    result.info.has_valid_checksum = Some(access_warnings.is_empty());
    result.warnings.extend(access_warnings);

    // 5. Suspicious patterns (warning only)
    result.warnings.extend(validate_patterns(hex_data));

    debug!(
        valid = result.is_valid,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "dump validated"
    );

    result
}

fn validate_size(hex_data: &str) -> std::result::Result<(), Vec<String>> {
    if hex_data.len() % 2 != 0 {
        return Err(vec![
            "Invalid dump: odd number of hex characters".to_string(),
        ]);
    }

    let size_in_bytes = hex_data.len() / 2;
    if size_in_bytes != MIFARE_1K_SIZE {
        return Err(vec![GuardError::SizeMismatch {
            expected: MIFARE_1K_SIZE,
            found: size_in_bytes,
        }
        .to_string()]);
    }

    // ASCII hex digits only; later checks slice the dump by byte offset
    if !hex_data.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(vec![
            "Dump contains non-hexadecimal characters".to_string(),
        ]);
    }

    Ok(())
}

struct HeaderValidation {
    is_valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
    manufacturer: Option<String>,
    uid: Option<String>,
}

fn validate_header(hex_data: &str) -> HeaderValidation {
    let mut result = HeaderValidation {
        is_valid: true,
        errors: Vec::new(),
        warnings: Vec::new(),
        manufacturer: None,
        uid: None,
    };

    let block0_hex = hex_data[..BLOCK_SIZE * 2].to_uppercase();

    let block0 = match hex::decode(&block0_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            result.is_valid = false;
            result
                .errors
                .push("Block 0 contains non-hexadecimal characters".to_string());
            return result;
        }
    };

    // UID: bytes 0..4, BCC: byte 4, SAK: byte 5, ATQA: bytes 6..8
    result.uid = Some(block0_hex[..8].to_string());

    let manufacturer_id = block0[0];
    result.manufacturer = Some(
        MANUFACTURERS
            .iter()
            .find(|(id, _)| *id == manufacturer_id)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| format!("Unknown (0x{:02X})", manufacturer_id)),
    );

    if block0.iter().all(|&b| b == 0x00) {
        result.is_valid = false;
        result
            .errors
            .push("Block 0 is completely zeroed - dump is empty or invalid".to_string());
        return result;
    }

    if block0.iter().all(|&b| b == 0xFF) {
        result.is_valid = false;
        result
            .errors
            .push("Block 0 is completely 0xFF - dump is corrupted".to_string());
        return result;
    }

    let sak = block0[5];
    if !VALID_SAKS.contains(&sak) {
        result.warnings.push(format!(
            "Unusual SAK: 0x{:02X} (expected one of: 08, 09, 18, 19, 28, 88)",
            sak
        ));
    }

    result
}

fn validate_bcc(hex_data: &str) -> std::result::Result<(), String> {
    let block0 = match hex::decode(&hex_data[..BLOCK_SIZE * 2]) {
        Ok(bytes) => bytes,
        // Already reported by the header check
        Err(_) => return Ok(()),
    };

    let expected_bcc = block0[0] ^ block0[1] ^ block0[2] ^ block0[3];
    let bcc = block0[4];

    if bcc != expected_bcc {
        return Err(GuardError::ChecksumMismatch {
            expected: expected_bcc,
            found: bcc,
        }
        .to_string());
    }

    Ok(())
}

fn validate_access_bits(hex_data: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    for sector in 0..TOTAL_SECTORS {
        let trailer_start = (sector * 4 + 3) * BLOCK_SIZE * 2;
        let trailer_hex = &hex_data[trailer_start..trailer_start + BLOCK_SIZE * 2];

        let trailer = match hex::decode(trailer_hex) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };

        // Simplified complement heuristic over bytes 6 and 8. The full MIFARE
        // access-bit algebra also involves byte 7 and per-block interpretation,
        // so mismatches stay advisory.
        let byte6 = trailer[6];
        let byte8 = trailer[8];
        let expected_byte8 = byte6 ^ 0xFF;

        if byte8 != expected_byte8 {
            warnings.push(format!(
                "Sector {}: access bits may be corrupted (byte 8: 0x{:02X}, expected: 0x{:02X})",
                sector, byte8, expected_byte8
            ));
        }
    }

    warnings
}

fn validate_patterns(hex_data: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut zero_blocks = 0;
    let mut ff_blocks = 0;

    for block in 0..TOTAL_BLOCKS {
        let start = block * BLOCK_SIZE * 2;
        let block_hex = &hex_data[start..start + BLOCK_SIZE * 2];

        if block_hex.chars().all(|c| c == '0') {
            zero_blocks += 1;
        }
        if block_hex
            .chars()
            .all(|c| c == 'F' || c == 'f')
        {
            ff_blocks += 1;
        }
    }

    if zero_blocks * 2 > TOTAL_BLOCKS {
        warnings.push(format!(
            "Too many zeroed blocks ({}/{}) - dump may be empty or corrupted",
            zero_blocks, TOTAL_BLOCKS
        ));
    }

    if ff_blocks * 10 > TOTAL_BLOCKS * 3 {
        warnings.push(format!(
            "Too many 0xFF blocks ({}/{}) - dump may be corrupted",
            ff_blocks, TOTAL_BLOCKS
        ));
    }

    warnings
}

/// Whether a dump may be admitted into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecision {
    pub can_import: bool,
    pub reason: Option<String>,
}

/// Decide whether a validated dump can be imported
///
/// Size, BCC, and zeroed/0xFF header failures are hard blockers. Other errors
/// allow import with a caution note.
pub fn can_import(result: &ValidationResult) -> ImportDecision {
    if result.is_valid {
        return ImportDecision {
            can_import: true,
            reason: None,
        };
    }

    let critical = result.errors.iter().find(|e| {
        e.contains("Incorrect size")
            || e.contains("Invalid BCC")
            || e.contains("completely zeroed")
            || e.contains("completely 0xFF")
    });

    if let Some(error) = critical {
        return ImportDecision {
            can_import: false,
            reason: Some(error.clone()),
        };
    }

    ImportDecision {
        can_import: true,
        reason: Some("Dump has issues but can be imported (use with caution)".to_string()),
    }
}

/// Display status derived from a validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpStatus {
    Valid,
    Warning,
    Error,
}

/// Condensed view of a validation result for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpSummary {
    pub manufacturer: String,
    pub uid: String,
    pub size: String,
    pub status: DumpStatus,
}

/// Condense a validation result into display fields
pub fn dump_summary(result: &ValidationResult) -> DumpSummary {
    let status = if !result.is_valid {
        DumpStatus::Error
    } else if !result.warnings.is_empty() {
        DumpStatus::Warning
    } else {
        DumpStatus::Valid
    };

    DumpSummary {
        manufacturer: result
            .info
            .manufacturer
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        uid: result.info.uid.clone().unwrap_or_else(|| "N/A".to_string()),
        size: format!("{} bytes", result.info.size),
        status,
    }
}

/// Coarse size compatibility with the 1K layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpCompatibility {
    pub ok: bool,
    pub reason: Option<String>,
    pub total_blocks: usize,
}

/// Check whether a dump's block count fits a MIFARE Classic 1K card
pub fn check_compatibility(hex_data: &str) -> DumpCompatibility {
    let total_bytes = hex_data.len() / 2;
    let total_blocks = total_bytes / BLOCK_SIZE;

    if total_blocks > TOTAL_BLOCKS {
        return DumpCompatibility {
            ok: false,
            reason: Some("Dump larger than MIFARE Classic 1K".to_string()),
            total_blocks,
        };
    }

    if total_blocks < 4 {
        return DumpCompatibility {
            ok: false,
            reason: Some("Dump too small / invalid".to_string()),
            total_blocks,
        };
    }

    DumpCompatibility {
        ok: true,
        reason: None,
        total_blocks,
    }
}

/// Render a validation result for display
///
/// Deterministic: equal inputs produce identical output.
pub fn format_validation_result(result: &ValidationResult) -> String {
    let mut output = String::new();

    if result.is_valid {
        output.push_str("Dump valid!\n\n");
    } else {
        output.push_str("Dump invalid!\n\n");
    }

    output.push_str("Information:\n");
    output.push_str(&format!("  - Size: {} bytes\n", result.info.size));
    if let Some(manufacturer) = &result.info.manufacturer {
        output.push_str(&format!("  - Manufacturer: {}\n", manufacturer));
    }
    if let Some(uid) = &result.info.uid {
        output.push_str(&format!("  - UID: {}\n", uid));
    }
    output.push('\n');

    if !result.errors.is_empty() {
        output.push_str("Errors:\n");
        for error in &result.errors {
            output.push_str(&format!("  - {}\n", error));
        }
        output.push('\n');
    }

    if !result.warnings.is_empty() {
        output.push_str("Warnings:\n");
        for warning in &result.warnings {
            output.push_str(&format!("  - {}\n", warning));
        }
        output.push('\n');
    }

    output.trim_end().to_string()
}
