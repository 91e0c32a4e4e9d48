//! Scenario-level validation tests over the public API

use mifare_guard::classify::{BLOCK_SIZE, MIFARE_1K_SIZE, TOTAL_BLOCKS};
use mifare_guard::validation::{can_import, check_compatibility};
use mifare_guard::{simulate, validate};

/// Well-formed 1K dump with matching BCC and complement-consistent access bits
fn good_dump() -> String {
    let mut dump = String::new();
    for block in 0..TOTAL_BLOCKS {
        if block == 0 {
            // UID 04 A1 B2 C3, BCC = 04^A1^B2^C3 = D4, SAK 08, ATQA 04 00
            dump.push_str("04A1B2C3D40804001122334455667788");
        } else if (block + 1) % 4 == 0 {
            dump.push_str("FFFFFFFFFFFF78778769FFFFFFFFFFFF");
        } else {
            dump.push_str(&format!("{:02X}", block).repeat(BLOCK_SIZE));
        }
    }
    dump
}

#[test]
fn clean_dump_validates_without_errors() {
    let result = validate(&good_dump());
    assert!(result.is_valid, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert_eq!(result.info.manufacturer.as_deref(), Some("NXP"));
    assert_eq!(result.info.uid.as_deref(), Some("04A1B2C3"));
}

#[test]
fn zeroed_dump_passes_size_but_fails_header() {
    let result = validate(&"00".repeat(MIFARE_1K_SIZE));
    assert!(!result.is_valid);
    // Size check passed, so block 0 metadata exists
    assert!(result.info.uid.is_some());
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("completely zeroed")));
}

#[test]
fn oversized_dump_fails_size_and_extracts_nothing() {
    let result = validate(&"00".repeat(MIFARE_1K_SIZE + 1));
    assert!(!result.is_valid);
    assert!(result.info.manufacturer.is_none());
    assert!(result.info.uid.is_none());
}

#[test]
fn every_single_bit_flip_of_bcc_is_rejected() {
    for bit in 0..8u8 {
        let mut dump = good_dump();
        let flipped = 0xD4u8 ^ (1 << bit);
        dump.replace_range(8..10, &format!("{:02X}", flipped));

        let result = validate(&dump);
        assert!(!result.is_valid, "bit {} flip was accepted", bit);
        assert!(result.errors.iter().any(|e| e.contains("Invalid BCC")));
    }
}

#[test]
fn access_bit_warnings_do_not_invalidate() {
    let mut dump = good_dump();
    // Break the complement on sector 3's trailer (block 15, byte 8)
    let pos = (15 * BLOCK_SIZE + 8) * 2;
    dump.replace_range(pos..pos + 2, "12");

    let result = validate(&dump);
    assert!(result.is_valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("Sector 3: access bits may be corrupted")));
}

#[test]
fn multibyte_utf8_input_is_rejected_on_every_path() {
    // Correct byte length, but the content is not ASCII hex: both the
    // validator and the planner must fail closed on it.
    let dump = format!("0{}0", "ó".repeat(1023));
    assert_eq!(dump.len(), MIFARE_1K_SIZE * 2);

    let result = validate(&dump);
    assert!(!result.is_valid);
    assert!(result
        .errors
        .iter()
        .any(|e| e.contains("non-hexadecimal")));

    let sim = simulate(&dump);
    assert!(!sim.success);
    assert!(sim.operations.is_empty());
}

#[test]
fn import_gate_follows_validation() {
    assert!(can_import(&validate(&good_dump())).can_import);

    let blocked = can_import(&validate(&"FF".repeat(MIFARE_1K_SIZE)));
    assert!(!blocked.can_import);
    assert!(blocked.reason.unwrap().contains("completely 0xFF"));
}

#[test]
fn compatibility_check_bounds_block_count() {
    assert!(check_compatibility(&good_dump()).ok);

    let too_big = check_compatibility(&"00".repeat(MIFARE_1K_SIZE + BLOCK_SIZE));
    assert!(!too_big.ok);
    assert_eq!(too_big.total_blocks, 65);

    let too_small = check_compatibility("00112233");
    assert!(!too_small.ok);
}
