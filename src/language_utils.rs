/*!
 * Language utilities for ISO language code handling.
 *
 * This module provides functions for validating and matching the ISO 639-1
 * (2-letter) codes used for assignment translations, and for normalizing
 * language detector output.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

/// Sentinel returned by language detectors when the source language cannot
/// be determined. Entities with this detected language are skipped, not failed.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Validate that a language code is a valid ISO 639-1 code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 && Language::from_639_1(&normalized).is_some() {
        return Ok(());
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to lowercase ISO 639-1, passing through the
/// detector's "unknown" sentinel unchanged
pub fn normalize_language_code(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if normalized == UNKNOWN_LANGUAGE {
        return Ok(normalized);
    }

    // Accept 3-letter detector output and fold it down to 2 letters
    if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            if let Some(part1) = lang.to_639_1() {
                return Ok(part1.to_string());
            }
        }
    }

    validate_language_code(&normalized)?;
    Ok(normalized)
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    let normalized1 = match normalize_language_code(code1) {
        Ok(n) => n,
        Err(_) => return false,
    };

    let normalized2 = match normalize_language_code(code2) {
        Ok(n) => n,
        Err(_) => return false,
    };

    normalized1 != UNKNOWN_LANGUAGE && normalized1 == normalized2
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_language_code(code)?;
    let lang = Language::from_639_1(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
