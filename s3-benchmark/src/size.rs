/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Human readable byte sizes such as `1M`, `5G` or `1.5MiB`.
//!
//! All multipliers are binary: `1K` is 1024 bytes.

use crate::error::{self, Error};

const KIBIBYTE: u64 = 1024;

fn multiplier(suffix: &str) -> Option<u64> {
    let unit = suffix.to_ascii_uppercase();
    let unit = unit
        .strip_suffix("IB")
        .or_else(|| unit.strip_suffix('B'))
        .unwrap_or(&unit);

    let exponent = match unit {
        "" => 0,
        "K" => 1,
        "M" => 2,
        "G" => 3,
        "T" => 4,
        _ => return None,
    };
    Some(KIBIBYTE.pow(exponent))
}

/// Parse a byte size with an optional `B`, `K`, `M`, `G` or `T` suffix.
///
/// Suffixes are case-insensitive and may be followed by `B` or `iB`. The numeric
/// part may be fractional, the result is rounded to the nearest byte.
///
/// ```
/// use s3_benchmark::size::parse_size;
///
/// assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
/// assert_eq!(parse_size("1.5KiB").unwrap(), 1536);
/// ```
pub fn parse_size(input: &str) -> Result<u64, Error> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);

    if number.is_empty() {
        return Err(error::invalid_input(format!(
            "byte size `{input}` does not start with a number"
        )));
    }

    let multiplier = multiplier(suffix.trim()).ok_or_else(|| {
        error::invalid_input(format!(
            "byte size `{input}` has unknown unit `{suffix}`, expected one of B, K, M, G, T"
        ))
    })?;

    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier).ok_or_else(|| {
            error::invalid_input(format!("byte size `{input}` is too large"))
        });
    }

    let value: f64 = number
        .parse()
        .map_err(|_| error::invalid_input(format!("byte size `{input}` is not a number")))?;
    let bytes = (value * multiplier as f64).round();
    if bytes >= u64::MAX as f64 {
        return Err(error::invalid_input(format!(
            "byte size `{input}` is too large"
        )));
    }
    Ok(bytes as u64)
}
