//! Dotted version comparison.

use std::cmp::Ordering;

use crate::error::{ConfigureError, ErrorCategory};

/// Compare two dotted numeric versions such as `"1.6.0"`.
///
/// Missing trailing components count as zero, so `"1.6"` equals `"1.6.0"`.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, ConfigureError> {
    let left = parse_components(a)?;
    let right = parse_components(b)?;

    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

fn parse_components(version: &str) -> Result<Vec<u64>, ConfigureError> {
    version
        .trim()
        .split('.')
        .map(|part| {
            part.parse::<u64>().map_err(|_| {
                ConfigureError::new(
                    ErrorCategory::Generic,
                    format!("invalid version {:?}: component {:?} is not a number", version, part),
                )
            })
        })
        .collect()
}
