//! Compact number display: `1500 -> "1.5K"`, `2_000_000 -> "2M"`.
//!
//! One decimal, always truncated toward zero, so a value never displays
//! larger than it is and never rolls over into the next suffix
//! (`999_999 -> "999.9K"`, not `"1000K"`).

/// Suffix thresholds, largest first.
const SUFFIXES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "Qi"),
    (1_000_000_000_000_000, "Qa"),
    (1_000_000_000_000, "T"),
    (1_000_000_000, "B"),
    (1_000_000, "M"),
    (1_000, "K"),
];

/// Formats `n` with a magnitude suffix. Deterministic and total.
#[must_use]
pub fn format_number(n: u64) -> String {
    for (unit, suffix) in SUFFIXES {
        if n >= unit {
            let tenths = u128::from(n) * 10 / u128::from(unit);
            let whole = tenths / 10;
            let frac = tenths % 10;
            return if frac == 0 {
                format!("{whole}{suffix}")
            } else {
                format!("{whole}.{frac}{suffix}")
            };
        }
    }
    n.to_string()
}
