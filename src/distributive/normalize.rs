//! Canonical keys for distributive numbers.
//!
//! A distributive is stored under its number with leading zeros removed,
//! optionally qualified by a computer (sub-unit) suffix such as `210.3`.

/// Sub-unit token that denotes the primary computer and contributes no suffix.
pub const PRIMARY_SUB_UNIT: &str = "01";

/// Longest accepted suffix, including the leading dot.
const MAX_SUFFIX_LEN: usize = 3;

/// Base number that keeps its `.1` suffix when derived from a log file name.
const KEEPS_PRIMARY_SUFFIX: &str = "210";

/// Strip all leading `'0'` characters from a distributive token.
///
/// # Examples
///
/// ```
/// use update_stat_parser::distributive::normalize;
///
/// assert_eq!(normalize("00210"), "210");
/// assert_eq!(normalize("000"), "");
/// ```
#[must_use]
pub fn normalize(token: &str) -> &str {
    token.trim_start_matches('0')
}

/// Suffix contributed by a sub-unit token.
///
/// Empty for the primary computer or a missing token. A suffix longer than
/// three characters is treated as invalid and dropped, so the key degrades to
/// the base number.
#[must_use]
pub fn sub_unit_suffix(sub_unit: &str) -> String {
    if sub_unit.is_empty() || sub_unit == PRIMARY_SUB_UNIT {
        return String::new();
    }
    bounded_suffix(sub_unit)
}

fn bounded_suffix(sub_unit: &str) -> String {
    let suffix = format!(".{}", normalize(sub_unit));
    if suffix.chars().count() > MAX_SUFFIX_LEN {
        String::new()
    } else {
        suffix
    }
}

/// Canonical key for a raw distributive number and sub-unit token.
///
/// # Examples
///
/// ```
/// use update_stat_parser::distributive::distributive_key;
///
/// assert_eq!(distributive_key("0042", "01"), "42");
/// assert_eq!(distributive_key("0210", "03"), "210.3");
/// ```
#[must_use]
pub fn distributive_key(number: &str, sub_unit: &str) -> String {
    format!("{}{}", normalize(number), sub_unit_suffix(sub_unit))
}

/// Identity encoded in a session log file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileIdentity {
    /// Product system code (first `_` part).
    pub system_code: String,
    /// Canonical distributive key.
    pub distributive_key: String,
}

/// Derive the system code and distributive key from a session log name.
///
/// Names look like `<system>_<number>[_<computer>]#<rest>`. Unlike
/// [`distributive_key`], the computer part is always turned into a suffix,
/// and a resulting `.1` is dropped unless the base number is `210`.
///
/// Returns `None` when the name has no number part.
#[must_use]
pub fn log_file_identity(file_name: &str) -> Option<LogFileIdentity> {
    let head = file_name.split('#').next().unwrap_or_default();
    let mut parts = head.split('_');
    let system_code = parts.next()?.to_string();
    let number = normalize(parts.next()?);
    let suffix = parts.next().map(bounded_suffix).unwrap_or_default();

    let distributive_key = if number == KEEPS_PRIMARY_SUFFIX || suffix != ".1" {
        format!("{number}{suffix}")
    } else {
        number.to_string()
    };

    Some(LogFileIdentity {
        system_code,
        distributive_key,
    })
}
