//! Logical ↔ physical name translation.
//!
//! Pure string transforms: no filesystem access happens here. A physical
//! name is the logical name plus (or with its extension replaced by) a
//! codec suffix; lookup accepts the aliases `.gzip`, `.zstd` and `.snappy`
//! alongside the canonical suffixes.

use squeezefs_codec::{algorithm_for_suffix, Algorithm};

/// The final extension of `name`, including the leading dot, or `""`.
/// Only the base name after the last slash is considered.
fn final_extension(name: &str) -> &str {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    let base = &name[base_start..];
    match base.rfind('.') {
        Some(idx) => &base[idx..],
        None => "",
    }
}

/// Append the suffix for `algo` to `name`. With `preserve` the full name is
/// kept (`a.txt` → `a.txt.gz`); without it the final extension is replaced
/// (`a.txt` → `a.gz`).
pub fn add_suffix(name: &str, algo: Algorithm, preserve: bool) -> String {
    let suffix = algo.suffix();
    if preserve {
        return format!("{name}{suffix}");
    }
    let ext = final_extension(name);
    let stem = &name[..name.len() - ext.len()];
    format!("{stem}{suffix}")
}

/// Strip a recognized compression suffix from `name`. Returns the stripped
/// name and the algorithm the suffix mapped to, or the input unchanged and
/// `None` when the final extension is not a compression suffix.
pub fn strip_suffix(name: &str) -> (String, Option<Algorithm>) {
    let ext = final_extension(name);
    match algorithm_for_suffix(&ext.to_ascii_lowercase()) {
        Some(algo) => {
            let stripped = name[..name.len() - ext.len()].to_string();
            (stripped, Some(algo))
        }
        None => (name.to_string(), None),
    }
}

/// The algorithm implied by the final extension of `name`, if any.
pub fn algo_from_suffix(name: &str) -> Option<Algorithm> {
    algorithm_for_suffix(&final_extension(name).to_ascii_lowercase())
}

/// Whether `name` ends in a recognized compression suffix.
pub fn has_compression_suffix(name: &str) -> bool {
    algo_from_suffix(name).is_some()
}

/// Physical names to probe for the logical `name`, preferred algorithm
/// first, then every other algorithm in canonical order.
pub fn candidates(name: &str, preferred: Algorithm) -> Vec<(String, Algorithm)> {
    let mut out = Vec::with_capacity(Algorithm::ALL.len());
    let mut push = |algo: Algorithm| {
        if !out.iter().any(|(_, a)| *a == algo) {
            out.push((format!("{name}{}", algo.suffix()), algo));
        }
    };
    push(preferred);
    for algo in Algorithm::ALL {
        push(algo);
    }
    out
}
