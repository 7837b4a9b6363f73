//! English naming helpers for the inference rules.
//!
//! Pluralization is a small explicit suffix table, not a general
//! natural-language library. It assumes English table names:
//!
//! | singular ending              | plural ending | example               |
//! |------------------------------|---------------|-----------------------|
//! | consonant + `y`              | `ies`         | category -> categories |
//! | `s`, `x`, `z`, `ch`, `sh`    | + `es`        | status -> statuses     |
//! | anything else                | + `s`         | driver -> drivers      |
//!
//! Inputs are expected in lowercase.

/// Plural endings that take `es`.
const SIBILANT_ENDINGS: &[&str] = &["s", "x", "z", "ch", "sh"];

/// Stems whose plural drops `es` rather than `s` (`statuses`, not `cases`).
const ES_PLURAL_STEMS: &[&str] = &["ss", "us", "x", "ch", "sh", "zz"];

/// Singular endings a bare trailing `s` must not be stripped from.
const NON_PLURAL_S_ENDINGS: &[&str] = &["ss", "us", "is"];

/// How a column name marks itself as a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSuffix {
    /// `driver_id`, `DRIVER_ID`
    Snake,
    /// `driverId`
    Camel,
}

/// Splits a column name into its stem and reference suffix.
///
/// Returns `None` when the name has no suffix or nothing precedes it.
///
/// # Example
/// ```rust
/// use innoconv_core::inference::naming::{IdSuffix, strip_id_suffix};
///
/// assert_eq!(strip_id_suffix("driver_id"), Some(("driver", IdSuffix::Snake)));
/// assert_eq!(strip_id_suffix("raceId"), Some(("race", IdSuffix::Camel)));
/// assert_eq!(strip_id_suffix("paid"), None);
/// ```
pub fn strip_id_suffix(column: &str) -> Option<(&str, IdSuffix)> {
    if let Some(cut) = column.len().checked_sub(3)
        && cut > 0
        && let Some(suffix) = column.get(cut..)
        && suffix.eq_ignore_ascii_case("_id")
    {
        return Some((&column[..cut], IdSuffix::Snake));
    }

    let stem = column.strip_suffix("Id")?;
    let last = stem.chars().last()?;
    (last.is_ascii_lowercase() || last.is_ascii_digit()).then_some((stem, IdSuffix::Camel))
}

/// Singular form of a lowercase English noun.
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies")
        && ends_with_consonant(stem)
    {
        return format!("{stem}y");
    }
    if let Some(stem) = word.strip_suffix("es")
        && ES_PLURAL_STEMS.iter().any(|ending| stem.ends_with(ending))
    {
        return stem.to_string();
    }
    if NON_PLURAL_S_ENDINGS.iter().any(|ending| word.ends_with(ending)) {
        return word.to_string();
    }
    match word.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => word.to_string(),
    }
}

/// Plural form of a lowercase English noun.
pub fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y')
        && ends_with_consonant(stem)
    {
        return format!("{stem}ies");
    }
    if SIBILANT_ENDINGS.iter().any(|ending| word.ends_with(ending)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Whether two lowercase names denote the same noun up to number.
pub fn same_noun(a: &str, b: &str) -> bool {
    a == b || singularize(a) == singularize(b) || pluralize(a) == b || a == pluralize(b)
}

/// Removes underscores so `race_result` and `raceresult` compare equal.
pub fn compact(name: &str) -> String {
    name.chars().filter(|&c| c != '_').collect()
}

/// Levenshtein edit distance between two strings, by characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

fn ends_with_consonant(stem: &str) -> bool {
    stem.chars()
        .last()
        .is_some_and(|c| c.is_ascii_alphabetic() && !"aeiou".contains(c))
}
