//! Street and place name normalization.
//!
//! Produces a comparison key that ignores case, spaces, dashes, quotes,
//! common accents and the usual ways Austrian street names get abbreviated
//! ("Dr.-Karl-Renner-Str." and "Doktor Karl Renner Straße" share a key).

mod abbreviations;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::NormalizationError;

pub use abbreviations::{ABBREVIATIONS, FIRST_NAMES};

/// Punctuation allowed in a name besides ASCII letters and digits.
const VALID_PUNCTUATION: &str = "üäö.,()/;+ -'\"*`";

/// Accented letters folded to ASCII; `*` and backtick become spaces.
const TRANSLATION: &[(char, char)] = &[
    ('á', 'a'),
    ('č', 'c'),
    ('é', 'e'),
    ('ě', 'e'),
    ('ë', 'e'),
    ('è', 'e'),
    ('í', 'i'),
    ('ó', 'o'),
    ('ő', 'o'),
    ('ř', 'r'),
    ('š', 's'),
    ('ú', 'u'),
    ('ž', 'z'),
    ('*', ' '),
    ('`', ' '),
];

/// Suffixes dropped for loose comparison, checked in this order.
const STREET_SUFFIXES: &[&str] = &["strasse", "gasse", "weg"];

/// Upper bound on normalization passes. A pass is repeated while it still
/// changes the key, which happens when replacements produce another key.
const MAX_PASSES: usize = 8;

/// Normalizes street and place names into comparison keys.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    /// Long form -> short form, longest key first
    replacements: Vec<(String, String)>,
    expand_abbreviations: bool,
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self::with_expansion(true)
    }

    /// Build the replacement table; `expand_abbreviations` sets the default
    /// used by [`NameNormalizer::normalize`].
    pub fn with_expansion(expand_abbreviations: bool) -> Self {
        let mut table: BTreeMap<String, String> = BTreeMap::new();

        for (word, abbreviation) in ABBREVIATIONS {
            let (Ok(word), Ok(abbreviation)) = (basic_key(word), basic_key(abbreviation)) else {
                continue;
            };
            // the shorter spelling is unambiguous, so it becomes the target
            if word.chars().count() < abbreviation.chars().count() {
                table.insert(abbreviation, word);
            } else {
                table.insert(word, abbreviation);
            }
        }

        for name in FIRST_NAMES {
            let name = name.to_lowercase();
            let initial = if name.starts_with("th") {
                "th.".to_string()
            } else {
                match name.chars().next() {
                    Some(c) => format!("{}.", c),
                    None => continue,
                }
            };
            table.insert(name, initial);
        }

        let mut replacements: Vec<(String, String)> =
            table.into_iter().filter(|(k, v)| k != v).collect();
        replacements.sort_by(|(a, _), (b, _)| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });

        debug!("Built abbreviation table with {} entries", replacements.len());

        Self {
            replacements,
            expand_abbreviations,
        }
    }

    /// Normalize with the configured abbreviation handling and no suffix stripping.
    pub fn normalize(&self, name: &str) -> Result<String, NormalizationError> {
        self.normalize_with(name, self.expand_abbreviations, false)
    }

    /// Normalize a name.
    ///
    /// With `strip_suffix` a trailing "strasse", "gasse" or "weg" is removed
    /// so that e.g. "Lindenweg" and "Lindengasse" compare equal. Only one
    /// suffix is removed, from the stable key, so a stripped key is not a
    /// fixed point: stripping it again may remove another suffix.
    pub fn normalize_with(
        &self,
        name: &str,
        expand_abbreviations: bool,
        strip_suffix: bool,
    ) -> Result<String, NormalizationError> {
        let mut s = self.pass(name, expand_abbreviations)?;
        for _ in 1..MAX_PASSES {
            let next = self.pass(&s, expand_abbreviations)?;
            if next == s {
                break;
            }
            s = next;
        }

        if strip_suffix {
            if let Some(suffix) = STREET_SUFFIXES.iter().find(|suffix| s.ends_with(*suffix)) {
                s.truncate(s.len() - suffix.len());
            }
        }
        Ok(s)
    }

    /// Number of entries in the replacement table
    pub fn table_len(&self) -> usize {
        self.replacements.len()
    }

    fn pass(&self, name: &str, expand_abbreviations: bool) -> Result<String, NormalizationError> {
        let mut s = fold(name);

        if expand_abbreviations {
            s = expand_suffix(s);
            for (key, value) in &self.replacements {
                if s.contains(key.as_str()) {
                    s = replace_guarded(&s, key, value);
                }
            }
        }

        validate(name, &s)?;
        Ok(s)
    }
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Key without abbreviation handling, used to build the table itself.
fn basic_key(name: &str) -> Result<String, NormalizationError> {
    let s = fold(name);
    validate(name, &s)?;
    Ok(s)
}

/// Case, sharp s, accents and separators.
fn fold(name: &str) -> String {
    let s = name.replace(&['ß', 'ẞ'][..], "ss").to_lowercase();
    s.chars()
        .filter(|c| *c != '\u{a0}')
        .map(|c| match c {
            '&' => '+',
            c => TRANSLATION
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c),
        })
        .filter(|c| !matches!(c, ' ' | '-' | '\'' | '"'))
        .collect()
}

/// Replace every occurrence of `key` with `value`, except where the result
/// would end in a suffix abbreviation. "kaisergustav" must not turn into
/// "kaiserg." and then into "kaisergasse" on the next pass.
fn replace_guarded(s: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find(key) {
        let (head, tail) = rest.split_at(at);
        let after = &tail[key.len()..];
        out.push_str(head);
        let replaced = format!("{}{}{}", out, value, after);
        if expand_suffix(replaced.clone()) == replaced {
            out.push_str(value);
        } else {
            out.push_str(key);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// "Hauptstr." -> "hauptstrasse", "Kirchg." -> "kirchgasse".
fn expand_suffix(mut s: String) -> String {
    if s.ends_with("str.") {
        s.pop();
        s.push_str("asse");
    } else if s.ends_with("g.") {
        // a `g.` right after another abbreviation is an initial, not a lane
        let before = s[..s.len() - 2].chars().last();
        if before.is_some_and(|c| c.is_alphabetic()) {
            s.pop();
            s.push_str("asse");
        }
    }
    s
}

fn validate(name: &str, s: &str) -> Result<(), NormalizationError> {
    match s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || VALID_PUNCTUATION.contains(*c)))
    {
        Some(character) => Err(NormalizationError::InvalidCharacter {
            name: name.to_string(),
            character,
        }),
        None => Ok(()),
    }
}
