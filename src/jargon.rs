// Legal jargon detection with plain-language glosses
use crate::types::JargonMap;

/// Built-in dictionary of archaic legal terms.
pub const DICTIONARY: &[(&str, &str)] = &[
    ("hereinafter", "from now on"),
    ("pursuant to", "under"),
    ("notwithstanding", "despite"),
    ("therein", "in there"),
    ("hereby", "by this"),
    ("whereas", "while"),
    ("forthwith", "immediately"),
    ("witnesseth", "certifies that"),
];

/// Every dictionary term occurring anywhere in `text`, case-insensitively.
///
/// Matching is plain substring containment, so "thereinafter" also
/// contains "therein".
pub fn find_jargon(text: &str) -> JargonMap {
    let lowered = text.to_lowercase();
    DICTIONARY
        .iter()
        .filter(|(term, _)| lowered.contains(term))
        .map(|(term, gloss)| (term.to_string(), gloss.to_string()))
        .collect()
}
