// Flesch-Kincaid grade level
use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+(\s|$)").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+(?:['-][A-Za-z]+)*|[0-9]+").unwrap());

/// Estimated syllables in one word: vowel groups, minus a silent final `e`,
/// at least one.
pub fn syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let chars: Vec<char> = word.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if chars.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut prev_vowel = false;
    for &c in &chars {
        let vowel = is_vowel(c);
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }

    let n = chars.len();
    if n > 2 && chars[n - 1] == 'e' && chars[n - 2] != 'l' && !is_vowel(chars[n - 2]) {
        count -= 1;
    }
    count.max(1)
}

pub fn sentence_count(text: &str) -> usize {
    SENTENCE_END.find_iter(text).count().max(1)
}

/// US school grade needed to read `text`:
/// `0.39 * words/sentences + 11.8 * syllables/words - 15.59`.
/// Text without words scores 0.
pub fn flesch_kincaid_grade(text: &str) -> f64 {
    let words: Vec<&str> = WORD.find_iter(text).map(|m| m.as_str()).collect();
    if words.is_empty() {
        return 0.0;
    }
    let word_count = words.len() as f64;
    let syllable_count: usize = words.iter().map(|w| syllables(w).max(1)).sum();
    let sentences = sentence_count(text) as f64;

    0.39 * (word_count / sentences) + 11.8 * (syllable_count as f64 / word_count) - 15.59
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("cat", 1)]
    #[case("agreement", 3)]
    #[case("notwithstanding", 4)]
    #[case("rate", 1)]
    #[case("table", 2)]
    #[case("the", 1)]
    #[case("party", 2)]
    fn test_syllables(#[case] word: &str, #[case] expected: usize) {
        assert_eq!(syllables(word), expected);
    }

    #[test]
    fn test_simple_text_scores_low() {
        let grade = flesch_kincaid_grade("The cat sat. The dog ran.");
        // 6 words, 2 sentences, 6 syllables.
        let expected = 0.39 * 3.0 + 11.8 * 1.0 - 15.59;
        assert!((grade - expected).abs() < 1e-9);
    }

    #[test]
    fn test_legalese_scores_higher() {
        let plain = flesch_kincaid_grade("You must pay the rent on time.");
        let legal = flesch_kincaid_grade(
            "Notwithstanding the aforementioned provisions, the lessee shall remit \
             consideration forthwith pursuant to the supplementary indemnification schedule.",
        );
        assert!(legal > plain + 5.0);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(flesch_kincaid_grade(""), 0.0);
        assert_eq!(flesch_kincaid_grade("... !!"), 0.0);
    }
}
