//! Extracts the keyword set that steers reply generation away from a flat,
//! context-free random walk and towards words the user actually said.
//!
//! Reference upstream: `make_keywords`/`add_key`/`add_aux` in
//! `libmegahal.c`.

use crate::dictionary::{Dictionary, WordBuf, WordSet};

/// An ordered word-substitution list ("i" -> "you", "am" -> "are", ...),
/// applied before a word is considered as a keyword so that e.g. the user
/// saying "I" surfaces "you" as the keyword instead.
///
/// Reference upstream: `SWAP`/`add_swap` in `libmegahal.c`.
/// Kept as an ordered `Vec` rather than a map since, per the C source, more
/// than one entry may match the same `from` word and every match fires (see
/// `make_keywords`'s inner loop over the whole swap list, not a single
/// lookup).
#[derive(Debug, Clone, Default)]
pub struct Swap {
    pairs: Vec<(WordBuf, WordBuf)>,
}

impl Swap {
    pub fn new() -> Self {
        Swap { pairs: Vec::new() }
    }

    pub fn add(&mut self, from: &str, to: &str) {
        self.pairs.push((WordBuf::from_str(from), WordBuf::from_str(to)));
    }

    /// All swap targets for `word`, compared case-insensitively. Empty if
    /// none match, in which case the caller falls back to the word itself.
    fn targets_for<'a>(&'a self, word: &[u8]) -> impl Iterator<Item = &'a WordBuf> {
        self.pairs
            .iter()
            .filter(move |(from, _)| crate::dictionary::wordcmp(from.as_bytes(), word) == std::cmp::Ordering::Equal)
            .map(|(_, to)| to)
    }
}

/// Two-pass keyword extraction over one tokenized utterance.
///
/// Pass one (`add_key`): a word becomes a keyword if it's known to the
/// model's dictionary, starts with a letter or digit, and isn't in `ban` or
/// `aux`. Pass two (`add_aux`) only runs if pass one produced at least one
/// keyword, and is looser: it additionally admits words that *are* in `aux`
/// (the auxiliary/"also interesting" word list: conjunctions and the like
/// that are only worth keying off of once something more specific already
/// anchored the reply).
pub fn extract_keywords(
    words: &[WordBuf],
    dictionary: &Dictionary,
    ban: &WordSet,
    aux: &WordSet,
    swap: &Swap,
) -> WordSet {
    let mut keys = WordSet::new();

    for word in words {
        let mut any_swapped = false;
        for target in swap.targets_for(word.as_bytes()) {
            add_key(&mut keys, target, dictionary, ban, aux);
            any_swapped = true;
        }
        if !any_swapped {
            add_key(&mut keys, word, dictionary, ban, aux);
        }
    }

    if !keys.is_empty() {
        for word in words {
            let mut any_swapped = false;
            for target in swap.targets_for(word.as_bytes()) {
                add_aux(&mut keys, target, dictionary, aux);
                any_swapped = true;
            }
            if !any_swapped {
                add_aux(&mut keys, word, dictionary, aux);
            }
        }
    }

    keys
}

fn add_key(keys: &mut WordSet, word: &WordBuf, dictionary: &Dictionary, ban: &WordSet, aux: &WordSet) {
    if dictionary.find(word.as_bytes()).is_none() {
        return;
    }
    if !word.starts_alphanumeric() {
        return;
    }
    if ban.contains(word.as_bytes()) {
        return;
    }
    if aux.contains(word.as_bytes()) {
        return;
    }
    keys.insert(word.as_bytes());
}

fn add_aux(keys: &mut WordSet, word: &WordBuf, dictionary: &Dictionary, aux: &WordSet) {
    if dictionary.find(word.as_bytes()).is_none() {
        return;
    }
    if !word.starts_alphanumeric() {
        return;
    }
    if !aux.contains(word.as_bytes()) {
        return;
    }
    keys.insert(word.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict_with(words: &[&str]) -> Dictionary {
        let mut dict = Dictionary::new();
        for w in words {
            dict.add(w.as_bytes()).unwrap();
        }
        dict
    }

    fn words(strs: &[&str]) -> Vec<WordBuf> {
        strs.iter().map(|s| WordBuf::from_str(s)).collect()
    }

    #[test]
    fn unknown_words_are_never_keywords() {
        let dict = dict_with(&["hello"]);
        let keys = extract_keywords(&words(&["hello", "xyzzy"]), &dict, &WordSet::new(), &WordSet::new(), &Swap::new());
        assert!(keys.contains(b"hello"));
        assert!(!keys.contains(b"xyzzy"));
    }

    #[test]
    fn punctuation_only_words_are_never_keywords() {
        let dict = dict_with(&["."]);
        let keys = extract_keywords(&words(&["."]), &dict, &WordSet::new(), &WordSet::new(), &Swap::new());
        assert!(keys.is_empty());
    }

    #[test]
    fn banned_words_are_excluded_from_pass_one() {
        let dict = dict_with(&["cat", "the"]);
        let ban = WordSet::from_words(["the"]);
        let keys = extract_keywords(&words(&["the", "cat"]), &dict, &ban, &WordSet::new(), &Swap::new());
        assert!(keys.contains(b"cat"));
        assert!(!keys.contains(b"the"));
    }

    #[test]
    fn aux_words_only_admitted_once_a_real_keyword_exists() {
        let dict = dict_with(&["and", "cat"]);
        let aux = WordSet::from_words(["and"]);

        // No real keyword present: "and" stays excluded even on its own.
        let keys_alone = extract_keywords(&words(&["and"]), &dict, &WordSet::new(), &aux, &Swap::new());
        assert!(keys_alone.is_empty());

        // A real keyword ("cat") unlocks the aux pass, pulling "and" in too.
        let keys_with_anchor = extract_keywords(&words(&["and", "cat"]), &dict, &WordSet::new(), &aux, &Swap::new());
        assert!(keys_with_anchor.contains(b"and"));
        assert!(keys_with_anchor.contains(b"cat"));
    }

    #[test]
    fn swap_substitutes_before_keying() {
        let dict = dict_with(&["you", "happy"]);
        let mut swap = Swap::new();
        swap.add("i", "you");
        let keys = extract_keywords(&words(&["i", "happy"]), &dict, &WordSet::new(), &WordSet::new(), &swap);
        assert!(keys.contains(b"you"));
        assert!(!keys.contains(b"i"));
    }
}
