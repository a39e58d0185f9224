//! Word dictionary: the bijection between byte-string words and the 16-bit
//! symbol ids used everywhere else in the engine.
//!
//! Reference upstream: `DICTIONARY`/`add_word`/`search_dictionary`/`wordcmp`
//! in `libmegahal.c`. The sorted-vec + binary-search shape
//! mirrors `SingleGram`'s `insert_freq`/`get_freq` in `single_gram.rs`.

use std::cmp::Ordering;
use std::fmt;

/// A dictionary-assigned symbol id. `0` is `<ERROR>`, `1` is `<FIN>`.
pub type Symbol = u16;

/// Reserved id for the "unknown word" sentinel.
pub const ERROR_SYMBOL: Symbol = 0;
/// Reserved id for the sentence terminator.
pub const FIN_SYMBOL: Symbol = 1;

const MAX_WORD_LEN: usize = 255;
/// The id space is a `u16`, so no dictionary can hold more entries than this
/// without an id collision. Checked by `add` and, on the load path, by
/// `persistence::load_dictionary`.
pub const MAX_DICTIONARY_SIZE: usize = 65_535;

/// An owned word: a non-empty byte sequence of at most 255 bytes.
///
/// Words longer than 255 bytes are truncated at construction time rather
/// than rejected, so one overlong token doesn't throw away an entire
/// learned sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBuf(Vec<u8>);

impl WordBuf {
    /// Build a word from raw bytes, truncating to 255 bytes if needed.
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_WORD_LEN);
        WordBuf(bytes[..len].to_vec())
    }

    pub fn from_str(s: &str) -> Self {
        WordBuf::new(s.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> u8 {
        self.0.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First byte is alphanumeric (ASCII), used by the keyword extractor's
    /// `add_key`/`add_aux` gate.
    pub fn starts_alphanumeric(&self) -> bool {
        self.0.first().is_some_and(|b| b.is_ascii_alphanumeric())
    }

    /// Lossy UTF-8 view, for rendering/error messages only.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl fmt::Display for WordBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_lossy())
    }
}

/// Case-insensitive comparison with length as tiebreak: compare `min(len)`
/// bytes under ASCII case folding, then shorter < longer.
pub fn wordcmp(a: &[u8], b: &[u8]) -> Ordering {
    let bound = a.len().min(b.len());
    for i in 0..bound {
        let (ca, cb) = (a[i].to_ascii_uppercase(), b[i].to_ascii_uppercase());
        match ca.cmp(&cb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Bijection between words and symbol ids.
///
/// `words[id]` is the word for that id (insertion order); `order` holds all
/// ids sorted ascending by `wordcmp` of their word, kept sorted on every
/// insert so lookups are O(log n) binary searches.
#[derive(Debug, Clone)]
pub struct Dictionary {
    words: Vec<WordBuf>,
    order: Vec<Symbol>,
}

impl Dictionary {
    /// A new dictionary with the two sentinels pre-registered at ids 0/1.
    pub fn new() -> Self {
        let mut dict = Dictionary {
            words: Vec::new(),
            order: Vec::new(),
        };
        let _ = dict.add(b"<ERROR>");
        let _ = dict.add(b"<FIN>");
        debug_assert_eq!(dict.find(b"<ERROR>"), Some(ERROR_SYMBOL));
        debug_assert_eq!(dict.find(b"<FIN>"), Some(FIN_SYMBOL));
        dict
    }

    /// An empty shell with no entries at all, used by the persistence
    /// loader, which reads the sentinels back from the file instead of
    /// re-inserting them (they are present in every saved brain).
    pub(crate) fn empty_shell() -> Self {
        Dictionary {
            words: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Binary search the sorted-order array for `word`.
    ///
    /// Returns `Ok(index_into_order)` on hit, `Err(insertion_index)` on miss.
    fn search(&self, word: &[u8]) -> std::result::Result<usize, usize> {
        self.order
            .binary_search_by(|&id| wordcmp(self.words[id as usize].as_bytes(), word))
    }

    /// Look up a word's symbol id, if known.
    pub fn find(&self, word: &[u8]) -> Option<Symbol> {
        match self.search(word) {
            Ok(idx) => Some(self.order[idx]),
            Err(_) => None,
        }
    }

    /// `find`, folding a miss to the `<ERROR>` symbol id (0), the shape
    /// most reply/keyword call sites want, where a lookup returns a bare
    /// `u16` with 0 meaning "not found".
    pub fn find_or_error(&self, word: &[u8]) -> Symbol {
        self.find(word).unwrap_or(ERROR_SYMBOL)
    }

    /// Insert `word` if not already present; return its (possibly new) id.
    pub fn add(&mut self, word: &[u8]) -> crate::error::Result<Symbol> {
        match self.search(word) {
            Ok(idx) => Ok(self.order[idx]),
            Err(insert_at) => {
                if self.words.len() >= MAX_DICTIONARY_SIZE {
                    return Err(crate::error::Error::Capacity);
                }
                let new_id = self.words.len() as Symbol;
                self.words.push(WordBuf::new(word));
                self.order.insert(insert_at, new_id);
                Ok(new_id)
            }
        }
    }

    /// The word stored for a given symbol id, if the id is in range.
    pub fn word(&self, id: Symbol) -> Option<&WordBuf> {
        self.words.get(id as usize)
    }

    /// Push a word read verbatim from a brain file, in id order. Used only
    /// by the persistence loader, which must not re-run `add`'s dedup/sort
    /// logic (the file is already consistent) but does need the sorted
    /// index rebuilt for later `find` calls.
    pub(crate) fn push_loaded(&mut self, word: WordBuf) {
        let new_id = self.words.len() as Symbol;
        let insert_at = self
            .order
            .binary_search_by(|&id| wordcmp(self.words[id as usize].as_bytes(), word.as_bytes()))
            .unwrap_or_else(|e| e);
        self.words.push(word);
        self.order.insert(insert_at, new_id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &WordBuf)> {
        self.words
            .iter()
            .enumerate()
            .map(|(i, w)| (i as Symbol, w))
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Dictionary::new()
    }
}

/// A case-insensitive word set, reusing the dictionary's sorted-vec search.
/// Used for ban lists, aux lists, and the per-turn keyword set.
#[derive(Debug, Clone, Default)]
pub struct WordSet {
    dict: Dictionary,
}

impl WordSet {
    pub fn new() -> Self {
        WordSet {
            dict: Dictionary::empty_shell(),
        }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut set = WordSet::new();
        for w in words {
            set.insert(w.as_ref());
        }
        set
    }

    pub fn insert(&mut self, word: &[u8]) {
        // A set can never legitimately exceed the same 65,535-entry cap as
        // a full dictionary; ignore capacity errors here since ban/aux/key
        // sets are always far smaller in practice.
        let _ = self.dict.add(word);
    }

    pub fn contains(&self, word: &[u8]) -> bool {
        self.dict.find(word).is_some()
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordBuf> {
        self.dict.iter().map(|(_, w)| w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_ids_zero_and_one() {
        let dict = Dictionary::new();
        assert_eq!(dict.find(b"<ERROR>"), Some(0));
        assert_eq!(dict.find(b"<FIN>"), Some(1));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn add_is_case_insensitive_and_idempotent() {
        let mut dict = Dictionary::new();
        let id1 = dict.add(b"Cat").unwrap();
        let id2 = dict.add(b"CAT").unwrap();
        let id3 = dict.add(b"cat").unwrap();
        assert_eq!(id1, id2);
        assert_eq!(id2, id3);
        assert_eq!(dict.find(b"cAt"), Some(id1));
    }

    #[test]
    fn ids_are_dense_in_insertion_order() {
        let mut dict = Dictionary::new();
        let a = dict.add(b"alpha").unwrap();
        let b = dict.add(b"beta").unwrap();
        let c = dict.add(b"gamma").unwrap();
        assert_eq!(a, 2);
        assert_eq!(b, 3);
        assert_eq!(c, 4);
    }

    #[test]
    fn order_array_stays_sorted() {
        let mut dict = Dictionary::new();
        for w in ["zebra", "apple", "mango", "banana"] {
            dict.add(w.as_bytes()).unwrap();
        }
        let ordered: Vec<&[u8]> = dict.order.iter().map(|&id| dict.words[id as usize].as_bytes()).collect();
        for pair in ordered.windows(2) {
            assert_ne!(wordcmp(pair[0], pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn wordcmp_matches_spec_examples() {
        assert_eq!(wordcmp(b"Cat", b"CAT"), Ordering::Equal);
        assert_eq!(wordcmp(b"cat", b"cats"), Ordering::Less);
        assert_eq!(wordcmp(b"cb", b"ca"), Ordering::Greater);
    }

    #[test]
    fn long_words_are_truncated_not_rejected() {
        let long = vec![b'x'; 300];
        let w = WordBuf::new(&long);
        assert_eq!(w.len(), 255);
    }

    #[test]
    fn word_set_membership() {
        let set = WordSet::from_words(["the", "a", "an"]);
        assert!(set.contains(b"THE"));
        assert!(!set.contains(b"cat"));
    }
}
