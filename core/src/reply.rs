//! Keyword-steered reply generation: seed a first symbol, babble outward in
//! both directions until a sentence terminator, score a batch of candidate
//! replies by surprise, and keep the best one seen within a time budget.
//!
//! Reference upstream: `seed`/`babble`/`reply`/`evaluate_reply`/
//! `generate_reply`/`dissimilar`/`make_output`/`capitalize`/`rnd` in
//! `libmegahal.c`. The injectable `Rng`/`Clock` traits
//! (swapped in via a constructor rather than a free-standing `srand48`-style
//! global) follow the trait-parameterized `Engine<P>` pattern in
//! `engine.rs`.

use std::cmp::Ordering;
use std::time::{Duration, Instant};

use crate::dictionary::{wordcmp, Symbol, WordBuf, WordSet, ERROR_SYMBOL, FIN_SYMBOL};
use crate::keywords::{extract_keywords, Swap};
use crate::model::Model;
use crate::trie::Trie;

/// Default reply budget, matching the C source's `#define TIMEOUT 1`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Fallback used when nothing dissimilar-enough to the input was ever
/// generated in the budget.
const NOTHING_SURPRISING: &str = "I don't know enough to answer you yet!";
/// `render`'s fallback for a reply with no words at all (an immediate
/// `<FIN>`/`<ERROR>` from `seed`).
const SPEECHLESS: &str = "I am utterly speechless!";

/// A swappable source of uniform random integers in `0..range`, the
/// injection point for `rnd()`/`drand48` in the C source.
pub trait Rng {
    /// A uniform pick in `0..range`. Must return `0` without side effects
    /// when `range == 0` (mirrors `floor(drand48() * 0) == 0`); call sites
    /// still guard `range > 0` themselves rather than leaning on this.
    fn gen_range(&mut self, range: u32) -> u32;
}

/// Default `Rng`, backed by `rand`'s `StdRng`.
#[derive(Debug)]
pub struct StdRng(rand::rngs::StdRng);

impl StdRng {
    pub fn from_entropy() -> Self {
        use rand::SeedableRng;
        StdRng(rand::rngs::StdRng::from_entropy())
    }

    pub fn from_seed(seed: u64) -> Self {
        use rand::SeedableRng;
        StdRng(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl Rng for StdRng {
    fn gen_range(&mut self, range: u32) -> u32 {
        if range == 0 {
            return 0;
        }
        use rand::Rng as _;
        self.0.gen_range(0..range)
    }
}

/// A swappable wall clock, the injection point for `time(NULL)` in
/// `generate_reply`'s timeout loop.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Which of a model's two trees a babble step is walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn tree<'a>(self, model: &'a Model) -> &'a Trie {
        match self {
            Direction::Forward => model.forward(),
            Direction::Backward => model.backward(),
        }
    }
}

/// Pick a random first symbol: usually a uniformly random child of the
/// model root, but if any surviving keyword (one not shadowed by `aux`) is
/// in the dictionary, a random rotation through the keyword list is tried
/// first and that keyword's symbol is used instead.
fn seed(model: &Model, keys: &WordSet, aux: &WordSet, rng: &mut dyn Rng) -> Symbol {
    let tree = model.forward();
    let root = model.context()[0].expect("forward root must be set before seed");
    let children = tree.children(root);

    let mut symbol = if children.is_empty() {
        ERROR_SYMBOL
    } else {
        let idx = rng.gen_range(children.len() as u32) as usize;
        tree.node(children[idx]).symbol
    };

    if !keys.is_empty() {
        let dictionary = model.dictionary();
        let key_words: Vec<&WordBuf> = keys.iter().collect();
        let start = rng.gen_range(key_words.len() as u32) as usize;
        let mut i = start;
        loop {
            let word = key_words[i];
            if dictionary.find(word.as_bytes()).is_some() && !aux.contains(word.as_bytes()) {
                return dictionary.find_or_error(word.as_bytes());
            }
            i = if i + 1 == key_words.len() { 0 } else { i + 1 };
            if i == start {
                return symbol;
            }
        }
    }

    symbol
}

/// Pick the next symbol by a weighted random walk over the deepest non-null
/// context's children: spin to a random child, then scan (wrapping) until a
/// keyword not already used in `replies` is found, preferring a non-`aux`
/// keyword until `used_key` has fired once.
fn babble(
    model: &Model,
    dir: Direction,
    keys: &WordSet,
    aux: &WordSet,
    used_key: &mut bool,
    replies: &[WordBuf],
    rng: &mut dyn Rng,
) -> Symbol {
    let tree = dir.tree(model);
    let order = model.order() as usize;

    let mut node = None;
    for ctx in &model.context()[..=order] {
        if let Some(n) = ctx {
            node = Some(*n);
        }
    }
    let node = match node {
        Some(n) => n,
        None => return ERROR_SYMBOL,
    };

    let children = tree.children(node);
    if children.is_empty() {
        return ERROR_SYMBOL;
    }

    let dictionary = model.dictionary();
    let mut i = rng.gen_range(children.len() as u32) as usize;
    let mut count = rng.gen_range(tree.node(node).usage) as i64;
    let mut symbol = ERROR_SYMBOL;

    loop {
        let child = children[i];
        let child_node = tree.node(child);
        symbol = child_node.symbol;
        let word = dictionary.word(symbol);

        let is_key = word.is_some_and(|w| keys.contains(w.as_bytes()));
        let blocked_by_aux = word.is_some_and(|w| aux.contains(w.as_bytes()));
        let already_used = word.is_some_and(|w| {
            replies
                .iter()
                .any(|r| wordcmp(r.as_bytes(), w.as_bytes()) == Ordering::Equal)
        });

        if is_key && (*used_key || !blocked_by_aux) && !already_used {
            *used_key = true;
            break;
        }

        count -= child_node.count as i64;
        if count < 0 {
            break;
        }
        i = if i + 1 >= children.len() { 0 } else { i + 1 };
    }

    symbol
}

/// Generate one full reply: seed a symbol, babble forward to `<FIN>`, then
/// prime the backward tree from the first `order + 1` words generated and
/// babble backward (prepending) to `<FIN>`.
pub fn reply(model: &mut Model, keys: &WordSet, aux: &WordSet, rng: &mut dyn Rng) -> Vec<WordBuf> {
    let mut replies: Vec<WordBuf> = Vec::new();
    let mut used_key = false;

    model.set_root_context(crate::trie::ROOT);
    let mut start = true;
    loop {
        let symbol = if start {
            seed(model, keys, aux, rng)
        } else {
            babble(model, Direction::Forward, keys, aux, &mut used_key, &replies, rng)
        };
        if symbol == ERROR_SYMBOL || symbol == FIN_SYMBOL {
            break;
        }
        start = false;
        if let Some(word) = model.dictionary().word(symbol) {
            replies.push(word.clone());
        }
        model.update_context_forward(symbol);
    }

    model.set_root_context(crate::trie::ROOT);
    if !replies.is_empty() {
        let prime_len = replies.len().min(model.order() as usize + 1);
        for word in replies[..prime_len].iter().rev() {
            let symbol = model.dictionary().find_or_error(word.as_bytes());
            model.update_context_backward(symbol);
        }
    }

    loop {
        let symbol = babble(model, Direction::Backward, keys, aux, &mut used_key, &replies, rng);
        if symbol == ERROR_SYMBOL || symbol == FIN_SYMBOL {
            break;
        }
        if let Some(word) = model.dictionary().word(symbol) {
            replies.insert(0, word.clone());
        }
        model.update_context_backward(symbol);
    }

    replies
}

/// Score a candidate reply by (negative log) surprise: how unlikely its
/// keyword positions were given the trained model, dampened for very long
/// replies so they don't win purely by accumulating more keyword terms.
pub fn evaluate_reply(model: &mut Model, keys: &WordSet, words: &[WordBuf]) -> f32 {
    if words.is_empty() {
        return 0.0;
    }

    let order = model.order() as usize;
    let mut entropy = 0.0f32;
    let mut num: u32 = 0;

    model.set_root_context(crate::trie::ROOT);
    for word in words {
        let symbol = model.dictionary().find_or_error(word.as_bytes());
        if keys.contains(word.as_bytes()) {
            num += 1;
            let (probability, count) = context_probability(model.forward(), model.context(), order, symbol);
            if count > 0 {
                entropy -= (probability / count as f32).ln();
            }
        }
        model.update_context_forward(symbol);
    }

    model.set_root_context(crate::trie::ROOT);
    for word in words.iter().rev() {
        let symbol = model.dictionary().find_or_error(word.as_bytes());
        if keys.contains(word.as_bytes()) {
            num += 1;
            let (probability, count) = context_probability(model.backward(), model.context(), order, symbol);
            if count > 0 {
                entropy -= (probability / count as f32).ln();
            }
        }
        model.update_context_backward(symbol);
    }

    if num >= 8 {
        entropy /= (num as f32 - 1.0).sqrt();
    }
    if num >= 16 {
        entropy /= num as f32;
    }

    entropy
}

/// Sum, over every non-null context depth `0..order` with nonzero usage, the
/// fraction of that context's visits that landed on `symbol` (0 if `symbol`
/// isn't a child there at all); returns the sum plus how many depths
/// contributed, for the caller to average.
fn context_probability(
    tree: &Trie,
    context: &[Option<crate::trie::NodeId>],
    order: usize,
    symbol: Symbol,
) -> (f32, u32) {
    let mut probability = 0.0f32;
    let mut count = 0u32;
    for ctx in &context[..order] {
        if let Some(node) = ctx {
            let usage = tree.node(*node).usage;
            if usage == 0 {
                continue;
            }
            count += 1;
            if let Some(child) = tree.find_child(*node, symbol) {
                probability += tree.node(child).count as f32 / usage as f32;
            }
        }
    }
    (probability, count)
}

/// Two word sequences are "dissimilar" if they differ in length or in any
/// word (case-insensitively); used to reject a reply that just parrots the
/// user's own input back.
pub fn dissimilar(a: &[WordBuf], b: &[WordBuf]) -> bool {
    if a.len() != b.len() {
        return true;
    }
    a.iter()
        .zip(b.iter())
        .any(|(x, y)| wordcmp(x.as_bytes(), y.as_bytes()) != Ordering::Equal)
}

/// Concatenate a reply's words verbatim into one string (no re-inserted
/// spaces: the tokenizer already preserved whitespace as its own words).
pub fn render(words: &[WordBuf]) -> String {
    if words.is_empty() {
        return SPEECHLESS.to_string();
    }
    let mut bytes = Vec::new();
    for word in words {
        bytes.extend_from_slice(word.as_bytes());
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Capitalize the first letter of each sentence, lowercase the rest,
/// restarting after `!`, `.`, or `?` followed by whitespace.
pub fn capitalize(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut start = true;

    for (i, &ch) in chars.iter().enumerate() {
        let mut out_ch = ch;
        if ch.is_ascii_alphabetic() {
            out_ch = if start { ch.to_ascii_uppercase() } else { ch.to_ascii_lowercase() };
            start = false;
        }
        if i >= 1 && matches!(chars[i - 1], '!' | '.' | '?') && chars[i].is_whitespace() {
            start = true;
        }
        out.push(out_ch);
    }

    out
}

/// Generate and pick the best reply to `words` within `timeout`, steered by
/// keywords extracted from `words` (via `ban`/`aux`/`swap`).
///
/// Matches `generate_reply`'s two-stage shape: first, an unprimed (keyless)
/// reply is tried purely as a chance at something dissimilar from the
/// input; then candidates generated with the real keyword set are scored by
/// `evaluate_reply` for at least one full `timeout` pass, keeping the
/// highest-scoring dissimilar one seen.
pub fn generate_reply(
    model: &mut Model,
    ban: &WordSet,
    aux: &WordSet,
    swap: &Swap,
    words: &[WordBuf],
    rng: &mut dyn Rng,
    clock: &dyn Clock,
    timeout: Duration,
) -> String {
    let keywords = extract_keywords(words, model.dictionary(), ban, aux, swap);

    let mut output = capitalize(NOTHING_SURPRISING);

    let empty_keys = WordSet::new();
    let unprimed = reply(model, &empty_keys, aux, rng);
    if dissimilar(words, &unprimed) {
        output = capitalize(&render(&unprimed));
    }

    let mut max_surprise = -1.0f32;
    let mut candidates = 0u32;
    let start = clock.now();
    loop {
        let candidate = reply(model, &keywords, aux, rng);
        let surprise = evaluate_reply(model, &keywords, &candidate);
        candidates += 1;
        if surprise > max_surprise && dissimilar(words, &candidate) {
            max_surprise = surprise;
            output = capitalize(&render(&candidate));
        }
        if clock.now().duration_since(start) >= timeout {
            break;
        }
    }

    tracing::debug!(candidates, best_surprise = max_surprise, "searched for a reply");
    output
}
