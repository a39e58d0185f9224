//! The trained language model: a shared dictionary plus a pair of tries
//! (forward and backward) and the sliding context window used while
//! training or generating.
//!
//! Reference upstream: `MODEL`/`new_model`/`initialize_context`/
//! `update_context`/`update_model`/`learn` in `libmegahal.c`.

use crate::dictionary::{Dictionary, Symbol, FIN_SYMBOL};
use crate::trie::{NodeId, Trie};

/// Smallest and largest supported context order. The C source takes `order`
/// as a bare `int` with no validation; pinning it to `1..=15` keeps the
/// `order + 2`-deep context window comfortably bounded in a `Vec`.
pub const MIN_ORDER: u8 = 1;
pub const MAX_ORDER: u8 = 15;

/// A variable-order Markov model: one dictionary shared by two tries (a
/// forward model and a backward model), plus the context window used while
/// walking either tree.
#[derive(Debug, Clone)]
pub struct Model {
    order: u8,
    forward: Trie,
    backward: Trie,
    dictionary: Dictionary,
    /// `context[0]` is always the active tree's root; `context[i]` for
    /// `i > 0` is the node reached after the last `i` symbols, or `None` if
    /// that depth has no match yet. Length is `order + 2`, matching the C
    /// source's `context[order + 2]` (one extra slot of headroom beyond
    /// `order + 1`, never written but kept for loop-bound parity).
    context: Vec<Option<NodeId>>,
}

/// Shared core of `update_context`/`update_model`: walk every non-`None`
/// context slot from deepest to shallowest, replacing `context[i]` with
/// `step(context[i - 1])` wherever `context[i - 1]` is populated. `step` is
/// a lookup for `update_context`, an insert-and-count for `update_model_*`.
fn update_context_slots(
    context: &mut [Option<NodeId>],
    order: usize,
    mut step: impl FnMut(NodeId) -> Option<NodeId>,
) {
    for i in (1..=order + 1).rev() {
        if let Some(node) = context[i - 1] {
            context[i] = step(node);
        }
    }
}

impl Model {
    /// Build an empty model for the given order, with a fresh dictionary
    /// (sentinels `<ERROR>`/`<FIN>` pre-registered) and empty tries.
    ///
    /// Panics if `order` is outside `1..=15`, a programmer error (a
    /// hardcoded constant or validated config value), not a runtime
    /// condition callers need to recover from.
    pub fn new(order: u8) -> Self {
        assert!(
            (MIN_ORDER..=MAX_ORDER).contains(&order),
            "order must be in 1..=15, got {order}"
        );
        let mut model = Model {
            order,
            forward: Trie::new(),
            backward: Trie::new(),
            dictionary: Dictionary::new(),
            context: vec![None; order as usize + 2],
        };
        model.initialize_context();
        model
    }

    /// Construct a model from parts already fully loaded (used by the
    /// persistence loader, which reads tries and dictionary straight off
    /// disk rather than training them).
    pub(crate) fn from_parts(order: u8, forward: Trie, backward: Trie, dictionary: Dictionary) -> Self {
        let mut model = Model {
            order,
            forward,
            backward,
            dictionary,
            context: vec![None; order as usize + 2],
        };
        model.initialize_context();
        model
    }

    pub fn order(&self) -> u8 {
        self.order
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Number of distinct symbols learned so far, including the two
    /// sentinels. Shorthand for `self.dictionary().len()`.
    pub fn vocab_len(&self) -> usize {
        self.dictionary.len()
    }

    pub fn forward(&self) -> &Trie {
        &self.forward
    }

    pub fn backward(&self) -> &Trie {
        &self.backward
    }

    /// All of `context[0..=order]` reset to `None`. `update_context`/
    /// `update_model` only ever look at those first `order + 1` slots; the
    /// trailing slot is never touched, matching the C source exactly.
    fn initialize_context(&mut self) {
        for slot in &mut self.context[..=self.order as usize] {
            *slot = None;
        }
    }

    /// `update_context` against the forward tree, via a disjoint field
    /// borrow so the caller doesn't need to hold a separate `&Trie`.
    pub fn update_context_forward(&mut self, symbol: Symbol) {
        let Model { forward, context, order, .. } = self;
        update_context_slots(context, *order as usize, |node| forward.find_child(node, symbol));
    }

    pub fn update_context_backward(&mut self, symbol: Symbol) {
        let Model { backward, context, order, .. } = self;
        update_context_slots(context, *order as usize, |node| backward.find_child(node, symbol));
    }

    /// Walk every non-`None` context slot one step deeper by following
    /// `symbol`, inserting the symbol (and bumping its count) if it isn't
    /// already a child, the training-time counterpart of
    /// `update_context_forward`.
    pub fn update_model_forward(&mut self, symbol: Symbol) {
        let Model { forward, context, order, .. } = self;
        update_context_slots(context, *order as usize, |node| Some(forward.add_symbol(node, symbol)));
    }

    pub fn update_model_backward(&mut self, symbol: Symbol) {
        let Model { backward, context, order, .. } = self;
        update_context_slots(context, *order as usize, |node| Some(backward.add_symbol(node, symbol)));
    }

    pub fn context(&self) -> &[Option<NodeId>] {
        &self.context
    }

    pub fn set_root_context(&mut self, root: NodeId) {
        self.initialize_context();
        self.context[0] = Some(root);
    }

    /// Train on one already-tokenized sentence: a forward pass over the
    /// words, then a backward pass over the same words (both terminated by
    /// `<FIN>`), sharing one growing dictionary.
    ///
    /// Sentences with `words.len() <= order` teach nothing (there's no
    /// context deep enough to be worth recording) and are silently
    /// skipped, matching the C source's `learn`.
    pub fn learn(&mut self, words: &[crate::dictionary::WordBuf]) -> crate::error::Result<()> {
        if words.len() <= self.order as usize {
            return Ok(());
        }

        self.initialize_context();
        self.context[0] = Some(crate::trie::ROOT);
        for word in words {
            let symbol = self.dictionary.add(word.as_bytes())?;
            self.update_model_forward(symbol);
        }
        self.update_model_forward(FIN_SYMBOL);

        self.initialize_context();
        self.context[0] = Some(crate::trie::ROOT);
        for word in words.iter().rev() {
            let symbol = self.dictionary.find_or_error(word.as_bytes());
            self.update_model_backward(symbol);
        }
        self.update_model_backward(FIN_SYMBOL);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::WordBuf;

    fn words(strs: &[&str]) -> Vec<WordBuf> {
        strs.iter().map(|s| WordBuf::from_str(s)).collect()
    }

    #[test]
    fn short_sentence_is_not_learned() {
        let mut model = Model::new(5);
        model.learn(&words(&["hi", "there"])).unwrap();
        // order(5) + 2 sentinels: dictionary stays at just <ERROR>/<FIN>.
        assert_eq!(model.dictionary().len(), 2);
    }

    #[test]
    fn long_enough_sentence_populates_both_trees() {
        let mut model = Model::new(2);
        model
            .learn(&words(&["the", "cat", "sat", "on", "the", "mat"]))
            .unwrap();
        assert!(model.dictionary().len() > 2);
        assert!(model.forward().len() > 1);
        assert!(model.backward().len() > 1);
    }

    #[test]
    fn forward_root_has_usage_for_each_learned_sentence() {
        let mut model = Model::new(1);
        model.learn(&words(&["a", "b", "c", "d"])).unwrap();
        let root_usage_after_one = model.forward().node(crate::trie::ROOT).usage;
        assert!(root_usage_after_one > 0);
        model.learn(&words(&["a", "b", "c", "d"])).unwrap();
        let root_usage_after_two = model.forward().node(crate::trie::ROOT).usage;
        assert!(root_usage_after_two > root_usage_after_one);
    }

    #[test]
    #[should_panic(expected = "order must be in 1..=15")]
    fn order_zero_panics() {
        Model::new(0);
    }
}
