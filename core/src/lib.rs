//! megahal-core
//!
//! A variable-order Markov conversation engine: a shared dictionary, a pair
//! of forward/backward tries built from tokenized utterances, and
//! keyword-steered reply generation over both trees. Trained state
//! round-trips through a small fixed binary brain-file format.
//!
//! Public API:
//! - [`Brain`]: owns a trained [`Model`] plus the ban/aux/swap word lists
//!   and [`ReplyConfig`] that shape reply generation; [`Brain::learn`] and
//!   [`Brain::reply`] are the two entry points most callers need.
//! - [`Model`]: the trained dictionary + forward/backward trie pair, for
//!   callers that want lower-level access (scripted training, inspection).
//! - [`persistence::save`]/[`persistence::load`]: brain-file I/O.

pub mod dictionary;
pub mod error;
pub mod keywords;
pub mod model;
pub mod persistence;
pub mod reply;
pub mod tokenizer;
pub mod trie;

pub use dictionary::{Dictionary, Symbol, WordBuf, WordSet};
pub use error::{Error, Result};
pub use keywords::Swap;
pub use model::Model;
pub use reply::{Clock, Rng, StdRng, SystemClock};

use std::time::Duration;

/// Reply generation's two tunables: how long to keep searching for a good
/// reply, and the PRNG driving every random choice along the way.
///
/// Unlike a persisted application config, this isn't meant to be loaded
/// from a file: it's constructed programmatically by the embedding
/// application, which supplies its own seeded PRNG when it wants
/// deterministic replies.
pub struct ReplyConfig {
    pub timeout: Duration,
    pub rng: Box<dyn Rng>,
}

impl std::fmt::Debug for ReplyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyConfig").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl Default for ReplyConfig {
    fn default() -> Self {
        ReplyConfig {
            timeout: reply::DEFAULT_TIMEOUT,
            rng: Box::new(StdRng::from_entropy()),
        }
    }
}

/// A trained model plus the surrounding state reply generation needs:
/// banned words, auxiliary (only-key-once-anchored) words, a swap list, and
/// the timeout/RNG pair in [`ReplyConfig`].
///
/// This bundles what the original C implementation kept in global statics
/// (`pers->ban`, `pers->aux`, `pers->swap`, `pers->used_key`) into one owned
/// value, so a process can hold more than one independent brain.
pub struct Brain {
    model: Model,
    ban: WordSet,
    aux: WordSet,
    swap: Swap,
    config: ReplyConfig,
}

impl Brain {
    /// A fresh, untrained brain of the given context order (1..=15).
    pub fn new(order: u8) -> Self {
        Brain {
            model: Model::new(order),
            ban: WordSet::new(),
            aux: WordSet::new(),
            swap: Swap::new(),
            config: ReplyConfig::default(),
        }
    }

    pub fn with_config(order: u8, config: ReplyConfig) -> Self {
        Brain {
            model: Model::new(order),
            ban: WordSet::new(),
            aux: WordSet::new(),
            swap: Swap::new(),
            config,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn ban_mut(&mut self) -> &mut WordSet {
        &mut self.ban
    }

    pub fn aux_mut(&mut self) -> &mut WordSet {
        &mut self.aux
    }

    pub fn swap_mut(&mut self) -> &mut Swap {
        &mut self.swap
    }

    pub fn config_mut(&mut self) -> &mut ReplyConfig {
        &mut self.config
    }

    /// Tokenize `utterance` and train both directions of the model on it.
    /// Utterances with `order` or fewer words teach nothing and are a no-op
    /// (see [`model::Model::learn`]).
    pub fn learn(&mut self, utterance: &str) -> Result<()> {
        let words = tokenizer::tokenize(utterance);
        let dict_size_before = self.model.vocab_len();
        self.model.learn(&words)?;
        tracing::debug!(
            words = words.len(),
            dictionary_size = self.model.vocab_len(),
            symbols_added = self.model.vocab_len() - dict_size_before,
            "learned from utterance"
        );
        Ok(())
    }

    /// Generate a reply to `utterance`. Never fails: an untrained model or
    /// a timed-out search yields one of the two user-visible fallback
    /// strings rather than an `Err`.
    pub fn reply(&mut self, utterance: &str) -> String {
        let words = tokenizer::tokenize(utterance);
        let clock = SystemClock;
        let timeout = self.config.timeout;
        let output = reply::generate_reply(
            &mut self.model,
            &self.ban,
            &self.aux,
            &self.swap,
            &words,
            self.config.rng.as_mut(),
            &clock,
            timeout,
        );
        tracing::debug!(reply_len = output.len(), "generated reply");
        output
    }

    /// Load a brain file, keeping this brain's ban/aux/swap/config and
    /// replacing only the trained model.
    pub fn load<R: std::io::Read>(&mut self, reader: &mut R) -> Result<()> {
        match persistence::load(reader) {
            Ok(model) => {
                self.model = model;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected brain file");
                Err(e)
            }
        }
    }

    pub fn save<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        persistence::save(&self.model, writer)
    }
}
