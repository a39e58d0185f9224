//! Binary brain-file format: the `MegaHALv8` magic cookie, the trained
//! order, both tries (each written pre-order), then the dictionary.
//!
//! Reference upstream: `save_model`/`load_model`/`save_tree`/`load_tree`/
//! `save_dictionary`/`load_dictionary`/`save_word`/`load_word` in
//! `libmegahal.c`. All integers are little-endian, written
//! with plain `to_le_bytes`/`from_le_bytes` rather than a `byteorder`
//! dependency (the C source's fields are native ints written via raw
//! `fwrite`/`fread`, and nothing in the example pack pulls in `byteorder`
//! for this kind of fixed layout).

use std::io::{Read, Write};

use crate::dictionary::{Dictionary, Symbol, WordBuf};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::trie::{NodeId, Trie};

const MAGIC: &[u8] = b"MegaHALv8";
/// Past this many nested tree levels, a brain file is almost certainly
/// corrupt or adversarial rather than a real deep context; load bails out
/// with `Error::Format` instead of recursing further (the C loader has no
/// such cap and will stack-overflow on a hostile file).
const MAX_TREE_DEPTH: usize = 1024;
/// Dictionary sizes are stored as `u32`, but a high-bit-set value is never
/// produced by a real save and is rejected outright rather than trusted as
/// a word count in the billions.
const MAX_DICTIONARY_FILE_SIZE: u32 = 1 << 31;

pub fn save<W: Write>(model: &Model, writer: &mut W) -> Result<()> {
    writer.write_all(MAGIC)?;
    writer.write_all(&[model.order()])?;
    save_tree(model.forward(), crate::trie::ROOT, writer)?;
    save_tree(model.backward(), crate::trie::ROOT, writer)?;
    save_dictionary(model.dictionary(), writer)?;
    Ok(())
}

fn save_tree<W: Write>(tree: &Trie, node: NodeId, writer: &mut W) -> Result<()> {
    let n = tree.node(node);
    writer.write_all(&n.symbol.to_le_bytes())?;
    writer.write_all(&n.usage.to_le_bytes())?;
    writer.write_all(&n.count.to_le_bytes())?;
    let children = tree.children(node);
    writer.write_all(&(children.len() as u16).to_le_bytes())?;
    for &child in children {
        save_tree(tree, child, writer)?;
    }
    Ok(())
}

fn save_dictionary<W: Write>(dictionary: &Dictionary, writer: &mut W) -> Result<()> {
    writer.write_all(&(dictionary.len() as u32).to_le_bytes())?;
    for (_, word) in dictionary.iter() {
        save_word(word, writer)?;
    }
    Ok(())
}

fn save_word<W: Write>(word: &WordBuf, writer: &mut W) -> Result<()> {
    writer.write_all(&[word.len()])?;
    writer.write_all(word.as_bytes())?;
    Ok(())
}

pub fn load<R: Read>(reader: &mut R) -> Result<Model> {
    let mut magic = [0u8; 9];
    reader.read_exact(&mut magic)?;
    if magic != *MAGIC {
        return Err(Error::Format("not a MegaHAL brain (bad magic cookie)".into()));
    }

    let order = read_u8(reader)?;
    if !(crate::model::MIN_ORDER..=crate::model::MAX_ORDER).contains(&order) {
        return Err(Error::Format(format!("order {order} out of range 1..=15")));
    }

    let mut forward = Trie::empty_for_load();
    load_tree(&mut forward, reader, 0)?;
    let mut backward = Trie::empty_for_load();
    load_tree(&mut backward, reader, 0)?;
    let dictionary = load_dictionary(reader)?;

    Ok(Model::from_parts(order, forward, backward, dictionary))
}

fn load_tree<R: Read>(trie: &mut Trie, reader: &mut R, depth: usize) -> Result<NodeId> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::Format(format!(
            "brain file tree nesting exceeds {MAX_TREE_DEPTH} levels"
        )));
    }

    let symbol: Symbol = read_u16(reader)?;
    let usage = read_u32(reader)?;
    let count = read_u16(reader)?;
    let branch = read_u16(reader)?;

    let id = trie.push_raw(symbol, count, usage);
    let mut children = Vec::with_capacity(branch as usize);
    for _ in 0..branch {
        children.push(load_tree(trie, reader, depth + 1)?);
    }
    trie.set_children(id, children);

    Ok(id)
}

fn load_dictionary<R: Read>(reader: &mut R) -> Result<Dictionary> {
    let size = read_u32(reader)?;
    if size >= MAX_DICTIONARY_FILE_SIZE {
        return Err(Error::Format(format!("dictionary size {size} is not plausible")));
    }
    if size as usize > crate::dictionary::MAX_DICTIONARY_SIZE {
        return Err(Error::Format(format!(
            "dictionary size {size} exceeds the {}-entry id space",
            crate::dictionary::MAX_DICTIONARY_SIZE
        )));
    }

    let mut dictionary = Dictionary::empty_shell();
    for _ in 0..size {
        dictionary.push_loaded(load_word(reader)?);
    }
    Ok(dictionary)
}

fn load_word<R: Read>(reader: &mut R) -> Result<WordBuf> {
    let len = read_u8(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(WordBuf::new(&bytes))
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::WordBuf;

    fn words(strs: &[&str]) -> Vec<WordBuf> {
        strs.iter().map(|s| WordBuf::from_str(s)).collect()
    }

    #[test]
    fn round_trips_a_trained_model() {
        let mut model = Model::new(3);
        model
            .learn(&words(&["the", "quick", "brown", "fox", "jumps", "."]))
            .unwrap();
        model
            .learn(&words(&["the", "lazy", "dog", "sleeps", "all", "day", "."]))
            .unwrap();

        let mut buf = Vec::new();
        save(&model, &mut buf).unwrap();

        let loaded = load(&mut &buf[..]).unwrap();
        assert_eq!(loaded.order(), model.order());
        assert_eq!(loaded.dictionary().len(), model.dictionary().len());
        assert_eq!(loaded.forward().len(), model.forward().len());
        assert_eq!(loaded.backward().len(), model.backward().len());
        assert_eq!(
            loaded.forward().node(crate::trie::ROOT).usage,
            model.forward().node(crate::trie::ROOT).usage
        );
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = b"NotAMegaHALFile!!".to_vec();
        let err = load(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn rejects_out_of_range_order() {
        let mut buf = MAGIC.to_vec();
        buf.push(200); // order
        let err = load(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn rejects_implausible_dictionary_size() {
        let mut model = Model::new(2);
        model.learn(&words(&["a", "b", "c"])).unwrap();
        let mut buf = Vec::new();
        save(&model, &mut buf).unwrap();

        // Corrupt the dictionary size field (last 4-byte-aligned u32 before
        // the word stream) to a value with the high bit set.
        let size_offset = buf.len() - (model.dictionary().iter().map(|(_, w)| 1 + w.len() as usize).sum::<usize>() + 4);
        buf[size_offset..size_offset + 4].copy_from_slice(&(u32::MAX).to_le_bytes());

        let err = load(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn rejects_dictionary_size_past_the_symbol_id_space() {
        let mut model = Model::new(2);
        model.learn(&words(&["a", "b", "c"])).unwrap();
        let mut buf = Vec::new();
        save(&model, &mut buf).unwrap();

        let size_offset = buf.len() - (model.dictionary().iter().map(|(_, w)| 1 + w.len() as usize).sum::<usize>() + 4);
        buf[size_offset..size_offset + 4].copy_from_slice(&70_000u32.to_le_bytes());

        let err = load(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }
}
