//! Key encoding for every column family, following the teacher's
//! big-endian, NUL-separated composite-key convention
//! (`common::keys::Pos`/`Var`).

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

/// Relation edge level: direct (1) or transitive grandparent (2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Direct = 1,
    Transitive = 2,
}

impl Level {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(b: u8) -> Option<Level> {
        match b {
            1 => Some(Level::Direct),
            2 => Some(Level::Transitive),
            _ => None,
        }
    }
}

/// `features` CF key: the id verbatim.
pub fn features_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// `relations` CF key: `parent_id \0 level_byte \0 child_id`, so a
/// `prefix_iterator` over `relations_prefix(parent_id)` enumerates a
/// parent's edges, and over `relations_prefix_level(parent_id, level)`
/// enumerates them at one level.
pub fn relations_key(parent_id: &str, level: Level, child_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(parent_id.len() + child_id.len() + 2);
    key.extend_from_slice(parent_id.as_bytes());
    key.push(0);
    key.push(level.as_byte());
    key.push(0);
    key.extend_from_slice(child_id.as_bytes());
    key
}

/// Prefix matching every relation edge (any level, any child) for
/// `parent_id`.
pub fn relations_prefix(parent_id: &str) -> Vec<u8> {
    let mut key = parent_id.as_bytes().to_vec();
    key.push(0);
    key
}

/// Prefix matching relation edges for `parent_id` at exactly `level`.
pub fn relations_prefix_level(parent_id: &str, level: Level) -> Vec<u8> {
    let mut key = relations_prefix(parent_id);
    key.push(level.as_byte());
    key.push(0);
    key
}

/// Extract the child id from a `relations` CF key, given the parent id
/// whose prefix was used to iterate.
pub fn relations_child_from_key(key: &[u8], parent_id: &str) -> String {
    let skip = parent_id.len() + 3;
    String::from_utf8_lossy(&key[skip..]).into_owned()
}

/// `relations_by_child` CF key: `child_id \0 level_byte \0 parent_id`,
/// the mirror of `relations_key` supporting the `parents()` query
/// direction.
pub fn relations_by_child_key(child_id: &str, level: Level, parent_id: &str) -> Vec<u8> {
    relations_key(child_id, level, parent_id)
}

pub fn relations_by_child_prefix(child_id: &str) -> Vec<u8> {
    relations_prefix(child_id)
}

pub fn relations_by_child_prefix_level(child_id: &str, level: Level) -> Vec<u8> {
    relations_prefix_level(child_id, level)
}

pub fn relations_by_child_parent_from_key(key: &[u8], child_id: &str) -> String {
    relations_child_from_key(key, child_id)
}

/// `autoincrements` CF key: the counter key verbatim; value is an 8-byte
/// big-endian `u64`.
pub fn autoincrement_key(counter_key: &str) -> Vec<u8> {
    counter_key.as_bytes().to_vec()
}

pub fn encode_u64(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    buf.write_u64::<BigEndian>(n).expect("writing to a Vec cannot fail");
    buf
}

pub fn decode_u64(bytes: &[u8]) -> u64 {
    BigEndian::read_u64(bytes)
}

/// `directives` CF key: an 8-byte big-endian sequence number, preserving
/// the order directives were encountered in.
pub fn directive_key(seq: u64) -> Vec<u8> {
    encode_u64(seq)
}

/// `bin_index` CF key: `seqid \0 bin_be \0 id`.
pub fn bin_index_key(seqid: &str, bin: u32, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(seqid.len() + 5 + id.len());
    key.extend_from_slice(seqid.as_bytes());
    key.push(0);
    let mut bin_be = [0u8; 4];
    BigEndian::write_u32(&mut bin_be, bin);
    key.extend_from_slice(&bin_be);
    key.push(0);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix matching every `bin_index` entry for `seqid`.
pub fn bin_index_seqid_prefix(seqid: &str) -> Vec<u8> {
    let mut key = seqid.as_bytes().to_vec();
    key.push(0);
    key
}

pub fn bin_index_id_from_key(key: &[u8], seqid: &str) -> String {
    let skip = seqid.len() + 1 + 4 + 1;
    String::from_utf8_lossy(&key[skip..]).into_owned()
}

/// Well-known `meta` CF keys.
pub mod meta {
    pub const VERSION: &[u8] = b"version";
    pub const DIALECT: &[u8] = b"dialect";
    pub const FINALIZED: &[u8] = b"finalized";
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn relations_prefix_iteration_round_trips_child_ids() {
        let key = relations_key("gene1", Level::Direct, "mRNA1");
        assert!(key.starts_with(&relations_prefix("gene1")));
        assert_eq!(relations_child_from_key(&key, "gene1"), "mRNA1");
    }

    #[test]
    fn bin_index_round_trips_id() {
        let key = bin_index_key("chr1", 42, "gene1");
        assert_eq!(bin_index_id_from_key(&key, "chr1"), "gene1");
    }

    #[test]
    fn u64_round_trips() {
        assert_eq!(decode_u64(&encode_u64(12345)), 12345);
    }
}
