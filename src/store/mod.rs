//! The embedded, `RocksDB`-backed store: one column family per logical
//! table (`features`, `relations`, `relations_by_child`, `meta`,
//! `directives`, `autoincrements`, `bin_index`).

pub mod keys;

use std::path::{Path, PathBuf};

use rocksdb::{ColumnFamilyDescriptor, IteratorMode, MultiThreaded, Options};

use crate::common::rocks_utils;
use crate::dialect::Dialect;
use crate::error::Error;
use crate::feature::Feature;
use crate::store::keys::Level;

/// This store's `DB` flavour: multi-threaded column family access, the
/// same flavour `rocks_utils::force_compaction_cf` requires.
type Db = rocksdb::DBWithThreadMode<MultiThreaded>;

/// Column family names, in the order they are opened.
pub const CF_FEATURES: &str = "features";
pub const CF_RELATIONS: &str = "relations";
pub const CF_RELATIONS_BY_CHILD: &str = "relations_by_child";
pub const CF_META: &str = "meta";
pub const CF_DIRECTIVES: &str = "directives";
pub const CF_AUTOINCREMENTS: &str = "autoincrements";
pub const CF_BIN_INDEX: &str = "bin_index";

pub const ALL_CFS: &[&str] = &[
    CF_FEATURES,
    CF_RELATIONS,
    CF_RELATIONS_BY_CHILD,
    CF_META,
    CF_DIRECTIVES,
    CF_AUTOINCREMENTS,
    CF_BIN_INDEX,
];

/// The `dbfn` sentinel (`spec.md` §6) requesting an ephemeral store rather
/// than a named destination path.
pub const MEMORY_SENTINEL: &str = ":memory:";

/// The read/write boundary onto a `RocksDB`-backed annotation store.
pub struct Store {
    db: Db,
    path: PathBuf,
    directive_seq: u64,
    /// Backing directory for a [`MEMORY_SENTINEL`] store. `RocksDB` has no
    /// true in-memory mode reachable through this crate's dependency
    /// surface, so `:memory:` is realised as a `tempfile::TempDir` scoped
    /// to the `Store`'s lifetime instead — held here purely so it isn't
    /// cleaned up out from under the open database.
    _tempdir: Option<tempfile::TempDir>,
}

impl Store {
    /// Open (creating if absent) a store at `path` for bulk ingestion,
    /// tuned via [`rocks_utils::tune_options`] exactly as
    /// `tsv::cli::import::run` tunes before import.
    ///
    /// `path == ":memory:"` opens a fresh, ephemeral store backed by a
    /// temporary directory instead of a caller-chosen destination.
    pub fn open_for_write<P: AsRef<Path>>(path: P) -> Result<Store, Error> {
        let (path, tempdir) = if path.as_ref() == Path::new(MEMORY_SENTINEL) {
            let tempdir = tempfile::TempDir::new()?;
            let path = tempdir.path().to_path_buf();
            (path, Some(tempdir))
        } else {
            (path.as_ref().to_path_buf(), None)
        };
        let options = rocks_utils::tune_options(Options::default(), None);
        let cf_descriptors = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();
        let db = Db::open_cf_descriptors(&options, &path, cf_descriptors)
            .map_err(|e| Error::RocksDbOpen(path.clone(), e))?;
        Ok(Store { db, path, directive_seq: 0, _tempdir: tempdir })
    }

    /// Reopen an existing, finalised store read-only, in the
    /// `tsv::cli::query::open_rocksdb` style.
    pub fn open_for_read<P: AsRef<Path>>(path: P) -> Result<Store, Error> {
        let path = path.as_ref().to_path_buf();
        let options = Options::default();
        let cf_names = Db::list_cf(&options, &path).map_err(|e| Error::RocksDbOpen(path.clone(), e))?;
        let db = Db::open_cf_for_read_only(&options, &path, cf_names, false)
            .map_err(|e| Error::RocksDbOpen(path.clone(), e))?;
        let store = Store { db, path, directive_seq: 0, _tempdir: None };
        store.require_finalized()?;
        Ok(store)
    }

    fn require_finalized(&self) -> Result<(), Error> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, keys::meta::FINALIZED)? {
            Some(_) => Ok(()),
            None => Err(Error::NotFinalized(self.path.clone())),
        }
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, Error> {
        // Every CF in `ALL_CFS` is created at `open_for_write` time and
        // reopened by name at `open_for_read` time; a lookup miss here is
        // a programming error, not a runtime condition callers recover
        // from (the teacher's `force_compaction_cf` treats the same
        // invariant the same way).
        Ok(self.db.cf_handle(name).unwrap_or_else(|| panic!("missing column family {name}")))
    }

    /// Insert or overwrite a feature row, keyed by its id.
    pub fn put_feature(&self, feature: &Feature) -> Result<(), Error> {
        let cf = self.cf(CF_FEATURES)?;
        let value = serde_json::to_vec(feature)?;
        self.db.put_cf(cf, keys::features_key(&feature.id), value)?;
        Ok(())
    }

    /// Fetch a feature by id.
    pub fn get_feature(&self, id: &str) -> Result<Option<Feature>, Error> {
        let cf = self.cf(CF_FEATURES)?;
        match self.db.get_cf(cf, keys::features_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Whether `id` already exists in `features`.
    pub fn has_feature(&self, id: &str) -> Result<bool, Error> {
        let cf = self.cf(CF_FEATURES)?;
        Ok(self.db.get_cf(cf, keys::features_key(id))?.is_some())
    }

    /// Insert a relation edge, ignoring it if it already exists
    /// (duplicate-ignore semantics for both passes' edge emission).
    pub fn put_relation(&self, parent_id: &str, child_id: &str, level: Level) -> Result<(), Error> {
        let relations = self.cf(CF_RELATIONS)?;
        let by_child = self.cf(CF_RELATIONS_BY_CHILD)?;
        let fwd = keys::relations_key(parent_id, level, child_id);
        if self.db.get_cf(relations, &fwd)?.is_none() {
            self.db.put_cf(relations, &fwd, [])?;
            self.db.put_cf(by_child, keys::relations_by_child_key(child_id, level, parent_id), [])?;
        }
        Ok(())
    }

    /// All direct (level-1) children of `parent_id`.
    pub fn children(&self, parent_id: &str, level: Level) -> Result<Vec<String>, Error> {
        let cf = self.cf(CF_RELATIONS)?;
        let prefix = keys::relations_prefix_level(parent_id, level);
        let mut out = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(keys::relations_child_from_key(&key, parent_id));
        }
        Ok(out)
    }

    /// All parents of `child_id` at the given level, via the
    /// `relations_by_child` CF.
    pub fn parents(&self, child_id: &str, level: Level) -> Result<Vec<String>, Error> {
        let cf = self.cf(CF_RELATIONS_BY_CHILD)?;
        let prefix = keys::relations_by_child_prefix_level(child_id, level);
        let mut out = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(keys::relations_by_child_parent_from_key(&key, child_id));
        }
        Ok(out)
    }

    /// Append a directive line, preserving encounter order.
    pub fn put_directive(&mut self, directive: &str) -> Result<(), Error> {
        let cf = self.cf(CF_DIRECTIVES)?;
        let key = keys::directive_key(self.directive_seq);
        self.directive_seq += 1;
        self.db.put_cf(cf, key, directive.as_bytes())?;
        Ok(())
    }

    /// All directives, in encounter order.
    pub fn directives(&self) -> Result<Vec<String>, Error> {
        let cf = self.cf(CF_DIRECTIVES)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            out.push(String::from_utf8_lossy(&value).into_owned());
        }
        Ok(out)
    }

    /// Read the current value of an autoincrement counter, `0` if unset.
    pub fn get_autoincrement(&self, counter_key: &str) -> Result<u64, Error> {
        let cf = self.cf(CF_AUTOINCREMENTS)?;
        match self.db.get_cf(cf, keys::autoincrement_key(counter_key))? {
            Some(bytes) => Ok(keys::decode_u64(&bytes)),
            None => Ok(0),
        }
    }

    /// Persist an autoincrement counter's current value.
    pub fn put_autoincrement(&self, counter_key: &str, value: u64) -> Result<(), Error> {
        let cf = self.cf(CF_AUTOINCREMENTS)?;
        self.db.put_cf(cf, keys::autoincrement_key(counter_key), keys::encode_u64(value))?;
        Ok(())
    }

    /// Load every persisted counter. Called when opening a store for
    /// write so a second ingestion into the same path resumes counters
    /// monotonically rather than restarting them at zero.
    pub fn load_autoincrements(&self) -> Result<std::collections::HashMap<String, u64>, Error> {
        let cf = self.cf(CF_AUTOINCREMENTS)?;
        let mut out = std::collections::HashMap::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            out.insert(String::from_utf8_lossy(&key).into_owned(), keys::decode_u64(&value));
        }
        Ok(out)
    }

    /// Flush a batch of in-memory counter values to `autoincrements`. The
    /// in-memory counters are a write-through cache; this is its flush
    /// point at finalisation.
    pub fn flush_autoincrements(&self, counters: &std::collections::HashMap<String, u64>) -> Result<(), Error> {
        for (key, value) in counters {
            self.put_autoincrement(key, *value)?;
        }
        Ok(())
    }

    /// Index a feature's `(seqid, bin, id)` in `bin_index`, for region
    /// queries.
    pub fn put_bin_index(&self, feature: &Feature) -> Result<(), Error> {
        let cf = self.cf(CF_BIN_INDEX)?;
        let key = keys::bin_index_key(&feature.seqid, feature.bin, &feature.id);
        self.db.put_cf(cf, key, [])?;
        Ok(())
    }

    /// All feature ids indexed under `seqid`, for the caller to filter by
    /// interval overlap (the bin index narrows candidates; it does not
    /// itself guarantee overlap).
    pub fn ids_for_seqid(&self, seqid: &str) -> Result<Vec<String>, Error> {
        let cf = self.cf(CF_BIN_INDEX)?;
        let prefix = keys::bin_index_seqid_prefix(seqid);
        let mut out = Vec::new();
        for item in self.db.prefix_iterator_cf(cf, &prefix) {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            out.push(keys::bin_index_id_from_key(&key, seqid));
        }
        Ok(out)
    }

    /// All feature ids in the store, for a full canonical-order dump.
    pub fn all_ids(&self) -> Result<Vec<String>, Error> {
        let cf = self.cf(CF_FEATURES)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            out.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(out)
    }

    /// Write the `meta` row and force compaction of all column families.
    /// Only after this call succeeds does [`Store::open_for_read`] accept
    /// the store: an un-finalised store (crash before this point) has no
    /// `meta.finalized` row and reads as invalid.
    pub fn finalize(self, dialect: &Dialect) -> Result<(), Error> {
        let cf = self.cf(CF_META)?;
        self.db.put_cf(cf, keys::meta::VERSION, crate::common::VERSION.as_bytes())?;
        self.db.put_cf(cf, keys::meta::DIALECT, serde_json::to_vec(dialect)?)?;
        self.db.put_cf(cf, keys::meta::FINALIZED, [1u8])?;

        rocks_utils::force_compaction_cf(&self.db, ALL_CFS.iter().copied(), Some("finalising store: "))?;
        Ok(())
    }

    /// Read back the store's recorded dialect, for readers that need to
    /// render features without re-sniffing.
    pub fn meta_dialect(&self) -> Result<Option<Dialect>, Error> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, keys::meta::DIALECT)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Read back the tool version that finalised this store.
    pub fn meta_version(&self) -> Result<Option<String>, Error> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, keys::meta::VERSION)? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }
}
