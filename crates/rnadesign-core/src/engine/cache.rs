use crate::core::models::sequence::{Sequence, SequenceError};
use crate::core::models::structure::{Structure, StructureError};
use crate::core::oracle::FoldResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Fold,
    WildTypeLmax,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: OperationKind,
    pub sequence: Sequence,
}

impl CacheKey {
    pub fn fold(sequence: &Sequence) -> Self {
        Self {
            kind: OperationKind::Fold,
            sequence: sequence.clone(),
        }
    }

    pub fn wild_type_lmax(sequence: &Sequence) -> Self {
        Self {
            kind: OperationKind::WildTypeLmax,
            sequence: sequence.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid cache record for '{sequence}': {reason}")]
    InvalidRecord { sequence: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Process-wide memo table shared by every worker.
///
/// Values are computed outside the lock; when two callers race on one key the
/// first insert wins and both observe that value. Failed computations are not
/// stored.
#[derive(Debug)]
pub struct Cache<V> {
    entries: RwLock<HashMap<CacheKey, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> Default for Cache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Inserts `value` unless the key is already present. Returns the stored value.
    pub fn insert(&self, key: CacheKey, value: V) -> V {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert(value).clone()
    }

    pub fn get_or_compute<E, F>(&self, key: &CacheKey, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute()?;
        Ok(self.insert(key.clone(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FoldRecord {
    sequence: String,
    structure: String,
    mfe: f64,
    confidence: f64,
    ensemble_diversity: Option<f64>,
}

pub type FoldCache = Cache<FoldResult>;

impl Cache<FoldResult> {
    /// Writes every fold entry as CSV, sorted by sequence.
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize, CacheError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut records: Vec<FoldRecord> = entries
            .iter()
            .filter(|(key, _)| key.kind == OperationKind::Fold)
            .map(|(key, result)| FoldRecord {
                sequence: key.sequence.to_string(),
                structure: result.structure.to_string(),
                mfe: result.mfe,
                confidence: result.confidence,
                ensemble_diversity: result.ensemble_diversity,
            })
            .collect();
        drop(entries);
        records.sort_by(|a, b| a.sequence.cmp(&b.sequence));

        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        info!(
            entries = records.len(),
            path = %path.as_ref().display(),
            "Saved fold cache."
        );
        Ok(records.len())
    }

    /// Loads fold entries written by [`Cache::save_csv`]. Existing entries are kept.
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize, CacheError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let mut loaded = 0;
        for row in reader.deserialize() {
            let record: FoldRecord = row?;
            let invalid = |reason: String| CacheError::InvalidRecord {
                sequence: record.sequence.clone(),
                reason,
            };
            let sequence: Sequence = record
                .sequence
                .parse()
                .map_err(|e: SequenceError| invalid(e.to_string()))?;
            let structure: Structure = record
                .structure
                .parse()
                .map_err(|e: StructureError| invalid(e.to_string()))?;
            if structure.len() != sequence.len() {
                return Err(CacheError::InvalidRecord {
                    sequence: record.sequence,
                    reason: "structure length differs from sequence length".to_string(),
                });
            }
            self.insert(
                CacheKey::fold(&sequence),
                FoldResult {
                    structure,
                    mfe: record.mfe,
                    confidence: record.confidence,
                    ensemble_diversity: record.ensemble_diversity,
                },
            );
            loaded += 1;
        }
        debug!(loaded, "Loaded fold cache entries.");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fold_result;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn seq(s: &str) -> Sequence {
        s.parse().unwrap()
    }

    #[test]
    fn get_or_compute_computes_once_per_key() {
        let cache: Cache<usize> = Cache::new();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::fold(&seq("ACGU"));
        for _ in 0..3 {
            let value: Result<usize, ()> = cache.get_or_compute(&key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            });
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 1, 1));
    }

    #[test]
    fn failed_computations_are_not_cached() {
        let cache: Cache<usize> = Cache::new();
        let key = CacheKey::fold(&seq("ACGU"));
        let first: Result<usize, &str> = cache.get_or_compute(&key, || Err("boom"));
        assert!(first.is_err());
        let second: Result<usize, &str> = cache.get_or_compute(&key, || Ok(3));
        assert_eq!(second, Ok(3));
    }

    #[test]
    fn keys_are_separated_by_operation_kind() {
        let cache: Cache<usize> = Cache::new();
        let s = seq("GGGAAACCC");
        cache.insert(CacheKey::fold(&s), 1);
        cache.insert(CacheKey::wild_type_lmax(&s), 2);
        assert_eq!(cache.get(&CacheKey::fold(&s)), Some(1));
        assert_eq!(cache.get(&CacheKey::wild_type_lmax(&s)), Some(2));
    }

    #[test]
    fn first_insert_wins() {
        let cache: Cache<usize> = Cache::new();
        let key = CacheKey::fold(&seq("ACGU"));
        assert_eq!(cache.insert(key.clone(), 1), 1);
        assert_eq!(cache.insert(key.clone(), 2), 1);
    }

    #[test]
    fn concurrent_callers_observe_one_value() {
        let cache: Arc<Cache<usize>> = Arc::new(Cache::new());
        let key = CacheKey::fold(&seq("ACGUACGU"));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let key = key.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_compute::<(), _>(&key, || Ok(i))
                        .unwrap()
                })
            })
            .collect();
        let values: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stored = cache.get(&key).unwrap();
        assert!(values.iter().all(|&v| v == stored));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn fold_cache_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folds.csv");
        let cache = FoldCache::new();
        let mut with_diversity = fold_result("(((...)))", -4.2, 0.83);
        with_diversity.ensemble_diversity = Some(1.5);
        cache.insert(CacheKey::fold(&seq("GGGAAACCC")), with_diversity.clone());
        cache.insert(CacheKey::fold(&seq("GCGAAAGCC")), fold_result("(((...)))", -3.0, 0.7));
        assert_eq!(cache.save_csv(&path).unwrap(), 2);

        let restored = FoldCache::new();
        assert_eq!(restored.load_csv(&path).unwrap(), 2);
        assert_eq!(
            restored.get(&CacheKey::fold(&seq("GGGAAACCC"))),
            Some(with_diversity)
        );
    }

    #[test]
    fn load_csv_rejects_mismatched_structure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "sequence,structure,mfe,confidence,ensemble_diversity\nACGU,((.)),-1.0,0.5,\n",
        )
        .unwrap();
        assert!(matches!(
            FoldCache::new().load_csv(&path),
            Err(CacheError::InvalidRecord { .. })
        ));
    }
}
