use super::cache::{CacheKey, FoldCache};
use super::config::OracleCallConfig;
use crate::core::models::sequence::Sequence;
use crate::core::models::structure::Structure;
use crate::core::oracle::{FoldResult, FoldingOracle, OracleError, validate_fold};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use tracing::{debug, trace};

/// The single path through which the pipeline talks to a [`FoldingOracle`].
///
/// Applies the configured retry count and per-call timeout, validates every
/// answer, and memoizes folds in a shared [`FoldCache`]. A timed-out call is
/// abandoned, not cancelled: its worker thread runs to completion in the
/// background and its result is discarded.
#[derive(Clone)]
pub struct OracleClient {
    oracle: Arc<dyn FoldingOracle>,
    cache: Arc<FoldCache>,
    config: OracleCallConfig,
}

impl OracleClient {
    pub fn new(oracle: Arc<dyn FoldingOracle>, config: OracleCallConfig) -> Self {
        Self::with_cache(oracle, Arc::new(FoldCache::new()), config)
    }

    pub fn with_cache(
        oracle: Arc<dyn FoldingOracle>,
        cache: Arc<FoldCache>,
        config: OracleCallConfig,
    ) -> Self {
        Self {
            oracle,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<FoldCache> {
        &self.cache
    }

    pub fn config(&self) -> &OracleCallConfig {
        &self.config
    }

    /// Folds `sequence`, reusing a cached result when one exists.
    pub fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        self.cache
            .get_or_compute(&CacheKey::fold(sequence), || self.fold_uncached(sequence))
    }

    /// Folds `sequence` without consulting or populating the cache.
    pub fn fold_uncached(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        let owned = sequence.clone();
        self.call("fold", move |oracle| {
            let result = oracle.fold(&owned)?;
            validate_fold(&owned, &result)?;
            Ok(result)
        })
    }

    pub fn inverse_fold(&self, target: &Structure) -> Result<Sequence, OracleError> {
        let owned = target.clone();
        self.call("inverse_fold", move |oracle| {
            let sequence = oracle.inverse_fold(&owned)?;
            if sequence.len() != owned.len() {
                return Err(OracleError::InvalidOutput(format!(
                    "inverse fold returned {} bases for a target of length {}",
                    sequence.len(),
                    owned.len()
                )));
            }
            Ok(sequence)
        })
    }

    fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, OracleError>
    where
        T: Send + 'static,
        F: Fn(&dyn FoldingOracle) -> Result<T, OracleError> + Clone + Send + 'static,
    {
        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.call_once(operation, call.clone()) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    debug!(operation, attempt, error = %e, "Oracle call failed.");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| OracleError::Unavailable(format!("no attempt made for {operation}"))))
    }

    fn call_once<T, F>(&self, operation: &'static str, call: F) -> Result<T, OracleError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FoldingOracle) -> Result<T, OracleError> + Send + 'static,
    {
        let Some(limit) = self.config.timeout else {
            return call(self.oracle.as_ref());
        };

        let oracle = Arc::clone(&self.oracle);
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(call(oracle.as_ref()));
        });
        match rx.recv_timeout(limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                trace!(operation, limit_ms = limit.as_millis() as u64, "Oracle call timed out.");
                Err(OracleError::Timeout {
                    operation,
                    limit_ms: limit.as_millis(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(OracleError::Unavailable(format!(
                "worker for {operation} terminated without a result"
            ))),
        }
    }
}
