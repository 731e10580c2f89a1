use super::cache::Cache;
use super::config::DesignConfig;
use super::oracle::OracleClient;
use super::progress::ProgressReporter;
use super::state::WildType;
use super::utils::seeding::SeedPlan;

/// Read-only view shared by every stage of one design run.
#[derive(Clone, Copy)]
pub struct DesignContext<'a> {
    pub config: &'a DesignConfig,
    pub client: &'a OracleClient,
    pub wild_type: &'a WildType,
    pub seeds: SeedPlan,
    pub reporter: &'a ProgressReporter<'a>,
    /// Deterministic per-sequence metrics, keyed by operation kind.
    pub metrics: &'a Cache<usize>,
}

impl<'a> DesignContext<'a> {
    pub fn new(
        config: &'a DesignConfig,
        client: &'a OracleClient,
        wild_type: &'a WildType,
        seeds: SeedPlan,
        reporter: &'a ProgressReporter<'a>,
        metrics: &'a Cache<usize>,
    ) -> Self {
        Self {
            config,
            client,
            wild_type,
            seeds,
            reporter,
            metrics,
        }
    }
}
