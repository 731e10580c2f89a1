use rnadesign::engine::config::DesignConfig;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct OracleSettings {
    pub rnafold: PathBuf,
    pub rnainverse: PathBuf,
    pub temperature: Option<f64>,
}

pub struct AppConfig {
    pub core_config: DesignConfig,
    pub output_dir: PathBuf,
    pub cache_file: Option<PathBuf>,
    pub oracle: OracleSettings,
}
