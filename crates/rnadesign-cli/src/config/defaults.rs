pub struct DefaultsConfig {
    pub wild_type: String,
    pub group_size: usize,
    pub n_groups: usize,
    pub output_dir: String,
    pub rnafold: String,
    pub rnainverse: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            wild_type: "GUGAACUGCCGAGUAGGUAGCUGAUAAC".to_string(),
            group_size: 12,
            n_groups: 1,
            output_dir: "output".to_string(),
            rnafold: "RNAfold".to_string(),
            rnainverse: "RNAinverse".to_string(),
        }
    }
}
