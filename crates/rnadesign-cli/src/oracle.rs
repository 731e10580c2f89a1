use rand::Rng;
use rnadesign::core::models::sequence::{Base, Sequence};
use rnadesign::core::models::structure::Structure;
use rnadesign::core::oracle::{FoldResult, FoldingOracle, OracleError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
enum ProgramError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while talking to '{program}': {source}")]
    Pipe {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

impl ProgramError {
    fn is_missing(&self) -> bool {
        matches!(self, ProgramError::Spawn { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Folding oracle backed by the ViennaRNA command-line programs.
///
/// Each call spawns a fresh `RNAfold` or `RNAinverse` process and talks to it
/// over stdin/stdout, so the oracle holds no state and is safe to share across
/// worker threads.
#[derive(Debug, Clone)]
pub struct ViennaRnaOracle {
    rnafold: PathBuf,
    rnainverse: PathBuf,
    temperature: Option<f64>,
}

impl ViennaRnaOracle {
    pub fn new(rnafold: impl Into<PathBuf>, rnainverse: impl Into<PathBuf>) -> Self {
        Self {
            rnafold: rnafold.into(),
            rnainverse: rnainverse.into(),
            temperature: None,
        }
    }

    /// Folding temperature in degrees Celsius passed to both programs.
    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Runs `RNAfold --version` to fail fast before a long pipeline starts.
    pub fn check_available(&self) -> Result<String, OracleError> {
        let version = run_program(&self.rnafold, &["--version"], "").map_err(|e| {
            OracleError::Unavailable(e.to_string())
        })?;
        Ok(version.trim().to_string())
    }

    fn temperature_args(&self) -> Vec<String> {
        self.temperature
            .map(|t| vec!["-T".to_string(), t.to_string()])
            .unwrap_or_default()
    }
}

impl FoldingOracle for ViennaRnaOracle {
    fn fold(&self, sequence: &Sequence) -> Result<FoldResult, OracleError> {
        let mut args = vec!["--noPS".to_string(), "-p".to_string()];
        args.extend(self.temperature_args());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        trace!(sequence = %sequence, "Invoking RNAfold.");
        let stdout = run_program(&self.rnafold, &args, &format!("{sequence}\n")).map_err(|e| {
            if e.is_missing() {
                OracleError::Unavailable(e.to_string())
            } else {
                OracleError::Fold {
                    sequence: sequence.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        parse_rnafold_output(&stdout, sequence.len())
    }

    fn inverse_fold(&self, target: &Structure) -> Result<Sequence, OracleError> {
        let start = random_start(target.len(), &mut rand::thread_rng());
        let args = self.temperature_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        trace!(target = %target, start = %start, "Invoking RNAinverse.");
        let stdout = run_program(&self.rnainverse, &args, &format!("{target}\n{start}\n@\n"))
            .map_err(|e| {
                if e.is_missing() {
                    OracleError::Unavailable(e.to_string())
                } else {
                    OracleError::InverseFold {
                        target: target.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;
        parse_rnainverse_output(&stdout, target)
    }
}

fn run_program(program: &Path, args: &[&str], input: &str) -> Result<String, ProgramError> {
    let name = program.display().to_string();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProgramError::Spawn {
            program: name.clone(),
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|source| ProgramError::Pipe {
                program: name.clone(),
                source,
            })?;
    }

    let output = child.wait_with_output().map_err(|source| ProgramError::Pipe {
        program: name.clone(),
        source,
    })?;
    if !output.status.success() {
        return Err(ProgramError::Failed {
            program: name,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn random_start(length: usize, rng: &mut impl Rng) -> String {
    (0..length)
        .map(|_| Base::ALL[rng.gen_range(0..Base::ALL.len())].to_char())
        .collect()
}

/// Parses `RNAfold -p` output.
///
/// The MFE line is the first line whose leading token is a dot-bracket string
/// of the sequence length, followed by the energy in parentheses. Ensemble
/// frequency and diversity come from the trailing summary line.
pub fn parse_rnafold_output(stdout: &str, length: usize) -> Result<FoldResult, OracleError> {
    let invalid = |reason: &str| OracleError::InvalidOutput(format!("RNAfold: {reason}"));

    let (structure, mfe) = stdout
        .lines()
        .find_map(|line| parse_mfe_line(line, length))
        .ok_or_else(|| invalid("no minimum free energy line found"))?;
    let structure: Structure = structure
        .parse()
        .map_err(|e| invalid(&format!("malformed structure: {e}")))?;

    let (confidence, diversity) = stdout
        .lines()
        .find_map(parse_ensemble_line)
        .ok_or_else(|| invalid("no ensemble summary line found"))?;

    debug!(mfe, confidence, diversity, "Parsed RNAfold output.");
    Ok(FoldResult {
        structure,
        mfe,
        confidence,
        ensemble_diversity: Some(diversity),
    })
}

fn parse_mfe_line(line: &str, length: usize) -> Option<(&str, f64)> {
    let line = line.trim();
    let structure = line.get(..length)?;
    if !structure.chars().all(|c| matches!(c, '.' | '(' | ')')) {
        return None;
    }
    let rest = line[length..].trim();
    let energy = rest.strip_prefix('(')?.strip_suffix(')')?;
    let mfe = energy.trim().parse().ok()?;
    Some((structure, mfe))
}

fn parse_ensemble_line(line: &str) -> Option<(f64, f64)> {
    let line = line.trim();
    let frequency = line.strip_prefix("frequency of mfe structure in ensemble")?;
    let (frequency, diversity) = frequency.split_once(';')?;
    let diversity = diversity.trim().strip_prefix("ensemble diversity")?;
    Some((frequency.trim().parse().ok()?, diversity.trim().parse().ok()?))
}

/// Parses `RNAinverse` output: the designed sequence is the first token of the
/// first line of matching length. A `d=` marker means the search ended at a
/// non-zero distance from the target.
pub fn parse_rnainverse_output(stdout: &str, target: &Structure) -> Result<Sequence, OracleError> {
    let failed = |reason: String| OracleError::InverseFold {
        target: target.to_string(),
        reason,
    };

    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.len() == target.len())
        })
        .ok_or_else(|| failed("no designed sequence in output".to_string()))?;

    if let Some((_, distance)) = line.split_once("d=") {
        return Err(failed(format!(
            "search ended at distance {} from target",
            distance.trim()
        )));
    }

    let token = line.split_whitespace().next().unwrap_or_default();
    token
        .to_ascii_uppercase()
        .parse()
        .map_err(|e| failed(format!("designed sequence is invalid: {e}")))
}
