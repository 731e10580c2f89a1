use crate::cli::AnalyzeArgs;
use crate::error::{CliError, Result};
use rnadesign::core::io::fasta::{FastaFile, FastaRecord};
use rnadesign::core::io::traits::SequenceFile;
use rnadesign::core::metrics::{DistanceMatrix, GroupDiversity, group_diversity, hamming_matrix, lmax_matrix};
use rnadesign::core::models::sequence::Sequence;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

struct LoadedGroup {
    records: Vec<FastaRecord>,
    sequences: Vec<Sequence>,
}

#[derive(Serialize)]
struct VariantRow<'a> {
    id: &'a str,
    group: usize,
    max_lmax: usize,
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let groups = args
        .inputs
        .iter()
        .map(|path| load_group(path))
        .collect::<Result<Vec<_>>>()?;

    let (diversity, written) = analyze(&groups, &args.output)?;

    println!("Analyzed {} group(s).", groups.len());
    println!(
        "  hamming : intra {:.2}, inter {:.2}",
        diversity.mean_intra_hamming, diversity.mean_inter_hamming
    );
    println!(
        "  lmax    : intra {:.2}, inter {:.2}, worst variant {}",
        diversity.mean_intra_lmax,
        diversity.mean_inter_lmax,
        diversity.per_variant_max_lmax.iter().max().copied().unwrap_or(0)
    );
    for path in &written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn load_group(path: &Path) -> Result<LoadedGroup> {
    let parse_error = |source: anyhow::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source,
    };
    let records = FastaFile::read_from_path(path).map_err(|e| parse_error(e.into()))?;
    let sequences = records
        .iter()
        .map(|record| {
            record
                .to_sequence()
                .map_err(|e| parse_error(anyhow::anyhow!("record '{}': {}", record.id, e)))
        })
        .collect::<Result<Vec<_>>>()?;
    info!("Loaded {} sequence(s) from {:?}", sequences.len(), path);
    Ok(LoadedGroup { records, sequences })
}

fn analyze(groups: &[LoadedGroup], output_dir: &Path) -> Result<(GroupDiversity, Vec<PathBuf>)> {
    let group_sequences: Vec<Vec<&Sequence>> = groups
        .iter()
        .map(|g| g.sequences.iter().collect())
        .collect();
    let diversity = group_diversity(&group_sequences);

    let all: Vec<&Sequence> = group_sequences.iter().flatten().copied().collect();
    let labels: Vec<String> = groups
        .iter()
        .flat_map(|g| g.records.iter().map(|r| r.id.clone()))
        .collect();

    std::fs::create_dir_all(output_dir)?;
    let hamming_path = output_dir.join("hamming.csv");
    write_matrix(&hamming_matrix(&all), &labels, &hamming_path)?;
    let lmax_path = output_dir.join("lmax.csv");
    write_matrix(&lmax_matrix(&all), &labels, &lmax_path)?;

    let variants_path = output_dir.join("variants.csv");
    write_variant_rows(groups, &diversity, &variants_path).map_err(|e| CliError::Output {
        path: variants_path.clone(),
        source: e.into(),
    })?;

    Ok((diversity, vec![hamming_path, lmax_path, variants_path]))
}

fn write_matrix(matrix: &DistanceMatrix, labels: &[String], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    matrix
        .write_csv(labels, file)
        .map_err(|e| CliError::Output {
            path: path.to_path_buf(),
            source: e.into(),
        })
}

fn write_variant_rows(
    groups: &[LoadedGroup],
    diversity: &GroupDiversity,
    path: &Path,
) -> std::result::Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    let records = groups
        .iter()
        .enumerate()
        .flat_map(|(g, group)| group.records.iter().map(move |r| (g + 1, r)));
    for ((group, record), &max_lmax) in records.zip(&diversity.per_variant_max_lmax) {
        writer.serialize(VariantRow {
            id: &record.id,
            group,
            max_lmax,
        })?;
    }
    writer.flush()?;
    Ok(())
}
