use crate::core::io::traits::SequenceFile;
use crate::core::models::group::Group;
use crate::core::models::pool::CandidatePool;
use crate::core::models::sequence::{Sequence, SequenceError};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub description: Option<String>,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            sequence: sequence.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parses the record body as an RNA sequence.
    pub fn to_sequence(&self) -> Result<Sequence, SequenceError> {
        self.sequence.parse()
    }
}

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FastaParseErrorKind },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FastaParseErrorKind {
    #[error("Sequence data found before the first header")]
    DataBeforeHeader,
    #[error("Header has an empty identifier")]
    EmptyIdentifier,
    #[error("Record '{id}' has no sequence data")]
    EmptyRecord { id: String },
}

pub struct FastaFile;

impl SequenceFile for FastaFile {
    type Record = FastaRecord;
    type Error = FastaError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error> {
        let mut records = Vec::new();
        let mut current: Option<(FastaRecord, usize)> = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line_num = line_num + 1;
            let line = line_res?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                if let Some((record, header_line)) = current.take() {
                    records.push(finish_record(record, header_line)?);
                }
                let mut parts = header.trim().splitn(2, char::is_whitespace);
                let id = parts.next().unwrap_or("").to_string();
                if id.is_empty() {
                    return Err(FastaError::Parse {
                        line: line_num,
                        kind: FastaParseErrorKind::EmptyIdentifier,
                    });
                }
                let description = parts
                    .next()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                current = Some((
                    FastaRecord {
                        id,
                        description,
                        sequence: String::new(),
                    },
                    line_num,
                ));
            } else {
                match current.as_mut() {
                    Some((record, _)) => record.sequence.push_str(line),
                    None => {
                        return Err(FastaError::Parse {
                            line: line_num,
                            kind: FastaParseErrorKind::DataBeforeHeader,
                        });
                    }
                }
            }
        }

        if let Some((record, header_line)) = current.take() {
            records.push(finish_record(record, header_line)?);
        }
        Ok(records)
    }

    fn write_to(records: &[Self::Record], writer: &mut impl Write) -> Result<(), Self::Error> {
        for record in records {
            match &record.description {
                Some(description) => writeln!(writer, ">{} {}", record.id, description)?,
                None => writeln!(writer, ">{}", record.id)?,
            }
            writeln!(writer, "{}", record.sequence)?;
        }
        Ok(())
    }
}

fn finish_record(record: FastaRecord, header_line: usize) -> Result<FastaRecord, FastaError> {
    if record.sequence.is_empty() {
        return Err(FastaError::Parse {
            line: header_line,
            kind: FastaParseErrorKind::EmptyRecord { id: record.id },
        });
    }
    Ok(record)
}

/// One record per pool member, in acceptance order, annotated with its metrics.
pub fn pool_records(pool: &CandidatePool) -> Vec<FastaRecord> {
    pool.variants()
        .enumerate()
        .map(|(i, variant)| {
            FastaRecord::new(format!("variant_{}", i), variant.sequence.to_string())
                .with_description(variant.annotation())
        })
        .collect()
}

/// Records for one group, identified as `Group{g}_Var{v}` with one-based numbering.
pub fn group_records(pool: &CandidatePool, group: &Group) -> Vec<FastaRecord> {
    group
        .members()
        .iter()
        .filter_map(|&id| pool.get(id))
        .enumerate()
        .map(|(v, variant)| {
            FastaRecord::new(
                format!("Group{}_Var{}", group.index() + 1, v + 1),
                variant.sequence.to_string(),
            )
            .with_description(variant.annotation())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::variant_from;
    use std::io::Cursor;

    #[test]
    fn read_parses_multiline_records_and_descriptions() {
        let input = ">first some notes\nGGGAAA\nCCC\n\n>second\nACGU\n";
        let records = FastaFile::read_from(&mut Cursor::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "first");
        assert_eq!(records[0].description.as_deref(), Some("some notes"));
        assert_eq!(records[0].sequence, "GGGAAACCC");
        assert_eq!(records[1].description, None);
    }

    #[test]
    fn read_rejects_data_before_header() {
        let err = FastaFile::read_from(&mut Cursor::new("ACGU\n>x\nA\n")).unwrap_err();
        assert!(matches!(
            err,
            FastaError::Parse {
                line: 1,
                kind: FastaParseErrorKind::DataBeforeHeader
            }
        ));
    }

    #[test]
    fn read_rejects_empty_record() {
        let err = FastaFile::read_from(&mut Cursor::new(">a\n>b\nACGU\n")).unwrap_err();
        assert!(matches!(
            err,
            FastaError::Parse {
                line: 1,
                kind: FastaParseErrorKind::EmptyRecord { .. }
            }
        ));
    }

    #[test]
    fn written_records_read_back_identically() {
        let records = vec![
            FastaRecord::new("a", "GGGAAACCC").with_description("structure=(((...)))"),
            FastaRecord::new("b", "ACGUACGU"),
        ];
        let mut out = Vec::new();
        FastaFile::write_to(&records, &mut out).unwrap();
        let back = FastaFile::read_from(&mut Cursor::new(out)).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn group_records_use_one_based_identifiers() {
        let pool: CandidatePool = ["AAAA", "CCCC", "GGGG"].into_iter().map(variant_from).collect();
        let ids = pool.ids().to_vec();
        let group = Group::new(1, vec![ids[2], ids[0]]);
        let records = group_records(&pool, &group);
        assert_eq!(records[0].id, "Group2_Var1");
        assert_eq!(records[0].sequence, "GGGG");
        assert_eq!(records[1].id, "Group2_Var2");
        assert_eq!(pool_records(&pool)[2].id, "variant_2");
    }

    #[test]
    fn write_to_path_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.fasta");
        FastaFile::write_to_path(&[FastaRecord::new("x", "ACGU")], &path).unwrap();
        let back = FastaFile::read_from_path(&path).unwrap();
        assert_eq!(back[0].to_sequence().unwrap().to_string(), "ACGU");
    }
}
