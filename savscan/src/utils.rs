//! Shared table plumbing: header resolution, report rows, output writers

use hashbrown::HashMap;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use config::{SavError, SplicingClass, MISSING_FIELD, PERM_HEADER, RESULT_HEADER};

use crate::core::model::LinkScore;
use crate::core::network::{Link, Network};

/// Maps column names to their position in a tab-separated header line
///
/// Columns may appear in any order and extra columns are ignored; a
/// duplicated name resolves to its first occurrence. A missing required
/// column aborts the run.
pub fn resolve_header(line: &str, required: &[&str]) -> Result<HashMap<String, usize>, SavError> {
    let mut header: HashMap<String, usize> = HashMap::new();
    for (idx, name) in line.trim_end().split('\t').enumerate() {
        header.entry(name.trim().to_owned()).or_insert(idx);
    }

    for column in required {
        if !header.contains_key(*column) {
            return Err(SavError::Configuration(format!(
                "required column {} is missing from the header",
                column
            )));
        }
    }

    Ok(header)
}

/// One reportable mutation-event association
#[derive(Debug, Clone, PartialEq)]
pub struct Sav {
    pub gene: String,
    pub mutation_key: String,
    pub motif_pos: Option<String>,
    pub mutation_type: Option<String>,
    pub is_canonical: Option<String>,
    pub splicing_key: String,
    pub splicing_class: SplicingClass,
    pub is_inframe: String,
    pub effect_size: f64,
    pub log_bf: f64,
    pub q_value: Option<f64>,
}

impl Sav {
    /// builds a report row from a scored link
    pub fn from_link(network: &Network, link: &Link, score: &LinkScore) -> Self {
        Sav {
            gene: network.gene.clone(),
            mutation_key: link.mutation_key.clone(),
            motif_pos: link.motif_pos.clone(),
            mutation_type: link.mutation_type.clone(),
            is_canonical: link.is_canonical.clone(),
            splicing_key: network.event.splicing_key.clone(),
            splicing_class: network.event.splicing_class,
            is_inframe: network.event.is_inframe.clone(),
            effect_size: score.effect_size,
            log_bf: score.log_bf,
            q_value: None,
        }
    }

    /// the tab-separated result header line
    pub fn header() -> String {
        RESULT_HEADER.join("\t")
    }

    /// the permutation header line, replicate number first
    pub fn perm_header() -> String {
        PERM_HEADER.join("\t")
    }

    /// renders the result row; absent annotations and q-values print as ---
    pub fn to_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}\t{}",
            self.gene,
            self.mutation_key,
            field_or_missing(&self.motif_pos),
            field_or_missing(&self.mutation_type),
            field_or_missing(&self.is_canonical),
            self.splicing_key,
            self.splicing_class,
            self.is_inframe,
            self.effect_size,
            self.log_bf,
            self.q_value
                .map(|q| format!("{:.4}", q))
                .unwrap_or_else(|| MISSING_FIELD.to_owned()),
        )
    }

    /// renders one row of the pooled permutation report
    pub fn to_perm_row(&self, replicate: usize) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
            replicate,
            self.gene,
            self.mutation_key,
            field_or_missing(&self.motif_pos),
            field_or_missing(&self.mutation_type),
            field_or_missing(&self.is_canonical),
            self.splicing_key,
            self.splicing_class,
            self.is_inframe,
            self.effect_size,
            self.log_bf,
        )
    }
}

fn field_or_missing(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(MISSING_FIELD)
}

/// Writes the final result table, one row per reported association
pub fn write_results(savs: &[Sav], path: &Path) -> Result<(), SavError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "{}", Sav::header())?;
    for sav in savs {
        writeln!(writer, "{}", sav.to_row())?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes every permutation hit with its replicate of origin
pub fn write_permutation_rows(
    replicates: &[(usize, Vec<Sav>)],
    path: &Path,
) -> Result<(), SavError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "{}", Sav::perm_header())?;
    for (replicate, savs) in replicates {
        for sav in savs {
            writeln!(writer, "{}", sav.to_perm_row(*replicate))?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// appends a report suffix to the output prefix
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(prefix.as_os_str());
    path.push(suffix);

    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sav() -> Sav {
        Sav {
            gene: "GENE7".into(),
            mutation_key: "SF3B1:R625H".into(),
            motif_pos: None,
            mutation_type: None,
            is_canonical: None,
            splicing_key: "chr1:100-200".into(),
            splicing_class: SplicingClass::ExonSkipping,
            is_inframe: "in-frame".into(),
            effect_size: 22.0,
            log_bf: 12.63152,
            q_value: None,
        }
    }

    #[test]
    fn test_resolve_header_is_order_independent() {
        let header = resolve_header("Weight\tSample_Name\tExtra", &["Sample_Name", "Weight"])
            .unwrap();

        assert_eq!(header["Sample_Name"], 1);
        assert_eq!(header["Weight"], 0);
        assert_eq!(header["Extra"], 2);
    }

    #[test]
    fn test_resolve_header_names_the_missing_column() {
        let err = resolve_header("Sample_Name\tSJ_File", &["Sample_Name", "Weight"]).unwrap_err();

        assert!(matches!(err, SavError::Configuration(_)));
        assert!(err.to_string().contains("Weight"));
    }

    #[test]
    fn test_resolve_header_first_duplicate_wins() {
        let header = resolve_header("Gene\tGene", &["Gene"]).unwrap();

        assert_eq!(header["Gene"], 0);
    }

    #[test]
    fn test_result_row_renders_missing_fields() {
        let row = test_sav().to_row();
        let fields: Vec<&str> = row.split('\t').collect();

        assert_eq!(fields.len(), RESULT_HEADER.len());
        assert_eq!(fields[2], "---");
        assert_eq!(fields[6], "Exon skipping");
        assert_eq!(fields[8], "22.0000");
        assert_eq!(fields[9], "12.6315");
        assert_eq!(fields[10], "---");
    }

    #[test]
    fn test_result_row_renders_q_value() {
        let mut sav = test_sav();
        sav.q_value = Some(0.0123456);

        let fields: Vec<String> = sav.to_row().split('\t').map(String::from).collect();
        assert_eq!(fields[10], "0.0123");
    }

    #[test]
    fn test_perm_row_leads_with_replicate() {
        let row = test_sav().to_perm_row(3);
        let fields: Vec<&str> = row.split('\t').collect();

        assert_eq!(fields.len(), PERM_HEADER.len());
        assert_eq!(fields[0], "3");
        assert_eq!(fields[10], "12.6315");
    }

    #[test]
    fn test_prefixed_path_appends_suffix() {
        let path = prefixed_path(Path::new("/tmp/run1"), ".savscan.result.txt");

        assert_eq!(path, PathBuf::from("/tmp/run1.savscan.result.txt"));
    }
}
