//! Association networks linking mutations to splicing events
//!
//! Each surviving junction row becomes one network for its representative
//! gene: the splicing event with its per-sample counts, plus one link per
//! known mutation in the cohort. Every mutation is linked regardless of
//! local carrier support, since the scan tests associations across the
//! whole cohort and absence of carrier reads is itself informative.
//!
//! Networks are kept in memory for the scoring passes and mirrored to an
//! append-only JSON-lines store that survives the run in debug mode.

use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};

use hashbrown::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;

use config::{
    SavError, SplicingClass, GENE_1, GENE_2, IS_INFRAME, JUNCTION_COLUMNS, MISSING_FIELD,
    SJ_CHROM, SJ_COUNTS, SJ_END, SJ_START, SPLICING_CLASS,
};

use crate::core::cohort::Cohort;
use crate::utils::resolve_header;

/// One anomalous splicing outcome with its per-sample read counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplicingEvent {
    pub splicing_key: String,
    pub splicing_class: SplicingClass,
    pub is_inframe: String,
    pub counts: Vec<f64>,
}

/// One mutation paired with the network's splicing event
///
/// The descriptive fields stay empty in a trans scan; they are kept so
/// the output schema matches cohort reports that do carry motif-level
/// annotation, rendered as a placeholder when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub mutation_key: String,
    pub carriers: Vec<usize>,
    pub motif_pos: Option<String>,
    pub mutation_type: Option<String>,
    pub is_canonical: Option<String>,
}

/// All links of one gene for one junction row, with the cohort context
/// needed to score any of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub gene: String,
    pub samples: Vec<String>,
    pub weights: Vec<f64>,
    pub event: SplicingEvent,
    pub links: Vec<Link>,
}

fn accession_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(N[MR]_\d+\)").expect("static pattern"))
}

/// Picks the representative gene symbol for a junction row
///
/// Both gene columns are pooled, split on ';', deduplicated and sorted
/// so the tie-break is deterministic. Symbols annotated with a curated
/// transcript accession win over bare ones, then symbols without a
/// hyphen win over readthrough names, then the first in sorted order is
/// taken and any accession suffix is stripped.
///
/// # Example
///
/// ```rust, no_run
/// use savscan::core::network::select_gene;
///
/// let gene = select_gene("AAGAB;TP53(NM_000546)", "---");
/// assert_eq!(gene.as_deref(), Some("TP53"));
/// ```
pub fn select_gene(gene_one: &str, gene_two: &str) -> Option<String> {
    let mut genes: Vec<&str> = gene_one.split(';').chain(gene_two.split(';')).collect();
    genes.sort_unstable();
    genes.dedup();
    genes.retain(|gene| !gene.is_empty() && *gene != MISSING_FIELD);

    if genes.is_empty() {
        return None;
    }

    let accessioned: Vec<&str> = genes
        .iter()
        .copied()
        .filter(|gene| gene.find("(NM_").map_or(false, |pos| pos > 0))
        .collect();
    let candidates = if accessioned.is_empty() {
        genes
    } else {
        accessioned
    };

    let plain: Vec<&str> = candidates
        .iter()
        .copied()
        .filter(|gene| !gene.contains('-'))
        .collect();
    let pool = if plain.is_empty() { candidates } else { plain };

    let symbol = accession_pattern().replace_all(pool[0], "").into_owned();

    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}

/// Builds one network per usable junction row
///
/// Rows outside the scanned splicing classes, below the support
/// threshold, or caught by the zero filter are dropped silently;
/// malformed rows (count arity mismatch, unparseable counts,
/// unresolvable gene) are skipped with a warning and never abort the
/// run.
///
/// # Arguments
///
/// * `path` - merged, annotated junction table
/// * `cohort` - the cohort the counts must align with
/// * `sj_num_thres` - keep a row only if some sample reaches this count
/// * `zero_filter_prob` - if given, drop a row when more than this
///   fraction of mutation-free samples show non-zero support for it
///
/// # Returns
///
/// * `Result<Vec<Network>, SavError>` - networks in table order
pub fn read_networks(
    path: &Path,
    cohort: &Cohort,
    sj_num_thres: usize,
    zero_filter_prob: Option<f64>,
) -> Result<Vec<Network>, SavError> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header_line = lines.next().transpose()?.ok_or_else(|| {
        SavError::Configuration(format!("junction table {:?} has no header line", path))
    })?;
    let header = resolve_header(&header_line, &JUNCTION_COLUMNS)?;

    let support = sj_num_thres as f64;
    let mutated = cohort.mutated_mask();
    let mut networks = Vec::new();
    let mut skipped = 0usize;

    for (offset, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let row = offset + 2; // header is line 1
        let fields: Vec<&str> = line.split('\t').collect();

        match parse_row(&fields, &header, cohort, support, zero_filter_prob, &mutated, row) {
            Ok(Some(network)) => networks.push(network),
            Ok(None) => {}
            Err(SavError::DataIntegrity(msg)) => {
                warn!("{}", msg);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed junction rows", skipped);
    }

    Ok(networks)
}

fn parse_row(
    fields: &[&str],
    header: &HashMap<String, usize>,
    cohort: &Cohort,
    support: f64,
    zero_filter_prob: Option<f64>,
    mutated: &[bool],
    row: usize,
) -> Result<Option<Network>, SavError> {
    let class_field = junction_field(fields, header[SPLICING_CLASS], SPLICING_CLASS, row)?;
    let splicing_class: SplicingClass = match class_field.parse() {
        Ok(class) => class,
        Err(_) => return Ok(None), // INFO: outside the scanned classes -> not an anomaly
    };

    let counts_field = junction_field(fields, header[SJ_COUNTS], SJ_COUNTS, row)?;
    let counts = parse_counts(counts_field, row)?;
    if counts.len() != cohort.len() {
        return Err(SavError::DataIntegrity(format!(
            "junction line {} carries {} counts for {} samples",
            row,
            counts.len(),
            cohort.len()
        )));
    }

    // INFO: support filter -> at least one sample must reach the threshold
    if !counts.iter().any(|&count| count >= support) {
        return Ok(None);
    }

    if let Some(prob) = zero_filter_prob {
        let wild = mutated.iter().filter(|carried| !**carried).count();
        let supported = counts
            .iter()
            .zip(mutated.iter())
            .filter(|(count, carried)| !**carried && **count > 0.0)
            .count();

        // INFO: broad support in mutation-free samples -> not mutation-specific
        if wild > 0 && supported as f64 / wild as f64 > prob {
            return Ok(None);
        }
    }

    let gene_one = junction_field(fields, header[GENE_1], GENE_1, row)?;
    let gene_two = junction_field(fields, header[GENE_2], GENE_2, row)?;
    let gene = select_gene(gene_one, gene_two).ok_or_else(|| {
        SavError::DataIntegrity(format!(
            "junction line {} has no resolvable gene symbol",
            row
        ))
    })?;

    let splicing_key = format!(
        "{}:{}-{}",
        junction_field(fields, header[SJ_CHROM], SJ_CHROM, row)?,
        junction_field(fields, header[SJ_START], SJ_START, row)?,
        junction_field(fields, header[SJ_END], SJ_END, row)?
    );
    let is_inframe = junction_field(fields, header[IS_INFRAME], IS_INFRAME, row)?.to_owned();

    let links = cohort
        .mutations
        .iter()
        .map(|group| Link {
            mutation_key: group.key.clone(),
            carriers: group.carriers.clone(),
            motif_pos: None,
            mutation_type: None,
            is_canonical: None,
        })
        .collect();

    Ok(Some(Network {
        gene,
        samples: cohort.samples.clone(),
        weights: cohort.weights.clone(),
        event: SplicingEvent {
            splicing_key,
            splicing_class,
            is_inframe,
            counts,
        },
        links,
    }))
}

fn junction_field<'a>(
    fields: &[&'a str],
    idx: usize,
    name: &str,
    row: usize,
) -> Result<&'a str, SavError> {
    fields.get(idx).copied().ok_or_else(|| {
        SavError::DataIntegrity(format!("junction line {} has no {} field", row, name))
    })
}

fn parse_counts(field: &str, row: usize) -> Result<Vec<f64>, SavError> {
    field
        .split(',')
        .map(|token| {
            let count = token.trim().parse::<f64>().map_err(|_| {
                SavError::DataIntegrity(format!(
                    "junction line {} has an unparseable count: {}",
                    row, token
                ))
            })?;
            if !count.is_finite() || count < 0.0 {
                return Err(SavError::DataIntegrity(format!(
                    "junction line {} has a negative or non-finite count: {}",
                    row, count
                )));
            }
            Ok(count)
        })
        .collect()
}

/// Append-only JSON-lines persistence for assembled networks
pub struct NetworkStore {
    writer: BufWriter<File>,
}

impl NetworkStore {
    /// opens the store for writing, truncating any previous run
    pub fn create(path: &Path) -> Result<Self, SavError> {
        Ok(NetworkStore {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    /// appends one network as a single JSON line
    pub fn append(&mut self, network: &Network) -> Result<(), SavError> {
        let line = serde_json::to_string(network).map_err(|e| {
            SavError::DataIntegrity(format!("could not serialize network: {}", e))
        })?;
        writeln!(self.writer, "{}", line)?;

        Ok(())
    }

    /// flushes pending records
    pub fn finish(mut self) -> Result<(), SavError> {
        self.writer.flush()?;

        Ok(())
    }

    /// reads a store back in write order
    pub fn read_all(path: &Path) -> Result<Vec<Network>, SavError> {
        let reader = BufReader::new(File::open(path)?);
        let mut networks = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let network = serde_json::from_str(&line).map_err(|e| {
                SavError::DataIntegrity(format!("corrupt network record: {}", e))
            })?;
            networks.push(network);
        }

        Ok(networks)
    }
}
