use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;

use super::model::{
    drop_redundant_lm, normalize_reps, permute_bracketed_reps, AttributeClass, AttributeTable,
    FormatMode, StateDataStore, StateDescriptors, StateId, StoreBuilder,
};
use crate::config::LoadOptions;
use crate::error::LoadError;

lazy_static! {
    static ref PLAIN_ID: Regex = Regex::new(r"\w+").unwrap();
    static ref BRACKETED_ID: Regex = Regex::new(r"\((\s*\d+.){3} [\w?\s]{4}").unwrap();
    static ref STATE_MARKER: Regex = Regex::new(r"State\s+\((\w+)\)").unwrap();
    static ref ALPHA_MARKER: Regex = Regex::new(r"Alpha\s+\((\w+)\)").unwrap();
    static ref TOWER_NAME: Regex = Regex::new(r"2Ms\d+\.EL\d+\.ER\d+\.").unwrap();
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load every attribute class of `tower` from `dir`.
///
/// Missing files are recorded on the store (see
/// [`StateDataStore::missing`]) rather than failing the load; only
/// unreadable files abort it. With `options.parallel` the four classes are
/// read as independent rayon tasks and merged after all of them finished.
pub fn load_tower(dir: &Path, tower: &str, options: LoadOptions) -> Result<StateDataStore, LoadError> {
    let (rm, na, lm, states) = if options.parallel {
        let ((rm, na), (lm, states)) = rayon::join(
            || {
                rayon::join(
                    || load_rm_charges(dir, tower, options),
                    || load_na_reps(dir, tower, options),
                )
            },
            || {
                rayon::join(
                    || load_lm_charges(dir, tower, options),
                    || load_states(dir, tower),
                )
            },
        );
        (rm, na, lm, states)
    } else {
        (
            load_rm_charges(dir, tower, options),
            load_na_reps(dir, tower, options),
            load_lm_charges(dir, tower, options),
            load_states(dir, tower),
        )
    };

    let mut builder = StoreBuilder::new(tower).format(options.format);
    if let Some(table) = present(rm)? {
        builder = builder.rm_charges(table);
    }
    if let Some(table) = present(na)? {
        builder = builder.na_reps(table);
    }
    if let Some(table) = present(lm)? {
        builder = builder.lm_charges(table);
    }
    if let Some(descriptors) = present(states)? {
        builder = builder.descriptors(descriptors);
    }

    let store = builder.build();
    info!(
        "tower {tower}: {} rm charges, {} na reps, {} lm charges, {} state descriptors",
        store.rm_charges().len(),
        store.na_reps().len(),
        store.lm_charges().len(),
        store.descriptors().states.len()
    );
    Ok(store)
}

/// First tower prefix found among the file names of `dir` (sorted by name).
pub fn find_tower_name(dir: &Path) -> Result<Option<String>, LoadError> {
    Ok(find_towers(dir)?.into_iter().next())
}

/// All distinct tower prefixes in `dir`, sorted.
pub fn find_towers(dir: &Path) -> Result<Vec<String>, LoadError> {
    let io_err = |source: io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut towers = BTreeSet::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(m) = name.to_str().and_then(|n| TOWER_NAME.find(n)) {
            towers.insert(m.as_str().to_string());
        }
    }
    Ok(towers.into_iter().collect())
}

/// `<dir>/<tower><suffix>` of one attribute class.
pub fn class_path(dir: &Path, tower: &str, class: AttributeClass) -> PathBuf {
    dir.join(format!("{tower}{}", class.suffix()))
}

// ---------------------------------------------------------------------------
// Per-class loaders
// ---------------------------------------------------------------------------

fn load_rm_charges(
    dir: &Path,
    tower: &str,
    options: LoadOptions,
) -> Result<AttributeTable<Vec<i64>>, LoadError> {
    let text = read_class(dir, tower, AttributeClass::RmCharges)?;
    let parsed = parse_rm_charges(&text, options.format, options.charge_width);
    log_skipped(tower, AttributeClass::RmCharges, parsed.skipped);
    Ok(parsed.table)
}

fn load_na_reps(
    dir: &Path,
    tower: &str,
    options: LoadOptions,
) -> Result<AttributeTable<Vec<i64>>, LoadError> {
    let text = read_class(dir, tower, AttributeClass::NaReps)?;
    let parsed = parse_na_reps(&text, options.format);
    log_skipped(tower, AttributeClass::NaReps, parsed.skipped);
    Ok(parsed.table)
}

fn load_lm_charges(
    dir: &Path,
    tower: &str,
    options: LoadOptions,
) -> Result<AttributeTable<Vec<f64>>, LoadError> {
    let text = read_class(dir, tower, AttributeClass::LmCharges)?;
    let parsed = parse_lm_charges(&text, options.format);
    log_skipped(tower, AttributeClass::LmCharges, parsed.skipped);
    Ok(parsed.table)
}

fn load_states(dir: &Path, tower: &str) -> Result<StateDescriptors, LoadError> {
    let text = read_class(dir, tower, AttributeClass::States)?;
    Ok(parse_state_descriptors(&text))
}

fn read_class(dir: &Path, tower: &str, class: AttributeClass) -> Result<String, LoadError> {
    let path = class_path(dir, tower, class);
    fs::read_to_string(&path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::MissingFile { class, path },
        _ => LoadError::Io { path, source },
    })
}

/// Turn a missing file into `None` so the caller can carry on with the
/// classes that did load.
fn present<T>(result: Result<T, LoadError>) -> Result<Option<T>, LoadError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ LoadError::MissingFile { .. }) => {
            warn!("{err}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn log_skipped(tower: &str, class: AttributeClass, skipped: usize) {
    if skipped > 0 {
        debug!("tower {tower}: skipped {skipped} line(s) in {class}");
    }
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Why a line contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoIdentifier,
    Malformed,
    WrongWidth { found: usize },
}

/// A parsed attribute file plus the number of lines that were skipped.
#[derive(Debug, Clone)]
pub struct Parsed<V> {
    pub table: AttributeTable<V>,
    pub skipped: usize,
}

impl<V> Parsed<V> {
    fn from_lines<F>(text: &str, mut parse_line: F) -> Self
    where
        F: FnMut(&str) -> Result<(StateId, V), SkipReason>,
    {
        let mut table = AttributeTable::new();
        let mut skipped = 0;
        for line in text.lines() {
            match parse_line(line) {
                Ok((id, value)) => table.insert(id, value),
                Err(SkipReason::NoIdentifier) if line.trim().is_empty() => {}
                Err(reason) => {
                    debug!("skipping line ({reason:?}): {line:?}");
                    skipped += 1;
                }
            }
        }
        Parsed { table, skipped }
    }
}

/// Split a line into its state identifier and the text after it.
fn split_identifier(line: &str, format: FormatMode) -> Option<(&str, &str)> {
    let pattern: &Regex = match format {
        FormatMode::Plain => &*PLAIN_ID,
        FormatMode::Bracketed => &*BRACKETED_ID,
    };
    let m = pattern.find(line)?;
    Some((m.as_str(), &line[m.end()..]))
}

fn parse_tokens<'a, T, I>(tokens: I) -> Result<Vec<T>, SkipReason>
where
    T: std::str::FromStr,
    I: Iterator<Item = &'a str>,
{
    tokens
        .map(|tok| tok.parse::<T>().map_err(|_| SkipReason::Malformed))
        .collect()
}

fn parse_fields<T: std::str::FromStr>(rest: &str) -> Result<Vec<T>, SkipReason> {
    parse_tokens(rest.split_whitespace())
}

/// One RM charge record. A line with an identifier but no charges (a header
/// or title) is malformed; a charge count other than `width` is a structural
/// mismatch and is logged.
pub fn parse_rm_line(
    line: &str,
    format: FormatMode,
    width: usize,
) -> Result<(StateId, Vec<i64>), SkipReason> {
    let (id, rest) = split_identifier(line, format).ok_or(SkipReason::NoIdentifier)?;
    let charges: Vec<i64> = parse_fields(rest)?;
    if charges.is_empty() {
        return Err(SkipReason::Malformed);
    }
    if charges.len() != width {
        warn!(
            "state {id}: expected {width} rm charges, found {}; record skipped",
            charges.len()
        );
        return Err(SkipReason::WrongWidth {
            found: charges.len(),
        });
    }
    Ok((id.to_string(), charges))
}

/// One NA rep record, normalized.
///
/// Plain lines take every token after the identifier. Bracketed lines take
/// exactly the first five tokens after the label and ignore the rest of the
/// line; fewer than five integers there makes the line malformed.
pub fn parse_na_line(line: &str, format: FormatMode) -> Result<(StateId, Vec<i64>), SkipReason> {
    let (id, rest) = split_identifier(line, format).ok_or(SkipReason::NoIdentifier)?;
    let reps = match format {
        FormatMode::Plain => parse_fields::<i64>(rest)?,
        FormatMode::Bracketed => {
            let fields: Vec<i64> = parse_tokens(rest.split_whitespace().take(5))?;
            let first: [i64; 5] = fields.try_into().map_err(|_| SkipReason::Malformed)?;
            permute_bracketed_reps(first).to_vec()
        }
    };
    if reps.is_empty() {
        return Err(SkipReason::Malformed);
    }
    Ok((id.to_string(), normalize_reps(&reps)))
}

/// One LM charge record; the plain layout drops the redundant positions.
pub fn parse_lm_line(line: &str, format: FormatMode) -> Result<(StateId, Vec<f64>), SkipReason> {
    let (id, rest) = split_identifier(line, format).ok_or(SkipReason::NoIdentifier)?;
    let mut charges: Vec<f64> = parse_fields(rest)?;
    if format == FormatMode::Plain {
        drop_redundant_lm(&mut charges);
    }
    Ok((id.to_string(), charges))
}

pub fn parse_rm_charges(text: &str, format: FormatMode, width: usize) -> Parsed<Vec<i64>> {
    Parsed::from_lines(text, |line| parse_rm_line(line, format, width))
}

pub fn parse_na_reps(text: &str, format: FormatMode) -> Parsed<Vec<i64>> {
    Parsed::from_lines(text, |line| parse_na_line(line, format))
}

pub fn parse_lm_charges(text: &str, format: FormatMode) -> Parsed<Vec<f64>> {
    Parsed::from_lines(text, |line| parse_lm_line(line, format))
}

// ---------------------------------------------------------------------------
// `.states.all` parsing
// ---------------------------------------------------------------------------

enum Block {
    State(String),
    Alpha(String),
}

/// Parse `State (name)` / `Alpha (name)` blocks.
///
/// Integers on the marker line start the block's vector; following lines
/// made only of integers extend it. An `Alpha` marker inside a `State` block
/// assigns that state to the sector. Anything else is ignored.
pub fn parse_state_descriptors(text: &str) -> StateDescriptors {
    let mut descriptors = StateDescriptors::default();
    let mut current: Option<Block> = None;
    let mut current_state: Option<String> = None;

    for line in text.lines() {
        if let Some(caps) = STATE_MARKER.captures(line) {
            let name = caps[1].to_string();
            let values = integer_tokens(&line[caps.get(0).map_or(0, |m| m.end())..]);
            descriptors.states.insert(name.clone(), values);
            current_state = Some(name.clone());
            current = Some(Block::State(name));
        } else if let Some(caps) = ALPHA_MARKER.captures(line) {
            let name = caps[1].to_string();
            let values = integer_tokens(&line[caps.get(0).map_or(0, |m| m.end())..]);
            descriptors.sectors.insert(name.clone(), values);
            if let Some(state) = current_state.take() {
                descriptors.membership.insert(state, name.clone());
            }
            current = Some(Block::Alpha(name));
        } else if let Ok(values) = parse_fields::<i64>(line) {
            if values.is_empty() {
                continue;
            }
            let target = match &current {
                Some(Block::State(name)) => descriptors.states.get_mut(name),
                Some(Block::Alpha(name)) => descriptors.sectors.get_mut(name),
                None => None,
            };
            if let Some(existing) = target {
                existing.extend(values);
            }
        }
    }
    descriptors
}

/// Integer tokens of a marker line; other tokens are ignored.
fn integer_tokens(rest: &str) -> Vec<i64> {
    rest.split_whitespace()
        .filter_map(|tok| tok.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TOWER: &str = "2Ms1.EL0.ER0.";

    fn rm_line(name: &str, charges: &[i64]) -> String {
        let fields: Vec<String> = charges.iter().map(|c| c.to_string()).collect();
        format!("{name}\t\t {}\n", fields.join("\t "))
    }

    fn write_tower(dir: &Path, rm: &str, na: &str) {
        fs::write(dir.join(format!("{TOWER}rm.u1.all")), rm).unwrap();
        fs::write(dir.join(format!("{TOWER}rm.na.all")), na).unwrap();
    }

    #[test]
    fn test_plain_rm_line() {
        let line = rm_line("s12", &[1, -1, 0, 0, 2, -2, 0, 0, 0, 0, 0, 1]);
        let (id, charges) = parse_rm_line(&line, FormatMode::Plain, 12).unwrap();
        assert_eq!(id, "s12");
        assert_eq!(charges, vec![1, -1, 0, 0, 2, -2, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_rm_wrong_width_is_skipped() {
        let line = rm_line("s1", &[1, 2, 3]);
        assert_eq!(
            parse_rm_line(&line, FormatMode::Plain, 12),
            Err(SkipReason::WrongWidth { found: 3 })
        );
    }

    #[test]
    fn test_malformed_rm_line_skipped_others_load() {
        let mut text = rm_line("a", &[1; 12]);
        text.push_str("b\t\t 1\t x\t 1\t 1\t 1\t 1\t 1\t 1\t 1\t 1\t 1\t 1\n");
        text.push_str("\n");
        text.push_str(&rm_line("c", &[-1; 12]));

        let parsed = parse_rm_charges(&text, FormatMode::Plain, 12);
        let ids: Vec<&str> = parsed.table.ids().collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_rm_line_without_charges_is_malformed() {
        assert_eq!(
            parse_rm_line("Charges", FormatMode::Plain, 12),
            Err(SkipReason::Malformed)
        );
        assert_eq!(
            parse_rm_line("  states\t\t", FormatMode::Plain, 12),
            Err(SkipReason::Malformed)
        );

        let text = format!("Charges\n{}", rm_line("a", &[1; 12]));
        let parsed = parse_rm_charges(&text, FormatMode::Plain, 12);
        assert_eq!(parsed.table.len(), 1);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_plain_na_line_normalizes() {
        let (id, reps) = parse_na_line("s7\t\t-3 \t-4 \t1 \t", FormatMode::Plain).unwrap();
        assert_eq!(id, "s7");
        assert_eq!(reps, vec![3, -4, 1]);
    }

    #[test]
    fn test_na_line_with_bad_value_skipped() {
        assert_eq!(
            parse_na_line("s7\t\t3 \tabc \t1 \t", FormatMode::Plain),
            Err(SkipReason::Malformed)
        );
        assert_eq!(
            parse_na_line("s7", FormatMode::Plain),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn test_bracketed_identifier_and_permutation() {
        let line = "( 1, 2, 3) ab?c   10   11   12   13   -3";
        let (id, reps) = parse_na_line(line, FormatMode::Bracketed).unwrap();
        assert_eq!(id, "( 1, 2, 3) ab?c");
        assert_eq!(reps, vec![13, 3, 11, 12, 10]);
    }

    #[test]
    fn test_bracketed_na_needs_five_fields() {
        let line = "( 1, 2, 3) abcd   10   11";
        assert_eq!(
            parse_na_line(line, FormatMode::Bracketed),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn test_bracketed_na_ignores_text_after_five_fields() {
        let expected = vec![13, 3, 11, 12, 10];
        for line in [
            "( 1, 2, 3) abcd   10   11   12   13   -3   99",
            "( 1, 2, 3) abcd   10   11   12   13   -3   total",
            "( 1, 2, 3) abcd   10   11   12   13   -3 # checked",
        ] {
            let (_, reps) = parse_na_line(line, FormatMode::Bracketed).unwrap();
            assert_eq!(reps, expected, "{line}");
        }

        assert_eq!(
            parse_na_line("( 1, 2, 3) abcd   10   11   x   13   -3", FormatMode::Bracketed),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn test_bracketed_rm_line() {
        let line = "(10,20,30) XY Z  1  0 -1  0  0  0  0  0  0  0  0  2 ";
        let (id, charges) = parse_rm_line(line, FormatMode::Bracketed, 12).unwrap();
        assert_eq!(id, "(10,20,30) XY Z");
        assert_eq!(charges[0], 1);
        assert_eq!(charges[2], -1);
        assert_eq!(charges[11], 2);
    }

    #[test]
    fn test_bracketed_line_without_identifier() {
        assert_eq!(
            parse_rm_line("header line", FormatMode::Bracketed, 12),
            Err(SkipReason::NoIdentifier)
        );
    }

    #[test]
    fn test_lm_line_drops_redundant_positions_in_plain_only() {
        let fields: Vec<String> = (0..20).map(|i| format!("{}.00", i % 10)).collect();
        let line = format!("s1 {}", fields.join(" "));

        let (_, plain) = parse_lm_line(&line, FormatMode::Plain).unwrap();
        assert_eq!(plain.len(), 14);

        let short = "s2 0.50 -0.25 1.00";
        let (_, kept) = parse_lm_line(short, FormatMode::Plain).unwrap();
        assert_eq!(kept, vec![0.5, -0.25, 1.0]);

        let bracketed = format!("( 1, 2, 3) abcd {}", fields.join(" "));
        let (_, all) = parse_lm_line(&bracketed, FormatMode::Bracketed).unwrap();
        assert_eq!(all.len(), 20);
    }

    #[test]
    fn test_state_descriptors() {
        let text = "\
State (s1)  1  0  -1
  2  2
Alpha (S)  4  4  4  0
State (s2)  0  1
Alpha (T)  0  0
  1
garbage line
";
        let d = parse_state_descriptors(text);
        assert_eq!(d.states.get("s1"), Some(&vec![1, 0, -1, 2, 2]));
        assert_eq!(d.states.get("s2"), Some(&vec![0, 1]));
        assert_eq!(d.sectors.get("S"), Some(&vec![4, 4, 4, 0]));
        assert_eq!(d.sectors.get("T"), Some(&vec![0, 0, 1]));
        assert_eq!(d.sector_of("s1"), Some("S"));
        assert_eq!(d.sector_of("s2"), Some("T"));
    }

    #[test]
    fn test_find_tower_name() {
        let temp = TempDir::new().unwrap();
        assert_eq!(find_tower_name(temp.path()).unwrap(), None);

        fs::write(temp.path().join("notes.txt"), "x").unwrap();
        fs::write(temp.path().join("2Ms3.EL1.ER0.rm.u1.all"), "").unwrap();
        fs::write(temp.path().join("2Ms1.EL0.ER2.rm.na.all"), "").unwrap();
        fs::write(temp.path().join("2Ms1.EL0.ER2.rm.u1.all"), "").unwrap();

        assert_eq!(
            find_tower_name(temp.path()).unwrap(),
            Some("2Ms1.EL0.ER2.".to_string())
        );
        assert_eq!(
            find_towers(temp.path()).unwrap(),
            vec!["2Ms1.EL0.ER2.".to_string(), "2Ms3.EL1.ER0.".to_string()]
        );
    }

    #[test]
    fn test_load_tower_records_missing_optional_files() {
        let temp = TempDir::new().unwrap();
        let rm = format!("{}{}", rm_line("x", &[1; 12]), rm_line("y", &[-1; 12]));
        write_tower(temp.path(), &rm, "x\t\t3 \t3 \t\ny\t\t-3 \t3 \t\n");

        let store = load_tower(temp.path(), TOWER, LoadOptions::default()).unwrap();
        assert_eq!(store.tower(), TOWER);
        assert_eq!(store.rm_charges().len(), 2);
        assert_eq!(store.na_reps().get("y"), Some(&vec![3, 3]));
        assert!(!store.is_loaded(AttributeClass::LmCharges));
        assert!(!store.is_loaded(AttributeClass::States));
        assert_eq!(store.missing_required(), None);
    }

    #[test]
    fn test_load_tower_missing_required_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(format!("{TOWER}rm.u1.all")),
            rm_line("x", &[1; 12]),
        )
        .unwrap();

        let store = load_tower(temp.path(), TOWER, LoadOptions::default()).unwrap();
        assert_eq!(store.missing_required(), Some(AttributeClass::NaReps));
    }

    #[test]
    fn test_parallel_load_matches_sequential() {
        let temp = TempDir::new().unwrap();
        let rm: String = (0..30)
            .map(|i| rm_line(&format!("s{i}"), &[i % 3 - 1; 12]))
            .collect();
        let na: String = (0..30).map(|i| format!("s{i}\t\t{} \t3 \t\n", i % 2)).collect();
        write_tower(temp.path(), &rm, &na);
        fs::write(
            temp.path().join(format!("{TOWER}states.all")),
            "State (s0) 1 2\nAlpha (S) 4 4\n",
        )
        .unwrap();

        let sequential = load_tower(temp.path(), TOWER, LoadOptions::default()).unwrap();
        let parallel = load_tower(
            temp.path(),
            TOWER,
            LoadOptions {
                parallel: true,
                ..LoadOptions::default()
            },
        )
        .unwrap();

        let seq: Vec<_> = sequential.rm_charges().iter().collect();
        let par: Vec<_> = parallel.rm_charges().iter().collect();
        assert_eq!(seq, par);
        let seq_na: Vec<_> = sequential.na_reps().iter().collect();
        let par_na: Vec<_> = parallel.na_reps().iter().collect();
        assert_eq!(seq_na, par_na);
        assert_eq!(parallel.descriptors().sector_of("s0"), Some("S"));
    }

    #[test]
    fn test_missing_file_error_message() {
        let temp = TempDir::new().unwrap();
        let err = read_class(temp.path(), TOWER, AttributeClass::NaReps).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile { class: AttributeClass::NaReps, .. }));
        assert!(err.to_string().starts_with("file not found for class .rm.na.all"));
    }

    #[test]
    fn test_parallel_load_propagates_read_error() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(format!("{TOWER}rm.u1.all"))).unwrap();
        fs::write(
            temp.path().join(format!("{TOWER}rm.na.all")),
            "x\t\t3 \t3 \t\n",
        )
        .unwrap();

        for parallel in [true, false] {
            let options = LoadOptions {
                parallel,
                ..LoadOptions::default()
            };
            let result = load_tower(temp.path(), TOWER, options);
            assert!(
                matches!(result, Err(LoadError::Io { .. })),
                "parallel={parallel}: {result:?}"
            );
        }
    }
}
