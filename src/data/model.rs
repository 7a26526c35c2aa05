use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Serialize, Serializer};

/// Identifier of a single matter state, exactly as it appears in the input.
pub type StateId = String;

/// Number of integer charges on a well-formed RM charge line.
pub const DEFAULT_CHARGE_WIDTH: usize = 12;

/// Bracketed NA lines list their five groups in a different order:
/// output position `i` takes input field `BRACKETED_REP_ORDER[i]`.
pub const BRACKETED_REP_ORDER: [usize; 5] = [3, 4, 1, 2, 0];

/// LM charge positions that are redundant in the plain export, highest first
/// so earlier removals don't shift later ones.
pub const LM_REDUNDANT_POSITIONS: [usize; 6] = [17, 15, 13, 11, 9, 7];

// ---------------------------------------------------------------------------
// FormatMode – which export layout a tower was written in
// ---------------------------------------------------------------------------

/// Line layout of the tower files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatMode {
    /// `name<TAB>v1<TAB>v2 ...` – identifier is the first word token.
    #[default]
    Plain,
    /// `( 1, 2, 3) LABL  v1  v2 ...` – parenthesized identifier plus a
    /// 4-character label, as written by the alternate data source.
    Bracketed,
}

// ---------------------------------------------------------------------------
// AttributeClass – one input file per class
// ---------------------------------------------------------------------------

/// The independently loaded attribute categories of a tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AttributeClass {
    RmCharges,
    NaReps,
    LmCharges,
    States,
}

impl AttributeClass {
    /// File name suffix following the tower prefix (which ends in `.`).
    pub fn suffix(self) -> &'static str {
        match self {
            AttributeClass::RmCharges => "rm.u1.all",
            AttributeClass::NaReps => "rm.na.all",
            AttributeClass::LmCharges => "lm.u1.all",
            AttributeClass::States => "states.all",
        }
    }

    /// Pairing cannot run without RM charges and NA reps.
    pub fn is_required(self) -> bool {
        matches!(self, AttributeClass::RmCharges | AttributeClass::NaReps)
    }
}

impl fmt::Display for AttributeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.suffix())
    }
}

// ---------------------------------------------------------------------------
// AttributeTable – insertion-ordered map keyed by state identifier
// ---------------------------------------------------------------------------

/// Per-state values in first-seen order.
///
/// Re-inserting an identifier replaces its value but keeps its original
/// position, so iteration order only depends on the order of first sighting.
#[derive(Debug, Clone)]
pub struct AttributeTable<V> {
    entries: Vec<(StateId, V)>,
    positions: HashMap<StateId, usize>,
}

impl<V> Default for AttributeTable<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<V> AttributeTable<V> {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value of `id`.
    pub fn insert(&mut self, id: StateId, value: V) {
        match self.positions.get(&id) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(id.clone(), self.entries.len());
                self.entries.push((id, value));
            }
        }
    }

    /// Value stored for `id`.
    pub fn get(&self, id: &str) -> Option<&V> {
        self.positions.get(id).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut V> {
        let pos = *self.positions.get(id)?;
        Some(&mut self.entries[pos].1)
    }

    /// Whether `id` has a value.
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Number of identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no identifier.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(id, v)| (id.as_str(), v))
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }
}

impl<V: PartialEq> PartialEq for AttributeTable<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: Eq> Eq for AttributeTable<V> {}

/// Serialized as a map that keeps insertion order.
impl<V: Serialize> Serialize for AttributeTable<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<S: Into<StateId>, V> FromIterator<(S, V)> for AttributeTable<V> {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut table = AttributeTable::new();
        for (id, value) in iter {
            table.insert(id.into(), value);
        }
        table
    }
}

// ---------------------------------------------------------------------------
// Vector helpers
// ---------------------------------------------------------------------------

/// A negative multiple of 3 names the barred partner of a rep that is
/// matched as equivalent, so it collapses onto its positive dimension.
pub fn normalize_rep(dim: i64) -> i64 {
    if dim < 0 && dim % 3 == 0 {
        -dim
    } else {
        dim
    }
}

pub fn normalize_reps(reps: &[i64]) -> Vec<i64> {
    reps.iter().copied().map(normalize_rep).collect()
}

/// Elementwise additive inverse of a charge vector, or `None` when a charge
/// is `i64::MIN` and has no inverse.
pub fn negate(charges: &[i64]) -> Option<Vec<i64>> {
    charges.iter().map(|c| c.checked_neg()).collect()
}

pub fn permute_bracketed_reps(fields: [i64; 5]) -> [i64; 5] {
    BRACKETED_REP_ORDER.map(|i| fields[i])
}

/// Remove the redundant LM positions. Vectors too short to hold the last
/// redundant position are left untouched.
pub fn drop_redundant_lm(charges: &mut Vec<f64>) {
    if charges.len() <= LM_REDUNDANT_POSITIONS[0] {
        return;
    }
    for pos in LM_REDUNDANT_POSITIONS {
        charges.remove(pos);
    }
}

// ---------------------------------------------------------------------------
// StateDescriptors – contents of the optional `.states.all` file
// ---------------------------------------------------------------------------

/// State and sector (Alpha) descriptors. Not used by pairing.
#[derive(Debug, Clone, Default)]
pub struct StateDescriptors {
    /// `State (name)` blocks → integer vector.
    pub states: AttributeTable<Vec<i64>>,
    /// `Alpha (name)` blocks → integer vector.
    pub sectors: AttributeTable<Vec<i64>>,
    /// State name → name of the Alpha block found inside its State block.
    pub membership: AttributeTable<String>,
}

impl StateDescriptors {
    pub fn sector_of(&self, state: &str) -> Option<&str> {
        self.membership.get(state).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// StateDataStore – everything loaded for one tower
// ---------------------------------------------------------------------------

/// Parsed attributes of one tower. Immutable once built.
#[derive(Debug, Clone)]
pub struct StateDataStore {
    tower: String,
    format: FormatMode,
    rm_charges: AttributeTable<Vec<i64>>,
    na_reps: AttributeTable<Vec<i64>>,
    lm_charges: AttributeTable<Vec<f64>>,
    descriptors: StateDescriptors,
    missing: BTreeSet<AttributeClass>,
}

impl StateDataStore {
    pub fn builder(tower: impl Into<String>) -> StoreBuilder {
        StoreBuilder::new(tower)
    }

    /// Tower prefix, e.g. `2Ms1.EL0.ER0.`.
    pub fn tower(&self) -> &str {
        &self.tower
    }

    /// Layout the files were parsed with.
    pub fn format(&self) -> FormatMode {
        self.format
    }

    /// RM charge vectors; the iteration order drives pairing order.
    pub fn rm_charges(&self) -> &AttributeTable<Vec<i64>> {
        &self.rm_charges
    }

    /// Normalized NA representation vectors.
    pub fn na_reps(&self) -> &AttributeTable<Vec<i64>> {
        &self.na_reps
    }

    /// LM charges; empty when the file was missing.
    pub fn lm_charges(&self) -> &AttributeTable<Vec<f64>> {
        &self.lm_charges
    }

    /// Contents of `.states.all`; empty when the file was missing.
    pub fn descriptors(&self) -> &StateDescriptors {
        &self.descriptors
    }

    /// Whether the file of `class` was found.
    pub fn is_loaded(&self, class: AttributeClass) -> bool {
        !self.missing.contains(&class)
    }

    /// Classes whose file was not found.
    pub fn missing(&self) -> impl Iterator<Item = AttributeClass> + '_ {
        self.missing.iter().copied()
    }

    /// First required class that is missing, if any.
    pub fn missing_required(&self) -> Option<AttributeClass> {
        self.missing().find(|c| c.is_required())
    }

    /// Number of states carrying an RM charge vector.
    pub fn len(&self) -> usize {
        self.rm_charges.len()
    }

    /// Whether no state carries RM charges.
    pub fn is_empty(&self) -> bool {
        self.rm_charges.is_empty()
    }
}

/// Assembles a [`StateDataStore`]. Any class never supplied is recorded as
/// missing.
#[derive(Debug)]
pub struct StoreBuilder {
    tower: String,
    format: FormatMode,
    rm_charges: Option<AttributeTable<Vec<i64>>>,
    na_reps: Option<AttributeTable<Vec<i64>>>,
    lm_charges: Option<AttributeTable<Vec<f64>>>,
    descriptors: Option<StateDescriptors>,
}

impl StoreBuilder {
    pub fn new(tower: impl Into<String>) -> Self {
        Self {
            tower: tower.into(),
            format: FormatMode::Plain,
            rm_charges: None,
            na_reps: None,
            lm_charges: None,
            descriptors: None,
        }
    }

    /// Defaults to [`FormatMode::Plain`].
    pub fn format(mut self, format: FormatMode) -> Self {
        self.format = format;
        self
    }

    pub fn rm_charges(mut self, table: AttributeTable<Vec<i64>>) -> Self {
        self.rm_charges = Some(table);
        self
    }

    /// Reps are normalized on the way in, whatever produced them.
    pub fn na_reps(mut self, table: AttributeTable<Vec<i64>>) -> Self {
        let normalized: AttributeTable<Vec<i64>> = table
            .iter()
            .map(|(id, reps)| (id.to_string(), normalize_reps(reps)))
            .collect();
        self.na_reps = Some(normalized);
        self
    }

    pub fn lm_charges(mut self, table: AttributeTable<Vec<f64>>) -> Self {
        self.lm_charges = Some(table);
        self
    }

    pub fn descriptors(mut self, descriptors: StateDescriptors) -> Self {
        self.descriptors = Some(descriptors);
        self
    }

    /// Finish the store, marking every class never supplied as missing.
    pub fn build(self) -> StateDataStore {
        let mut missing = BTreeSet::new();
        for (class, present) in [
            (AttributeClass::RmCharges, self.rm_charges.is_some()),
            (AttributeClass::NaReps, self.na_reps.is_some()),
            (AttributeClass::LmCharges, self.lm_charges.is_some()),
            (AttributeClass::States, self.descriptors.is_some()),
        ] {
            if !present {
                missing.insert(class);
            }
        }

        StateDataStore {
            tower: self.tower,
            format: self.format,
            rm_charges: self.rm_charges.unwrap_or_default(),
            na_reps: self.na_reps.unwrap_or_default(),
            lm_charges: self.lm_charges.unwrap_or_default(),
            descriptors: self.descriptors.unwrap_or_default(),
            missing,
        }
    }
}
