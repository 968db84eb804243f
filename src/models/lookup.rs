use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Lookup table {0} has no rows")]
    Empty(String),
}

/// One row of the species summary table. Columns are positional; the file
/// carries no header row. Insertion order is lookup priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRow {
    /// Column 0: scientific-name prefix the record name must start with.
    pub name_prefix: String,
    /// Column 1: rank text written into `GRANK_FIRE` verbatim.
    pub rank: String,
    /// Column 2: buffer distance in feet, or the CNDDB target class
    /// ("300" / "600").
    pub buffer_class: String,
    /// Column 3: forest name restricting the row, empty when unrestricted.
    pub forest_restriction: String,
    /// Column 5: PLANT or ANIMAL.
    pub species_type: String,
    /// Column 6: "CH" marks rows eligible for Critical Habitat selection.
    pub category_flag: String,
}

impl LookupRow {
    /// Prefix match per the deliverable rules: the record's scientific
    /// name starts with the row's prefix, so subspecies variants sharing
    /// a base name keep matching.
    pub fn matches(&self, scientific_name: &str) -> bool {
        scientific_name.starts_with(&self.name_prefix)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.forest_restriction.is_empty()
    }

    pub fn is_critical_habitat(&self) -> bool {
        self.category_flag == "CH"
    }

    /// Buffer distance in feet for the general branch; non-numeric
    /// classes read as 0.
    pub fn buffer_feet(&self) -> f64 {
        self.buffer_class.trim().parse().unwrap_or(0.0)
    }
}

/// The reference table loaded once per run.
#[derive(Debug, Clone)]
pub struct LookupTable {
    rows: Vec<LookupRow>,
}

impl LookupTable {
    /// Load from a comma-separated file with no header row. Short rows are
    /// padded with empty columns; the production tables carry trailing
    /// blanks inconsistently.
    pub fn from_csv_path(path: &Path) -> Result<Self, LookupError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let col = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            rows.push(LookupRow {
                name_prefix: col(0),
                rank: col(1),
                buffer_class: col(2),
                forest_restriction: col(3),
                species_type: col(5),
                category_flag: col(6),
            });
        }

        if rows.is_empty() {
            return Err(LookupError::Empty(path.display().to_string()));
        }

        tracing::info!(
            table = %path.display(),
            rows = rows.len(),
            "Loaded species lookup table"
        );
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<LookupRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[LookupRow] {
        &self.rows
    }

    /// First row whose prefix matches, honoring insertion order.
    pub fn first_match(&self, scientific_name: &str) -> Option<&LookupRow> {
        self.rows.iter().find(|row| row.matches(scientific_name))
    }

    /// Names eligible for selection. Critical Habitat datasets only admit
    /// CH-flagged rows.
    pub fn allow_list(&self, ch_only: bool) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| !ch_only || row.is_critical_habitat())
            .map(|row| row.name_prefix.as_str())
            .collect()
    }

    /// Allow-list membership for selection. Selection compares names
    /// exactly; only classification uses prefix matching.
    pub fn allows(&self, scientific_name: &str, ch_only: bool) -> bool {
        self.rows
            .iter()
            .filter(|row| !ch_only || row.is_critical_habitat())
            .any(|row| row.name_prefix == scientific_name)
    }
}
