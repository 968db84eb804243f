use std::str::FromStr;

use crate::models::lookup::LookupTable;
use crate::models::record::{fields, FeatureRecord};
use crate::models::{Accuracy, LayerKind, Rank, SelectionProfile};
use crate::rules::buffers::cnddb_buffer;

/// Per-run tallies reported after classification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RankTally {
    pub endangered: usize,
    pub threatened: usize,
    pub sensitive: usize,
    pub other: usize,
}

impl RankTally {
    pub fn record(&mut self, rank: Option<&str>) {
        match rank.and_then(|r| Rank::from_str(r).ok()) {
            Some(Rank::Endangered) => self.endangered += 1,
            Some(Rank::Threatened) => self.threatened += 1,
            Some(Rank::Sensitive) => self.sensitive += 1,
            None => self.other += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.endangered + self.threatened + self.sensitive + self.other
    }
}

/// Classifies one dataset category's records against the lookup table.
///
/// Construction fails for categories the selector never classifies
/// (Local, NOAA, Condor — those arrive pre-classified).
pub struct Classifier<'a> {
    kind: LayerKind,
    profile: SelectionProfile,
    table: &'a LookupTable,
    source: String,
}

impl<'a> Classifier<'a> {
    pub fn new(kind: LayerKind, table: &'a LookupTable, pull_date: &str) -> Option<Self> {
        let profile = kind.selection_profile()?;
        Some(Self {
            kind,
            profile,
            table,
            source: profile.source_description(pull_date),
        })
    }

    /// Whether a projected record belongs in the selection at all.
    /// Mirrors the attribute queries run against each source dataset.
    pub fn selected(&self, rec: &FeatureRecord) -> bool {
        let name = rec.text_or_empty(self.profile.sci_name_field);
        let allowed = self.table.allows(name, self.kind.ch_rows_only());

        match self.kind {
            LayerKind::Tesp => {
                let accepted = rec.text_or_empty("ACCEPTED_SCIENTIFIC_NAME");
                allowed
                    || (self.table.allows(accepted, false)
                        && rec.text_or_empty("PLANT_FOUND") == "YES")
            }
            LayerKind::WildlifeSites => {
                allowed
                    && rec.float("ASSOC_OBS").unwrap_or(0.0) > 0.0
                    && !rec.text_or_empty("SITE_NAME").contains("Study")
            }
            LayerKind::WildlifeObservations => {
                allowed
                    && (rec.is_null("TOTAL_DETECTED")
                        || rec.float("TOTAL_DETECTED").unwrap_or(0.0) > 0.0)
            }
            LayerKind::Cnddb => {
                allowed
                    && name != "Gymnogyps californianus"
                    && rec.text_or_empty("PRESENCE") == "Presumed Extant"
                    && Accuracy::from_str(rec.text_or_empty("ACCURACY")).is_ok()
            }
            _ => allowed,
        }
    }

    /// Populate the derived attribute set in place. Records matching no
    /// lookup row keep their rank unset and fall into the Other bucket;
    /// that is expected, not an error.
    pub fn classify(&self, rec: &mut FeatureRecord) {
        let sci = rec.text_or_empty(self.profile.sci_name_field).to_string();
        let common = rec
            .text_or_empty(self.profile.common_name_field)
            .to_string();

        rec.set_text(fields::SOURCEFIRE, self.source.clone());
        rec.set_text(fields::SNAME_FIRE, sci.clone());
        rec.set_text(fields::CNAME_FIRE, common);
        rec.set_text(fields::CMNT_FIRE, " ");

        match self.kind {
            LayerKind::CriticalHabitatLines | LayerKind::CriticalHabitatPolygons => {
                self.classify_critical_habitat(rec, &sci)
            }
            LayerKind::Cnddb => self.classify_cnddb(rec, &sci),
            _ => self.classify_general(rec, &sci),
        }
    }

    /// General branch: first unconditional or forest-matching row wins;
    /// a row restricted to a different forest assigns its rank with a
    /// provisional 0 ft buffer and scanning continues, so a later
    /// unconditional match may still override. Lookup-table row order is
    /// significant.
    fn classify_general(&self, rec: &mut FeatureRecord, sci: &str) {
        let forest = self
            .profile
            .forest_field
            .map(|f| rec.text_or_empty(f).to_string())
            .unwrap_or_default();

        let mut buffer_feet = 1.0;
        for row in self.table.rows() {
            if !row.matches(sci) {
                continue;
            }
            if row.is_unrestricted() || row.forest_restriction == forest {
                rec.set_text(fields::GRANK_FIRE, row.rank.clone());
                buffer_feet = row.buffer_feet();
                break;
            }
            rec.set_text(fields::GRANK_FIRE, row.rank.clone());
            buffer_feet = 0.0;
        }

        rec.set_text(fields::INST_FIRE, " ");
        rec.set_buffer_feet(buffer_feet);
    }

    /// Critical Habitat: the buffer is fixed by geometry (300 ft for
    /// lines, 0 for polygons); only the rank comes from the table.
    fn classify_critical_habitat(&self, rec: &mut FeatureRecord, sci: &str) {
        let buffer_feet = match self.kind {
            LayerKind::CriticalHabitatLines => 300.0,
            _ => 0.0,
        };
        if let Some(row) = self.table.first_match(sci) {
            rec.set_text(fields::GRANK_FIRE, row.rank.clone());
        }
        rec.set_text(fields::INST_FIRE, " ");
        rec.set_buffer_feet(buffer_feet);
    }

    /// CNDDB: rank and species type from the first matching row, buffer
    /// from the accuracy/class table. Records matching no row keep a 0 ft
    /// buffer.
    fn classify_cnddb(&self, rec: &mut FeatureRecord, sci: &str) {
        let accuracy = Accuracy::from_str(rec.text_or_empty("ACCURACY")).ok();

        let mut buffer_feet = 0.0;
        if let Some(row) = self.table.first_match(sci) {
            rec.set_text(fields::GRANK_FIRE, row.rank.clone());
            rec.set_text(fields::SPECIES_TYPE, row.species_type.clone());
            let resolved = cnddb_buffer(accuracy, row);
            buffer_feet = resolved.feet;
            if let Some(instruction) = resolved.instruction {
                rec.set_text(fields::INST_FIRE, instruction);
            }
        }
        rec.set_buffer_feet(buffer_feet);
    }
}
