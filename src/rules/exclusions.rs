use crate::models::lookup::LookupTable;
use crate::models::record::{fields, FeatureRecord};
use crate::models::LayerKind;

/// Forest units where Rana muscosa critical habitat is retained.
const RANA_MUSCOSA_SOUTHERN_UNITS: [&str; 4] = ["0501", "0512", "0502", "0507"];

/// The three forests whose Rana boylii CNDDB records are kept.
const RANA_BOYLII_UNITS: [&str; 3] = ["0507", "0513", "0515"];

/// Deletion tallies reported after the filter pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionTally {
    /// Oncorhynchus kisutch removed from Stanislaus (0516).
    pub coho: usize,
    /// Rana muscosa critical habitat outside the four southern forests.
    pub rana_muscosa: usize,
    /// CNDDB plant records in San Bernardino (0512) below Sensitive.
    pub plants_0512: usize,
    /// CNDDB Rana boylii outside its three-forest allow-list.
    pub rana_boylii: usize,
    /// CNDDB species restricted to a forest other than where found.
    pub unprotected_forest: usize,
}

impl ExclusionTally {
    pub fn total(&self) -> usize {
        self.coho + self.rana_muscosa + self.plants_0512 + self.rana_boylii + self.unprotected_forest
    }

    /// Combine tallies from multiple feature classes in one run.
    pub fn merged(self, other: ExclusionTally) -> ExclusionTally {
        ExclusionTally {
            coho: self.coho + other.coho,
            rana_muscosa: self.rana_muscosa + other.rana_muscosa,
            plants_0512: self.plants_0512 + other.plants_0512,
            rana_boylii: self.rana_boylii + other.rana_boylii,
            unprotected_forest: self.unprotected_forest + other.unprotected_forest,
        }
    }
}

/// Why a record was dropped, for the per-deletion log line.
enum Exclusion {
    Coho,
    RanaMuscosa,
    Plant0512,
    RanaBoylii,
    UnprotectedForest,
}

/// Post-intersection filter pass (runs after `UnitID` is populated).
///
/// Wildlife Observations and Critical Habitat polygons each drop one
/// species in specific forests; CNDDB applies its three-rule filter.
/// Other categories pass through untouched.
pub fn apply_post_intersect(
    kind: LayerKind,
    table: &LookupTable,
    records: &mut Vec<FeatureRecord>,
) -> ExclusionTally {
    let mut tally = ExclusionTally::default();

    records.retain(|rec| {
        let Some(reason) = exclusion_for(kind, table, rec) else {
            return true;
        };
        let species = rec.text_or_empty(fields::SNAME_FIRE);
        let forest = rec.text_or_empty(fields::FORESTNAME);
        match reason {
            Exclusion::Coho => {
                tally.coho += 1;
                tracing::info!(species, forest, "Deleting record: forest not protected");
            }
            Exclusion::RanaMuscosa => {
                tally.rana_muscosa += 1;
                tracing::info!(species, forest, "Deleting record: not a southern forest unit");
            }
            Exclusion::Plant0512 => {
                tally.plants_0512 += 1;
                tracing::info!(species, "Deleting San Bernardino plant record");
            }
            Exclusion::RanaBoylii => {
                tally.rana_boylii += 1;
                tracing::info!(forest, "Deleting Rana boylii record outside target forests");
            }
            Exclusion::UnprotectedForest => {
                tally.unprotected_forest += 1;
                tracing::info!(species, forest, "Deleting record found outside restricted forest");
            }
        }
        false
    });

    tally
}

fn exclusion_for(
    kind: LayerKind,
    table: &LookupTable,
    rec: &FeatureRecord,
) -> Option<Exclusion> {
    let species = rec.text_or_empty(fields::SNAME_FIRE);
    let unit = rec.text_or_empty(fields::UNIT_ID_FS);

    match kind {
        LayerKind::WildlifeObservations => {
            (species == "Oncorhynchus kisutch" && unit == "0516").then_some(Exclusion::Coho)
        }
        LayerKind::CriticalHabitatPolygons => (species == "Rana muscosa"
            && !RANA_MUSCOSA_SOUTHERN_UNITS.contains(&unit))
        .then_some(Exclusion::RanaMuscosa),
        LayerKind::Cnddb => cnddb_exclusion(table, rec, species, unit),
        _ => None,
    }
}

/// CNDDB filter rules, in priority order:
///  (a) plant records in San Bernardino (0512) unless ranked Sensitive;
///  (b) Rana boylii outside its three-forest allow-list;
///  (c) any looked-up species restricted to a forest other than the one
///      it was found in — scan-all, skipping the species rules (a)/(b)
///      already govern. A row restricted to the record's own forest is
///      passed over and scanning continues.
fn cnddb_exclusion(
    table: &LookupTable,
    rec: &FeatureRecord,
    species: &str,
    unit: &str,
) -> Option<Exclusion> {
    if unit == "0512"
        && rec.rank() != Some("Sensitive")
        && rec.text_or_empty(fields::SPECIES_TYPE) == "PLANT"
    {
        return Some(Exclusion::Plant0512);
    }

    if species == "Rana boylii" && !RANA_BOYLII_UNITS.contains(&unit) {
        return Some(Exclusion::RanaBoylii);
    }

    if species == "Rana boylii" || species == "Rana muscosa" {
        return None;
    }

    let forest_upper = rec.text_or_empty(fields::FORESTNAME).to_uppercase();
    for row in table.rows() {
        if !row.matches(species) {
            continue;
        }
        if row.is_unrestricted() {
            return None;
        }
        if row.forest_restriction != forest_upper {
            return Some(Exclusion::UnprotectedForest);
        }
        // Restricted to this very forest: keep looking at later rows.
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lookup::LookupRow;
    use crate::models::record::{FeatureRecord, Geometry};

    fn row(prefix: &str, rank: &str, restriction: &str, species_type: &str) -> LookupRow {
        LookupRow {
            name_prefix: prefix.into(),
            rank: rank.into(),
            buffer_class: "300".into(),
            forest_restriction: restriction.into(),
            species_type: species_type.into(),
            category_flag: String::new(),
        }
    }

    fn rec(species: &str, unit: &str, forest: &str) -> FeatureRecord {
        let mut rec = FeatureRecord::new(1, Geometry::point(0.0, 0.0));
        rec.set_text(fields::SNAME_FIRE, species);
        rec.set_text(fields::UNIT_ID_FS, unit);
        rec.set_text(fields::FORESTNAME, forest);
        rec
    }

    fn empty_table() -> LookupTable {
        LookupTable::from_rows(vec![row("Placeholder", "Sensitive", "", "ANIMAL")])
    }

    #[test]
    fn coho_deleted_only_in_stanislaus() {
        let table = empty_table();
        let mut records = vec![
            rec("Oncorhynchus kisutch", "0516", "Stanislaus National Forest"),
            rec("Oncorhynchus kisutch", "0510", "Six Rivers National Forest"),
        ];
        let tally = apply_post_intersect(LayerKind::WildlifeObservations, &table, &mut records);
        assert_eq!(tally.coho, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(fields::UNIT_ID_FS), Some("0510"));
    }

    #[test]
    fn rana_muscosa_kept_in_southern_units_only() {
        let table = empty_table();
        let mut records = vec![
            rec("Rana muscosa", "0501", "Angeles National Forest"),
            rec("Rana muscosa", "0503", "Eldorado National Forest"),
        ];
        let tally = apply_post_intersect(LayerKind::CriticalHabitatPolygons, &table, &mut records);
        assert_eq!(tally.rana_muscosa, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(fields::UNIT_ID_FS), Some("0501"));
    }

    #[test]
    fn cnddb_deletes_non_sensitive_plants_in_san_bernardino() {
        let table = empty_table();
        let mut kept = rec("Astragalus albens", "0512", "San Bernardino National Forest");
        kept.set_text(fields::GRANK_FIRE, "Sensitive");
        kept.set_text(fields::SPECIES_TYPE, "PLANT");
        let mut dropped = rec("Astragalus albens", "0512", "San Bernardino National Forest");
        dropped.set_text(fields::GRANK_FIRE, "Endangered");
        dropped.set_text(fields::SPECIES_TYPE, "PLANT");
        let mut animal = rec("Ovis canadensis", "0512", "San Bernardino National Forest");
        animal.set_text(fields::GRANK_FIRE, "Endangered");
        animal.set_text(fields::SPECIES_TYPE, "ANIMAL");

        let mut records = vec![kept, dropped, animal];
        let tally = apply_post_intersect(LayerKind::Cnddb, &table, &mut records);
        assert_eq!(tally.plants_0512, 1);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn cnddb_rana_boylii_three_forest_allow_list() {
        let table = empty_table();
        let mut records = vec![
            rec("Rana boylii", "0507", "Los Padres National Forest"),
            rec("Rana boylii", "0513", "Sequoia National Forest"),
            rec("Rana boylii", "0515", "Sierra National Forest"),
            rec("Rana boylii", "0505", "Klamath National Forest"),
        ];
        let tally = apply_post_intersect(LayerKind::Cnddb, &table, &mut records);
        assert_eq!(tally.rana_boylii, 1);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn cnddb_scan_all_deletes_restricted_species_elsewhere() {
        let table = LookupTable::from_rows(vec![row(
            "Arabis macdonaldiana",
            "Endangered",
            "SIX RIVERS",
            "PLANT",
        )]);
        let mut records = vec![
            rec("Arabis macdonaldiana", "0510", "Six Rivers"),
            rec("Arabis macdonaldiana", "0505", "Klamath"),
        ];
        let tally = apply_post_intersect(LayerKind::Cnddb, &table, &mut records);
        assert_eq!(tally.unprotected_forest, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text(fields::FORESTNAME), Some("Six Rivers"));
    }

    #[test]
    fn cnddb_unrestricted_row_keeps_record_everywhere() {
        let table = LookupTable::from_rows(vec![row("Vulpes vulpes necator", "Sensitive", "", "ANIMAL")]);
        let mut records = vec![rec("Vulpes vulpes necator", "0505", "Klamath")];
        let tally = apply_post_intersect(LayerKind::Cnddb, &table, &mut records);
        assert_eq!(tally.total(), 0);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn cnddb_scan_all_skips_species_with_dedicated_rules() {
        // Rana muscosa has a (commented-in-the-source) restriction row but
        // its CNDDB handling is deliberately left to the dedicated rules.
        let table = LookupTable::from_rows(vec![row("Rana muscosa", "Endangered", "ANGELES", "ANIMAL")]);
        let mut records = vec![rec("Rana muscosa", "0505", "Klamath")];
        let tally = apply_post_intersect(LayerKind::Cnddb, &table, &mut records);
        assert_eq!(tally.total(), 0);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn other_categories_pass_through() {
        let table = empty_table();
        let mut records = vec![rec("Oncorhynchus kisutch", "0516", "Stanislaus")];
        let tally = apply_post_intersect(LayerKind::Tesp, &table, &mut records);
        assert_eq!(tally.total(), 0);
        assert_eq!(records.len(), 1);
    }
}
