use crate::models::enums::str_enum;
use crate::models::{ModelError, Rank};
use serde::{Deserialize, Serialize};

str_enum!(LayerKind {
    Tesp => "TESP",
    WildlifeSites => "Wildlife_Sites",
    WildlifeObservations => "Wildlife_Observations",
    CriticalHabitatLines => "Critical_Habitat_Lines",
    CriticalHabitatPolygons => "Critical_Habitat_Polygons",
    Cnddb => "CNDDB",
    Local => "Local",
    NoaaEsu => "NOAA_ESU",
    CondorNest => "Condor_Nest",
    CondorHacking => "Condor_Hacking",
});

/// Field names and source description for the categories the selector
/// classifies. Local, NOAA and Condor data arrive pre-classified and have
/// no profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionProfile {
    pub sci_name_field: &'static str,
    pub common_name_field: &'static str,
    /// EDW datasets carry the owning forest on each record; the others
    /// learn their forest only at intersection time.
    pub forest_field: Option<&'static str>,
    source_base: &'static str,
}

impl SelectionProfile {
    pub fn source_description(&self, pull_date: &str) -> String {
        format!("{} pulled {}", self.source_base, pull_date)
    }
}

impl LayerKind {
    pub fn selection_profile(&self) -> Option<SelectionProfile> {
        let profile = match self {
            LayerKind::Tesp => SelectionProfile {
                sci_name_field: "SCIENTIFIC_NAME",
                common_name_field: "ACCEPTED_COMMON_NAME",
                forest_field: Some("FS_UNIT_NAME"),
                source_base: "EDW TESP OccurrencesALL_FoundPlant",
            },
            LayerKind::WildlifeSites => SelectionProfile {
                sci_name_field: "SCI_NAME",
                common_name_field: "COMMON_NAME",
                forest_field: Some("FS_UNIT_NAME"),
                source_base: "EDW Wildlife Sites",
            },
            LayerKind::WildlifeObservations => SelectionProfile {
                sci_name_field: "SCIENTIFIC_NAME",
                common_name_field: "COMMON_NAME",
                forest_field: Some("FS_UNIT_NAME"),
                source_base: "EDW OBS FishWildlife",
            },
            LayerKind::CriticalHabitatPolygons | LayerKind::CriticalHabitatLines => {
                SelectionProfile {
                    sci_name_field: "sciname",
                    common_name_field: "comname",
                    forest_field: None,
                    source_base: "FWS Critical Habitat",
                }
            }
            LayerKind::Cnddb => SelectionProfile {
                sci_name_field: "SNAME",
                common_name_field: "CNAME",
                forest_field: None,
                source_base: "CA CNDDB GOV version",
            },
            _ => return None,
        };
        Some(profile)
    }

    /// Categories the selector stage accepts.
    pub fn is_selectable(&self) -> bool {
        self.selection_profile().is_some()
    }

    pub fn is_critical_habitat(&self) -> bool {
        matches!(
            self,
            LayerKind::CriticalHabitatLines | LayerKind::CriticalHabitatPolygons
        )
    }

    /// Critical Habitat selections only admit CH-flagged lookup rows.
    pub fn ch_rows_only(&self) -> bool {
        self.is_critical_habitat()
    }

    /// Intersector categories that loop over every feature class in a
    /// source workspace instead of taking a single input.
    pub fn iterates_workspace(&self) -> bool {
        matches!(self, LayerKind::Local | LayerKind::NoaaEsu)
    }

    pub fn is_condor(&self) -> bool {
        matches!(self, LayerKind::CondorNest | LayerKind::CondorHacking)
    }

    /// Datasets whose interim export happens only after the
    /// post-intersection filter pass.
    pub fn filters_after_intersect(&self) -> bool {
        matches!(
            self,
            LayerKind::Cnddb | LayerKind::WildlifeObservations | LayerKind::CriticalHabitatPolygons
        )
    }

    /// `BUFF_DIST` joins the stage-2 dissolve fields for every category
    /// except Critical Habitat and NOAA.
    pub fn dissolve_includes_buff_dist(&self) -> bool {
        !matches!(
            self,
            LayerKind::CriticalHabitatLines | LayerKind::CriticalHabitatPolygons | LayerKind::NoaaEsu
        )
    }

    /// Feature-class name for the per-rank no-buffer FWS deliverable.
    pub fn nobuf_name(&self, year: i32, rank: Rank) -> Option<String> {
        let rank = rank.as_str();
        let name = match self {
            LayerKind::Tesp => {
                format!("EDW_TESP_{year}_{rank}_OccurrenceAll_FoundPlants_nobuf")
            }
            LayerKind::WildlifeSites => format!("EDW_WildlifeSites_{year}_{rank}_nobuf"),
            LayerKind::WildlifeObservations => {
                format!("EDW_FishWildlife_Observation_{year}_{rank}_nobuf")
            }
            LayerKind::CriticalHabitatPolygons => {
                format!("CHabPolyAllSelectedSpecies_{year}_{rank}_nobuf")
            }
            LayerKind::CriticalHabitatLines => {
                format!("CHabLineAllSelectedSpecies_{year}_{rank}_nobuf")
            }
            LayerKind::Cnddb => format!("CNDDB_selects_{year}_{rank}_nobuf"),
            _ => return None,
        };
        Some(name)
    }

    /// Feature-class name used for both staging exports of the
    /// intersection stage. Local and NOAA outputs keep their source name.
    pub fn ident_name(&self, year: i32, rank: Rank, source_fc: &str) -> String {
        match self {
            LayerKind::Tesp => format!(
                "EDW_TESP_{year}_OccurrenceAll_FoundPlants_ident_{}",
                rank.as_str()
            ),
            LayerKind::WildlifeSites => {
                format!("EDW_WildlifeSites_{year}_ident_{}", rank.as_str())
            }
            LayerKind::WildlifeObservations => {
                format!("EDW_FishWildlife_Observation_{year}_{}_ident", rank.initial())
            }
            LayerKind::CriticalHabitatPolygons => {
                format!("CHabPolyAllSelectedSpecies_{year}_nobuf_Ident_{}", rank.as_str())
            }
            LayerKind::CriticalHabitatLines => {
                format!("CHabLineAllSelectedSpecies_{year}_nobuf_Ident_{}", rank.as_str())
            }
            LayerKind::Cnddb => format!(
                "CNDDB_{year}_All_selectsAndShastaCrayfish_Ident_noBDF_{}",
                rank.as_str()
            ),
            LayerKind::CondorHacking => format!("CNH_{year}_ident"),
            LayerKind::CondorNest => format!("CN_{year}_ident"),
            LayerKind::Local | LayerKind::NoaaEsu => source_fc.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_original_tag_spellings() {
        assert_eq!(LayerKind::from_str("TESP").unwrap(), LayerKind::Tesp);
        assert_eq!(
            LayerKind::from_str("Wildlife_Sites").unwrap(),
            LayerKind::WildlifeSites
        );
        assert_eq!(
            LayerKind::from_str("Critical_Habitat_Polygons").unwrap(),
            LayerKind::CriticalHabitatPolygons
        );
        assert_eq!(LayerKind::from_str("NOAA_ESU").unwrap(), LayerKind::NoaaEsu);
        assert!(LayerKind::from_str("Hydro").is_err());
    }

    #[test]
    fn profiles_cover_selector_categories_only() {
        assert!(LayerKind::Tesp.is_selectable());
        assert!(LayerKind::Cnddb.is_selectable());
        assert!(!LayerKind::Local.is_selectable());
        assert!(!LayerKind::CondorNest.is_selectable());
    }

    #[test]
    fn source_description_includes_pull_date() {
        let profile = LayerKind::Cnddb.selection_profile().unwrap();
        assert_eq!(
            profile.source_description("8/2017"),
            "CA CNDDB GOV version pulled 8/2017"
        );
    }

    #[test]
    fn buff_dist_excluded_for_ch_and_noaa() {
        assert!(LayerKind::Tesp.dissolve_includes_buff_dist());
        assert!(LayerKind::Cnddb.dissolve_includes_buff_dist());
        assert!(!LayerKind::CriticalHabitatLines.dissolve_includes_buff_dist());
        assert!(!LayerKind::CriticalHabitatPolygons.dissolve_includes_buff_dist());
        assert!(!LayerKind::NoaaEsu.dissolve_includes_buff_dist());
    }

    #[test]
    fn nobuf_names_match_deliverable_templates() {
        assert_eq!(
            LayerKind::Tesp.nobuf_name(2017, Rank::Endangered).unwrap(),
            "EDW_TESP_2017_Endangered_OccurrenceAll_FoundPlants_nobuf"
        );
        assert_eq!(
            LayerKind::Cnddb.nobuf_name(2017, Rank::Sensitive).unwrap(),
            "CNDDB_selects_2017_Sensitive_nobuf"
        );
        assert!(LayerKind::Local.nobuf_name(2017, Rank::Sensitive).is_none());
    }

    #[test]
    fn ident_names_match_staging_templates() {
        assert_eq!(
            LayerKind::WildlifeObservations.ident_name(2017, Rank::Endangered, ""),
            "EDW_FishWildlife_Observation_2017_E_ident"
        );
        assert_eq!(
            LayerKind::Cnddb.ident_name(2017, Rank::Threatened, ""),
            "CNDDB_2017_All_selectsAndShastaCrayfish_Ident_noBDF_Threatened"
        );
        assert_eq!(
            LayerKind::Local.ident_name(2017, Rank::Threatened, "StreamBuffers"),
            "StreamBuffers"
        );
        assert_eq!(
            LayerKind::CondorNest.ident_name(2017, Rank::Endangered, ""),
            "CN_2017_ident"
        );
    }
}
