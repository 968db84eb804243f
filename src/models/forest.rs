/// The 18 Region 5 forest units deliverables are split across. The alias
/// is the forest's filename tag; the unit id is what the ownership layer
/// writes into `UnitID_FS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestUnit {
    pub alias: &'static str,
    pub unit_id: &'static str,
}

pub const FOREST_UNITS: [ForestUnit; 18] = [
    ForestUnit { alias: "ANF", unit_id: "0501" },
    ForestUnit { alias: "BDF", unit_id: "0512" },
    ForestUnit { alias: "CNF", unit_id: "0502" },
    ForestUnit { alias: "ENF", unit_id: "0503" },
    ForestUnit { alias: "INF", unit_id: "0504" },
    ForestUnit { alias: "KNF", unit_id: "0505" },
    ForestUnit { alias: "LNF", unit_id: "0506" },
    ForestUnit { alias: "LPF", unit_id: "0507" },
    ForestUnit { alias: "MDF", unit_id: "0509" },
    ForestUnit { alias: "MNF", unit_id: "0508" },
    ForestUnit { alias: "PNF", unit_id: "0511" },
    ForestUnit { alias: "SHU", unit_id: "0514" },
    ForestUnit { alias: "SNF", unit_id: "0515" },
    ForestUnit { alias: "SQF", unit_id: "0513" },
    ForestUnit { alias: "SRF", unit_id: "0510" },
    ForestUnit { alias: "STF", unit_id: "0516" },
    ForestUnit { alias: "TMU", unit_id: "0519" },
    ForestUnit { alias: "TNF", unit_id: "0517" },
];

impl ForestUnit {
    /// Per-forest hydro deliverable geodatabase name.
    pub fn hydro_gdb_name(&self) -> String {
        format!("S_R05_{}_FireRetardantEIS_Hydro.gdb", self.alias)
    }
}
