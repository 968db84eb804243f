use crate::models::lookup::LookupRow;
use crate::models::Accuracy;

/// Resolved CNDDB buffer: distance in feet plus the instruction text
/// recorded in `INST_FIRE`.
#[derive(Debug, Clone, PartialEq)]
pub struct CnddbBuffer {
    pub feet: f64,
    pub instruction: Option<String>,
}

/// CNDDB buffers are accuracy-tiered: the lookup row carries a target
/// class (300 or 600 ft) and the record's positional accuracy selects
/// the distance that, added to the reported accuracy radius, meets the
/// class requirement. Unrecognized combinations get the 2 ft floor.
pub fn cnddb_buffer(accuracy: Option<Accuracy>, row: &LookupRow) -> CnddbBuffer {
    let fixed = |feet: f64, instruction: &str| CnddbBuffer {
        feet,
        instruction: Some(instruction.to_string()),
    };

    match (accuracy, row.buffer_class.as_str()) {
        (Some(Accuracy::TenthMile), "300") => fixed(
            3.0,
            "CNDDB ACCURACY is GT 300 ft buffer - minimum 3 ft buffer applied",
        ),
        (Some(Accuracy::TenthMile), "600") => fixed(
            72.0,
            "CNDDB ACCURACY is 529 ft - 72 ft buffer applied to meet 600 ft requirement",
        ),
        (Some(Accuracy::FifthMile), "300") => fixed(
            3.0,
            "CNDDB ACCURACY is GT 300 ft buffer - minimum 3 ft buffer applied",
        ),
        (Some(Accuracy::FifthMile), "600") => fixed(
            3.0,
            "CNDDB ACCURACY is GT 600 ft buffer - minimum 3 ft buffer applied",
        ),
        (Some(Accuracy::EightyMeters), "300") => fixed(
            38.0,
            "CNDDB ACCURACY is LT 300 ft buffer - adding 38 ft",
        ),
        (Some(Accuracy::EightyMeters), "600") => fixed(
            338.0,
            "CNDDB ACCURACY is 262 ft - 338 ft buffer applied to meet 600 ft",
        ),
        (Some(Accuracy::SpecificArea), _) => CnddbBuffer {
            feet: row.buffer_feet(),
            instruction: Some(format!(
                "CNDDB ACCURACY is specific - adding {} ft buffer",
                row.buffer_class
            )),
        },
        _ => CnddbBuffer {
            feet: 2.0,
            instruction: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(class: &str) -> LookupRow {
        LookupRow {
            name_prefix: "Rana boylii".into(),
            rank: "Sensitive".into(),
            buffer_class: class.into(),
            forest_restriction: String::new(),
            species_type: "ANIMAL".into(),
            category_flag: String::new(),
        }
    }

    #[test]
    fn tenth_mile_class_600_is_72_feet() {
        let b = cnddb_buffer(Some(Accuracy::TenthMile), &row("600"));
        assert_eq!(b.feet, 72.0);
        assert!(b.instruction.unwrap().contains("529 ft"));
    }

    #[test]
    fn eighty_meters_class_300_is_38_feet() {
        let b = cnddb_buffer(Some(Accuracy::EightyMeters), &row("300"));
        assert_eq!(b.feet, 38.0);
    }

    #[test]
    fn fifth_mile_is_3_feet_both_classes() {
        assert_eq!(cnddb_buffer(Some(Accuracy::FifthMile), &row("300")).feet, 3.0);
        assert_eq!(cnddb_buffer(Some(Accuracy::FifthMile), &row("600")).feet, 3.0);
    }

    #[test]
    fn specific_area_uses_row_value() {
        let b = cnddb_buffer(Some(Accuracy::SpecificArea), &row("50"));
        assert_eq!(b.feet, 50.0);
        assert_eq!(
            b.instruction.unwrap(),
            "CNDDB ACCURACY is specific - adding 50 ft buffer"
        );
    }

    #[test]
    fn unrecognized_accuracy_gets_two_foot_floor() {
        let b = cnddb_buffer(None, &row("300"));
        assert_eq!(b.feet, 2.0);
        assert!(b.instruction.is_none());
        assert!(Accuracy::from_str("1 mile").is_err());
    }

    #[test]
    fn unknown_class_gets_two_foot_floor() {
        let b = cnddb_buffer(Some(Accuracy::TenthMile), &row("450"));
        assert_eq!(b.feet, 2.0);
    }
}
