//! Record-level operation semantics shared by both engine
//! implementations. Geometry is envelope arithmetic only; anything finer
//! belongs to a real GIS backend behind the same trait.

use std::collections::BTreeMap;

use crate::models::record::{AttrValue, FeatureRecord, Geometry, GeometryKind};

#[derive(Debug)]
pub enum OpsError {
    MissingField { field: String },
}

fn renumber(records: &mut [FeatureRecord]) {
    for (i, rec) in records.iter_mut().enumerate() {
        rec.oid = i as i64 + 1;
    }
}

/// Buffer each record's parts outward by the per-record distance field
/// (meters). Output is polygon geometry carrying a `BUFF_DIST` field,
/// the way the external engine's buffer tool reports the distance used.
pub fn buffer(records: &[FeatureRecord], distance_field: &str) -> Result<Vec<FeatureRecord>, OpsError> {
    let mut out = Vec::with_capacity(records.len());
    for rec in records {
        let distance = rec.float(distance_field).ok_or_else(|| OpsError::MissingField {
            field: distance_field.to_string(),
        })?;
        let mut buffered = rec.clone();
        buffered.geometry = Geometry::new(
            GeometryKind::Polygon,
            rec.geometry.parts.iter().map(|p| p.expand(distance)).collect(),
        );
        buffered.set_float(crate::models::record::fields::BUFF_DIST, distance);
        out.push(buffered);
    }
    renumber(&mut out);
    Ok(out)
}

/// One output record per geometry part.
pub fn multipart_to_singlepart(records: &[FeatureRecord]) -> Vec<FeatureRecord> {
    let mut out = Vec::new();
    for rec in records {
        for part in &rec.geometry.parts {
            let mut single = rec.clone();
            single.geometry = Geometry::new(rec.geometry.kind, vec![*part]);
            out.push(single);
        }
    }
    renumber(&mut out);
    out
}

/// Normalize inverted envelopes in place; returns how many parts needed
/// repair.
pub fn repair(records: &mut [FeatureRecord]) -> usize {
    let mut repaired = 0;
    for rec in records {
        for part in &mut rec.geometry.parts {
            if part.normalize() {
                repaired += 1;
            }
        }
    }
    repaired
}

/// Pairwise intersection: one output record per (input, overlay) pair
/// with overlapping parts. Output attributes are the input's with the
/// overlay's joined in; input fields win on collision.
pub fn intersect(inputs: &[FeatureRecord], overlay: &[FeatureRecord]) -> Vec<FeatureRecord> {
    let mut out = Vec::new();
    for rec in inputs {
        for over in overlay {
            let parts: Vec<_> = rec
                .geometry
                .parts
                .iter()
                .flat_map(|p| over.geometry.parts.iter().filter_map(|q| p.intersection(q)))
                .collect();
            if parts.is_empty() {
                continue;
            }
            let mut joined = rec.clone();
            joined.geometry = Geometry::new(rec.geometry.kind, parts);
            for (field, value) in &over.attributes {
                joined
                    .attributes
                    .entry(field.clone())
                    .or_insert_with(|| value.clone());
            }
            out.push(joined);
        }
    }
    renumber(&mut out);
    out
}

/// Dissolve on the listed fields: group records sharing those values,
/// union their parts into one multipart record, drop every other field.
pub fn dissolve(records: &[FeatureRecord], fields: &[&str]) -> Result<Vec<FeatureRecord>, OpsError> {
    for field in fields {
        if !records.is_empty() && records.iter().all(|r| !r.attributes.contains_key(*field)) {
            return Err(OpsError::MissingField {
                field: field.to_string(),
            });
        }
    }

    let mut groups: BTreeMap<Vec<String>, FeatureRecord> = BTreeMap::new();
    for rec in records {
        let key: Vec<String> = fields
            .iter()
            .map(|f| match rec.attributes.get(*f) {
                Some(AttrValue::Text(s)) => s.clone(),
                Some(AttrValue::Int(i)) => i.to_string(),
                Some(AttrValue::Float(x)) => format!("{x}"),
                Some(AttrValue::Null) | None => String::new(),
            })
            .collect();

        match groups.entry(key) {
            std::collections::btree_map::Entry::Occupied(mut group) => group
                .get_mut()
                .geometry
                .parts
                .extend(rec.geometry.parts.iter().copied()),
            std::collections::btree_map::Entry::Vacant(slot) => {
                let mut dissolved = FeatureRecord::new(0, rec.geometry.clone());
                for f in fields {
                    if let Some(v) = rec.attributes.get(*f) {
                        dissolved.attributes.insert((*f).to_string(), v.clone());
                    }
                }
                slot.insert(dissolved);
            }
        }
    }

    let mut out: Vec<_> = groups.into_values().collect();
    renumber(&mut out);
    Ok(out)
}

/// Concatenate inputs, renumbering object ids.
pub fn merge(inputs: &[Vec<FeatureRecord>]) -> Vec<FeatureRecord> {
    let mut out: Vec<_> = inputs.iter().flatten().cloned().collect();
    renumber(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::{Envelope, FeatureRecord, Geometry, GeometryKind};

    fn rec(oid: i64, parts: Vec<Envelope>) -> FeatureRecord {
        FeatureRecord::new(oid, Geometry::new(GeometryKind::Polygon, parts))
    }

    #[test]
    fn buffer_expands_and_records_distance() {
        let mut r = rec(1, vec![Envelope::new(0.0, 0.0, 1.0, 1.0)]);
        r.set_float("BUFFM_FIRE", 3.0);
        let out = buffer(&[r], "BUFFM_FIRE").unwrap();
        assert_eq!(out[0].geometry.parts[0], Envelope::new(-3.0, -3.0, 4.0, 4.0));
        assert_eq!(out[0].float("BUFF_DIST"), Some(3.0));
    }

    #[test]
    fn buffer_missing_distance_field_fails() {
        let r = rec(1, vec![Envelope::point(0.0, 0.0)]);
        assert!(buffer(&[r], "BUFFM_FIRE").is_err());
    }

    #[test]
    fn explode_splits_multipart() {
        let multi = rec(
            7,
            vec![Envelope::point(0.0, 0.0), Envelope::point(5.0, 5.0)],
        );
        let out = multipart_to_singlepart(&[multi]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| !r.geometry.is_multipart()));
        assert_eq!(out[0].oid, 1);
        assert_eq!(out[1].oid, 2);
    }

    #[test]
    fn intersect_joins_overlay_attributes() {
        let mut input = rec(1, vec![Envelope::new(0.0, 0.0, 10.0, 10.0)]);
        input.set_text("SNAME_FIRE", "Rana boylii");
        let mut forest = rec(1, vec![Envelope::new(5.0, 5.0, 20.0, 20.0)]);
        forest.set_text("UnitID_FS", "0507");
        forest.set_text("FORESTNAME", "Los Padres National Forest");
        let mut elsewhere = rec(2, vec![Envelope::new(50.0, 50.0, 60.0, 60.0)]);
        elsewhere.set_text("UnitID_FS", "0516");

        let out = intersect(&[input], &[forest, elsewhere]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text("UnitID_FS"), Some("0507"));
        assert_eq!(out[0].text("SNAME_FIRE"), Some("Rana boylii"));
        assert_eq!(
            out[0].geometry.parts[0],
            Envelope::new(5.0, 5.0, 10.0, 10.0)
        );
    }

    #[test]
    fn dissolve_groups_and_drops_fields() {
        let mut a = rec(1, vec![Envelope::point(0.0, 0.0)]);
        a.set_text("UnitID", "0501");
        a.set_text("GRANK_FIRE", "Sensitive");
        a.set_text("CMNT_FIRE", "x");
        let mut b = rec(2, vec![Envelope::point(1.0, 1.0)]);
        b.set_text("UnitID", "0501");
        b.set_text("GRANK_FIRE", "Sensitive");
        b.set_text("CMNT_FIRE", "y");
        let mut c = rec(3, vec![Envelope::point(2.0, 2.0)]);
        c.set_text("UnitID", "0502");
        c.set_text("GRANK_FIRE", "Sensitive");

        let out = dissolve(&[a, b, c], &["UnitID", "GRANK_FIRE"]).unwrap();
        assert_eq!(out.len(), 2);
        let grouped = out.iter().find(|r| r.text("UnitID") == Some("0501")).unwrap();
        assert_eq!(grouped.geometry.parts.len(), 2);
        assert!(grouped.text("CMNT_FIRE").is_none());
    }

    #[test]
    fn dissolve_unknown_field_fails() {
        let mut a = rec(1, vec![Envelope::point(0.0, 0.0)]);
        a.set_text("UnitID", "0501");
        assert!(dissolve(&[a], &["NOPE"]).is_err());
    }

    #[test]
    fn merge_renumbers() {
        let a = vec![rec(9, vec![Envelope::point(0.0, 0.0)])];
        let b = vec![rec(9, vec![Envelope::point(1.0, 1.0)])];
        let out = merge(&[a, b]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].oid, 1);
        assert_eq!(out[1].oid, 2);
    }
}
