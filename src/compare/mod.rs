//! Aligning the lines of two networks and the reference table.
//!
//! An identifier is used as the matching key when it occurs in more than one
//! source and every line carrying it runs between the same two endpoints.
//! All other lines are matched by their unordered endpoint pair, and may join
//! an identifier-keyed row between the same endpoints that their source has
//! no line in yet. Parallel circuits stay separate: the k-th entry under a key
//! in one source meets the k-th entry under that key in the others. A PyPSA
//! line with `num_parallel = n` is split into its n circuits first.

pub mod key;
pub mod row;
pub mod units;

pub use key::LineKey;
pub use row::{ComparisonRow, Measurement, Parameter, Source, SourceValue};
pub use units::{Quantity, Unit};

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::loader::ReferenceRecord;
use crate::network::{Coordinate, Line, NetworkModel};

/// One source's view of a line circuit, borrowed from the loaded data.
struct Entry<'a> {
    id: Option<&'a str>,
    ends: (&'a str, &'a str),
    /// Position and count when the entry is one circuit of a split line.
    split: Option<(usize, usize)>,
    values: [Option<Quantity>; 6],
    geometry: Option<[Coordinate; 2]>,
}

impl Entry<'_> {
    fn endpoints(&self) -> LineKey {
        LineKey::endpoints(self.ends.0, self.ends.1)
    }

    fn member(&self) -> String {
        let name = match self.id {
            Some(id) => id.to_string(),
            None => self.endpoints().to_string(),
        };
        match self.split {
            Some((k, n)) => format!("{name} ({}/{n})", k + 1),
            None => name,
        }
    }
}

/// Per-circuit values of `line` when it is split into `n` circuits.
fn circuit_values(line: &Line, n: usize) -> [Option<Quantity>; 6] {
    let n = n as f64;
    [
        Some(Quantity::new(line.r * n, Unit::Ohm)),
        Some(Quantity::new(line.x * n, Unit::Ohm)),
        Some(Quantity::new(line.b / n, Unit::Siemens)),
        Some(Quantity::new(line.length, Unit::Kilometre)),
        line.v_nom.map(|v| Quantity::new(v, Unit::Kilovolt)),
        Some(Quantity::new(line.s_nom / n, Unit::Megavoltampere)),
    ]
}

fn network_entries(network: &NetworkModel) -> Vec<Entry<'_>> {
    let mut entries = Vec::with_capacity(network.lines().len());

    for line in network.lines() {
        let n = line.circuits();
        let values = circuit_values(line, n);
        let geometry = network.branch_geometry(&line.bus0, &line.bus1);
        if n > 1 {
            debug!(line = %line.id, circuits = n, "Splitting parallel circuits");
        }

        for k in 0..n {
            entries.push(Entry {
                id: Some(line.id.as_str()),
                ends: (line.bus0.as_str(), line.bus1.as_str()),
                split: (n > 1).then_some((k, n)),
                values,
                geometry,
            });
        }
    }

    entries
}

fn reference_entries(records: &[ReferenceRecord]) -> Vec<Entry<'_>> {
    records
        .iter()
        .map(|record| Entry {
            id: record.id.as_deref(),
            ends: (record.sub1.as_str(), record.sub2.as_str()),
            split: None,
            values: [
                record.r.map(|v| Quantity::new(v, Unit::Ohm)),
                record.x.map(|v| Quantity::new(v, Unit::Ohm)),
                record.b.map(|v| Quantity::new(v, Unit::Microsiemens)),
                record.length.map(|v| Quantity::new(v, Unit::Kilometre)),
                record.kv.map(|v| Quantity::new(v, Unit::Kilovolt)),
                record.mva.map(|v| Quantity::new(v, Unit::Megavoltampere)),
            ],
            geometry: record.geometry(),
        })
        .collect()
}

/// Identifiers usable as matching keys: present in at least two sources, and
/// naming the same endpoint pair wherever they occur. Colliding identifiers
/// from separate numbering schemes fail the second test.
fn shared_ids<'a>(sources: &[Vec<Entry<'a>>; 3]) -> HashSet<&'a str> {
    let mut seen: HashMap<&'a str, ([bool; 3], LineKey, bool)> = HashMap::new();
    for (s, entries) in sources.iter().enumerate() {
        for entry in entries {
            let Some(id) = entry.id else { continue };
            let ends = entry.endpoints();
            let (flags, first_ends, agree) = seen
                .entry(id)
                .or_insert_with(|| ([false; 3], ends.clone(), true));
            flags[s] = true;
            *agree &= *first_ends == ends;
        }
    }
    seen.into_iter()
        .filter(|(_, (flags, _, agree))| *agree && flags.iter().filter(|&&f| f).count() >= 2)
        .map(|(id, _)| id)
        .collect()
}

/// Position of each source's entry in one output row.
struct Slot {
    key: LineKey,
    circuit: usize,
    members: [Option<usize>; 3],
    /// Source and entry index that opened the slot; fixes the output order.
    origin: (usize, usize),
}

impl Slot {
    fn new(key: LineKey, circuit: usize, s: usize, i: usize) -> Self {
        let mut members = [None; 3];
        members[s] = Some(i);
        Slot {
            key,
            circuit,
            members,
            origin: (s, i),
        }
    }
}

/// Lazy sequence of [`ComparisonRow`]s, in order of first appearance in
/// source A, then B, then the reference.
///
/// Matching is resolved up front; rows are materialized one at a time.
pub struct Comparison<'a> {
    sources: [Vec<Entry<'a>>; 3],
    slots: std::vec::IntoIter<Slot>,
}

impl Comparison<'_> {
    fn materialize(&self, slot: Slot) -> ComparisonRow {
        let mut values = [[SourceValue::Absent; 3]; 6];
        let mut members: [Option<String>; 3] = Default::default();
        let mut geometries = [None; 3];

        for source in Source::ALL {
            let s = source.index();
            let Some(entry) = slot.members[s].map(|i| &self.sources[s][i]) else {
                continue;
            };

            members[s] = Some(entry.member());
            geometries[s] = entry.geometry;

            for parameter in Parameter::ALL {
                let p = parameter.index();
                if let Some(quantity) = entry.values[p] {
                    values[p][s] = SourceValue::Present(Measurement { source, quantity });
                }
            }
        }

        ComparisonRow {
            key: slot.key,
            circuit: slot.circuit,
            members,
            values,
            geometries,
        }
    }
}

impl Iterator for Comparison<'_> {
    type Item = ComparisonRow;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        Some(self.materialize(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for Comparison<'_> {}

/// Matches the lines of the filtered networks `a` and `b` with the reference
/// records.
///
/// Every output row holds a line circuit from at least one input; there is
/// one row per distinct key and circuit ordinal.
#[tracing::instrument(skip_all, fields(a = a.name(), b = b.name(), reference = reference.len()))]
pub fn compare<'a>(
    a: &'a NetworkModel,
    b: &'a NetworkModel,
    reference: &'a [ReferenceRecord],
) -> Comparison<'a> {
    let sources = [
        network_entries(a),
        network_entries(b),
        reference_entries(reference),
    ];
    let shared = shared_ids(&sources);

    let mut slots: Vec<Slot> = Vec::new();
    // slots by endpoint pair, in creation order
    let mut by_ends: HashMap<LineKey, Vec<usize>> = HashMap::new();

    // identifier-keyed circuits first, so that endpoint-keyed entries can
    // join them afterwards
    let mut by_id: HashMap<(&str, usize), usize> = HashMap::new();
    for (s, entries) in sources.iter().enumerate() {
        let mut circuits: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            let Some(id) = entry.id.filter(|id| shared.contains(id)) else {
                continue;
            };
            let circuit = circuits.entry(id).and_modify(|c| *c += 1).or_insert(0);

            match by_id.get(&(id, *circuit)).copied() {
                Some(slot) => slots[slot].members[s] = Some(i),
                None => {
                    by_id.insert((id, *circuit), slots.len());
                    by_ends.entry(entry.endpoints()).or_default().push(slots.len());
                    slots.push(Slot::new(LineKey::id(id), *circuit, s, i));
                }
            }
        }
    }

    for (s, entries) in sources.iter().enumerate() {
        for (i, entry) in entries.iter().enumerate() {
            if entry.id.is_some_and(|id| shared.contains(id)) {
                continue;
            }
            let ends = entry.endpoints();
            let candidates = by_ends.entry(ends.clone()).or_default();

            let vacant = candidates
                .iter()
                .copied()
                .find(|&slot| slots[slot].members[s].is_none());
            match vacant {
                Some(slot) => slots[slot].members[s] = Some(i),
                None => {
                    let circuit = candidates
                        .iter()
                        .filter(|&&slot| slots[slot].key == ends)
                        .count();
                    candidates.push(slots.len());
                    slots.push(Slot::new(ends, circuit, s, i));
                }
            }
        }
    }

    slots.sort_by_key(|slot| slot.origin);

    let in_all = slots
        .iter()
        .filter(|slot| slot.members.iter().all(Option::is_some))
        .count();
    info!(
        rows = slots.len(),
        shared_ids = shared.len(),
        in_all_sources = in_all,
        "Lines matched"
    );

    Comparison {
        sources,
        slots: slots.into_iter(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::fixtures::{bus, line};
    use crate::region::{Region, filter_region};

    fn network(name: &str, lines: Vec<crate::network::Line>) -> NetworkModel {
        let mut n = NetworkModel::from_parts(
            name,
            vec![
                bus("A", 13.4, 52.5, "DE"),
                bus("B", 12.4, 51.3, "DE"),
                bus("C", 11.6, 50.9, "DE"),
            ],
            lines,
            vec![],
        );
        n.calculate_dependent_values().unwrap();
        n
    }

    fn reference(sub1: &str, sub2: &str, r: Option<f64>) -> ReferenceRecord {
        ReferenceRecord {
            id: None,
            sub1: sub1.to_string(),
            sub2: sub2.to_string(),
            lon1: None,
            lat1: None,
            lon2: None,
            lat2: None,
            kv: Some(380.0),
            mva: None,
            r,
            x: None,
            b: Some(290.0),
            length: None,
        }
    }

    fn ohms(row: &ComparisonRow, source: Source) -> Option<f64> {
        row.value(Parameter::Resistance, source)
            .measurement()
            .map(|m| m.quantity.value)
    }

    #[test]
    fn test_shared_line_with_different_resistance() {
        let a = network("eur", vec![line("eur-1", "A", "B", 4.0)]);
        let b = network("earth", vec![line("earth-9", "B", "A", 4.2)]);

        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.key, LineKey::endpoints("A", "B"));
        assert_eq!(ohms(row, Source::A), Some(4.0));
        assert_eq!(ohms(row, Source::B), Some(4.2));
        assert_eq!(*row.value(Parameter::Resistance, Source::Reference), SourceValue::Absent);
    }

    #[test]
    fn test_line_only_in_a_has_two_absent_sources() {
        let a = network("eur", vec![line("l1", "A", "C", 4.0)]);
        let b = network("earth", vec![]);

        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        assert_eq!(rows.len(), 1);
        for parameter in Parameter::ALL {
            let present = rows[0]
                .values(parameter)
                .iter()
                .filter(|v| v.is_present())
                .count();
            assert_eq!(present, 1, "{parameter}");
        }
        assert_eq!(rows[0].source_count(), 1);
    }

    #[test]
    fn test_endpoint_matching_is_symmetric_with_reference() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![]);
        let refs = [reference("B", "A", Some(3.9))];

        let rows: Vec<_> = compare(&a, &b, &refs).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(ohms(&rows[0], Source::Reference), Some(3.9));
        assert_eq!(rows[0].member(Source::Reference), Some("A - B"));
    }

    #[test]
    fn test_shared_identifier_with_same_endpoints_is_the_key() {
        let a = network("eur", vec![line("relation/42", "A", "B", 4.0)]);
        let b = network("earth", vec![line("relation/42", "B", "A", 4.1)]);

        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, LineKey::id("relation/42"));
        assert_eq!(rows[0].source_count(), 2);
    }

    #[test]
    fn test_colliding_identifier_falls_back_to_endpoints() {
        // separate numbering schemes, same number on unrelated lines
        let a = network("eur", vec![line("7", "A", "B", 4.0), line("8", "B", "C", 1.0)]);
        let b = network("earth", vec![line("7", "A", "C", 9.0), line("3", "B", "A", 4.2)]);

        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        let keys: Vec<String> = rows.iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["A - B", "B - C", "A - C"]);
        assert_eq!(rows[0].member(Source::A), Some("7"));
        assert_eq!(rows[0].member(Source::B), Some("3"));
    }

    #[test]
    fn test_reference_without_id_joins_identifier_row() {
        let a = network("eur", vec![line("7", "A", "B", 4.0)]);
        let b = network("earth", vec![line("7", "A", "B", 4.2)]);
        let refs = [reference("B", "A", Some(3.9))];

        let rows: Vec<_> = compare(&a, &b, &refs).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, LineKey::id("7"));
        assert_eq!(rows[0].source_count(), 3);
        assert_eq!(ohms(&rows[0], Source::Reference), Some(3.9));
    }

    #[test]
    fn test_num_parallel_line_meets_every_reference_circuit() {
        let mut double = line("l1", "A", "B", 2.0);
        double.num_parallel = 2.0;
        let a = network("eur", vec![double]);
        let b = network("earth", vec![]);
        let refs = [reference("A", "B", Some(4.0)), reference("B", "A", Some(4.0))];

        let rows: Vec<_> = compare(&a, &b, &refs).collect();

        assert_eq!(rows.len(), 2);
        for (k, row) in rows.iter().enumerate() {
            assert_eq!(row.circuit, k);
            assert_eq!(ohms(row, Source::A), Some(4.0));
            assert_eq!(row.difference(Parameter::Resistance, Source::A, Source::Reference), Some(0.0));
        }
        assert_eq!(rows[0].member(Source::A), Some("l1 (1/2)"));
        assert_eq!(rows[1].member(Source::A), Some("l1 (2/2)"));

        let rating = rows[0].value(Parameter::Rating, Source::A).measurement().unwrap();
        assert_eq!(rating.quantity.value, 850.0);
    }

    #[test]
    fn test_parallel_circuits_are_separate_rows() {
        let a = network(
            "eur",
            vec![line("c1", "A", "B", 4.0), line("c2", "B", "A", 4.0)],
        );
        let b = network("earth", vec![line("x1", "A", "B", 4.2)]);

        let rows: Vec<_> = compare(&a, &b, &[]).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].circuit, 0);
        assert_eq!(rows[1].circuit, 1);
        assert_eq!(rows[0].source_count(), 2);
        assert_eq!(rows[1].source_count(), 1);
        assert_eq!(rows[1].member(Source::A), Some("c2"));
    }

    #[test]
    fn test_units_are_kept_per_source() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![]);
        let refs = [reference("A", "B", None)];

        let rows: Vec<_> = compare(&a, &b, &refs).collect();

        let b_eur = rows[0].value(Parameter::Susceptance, Source::A).measurement().unwrap();
        let b_tso = rows[0]
            .value(Parameter::Susceptance, Source::Reference)
            .measurement()
            .unwrap();
        assert_eq!(b_eur.quantity.unit, Unit::Siemens);
        assert_eq!(b_eur.source, Source::A);
        assert_eq!(b_tso.quantity.unit, Unit::Microsiemens);
        assert_eq!(b_tso.quantity.value, 290.0);
        assert!(!rows[0].value(Parameter::Resistance, Source::Reference).is_present());
    }

    #[test]
    fn test_every_row_key_comes_from_an_input() {
        let a = network(
            "eur",
            vec![line("l1", "A", "B", 1.0), line("l2", "B", "C", 1.0)],
        );
        let b = network("earth", vec![line("l2", "C", "A", 1.0)]);
        let refs = [reference("C", "B", Some(1.0)), reference("X", "Y", None)];

        let rows: Vec<_> = compare(&a, &b, &refs).collect();

        let mut input_keys: HashSet<LineKey> = HashSet::new();
        input_keys.insert(LineKey::endpoints("A", "B"));
        input_keys.insert(LineKey::endpoints("B", "C"));
        input_keys.insert(LineKey::endpoints("A", "C"));
        input_keys.insert(LineKey::endpoints("X", "Y"));
        for row in &rows {
            assert!(row.source_count() >= 1);
            assert!(input_keys.contains(&row.key), "{}", row.key);
        }
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_empty_region_leaves_only_other_source() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![line("m1", "B", "C", 2.0)]);
        let empty_a = filter_region(&a, &Region::country("FR"));

        let rows: Vec<_> = compare(&empty_a, &b, &[]).collect();

        assert_eq!(rows.len(), 1);
        assert!(rows.iter().all(|r| !r.in_source(Source::A) && r.in_source(Source::B)));
    }

    #[test]
    fn test_comparison_is_exact_size() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![line("m1", "B", "C", 2.0)]);
        let mut comparison = compare(&a, &b, &[]);
        assert_eq!(comparison.len(), 2);
        comparison.next();
        assert_eq!(comparison.len(), 1);
    }

    #[test]
    fn test_geometry_comes_from_buses() {
        let a = network("eur", vec![line("l1", "A", "B", 4.0)]);
        let b = network("earth", vec![]);

        let row = compare(&a, &b, &[]).next().unwrap();

        let (source, [from, to]) = row.geometry().unwrap();
        assert_eq!(source, Source::A);
        assert_eq!(from, Coordinate { lat: 52.5, lon: 13.4 });
        assert_eq!(to, Coordinate { lat: 51.3, lon: 12.4 });
    }
}
