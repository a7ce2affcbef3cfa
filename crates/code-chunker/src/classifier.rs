use crate::config::ClassifierConfig;
use crate::types::{Classification, GeneratedKind, Signal, SignalKind, StructuralUnit, UnitKind};
use std::collections::BTreeMap;

const TIE_EPSILON: f64 = 1e-9;

/// Deterministic weighted-sum classifier.
///
/// Strong signals (doc markers, naming suffixes) vote for the kind they name.
/// Weak signals add to whichever kind leads, or to `Other` when nothing
/// leads, and can never produce a positive classification on their own.
#[derive(Debug, Clone)]
pub struct Classifier {
    acceptance_threshold: f64,
    confidence_normalizer: f64,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            acceptance_threshold: config.acceptance_threshold,
            confidence_normalizer: config.confidence_normalizer,
        }
    }

    /// Classify one unit (or a whole file) from its signals
    pub fn classify(&self, signals: &[Signal]) -> Classification {
        if signals.is_empty() {
            return Classification::none();
        }

        let mut votes: BTreeMap<GeneratedKind, f64> = BTreeMap::new();
        let mut weak = 0.0;
        for signal in signals {
            match signal.kind.named_kind() {
                Some(kind) => *votes.entry(kind).or_default() += signal.weight,
                None => weak += signal.weight,
            }
        }

        let leader = leading_kind(&votes, signals);
        let strong = leader.map_or(0.0, |(_, score)| score);
        let confidence = ((strong + weak) / self.confidence_normalizer).min(1.0);

        match leader {
            Some((kind, _)) if confidence > self.acceptance_threshold => Classification {
                kind,
                confidence,
                supporting_signals: signals
                    .iter()
                    .filter(|s| match s.kind.named_kind() {
                        Some(named) => named == kind || kind == GeneratedKind::Other,
                        None => true,
                    })
                    .cloned()
                    .collect(),
            },
            _ => Classification {
                kind: GeneratedKind::None,
                confidence,
                supporting_signals: signals.to_vec(),
            },
        }
    }

    /// Classification of every unit, indexed by `UnitId`.
    ///
    /// A unit sees the signals about itself and its descendants, except those
    /// owned by a nested class, which is classified on its own.
    pub fn classify_tree(&self, root: &StructuralUnit, signals: &[Signal]) -> Vec<Classification> {
        let units = root.descendants();
        let mut class_anchor = vec![None; units.len()];
        anchor_classes(root, None, &mut class_anchor);

        let mut by_subject: Vec<&Signal> = signals.iter().collect();
        by_subject.sort_by_key(|s| s.subject);

        units
            .iter()
            .map(|unit| {
                let ids = unit.id_range();
                let from = by_subject.partition_point(|s| s.subject.0 < ids.start);
                let to = by_subject.partition_point(|s| s.subject.0 < ids.end);
                let mut own: Vec<Signal> = by_subject[from..to]
                    .iter()
                    .filter(|s| {
                        class_anchor
                            .get(s.subject.0)
                            .copied()
                            .flatten()
                            .map_or(true, |anchor| anchor <= unit.id.0)
                    })
                    .map(|s| (*s).clone())
                    .collect();
                own.sort_by(|a, b| {
                    (a.location.start, a.kind.rank(), a.subject).cmp(&(
                        b.location.start,
                        b.kind.rank(),
                        b.subject,
                    ))
                });
                self.classify(&own)
            })
            .collect()
    }
}

/// Highest-voted kind; ties go to the kind whose naming suffix matched, else `Other`
fn leading_kind(votes: &BTreeMap<GeneratedKind, f64>, signals: &[Signal]) -> Option<(GeneratedKind, f64)> {
    let best = votes.values().copied().fold(f64::NEG_INFINITY, f64::max);
    if !best.is_finite() {
        return None;
    }
    let tied: Vec<GeneratedKind> = votes
        .iter()
        .filter(|(_, score)| (best - **score).abs() < TIE_EPSILON)
        .map(|(kind, _)| *kind)
        .collect();
    if let [only] = tied.as_slice() {
        return Some((*only, best));
    }

    let suffixed: Vec<GeneratedKind> = tied
        .iter()
        .copied()
        .filter(|kind| {
            signals
                .iter()
                .any(|s| s.kind == SignalKind::NamingSuffix(*kind))
        })
        .collect();
    match suffixed.as_slice() {
        [only] => Some((*only, best)),
        _ => Some((GeneratedKind::Other, best)),
    }
}

/// Nearest enclosing-or-self class of every unit
fn anchor_classes(unit: &StructuralUnit, anchor: Option<usize>, out: &mut [Option<usize>]) {
    let anchor = if unit.kind == UnitKind::Class {
        Some(unit.id.0)
    } else {
        anchor
    };
    if let Some(slot) = out.get_mut(unit.id.0) {
        *slot = anchor;
    }
    for child in &unit.children {
        anchor_classes(child, anchor, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Span, UnitId};

    fn span(start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            start_line: 1,
            end_line: 1,
        }
    }

    fn signal(kind: SignalKind, weight: f64, subject: usize) -> Signal {
        Signal {
            kind,
            location: span(subject, subject + 1),
            weight,
            subject: UnitId(subject),
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierConfig::default())
    }

    #[test]
    fn test_doc_marker_alone_is_enough() {
        let result = classifier().classify(&[signal(
            SignalKind::DocMarker(GeneratedKind::Interceptor),
            0.6,
            1,
        )]);
        assert_eq!(result.kind, GeneratedKind::Interceptor);
        assert!((result.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_suffix_needs_corroboration() {
        let suffix = signal(SignalKind::NamingSuffix(GeneratedKind::Factory), 0.3, 1);
        let alone = classifier().classify(&[suffix.clone()]);
        assert_eq!(alone.kind, GeneratedKind::None);
        assert!((alone.confidence - 0.3).abs() < 1e-9);
        assert_eq!(alone.supporting_signals.len(), 1);

        let with_delegation = classifier().classify(&[
            suffix,
            signal(SignalKind::DelegationIdiom, 0.15, 2),
            signal(SignalKind::DelegationIdiom, 0.15, 3),
        ]);
        assert_eq!(with_delegation.kind, GeneratedKind::Factory);
        assert!((with_delegation.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_weak_signals_never_classify() {
        let signals: Vec<Signal> = (0..20)
            .map(|i| signal(SignalKind::SizeOutlier, 0.1, i))
            .chain((0..10).map(|i| signal(SignalKind::LongLineOutlier, 0.05, i)))
            .chain((0..10).map(|i| signal(SignalKind::DelegationIdiom, 0.3, i)))
            .collect();
        let result = classifier().classify(&signals);
        assert_eq!(result.kind, GeneratedKind::None);
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_prefers_suffix_kind() {
        let result = classifier().classify(&[
            signal(SignalKind::DocMarker(GeneratedKind::Proxy), 0.6, 1),
            signal(SignalKind::DocMarker(GeneratedKind::Factory), 0.3, 1),
            signal(SignalKind::NamingSuffix(GeneratedKind::Factory), 0.3, 1),
        ]);
        assert_eq!(result.kind, GeneratedKind::Factory);
    }

    #[test]
    fn test_tie_without_suffix_is_other() {
        let result = classifier().classify(&[
            signal(SignalKind::DocMarker(GeneratedKind::Proxy), 0.6, 1),
            signal(SignalKind::DocMarker(GeneratedKind::Factory), 0.6, 1),
        ]);
        assert_eq!(result.kind, GeneratedKind::Other);
        assert_eq!(result.supporting_signals.len(), 2);
    }

    #[test]
    fn test_confidence_is_monotonic() {
        let pool = [
            signal(SignalKind::NamingSuffix(GeneratedKind::Proxy), 0.3, 1),
            signal(SignalKind::SizeOutlier, 0.1, 0),
            signal(SignalKind::DocMarker(GeneratedKind::Factory), 0.6, 1),
            signal(SignalKind::DelegationIdiom, 0.2, 2),
            signal(SignalKind::DocMarker(GeneratedKind::Proxy), 0.6, 1),
            signal(SignalKind::LongLineOutlier, 0.05, 3),
            signal(SignalKind::NamingSuffix(GeneratedKind::Factory), 0.3, 1),
        ];
        let classifier = classifier();
        let mut previous = 0.0;
        for n in 0..=pool.len() {
            let confidence = classifier.classify(&pool[..n]).confidence;
            assert!(confidence + 1e-12 >= previous, "dropped at signal {n}");
            previous = confidence;
        }
    }

    #[test]
    fn test_nested_class_keeps_its_own_signals() {
        let leaf = |id: usize, kind: UnitKind, children: Vec<StructuralUnit>| StructuralUnit {
            id: UnitId(id),
            kind,
            span: span(id, 100 - id),
            name: None,
            atomic: false,
            children,
        };
        // file > block > class > function
        let root = leaf(
            0,
            UnitKind::File,
            vec![leaf(
                1,
                UnitKind::Block,
                vec![leaf(2, UnitKind::Class, vec![leaf(3, UnitKind::Function, vec![])])],
            )],
        );
        let signals = vec![
            signal(SignalKind::DocMarker(GeneratedKind::Proxy), 0.6, 2),
            signal(SignalKind::DelegationIdiom, 0.3, 3),
        ];

        let per_unit = classifier().classify_tree(&root, &signals);
        assert_eq!(per_unit.len(), 4);
        assert_eq!(per_unit[0].kind, GeneratedKind::None);
        assert!(per_unit[1].supporting_signals.is_empty());
        assert_eq!(per_unit[2].kind, GeneratedKind::Proxy);
        assert!((per_unit[2].confidence - 0.9).abs() < 1e-9);
        assert_eq!(per_unit[3].kind, GeneratedKind::None);
        assert_eq!(per_unit[3].supporting_signals.len(), 1);
    }
}
