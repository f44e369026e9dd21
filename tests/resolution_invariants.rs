use medcode_core::pipeline::{merge_candidates, rank};
use medcode_core::types::{CodeHit, Concept, ConceptId, EntitySpan, IcdCode, SpanLabel};

fn make_span(text: &str, start: usize) -> EntitySpan {
    EntitySpan {
        text: text.to_string(),
        label: SpanLabel::Disease,
        start,
        end: start + text.len(),
    }
}

fn make_concept(cui: &str, name: &str, span_text: &str, start: usize) -> Concept {
    Concept {
        concept_id: ConceptId::new(cui),
        canonical_name: name.to_string(),
        source_span: make_span(span_text, start),
    }
}

fn hit(code: &str, name: &str, confidence: f32) -> CodeHit {
    CodeHit {
        code: IcdCode::new(code),
        display_name: name.to_string(),
        confidence,
    }
}

#[test]
fn invariant_duplicate_codes_keep_max_confidence_contributor() {
    let concepts = vec![
        make_concept("C0011849", "Diabetes Mellitus", "diabetes", 0),
        make_concept("C0011860", "Diabetes Mellitus, Type 2", "type 2 diabetes", 20),
    ];
    let groups = vec![
        vec![hit("E11.9", "Type 2 diabetes mellitus without complications", 0.6)],
        vec![hit("E11.9", "Type 2 diabetes mellitus without complications", 0.9)],
    ];

    let merged = merge_candidates(&concepts, groups);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].code.as_str(), "E11.9");
    assert_eq!(merged[0].confidence, 0.9);
    assert_eq!(merged[0].source_concept_id.as_str(), "C0011860");
}

#[test]
fn invariant_confidence_tie_prefers_earliest_span() {
    let concepts = vec![
        make_concept("C2", "Late concept", "late term", 40),
        make_concept("C1", "Early concept", "early term", 5),
    ];
    let groups = vec![
        vec![hit("I10", "Essential (primary) hypertension", 0.8)],
        vec![hit("I10", "Essential (primary) hypertension", 0.8)],
    ];

    let merged = merge_candidates(&concepts, groups);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source_concept_id.as_str(), "C1");
    assert_eq!(merged[0].source_span.start, 5);
}

#[test]
fn invariant_merged_output_has_unique_codes() {
    let concepts = vec![
        make_concept("C1", "A", "a", 0),
        make_concept("C2", "B", "b", 10),
        make_concept("C3", "C", "c", 20),
    ];
    let groups = vec![
        vec![hit("E11.9", "dm2", 0.7), hit("I10", "htn", 0.5)],
        vec![hit("I10", "htn", 0.9)],
        vec![hit("E11.9", "dm2", 0.4), hit("R53.83", "fatigue", 0.6)],
    ];

    let merged = merge_candidates(&concepts, groups);

    let mut codes: Vec<&str> = merged.iter().map(|c| c.code.as_str()).collect();
    codes.sort();
    let before = codes.len();
    codes.dedup();
    assert_eq!(codes.len(), before, "merged output must have unique codes");
    assert_eq!(before, 3);
}

#[test]
fn invariant_rank_orders_by_confidence_then_span_start() {
    let concepts = vec![
        make_concept("C1", "A", "a", 30),
        make_concept("C2", "B", "b", 10),
        make_concept("C3", "C", "c", 50),
    ];
    let groups = vec![
        vec![hit("R07.9", "chest pain", 0.5)],
        vec![hit("I10", "htn", 0.5)],
        vec![hit("E11.9", "dm2", 0.9)],
    ];

    let ranked = rank(merge_candidates(&concepts, groups), 10);

    let order: Vec<&str> = ranked.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(order, vec!["E11.9", "I10", "R07.9"]);

    assert!(ranked
        .windows(2)
        .all(|w| w[0].confidence >= w[1].confidence));
}

#[test]
fn invariant_rank_truncates_to_top_k() {
    let concepts: Vec<_> = (0..8)
        .map(|i| make_concept(&format!("C{i}"), "X", "x", i * 10))
        .collect();
    let groups: Vec<_> = (0..8)
        .map(|i| vec![hit(&format!("A0{i}"), "x", 0.1 * (i as f32 + 1.0))])
        .collect();

    let ranked = rank(merge_candidates(&concepts, groups), 3);
    assert_eq!(ranked.len(), 3);
}

#[test]
fn invariant_confidence_clamped_to_unit_interval() {
    let concepts = vec![make_concept("C1", "A", "a", 0)];
    let groups = vec![vec![hit("E11.9", "dm2", 1.7), hit("I10", "htn", -0.3)]];

    let merged = merge_candidates(&concepts, groups);
    for candidate in &merged {
        assert!((0.0..=1.0).contains(&candidate.confidence));
    }
}

#[test]
fn invariant_nan_confidence_pins_to_zero() {
    let concepts = vec![make_concept("C1", "A", "a", 0)];
    let groups = vec![vec![hit("E11.9", "dm2", f32::NAN), hit("I10", "htn", 0.4)]];

    let merged = merge_candidates(&concepts, groups);
    assert_eq!(merged.len(), 2);
    for candidate in &merged {
        assert!((0.0..=1.0).contains(&candidate.confidence));
    }

    // a NaN score must lose the ranking to any real score
    let ranked = rank(merged, 2);
    assert_eq!(ranked[0].code, IcdCode::new("I10"));
    assert_eq!(ranked[1].confidence, 0.0);
}

#[test]
fn icd_code_format_rule() {
    assert!(IcdCode::new("E11.9").is_well_formed());
    assert!(IcdCode::new("I10").is_well_formed());
    assert!(IcdCode::new("R53.83").is_well_formed());

    assert!(!IcdCode::new("ZZZZ").is_well_formed());
    assert!(!IcdCode::new("e11.9").is_well_formed());
    assert!(!IcdCode::new("E11.").is_well_formed());
    assert!(!IcdCode::new("E11.999").is_well_formed());
    assert!(!IcdCode::new("").is_well_formed());
}
