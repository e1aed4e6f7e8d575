/*!
 * Tests for splitting and reassembling units
 */

use pagewright::document::{SizeConstraint, Unit, UnitKind};
use pagewright::translation::{Segmenter, WorkItem};

/// Deterministic pseudo-random text mixing scripts, punctuation and breaks
fn generated_text(seed: u64, len: usize) -> String {
    const PIECES: &[&str] = &[
        "word", " ", "  ", ".", "!", "?", "\n", "\n\n", "\n\n\n", "ලංකාව", "ශ්\u{200D}රී", "।", "தமிழ்", "3.14", "\t", "。", "x",
    ];
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut text = String::new();
    while text.chars().count() < len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        text.push_str(PIECES[(state >> 33) as usize % PIECES.len()]);
    }
    text
}

#[test]
fn test_reassemble_withGeneratedTexts_shouldReproduceSourceExactly() {
    for seed in 0..60 {
        let text = generated_text(seed, 40 + (seed as usize * 7) % 300);
        for max in [1, 2, 5, 13, 40, 128, 1000] {
            let chunks = Segmenter::segment(&text, max);
            let bodies: Vec<&str> = chunks.iter().map(|c| c.body.as_str()).collect();

            assert_eq!(Segmenter::reassemble(&chunks, &bodies), text, "seed {} max {}", seed, max);
            assert!(
                chunks.iter().all(|c| c.body.chars().count() <= max),
                "seed {} max {} produced an oversized chunk",
                seed,
                max
            );
        }
    }
}

#[test]
fn test_segment_withEmptyText_shouldReturnOneEmptyChunk() {
    let chunks = Segmenter::segment("", 10);

    assert_eq!(chunks.len(), 1);
    assert_eq!(Segmenter::reassemble(&chunks, &[""]), "");
}

#[test]
fn test_segmentUnit_shouldUseUnitConstraint() {
    let unit = Unit::new(
        "u",
        0,
        UnitKind::Body,
        "One. Two. Three. Four.",
        "si",
        SizeConstraint::new(10, 0),
    );

    let chunks = Segmenter::segment_unit(&unit);

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|c| c.body.chars().count() <= 10));
}

#[test]
fn test_plan_shouldNeverMergeDifferentKinds() {
    let size = SizeConstraint::new(100, 50);
    let units = vec![
        Unit::new("a", 0, UnitKind::Title, "Heading", "si", size),
        Unit::new("b", 1, UnitKind::Body, "Short body.", "si", size),
        Unit::new("c", 2, UnitKind::Body, "Another.", "si", size),
    ];

    let plan = Segmenter::new(true, 8).plan(&units);

    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0], WorkItem::Single(&units[0]));
    assert_eq!(plan[1].first_ordinal(), 1);
}

#[test]
fn test_plan_shouldNotMergeWhitespaceUnits() {
    let size = SizeConstraint::new(100, 50);
    let units = vec![
        Unit::new("a", 0, UnitKind::Body, "Short.", "si", size),
        Unit::new("b", 1, UnitKind::Body, "   ", "si", size),
        Unit::new("c", 2, UnitKind::Body, "Short too.", "si", size),
    ];

    let plan = Segmenter::new(true, 8).plan(&units);

    assert_eq!(plan.len(), 3);
}

#[test]
fn test_plan_shouldCapMergedSizeAtMaxChars() {
    let size = SizeConstraint::new(20, 15);
    let units: Vec<Unit> = (0..4)
        .map(|i| Unit::new(format!("u{}", i), i, UnitKind::Body, "twelve chars", "si", size))
        .collect();

    let plan = Segmenter::new(true, 8).plan(&units);

    // 12 + 12 > 20, so nothing can be merged
    assert_eq!(plan.len(), 4);
}
