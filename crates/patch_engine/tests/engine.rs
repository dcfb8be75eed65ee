use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use patch_engine::{PatchEngine, PatchEngineError};

#[test]
fn addition_only_diff_creates_a_missing_file() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("fresh.txt");

    let diff = "@@\n+first\n+second\n+third\n";
    let outcome = PatchEngine::new()
        .apply_to_file(&file, diff)
        .expect("new-file diff applies");

    assert_eq!(outcome.updated_content, "first\nsecond\nthird\n");
    assert_eq!(
        std::fs::read_to_string(&file).expect("read"),
        "first\nsecond\nthird\n"
    );
}

#[test]
fn update_hunk_replaces_anchored_lines() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("hello.txt");
    std::fs::write(&file, "hello\nworld\n").expect("seed file");

    let diff = "--- a/hello.txt\n+++ b/hello.txt\n@@ -1,2 +1,2 @@\n hello\n-world\n+rust\n";
    let outcome = PatchEngine::new()
        .apply_to_file(&file, diff)
        .expect("patch applies");

    assert_eq!(outcome.updated_content, "hello\nrust\n");
    assert_eq!(std::fs::read_to_string(&file).expect("read"), "hello\nrust\n");
}

#[test]
fn drifted_context_still_applies_after_unrelated_edits() {
    // The diff was generated against a file without the three inserted
    // header lines, so every line number has shifted.
    let original = "// header one\n// header two\n// header three\nfn alpha() {}\nfn beta() {}\nfn gamma() {}\n";
    let diff = "@@ -1,3 +1,4 @@\n fn alpha() {}\n-fn beta() {}\n+fn beta_renamed() {}\n+fn delta() {}\n fn gamma() {}\n";

    let outcome = PatchEngine::new()
        .apply_to_content(original, diff)
        .expect("shifted hunk applies");

    assert_eq!(
        outcome.updated_content,
        "// header one\n// header two\n// header three\nfn alpha() {}\nfn beta_renamed() {}\nfn delta() {}\nfn gamma() {}\n"
    );
}

#[test]
fn any_failed_hunk_leaves_the_file_byte_identical() {
    let dir = tempdir().expect("tempdir");
    let file = dir.path().join("stable.txt");
    let seed = "one\ntwo\nthree\n";
    std::fs::write(&file, seed).expect("seed file");

    // Second hunk's context does not exist anywhere in the file.
    let diff = "@@\n one\n-two\n+TWO\n@@\n missing anchor alpha\n-missing anchor beta\n+replacement\n missing anchor gamma\n";
    let error = PatchEngine::new()
        .apply_to_file(&file, diff)
        .expect_err("apply must fail");

    assert_eq!(error.failed_hunks(), Some(&[2usize][..]));
    assert_eq!(std::fs::read_to_string(&file).expect("read"), seed);
}

#[test]
fn every_failed_hunk_index_is_reported() {
    let original = "alpha\nbeta\n";
    let diff = "@@\n no such line one\n-no such line two\n+x\n no such line three\n@@\n alpha\n-beta\n+BETA\n@@\n still missing one\n-still missing two\n+y\n still missing three\n";

    let error = PatchEngine::new()
        .apply_to_content(original, diff)
        .expect_err("two hunks cannot locate");

    assert_eq!(error.failed_hunks(), Some(&[1usize, 3][..]));
}

#[test]
fn empty_diff_is_rejected() {
    let error = PatchEngine::new()
        .apply_to_content("body\n", "--- a\n+++ b\n")
        .expect_err("no hunks");
    assert_matches!(error, PatchEngineError::EmptyDiff);
}

#[test]
fn hunks_apply_in_order_against_the_evolving_text() {
    let original = "a\nb\nc\nd\ne\n";
    let diff = "@@\n a\n-b\n+B\n c\n@@\n c\n-d\n+D\n e\n";

    let outcome = PatchEngine::new()
        .apply_to_content(original, diff)
        .expect("both hunks apply");

    assert_eq!(outcome.updated_content, "a\nB\nc\nD\ne\n");
}

#[test]
fn normalized_diff_round_trips_to_the_updated_content() {
    let original = "one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\n";
    let diff = "@@\n two\n-three\n+three point five\n four\n@@\n six\n-seven\n+SEVEN\n eight\n";

    let engine = PatchEngine::new();
    let outcome = engine
        .apply_to_content(original, diff)
        .expect("fixture applies");

    let replayed = engine
        .apply_to_content(original, &outcome.normalized_diff)
        .expect("normalized diff reapplies");

    assert_eq!(replayed.updated_content, outcome.updated_content);
}

#[test]
fn removal_text_mismatch_is_tolerated_at_a_located_position() {
    let original = "keep one\nstale value = 1\nkeep two\n";
    // The removal line's recorded text is out of date, but the context
    // anchors the position.
    let diff = "@@\n keep one\n-stale value = 0\n+fresh value = 2\n keep two\n";

    let outcome = PatchEngine::new()
        .apply_to_content(original, diff)
        .expect("position-anchored removal applies");

    assert_eq!(
        outcome.updated_content,
        "keep one\nfresh value = 2\nkeep two\n"
    );
}

#[test]
fn bounded_match_distance_rejects_far_drift() {
    let mut original = String::new();
    for index in 0..50 {
        original.push_str(&format!("filler line {index}\n"));
    }
    original.push_str("anchor\n");

    let diff = "@@\n anchor\n+appended\n";

    let strict = PatchEngine::with_match_distance(5);
    let error = strict
        .apply_to_content(&original, diff)
        .expect_err("anchor is outside the window");
    assert_eq!(error.failed_hunks(), Some(&[1usize][..]));

    let lenient = PatchEngine::new();
    let outcome = lenient
        .apply_to_content(&original, diff)
        .expect("default distance reaches the anchor");
    assert!(outcome.updated_content.ends_with("anchor\nappended\n"));
}
