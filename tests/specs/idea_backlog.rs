//! `spec.md` §8 scenario S2 plus idea-backlog boundary behaviors.

use crate::prelude::Instance;

/// S2 — promote-all preserves relative order.
#[test]
fn idea_promote_all_preserves_order() {
    let instance = Instance::new();

    instance.koan().args(&["idea", "add", "first", "idea"]).passes();
    instance.koan().args(&["idea", "add", "second", "idea"]).passes();
    instance.koan().args(&["idea", "add", "third", "idea"]).passes();

    instance
        .koan()
        .args(&["idea", "promote-all"])
        .passes()
        .stdout_has("promoted 3 idea(s) to pending.");

    let content = instance.read_missions();
    let pending = content.split("## Pending").nth(1).unwrap();
    let pending_block = pending.split("## In Progress").next().unwrap();

    let first = pending_block.find("first idea").expect("first idea present");
    let second = pending_block.find("second idea").expect("second idea present");
    let third = pending_block.find("third idea").expect("third idea present");
    assert!(first < second && second < third, "promote-all must preserve relative order");

    instance
        .koan()
        .args(&["idea", "list"])
        .passes()
        .stdout_has("ideas: (none)");
}

#[test]
fn idea_delete_out_of_range_is_a_no_op() {
    let instance = Instance::new();
    instance.koan().args(&["idea", "add", "keep", "this", "one"]).passes();

    instance
        .koan()
        .args(&["idea", "delete", "5"])
        .passes()
        .stdout_has("no idea at #5");

    let content = instance.read_missions();
    assert!(content.contains("keep this one"));
}

#[test]
fn idea_promote_single_moves_it_to_pending() {
    let instance = Instance::new();
    instance.koan().args(&["idea", "add", "ship", "the", "thing"]).passes();

    instance
        .koan()
        .args(&["idea", "promote", "1"])
        .passes()
        .stdout_has("promoted idea #1 to pending.");

    let content = instance.read_missions();
    let pending = content.split("## Pending").nth(1).unwrap();
    let pending_block = pending.split("## In Progress").next().unwrap();
    assert!(pending_block.contains("ship the thing"));

    let ideas = content.split("## Ideas").nth(1).unwrap();
    let ideas_block = ideas.split("## Pending").next().unwrap();
    assert!(!ideas_block.contains("ship the thing"));
}
