mod support;

use std::path::Path;

use git_origins::cherry::{resolve_range, Side};
use git_origins::ledger::OriginLedger;
use support::TestRepo;

const LEDGER_REF: &str = "refs/notes/origins";

#[test]
fn cherry_pick_pair_is_suppressed_on_both_sides() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    repo.commit_on("main", &[("base.txt", "base\n")], "base")?;
    repo.branch_from("upstream", "main")?;
    repo.branch_from("local", "main")?;

    let u1 = repo.commit_on("upstream", &[("u1.txt", "u1\n")], "upstream fix")?;
    let u2 = repo.commit_on("upstream", &[("u2.txt", "u2\n")], "upstream feature")?;
    let l1 = repo.commit_on("local", &[("u1.txt", "u1\n")], "picked upstream fix")?;
    let l2 = repo.commit_on("local", &[("l2.txt", "l2\n")], "local work")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    ledger.add_origin(l1, u1)?;

    let report = resolve_range(repo.repo(), &ledger, "upstream", "local", None)?;

    let by_id = |oid| report.commits.iter().find(|c| c.id == oid).unwrap();
    assert_eq!(report.commits.len(), 4);
    assert!(by_id(l1).suppressed);
    assert!(by_id(u1).suppressed);
    assert!(!by_id(u2).suppressed);
    assert!(!by_id(l2).suppressed);
    assert_eq!(by_id(u1).side, Side::Left);
    assert_eq!(by_id(l1).side, Side::Right);

    let novel: Vec<_> = report.novel().map(|c| c.id).collect();
    assert!(novel.contains(&u2));
    assert!(novel.contains(&l2));
    Ok(())
}

#[test]
fn origin_outside_the_range_keeps_commit_novel() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let base = repo.commit_on("main", &[("base.txt", "base\n")], "base")?;
    repo.branch_from("upstream", "main")?;
    repo.branch_from("local", "main")?;

    let u1 = repo.commit_on("upstream", &[("u1.txt", "u1\n")], "upstream fix")?;
    let l1 = repo.commit_on("local", &[("l1.txt", "l1\n")], "local work")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    // base is reachable from both sides, so it is not in the range.
    ledger.set(l1, &[u1, base])?;

    let report = resolve_range(repo.repo(), &ledger, "upstream", "local", None)?;
    assert!(report.commits.iter().all(|c| !c.suppressed));
    Ok(())
}

#[test]
fn blacklisted_commits_are_always_suppressed() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    repo.commit_on("main", &[("base.txt", "base\n")], "base")?;
    repo.branch_from("upstream", "main")?;
    repo.branch_from("local", "main")?;

    let u1 = repo.commit_on("upstream", &[("u1.txt", "u1\n")], "upstream noise")?;
    let l1 = repo.commit_on("local", &[("l1.txt", "l1\n")], "local work")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    ledger.add_blacklisted(u1)?;

    let report = resolve_range(repo.repo(), &ledger, "upstream", "local", None)?;
    let by_id = |oid| report.commits.iter().find(|c| c.id == oid).unwrap();
    assert!(by_id(u1).suppressed);
    assert!(!by_id(l1).suppressed);
    Ok(())
}

#[test]
fn identical_branches_produce_empty_range() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    repo.commit_on("main", &[("base.txt", "base\n")], "base")?;
    repo.branch_from("upstream", "main")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    let report = resolve_range(repo.repo(), &ledger, "upstream", "main", None)?;
    assert!(report.commits.is_empty());
    Ok(())
}

#[test]
fn file_scope_restricts_to_touching_commits() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    repo.commit_on("main", &[("file.txt", "v0\n")], "base")?;
    repo.branch_from("upstream", "main")?;
    repo.branch_from("local", "main")?;

    let u1 = repo.commit_on("upstream", &[("file.txt", "v1\n")], "touches file")?;
    let u2 = repo.commit_on("upstream", &[("other.txt", "x\n")], "does not touch file")?;
    let l1 = repo.commit_on("local", &[("file.txt", "v2\n")], "local touch")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    let report = resolve_range(
        repo.repo(),
        &ledger,
        "upstream",
        "local",
        Some(Path::new("file.txt")),
    )?;

    let ids: Vec<_> = report.commits.iter().map(|c| c.id).collect();
    assert!(ids.contains(&u1));
    assert!(ids.contains(&l1));
    assert!(!ids.contains(&u2));
    Ok(())
}

#[test]
fn file_scope_stops_at_local_content_anchor() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    repo.commit_on("main", &[("file.txt", "v0\n")], "base")?;
    repo.branch_from("upstream", "main")?;
    repo.branch_from("local", "main")?;

    // Oldest upstream change lands the same content the local side
    // starts from; history before that point is irrelevant.
    let u_old = repo.commit_on("upstream", &[("file.txt", "shared\n")], "old upstream")?;
    let u_new = repo.commit_on("upstream", &[("file.txt", "newer\n")], "new upstream")?;
    let l1 = repo.commit_on("local", &[("file.txt", "shared\n")], "local anchor")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    let report = resolve_range(
        repo.repo(),
        &ledger,
        "upstream",
        "local",
        Some(Path::new("file.txt")),
    )?;

    let ids: Vec<_> = report.commits.iter().map(|c| c.id).collect();
    assert!(ids.contains(&u_new));
    assert!(!ids.contains(&u_old));
    assert!(ids.contains(&l1));
    Ok(())
}
