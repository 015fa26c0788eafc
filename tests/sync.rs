mod support;

use git_origins::git;
use git_origins::ledger::OriginLedger;
use git_origins::merge::Resolutions;
use git_origins::stage::StagingIndex;
use git_origins::storage::Storage;
use git_origins::sync::{self, PullOutcome};
use support::{signature, BareRemote, TestRepo};

const LEDGER_REF: &str = "refs/notes/origins";

#[test]
fn push_publishes_the_ledger_ref() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let remote = BareRemote::init()?;
    repo.add_remote("origin", remote.path())?;

    let subject = repo.commit_on("main", &[("a.txt", "a\n")], "base")?;
    let origin = repo.commit_on("main", &[("b.txt", "b\n")], "second")?;
    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    ledger.add_origin(subject, origin)?;
    let tip = ledger.tip()?.unwrap();

    sync::push(repo.repo(), LEDGER_REF, "origin")?;

    let bare = remote.open()?;
    assert_eq!(bare.refname_to_id(LEDGER_REF)?, tip);
    Ok(())
}

#[test]
fn pull_adopts_when_no_local_ledger_exists() -> Result<(), Box<dyn std::error::Error>> {
    let shared = BareRemote::init()?;

    let publisher = TestRepo::init()?;
    publisher.add_remote("origin", shared.path())?;
    let subject = publisher.commit_on("main", &[("a.txt", "a\n")], "base")?;
    let origin = publisher.commit_on("main", &[("b.txt", "b\n")], "second")?;
    let ledger = OriginLedger::new(publisher.repo(), LEDGER_REF);
    ledger.add_origin(subject, origin)?;
    let published = ledger.tip()?.unwrap();
    sync::push(publisher.repo(), LEDGER_REF, "origin")?;

    // The consumer shares the commit graph so the adopted snapshot's
    // entries resolve there too.
    let consumer = TestRepo::init()?;
    consumer.add_remote("origin", shared.path())?;
    consumer.add_remote("publisher", publisher.path())?;
    git::run_git(consumer.repo(), &["fetch", "publisher", "refs/heads/main"])?;

    match sync::pull(consumer.repo(), LEDGER_REF, "origin", &Resolutions::new())? {
        PullOutcome::Adopted(oid) => assert_eq!(oid, published),
        other => panic!("expected adoption, got {other:?}"),
    }
    assert_eq!(git::ref_tip(consumer.repo(), LEDGER_REF)?, Some(published));
    Ok(())
}

#[test]
fn pull_with_no_remote_ledger_is_a_no_op() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let remote = BareRemote::init()?;
    repo.add_remote("origin", remote.path())?;
    repo.commit_on("main", &[("a.txt", "a\n")], "base")?;

    match sync::pull(repo.repo(), LEDGER_REF, "origin", &Resolutions::new())? {
        PullOutcome::NothingToPull => {}
        other => panic!("expected nothing to pull, got {other:?}"),
    }
    assert!(git::ref_tip(repo.repo(), LEDGER_REF)?.is_none());
    Ok(())
}

#[test]
fn fetch_refspec_registration_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let remote = BareRemote::init()?;
    repo.add_remote("origin", remote.path())?;

    assert!(sync::ensure_fetch_refspec(repo.repo(), "origin", LEDGER_REF)?);
    assert!(!sync::ensure_fetch_refspec(repo.repo(), "origin", LEDGER_REF)?);

    let configured = repo.repo().find_remote("origin")?;
    let spec = format!("+{}:{}", LEDGER_REF, sync::tracking_ref("origin"));
    let count = configured
        .fetch_refspecs()?
        .iter()
        .flatten()
        .filter(|candidate| *candidate == spec)
        .count();
    assert_eq!(count, 1);
    Ok(())
}

#[test]
fn pull_merges_diverged_ledgers() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let remote = BareRemote::init()?;
    repo.add_remote("origin", remote.path())?;

    let subject = repo.commit_on("main", &[("f", "0\n")], "base")?;
    let a = repo.commit_on("main", &[("f", "a\n")], "a")?;
    let b = repo.commit_on("main", &[("f", "b\n")], "b")?;
    let c = repo.commit_on("main", &[("f", "c\n")], "c")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    ledger.set(subject, &[a])?;
    let ancestor = ledger.tip()?.unwrap();

    // Publish a remote side that adds b.
    ledger.set(subject, &[a, b])?;
    sync::push(repo.repo(), LEDGER_REF, "origin")?;

    // Rewind and build a local side that adds c instead.
    git::update_ref(repo.repo(), LEDGER_REF, ancestor, "rewind")?;
    ledger.set(subject, &[a, c])?;

    match sync::pull(repo.repo(), LEDGER_REF, "origin", &Resolutions::new())? {
        PullOutcome::Merged(_) => {}
        other => panic!("expected merge, got {other:?}"),
    }
    assert_eq!(ledger.get(subject)?, Some(vec![a, c, b]));
    Ok(())
}

#[test]
fn conflicted_pull_materializes_and_completes_from_resolutions(
) -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let remote = BareRemote::init()?;
    repo.add_remote("origin", remote.path())?;

    let subject = repo.commit_on("main", &[("f", "0\n")], "base")?;
    let a = repo.commit_on("main", &[("f", "a\n")], "a")?;

    let ledger = OriginLedger::new(repo.repo(), LEDGER_REF);
    ledger.set(subject, &[a])?;
    let ancestor = ledger.tip()?.unwrap();
    let name = subject.to_string();

    // Publish a remote side with an unparseable entry.
    let remote_side = raw_snapshot(&repo, ancestor, &name, "remote-garbage\n");
    git::update_ref(repo.repo(), LEDGER_REF, remote_side, "remote side")?;
    sync::push(repo.repo(), LEDGER_REF, "origin")?;

    // Local side rewrites the same entry differently.
    let local_side = raw_snapshot(&repo, ancestor, &name, "local-garbage\n");
    git::update_ref(repo.repo(), LEDGER_REF, local_side, "local side")?;

    let conflicts = match sync::pull(repo.repo(), LEDGER_REF, "origin", &Resolutions::new())? {
        PullOutcome::Conflicted(conflicts) => conflicts,
        other => panic!("expected conflict, got {other:?}"),
    };
    assert_eq!(git::ref_tip(repo.repo(), LEDGER_REF)?, Some(local_side));

    // Materialize, resolve by hand, and complete the merge.
    let storage = Storage::new(repo.repo().path().to_path_buf());
    let files = sync::materialize_conflicts(repo.repo(), &storage, &conflicts)?;
    assert_eq!(files.len(), 1);
    let marker_text = std::fs::read_to_string(&files[0])?;
    assert!(marker_text.contains("<<<<<<< local"));
    assert!(marker_text.contains("local-garbage"));
    assert!(marker_text.contains("remote-garbage"));

    std::fs::write(&files[0], format!("{a}\n"))?;
    let resolutions = sync::read_resolutions(&storage, &conflicts)?;

    match sync::pull(repo.repo(), LEDGER_REF, "origin", &resolutions)? {
        PullOutcome::Merged(_) => {}
        other => panic!("expected merge, got {other:?}"),
    }
    assert_eq!(ledger.get(subject)?, Some(vec![a]));
    Ok(())
}

#[test]
fn unresolved_markers_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let repo = TestRepo::init()?;
    let subject = repo.commit_on("main", &[("f", "0\n")], "base")?;

    let conflicts = vec![git_origins::merge::ConflictEntry {
        name: subject.to_string(),
        ancestor: None,
        local: Some("x\n".to_string()),
        remote: Some("y\n".to_string()),
    }];

    let storage = Storage::new(repo.repo().path().to_path_buf());
    sync::materialize_conflicts(repo.repo(), &storage, &conflicts)?;

    // Left unedited, the marker file must not pass resolution.
    let err = sync::read_resolutions(&storage, &conflicts).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    Ok(())
}

fn raw_snapshot(repo: &TestRepo, parent: git2::Oid, name: &str, contents: &str) -> git2::Oid {
    let parent_commit = repo.repo().find_commit(parent).unwrap();
    let parent_tree = parent_commit.tree().unwrap();

    let mut stage = StagingIndex::ephemeral().unwrap();
    stage.load_tree(Some(&parent_tree)).unwrap();
    stage.upsert(repo.repo(), name, contents).unwrap();
    let tree_id = stage.write_tree(repo.repo()).unwrap();
    let tree = repo.repo().find_tree(tree_id).unwrap();

    let sig = signature().unwrap();
    repo.repo()
        .commit(None, &sig, &sig, "raw snapshot", &tree, &[&parent_commit])
        .unwrap()
}
