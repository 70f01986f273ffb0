//! Black-box end-to-end scenarios driving the public `dirstate` API through
//! a scratch repository directory, one behavior per test.

use std::fs;

use dirstate::{
    CommitMode, Docket, DocketManager, DocketManagerConfig, NodeData, NodeFlags, OpenOutcome,
    TreeMetadata,
};
use test_support::ScratchRepo;

fn init_empty(repo: &ScratchRepo) {
    repo.mark_dirstate_v2();
    let docket = Docket {
        parent1: [0u8; 32],
        parent2: [0u8; 32],
        tree: TreeMetadata::default(),
        ignore_hash: [0u8; 20],
        used_size: 0,
        id: b"0000000000000000".to_vec(),
    };
    fs::write(repo.docket_path(), docket.encode()).unwrap();
    fs::write(repo.data_file_path("0000000000000000"), b"").unwrap();
}

fn open_v2(repo: &ScratchRepo) -> DocketManager {
    let outcome = DocketManager::open(repo.meta_dir(), DocketManagerConfig::default()).unwrap();
    match outcome {
        OpenOutcome::V2(manager) => manager,
        OpenOutcome::Legacy(_) => panic!("expected dirstate-v2 repository"),
    }
}

#[test]
fn s1_empty_init_round_trips() {
    let repo = ScratchRepo::new();
    init_empty(&repo);

    let manager = open_v2(&repo);
    assert_eq!(manager.tree().root(), (0, 0));
    assert_eq!(manager.ignore_hash(), [0u8; 20]);
}

#[test]
fn s2_single_add_is_visible_after_commit() {
    let repo = ScratchRepo::new();
    init_empty(&repo);
    let mut manager = open_v2(&repo);

    let mut overlay = manager.overlay();
    overlay.insert(
        b"foo".to_vec(),
        NodeData {
            flags: NodeFlags::WDIR_TRACKED | NodeFlags::HAS_MODE_AND_SIZE | NodeFlags::HAS_MTIME,
            size: 3,
            mtime: Some((1_000_000, 500)),
            ..Default::default()
        },
    );
    manager
        .commit(&overlay, CommitMode::Append, [0u8; 32], [0u8; 32])
        .unwrap();

    let node = manager.tree().lookup(b"foo").unwrap().unwrap();
    assert_eq!(node.full_path(), b"foo");
    assert_eq!(node.size(), 3);
    assert_eq!(node.mtime(), Some((1_000_000, 500)));
    assert!(!node.flags().contains(NodeFlags::MODE_EXEC_PERM));

    let (_, root_count) = manager.tree().root();
    assert_eq!(root_count, 1);
}

#[test]
fn s3_two_siblings_sort_under_shared_directory() {
    let repo = ScratchRepo::new();
    init_empty(&repo);
    let mut manager = open_v2(&repo);

    let tracked = || NodeData {
        flags: NodeFlags::WDIR_TRACKED | NodeFlags::HAS_MODE_AND_SIZE,
        size: 1,
        ..Default::default()
    };

    let mut overlay = manager.overlay();
    overlay.insert(b"a/y".to_vec(), tracked());
    overlay.insert(b"a/x".to_vec(), tracked());
    manager
        .commit(&overlay, CommitMode::Append, [0u8; 32], [0u8; 32])
        .unwrap();

    let tree = manager.tree();
    let (_, root_count) = tree.root();
    assert_eq!(root_count, 1);

    let dir = tree.lookup(b"a").unwrap().unwrap();
    assert_eq!(dir.tracked_descendants(), 2);
    assert_eq!(dir.descendants_with_entry(), 2);

    let x = tree.lookup(b"a/x").unwrap().unwrap();
    let y = tree.lookup(b"a/y").unwrap().unwrap();
    assert_eq!(x.base_name(), b"x");
    assert_eq!(y.base_name(), b"y");
}

#[test]
fn s4_rename_with_copy_source_round_trips() {
    let repo = ScratchRepo::new();
    init_empty(&repo);
    let mut manager = open_v2(&repo);

    let mut overlay = manager.overlay();
    overlay.insert(
        b"b".to_vec(),
        NodeData {
            flags: NodeFlags::WDIR_TRACKED,
            copy_source: Some(b"a".to_vec()),
            ..Default::default()
        },
    );
    manager
        .commit(&overlay, CommitMode::Append, [0u8; 32], [0u8; 32])
        .unwrap();

    let node = manager.tree().lookup(b"b").unwrap().unwrap();
    assert_eq!(node.copy_source(), Some(&b"a"[..]));
}

#[test]
fn s5_clean_directory_cache_disabled_on_ignore_hash_mismatch() {
    use dirstate::status::{can_skip_readdir, StatusView};

    let repo = ScratchRepo::new();
    init_empty(&repo);
    let mut manager = open_v2(&repo);

    let mut overlay = manager.overlay();
    overlay.insert(
        b"d".to_vec(),
        NodeData {
            flags: NodeFlags::DIRECTORY | NodeFlags::HAS_MTIME | NodeFlags::ALL_UNKNOWN_RECORDED,
            mtime: Some((1_000_000, 0)),
            ..Default::default()
        },
    );
    manager
        .commit(&overlay, CommitMode::Append, [0u8; 32], [0u8; 32])
        .unwrap();

    let dir = manager.tree().lookup(b"d").unwrap().unwrap();
    assert!(can_skip_readdir(&dir, StatusView::UNKNOWNS, true));
    assert!(!can_skip_readdir(&dir, StatusView::UNKNOWNS, false));
}

#[test]
fn s6_rewrite_trigger_mints_fresh_generation_with_zero_unreachable_bytes() {
    let repo = ScratchRepo::new();
    repo.mark_dirstate_v2();
    let docket = Docket {
        parent1: [0u8; 32],
        parent2: [0u8; 32],
        tree: TreeMetadata {
            unreachable_bytes: 600,
            ..Default::default()
        },
        ignore_hash: [0u8; 20],
        used_size: 1000,
        id: b"0000000000000000".to_vec(),
    };
    fs::write(repo.docket_path(), docket.encode()).unwrap();
    fs::write(repo.data_file_path("0000000000000000"), vec![0u8; 1000]).unwrap();

    let mut manager = open_v2(&repo);
    assert_eq!(manager.recommended_mode(), CommitMode::Fresh);

    let mut overlay = manager.overlay();
    overlay.insert(
        b"foo".to_vec(),
        NodeData {
            flags: NodeFlags::WDIR_TRACKED,
            ..Default::default()
        },
    );
    let mode = manager.recommended_mode();
    manager.commit(&overlay, mode, [0u8; 32], [0u8; 32]).unwrap();

    assert_eq!(manager.tree().lookup(b"foo").unwrap().unwrap().full_path(), b"foo");
    let old_data_file = repo.data_file_path("0000000000000000");
    assert!(old_data_file.exists(), "old generation is deleted lazily, not eagerly");
}

#[test]
fn unknown_identifier_surfaces_when_data_file_is_missing() {
    use dirstate::DirstateError;

    let repo = ScratchRepo::new();
    repo.mark_dirstate_v2();
    let docket = Docket {
        parent1: [0u8; 32],
        parent2: [0u8; 32],
        tree: TreeMetadata::default(),
        ignore_hash: [0u8; 20],
        used_size: 0,
        id: b"cafecafecafecafe".to_vec(),
    };
    fs::write(repo.docket_path(), docket.encode()).unwrap();

    let result = DocketManager::open(repo.meta_dir(), DocketManagerConfig::default());
    assert!(matches!(result, Err(DirstateError::UnknownIdentifier { .. })));
}

#[test]
fn corrupt_index_surfaces_when_children_run_exceeds_used_size() {
    use dirstate::codec::{write_u16, write_u32, write_u8};
    use dirstate::node::NODE_SIZE;
    use dirstate::DirstateError;

    let repo = ScratchRepo::new();
    repo.mark_dirstate_v2();

    // One well-formed node record whose children_ptr/children_count point
    // past the end of the (too-short) data file.
    let mut record = Vec::new();
    write_u32(&mut record, 0); // full_path_ptr
    write_u16(&mut record, 0); // full_path_len
    write_u8(&mut record, 0); // base_name_start
    write_u32(&mut record, 0); // copy_source_ptr
    write_u16(&mut record, 0); // copy_source_len
    write_u32(&mut record, 10_000); // children_ptr, well past used_size
    write_u32(&mut record, 5); // children_count
    write_u32(&mut record, 0); // descendants_with_entry
    write_u32(&mut record, 0); // tracked_descendants
    write_u16(&mut record, NodeFlags::WDIR_TRACKED.bits()); // flags
    write_u32(&mut record, 0); // size
    write_u32(&mut record, 0); // mtime_seconds
    write_u32(&mut record, 0); // mtime_nanoseconds
    assert_eq!(record.len(), NODE_SIZE as usize);

    fs::write(repo.data_file_path("badbadbadbadbad0"), &record).unwrap();

    let docket = Docket {
        parent1: [0u8; 32],
        parent2: [0u8; 32],
        tree: TreeMetadata {
            root_ptr: 0,
            root_count: 1,
            ..Default::default()
        },
        ignore_hash: [0u8; 20],
        used_size: record.len() as u32,
        id: b"badbadbadbadbad0".to_vec(),
    };
    fs::write(repo.docket_path(), docket.encode()).unwrap();

    let manager = open_v2(&repo);
    let err = manager.tree().lookup(b"anything");
    assert!(matches!(err, Err(DirstateError::CorruptIndex { .. })));
}

#[test]
fn truncated_tail_beyond_used_size_is_tolerated() {
    let repo = ScratchRepo::new();
    init_empty(&repo);
    let mut manager = open_v2(&repo);

    let mut overlay = manager.overlay();
    overlay.insert(
        b"foo".to_vec(),
        NodeData {
            flags: NodeFlags::WDIR_TRACKED,
            ..Default::default()
        },
    );
    manager
        .commit(&overlay, CommitMode::Append, [0u8; 32], [0u8; 32])
        .unwrap();

    // Simulate a concurrent in-progress append: extra bytes past used_size.
    let data_path = repo.data_file_path("0000000000000000");
    let mut contents = fs::read(&data_path).unwrap();
    contents.extend_from_slice(b"in-flight garbage from a concurrent writer");
    fs::write(&data_path, contents).unwrap();

    let reopened = open_v2(&repo);
    let node = reopened.tree().lookup(b"foo").unwrap().unwrap();
    assert_eq!(node.full_path(), b"foo");
}
