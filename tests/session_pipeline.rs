use std::cell::{Cell, RefCell};

use ssvl::{
    feed_pair, process_pair, BlockComparer, BlockOrigin, CameraSide, FeedError, FeedOutcome,
    FillState, GridView, IntensityView, Ownership, RigGeometry, Session, SessionConfig, Status,
    StereoPair, SyntheticConfig, SyntheticStereoSource,
};

fn config(width: u32, height: u32, block_size: u32) -> SessionConfig {
    SessionConfig {
        width,
        height,
        block_size,
        ..SessionConfig::default()
    }
}

fn synthetic_pair(width: u32, height: u32, disparity_px: u32, seed: u64) -> StereoPair {
    SyntheticStereoSource::new(SyntheticConfig {
        width,
        height,
        disparity_px,
        foreground_disparity_px: None,
        seed: Some(seed),
    })
    .and_then(|mut source| source.next_pair())
    .expect("synthetic pair")
}

struct ConstantScore(u32);

impl BlockComparer for ConstantScore {
    fn name(&self) -> &str {
        "constant"
    }

    fn score(
        &self,
        _rig: &RigGeometry,
        _reference: &IntensityView<'_>,
        _candidate: &IntensityView<'_>,
        _reference_origin: BlockOrigin,
        _candidate_origin: BlockOrigin,
        _block_size: usize,
    ) -> u32 {
        self.0
    }
}

#[test]
fn buffer_sizes_follow_geometry() {
    for (w, h, b) in [(4, 4, 4), (8, 4, 4), (256, 256, 4), (320, 240, 16), (9, 3, 3)] {
        let rig = RigGeometry::new(w, h, b, 10.0, 70.0).expect("valid geometry");
        assert_eq!(rig.frame_buffer_size(), (w * h * 2) as usize);
        assert_eq!(rig.depth_buffer_size(), ((w / b) * (h / b) * 4) as usize);
    }
}

#[test]
fn non_tiling_block_size_yields_no_session() {
    assert!(Session::new(config(10, 8, 4)).is_err());
    assert!(Session::new(config(8, 10, 4)).is_err());
    assert!(Session::new(config(8, 8, 0)).is_err());
}

#[test]
fn partial_feed_buffers_without_processing() {
    let processed = Cell::new(0u32);
    let mut session = Session::new(config(8, 4, 4)).expect("session");
    session.on_depth(|_: GridView<'_>, _: f32| processed.set(processed.get() + 1));

    session.feed(CameraSide::Right, &[7; 16]).expect("right chunk");
    let outcome = session.feed(CameraSide::Left, &[1; 63]).expect("left chunk");
    assert_eq!(
        outcome,
        FeedOutcome::Buffered {
            side: CameraSide::Left,
            filled: 63,
            remaining: 1
        }
    );
    assert_eq!(session.status(), Status::Ok);
    assert_eq!(session.fill_level(CameraSide::Right), 16);
    assert_eq!(session.fill_state(CameraSide::Left), FillState::Filling);
    assert_eq!(session.pairs_processed(), 0);
    drop(session);
    assert_eq!(processed.get(), 0);
}

#[test]
fn complete_pair_processes_once_in_either_order() {
    for first in CameraSide::BOTH {
        let second = match first {
            CameraSide::Left => CameraSide::Right,
            CameraSide::Right => CameraSide::Left,
        };
        let processed = Cell::new(0u32);
        let mut session = Session::new(config(8, 4, 4)).expect("session");
        session.on_depth(|_: GridView<'_>, _: f32| processed.set(processed.get() + 1));

        assert!(matches!(
            session.feed(first, &[0x55; 64]),
            Ok(FeedOutcome::Buffered { remaining: 0, .. })
        ));
        assert_eq!(session.fill_state(first), FillState::Full);
        assert_eq!(session.feed(second, &[0xAA; 64]), Ok(FeedOutcome::Processed));

        assert_eq!(session.fill_level(CameraSide::Left), 0);
        assert_eq!(session.fill_level(CameraSide::Right), 0);
        assert_eq!(session.pairs_processed(), 1);
        drop(session);
        assert_eq!(processed.get(), 1);
    }
}

#[test]
fn overflow_resets_only_the_offending_side() {
    let mut session = Session::new(config(8, 4, 4)).expect("session");
    session.feed(CameraSide::Left, &[1; 40]).expect("left");
    session.feed(CameraSide::Right, &[2; 40]).expect("right");

    let err = session.feed(CameraSide::Right, &[3; 25]).unwrap_err();
    assert_eq!(err.status(), Status::FeedOverflow);
    assert!(matches!(err, FeedError::Overflow { side: CameraSide::Right, .. }));
    assert_eq!(session.status(), Status::FeedOverflow);
    assert_eq!(session.fill_level(CameraSide::Right), 0);
    assert_eq!(session.fill_level(CameraSide::Left), 40);

    // Status is sticky until cleared, even across successful feeds.
    session.feed(CameraSide::Right, &[4; 64]).expect("fresh right frame");
    assert_eq!(session.status(), Status::FeedOverflow);
    session.clear_status();
    assert_eq!(session.status(), Status::Ok);
}

#[test]
fn disparity_stays_in_range_and_recovers_known_shift() {
    let pair = synthetic_pair(256, 256, 8, 11);
    let disparity = RefCell::new(Vec::new());
    let mut session = Session::new(config(256, 256, 4)).expect("session");
    session.on_disparity(|grid: GridView<'_>| {
        assert_eq!((grid.width(), grid.height()), (64, 64));
        disparity.replace(grid.cells().to_vec());
    });

    assert!(feed_pair(&mut session, &pair, 1000).expect("feed"));
    let max_depth = session.max_depth_mm();
    let rig = *session.geometry();
    let depth: Vec<f32> = session.depth_map().expect("depth").cells().to_vec();
    drop(session);

    let disparity = disparity.into_inner();
    assert_eq!(disparity.len(), 64 * 64);
    assert!(disparity.iter().all(|&d| (0.0..256.0).contains(&d)));

    for cy in 0..64 {
        // Cells starting at x >= 8 can see the true match.
        for cx in 2..64 {
            let i = cy * 64 + cx;
            assert_eq!(disparity[i], 8.0, "cell ({}, {})", cx, cy);
            assert!((depth[i] - rig.depth_for_disparity(8.0)).abs() < 1e-4);
            assert!(depth[i] < max_depth);
        }
        // The leftmost column only searches x = 0.
        assert_eq!(disparity[cy * 64], 0.0);
        assert_eq!(depth[cy * 64], max_depth);
    }
}

#[test]
fn repeated_runs_are_byte_identical() {
    let pair = synthetic_pair(64, 32, 5, 3);
    let run = || {
        let disparity = RefCell::new(Vec::new());
        let mut session = Session::new(config(64, 32, 4)).expect("session");
        session.on_disparity(|grid: GridView<'_>| {
            disparity.replace(grid.cells().to_vec());
        });
        process_pair(&mut session, &pair.left, &pair.right).expect("process");
        let depth: Vec<u8> = session
            .depth_map()
            .expect("depth")
            .cells()
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        drop(session);
        (disparity.into_inner(), depth)
    };
    let (disparity_a, depth_a) = run();
    let (disparity_b, depth_b) = run();
    assert_eq!(disparity_a, disparity_b);
    assert_eq!(depth_a, depth_b);
}

#[test]
fn constant_comparer_never_beats_the_aligned_candidate() {
    let pair = synthetic_pair(32, 16, 6, 5);
    let disparity = RefCell::new(Vec::new());
    let mut session = Session::new(config(32, 16, 4)).expect("session");
    session.set_comparer(Box::new(ConstantScore(42)));
    session.on_disparity(|grid: GridView<'_>| {
        disparity.replace(grid.cells().to_vec());
    });
    process_pair(&mut session, &pair.left, &pair.right).expect("process");
    assert_eq!(session.comparer_name(), "constant");
    let max_depth = session.max_depth_mm();
    assert!(session
        .depth_map()
        .expect("depth")
        .cells()
        .iter()
        .all(|&d| d == max_depth));
    drop(session);
    assert!(disparity.into_inner().iter().all(|&d| d == 0.0));
}

#[test]
fn single_cell_rig_reports_sentinel_depth() {
    let seen = Cell::new(None);
    let mut session = Session::new(SessionConfig {
        width: 4,
        height: 4,
        block_size: 4,
        baseline_mm: 10.0,
        fov_degrees: 70.0,
        allocate: true,
    })
    .expect("session");
    session.on_depth(|grid: GridView<'_>, max_depth: f32| {
        seen.set(Some((grid.get(0, 0), max_depth)));
    });
    process_pair(&mut session, &[0x12; 32], &[0x34; 32]).expect("process");
    drop(session);

    let (depth, max_depth) = seen.get().expect("depth observer ran");
    assert!((max_depth - 28.56).abs() < 0.01);
    assert_eq!(depth, max_depth);
}

#[test]
fn observers_fire_in_pipeline_order() {
    let events = RefCell::new(Vec::new());
    let mut session = Session::new(config(8, 4, 4)).expect("session");
    session.on_intensity(|side: CameraSide, frame: IntensityView<'_>| {
        assert_eq!((frame.width(), frame.height()), (8, 4));
        events.borrow_mut().push(format!("intensity:{}", side));
    });
    session.on_disparity(|_: GridView<'_>| events.borrow_mut().push("disparity".to_string()));
    session.on_depth(|_: GridView<'_>, _: f32| events.borrow_mut().push("depth".to_string()));

    session.feed(CameraSide::Right, &[0; 64]).expect("right");
    assert!(events.borrow().is_empty());
    session.feed(CameraSide::Left, &[0; 64]).expect("left");
    drop(session);

    assert_eq!(
        events.into_inner(),
        vec!["intensity:left", "intensity:right", "disparity", "depth"]
    );
}

#[test]
fn reregistering_an_observer_replaces_it() {
    let first = Cell::new(0u32);
    let second = Cell::new(0u32);
    let mut session = Session::new(config(4, 4, 4)).expect("session");
    session.on_disparity(|_: GridView<'_>| first.set(first.get() + 1));
    session.on_disparity(|_: GridView<'_>| second.set(second.get() + 1));
    process_pair(&mut session, &[0; 32], &[0; 32]).expect("process");
    drop(session);
    assert_eq!((first.get(), second.get()), (0, 1));
}

#[test]
fn caller_owned_buffers_survive_release() {
    let pair = synthetic_pair(16, 8, 4, 9);
    let mut left = vec![0u8; 16 * 8 * 2 + 10];
    let mut right = vec![0u8; 16 * 8 * 2];
    let mut depth = vec![-1.0f32; 4 * 2];

    let mut session = Session::new(SessionConfig {
        allocate: false,
        ..config(16, 8, 4)
    })
    .expect("session");
    assert_eq!(session.ownership(), None);
    assert_eq!(
        session.feed(CameraSide::Left, &pair.left),
        Err(FeedError::BuffersUnset)
    );
    session.clear_status();

    session
        .bind_buffers(&mut left, &mut right, &mut depth)
        .expect("bind");
    assert_eq!(session.ownership(), Some(Ownership::Borrowed));
    assert!(feed_pair(&mut session, &pair, 32).expect("feed"));
    let max_depth = session.max_depth_mm();
    session.release();
    session.release();
    assert_eq!(session.ownership(), None);
    assert!(session.feed(CameraSide::Left, &[0; 2]).is_err());
    drop(session);

    // Results stay in caller memory; frames now hold intensity, not color.
    assert!(depth.iter().all(|&d| d > 0.0 && d <= max_depth));
    assert_ne!(&left[..pair.left.len()], &pair.left[..]);
    assert!(left[pair.left.len()..].iter().all(|&b| b == 0));
}

#[test]
fn undersized_caller_buffers_are_rejected() {
    let mut left = vec![0u8; 63];
    let mut right = vec![0u8; 64];
    let mut depth = vec![0.0f32; 2];
    let mut session = Session::new(SessionConfig {
        allocate: false,
        ..config(8, 4, 4)
    })
    .expect("session");
    assert!(session
        .bind_buffers(&mut left, &mut right, &mut depth)
        .is_err());
    assert_eq!(session.ownership(), None);
}
