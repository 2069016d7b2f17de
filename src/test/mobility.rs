use crate::error::ConfigError;
use crate::mobility::{
    Bounds, MAX_WALK_LEGS, MobilityPlan, MobilityTable, Position, RandomWalk, RandomWalkParams,
    Trajectory, Waypoint, WaypointPath, assign_mobility, derive_seed,
};
use crate::net::NetWorld;
use crate::sim::SimTime;
use crate::topo::{LteTopologyOpts, UeGroup, build_lte_topology};

fn loop_schedule() -> Vec<Waypoint> {
    vec![
        Waypoint::new(0.0, Position::new(10.0, 10.0, 0.0)),
        Waypoint::new(5.0, Position::new(150.0, 10.0, 0.0)),
        Waypoint::new(10.0, Position::new(150.0, 150.0, 0.0)),
        Waypoint::new(15.0, Position::new(10.0, 150.0, 0.0)),
        Waypoint::new(20.0, Position::new(10.0, 10.0, 0.0)),
    ]
}

fn walk_params() -> RandomWalkParams {
    RandomWalkParams {
        speed: 5.0,
        bounds: Bounds::default(),
        dwell: SimTime::from_secs(1),
    }
}

#[test]
fn waypoint_path_interpolates_linearly() {
    let path = WaypointPath::new(&loop_schedule()).expect("valid");
    let at = |s: f64| path.position_at(SimTime::from_secs_f64(s));

    assert_eq!(at(0.0), Position::new(10.0, 10.0, 0.0));
    assert_eq!(at(2.5), Position::new(80.0, 10.0, 0.0));
    assert_eq!(at(5.0), Position::new(150.0, 10.0, 0.0));
    assert_eq!(at(7.5), Position::new(150.0, 80.0, 0.0));
    assert_eq!(at(12.5), Position::new(80.0, 150.0, 0.0));
}

#[test]
fn waypoint_path_holds_before_first_and_after_last() {
    let path = WaypointPath::new(&[
        Waypoint::new(2.0, Position::new(1.0, 2.0, 0.0)),
        Waypoint::new(4.0, Position::new(5.0, 2.0, 0.0)),
    ])
    .expect("valid");
    assert_eq!(path.position_at(SimTime::ZERO), Position::new(1.0, 2.0, 0.0));
    assert_eq!(path.position_at(SimTime::from_secs(1)), Position::new(1.0, 2.0, 0.0));
    assert_eq!(path.position_at(SimTime::from_secs(3)), Position::new(3.0, 2.0, 0.0));
    assert_eq!(path.position_at(SimTime::from_secs(100)), Position::new(5.0, 2.0, 0.0));
}

#[test]
fn waypoint_path_rejects_bad_schedules() {
    assert!(matches!(
        WaypointPath::new(&[]),
        Err(ConfigError::EmptyWaypoints)
    ));
    let p = Position::new(0.0, 0.0, 0.0);
    let err = WaypointPath::new(&[
        Waypoint::new(0.0, p),
        Waypoint::new(5.0, p),
        Waypoint::new(5.0, p),
    ])
    .expect_err("equal times must fail");
    assert!(matches!(err, ConfigError::WaypointsNotIncreasing { index: 2, .. }));
    assert!(WaypointPath::new(&[Waypoint::new(f64::NAN, p)]).is_err());

    // 相差不到 1 ns 的时间在仿真时钟上相同
    let err = WaypointPath::new(&[Waypoint::new(0.1, p), Waypoint::new(0.100_000_000_1, p)])
        .expect_err("same nanosecond must fail");
    assert!(matches!(err, ConfigError::WaypointsNotIncreasing { index: 1, .. }));
    assert!(err.to_string().contains("nanosecond resolution"), "{err}");
}

#[test]
fn random_walk_never_leaves_bounds() {
    let params = walk_params();
    for seed in 0..20 {
        let walk = RandomWalk::generate(
            Position::new(199.0, 1.0, 0.0),
            params,
            seed,
            SimTime::from_secs(60),
        )
        .expect("walk");
        assert!(walk.legs() > 0);
        for ms in (0..=60_000).step_by(50) {
            let p = walk.position_at(SimTime::from_millis(ms));
            assert!(
                params.bounds.contains(&p),
                "seed {seed} left bounds at {ms}ms: {p:?}"
            );
        }
    }
}

#[test]
fn random_walk_moves_at_constant_speed() {
    let walk = RandomWalk::generate(
        Position::new(100.0, 100.0, 0.0),
        walk_params(),
        7,
        SimTime::from_secs(10),
    )
    .expect("walk");
    // 前 0.5 秒不会碰到边界，也不会转向
    let a = walk.position_at(SimTime::ZERO);
    let b = walk.position_at(SimTime::from_millis(500));
    assert!((a.distance(&b) - 2.5).abs() < 1e-9);
}

#[test]
fn random_walk_is_deterministic_and_pure() {
    let walk_for = |seed| {
        RandomWalk::generate(
            Position::new(50.0, 50.0, 0.0),
            walk_params(),
            seed,
            SimTime::from_secs(30),
        )
        .expect("walk")
    };
    let a = walk_for(42);
    let b = walk_for(42);
    assert_eq!(a, b);

    let t = SimTime::from_millis(12_345);
    let first = a.position_at(t);
    let _ = a.position_at(SimTime::from_secs(29));
    assert_eq!(a.position_at(t), first);

    assert_ne!(walk_for(43), a);
}

#[test]
fn random_walk_rejects_invalid_parameters() {
    let start = Position::new(50.0, 50.0, 0.0);
    let horizon = SimTime::from_secs(1);
    let mut p = walk_params();
    p.speed = -1.0;
    assert!(RandomWalk::generate(start, p, 1, horizon).is_err());

    let nan = Position::new(f64::NAN, 50.0, 0.0);
    assert!(RandomWalk::generate(nan, walk_params(), 1, horizon).is_err());

    // 越界的起点被夹回边界内
    let outside = Position::new(500.0, 50.0, 0.0);
    let walk = RandomWalk::generate(outside, walk_params(), 1, horizon).expect("clamped");
    assert_eq!(walk.position_at(SimTime::ZERO), Position::new(200.0, 50.0, 0.0));
}

#[test]
fn random_walk_in_tiny_bounds_stops_at_the_leg_limit() {
    let params = RandomWalkParams {
        speed: 100.0,
        bounds: Bounds {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
        },
        dwell: SimTime::from_secs(1),
    };
    let err = RandomWalk::generate(
        Position::new(0.5, 0.5, 0.0),
        params,
        3,
        SimTime::from_secs(10_000),
    )
    .expect_err("bouncing every few ms must hit the limit");
    assert!(matches!(
        err,
        ConfigError::TooFineResolution { limit, .. } if limit == MAX_WALK_LEGS
    ));
}

#[test]
fn derived_seeds_differ_per_node_and_stream() {
    assert_ne!(derive_seed(1, 0, 1), derive_seed(1, 1, 1));
    assert_ne!(derive_seed(1, 0, 1), derive_seed(1, 0, 2));
    assert_ne!(derive_seed(1, 0, 1), derive_seed(2, 0, 1));
    assert_eq!(derive_seed(9, 3, 2), derive_seed(9, 3, 2));
}

fn plan(ap_positions: Vec<Position>) -> MobilityPlan {
    MobilityPlan {
        ap_positions,
        walk: walk_params(),
        waypoints: loop_schedule(),
        seed: 1,
        horizon: SimTime::from_secs(20),
    }
}

fn corners() -> Vec<Position> {
    vec![
        Position::new(0.0, 0.0, 20.0),
        Position::new(200.0, 0.0, 20.0),
        Position::new(0.0, 200.0, 20.0),
        Position::new(200.0, 200.0, 20.0),
    ]
}

#[test]
fn assign_mobility_gives_every_spatial_node_one_trajectory() {
    let mut world = NetWorld::default();
    let topo = build_lte_topology(&mut world, &LteTopologyOpts::default()).expect("topology");
    let mut table = MobilityTable::default();
    assign_mobility(&mut table, &topo, &plan(corners())).expect("mobility");

    assert_eq!(table.len(), 4 + 10);
    assert!(table.get(topo.gateway).is_none());
    assert!(topo.remote_hosts.iter().all(|&h| table.get(h).is_none()));

    for (&ap, pos) in topo.access_points.iter().zip(corners()) {
        assert_eq!(table.get(ap), Some(&Trajectory::Static(pos)));
    }
    for &ue in topo.ue_group(UeGroup::A) {
        assert_eq!(table.get(ue).map(Trajectory::kind), Some("bounded_random_walk"));
    }
    for &ue in topo.ue_group(UeGroup::B) {
        assert_eq!(table.get(ue).map(Trajectory::kind), Some("waypoint_sequence"));
        assert_eq!(
            table.position_of(ue, SimTime::from_secs_f64(2.5)),
            Some(Position::new(80.0, 10.0, 0.0))
        );
    }
}

#[test]
fn assign_mobility_rejects_position_count_mismatch_without_writing() {
    let mut world = NetWorld::default();
    let topo = build_lte_topology(&mut world, &LteTopologyOpts::default()).expect("topology");
    let mut table = MobilityTable::default();

    let mut three = corners();
    three.pop();
    let err = assign_mobility(&mut table, &topo, &plan(three)).expect_err("must fail");
    assert!(matches!(err, ConfigError::ApPositionCount { expected: 4, got: 3 }));
    assert!(table.is_empty());

    let mut bad_schedule = plan(corners());
    bad_schedule.waypoints.clear();
    assert!(assign_mobility(&mut table, &topo, &bad_schedule).is_err());
    assert!(table.is_empty());
}
