//! Hybrid time boundary tests
//!
//! Covers the boundary lifecycle across both publish orders of a hybrid
//! pair, recomputation on offline refresh, and degraded metadata handling.

mod common;

use std::sync::Arc;

use common::*;
use shardroute::shardroute::cluster::{ClusterCoordinator, SegmentState};
use shardroute::shardroute::routing::{
    DefaultRoutingTableSelector, RoutingConfig, RoutingManager, TimeBoundaryService, TimeUnit,
};

fn new_manager(coordinator: &Arc<MockCoordinator>) -> RoutingManager {
    RoutingManager::new(
        Arc::clone(coordinator) as Arc<dyn ClusterCoordinator>,
        Arc::new(DefaultRoutingTableSelector::new()),
        RoutingConfig::new().with_builder_seed(3),
    )
}

#[tokio::test]
async fn test_boundary_set_when_realtime_side_appears() {
    let coordinator = Arc::new(MockCoordinator::new());
    let manager = new_manager(&coordinator);

    let offline_ev = external_view(
        "hyb_OFFLINE",
        1,
        &[
            ("s1", "srvA", SegmentState::Online),
            ("s2", "srvA", SegmentState::Online),
        ],
    );
    coordinator.put_external_view(offline_ev.clone());
    coordinator.put_property(
        "/SEGMENTS/hyb_OFFLINE/s1",
        segment_time_record("s1", "daysSinceEpoch", 19874, "DAYS"),
    );
    coordinator.put_property(
        "/SEGMENTS/hyb_OFFLINE/s2",
        segment_time_record("s2", "daysSinceEpoch", 19875, "DAYS"),
    );

    // Offline side alone: no realtime sibling is served, so no boundary yet.
    manager
        .mark_data_resource_online("hyb_OFFLINE", Some(offline_ev), vec![instance("srvA", 1)])
        .await;
    assert!(manager.time_boundary_service().get("hyb_OFFLINE").is_none());

    // Realtime side appears: the boundary is computed from the offline
    // segments even though the triggering view is the realtime one.
    let hlc = hlc_segment("grp0", 0);
    let realtime_ev = external_view(
        "hyb_REALTIME",
        1,
        &[(hlc.as_str(), "srvB", SegmentState::Online)],
    );
    manager
        .mark_data_resource_online("hyb_REALTIME", Some(realtime_ev), vec![instance("srvB", 1)])
        .await;

    let boundary = manager.time_boundary_service().get("hyb_OFFLINE").unwrap();
    assert_eq!(boundary.time_column, "daysSinceEpoch");
    assert_eq!(boundary.time_value, 19874); // max end time minus one unit
    assert_eq!(boundary.time_unit, TimeUnit::Days);
}

#[tokio::test]
async fn test_boundary_recomputed_on_offline_refresh() {
    let coordinator = Arc::new(MockCoordinator::new());
    let manager = new_manager(&coordinator);

    let offline_v1 = external_view("hyb_OFFLINE", 1, &[("s1", "srvA", SegmentState::Online)]);
    coordinator.put_external_view(offline_v1.clone());
    coordinator.put_property(
        "/SEGMENTS/hyb_OFFLINE/s1",
        segment_time_record("s1", "daysSinceEpoch", 19875, "DAYS"),
    );
    manager
        .mark_data_resource_online("hyb_OFFLINE", Some(offline_v1), vec![instance("srvA", 1)])
        .await;

    let hlc = hlc_segment("grp0", 0);
    let realtime_ev = external_view(
        "hyb_REALTIME",
        1,
        &[(hlc.as_str(), "srvB", SegmentState::Online)],
    );
    manager
        .mark_data_resource_online("hyb_REALTIME", Some(realtime_ev), vec![instance("srvB", 1)])
        .await;
    assert_eq!(
        manager
            .time_boundary_service()
            .get("hyb_OFFLINE")
            .unwrap()
            .time_value,
        19874
    );

    // A day of data lands in the offline side; the boundary moves with it.
    let offline_v2 = external_view(
        "hyb_OFFLINE",
        2,
        &[
            ("s1", "srvA", SegmentState::Online),
            ("s2", "srvA", SegmentState::Online),
        ],
    );
    coordinator.put_external_view(offline_v2.clone());
    coordinator.put_property(
        "/SEGMENTS/hyb_OFFLINE/s2",
        segment_time_record("s2", "daysSinceEpoch", 19876, "DAYS"),
    );
    manager
        .mark_data_resource_online("hyb_OFFLINE", Some(offline_v2), vec![instance("srvA", 1)])
        .await;

    assert_eq!(
        manager
            .time_boundary_service()
            .get("hyb_OFFLINE")
            .unwrap()
            .time_value,
        19875
    );
}

#[tokio::test]
async fn test_segments_without_metadata_are_skipped() {
    let coordinator = Arc::new(MockCoordinator::new());
    let service = TimeBoundaryService::new(Arc::new(MockCoordinator::new()) as Arc<dyn ClusterCoordinator>);

    // A fresh service over a coordinator with no metadata: update keeps no
    // boundary rather than inventing one.
    let ev = external_view("t_OFFLINE", 1, &[("s1", "srvA", SegmentState::Online)]);
    service.update(&ev).await.unwrap();
    assert!(service.get("t_OFFLINE").is_none());

    // With one of two segments missing metadata, the boundary comes from
    // the one that has it.
    coordinator.put_property(
        "/SEGMENTS/t_OFFLINE/s2",
        segment_time_record("s2", "hoursSinceEpoch", 477_000, "HOURS"),
    );
    let service = TimeBoundaryService::new(Arc::clone(&coordinator) as Arc<dyn ClusterCoordinator>);
    let ev = external_view(
        "t_OFFLINE",
        2,
        &[
            ("s1", "srvA", SegmentState::Online),
            ("s2", "srvA", SegmentState::Online),
        ],
    );
    service.update(&ev).await.unwrap();
    let boundary = service.get("t_OFFLINE").unwrap();
    assert_eq!(boundary.time_value, 476_999);
    assert_eq!(boundary.time_unit, TimeUnit::Hours);
}

#[tokio::test]
async fn test_only_online_segments_feed_the_boundary() {
    let coordinator = Arc::new(MockCoordinator::new());
    coordinator.put_property(
        "/SEGMENTS/t_OFFLINE/s_online",
        segment_time_record("s_online", "daysSinceEpoch", 100, "DAYS"),
    );
    coordinator.put_property(
        "/SEGMENTS/t_OFFLINE/s_error",
        segment_time_record("s_error", "daysSinceEpoch", 200, "DAYS"),
    );

    let service = TimeBoundaryService::new(Arc::clone(&coordinator) as Arc<dyn ClusterCoordinator>);
    let ev = external_view(
        "t_OFFLINE",
        1,
        &[
            ("s_online", "srvA", SegmentState::Online),
            ("s_error", "srvA", SegmentState::Error),
        ],
    );
    service.update(&ev).await.unwrap();

    // The errored segment's newer end time must not leak into the boundary.
    assert_eq!(service.get("t_OFFLINE").unwrap().time_value, 99);
}

#[tokio::test]
async fn test_remove_drops_boundary() {
    let coordinator = Arc::new(MockCoordinator::new());
    coordinator.put_property(
        "/SEGMENTS/t_OFFLINE/s1",
        segment_time_record("s1", "daysSinceEpoch", 100, "DAYS"),
    );
    let service = TimeBoundaryService::new(Arc::clone(&coordinator) as Arc<dyn ClusterCoordinator>);
    let ev = external_view("t_OFFLINE", 1, &[("s1", "srvA", SegmentState::Online)]);
    service.update(&ev).await.unwrap();
    assert!(service.get("t_OFFLINE").is_some());

    service.remove("t_OFFLINE");
    assert!(service.get("t_OFFLINE").is_none());
}
