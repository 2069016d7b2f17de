use super::lte_world;
use crate::app::{
    OnOffApp, OnOffParams, SourceKind, TrafficClass, TrafficPlan, schedule_traffic,
};
use crate::error::ConfigError;
use crate::net::{Endpoint, FIRST_EPHEMERAL_PORT, NodeId, Protocol};
use crate::proto::tcp::TcpConfig;
use crate::sim::{SimTime, Simulator};

#[test]
fn classes_partition_ues_into_disjoint_subsets() {
    let (world, topo) = lte_world(2, 4, 10, true);
    let flows = TrafficPlan::default().flows(&topo, &world).expect("flows");
    assert_eq!(flows.len(), 10);

    let names: Vec<_> = flows.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names[0], "bulk-ue-0");
    assert_eq!(names[4], "bulk-ue-4");
    assert_eq!(names[5], "web-ue-5");
    assert_eq!(names[9], "web-ue-9");

    for f in &flows {
        let idx = topo.ue_index(f.destination).expect("ue destination");
        match f.class {
            TrafficClass::Bulk => {
                assert!(idx < 5);
                assert_eq!(f.origin, topo.remote_hosts[0]);
                assert_eq!(f.source.protocol(), Protocol::Tcp);
                assert_eq!(f.port, 9000);
            }
            TrafficClass::Web => {
                assert!(idx >= 5);
                assert_eq!(f.origin, topo.remote_hosts[1]);
                assert!(matches!(f.source, SourceKind::Bursty(_)));
                assert_eq!(f.port, 8000);
            }
        }
        assert!(f.sink_start < f.start);
        assert_eq!(f.stop, SimTime::from_secs(20));
    }
}

#[test]
fn odd_ue_count_puts_extra_ue_in_bulk_subset() {
    let (world, topo) = lte_world(2, 4, 3, true);
    let flows = TrafficPlan::default().flows(&topo, &world).expect("flows");
    let bulk = flows.iter().filter(|f| f.class == TrafficClass::Bulk).count();
    let web = flows.iter().filter(|f| f.class == TrafficClass::Web).count();
    assert_eq!((bulk, web), (2, 1));
}

#[test]
fn single_ue_needs_only_the_bulk_host() {
    let (world, topo) = lte_world(1, 4, 1, true);
    let flows = TrafficPlan::default().flows(&topo, &world).expect("flows");
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0].class, TrafficClass::Bulk);
}

#[test]
fn missing_web_host_is_rejected() {
    let (world, topo) = lte_world(1, 4, 10, true);
    let err = TrafficPlan::default().flows(&topo, &world).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::MissingRemoteHost {
            class: "web",
            index: 1,
            count: 1
        }
    ));
}

#[test]
fn sink_starting_with_source_is_rejected_before_anything_is_scheduled() {
    let (mut world, topo) = lte_world(2, 4, 10, true);
    let mut plan = TrafficPlan::default();
    plan.web.sink_start = plan.web.start;
    let flows = plan.flows(&topo, &world).expect("flows");
    let mut sim = Simulator::default();

    let err = schedule_traffic(&flows, &TcpConfig::default(), &mut world, &mut sim).unwrap_err();
    assert!(matches!(err, ConfigError::SinkNotBeforeSource { ref flow, .. } if flow == "web-ue-5"));
    assert_eq!(sim.pending(), 0);
    assert!(world.net.sinks.get(topo.ues[0], 9000, Protocol::Tcp).is_none());
}

#[test]
fn scheduling_registers_flows_and_allocates_ephemeral_ports() {
    let (mut world, topo) = lte_world(2, 4, 10, true);
    let flows = TrafficPlan::default().flows(&topo, &world).expect("flows");
    let mut sim = Simulator::default();
    let scheduled =
        schedule_traffic(&flows, &TcpConfig::default(), &mut world, &mut sim).expect("schedule");
    assert_eq!(scheduled.len(), 10);
    // 每条流一个接收器启动事件加一个源启动事件
    assert_eq!(sim.pending(), 20);

    let bulk_ports: Vec<_> = scheduled[..5].iter().map(|s| s.key.src_port).collect();
    let web_ports: Vec<_> = scheduled[5..].iter().map(|s| s.key.src_port).collect();
    let expected: Vec<_> = (0..5).map(|i| FIRST_EPHEMERAL_PORT + i).collect();
    assert_eq!(bulk_ports, expected);
    assert_eq!(web_ports, expected);

    for s in &scheduled {
        assert!(world.net.monitor.is_registered(&s.key));
        let ack_registered = world.net.monitor.is_registered(&s.key.reversed());
        assert_eq!(ack_registered, s.spec.class == TrafficClass::Bulk);
        assert_eq!(s.key.dst, world.radio.bearer(s.spec.destination).expect("bearer").ue_addr);
    }
}

#[test]
fn sinks_listen_only_after_their_start_time() {
    let (mut world, topo) = lte_world(2, 4, 10, true);
    let flows = TrafficPlan::default().flows(&topo, &world).expect("flows");
    let mut sim = Simulator::default();
    schedule_traffic(&flows, &TcpConfig::default(), &mut world, &mut sim).expect("schedule");

    let (bulk_ue, web_ue) = (topo.ues[0], topo.ues[5]);
    assert!(!world.net.sinks.is_listening(bulk_ue, 9000, Protocol::Tcp));

    sim.run_until(SimTime::from_millis(750), &mut world);
    assert!(world.net.sinks.is_listening(bulk_ue, 9000, Protocol::Tcp));
    assert!(!world.net.sinks.is_listening(web_ue, 8000, Protocol::Udp));

    sim.run_until(SimTime::from_millis(1500), &mut world);
    assert!(world.net.sinks.is_listening(web_ue, 8000, Protocol::Udp));
}

fn onoff(on_ms: u64, off_ms: u64) -> OnOffApp {
    let ep = |port| Endpoint {
        node: NodeId(0),
        addr: std::net::Ipv4Addr::LOCALHOST,
        port,
    };
    OnOffApp {
        src: ep(49153),
        dst: ep(8000),
        params: OnOffParams {
            on_time: SimTime::from_millis(on_ms),
            off_time: SimTime::from_millis(off_ms),
            ..OnOffParams::default()
        },
        start: SimTime::from_secs(2),
        stop: SimTime::from_secs(20),
    }
}

#[test]
fn onoff_source_skips_off_periods() {
    let app = onoff(100, 300);
    assert_eq!(app.next_send_at(SimTime::ZERO), SimTime::from_secs(2));
    assert_eq!(app.next_send_at(SimTime::from_millis(2050)), SimTime::from_millis(2050));
    assert_eq!(app.next_send_at(SimTime::from_millis(2100)), SimTime::from_millis(2400));
    assert_eq!(app.next_send_at(SimTime::from_millis(2399)), SimTime::from_millis(2400));
    assert_eq!(app.next_send_at(SimTime::from_millis(2450)), SimTime::from_millis(2450));

    let always_on = onoff(1000, 0);
    assert_eq!(
        always_on.next_send_at(SimTime::from_millis(7777)),
        SimTime::from_millis(7777)
    );
}

#[test]
fn onoff_interval_is_computed_from_payload_size() {
    let p = OnOffParams::default();
    // 1024 B * 8 / 5 Mbps = 1.6384 ms
    assert_eq!(p.interval(), SimTime(1_638_400));
    assert_eq!(p.wire_bytes(), 1052);
    assert!(OnOffParams { rate_bps: 0, ..p }.validate().is_err());
    assert!(OnOffParams { on_time: SimTime::ZERO, ..p }.validate().is_err());
}
