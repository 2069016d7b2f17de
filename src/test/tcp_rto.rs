use std::net::Ipv4Addr;

use crate::net::{Endpoint, Ipv4Net, LinkKind, NetWorld, NodeRole, Protocol};
use crate::proto::tcp::{TcpConfig, TcpConn, TcpStart};
use crate::sim::{SimTime, Simulator};

fn tiny_cfg() -> TcpConfig {
    let mss = 100;
    TcpConfig {
        mss,
        header_bytes: 40,
        init_cwnd_bytes: (mss as u64).saturating_mul(10),
        init_ssthresh_bytes: (mss as u64).saturating_mul(1_000_000),
        init_rto: SimTime::from_micros(100),
        max_rto: SimTime::from_millis(1),
    }
}

/// 两个节点、单条链路；`queue_pkts` 个 140B 数据段的出口缓冲
fn pair(queue_pkts: u64) -> (NetWorld, Endpoint, Endpoint) {
    let mut world = NetWorld::default();
    let h0 = world.net.add_node("h0", NodeRole::RemoteHost);
    let h1 = world.net.add_node("h1", NodeRole::Ue);
    let c = world.net.connect(
        h0,
        h1,
        LinkKind::Wired,
        1_000_000_000,
        SimTime::from_micros(1),
        queue_pkts * 140,
    );
    let subnet: Ipv4Net = "10.0.0.0/30".parse().expect("prefix");
    let (a, b) = (Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2));
    world.net.assign_address(c.a_iface, a, subnet).expect("a");
    world.net.assign_address(c.b_iface, b, subnet).expect("b");
    let src = Endpoint {
        node: h0,
        addr: a,
        port: 49153,
    };
    let dst = Endpoint {
        node: h1,
        addr: b,
        port: 9000,
    };
    (world, src, dst)
}

#[test]
fn tcp_rto_retransmits_after_tail_loss_and_completes() {
    let (mut world, src, dst) = pair(1);
    world.net.sinks.start(dst.node, dst.port, Protocol::Tcp);
    let mut sim = Simulator::default();

    // cwnd 为 10 个段而缓冲只有 1 个：1 个在发送、1 个排队，其余被丢弃。
    // 数据总量恰好 10 个段，没有后续新数据产生 dupACK，只能靠 RTO 恢复。
    let conn_id = world.net.tcp.alloc_id();
    let conn = TcpConn::new(conn_id, src, dst, Some(1000), SimTime::MAX, tiny_cfg());
    sim.schedule(SimTime::ZERO, TcpStart { conn });
    sim.run(&mut world);

    assert!(world.net.stats.dropped_pkts > 0, "expected at least one drop");
    let conn = world.net.tcp.get(conn_id).expect("tcp conn missing");
    assert!(conn.is_done(), "tcp conn did not complete");
    assert!(conn.retransmits() > 0);
    assert_eq!(conn.bytes_acked(), 1000);
    assert_eq!(conn.bytes_received(), 1000);
    assert_eq!(
        world
            .net
            .sinks
            .get(dst.node, dst.port, Protocol::Tcp)
            .map(|s| s.rx_bytes),
        Some(1000)
    );
}

#[test]
fn tcp_timeout_resends_every_outstanding_segment_at_once() {
    let (mut world, src, dst) = pair(4);
    world.net.sinks.start(dst.node, dst.port, Protocol::Tcp);
    let mut sim = Simulator::default();

    // 1 个在发送、4 个排队，后 5 个段一次性丢失，之后没有新数据可以触发 dupACK。
    // 一次超时就要把 5 个洞全部补上，而不是每次超时只补最早的一个。
    let conn_id = world.net.tcp.alloc_id();
    let conn = TcpConn::new(conn_id, src, dst, Some(1000), SimTime::MAX, tiny_cfg());
    sim.schedule(SimTime::ZERO, TcpStart { conn });
    sim.run(&mut world);

    assert_eq!(world.net.stats.dropped_pkts, 5);
    let conn = world.net.tcp.get(conn_id).expect("tcp conn missing");
    assert!(conn.is_done());
    assert_eq!(conn.bytes_received(), 1000);
    assert_eq!(conn.retransmits(), 5);
    let done = conn.done_time().expect("done");
    assert!(done < SimTime::from_micros(200), "finished at {done}");
}

#[test]
fn tcp_fast_retransmit_recovers_mid_stream_loss() {
    let (mut world, src, dst) = pair(4);
    world.net.sinks.start(dst.node, dst.port, Protocol::Tcp);
    let mut sim = Simulator::default();

    let conn_id = world.net.tcp.alloc_id();
    let conn = TcpConn::new(conn_id, src, dst, Some(200_000), SimTime::MAX, tiny_cfg());
    sim.schedule(SimTime::ZERO, TcpStart { conn });
    sim.run(&mut world);

    let conn = world.net.tcp.get(conn_id).expect("tcp conn missing");
    assert!(conn.is_done());
    assert_eq!(conn.bytes_received(), 200_000);
    assert!(world.net.stats.dropped_pkts > 0);
}

#[test]
fn tcp_without_listening_sink_delivers_nothing() {
    let (mut world, src, dst) = pair(64);
    let mut sim = Simulator::default();

    let conn_id = world.net.tcp.alloc_id();
    let conn = TcpConn::new(
        conn_id,
        src,
        dst,
        None,
        SimTime::from_millis(1),
        tiny_cfg(),
    );
    sim.schedule(SimTime::ZERO, TcpStart { conn });
    sim.run_until(SimTime::from_millis(2), &mut world);

    let conn = world.net.tcp.get(conn_id).expect("tcp conn missing");
    assert!(!conn.is_done());
    assert_eq!(conn.bytes_acked(), 0);
    assert_eq!(conn.bytes_received(), 0);
    assert!(conn.retransmits() > 0);
}

#[test]
fn unlimited_tcp_stops_sending_new_data_at_stop_time() {
    // 缓冲足够大，不丢包；RTO 远大于排队时延，不会误超时
    let (mut world, src, dst) = pair(1_000_000);
    world.net.sinks.start(dst.node, dst.port, Protocol::Tcp);
    let mut sim = Simulator::default();

    let cfg = TcpConfig {
        init_rto: SimTime::from_millis(5),
        max_rto: SimTime::from_millis(10),
        ..tiny_cfg()
    };
    let stop = SimTime::from_millis(1);
    let conn_id = world.net.tcp.alloc_id();
    let conn = TcpConn::new(conn_id, src, dst, None, stop, cfg);
    sim.schedule(SimTime::ZERO, TcpStart { conn });
    sim.run_until(SimTime::from_millis(20), &mut world);

    let sent_by_stop = world.net.stats.sent_pkts;
    sim.run_until(SimTime::from_millis(40), &mut world);
    assert_eq!(world.net.stats.sent_pkts, sent_by_stop);

    let conn = world.net.tcp.get(conn_id).expect("tcp conn missing");
    assert!(conn.bytes_received() > 0);
    assert!(!conn.is_done());
}
