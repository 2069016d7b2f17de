//! TCP（简化版）协议实现
//!
//! 用于批量传输流量：
//! - 数据段/ACK 段，按地址与端口寻址
//! - Reno 风格的拥塞控制（慢启动 + AIMD，3 dupACK 快速重传，恢复结束时收缩 cwnd）
//! - 超时重传（指数退避 RTO，新 ACK 后复位）：超时后所有未确认段视为丢失，
//!   从最后确认处回退重发（go-back-N）
//! - 接收端缓存乱序段，发送累计 ACK
//!
//! 注意：这是仿真用途的“极简 TCP”，不实现握手/窗口通告/选择确认等。
//! 连接建立视为瞬时完成；接收端端口上没有监听的接收器时数据段被静默丢弃。

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::net::{Endpoint, NetWorld, Network, NodeId, Protocol, TcpSegment, Transport};
use crate::sim::{Event, SimTime, Simulator, World};

/// 一个 TCP 连接的唯一标识
pub type TcpConnId = u64;

/// TCP/IP 头部开销（字节）
pub const TCP_HEADER_BYTES: u32 = 40;

#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// MSS（数据段载荷大小，字节）
    pub mss: u32,
    /// 每个包的头部开销（数据段与 ACK 相同）
    pub header_bytes: u32,
    /// 初始 cwnd（字节）
    pub init_cwnd_bytes: u64,
    /// 初始 ssthresh（字节）
    pub init_ssthresh_bytes: u64,
    /// 初始 RTO
    pub init_rto: SimTime,
    /// 最大 RTO（用于退避上限）
    pub max_rto: SimTime,
}

impl Default for TcpConfig {
    fn default() -> Self {
        let mss = 1460;
        Self {
            mss,
            header_bytes: TCP_HEADER_BYTES,
            init_cwnd_bytes: (mss as u64).saturating_mul(10),
            init_ssthresh_bytes: (mss as u64).saturating_mul(1_000),
            init_rto: SimTime::from_millis(500),
            max_rto: SimTime::from_secs(8),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub src: Endpoint,
    pub dst: Endpoint,
    /// `None` 表示不限量，只受 `stop_at` 约束
    pub max_bytes: Option<u64>,
    /// 到达该时刻后不再发送新数据
    pub stop_at: SimTime,
    pub cfg: TcpConfig,

    // sender
    next_seq: u64,
    /// 已发出过的最高序号；低于它的段再次发送计为重传
    high_seq: u64,
    last_acked: u64,
    cwnd_bytes: u64,
    ssthresh_bytes: u64,
    dup_acks: u32,
    in_recovery: bool,
    rto: SimTime,
    /// 每次（重新）启动 RTO 定时器时递增；过期的定时器事件据此忽略
    rto_gen: u64,
    inflight: BTreeMap<u64, u32>, // seq -> len
    retransmits: u64,

    // receiver
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,
    bytes_received: u64,

    // stats
    start_at: Option<SimTime>,
    done_at: Option<SimTime>,
}

impl TcpConn {
    pub fn new(
        id: TcpConnId,
        src: Endpoint,
        dst: Endpoint,
        max_bytes: Option<u64>,
        stop_at: SimTime,
        cfg: TcpConfig,
    ) -> Self {
        let init_rto = cfg.init_rto;
        let cwnd = cfg.init_cwnd_bytes.max(cfg.mss as u64);
        let ssthresh = cfg.init_ssthresh_bytes.max(cfg.mss as u64);
        Self {
            id,
            src,
            dst,
            max_bytes,
            stop_at,
            cfg,
            next_seq: 0,
            high_seq: 0,
            last_acked: 0,
            cwnd_bytes: cwnd,
            ssthresh_bytes: ssthresh,
            dup_acks: 0,
            in_recovery: false,
            rto: init_rto,
            rto_gen: 0,
            inflight: BTreeMap::new(),
            retransmits: 0,
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            bytes_received: 0,
            start_at: None,
            done_at: None,
        }
    }

    pub fn bytes_acked(&self) -> u64 {
        self.last_acked
    }

    /// 接收端按序交付给应用的字节数
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn cwnd_bytes(&self) -> u64 {
        self.cwnd_bytes
    }

    pub fn retransmits(&self) -> u64 {
        self.retransmits
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    pub fn start_time(&self) -> Option<SimTime> {
        self.start_at
    }

    pub fn done_time(&self) -> Option<SimTime> {
        self.done_at
    }

    fn limit(&self) -> u64 {
        self.max_bytes.unwrap_or(u64::MAX)
    }

    fn inflight_bytes(&self) -> u64 {
        self.inflight.values().map(|&l| l as u64).sum()
    }

    fn earliest_unacked(&self) -> Option<(u64, u32)> {
        self.inflight.iter().next().map(|(&s, &l)| (s, l))
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    conns: HashMap<TcpConnId, TcpConn>,
    next_id: TcpConnId,
}

impl TcpStack {
    /// 分配一个新的连接号
    pub fn alloc_id(&mut self) -> TcpConnId {
        self.next_id += 1;
        self.next_id
    }

    pub fn insert(&mut self, conn: TcpConn) {
        self.conns.insert(conn.id, conn);
    }

    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn get_mut(&mut self, id: TcpConnId) -> Option<&mut TcpConn> {
        self.conns.get_mut(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &TcpConn> {
        self.conns.values()
    }

    fn emit(
        net: &mut Network,
        sim: &mut Simulator,
        from: Endpoint,
        to: Endpoint,
        conn: TcpConnId,
        seg: TcpSegment,
        size_bytes: u32,
    ) {
        let pkt = net.make_packet(
            from.addr,
            from.port,
            to.addr,
            to.port,
            Protocol::Tcp,
            size_bytes,
            Transport::Tcp { conn, seg },
        );
        net.send(from.node, pkt, sim);
    }

    fn arm_rto(conn: &mut TcpConn, sim: &mut Simulator) {
        conn.rto_gen += 1;
        sim.schedule_in(
            conn.rto,
            TcpRto {
                conn_id: conn.id,
                generation: conn.rto_gen,
            },
        );
    }

    pub(crate) fn send_data_if_possible(
        &mut self,
        id: TcpConnId,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.done_at.is_some() {
            return;
        }
        // 停止后不再发送新数据，但仍重发已发出过的数据
        let stopped = sim.now() >= conn.stop_at;
        if stopped && conn.next_seq >= conn.high_seq {
            return;
        }
        if conn.start_at.is_none() {
            conn.start_at = Some(sim.now());
        }

        // 发送窗口：inflight bytes < cwnd
        let mut avail = conn.cwnd_bytes.saturating_sub(conn.inflight_bytes());
        let limit = if stopped { conn.high_seq } else { conn.limit() };
        while avail > 0 && conn.next_seq < limit {
            let remain = limit - conn.next_seq;
            let len = (conn.cfg.mss as u64).min(remain).min(avail) as u32;
            if len == 0 {
                break;
            }
            let seq = conn.next_seq;
            conn.next_seq = conn.next_seq.saturating_add(len as u64);
            avail = avail.saturating_sub(len as u64);
            if seq < conn.high_seq {
                conn.retransmits += 1;
            }
            conn.high_seq = conn.high_seq.max(conn.next_seq);

            let was_idle = conn.inflight.is_empty();
            conn.inflight.insert(seq, len);
            if was_idle {
                Self::arm_rto(conn, sim);
            }

            let size = len.saturating_add(conn.cfg.header_bytes);
            Self::emit(net, sim, conn.src, conn.dst, id, TcpSegment::Data { seq, len }, size);
        }
    }

    fn retransmit_earliest(conn: &mut TcpConn, sim: &mut Simulator, net: &mut Network) {
        let Some((seq, len)) = conn.earliest_unacked() else {
            return;
        };
        conn.retransmits += 1;
        let size = len.saturating_add(conn.cfg.header_bytes);
        Self::emit(net, sim, conn.src, conn.dst, conn.id, TcpSegment::Data { seq, len }, size);
    }

    pub fn on_tcp_segment(
        &mut self,
        conn_id: TcpConnId,
        at: NodeId,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut Network,
    ) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        match seg {
            TcpSegment::Data { seq, len } => {
                if at != conn.dst.node {
                    return;
                }
                if !net.sinks.is_listening(at, conn.dst.port, Protocol::Tcp) {
                    trace!(conn = conn_id, port = conn.dst.port, "端口无监听，丢弃数据段");
                    return;
                }

                let before = conn.rcv_nxt;
                let end = seq.saturating_add(len as u64);
                if seq <= conn.rcv_nxt && end > conn.rcv_nxt {
                    conn.rcv_nxt = end;
                    // 合并已缓存的后续段（重发的段边界可能与原段不同）
                    while let Some((&s, &l)) = conn.ooo.first_key_value() {
                        if s > conn.rcv_nxt {
                            break;
                        }
                        conn.ooo.pop_first();
                        conn.rcv_nxt = conn.rcv_nxt.max(s.saturating_add(l as u64));
                    }
                } else if seq > conn.rcv_nxt {
                    let buffered = conn.ooo.entry(seq).or_insert(len);
                    *buffered = (*buffered).max(len);
                }
                let delivered = conn.rcv_nxt - before;
                if delivered > 0 {
                    conn.bytes_received += delivered;
                    net.sinks
                        .on_receive(at, conn.dst.port, Protocol::Tcp, delivered, sim.now());
                }

                // 无论是否乱序，都发累计 ACK（dupACK 体现为 ack 不前进）
                let ack = conn.rcv_nxt;
                let header = conn.cfg.header_bytes;
                Self::emit(net, sim, conn.dst, conn.src, conn_id, TcpSegment::Ack { ack }, header);
            }
            TcpSegment::Ack { ack } => {
                if at != conn.src.node {
                    return;
                }
                let mss = conn.cfg.mss as u64;

                if ack > conn.last_acked {
                    let newly_acked = ack - conn.last_acked;
                    conn.last_acked = ack;
                    // 回退重发后，接收端缓存的乱序段可能让 ACK 越过 next_seq
                    conn.next_seq = conn.next_seq.max(ack);
                    conn.dup_acks = 0;
                    conn.rto = conn.cfg.init_rto;

                    // 移除已确认段
                    while let Some((s, l)) = conn.earliest_unacked() {
                        if s.saturating_add(l as u64) > ack {
                            break;
                        }
                        conn.inflight.remove(&s);
                    }

                    if conn.in_recovery {
                        // 恢复结束：cwnd 收缩回 ssthresh
                        conn.in_recovery = false;
                        conn.cwnd_bytes = conn.ssthresh_bytes;
                    } else if conn.cwnd_bytes < conn.ssthresh_bytes {
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(newly_acked);
                    } else {
                        // AIMD：每个 ACK 让 cwnd 以 mss^2/cwnd 增长（至少 +1）
                        let inc = (mss.saturating_mul(mss) / conn.cwnd_bytes).max(1);
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(inc);
                    }

                    // 完成判定：所有数据都被累计确认
                    if conn.last_acked >= conn.limit() && conn.done_at.is_none() {
                        conn.done_at = Some(sim.now());
                        conn.rto_gen += 1;
                        debug!(conn = conn_id, bytes = conn.last_acked, "🏁 TCP 传输完成");
                        return;
                    }

                    if conn.inflight.is_empty() {
                        conn.rto_gen += 1;
                    } else {
                        Self::arm_rto(conn, sim);
                    }
                    self.send_data_if_possible(conn_id, sim, net);
                } else if ack == conn.last_acked && !conn.inflight.is_empty() {
                    conn.dup_acks = conn.dup_acks.saturating_add(1);
                    if conn.dup_acks == 3 {
                        // 快速重传：重传 earliest unacked
                        conn.ssthresh_bytes = (conn.inflight_bytes() / 2).max(2 * mss);
                        conn.cwnd_bytes = conn.ssthresh_bytes.saturating_add(3 * mss);
                        conn.in_recovery = true;
                        Self::retransmit_earliest(conn, sim, net);
                    } else if conn.dup_acks > 3 {
                        // 快速恢复：每个额外 dupACK 增加 cwnd 一个 MSS
                        conn.cwnd_bytes = conn.cwnd_bytes.saturating_add(mss);
                        self.send_data_if_possible(conn_id, sim, net);
                    }
                }
            }
        }
    }

    fn on_rto(&mut self, conn_id: TcpConnId, generation: u64, sim: &mut Simulator, net: &mut Network) {
        let Some(conn) = self.conns.get_mut(&conn_id) else {
            return;
        };
        if conn.done_at.is_some() || conn.rto_gen != generation || conn.inflight.is_empty() {
            return;
        }

        // 超时：回到慢启动，未确认段全部视为丢失
        let mss = conn.cfg.mss as u64;
        conn.ssthresh_bytes = (conn.inflight_bytes() / 2).max(2 * mss);
        conn.cwnd_bytes = mss;
        conn.dup_acks = 0;
        conn.in_recovery = false;
        conn.rto = conn.rto.saturating_add(conn.rto).min(conn.cfg.max_rto);
        let outstanding = conn.inflight.len();
        conn.inflight.clear();
        conn.next_seq = conn.last_acked;
        debug!(conn = conn_id, rto = ?conn.rto, outstanding, "⏰ TCP 超时，回退重发");

        // 窗口为一个 MSS，重新发出最早的未确认段并启动定时器
        self.send_data_if_possible(conn_id, sim, net);
    }
}

/// 启动一个 TCP 流（连接已建立假设）
#[derive(Debug)]
pub struct TcpStart {
    pub conn: TcpConn,
}

impl Event for TcpStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpStart { conn } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };

        let id = conn.id;
        debug!(conn = id, src = %conn.src.addr, dst = %conn.dst.addr, "▶️  TCP 流启动");
        // 规避同时借用 `w.net` 与 `w.net.tcp`
        let mut tcp = std::mem::take(&mut w.net.tcp);
        tcp.insert(conn);
        tcp.send_data_if_possible(id, sim, &mut w.net);
        w.net.tcp = tcp;
    }
}

/// TCP RTO 事件：仅当定时器代号仍是最新时触发超时重传
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
    pub generation: u64,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto {
            conn_id,
            generation,
        } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<NetWorld>() else {
            return;
        };
        let mut tcp = std::mem::take(&mut w.net.tcp);
        tcp.on_rto(conn_id, generation, sim, &mut w.net);
        w.net.tcp = tcp;
    }
}
