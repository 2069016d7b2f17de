//! 尾丢弃 FIFO：放不下的新包直接拒绝，已排队的包不受影响

use std::collections::VecDeque;

use crate::net::Packet;

use super::{PacketQueue, QueueStats};

#[derive(Debug)]
pub struct DropTailQueue {
    limit_bytes: u64,
    occupied: u64,
    fifo: VecDeque<Packet>,
    stats: QueueStats,
}

impl DropTailQueue {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            occupied: 0,
            fifo: VecDeque::new(),
            stats: QueueStats::default(),
        }
    }

    fn fits(&self, size: u64) -> bool {
        self.occupied
            .checked_add(size)
            .is_some_and(|total| total <= self.limit_bytes)
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        let size = pkt.size_bytes as u64;
        if !self.fits(size) {
            self.stats.dropped_pkts += 1;
            self.stats.dropped_bytes += size;
            return Err(pkt);
        }
        self.occupied += size;
        self.stats.enqueued_pkts += 1;
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.occupied);
        self.fifo.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.fifo.pop_front()?;
        self.occupied = self.occupied.saturating_sub(pkt.size_bytes as u64);
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.fifo.len()
    }

    fn bytes(&self) -> u64 {
        self.occupied
    }

    fn capacity_bytes(&self) -> u64 {
        self.limit_bytes
    }

    fn stats(&self) -> QueueStats {
        self.stats
    }
}
