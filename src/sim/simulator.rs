//! 仿真器：时钟 + 待执行事件表

use tracing::{debug, info, trace};

use super::agenda::Agenda;
use super::event::Event;
use super::time::SimTime;
use super::world::World;

#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    agenda: Agenda,
    executed: u64,
}

impl Simulator {
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.agenda.len()
    }

    /// 已执行的事件总数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 下一个待执行事件的时刻
    pub fn next_event_at(&self) -> Option<SimTime> {
        self.agenda.next_at()
    }

    /// 在 `at` 执行 `ev`；早于当前时刻的请求按当前时刻处理
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.agenda.push(at, Box::new(ev));
        trace!(
            event = std::any::type_name::<E>(),
            %at,
            seq,
            pending = self.agenda.len(),
            "调度事件"
        );
    }

    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        self.schedule(self.now.saturating_add(delay), ev);
    }

    /// 执行所有不晚于 `until` 的事件（含恰好在 `until` 的），之后时钟停在 `until`
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        let before = self.executed;
        self.drain(until, world);
        self.now = self.now.max(until);
        debug!(
            now = %self.now,
            executed = self.executed - before,
            pending = self.agenda.len(),
            "运行到指定时刻"
        );
    }

    /// 一直运行到没有事件
    pub fn run(&mut self, world: &mut dyn World) {
        let before = self.executed;
        self.drain(SimTime::MAX, world);
        debug!(now = %self.now, executed = self.executed - before, "事件表已空");
    }

    fn drain(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(entry) = self.agenda.pop_due(until) {
            self.now = entry.at;
            self.executed += 1;
            entry.ev.execute(self, world);
        }
    }

    /// 丢弃所有未执行的事件，返回丢弃数量
    pub fn cancel_pending(&mut self) -> usize {
        let n = self.agenda.clear();
        if n > 0 {
            info!(cancelled = n, now = %self.now, "⏹️  取消剩余事件");
        }
        n
    }
}
