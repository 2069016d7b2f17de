//! 离散事件内核
//!
//! 单线程、确定性：事件按 (时刻, 调度序号) 执行，同一时刻先调度者先执行。
//! 业务状态全部放在实现了 `World` 的类型里，事件执行时再 downcast 取回。

mod agenda;
mod event;
mod simulator;
mod time;
mod world;

pub use event::Event;
pub use simulator::Simulator;
pub use time::SimTime;
pub use world::World;
