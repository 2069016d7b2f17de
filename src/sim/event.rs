use super::simulator::Simulator;
use super::world::World;

/// 可调度的动作。按值消费自身，包、连接状态等可以直接移动进下一个事件。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 一次性闭包也可以直接调度
impl<F> Event for F
where
    F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
{
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        (*self)(sim, world)
    }
}
