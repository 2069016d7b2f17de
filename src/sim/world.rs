use std::any::Any;

/// 仿真状态的持有者。事件拿到的是 `&mut dyn World`，再 downcast 成具体类型。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_any(&self) -> &dyn Any;
}
