use std::any::Any;

use super::network::Network;
use crate::lte::RadioAccess;
use crate::sim::World;

/// 仿真世界：有线/无线网络本体，加上无线接入子系统（设备、承载、UE 地址池）
#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub radio: RadioAccess,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
