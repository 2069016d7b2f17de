//! 传输层标签
//!
//! 网络层只看地址和端口；到达目的节点后按标签交给 UDP 接收器或 TCP 连接。

/// 包携带的传输层信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// 无连接数据报，直接计入接收器
    Udp,
    /// 属于连接 `conn` 的 TCP 段
    Tcp { conn: u64, seg: TcpSegment },
}

/// 简化的 TCP 段：连接视为已建立，没有握手与挥手
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpSegment {
    /// `seq` 为首字节序号，`len` 为载荷字节数
    Data { seq: u64, len: u32 },
    /// 累计确认：期望收到的下一个字节
    Ack { ack: u64 },
}
