//! 有状态传输协议
//!
//! 目前只有批量流量使用的简化 TCP（Reno 式拥塞控制）。UDP 没有连接状态，
//! 由 `app` 中的源和接收器直接收发。

pub mod tcp;
