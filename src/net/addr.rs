//! IPv4 地址与地址分配
//!
//! - `Ipv4Net`：网络前缀（CIDR），基于 `ipnetwork::Ipv4Network`
//! - `SubnetAllocator`：在一个地址池内按顺序切分子网（严格递增，不回收）
//! - `HostAllocator`：在一个子网内按顺序分配主机地址
//! - `AddressPlan`：已分配地址段的登记表，拒绝任何重叠

use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnetwork::Ipv4Network;

use crate::error::ConfigError;

/// 规范化的网络前缀：主机位总是为零，因此相等比较就是前缀比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Net(Ipv4Network);

impl Ipv4Net {
    /// 构造前缀；主机位会被清零。
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self, ConfigError> {
        let masked = Ipv4Network::new(addr, prefix_len)
            .map_err(|e| ConfigError::invalid("prefix_len", format!("{addr}/{prefix_len}: {e}")))?
            .network();
        Ipv4Network::new(masked, prefix_len)
            .map(Self)
            .map_err(|e| ConfigError::invalid("prefix_len", e.to_string()))
    }

    /// 0.0.0.0/0
    pub fn default_route() -> Self {
        Self(Ipv4Network::new(Ipv4Addr::UNSPECIFIED, 0).expect("/0 is a valid prefix length"))
    }

    pub fn host(addr: Ipv4Addr) -> Self {
        Self(Ipv4Network::from(addr))
    }

    pub fn network(&self) -> Ipv4Addr {
        self.0.network()
    }

    pub fn prefix_len(&self) -> u8 {
        self.0.prefix()
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.0.mask()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.0.broadcast()
    }

    /// 地址总数（含网络地址与广播地址）；/0 也不会溢出
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len()))
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.0.contains(ip)
    }

    pub fn overlaps(&self, other: &Ipv4Net) -> bool {
        self.0.overlaps(other.0)
    }
}

impl PartialOrd for Ipv4Net {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ipv4Net {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.network(), self.prefix_len()).cmp(&(other.network(), other.prefix_len()))
    }
}

impl fmt::Display for Ipv4Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len())
    }
}

impl FromStr for Ipv4Net {
    type Err = ConfigError;

    // CIDR 语法，缺省前缀视为 /32
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let net: Ipv4Network = s
            .parse()
            .map_err(|e| ConfigError::invalid("ipv4_net", format!("`{s}`: {e}")))?;
        Ipv4Net::new(net.ip(), net.prefix())
    }
}

/// 在地址池 `pool` 内按固定前缀长度顺序切分子网。
///
/// 第 `i` 个子网（从 `first_index` 开始计）为 `pool.network() + i * subnet_size`。
#[derive(Debug, Clone)]
pub struct SubnetAllocator {
    pool: Ipv4Net,
    subnet_prefix: u8,
    next_index: u64,
}

impl SubnetAllocator {
    pub fn new(pool: Ipv4Net, subnet_prefix: u8, first_index: u64) -> Result<Self, ConfigError> {
        if subnet_prefix < pool.prefix_len() || subnet_prefix > 32 {
            return Err(ConfigError::invalid(
                "subnet_prefix",
                format!("/{subnet_prefix} cannot be carved out of {pool}"),
            ));
        }
        Ok(Self {
            pool,
            subnet_prefix,
            next_index: first_index,
        })
    }

    /// 池中子网总数
    pub fn total(&self) -> u64 {
        1u64 << (self.subnet_prefix - self.pool.prefix_len()) as u32
    }

    /// 尚未分配的子网数
    pub fn remaining(&self) -> u64 {
        self.total().saturating_sub(self.next_index)
    }

    pub fn pool(&self) -> Ipv4Net {
        self.pool
    }

    pub fn next_subnet(&mut self) -> Option<Ipv4Net> {
        if self.next_index >= self.total() {
            return None;
        }
        let step = 1u64 << (32 - self.subnet_prefix as u32);
        let offset = self.next_index.checked_mul(step)?;
        let bits = (self.pool.network().to_bits() as u64).checked_add(offset)?;
        let addr = Ipv4Addr::from_bits(u32::try_from(bits).ok()?);
        let net = Ipv4Net::new(addr, self.subnet_prefix).ok()?;
        self.next_index += 1;
        Some(net)
    }
}

/// 在一个子网内按顺序分配主机地址（跳过网络地址与广播地址）。
#[derive(Debug, Clone)]
pub struct HostAllocator {
    net: Ipv4Net,
    next: u64,
}

impl HostAllocator {
    pub fn new(net: Ipv4Net) -> Self {
        Self { net, next: 1 }
    }

    pub fn net(&self) -> Ipv4Net {
        self.net
    }

    pub fn next_host(&mut self) -> Option<Ipv4Addr> {
        // /31、/32 没有可用主机地址（本仿真不使用点对点 /31）
        if self.next + 1 >= self.net.size() {
            return None;
        }
        let bits = self.net.network().to_bits() as u64 + self.next;
        self.next += 1;
        Some(Ipv4Addr::from_bits(bits as u32))
    }
}

/// 已分配地址段登记表
#[derive(Debug, Clone, Default)]
pub struct AddressPlan {
    ranges: Vec<(Ipv4Net, String)>,
}

impl AddressPlan {
    /// 登记一个地址段；与已有任一地址段重叠则失败。
    pub fn reserve(&mut self, net: Ipv4Net, owner: impl Into<String>) -> Result<(), ConfigError> {
        if let Some((existing, _)) = self.ranges.iter().find(|(r, _)| r.overlaps(&net)) {
            return Err(ConfigError::AddressCollision {
                new: net,
                existing: *existing,
            });
        }
        self.ranges.push((net, owner.into()));
        Ok(())
    }

    pub fn ranges(&self) -> impl Iterator<Item = (Ipv4Net, &str)> {
        self.ranges.iter().map(|(n, o)| (*n, o.as_str()))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
