use std::net::Ipv4Addr;

use crate::error::ConfigError;
use crate::net::{AddressPlan, HostAllocator, Ipv4Net, SubnetAllocator};

fn net(s: &str) -> Ipv4Net {
    s.parse().expect("valid prefix")
}

#[test]
fn ipv4_net_clears_host_bits_and_reports_ranges() {
    let n = Ipv4Net::new(Ipv4Addr::new(1, 2, 3, 4), 16).expect("valid");
    assert_eq!(n.network(), Ipv4Addr::new(1, 2, 0, 0));
    assert_eq!(n.mask(), Ipv4Addr::new(255, 255, 0, 0));
    assert_eq!(n.broadcast(), Ipv4Addr::new(1, 2, 255, 255));
    assert_eq!(n.size(), 65_536);
    assert_eq!(n.to_string(), "1.2.0.0/16");
    assert!(n.contains(Ipv4Addr::new(1, 2, 200, 1)));
    assert!(!n.contains(Ipv4Addr::new(1, 3, 0, 1)));

    assert!(Ipv4Net::new(Ipv4Addr::UNSPECIFIED, 33).is_err());
    assert_eq!(net("1.2.3.4"), Ipv4Net::host(Ipv4Addr::new(1, 2, 3, 4)));
    assert!("not-an-ip/8".parse::<Ipv4Net>().is_err());
    assert_eq!(net("1.2.3.4/16"), n);
    assert!(n < net("1.2.0.0/24"));
    assert!("1.2.3.4/40".parse::<Ipv4Net>().is_err());
}

#[test]
fn ipv4_net_overlap_is_symmetric() {
    let big = net("7.0.0.0/8");
    let inner = net("7.1.0.0/16");
    let outside = net("1.1.0.0/16");
    assert!(big.overlaps(&inner));
    assert!(inner.overlaps(&big));
    assert!(!big.overlaps(&outside));
    assert!(Ipv4Net::default_route().overlaps(&outside));
}

#[test]
fn subnet_allocator_hands_out_consecutive_blocks() {
    let mut a = SubnetAllocator::new(net("10.0.0.0/8"), 30, 0).expect("valid");
    assert_eq!(a.total(), 1 << 22);
    assert_eq!(a.next_subnet(), Some(net("10.0.0.0/30")));
    assert_eq!(a.next_subnet(), Some(net("10.0.0.4/30")));
    assert_eq!(a.next_subnet(), Some(net("10.0.0.8/30")));
}

#[test]
fn subnet_allocator_starting_at_one_skips_the_first_block_and_runs_out() {
    let mut a = SubnetAllocator::new(net("1.0.0.0/8"), 16, 1).expect("valid");
    assert_eq!(a.remaining(), 255);
    assert_eq!(a.next_subnet(), Some(net("1.1.0.0/16")));
    let last = (0..254).filter_map(|_| a.next_subnet()).last();
    assert_eq!(last, Some(net("1.255.0.0/16")));
    assert_eq!(a.remaining(), 0);
    assert_eq!(a.next_subnet(), None);

    assert!(SubnetAllocator::new(net("1.0.0.0/16"), 8, 0).is_err());
}

#[test]
fn host_allocator_skips_network_and_broadcast() {
    let mut h = HostAllocator::new(net("10.0.0.4/30"));
    assert_eq!(h.next_host(), Some(Ipv4Addr::new(10, 0, 0, 5)));
    assert_eq!(h.next_host(), Some(Ipv4Addr::new(10, 0, 0, 6)));
    assert_eq!(h.next_host(), None);

    let mut single = HostAllocator::new(net("10.0.0.9/32"));
    assert_eq!(single.next_host(), None);
}

#[test]
fn address_plan_rejects_overlapping_ranges() {
    let mut plan = AddressPlan::default();
    plan.reserve(net("7.0.0.0/8"), "ue-network").expect("first");
    plan.reserve(net("1.1.0.0/16"), "remote-host-0").expect("disjoint");

    let err = plan
        .reserve(net("7.0.0.0/30"), "bad")
        .expect_err("overlap must fail");
    assert!(matches!(
        err,
        ConfigError::AddressCollision { new, existing }
            if new == net("7.0.0.0/30") && existing == net("7.0.0.0/8")
    ));
    assert_eq!(plan.len(), 2);
}
