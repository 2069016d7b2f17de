use std::net::Ipv4Addr;

use crate::net::{IfaceId, Ipv4Net, Route, RouteChange, RouteOrigin, RoutingTable};

fn route(dest: &str, next_hop: Option<[u8; 4]>, iface: usize) -> Route {
    Route {
        dest: dest.parse().expect("valid prefix"),
        next_hop: next_hop.map(Ipv4Addr::from),
        iface: IfaceId(iface),
        origin: RouteOrigin::Static,
    }
}

#[test]
fn lookup_prefers_the_longest_matching_prefix() {
    let mut t = RoutingTable::default();
    t.install(route("0.0.0.0/0", Some([10, 0, 0, 1]), 0));
    t.install(route("7.0.0.0/8", None, 1));
    t.install(route("7.0.0.5/32", Some([10, 0, 0, 6]), 2));

    let hit = |ip: [u8; 4]| t.lookup(Ipv4Addr::from(ip)).map(|r| r.iface);
    assert_eq!(hit([7, 0, 0, 5]), Some(IfaceId(2)));
    assert_eq!(hit([7, 0, 0, 6]), Some(IfaceId(1)));
    assert_eq!(hit([1, 1, 0, 2]), Some(IfaceId(0)));
    assert_eq!(
        t.default_route().map(|r| r.dest),
        Some(Ipv4Net::default_route())
    );
}

#[test]
fn lookup_without_default_route_misses() {
    let mut t = RoutingTable::default();
    t.install(route("1.1.0.0/16", None, 0));
    assert!(t.lookup(Ipv4Addr::new(1, 2, 0, 1)).is_none());
    assert!(t.default_route().is_none());
}

#[test]
fn install_is_idempotent_and_replaces_by_destination() {
    let mut t = RoutingTable::default();
    let r = route("7.0.0.0/8", Some([1, 1, 0, 1]), 0);
    assert_eq!(t.install(r), RouteChange::Added);
    let snapshot = t.clone();
    assert_eq!(t.install(r), RouteChange::Unchanged);
    assert_eq!(t, snapshot);
    assert_eq!(t.len(), 1);

    let moved = route("7.0.0.0/8", Some([1, 1, 0, 1]), 3);
    assert_eq!(t.install(moved), RouteChange::Replaced);
    assert_eq!(t.len(), 1);
    assert_eq!(t.routes()[0].iface, IfaceId(3));
}

#[test]
fn routes_are_kept_most_specific_first() {
    let mut t = RoutingTable::default();
    t.install(route("0.0.0.0/0", Some([10, 0, 0, 1]), 0));
    t.install(route("7.0.0.9/32", None, 1));
    t.install(route("7.0.0.0/8", None, 2));
    t.install(route("7.0.0.3/32", None, 3));

    let order = t
        .routes()
        .iter()
        .map(|r| r.dest.to_string())
        .collect::<Vec<_>>();
    assert_eq!(order, ["7.0.0.3/32", "7.0.0.9/32", "7.0.0.0/8", "0.0.0.0/0"]);
}
