// Deterministic endpoint-to-port resolution. Explicit ports always win;
// defaults come from a per-protocol-family base plus a counter, skipping
// anything already claimed, so identical input always yields identical
// assignments.

use crate::types::{Endpoint, Protocol};
use std::collections::{BTreeMap, BTreeSet};

const HTTP_BASE_PORT: u16 = 10000;
const TCP_BASE_PORT: u16 = 11000;
const UDP_BASE_PORT: u16 = 12000;

/// Concrete port resolved for one endpoint. Recomputed per compile, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedPort {
    pub endpoint: Endpoint,
    pub port: u16,
}

/// Assigns exactly one port to every endpoint, in declaration-index order.
/// Guarantees: pairwise-distinct ports, explicit ports kept verbatim, and
/// the same result on every run over the same input.
pub fn assign_ports(endpoints: &BTreeMap<String, Endpoint>) -> Vec<AssignedPort> {
    let mut ordered: Vec<&Endpoint> = endpoints.values().collect();
    ordered.sort_by_key(|endpoint| endpoint.index);

    // Defaults must dodge every explicitly claimed port, not just the ones
    // seen so far.
    let mut taken: BTreeSet<u16> = ordered.iter().filter_map(|endpoint| endpoint.port).collect();
    let mut next_default: BTreeMap<u16, u16> = BTreeMap::new();

    let mut assigned = Vec::with_capacity(ordered.len());
    for endpoint in ordered {
        let port = match endpoint.port {
            Some(explicit) => explicit,
            None => {
                let base = default_base(&endpoint.protocol);
                let mut candidate = *next_default.get(&base).unwrap_or(&base);
                while taken.contains(&candidate) {
                    candidate += 1;
                }
                next_default.insert(base, candidate + 1);
                candidate
            }
        };
        taken.insert(port);
        assigned.push(AssignedPort {
            endpoint: endpoint.clone(),
            port,
        });
    }
    assigned
}

fn default_base(protocol: &Protocol) -> u16 {
    match protocol {
        Protocol::Http { .. } => HTTP_BASE_PORT,
        Protocol::Tcp { .. } => TCP_BASE_PORT,
        Protocol::Udp { .. } => UDP_BASE_PORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, index: usize, port: Option<u16>, protocol: Protocol) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            index,
            port,
            protocol,
        }
    }

    fn endpoints(list: Vec<Endpoint>) -> BTreeMap<String, Endpoint> {
        list.into_iter().map(|e| (e.name.clone(), e)).collect()
    }

    #[test]
    fn test_explicit_ports_are_kept_verbatim() {
        let input = endpoints(vec![
            endpoint("web", 0, Some(8080), Protocol::Http { acls: vec![] }),
            endpoint("debug", 1, Some(5005), Protocol::Tcp { acls: vec![] }),
        ]);
        let assigned = assign_ports(&input);
        assert_eq!(assigned[0].port, 8080);
        assert_eq!(assigned[1].port, 5005);
    }

    #[test]
    fn test_defaults_follow_declaration_index_per_family() {
        let input = endpoints(vec![
            endpoint("a", 0, None, Protocol::Http { acls: vec![] }),
            endpoint("b", 1, None, Protocol::Http { acls: vec![] }),
            endpoint("c", 2, None, Protocol::Udp { acls: vec![] }),
        ]);
        let assigned = assign_ports(&input);
        assert_eq!(assigned[0].port, 10000);
        assert_eq!(assigned[1].port, 10001);
        assert_eq!(assigned[2].port, 12000);
    }

    #[test]
    fn test_defaults_skip_explicitly_claimed_ports() {
        // The explicit endpoint sits exactly on the http default base.
        let input = endpoints(vec![
            endpoint("implicit", 0, None, Protocol::Http { acls: vec![] }),
            endpoint("explicit", 1, Some(10000), Protocol::Http { acls: vec![] }),
        ]);
        let assigned = assign_ports(&input);
        assert_eq!(assigned[0].endpoint.name, "implicit");
        assert_eq!(assigned[0].port, 10001);
        assert_eq!(assigned[1].port, 10000);
    }

    #[test]
    fn test_ports_are_pairwise_distinct_and_stable() {
        let input = endpoints(vec![
            endpoint("a", 0, None, Protocol::Tcp { acls: vec![] }),
            endpoint("b", 1, Some(11001), Protocol::Tcp { acls: vec![] }),
            endpoint("c", 2, None, Protocol::Tcp { acls: vec![] }),
            endpoint("d", 3, None, Protocol::Udp { acls: vec![] }),
        ]);
        let assigned = assign_ports(&input);
        assert_eq!(assigned.len(), 4);
        let mut ports: Vec<u16> = assigned.iter().map(|a| a.port).collect();
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), 4);
        assert_eq!(assign_ports(&input), assigned);
    }
}
