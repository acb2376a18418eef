use compose_bridge::compose::{Protocol, parse_port};
use compose_bridge::converter::naming::{kube_name, values_key};
use compose_bridge::validator::rules::is_dns_subdomain;
use proptest::prelude::*;

fn protocol() -> impl Strategy<Value = (Option<&'static str>, Protocol)> {
    prop_oneof![
        Just((None, Protocol::Tcp)),
        Just((Some("tcp"), Protocol::Tcp)),
        Just((Some("udp"), Protocol::Udp)),
    ]
}

proptest! {
    #[test]
    fn host_container_ports_round_trip(host in 1u16.., container in 1u16.., proto in protocol()) {
        let spec = match proto.0 {
            Some(p) => format!("{}:{}/{}", host, container, p),
            None => format!("{}:{}", host, container),
        };
        let parsed = parse_port(&spec).unwrap();
        prop_assert_eq!(parsed.host_port, host);
        prop_assert_eq!(parsed.container_port, container);
        prop_assert_eq!(parsed.protocol, proto.1);
    }

    #[test]
    fn ip_bound_ports_round_trip(a in 0u8.., b in 0u8.., host in 1u16.., container in 1u16..) {
        let parsed = parse_port(&format!("{}.0.0.{}:{}:{}", a, b, host, container)).unwrap();
        prop_assert_eq!(parsed.host_port, host);
        prop_assert_eq!(parsed.container_port, container);
        prop_assert_eq!(parsed.protocol, Protocol::Tcp);
    }

    #[test]
    fn single_port_maps_to_itself(port in 1u16..) {
        let parsed = parse_port(&port.to_string()).unwrap();
        prop_assert_eq!(parsed.host_port, port);
        prop_assert_eq!(parsed.container_port, port);
    }

    #[test]
    fn sanitized_names_are_dns_subdomains(name in "[A-Za-z0-9][A-Za-z0-9_.-]{0,40}") {
        let sanitized = kube_name(&name);
        prop_assert!(sanitized.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert!(is_dns_subdomain(&sanitized), "{:?} -> {:?}", name, sanitized);
    }

    #[test]
    fn values_keys_have_no_hyphens(name in "[a-zA-Z][a-zA-Z0-9_-]{0,30}") {
        prop_assert!(!values_key(&name).contains('-'));
    }
}
