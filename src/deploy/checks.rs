// ABOUTME: Promotes service-level checks to top-level machine checks.
// ABOUTME: The health-wait phase only queries top-level aggregates.

use crate::types::MachineCheck;

use super::bluegreen::MachineUpdateEntry;

/// Promote every service check in each entry's launch spec to a top-level
/// machine check.
///
/// A promoted check inherits the service's internal port and protocol where
/// it left them unset, and lands under a name derived from its kind, so
/// repeated promotion is idempotent.
pub(crate) fn propagate_service_checks(entries: &mut [MachineUpdateEntry]) {
    for entry in entries {
        let config = &mut entry.launch_spec.config;

        let mut promoted: Vec<(String, MachineCheck)> = Vec::new();
        for service in &config.services {
            for check in &service.checks {
                let mut top = check.clone();
                if top.port.is_none() {
                    top.port = Some(service.internal_port);
                }
                if top.kind.is_none() {
                    top.kind = Some(service.protocol.clone());
                }

                let kind = top.kind.as_deref().unwrap_or("tcp").to_string();
                promoted.push((format!("bluegreen_{kind}"), top));
            }
        }

        config.checks.extend(promoted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        LaunchSpec, Machine, MachineConfig, MachineId, MachineState, ServiceConfig,
    };

    fn entry_with_services(services: Vec<ServiceConfig>) -> MachineUpdateEntry {
        let config = MachineConfig {
            services,
            ..Default::default()
        };
        MachineUpdateEntry {
            machine: Machine {
                id: MachineId::new("m1"),
                name: String::new(),
                state: MachineState::Started,
                config: config.clone(),
                checks: Vec::new(),
                lease_nonce: None,
            },
            launch_spec: LaunchSpec {
                id: Some(MachineId::new("m1")),
                config,
                ..Default::default()
            },
        }
    }

    #[test]
    fn promoted_checks_inherit_service_port_and_protocol() {
        let service = ServiceConfig {
            protocol: "http".to_string(),
            internal_port: 8080,
            checks: vec![MachineCheck {
                http_path: Some("/health".to_string()),
                ..Default::default()
            }],
        };
        let mut entries = vec![entry_with_services(vec![service])];

        propagate_service_checks(&mut entries);

        let checks = &entries[0].launch_spec.config.checks;
        let check = checks.get("bluegreen_http").expect("check promoted");
        assert_eq!(check.port, Some(8080));
        assert_eq!(check.kind.as_deref(), Some("http"));
        assert_eq!(check.http_path.as_deref(), Some("/health"));
    }

    #[test]
    fn explicit_port_and_kind_are_kept() {
        let service = ServiceConfig {
            protocol: "http".to_string(),
            internal_port: 8080,
            checks: vec![MachineCheck {
                port: Some(9999),
                kind: Some("tcp".to_string()),
                ..Default::default()
            }],
        };
        let mut entries = vec![entry_with_services(vec![service])];

        propagate_service_checks(&mut entries);

        let check = &entries[0].launch_spec.config.checks["bluegreen_tcp"];
        assert_eq!(check.port, Some(9999));
    }

    #[test]
    fn no_services_promotes_nothing() {
        let mut entries = vec![entry_with_services(Vec::new())];
        propagate_service_checks(&mut entries);
        assert!(entries[0].launch_spec.config.checks.is_empty());
    }

    #[test]
    fn repeated_promotion_is_idempotent() {
        let service = ServiceConfig {
            protocol: "tcp".to_string(),
            internal_port: 5000,
            checks: vec![MachineCheck::default()],
        };
        let mut entries = vec![entry_with_services(vec![service])];

        propagate_service_checks(&mut entries);
        let first = entries[0].launch_spec.config.checks.clone();
        propagate_service_checks(&mut entries);

        assert_eq!(entries[0].launch_spec.config.checks, first);
    }
}
