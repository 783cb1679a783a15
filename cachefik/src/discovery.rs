use bollard::container::ListContainersOptions;
use bollard::{ClientVersion, Docker};

use crate::error::AppError;

/// A Docker API version recent enough to report `NetworkSettings.Networks`
/// in the shape this module expects; used when `CACHEFIK_DOCKER_VERSION`
/// is unset or fails to parse as `major.minor`.
const DEFAULT_CLIENT_VERSION: ClientVersion = ClientVersion { major_version: 1, minor_version: 41 };

/// A raw, unvalidated candidate read from container labels. Route-table
/// construction (`cachefik_cache::RouteTable`) is what validates the
/// `PathPrefix(...)` grammar and the upstream URL: a malformed label on one
/// container must not prevent discovery of the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub rule: String,
    pub upstream: String,
}

/// One-shot enumeration of running containers carrying `cachefik.*` labels.
/// Failure to reach the runtime or to list containers is fatal (the caller
/// is expected to log with context and exit non-zero).
pub async fn discover_services(docker_host: &str, docker_version: &str) -> Result<Vec<DiscoveredService>, AppError> {
    let docker = connect(docker_host, docker_version)?;

    let options = ListContainersOptions::<String> { all: false, ..Default::default() };
    let containers = docker.list_containers(Some(options)).await?;

    Ok(containers.into_iter().filter_map(service_from_container).collect())
}

fn connect(docker_host: &str, docker_version: &str) -> Result<Docker, AppError> {
    if docker_host.is_empty() {
        return Docker::connect_with_local_defaults().map_err(AppError::Discovery);
    }

    let version = parse_client_version(docker_version).unwrap_or(DEFAULT_CLIENT_VERSION);
    Docker::connect_with_http(docker_host, 120, &version).map_err(AppError::Discovery)
}

fn parse_client_version(version: &str) -> Option<ClientVersion> {
    let (major, minor) = version.split_once('.')?;
    Some(ClientVersion { major_version: major.parse().ok()?, minor_version: minor.parse().ok()? })
}

fn service_from_container(container: bollard::models::ContainerSummary) -> Option<DiscoveredService> {
    let labels = container.labels.unwrap_or_default();

    if labels.get("cachefik.enable").map(String::as_str) != Some("true") {
        return None;
    }

    let rule = labels.get("cachefik.rule").filter(|r| !r.is_empty())?.clone();
    let port_str = labels.get("cachefik.port").filter(|p| !p.is_empty())?;
    let port: u32 = port_str.parse().ok()?;

    let networks = container.network_settings?.networks?;
    let ip = networks.into_values().next()?.ip_address.filter(|ip| !ip.is_empty())?;

    Some(DiscoveredService { rule, upstream: format!("http://{ip}:{port}") })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerSummary, ContainerSummaryNetworkSettings, EndpointSettings};
    use std::collections::HashMap;

    fn container(labels: &[(&str, &str)], networks: Option<Vec<(&str, &str)>>) -> ContainerSummary {
        ContainerSummary {
            labels: Some(labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
            network_settings: networks.map(|nets| ContainerSummaryNetworkSettings {
                networks: Some(
                    nets.into_iter()
                        .map(|(name, ip)| {
                            (
                                name.to_string(),
                                EndpointSettings { ip_address: Some(ip.to_string()), ..Default::default() },
                            )
                        })
                        .collect::<HashMap<_, _>>(),
                ),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn enabled_container_with_network_yields_a_service() {
        let c = container(
            &[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/test`)"), ("cachefik.port", "8080")],
            Some(vec![("bridge", "172.17.0.2")]),
        );

        let service = service_from_container(c).unwrap();
        assert_eq!(service.rule, "PathPrefix(`/test`)");
        assert_eq!(service.upstream, "http://172.17.0.2:8080");
    }

    #[test]
    fn disabled_container_is_skipped() {
        let c = container(&[("cachefik.enable", "false")], None);
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn missing_rule_is_skipped() {
        let c = container(&[("cachefik.enable", "true"), ("cachefik.port", "8080")], None);
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn missing_port_is_skipped() {
        let c = container(&[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/test`)")], None);
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn invalid_port_is_skipped() {
        let c = container(
            &[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/test`)"), ("cachefik.port", "abc")],
            None,
        );
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn no_networks_is_skipped() {
        let c = container(
            &[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/test`)"), ("cachefik.port", "8080")],
            Some(vec![]),
        );
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn nil_network_settings_is_skipped() {
        let c = container(
            &[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/test`)"), ("cachefik.port", "8080")],
            None,
        );
        assert!(service_from_container(c).is_none());
    }

    #[test]
    fn picks_one_network_when_multiple_are_attached() {
        let c = container(
            &[("cachefik.enable", "true"), ("cachefik.rule", "PathPrefix(`/multi`)"), ("cachefik.port", "9000")],
            Some(vec![("net1", "192.168.1.1"), ("net2", "192.168.1.2")]),
        );
        let service = service_from_container(c).unwrap();
        assert_eq!(service.rule, "PathPrefix(`/multi`)");
        assert!(service.upstream == "http://192.168.1.1:9000" || service.upstream == "http://192.168.1.2:9000");
    }
}
