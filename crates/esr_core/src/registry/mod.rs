use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;

fn default_data_format() -> String {
    "standard".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientEntry {
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    /// Config document path, relative to the project root.
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default = "default_data_format")]
    pub data_format: String,
    #[serde(default)]
    pub csm_name: Option<String>,
    #[serde(default)]
    pub csm_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientRegistry {
    #[serde(default)]
    pub version: Option<String>,
    pub clients: BTreeMap<String, ClientEntry>,
}

pub fn parse_registry_text(text: &str) -> Result<ClientRegistry, AppError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
        AppError::new("REGISTRY_PARSE_FAILED", "Failed to parse client registry YAML")
            .with_details(e.to_string())
    })?;
    let Some(map) = value.as_mapping() else {
        return Err(AppError::new(
            "REGISTRY_INVALID",
            "Client registry must be a mapping",
        ));
    };
    if !map.contains_key("clients") {
        return Err(AppError::new(
            "REGISTRY_INVALID",
            "Client registry is missing the 'clients' key",
        ));
    }
    serde_yaml::from_value(value).map_err(|e| {
        AppError::new("REGISTRY_INVALID", "Client registry entries are malformed")
            .with_details(e.to_string())
    })
}

pub fn load_registry(path: &Path) -> Result<ClientRegistry, AppError> {
    if !path.exists() {
        return Err(
            AppError::new("REGISTRY_NOT_FOUND", "Client registry not found")
                .with_details(format!("path={}", path.display())),
        );
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new("REGISTRY_READ_FAILED", "Failed to read client registry")
            .with_details(format!("path={}; err={e}", path.display()))
    })?;
    let registry = parse_registry_text(&text)?;
    info!(path = %path.display(), clients = registry.clients.len(), "loaded client registry");
    Ok(registry)
}

pub fn get_client<'a>(
    registry: &'a ClientRegistry,
    client_id: &str,
) -> Result<&'a ClientEntry, AppError> {
    registry.clients.get(client_id).ok_or_else(|| {
        // BTreeMap keys are already sorted.
        let mut available = registry
            .clients
            .keys()
            .take(10)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if registry.clients.len() > 10 {
            available.push_str(&format!(", ... ({} total)", registry.clients.len()));
        }
        AppError::new("REGISTRY_CLIENT_NOT_FOUND", "Client not found in registry")
            .with_details(format!("client={client_id}; available={available}"))
    })
}

/// Sorted client ids, optionally filtered by tier and data format.
pub fn list_clients(
    registry: &ClientRegistry,
    tier: Option<&str>,
    data_format: Option<&str>,
) -> Vec<String> {
    registry
        .clients
        .iter()
        .filter(|(_, c)| tier.map_or(true, |t| c.tier.as_deref() == Some(t)))
        .filter(|(_, c)| data_format.map_or(true, |f| c.data_format == f))
        .map(|(id, _)| id.clone())
        .collect()
}

/// Resolve a client's config document. Relative paths are anchored at the registry
/// file's grandparent (the registry lives in `<root>/clients/registry.yaml`).
pub fn client_config_path(
    registry_path: &Path,
    registry: &ClientRegistry,
    client_id: &str,
) -> Result<PathBuf, AppError> {
    let client = get_client(registry, client_id)?;
    let Some(config) = client.config.as_deref().filter(|c| !c.trim().is_empty()) else {
        return Err(AppError::new(
            "REGISTRY_CONFIG_MISSING",
            "Client has no config path defined",
        )
        .with_details(format!("client={client_id}")));
    };

    let root = registry_path
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""));
    let full = root.join(config);
    if !full.exists() {
        return Err(AppError::new(
            "REGISTRY_CONFIG_NOT_FOUND",
            "Config file not found for client",
        )
        .with_details(format!("client={client_id}; path={}", full.display())));
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"
version: "1.0"
clients:
  acme:
    name: "Acme Corp"
    tier: "Signature Tier"
    config: "clients/acme.yaml"
    csm_name: "Pat Lee"
    csm_email: "pat@example.com"
  burlington:
    name: "Burlington"
    tier: "Standard Tier"
    config: "clients/burlington.yaml"
    data_format: "burlington"
  zeta:
    name: "Zeta"
"#;

    #[test]
    fn parses_entries_with_defaults() {
        let reg = parse_registry_text(REGISTRY).unwrap();
        assert_eq!(reg.clients.len(), 3);
        assert_eq!(reg.clients["acme"].data_format, "standard");
        assert_eq!(reg.clients["zeta"].config, None);
    }

    #[test]
    fn missing_clients_key_is_invalid() {
        let err = parse_registry_text("version: 1\n").unwrap_err();
        assert_eq!(err.code, "REGISTRY_INVALID");
        let err = parse_registry_text("- a\n- b\n").unwrap_err();
        assert_eq!(err.code, "REGISTRY_INVALID");
        let err = parse_registry_text("clients: [").unwrap_err();
        assert_eq!(err.code, "REGISTRY_PARSE_FAILED");
    }

    #[test]
    fn filters_and_lookup() {
        let reg = parse_registry_text(REGISTRY).unwrap();
        assert_eq!(list_clients(&reg, None, None), vec!["acme", "burlington", "zeta"]);
        assert_eq!(list_clients(&reg, Some("Signature Tier"), None), vec!["acme"]);
        assert_eq!(
            list_clients(&reg, None, Some("standard")),
            vec!["acme", "zeta"]
        );

        let err = get_client(&reg, "nope").unwrap_err();
        assert_eq!(err.code, "REGISTRY_CLIENT_NOT_FOUND");
        assert!(err.details.unwrap().contains("acme, burlington, zeta"));
    }

    #[test]
    fn config_path_resolves_from_project_root() {
        let root = tempfile::tempdir().unwrap();
        let clients_dir = root.path().join("clients");
        std::fs::create_dir_all(&clients_dir).unwrap();
        let registry_path = clients_dir.join("registry.yaml");
        std::fs::write(&registry_path, REGISTRY).unwrap();
        std::fs::write(clients_dir.join("acme.yaml"), "tier: Signature Tier\n").unwrap();

        let reg = load_registry(&registry_path).unwrap();
        let path = client_config_path(&registry_path, &reg, "acme").unwrap();
        assert_eq!(path, root.path().join("clients/acme.yaml"));

        let err = client_config_path(&registry_path, &reg, "burlington").unwrap_err();
        assert_eq!(err.code, "REGISTRY_CONFIG_NOT_FOUND");
        let err = client_config_path(&registry_path, &reg, "zeta").unwrap_err();
        assert_eq!(err.code, "REGISTRY_CONFIG_MISSING");
    }

    #[test]
    fn missing_registry_file() {
        let err = load_registry(Path::new("/nowhere/clients/registry.yaml")).unwrap_err();
        assert_eq!(err.code, "REGISTRY_NOT_FOUND");
        assert!(err.is_not_found());
    }
}
