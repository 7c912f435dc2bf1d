//! Named database connections.

use std::collections::HashMap;
use std::sync::Arc;

use sync_core::{Connection, SyncError};
use tracing::info;
use ts_sync_mysql::{sanitize_connection_string, MySqlConnection};

use crate::config::{ConnectionConfig, ConnectionsConfig, Driver};

/// Alias under which the default source connection is registered.
pub const SOURCES_DEFAULT: &str = "sources_default";
/// Alias under which the default target connection is registered.
pub const TARGETS_DEFAULT: &str = "targets_default";

/// Which side of a job a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Source,
    Target,
}

impl Role {
    pub fn default_alias(self) -> &'static str {
        match self {
            Role::Source => SOURCES_DEFAULT,
            Role::Target => TARGETS_DEFAULT,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Role::Source => "sources",
            Role::Target => "targets",
        }
    }
}

/// Resolved alias → connection map, shared by every job of a run.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, Arc<dyn Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every configured connection.
    ///
    /// Pools are created lazily, so this performs no network I/O. A
    /// connection without a driver, or a role that has connections but not
    /// exactly one default, is a configuration error.
    pub fn from_config(config: &ConnectionsConfig, batch_size: usize) -> Result<Self, SyncError> {
        let mut registry = Self::new();
        for (role, entries) in [
            (Role::Source, &config.sources),
            (Role::Target, &config.targets),
        ] {
            let defaults = entries.iter().filter(|c| c.default).count();
            if !entries.is_empty() && defaults != 1 {
                return Err(SyncError::Config(format!(
                    "{} has {defaults} default connections, expected exactly one",
                    role.label()
                )));
            }
            for entry in entries {
                let connection = open(entry, batch_size)?;
                registry.register_in_role(role, &entry.alias, entry.default, connection);
            }
        }
        Ok(registry)
    }

    /// Register `connection` under `alias`.
    pub fn register(&mut self, alias: impl Into<String>, connection: Arc<dyn Connection>) {
        self.connections.insert(alias.into(), connection);
    }

    /// Register under `alias` and, when `is_default`, under the role default.
    pub fn register_in_role(
        &mut self,
        role: Role,
        alias: &str,
        is_default: bool,
        connection: Arc<dyn Connection>,
    ) {
        if is_default {
            self.connections
                .insert(role.default_alias().to_string(), connection.clone());
        }
        self.register(alias, connection);
    }

    pub fn get(&self, alias: &str) -> Result<Arc<dyn Connection>, SyncError> {
        self.connections
            .get(alias)
            .cloned()
            .ok_or_else(|| SyncError::Config(format!("No connection registered as '{alias}'")))
    }

    /// `alias` if given, else the role's default connection.
    pub fn resolve(&self, alias: Option<&str>, role: Role) -> Result<Arc<dyn Connection>, SyncError> {
        self.get(alias.unwrap_or(role.default_alias()))
    }
}

fn open(entry: &ConnectionConfig, batch_size: usize) -> Result<Arc<dyn Connection>, SyncError> {
    match entry.driver {
        Some(Driver::Mysql) => {
            let connection = MySqlConnection::from_url(&entry.url)
                .map_err(|e| SyncError::Config(format!("{}: {e:#}", entry.alias)))?
                .with_batch_size(batch_size);
            info!(
                "Registered connection {} ({})",
                entry.alias,
                sanitize_connection_string(&entry.url)
            );
            Ok(Arc::new(connection))
        }
        None => Err(SyncError::Config(format!(
            "Connection '{}' has no driver configured",
            entry.alias
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryConnection;

    #[test]
    fn test_resolve_falls_back_to_role_default() {
        let mut registry = ConnectionRegistry::new();
        registry.register_in_role(Role::Source, "ods", true, Arc::new(MemoryConnection::new("ods")));
        registry.register_in_role(Role::Target, "dw", false, Arc::new(MemoryConnection::new("dw")));

        assert_eq!(registry.resolve(None, Role::Source).unwrap().describe(), "memory:ods");
        assert_eq!(registry.resolve(Some("dw"), Role::Target).unwrap().describe(), "memory:dw");
        assert!(matches!(
            registry.resolve(None, Role::Target),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_missing_driver_is_config_error() {
        let config = ConnectionsConfig {
            sources: vec![ConnectionConfig {
                alias: "ods".to_string(),
                driver: None,
                url: "mysql://localhost/ods".to_string(),
                default: true,
            }],
            targets: vec![],
        };
        let err = ConnectionRegistry::from_config(&config, 1000).err().unwrap();
        assert!(err.to_string().contains("no driver"));
    }

    #[test]
    fn test_two_defaults_rejected() {
        let entry = |alias: &str| ConnectionConfig {
            alias: alias.to_string(),
            driver: Some(Driver::Mysql),
            url: format!("mysql://localhost/{alias}"),
            default: true,
        };
        let config = ConnectionsConfig {
            sources: vec![],
            targets: vec![entry("a"), entry("b")],
        };
        assert!(matches!(
            ConnectionRegistry::from_config(&config, 1000),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_role_without_default_rejected() {
        let config = ConnectionsConfig {
            sources: vec![ConnectionConfig {
                alias: "ods".to_string(),
                driver: Some(Driver::Mysql),
                url: "mysql://localhost/ods".to_string(),
                default: false,
            }],
            targets: vec![],
        };
        let err = ConnectionRegistry::from_config(&config, 1000).err().unwrap();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.to_string().contains("0 default connections"));
    }
}
