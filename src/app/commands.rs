use crate::config::cli::Command;
use crate::domain::ports::HubApi;
use crate::utils::error::Result;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Runs one CLI command against the hub and returns the JSON document to print.
pub async fn execute(api: &dyn HubApi, command: &Command) -> Result<Value> {
    match command {
        Command::Modules { installed } => {
            let catalog = if *installed {
                api.get_installed_modules().await?
            } else {
                api.get_modules().await?
            };
            Ok(serde_json::to_value(catalog)?)
        }
        Command::Versions { module_id } => {
            let versions = api.get_module_versions(module_id).await?;
            Ok(serde_json::to_value(versions)?)
        }
        Command::Install {
            module_id,
            versions,
        } => {
            let constraints = constraint_map(versions);
            api.install_module(module_id, &constraints).await?;
            Ok(done("installed", module_id))
        }
        Command::Uninstall { module_id } => {
            api.uninstall_module(module_id).await?;
            Ok(done("uninstalled", module_id))
        }
        Command::Activate { module_id } => {
            api.activate_module(module_id).await?;
            Ok(done("activated", module_id))
        }
        Command::Deactivate { module_id } => {
            api.deactivate_module(module_id).await?;
            Ok(done("deactivated", module_id))
        }
        Command::Upgrade {
            module_id,
            constraint,
        } => {
            api.upgrade_module(module_id, constraint).await?;
            Ok(done("upgraded", module_id))
        }
        Command::Downgrade {
            module_id,
            constraint,
        } => {
            api.downgrade_module(module_id, constraint).await?;
            Ok(done("downgraded", module_id))
        }
    }
}

// A subsystem given twice keeps its last constraint.
fn constraint_map(pairs: &[(String, String)]) -> HashMap<String, String> {
    pairs.iter().cloned().collect()
}

fn done(status: &str, module_id: &str) -> Value {
    json!({ "moduleId": module_id, "status": status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemorySubsystem, Operation};
    use crate::core::hub::HubControlService;
    use crate::domain::model::{ModuleVersion, SubsystemModuleRecord};
    use crate::utils::error::HubError;

    fn record(module_id: &str) -> SubsystemModuleRecord {
        SubsystemModuleRecord {
            module_id: module_id.to_string(),
            vendor: "test".to_string(),
            name: module_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_constraint_map_last_wins() {
        let map = constraint_map(&[
            ("server-1".to_string(), "^1.0".to_string()),
            ("server-1".to_string(), "~1.4.0".to_string()),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["server-1"], "~1.4.0");
    }

    #[tokio::test]
    async fn test_install_then_list_installed() {
        let server = InMemorySubsystem::new("server-1", "1.9.2")
            .with_module(record("test.moduleA"))
            .with_versions(
                "test.moduleA",
                vec![
                    ModuleVersion::new("test.moduleA", "1.0.0", "*"),
                    ModuleVersion::new("test.moduleA", "1.1.0", "*"),
                ],
            );
        let hub = HubControlService::new(vec![Box::new(server.clone())]);

        let result = execute(
            &hub,
            &Command::Install {
                module_id: "test.moduleA".to_string(),
                versions: vec![("server-1".to_string(), "^1.0".to_string())],
            },
        )
        .await
        .unwrap();
        assert_eq!(result["status"], "installed");
        assert_eq!(server.calls(Operation::Install), 1);

        let listed = execute(&hub, &Command::Modules { installed: true })
            .await
            .unwrap();
        assert_eq!(
            listed["test.moduleA"]["subsystemModules"][0]["version"],
            "1.1.0"
        );
    }

    #[tokio::test]
    async fn test_upgrade_reports_not_implemented() {
        let hub = HubControlService::new(vec![Box::new(InMemorySubsystem::new("server-1", "1.0.0"))]);
        let result = execute(
            &hub,
            &Command::Upgrade {
                module_id: "test.moduleA".to_string(),
                constraint: "*".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(HubError::NotImplemented { .. })));
    }
}
