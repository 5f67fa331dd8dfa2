use crate::domain::model::{LogicalModule, ModuleCatalog, SubsystemModuleRecord};

/// Merges per-subsystem module lists into logical modules.
///
/// Subsystems are visited in the given order, so the first subsystem reporting a module
/// decides its vendor, name, title and description.
pub fn aggregate<I, S>(lists: I) -> ModuleCatalog
where
    I: IntoIterator<Item = (S, Vec<SubsystemModuleRecord>)>,
    S: AsRef<str>,
{
    let mut catalog = ModuleCatalog::new();
    for (subsystem_id, records) in lists {
        collect_into(&mut catalog, subsystem_id.as_ref(), records);
    }
    catalog
}

/// Appends one subsystem's records to `catalog`, creating logical modules on first sight.
/// Records without a subsystem id are stamped with `subsystem_id`.
pub fn collect_into(
    catalog: &mut ModuleCatalog,
    subsystem_id: &str,
    records: Vec<SubsystemModuleRecord>,
) {
    for mut record in records {
        if record.subsystem_id.is_empty() {
            record.subsystem_id = subsystem_id.to_string();
        }
        catalog
            .entry(record.module_id.clone())
            .or_insert_with(|| LogicalModule::from_record(&record))
            .subsystem_modules
            .push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(module_id: &str, title: &str, active: bool) -> SubsystemModuleRecord {
        SubsystemModuleRecord {
            module_id: module_id.to_string(),
            subsystem_id: String::new(),
            vendor: "test".to_string(),
            name: module_id.to_string(),
            title: title.to_string(),
            description: String::new(),
            installed: active,
            active,
            version: active.then(|| "1.2.9".to_string()),
        }
    }

    #[test]
    fn test_one_logical_module_per_id() {
        let catalog = aggregate(vec![
            ("server-1", vec![record("A", "A", false), record("B", "Server B", false)]),
            ("client-1", vec![record("B", "Client B", false), record("C", "C", true)]),
        ]);

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog["A"].subsystem_modules.len(), 1);
        assert_eq!(catalog["B"].subsystem_modules.len(), 2);
        assert_eq!(catalog["C"].subsystem_modules.len(), 1);
        assert!(catalog["C"].is_active());
        assert!(!catalog["B"].is_active());

        let ids: Vec<&str> = catalog.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_first_subsystem_wins_descriptive_fields() {
        let catalog = aggregate(vec![
            ("server-1", vec![record("B", "Server B", false)]),
            ("client-1", vec![record("B", "Client B", false)]),
        ]);
        assert_eq!(catalog["B"].title, "Server B");

        let catalog = aggregate(vec![
            ("client-1", vec![record("B", "Client B", false)]),
            ("server-1", vec![record("B", "Server B", false)]),
        ]);
        assert_eq!(catalog["B"].title, "Client B");
    }

    #[test]
    fn test_records_are_stamped_and_share_module_id() {
        let catalog = aggregate(vec![
            ("server-1", vec![record("B", "B", false)]),
            ("client-1", vec![record("B", "B", true)]),
        ]);

        let module = &catalog["B"];
        assert_eq!(module.subsystem_ids(), vec!["server-1", "client-1"]);
        assert!(module
            .subsystem_modules
            .iter()
            .all(|r| r.module_id == module.module_id));
    }

    #[test]
    fn test_duplicates_within_a_subsystem_are_kept() {
        let catalog = aggregate(vec![(
            "server-1",
            vec![record("A", "first", false), record("A", "second", false)],
        )]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog["A"].subsystem_modules.len(), 2);
        assert_eq!(catalog["A"].title, "first");
    }

    #[test]
    fn test_empty_input() {
        let lists: Vec<(&str, Vec<SubsystemModuleRecord>)> = Vec::new();
        assert!(aggregate(lists).is_empty());
    }
}
