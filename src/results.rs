use crate::types::InstanceRecord;

/// Ordered accumulation of every instance found during a run.
///
/// Records keep insertion order: project order first, then page order, then
/// the order within each page. Nothing is sorted or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    records: Vec<InstanceRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = InstanceRecord>,
    {
        self.records.extend(records);
    }

    /// Flattens per-project slots in their original position.
    pub fn from_slots<I>(slots: I) -> Self
    where
        I: IntoIterator<Item = Vec<InstanceRecord>>,
    {
        let mut set = Self::new();
        for slot in slots {
            set.append(slot);
        }
        set
    }

    pub fn records(&self) -> &[InstanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, name: &str) -> InstanceRecord {
        InstanceRecord {
            project_id: project.to_string(),
            instance: name.to_string(),
            database_version: "MYSQL_8_0".to_string(),
        }
    }

    #[test]
    fn test_append_keeps_order_and_duplicates() {
        let mut set = ResultSet::new();
        set.append(vec![record("p1", "a"), record("p1", "b")]);
        set.append(vec![record("p1", "a")]);

        let names: Vec<_> = set.records().iter().map(|r| r.instance.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_from_slots_preserves_slot_order() {
        let set = ResultSet::from_slots(vec![
            vec![record("p1", "x")],
            vec![],
            vec![],
            vec![record("p4", "y"), record("p4", "z")],
        ]);

        let projects: Vec<_> = set.records().iter().map(|r| r.project_id.as_str()).collect();
        assert_eq!(projects, vec!["p1", "p4", "p4"]);
    }

    #[test]
    fn test_empty() {
        let set = ResultSet::from_slots(Vec::<Vec<InstanceRecord>>::new());
        assert!(set.is_empty());
        assert!(set.records().is_empty());
    }
}
