use core_types::{GridInfo, assign_row_ids};

/// Result of a grid information fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridFetchOutcome {
    /// The cache was replaced with this many grids.
    Loaded { grids: usize },
    /// The server answered with no grids. Not an error.
    Empty,
    /// The request failed. The grid is cleared and nothing is surfaced to the user.
    Failed(String),
}

/// Preview grids of the current file, indexed by sheet.
///
/// The cache only changes wholesale: a fetch replaces every entry at once, since the
/// delimiter affects the parsing of every sheet.
#[derive(Debug, Default)]
pub struct GridCache {
    grids: Option<Vec<GridInfo>>,
}

impl GridCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every entry, assigning synthetic row ids where rows have none.
    pub fn replace(&mut self, mut grids: Vec<GridInfo>) {
        for grid in &mut grids {
            assign_row_ids(&mut grid.data);
        }
        self.grids = Some(grids);
    }

    /// Leaves the cache fetched but empty.
    pub fn clear(&mut self) {
        self.grids = Some(Vec::new());
    }

    /// Drops everything, back to never fetched.
    pub fn discard(&mut self) {
        self.grids = None;
    }

    pub fn get(&self, sheet_index: usize) -> Option<&GridInfo> {
        self.grids.as_ref().and_then(|grids| grids.get(sheet_index))
    }

    pub fn contains(&self, sheet_index: usize) -> bool {
        self.get(sheet_index).is_some()
    }

    pub fn len(&self) -> usize {
        self.grids.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_fetched(&self) -> bool {
        self.grids.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{FieldDescriptor, Row};
    use serde_json::json;

    fn grid(rows: usize) -> GridInfo {
        let data = (0..rows)
            .map(|i| json!({ "c1": i }).as_object().cloned().unwrap())
            .collect::<Vec<Row>>();
        GridInfo::new(
            data,
            vec![FieldDescriptor {
                name: "c1".to_string(),
                logical_type: "INTEGER".to_string(),
            }],
        )
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut cache = GridCache::new();
        assert!(!cache.is_fetched());

        cache.replace(vec![grid(1), grid(2)]);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(1));

        cache.replace(vec![grid(3)]);
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains(1));
        assert_eq!(cache.get(0).unwrap().data.len(), 3);
    }

    #[test]
    fn test_replace_assigns_row_ids() {
        let mut cache = GridCache::new();
        cache.replace(vec![grid(3)]);
        let ids: Vec<_> = cache.get(0).unwrap().data.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
    }

    #[test]
    fn test_clear_and_discard() {
        let mut cache = GridCache::new();
        cache.replace(vec![grid(1)]);
        cache.clear();
        assert!(cache.is_fetched());
        assert!(cache.is_empty());

        cache.discard();
        assert!(!cache.is_fetched());
    }
}
