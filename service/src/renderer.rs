use std::sync::{Arc, Mutex};

use core_types::GridInfo;

/// Consumer of preview grids. Only ever handed grids with rows and columns.
pub trait GridRenderer: Send + Sync {
    fn render(&self, sheet_index: usize, grid: &GridInfo);

    /// Hide the grid area.
    fn clear(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    Rendered {
        sheet_index: usize,
        rows: usize,
        columns: usize,
    },
    Cleared,
}

/// Mock implementation of GridRenderer for testing
#[derive(Clone, Default)]
pub struct MockGridRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
    last_grid: Arc<Mutex<Option<GridInfo>>>,
}

impl MockGridRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<RenderCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// The grid passed to the most recent `render`.
    pub fn last_grid(&self) -> Option<GridInfo> {
        self.last_grid.lock().unwrap().clone()
    }
}

impl GridRenderer for MockGridRenderer {
    fn render(&self, sheet_index: usize, grid: &GridInfo) {
        self.calls.lock().unwrap().push(RenderCall::Rendered {
            sheet_index,
            rows: grid.data.len(),
            columns: grid.fields.len(),
        });
        *self.last_grid.lock().unwrap() = Some(grid.clone());
    }

    fn clear(&self) {
        self.calls.lock().unwrap().push(RenderCall::Cleared);
    }
}
