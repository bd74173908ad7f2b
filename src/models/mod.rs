//! Rows of the admissions tables and the payloads that create or change them

mod application;
mod parent;
mod requirement;
mod student;
mod university;

pub use application::*;
pub use parent::*;
pub use requirement::*;
pub use student::*;
pub use university::*;

use serde::Serialize;

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + u64::from(self.limit) < self.total
    }
}

/// Drops `None` fields so partial updates leave columns untouched
pub(crate) fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}
