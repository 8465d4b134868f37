use sea_orm::Order;
use thiserror::Error;

use crate::validator::{Validator, permitted};

/// Sort keys accepted by the grenade listing. A leading `-` sorts descending.
pub const GRENADE_SORT_SAFE_LIST: &[&str] =
    &["id", "map", "side", "type", "-id", "-map", "-side", "-type"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unsafe sort parameter: {0}")]
    UnsafeSort(String),
}

/// Requested ordering, checked against a caller-supplied safe list before use.
#[derive(Debug, Clone)]
pub struct Filters {
    pub sort: String,
    pub sort_safe_list: &'static [&'static str],
}

impl Filters {
    pub fn new(sort: impl Into<String>, sort_safe_list: &'static [&'static str]) -> Self {
        Self {
            sort: sort.into(),
            sort_safe_list,
        }
    }

    pub fn validate(&self, v: &mut Validator) {
        v.check(
            permitted(self.sort.as_str(), self.sort_safe_list),
            "sort",
            "invalid sort value",
        );
    }

    /// Column name with the direction prefix stripped.
    pub fn sort_column(&self) -> Result<&str, FilterError> {
        if permitted(self.sort.as_str(), self.sort_safe_list) {
            Ok(self.sort.trim_start_matches('-'))
        } else {
            Err(FilterError::UnsafeSort(self.sort.clone()))
        }
    }

    pub fn sort_direction(&self) -> Order {
        if self.sort.starts_with('-') {
            Order::Desc
        } else {
            Order::Asc
        }
    }
}
