use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warehouse_core::error::{optional_text, required_text};
use warehouse_core::{CategoryId, DomainError, DomainResult, Entity};

/// A named grouping that products reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Command: AddCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCategory {
    pub name: String,
    pub description: Option<String>,
}

impl AddCategory {
    pub fn new(name: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: description.map(str::to_string),
        }
    }

    /// Trim fields and reject a blank name.
    pub fn validate(&self) -> DomainResult<AddCategory> {
        Ok(AddCategory {
            name: required_text("category name", &self.name)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

/// Command: UpdateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

impl UpdateCategory {
    pub fn validate(&self) -> DomainResult<UpdateCategory> {
        Ok(UpdateCategory {
            id: self.id,
            name: required_text("category name", &self.name)?,
            description: optional_text(self.description.as_deref()),
        })
    }
}

/// What happens to products when their category is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Refuse while any product references the category.
    #[default]
    Restrict,
    /// Remove the category together with every product referencing it.
    Cascade,
}

impl core::str::FromStr for DeletePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            other => Err(DomainError::validation(format!(
                "delete policy must be one of: restrict, cascade (got {other:?})"
            ))),
        }
    }
}

impl core::fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DeletePolicy::Restrict => f.write_str("restrict"),
            DeletePolicy::Cascade => f.write_str("cascade"),
        }
    }
}

/// Decision for a category removal, taken against the current dependent count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalPlan {
    /// Nothing references the category; delete it alone.
    CategoryOnly,
    /// Delete the category and its `dependents` products in one unit.
    Cascade { dependents: usize },
}

/// Decide how to remove `category` given how many products still reference it.
pub fn plan_removal(
    policy: DeletePolicy,
    category: &Category,
    dependents: usize,
) -> DomainResult<RemovalPlan> {
    if dependents == 0 {
        return Ok(RemovalPlan::CategoryOnly);
    }
    match policy {
        DeletePolicy::Restrict => Err(DomainError::referential_integrity(format!(
            "category {:?} is still assigned to {dependents} product(s); \
             delete or move those products first",
            category.name
        ))),
        DeletePolicy::Cascade => Ok(RemovalPlan::Cascade { dependents }),
    }
}
