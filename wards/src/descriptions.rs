//! Human-facing titles and category grouping for each rule.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::EventType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDescription {
    pub title: String,
    pub description: String,
    #[serde(alias = "policyKey")]
    pub category: String,
}

impl EventDescription {
    pub fn new(title: &str, description: &str, category: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionRegistry {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    events: BTreeMap<EventType, EventDescription>,
}

impl DescriptionRegistry {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            events: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        event: impl Into<EventType>,
        description: EventDescription,
    ) -> Option<EventDescription> {
        self.events.insert(event.into(), description)
    }

    pub fn description_for(&self, event: &str) -> Option<&EventDescription> {
        self.events.get(event)
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    pub fn events(&self) -> impl Iterator<Item = (&EventType, &EventDescription)> + '_ {
        self.events.iter()
    }

    /// Categories in display order.
    pub fn categories(&self) -> Vec<&Category> {
        let mut sorted: Vec<&Category> = self.categories.iter().collect();
        sorted.sort_by_key(|c| c.order);
        sorted
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}
