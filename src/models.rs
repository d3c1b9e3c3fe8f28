use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// namespace -> (key -> value)
pub type DefinedTags = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "compartmentId")]
    pub compartment_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    /// Parent compartment; the tenancy id for top-level compartments.
    #[serde(rename = "compartmentId")]
    pub parent_id: String,
    pub name: String,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: String,
}

impl Compartment {
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == "ACTIVE"
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle_state == "DELETED"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSubscription {
    #[serde(rename = "regionName")]
    pub region_name: String,
    /// READY once the subscription is usable.
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummaryCollection {
    #[serde(default)]
    pub items: Vec<ResourceSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub identifier: String,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: Option<String>,
}

/// Block volume or boot volume; both share the fields used here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "compartmentId")]
    pub compartment_id: String,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: String,
    #[serde(rename = "sizeInGBs", default)]
    pub size_in_gbs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousDatabaseSummary {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "lifecycleState")]
    pub lifecycle_state: String,
    #[serde(rename = "definedTags", default)]
    pub defined_tags: DefinedTags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "definedTags", default)]
    pub defined_tags: DefinedTags,
}
