// src/definition.rs - Condition and sub-condition templates
use crate::config::{ServerConfig, MAX_SEVERITY};
use crate::error::{AeError, Result};
use serde::{Deserialize, Serialize};

/// One named severity/state level of a condition
///
/// A single-state condition has exactly one of these; a multi-state
/// condition (e.g. HIGH / HIGH_HIGH level alarms) has an ordered set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubConditionDefinition {
    /// Sub-condition name, unique within its definition (e.g. "HIGH_HIGH")
    pub name: String,
    /// Expression or tag reference describing what triggers this level
    pub definition: String,
    /// Severity reported while this level is active
    pub severity: u16,
    pub description: String,
    /// Whether an activation of this level demands operator acknowledgement
    pub ack_required: bool,
}

/// Template describing an alarm type, owned by one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub id: u32,
    pub name: String,
    pub category_id: u32,
    /// Ordered; the first entry is the default level for single-state
    /// conditions and the initial level for multi-state ones.
    sub_conditions: Vec<SubConditionDefinition>,
}

impl ConditionDefinition {
    /// Create a single-state definition from one sub-condition
    pub fn single_state(
        id: u32,
        name: impl Into<String>,
        category_id: u32,
        sub: SubConditionDefinition,
        config: &ServerConfig,
    ) -> Result<Self> {
        validate_severity(sub.severity, config)?;
        Ok(Self {
            id,
            name: name.into(),
            category_id,
            sub_conditions: vec![sub],
        })
    }

    /// Create a multi-state definition; levels are added afterwards with
    /// [`add_sub_condition`](Self::add_sub_condition)
    pub fn multi_state(id: u32, name: impl Into<String>, category_id: u32) -> Self {
        Self {
            id,
            name: name.into(),
            category_id,
            sub_conditions: Vec::new(),
        }
    }

    /// Append a level to a multi-state definition
    pub fn add_sub_condition(
        &mut self,
        sub: SubConditionDefinition,
        config: &ServerConfig,
    ) -> Result<()> {
        validate_severity(sub.severity, config)?;
        if self.sub_conditions.iter().any(|s| s.name == sub.name) {
            return Err(AeError::already_exists("sub-condition", &sub.name));
        }
        self.sub_conditions.push(sub);
        Ok(())
    }

    /// A definition with one level behaves as a single-state condition
    pub fn is_single_state(&self) -> bool {
        self.sub_conditions.len() == 1
    }

    pub fn sub_conditions(&self) -> &[SubConditionDefinition] {
        &self.sub_conditions
    }

    /// Index of a sub-condition by name, `InvalidArgument` if it does not
    /// belong to this definition
    pub fn sub_condition_index(&self, name: &str) -> Result<usize> {
        self.sub_conditions
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| {
                AeError::InvalidArgument(format!(
                    "sub-condition '{}' does not belong to definition '{}'",
                    name, self.name
                ))
            })
    }

    /// The default (first) sub-condition
    ///
    /// Definitions with no levels indicate registry corruption; registration
    /// rejects them before a condition can exist.
    pub fn default_sub_condition(&self) -> &SubConditionDefinition {
        &self.sub_conditions[0]
    }

    /// A multi-state definition must have at least one level before a
    /// condition is created from it
    pub fn validate(&self) -> Result<()> {
        if self.sub_conditions.is_empty() {
            return Err(AeError::InvalidArgument(format!(
                "condition definition '{}' has no sub-conditions",
                self.name
            )));
        }
        Ok(())
    }
}

fn validate_severity(severity: u16, config: &ServerConfig) -> Result<()> {
    if !config.severity_in_range(severity) {
        return Err(AeError::InvalidArgument(format!(
            "severity {} outside valid range [{}, {}]",
            severity, config.min_severity, MAX_SEVERITY
        )));
    }
    Ok(())
}
