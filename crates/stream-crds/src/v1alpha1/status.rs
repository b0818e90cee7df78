use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamResourceStatus {
    /// Name the remote stream was created with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
    #[serde(default, rename = "streamARN", skip_serializing_if = "Option::is_none")]
    pub stream_arn: Option<String>,
    /// Remote lifecycle status (`CREATING`, `ACTIVE`, `UPDATING`, `DELETING`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_status: Option<String>,
    #[serde(default)]
    pub open_shard_count: i32,
    #[serde(default)]
    pub retention_period_hours: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_type: Option<String>,
    #[serde(default, rename = "keyID", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// RFC 3339 time the stream was first observed outside ACTIVE. Cleared
    /// once it is ACTIVE again or no longer exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsettled_since: Option<String>,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StreamResourceStatus {
    /// Set or update a condition by type. If a condition with the same type
    /// already exists, update it in place; otherwise append it.
    pub fn set_condition(&mut self, cond: Condition) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == cond.condition_type)
        {
            *existing = cond;
        } else {
            self.conditions.push(cond);
        }
    }

    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }

    /// Replace all conditions, keeping the previous `lastTransitionTime` of
    /// any condition whose status did not change.
    pub fn replace_conditions(&mut self, conditions: Vec<Condition>) {
        let next = conditions
            .into_iter()
            .map(|mut cond| {
                if let Some(prev) = self.condition(&cond.condition_type)
                    && prev.status == cond.status
                    && !prev.last_transition_time.is_empty()
                {
                    cond.last_transition_time = prev.last_transition_time.clone();
                }
                cond
            })
            .collect();
        self.conditions = next;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub condition_type: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_transition_time: String,
}

/// Well-known condition types for Stream status.
pub mod condition_types {
    pub const SYNCED: &str = "Synced";
    pub const READY: &str = "Ready";
}

impl Condition {
    /// Create a True condition.
    pub fn ok(condition_type: &str, reason: &str, message: &str, now: &str) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: "True".to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: now.to_string(),
        }
    }

    /// Create a False condition.
    pub fn fail(condition_type: &str, reason: &str, message: &str, now: &str) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: "False".to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: now.to_string(),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}
