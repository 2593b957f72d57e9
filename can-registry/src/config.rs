//! Dispatcher configuration types
//!
//! The registry core itself has no configuration; this covers how frames
//! coming from a transport are filtered and whether control frames may
//! mutate the dynamic sensor bindings.

use crate::types::{Category, ChannelId};
use serde::{Deserialize, Serialize};

/// Configuration for a [`Dispatcher`](crate::Dispatcher)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Whether assignment / halt frames update the registry
    #[serde(default = "default_true")]
    pub apply_control_events: bool,

    /// Optional: only dispatch frames from these CAN channels
    #[serde(default)]
    pub channel_filter: Option<Vec<u8>>,

    /// Optional: only dispatch these identifiers
    #[serde(default)]
    pub message_filter: Option<Vec<u16>>,

    /// Optional: only dispatch identifiers of these categories
    ///
    /// Identifiers outside the protocol space are never filtered by category,
    /// so unknown traffic is still reported.
    #[serde(default)]
    pub category_filter: Option<Vec<Category>>,

    /// Bindings applied when the dispatcher is created
    #[serde(default)]
    pub sensor_bindings: Vec<SensorBinding>,
}

fn default_true() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            apply_control_events: true,
            channel_filter: None,
            message_filter: None,
            category_filter: None,
            sensor_bindings: Vec::new(),
        }
    }
}

/// A known sensor wiring: `channel` owns dynamic identifier `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBinding {
    pub id: u16,
    pub channel: ChannelId,
}

impl SensorBinding {
    pub fn new(id: u16, channel: impl Into<ChannelId>) -> Self {
        Self {
            id,
            channel: channel.into(),
        }
    }
}

impl DispatchConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable control event handling
    pub fn with_control_events(mut self, enabled: bool) -> Self {
        self.apply_control_events = enabled;
        self
    }

    /// Builder method: set channel filter
    pub fn with_channel_filter(mut self, channels: Vec<u8>) -> Self {
        self.channel_filter = Some(channels);
        self
    }

    /// Builder method: set message filter
    pub fn with_message_filter(mut self, messages: Vec<u16>) -> Self {
        self.message_filter = Some(messages);
        self
    }

    /// Builder method: set category filter
    pub fn with_category_filter(mut self, categories: Vec<Category>) -> Self {
        self.category_filter = Some(categories);
        self
    }

    /// Builder method: add a pre-configured sensor binding
    pub fn add_sensor_binding(mut self, id: u16, channel: impl Into<ChannelId>) -> Self {
        self.sensor_bindings.push(SensorBinding::new(id, channel));
        self
    }

    /// Check if a channel should be processed
    pub fn should_process_channel(&self, channel: u8) -> bool {
        match &self.channel_filter {
            Some(channels) => channels.contains(&channel),
            None => true,
        }
    }

    /// Check if an identifier should be processed
    pub fn should_process_message(&self, can_id: u32) -> bool {
        match &self.message_filter {
            Some(messages) => messages.iter().any(|&id| id as u32 == can_id),
            None => true,
        }
    }

    /// Check if a category should be processed
    pub fn should_process_category(&self, category: Option<Category>) -> bool {
        match (&self.category_filter, category) {
            (Some(categories), Some(category)) => categories.contains(&category),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_config_builder() {
        let config = DispatchConfig::new()
            .with_control_events(false)
            .with_channel_filter(vec![0, 1])
            .with_message_filter(vec![0x112])
            .with_category_filter(vec![Category::SwitchControl])
            .add_sensor_binding(0x52A, "imu-x");

        assert!(!config.apply_control_events);
        assert_eq!(config.channel_filter, Some(vec![0, 1]));
        assert_eq!(config.sensor_bindings, vec![SensorBinding::new(0x52A, "imu-x")]);
    }

    #[test]
    fn test_filter_logic() {
        let config = DispatchConfig::new()
            .with_channel_filter(vec![0])
            .with_message_filter(vec![0x112, 0x40C])
            .with_category_filter(vec![Category::Introduction]);

        assert!(config.should_process_channel(0));
        assert!(!config.should_process_channel(1));
        assert!(config.should_process_message(0x40C));
        assert!(!config.should_process_message(0x113));
        assert!(config.should_process_category(Some(Category::Introduction)));
        assert!(!config.should_process_category(Some(Category::SensorData)));
        assert!(config.should_process_category(None));
    }

    #[test]
    fn test_no_filters() {
        let config = DispatchConfig::new();

        assert!(config.apply_control_events);
        assert!(config.should_process_channel(99));
        assert!(config.should_process_message(0x1FFFFFFF));
        assert!(config.should_process_category(Some(Category::Reserved)));
    }
}
