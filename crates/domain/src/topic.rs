//! Topic scheme: the bus topics an accessory binding uses.
//!
//! Naming differs per variant and is kept exactly as the devices on the
//! bus expect it:
//!
//! | Variant | Control | State | Config / Target / Active |
//! |---------|---------|-------|--------------------------|
//! | Light | `light_<id>/control` or `light/<id>/control` | `…/state` | - |
//! | Switch | `switch_<id>/control` or configured | `switch_<id>/state` or configured | - |
//! | Thermostat | - | `sensor/temperature/<id>` | `…/config`, `…/target`, `…/active` |
//! | Temperature sensor | - | `sensor/temperature/<id>` | `…/config` |

use crate::descriptor::{AccessoryDescriptor, AccessoryKind, SwitchTopics};

/// Topics derived for one accessory. Absent topics are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSet {
    /// Commands sent to the device.
    pub control: Option<String>,
    /// State reported by the device.
    pub state: Option<String>,
    /// Retained configuration snapshot.
    pub config: Option<String>,
    /// Desired temperature, both ways.
    pub target: Option<String>,
    /// Active heating/cooling mode, both ways.
    pub active: Option<String>,
}

impl TopicSet {
    /// Derive the topics of `descriptor`.
    ///
    /// The result depends only on the variant parameters and the
    /// identifier, so the same descriptor always yields the same set.
    #[must_use]
    pub fn for_descriptor(descriptor: &AccessoryDescriptor) -> Self {
        let id = &descriptor.identifier;
        match &descriptor.kind {
            AccessoryKind::Light { separator } => {
                let base = format!("light{}{id}", separator.as_char());
                Self {
                    control: Some(format!("{base}/control")),
                    state: Some(format!("{base}/state")),
                    ..Self::default()
                }
            }
            AccessoryKind::Switch {
                topics: SwitchTopics::MachineId,
                ..
            } => Self {
                control: Some(format!("switch_{id}/control")),
                state: Some(format!("switch_{id}/state")),
                ..Self::default()
            },
            AccessoryKind::Switch {
                topics:
                    SwitchTopics::Explicit {
                        control_topic,
                        state_topic,
                    },
                ..
            } => Self {
                control: Some(control_topic.clone()),
                state: Some(state_topic.clone()),
                ..Self::default()
            },
            AccessoryKind::Thermostat { controllable, .. } => {
                let base = format!("sensor/temperature/{id}");
                let (target, active) = if *controllable {
                    (Some(format!("{base}/target")), Some(format!("{base}/active")))
                } else {
                    (None, None)
                };
                Self {
                    control: None,
                    config: Some(format!("{base}/config")),
                    state: Some(base),
                    target,
                    active,
                }
            }
        }
    }

    /// Topics the binding subscribes to, deduplicated, in
    /// state/target/active order.
    #[must_use]
    pub fn inbound(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::with_capacity(3);
        for topic in [&self.state, &self.target, &self.active].into_iter().flatten() {
            if !topics.contains(&topic.as_str()) {
                topics.push(topic);
            }
        }
        topics
    }
}
