//! Bridge registry: builds and owns every accessory binding of the process.

use std::collections::HashMap;
use std::sync::Arc;

use hkbridge_domain::descriptor::AccessoryDescriptor;
use hkbridge_domain::error::{BridgeError, ConfigError};
use hkbridge_domain::topic::TopicSet;
use tokio::sync::mpsc;

use crate::binding::{AccessoryBinding, FaultSender};
use crate::ports::{Accessory, BusTransport, CapabilityProvider};

/// Receiving end of the fault channel.
pub type FaultReceiver = mpsc::UnboundedReceiver<BridgeError>;

/// Create the channel bindings report fatal outbound errors on.
#[must_use]
pub fn fault_channel() -> (FaultSender, FaultReceiver) {
    mpsc::unbounded_channel()
}

/// The live bindings, in configuration order.
pub struct BridgeRegistry<A: Accessory, B> {
    bindings: Vec<AccessoryBinding<A, B>>,
}

impl<A, B> BridgeRegistry<A, B>
where
    A: Accessory + 'static,
    B: BusTransport + 'static,
{
    /// Bind every descriptor, in order.
    ///
    /// Nothing is subscribed unless the whole configuration is consistent,
    /// and a failing binding detaches the ones built before it: the bridge
    /// never runs partially configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoAccessories`] for an empty list,
    /// [`ConfigError::TopicCollision`] when two accessories share an
    /// inbound topic, or the first error raised while binding.
    pub async fn build<P>(
        provider: &P,
        bus: Arc<B>,
        descriptors: &[AccessoryDescriptor],
        faults: &FaultSender,
    ) -> Result<Self, BridgeError>
    where
        P: CapabilityProvider<Accessory = A>,
    {
        if descriptors.is_empty() {
            return Err(ConfigError::NoAccessories.into());
        }
        check_topic_collisions(descriptors)?;

        let mut registry = Self {
            bindings: Vec::with_capacity(descriptors.len()),
        };
        for descriptor in descriptors {
            match AccessoryBinding::bind(provider, Arc::clone(&bus), descriptor, faults.clone())
                .await
            {
                Ok(binding) => registry.bindings.push(binding),
                Err(err) => {
                    tracing::error!(accessory = %descriptor.identifier, %err, "failed to bind accessory");
                    if let Err(shutdown_err) = registry.shutdown().await {
                        tracing::warn!(%shutdown_err, "failed to detach bound accessories");
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(count = registry.bindings.len(), "bridge registry ready");
        Ok(registry)
    }

    /// Accessories in construction order. The first is the primary bridge
    /// identity.
    #[must_use]
    pub fn accessories(&self) -> Vec<Arc<A>> {
        self.bindings
            .iter()
            .map(|binding| Arc::clone(binding.accessory()))
            .collect()
    }

    #[must_use]
    pub fn bindings(&self) -> &[AccessoryBinding<A, B>] {
        &self.bindings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Detach every binding.
    ///
    /// # Errors
    ///
    /// Returns the first detach error; remaining bindings are still
    /// detached.
    pub async fn shutdown(&mut self) -> Result<(), BridgeError> {
        let mut first_error = None;
        for binding in &mut self.bindings {
            if let Err(err) = binding.detach().await {
                first_error.get_or_insert(err);
            }
        }
        tracing::info!(count = self.bindings.len(), "bridge registry detached");
        first_error.map_or(Ok(()), Err)
    }
}

/// Reject configurations where two accessories would receive each other's
/// messages.
fn check_topic_collisions(descriptors: &[AccessoryDescriptor]) -> Result<(), ConfigError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for descriptor in descriptors {
        let topics = TopicSet::for_descriptor(descriptor);
        for topic in topics.inbound() {
            if let Some(first) = owners.insert(topic.to_string(), &descriptor.identifier) {
                return Err(ConfigError::TopicCollision {
                    topic: topic.to_string(),
                    first: first.to_string(),
                    second: descriptor.identifier.clone(),
                });
            }
        }
    }
    Ok(())
}
