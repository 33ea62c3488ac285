//! Core trait definitions shared across the provisioning crates.

use crate::enums::ProcessType;

/// Something a capability filter can be evaluated against.
///
/// Attributes may be multi-valued; a filter term matches when any value
/// matches.
pub trait CapabilityProvider {
    /// All values of `attribute`, or an empty list when absent.
    ///
    /// Attribute names are compared case-insensitively by callers, so
    /// implementations receive them lower-cased.
    fn attribute_values(&self, attribute: &str) -> Vec<&str>;
}

/// Supplies the facts about the running process that resolution depends on.
///
/// Implementations are consulted once per resolve; the resolver never
/// probes the host itself.
pub trait PlatformDetector: Send + Sync {
    /// Operating system name, e.g. `linux`.
    fn os(&self) -> &str;

    /// Major Java level of the runtime.
    fn java_version(&self) -> u32;

    /// Ordered list of active platforms, e.g. `jakartaee-10.0`.
    fn platforms(&self) -> &[String];

    /// Process type being provisioned.
    fn process_type(&self) -> ProcessType {
        ProcessType::Server
    }
}
