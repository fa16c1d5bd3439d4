//! Producer configuration

/// Well-known identifier of the shared card registry service
///
/// Producers that don't override [`ProducerConfig::service`] connect here.
pub const DEFAULT_SERVICE_ID: &str = "cardstream.registry";

/// Logical identifier a broker resolves to a live registry service
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceId(String);

impl ServiceId {
    /// Create a service identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_ID)
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Producer configuration options
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Name used in diagnostics
    pub name: String,

    /// Identifier of the registry service to connect to
    pub service: ServiceId,
}

impl ProducerConfig {
    /// Create a config for a named producer targeting the default service
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: ServiceId::default(),
        }
    }

    /// Set the registry service identifier
    pub fn service(mut self, service: ServiceId) -> Self {
        self.service = service;
        self
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self::new("producer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProducerConfig::default();

        assert_eq!(config.name, "producer");
        assert_eq!(config.service.as_str(), DEFAULT_SERVICE_ID);
    }

    #[test]
    fn test_named_config() {
        let config = ProducerConfig::new("weather");

        assert_eq!(config.name, "weather");
        assert_eq!(config.service, ServiceId::default());
    }

    #[test]
    fn test_builder_service() {
        let config = ProducerConfig::new("weather").service(ServiceId::new("test.registry"));

        assert_eq!(config.service.as_str(), "test.registry");
    }

    #[test]
    fn test_service_id_from_str() {
        let id: ServiceId = "demo.registry".into();

        assert_eq!(id.as_str(), "demo.registry");
        assert_eq!(format!("{}", id), "demo.registry");
    }
}
