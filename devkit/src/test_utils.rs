/*!
Test harness for dashboard integration tests

Starts a [`MockRegistryServer`], pins its clock and publishes a registry in
one call, and initialises logging for the test binary.
*/

use anyhow::Result;

use crate::mock_server::MockRegistryServer;
use crate::registry_builder::RegistryBuilder;

/// Nothing listens on port 1: connections are refused immediately.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1/";

pub struct TestHarness {
    pub server: MockRegistryServer,
}

impl TestHarness {
    pub async fn start() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let server = MockRegistryServer::start().await?;
        Ok(Self { server })
    }

    /// Server clock pinned at `reference_time`, serving `registry`.
    pub async fn with_registry(registry: &RegistryBuilder, reference_time: i64) -> Result<Self> {
        let harness = Self::start().await?;
        harness.server.set_reference_time(reference_time);
        harness.publish(registry);
        Ok(harness)
    }

    /// Replaces the served registry wholesale.
    pub fn publish(&self, registry: &RegistryBuilder) {
        self.server.set_registry(registry);
        log::info!("📚 Published registry with {} devices", registry.len());
    }

    pub fn registry_url(&self) -> String {
        self.server.registry_url()
    }

    pub fn time_url(&self) -> String {
        self.server.time_url()
    }
}
