/*!
# Symbion DevKit - stubs et utilitaires de test pour symbion-status

- Mock registry server (document store + time probe) sans réseau externe
- Builders de documents registry
- Harness de test avec logging
*/

pub mod mock_server;
pub mod registry_builder;
pub mod test_utils;

pub use mock_server::{http_date, MockRegistryServer};
pub use registry_builder::RegistryBuilder;
pub use test_utils::{TestHarness, UNREACHABLE_URL};
