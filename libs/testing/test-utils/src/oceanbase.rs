//! OceanBase test infrastructure
//!
//! Provides a `TestOceanBase` helper that starts an OceanBase CE container in
//! `mini` mode and connects to its `test` tenant database.

use std::time::Duration;

use database::oceanbase::{connect_with_retry, OceanBaseConfig};
use database::common::RetryConfig;
use sea_orm::DatabaseConnection;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const IMAGE: &str = "oceanbase/oceanbase-ce";
const TAG: &str = "4.3.5-lts";
const SQL_PORT: u16 = 2881;

/// Test database wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestOceanBase {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    pub connection: DatabaseConnection,
    pub config: OceanBaseConfig,
}

impl TestOceanBase {
    /// Start OceanBase and connect as `root@test`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use test_utils::TestOceanBase;
    ///
    /// # async fn example() {
    /// let ob = TestOceanBase::new().await;
    /// // Hand ob.connection to the repository under test
    /// # }
    /// ```
    pub async fn new() -> Self {
        let image = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(SQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("boot success!"))
            .with_env_var("MODE", "mini")
            .with_startup_timeout(Duration::from_secs(600));

        let container = image
            .start()
            .await
            .expect("Failed to start OceanBase container");

        let host_port = container
            .get_host_port_ipv4(SQL_PORT)
            .await
            .expect("Failed to get host port");

        let config = OceanBaseConfig::new("127.0.0.1", host_port, "root@test", "", "test");

        // The SQL port can lag behind the boot message for a few seconds.
        let connection = connect_with_retry(
            &config,
            Some(RetryConfig::new().with_max_retries(10).with_initial_delay(500)),
        )
        .await
        .expect("Failed to connect to test OceanBase");

        tracing::info!(port = host_port, "Test OceanBase ready ({}:{})", IMAGE, TAG);

        Self {
            container,
            connection,
            config,
        }
    }

    /// Clone of the pooled connection
    pub fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }
}
