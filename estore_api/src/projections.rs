//! Management of server-side projections
use estore_common::retry_async;
use estore_proto::api_client::ProjectionClient;
use estore_proto::types::{Projection, ProjectionCommand, Statistics};
use estore_proto::FeedError;

use super::ApiClientWrapper;
use crate::Result;

impl<ApiClient> ApiClientWrapper<ApiClient>
where
    ApiClient: ProjectionClient + Send + Sync,
{
    /// Create a projection. With `force` an existing projection of the same name is deleted first.
    #[tracing::instrument(level = "trace", skip_all, fields(name = projection.name()))]
    pub async fn write_projection(&self, projection: &Projection, force: bool) -> Result<()> {
        if force {
            match self.delete_projection(projection.name(), false, false).await {
                Ok(()) | Err(FeedError::ProjectionNotFound { .. }) => (),
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(name = projection.name(), mode = projection.mode().as_str(), "write projection");
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.write_projection(projection).await })
        )
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = name))]
    pub async fn read_projection(&self, name: &str) -> Result<Statistics> {
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.read_projection(name).await })
        )
    }

    /// Replace the query of a projection, optionally resetting it afterwards
    #[tracing::instrument(level = "trace", skip_all, fields(name = projection.name()))]
    pub async fn update_projection(&self, projection: &Projection, reset: bool) -> Result<()> {
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.update_projection(projection).await })
        )?;
        if reset {
            self.command_projection(ProjectionCommand::Reset, projection.name())
                .await?;
        }
        Ok(())
    }

    /// Disable, then delete a projection
    #[tracing::instrument(level = "trace", skip_all, fields(name = name))]
    pub async fn delete_projection(
        &self,
        name: &str,
        with_checkpoints: bool,
        with_streams: bool,
    ) -> Result<()> {
        self.command_projection(ProjectionCommand::Disable, name)
            .await?;
        tracing::debug!(name, with_checkpoints, with_streams, "delete projection");
        retry_async!(
            self.retry_strategy,
            (async {
                self.api_client
                    .delete_projection(name, with_checkpoints, with_streams)
                    .await
            })
        )
    }

    #[tracing::instrument(level = "trace", skip_all, fields(name = name, command = command.as_str()))]
    pub async fn command_projection(&self, command: ProjectionCommand, name: &str) -> Result<()> {
        retry_async!(
            self.retry_strategy,
            (async { self.api_client.command_projection(command, name).await })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use estore_common::Retry;
    use estore_proto::types::RunMode;
    use mockall::Sequence;

    fn by_category() -> Projection {
        Projection::new(RunMode::Continuous, "byCategory")
            .unwrap()
            .with_body("fromAll()")
    }

    #[tokio::test]
    async fn delete_disables_first() {
        let mut mock_api = MockApiClient::new();
        let mut seq = Sequence::new();
        mock_api
            .expect_command_projection()
            .withf(|command, name| *command == ProjectionCommand::Disable && name == "byCategory")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        mock_api
            .expect_delete_projection()
            .withf(|name, checkpoints, streams| name == "byCategory" && *checkpoints && !*streams)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        api.delete_projection("byCategory", true, false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn forced_write_tolerates_a_missing_projection() {
        let mut mock_api = MockApiClient::new();
        let mut seq = Sequence::new();
        mock_api
            .expect_command_projection()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, name| {
                Err(FeedError::ProjectionNotFound {
                    name: name.to_string(),
                })
            });
        mock_api.expect_delete_projection().never();
        mock_api
            .expect_write_projection()
            .withf(|p| p.name() == "byCategory" && p.body() == "fromAll()")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        api.write_projection(&by_category(), true).await.unwrap();
    }

    #[tokio::test]
    async fn unforced_write_surfaces_conflicts() {
        let mut mock_api = MockApiClient::new();
        mock_api.expect_command_projection().never();
        mock_api.expect_write_projection().times(1).returning(|p| {
            Err(FeedError::ProjectionAlreadyExists {
                name: p.name().to_string(),
            })
        });

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        let err = api.write_projection(&by_category(), false).await.unwrap_err();
        assert!(matches!(err, FeedError::ProjectionAlreadyExists { .. }));
    }

    #[tokio::test]
    async fn update_with_reset_sends_the_reset_command() {
        let mut mock_api = MockApiClient::new();
        let mut seq = Sequence::new();
        mock_api
            .expect_update_projection()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock_api
            .expect_command_projection()
            .withf(|command, _| *command == ProjectionCommand::Reset)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let api = ApiClientWrapper::new(mock_api, Retry::none());
        api.update_projection(&by_category(), true).await.unwrap();
    }

    #[tokio::test]
    async fn reads_statistics() {
        let mut mock_api = MockApiClient::new();
        mock_api
            .expect_read_projection()
            .withf(|name| name == "byCategory")
            .returning(|name| {
                Ok(Statistics {
                    name: Some(name.to_string()),
                    status: Some("Running".into()),
                    ..Default::default()
                })
            });
        let api = ApiClientWrapper::new(mock_api, Retry::none());
        let stats = api.read_projection("byCategory").await.unwrap();
        assert_eq!(stats.status.as_deref(), Some("Running"));
    }
}
