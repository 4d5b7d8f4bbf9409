//! Platform snapshot repositories.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::repository_config::RepositorySettings;
use crate::validate::{api, check_api, check_not_empty, ApiHandle};
use esfleet_api::platform::{RepositoryConfig, RepositoryConfigs, SnapshotRepositoryConfiguration};

/// API handle plus a repository name.
#[derive(Clone, Default)]
pub struct RepositoryParams {
    pub api: ApiHandle,
    pub name: String,
}

impl RepositoryParams {
    pub fn new(api: ApiHandle, name: impl Into<String>) -> Self {
        Self {
            api,
            name: name.into(),
        }
    }

    fn check(&self, prefix: &str) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(prefix);
        check_api(&self.api, &mut merr);
        check_not_empty("repository name", &self.name, &mut merr);
        merr.into_result()
    }
}

pub async fn get(params: RepositoryParams) -> Result<RepositoryConfig> {
    params.check("repository get")?;
    instrumented("repository get", &params.name, async {
        Ok(api(&params.api)?.get_repository(&params.name).await?)
    })
    .await
}

pub async fn list(handle: ApiHandle) -> Result<RepositoryConfigs> {
    let mut merr = MultiError::new("repository list");
    check_api(&handle, &mut merr);
    merr.into_result()?;
    instrumented("repository list", "*", async {
        Ok(api(&handle)?.list_repositories().await?)
    })
    .await
}

pub async fn delete(params: RepositoryParams) -> Result<()> {
    params.check("repository delete")?;
    instrumented("repository delete", &params.name, async {
        Ok(api(&params.api)?.delete_repository(&params.name).await?)
    })
    .await
}

#[derive(Default)]
pub struct SetParams {
    pub repository: RepositoryParams,
    /// Parsed settings, usually from [`crate::repository_config::parse_settings`].
    pub settings: Option<RepositorySettings>,
}

impl SetParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("repository set");
        merr.merge_result(self.repository.check(""));
        match &self.settings {
            Some(settings) => merr.merge_result(settings.validate()),
            None => merr.push("repository settings cannot be empty"),
        }
        merr.into_result()
    }
}

/// Creates or replaces a repository.
pub async fn set(params: SetParams) -> Result<RepositoryConfig> {
    params.validate()?;
    instrumented("repository set", &params.repository.name, async {
        let config = params
            .settings
            .as_ref()
            .map(|s| SnapshotRepositoryConfiguration {
                repository_type: s.repository_type().to_string(),
                settings: s.settings_value(),
            })
            .unwrap_or_default();
        Ok(api(&params.repository.api)?
            .set_repository(&params.repository.name, &config)
            .await?)
    })
    .await
}
