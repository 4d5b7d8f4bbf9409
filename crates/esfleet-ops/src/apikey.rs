//! API keys of the authenticated user, and administration of other users' keys.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::{api, check_api, check_not_empty, ApiHandle};
use esfleet_api::users::{ApiKey, ApiKeyList, CreateApiKeyRequest};

/// Creates a key for the authenticated user. The returned key carries the key
/// material; it is never shown again.
pub async fn create(handle: ApiHandle, description: &str) -> Result<ApiKey> {
    let mut merr = MultiError::new("api key create");
    check_api(&handle, &mut merr);
    check_not_empty("description", description, &mut merr);
    merr.into_result()?;

    instrumented("api key create", description, async {
        let request = CreateApiKeyRequest {
            description: description.to_string(),
        };
        Ok(api(&handle)?.create_api_key(&request).await?)
    })
    .await
}

/// Whose keys an operation addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyOwner {
    /// The authenticated user.
    #[default]
    Current,
    User(String),
}

#[derive(Default)]
pub struct ListParams {
    pub api: ApiHandle,
    /// List the keys of this user.
    pub user_id: Option<String>,
    /// List the keys of every user.
    pub all: bool,
    /// Administrative listing; requires exactly one of `user_id` or `all`.
    pub admin: bool,
}

impl ListParams {
    pub fn validate(&self) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new("api key list");
        check_api(&self.api, &mut merr);
        if self.admin {
            if self.user_id.is_some() == self.all {
                merr.push("exactly one of user id or all must be specified");
            }
        } else if self.user_id.is_some() || self.all {
            merr.push("user id and all require administrative listing");
        }
        if self.user_id.as_deref().is_some_and(|u| u.trim().is_empty()) {
            merr.push("user id cannot be empty");
        }
        merr.into_result()
    }
}

pub async fn list(params: ListParams) -> Result<ApiKeyList> {
    params.validate()?;
    let target = match (&params.user_id, params.all) {
        (Some(user), _) => user.clone(),
        (None, true) => "*".to_string(),
        (None, false) => "self".to_string(),
    };
    instrumented("api key list", &target, async {
        let api = api(&params.api)?;
        let keys = match (&params.user_id, params.all) {
            (Some(user), _) => api.list_user_api_keys(user).await?,
            (None, true) => api.list_all_api_keys().await?,
            (None, false) => api.list_api_keys().await?,
        };
        Ok(keys)
    })
    .await
}

#[derive(Default)]
pub struct KeyParams {
    pub api: ApiHandle,
    pub key_ids: Vec<String>,
    pub owner: KeyOwner,
}

impl KeyParams {
    fn check(&self, prefix: &str, single: bool) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(prefix);
        check_api(&self.api, &mut merr);
        if self.key_ids.is_empty() || self.key_ids.iter().any(|k| k.trim().is_empty()) {
            merr.push("api key id cannot be empty");
        } else if single && self.key_ids.len() > 1 {
            merr.push("only one api key id may be specified");
        }
        if let KeyOwner::User(user) = &self.owner {
            check_not_empty("user id", user, &mut merr);
        }
        merr.into_result()
    }
}

pub async fn get(params: KeyParams) -> Result<ApiKey> {
    params.check("api key get", true)?;
    let key_id = params.key_ids[0].clone();
    instrumented("api key get", &key_id, async {
        let api = api(&params.api)?;
        Ok(match &params.owner {
            KeyOwner::Current => api.get_api_key(&key_id).await?,
            KeyOwner::User(user) => api.get_user_api_key(user, &key_id).await?,
        })
    })
    .await
}

/// Deletes keys of the authenticated user in one call, or a single key of
/// another user.
pub async fn delete(params: KeyParams) -> Result<()> {
    let single = matches!(params.owner, KeyOwner::User(_));
    params.check("api key delete", single)?;
    let target = params.key_ids.join(",");
    instrumented("api key delete", &target, async {
        let api = api(&params.api)?;
        match &params.owner {
            KeyOwner::Current => api.delete_api_keys(&params.key_ids).await?,
            KeyOwner::User(user) => api.delete_user_api_key(user, &params.key_ids[0]).await?,
        }
        Ok(())
    })
    .await
}
