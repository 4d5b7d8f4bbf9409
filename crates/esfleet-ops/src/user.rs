//! Platform users and their roles.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::{api, check_api, check_email, check_not_empty, check_password, ApiHandle};
use esfleet_api::users::{User, UserList, UserSecurity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role granted to a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ece_platform_admin", alias = "platform-admin")]
    PlatformAdmin,
    #[serde(rename = "ece_platform_viewer", alias = "platform-viewer")]
    PlatformViewer,
    #[serde(rename = "ece_deployment_manager", alias = "deployment-manager")]
    DeploymentManager,
    #[serde(rename = "ece_deployment_viewer", alias = "deployment-viewer")]
    DeploymentViewer,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::PlatformAdmin,
        Role::PlatformViewer,
        Role::DeploymentManager,
        Role::DeploymentViewer,
    ];

    /// Identifier used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::PlatformAdmin => "ece_platform_admin",
            Role::PlatformViewer => "ece_platform_viewer",
            Role::DeploymentManager => "ece_deployment_manager",
            Role::DeploymentViewer => "ece_deployment_viewer",
        }
    }

    fn short_name(&self) -> &'static str {
        match self {
            Role::PlatformAdmin => "platform-admin",
            Role::PlatformViewer => "platform-viewer",
            Role::DeploymentManager => "deployment-manager",
            Role::DeploymentViewer => "deployment-viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s || r.short_name() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Appends role-compatibility errors: the platform admin role stands alone and
/// the two deployment roles exclude each other.
pub fn validate_roles(roles: &[Role], merr: &mut MultiError) {
    if roles.contains(&Role::PlatformAdmin) && roles.iter().any(|r| *r != Role::PlatformAdmin) {
        merr.push(format!(
            "{} role cannot be combined with any other role",
            Role::PlatformAdmin
        ));
    }
    if roles.contains(&Role::DeploymentManager) && roles.contains(&Role::DeploymentViewer) {
        merr.push(format!(
            "only one of {} or {} roles may be assigned",
            Role::DeploymentManager,
            Role::DeploymentViewer
        ));
    }
}

/// Profile fields shared by user create and update.
#[derive(Debug, Clone, Default)]
pub struct UserFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub roles: Vec<Role>,
    pub enabled: Option<bool>,
}

impl UserFields {
    fn check(&self, merr: &mut MultiError) {
        check_password(self.password.as_deref(), merr);
        check_email(self.email.as_deref(), merr);
        validate_roles(&self.roles, merr);
    }

    fn to_user(&self, user_name: &str) -> User {
        let security = (self.password.is_some() || !self.roles.is_empty() || self.enabled.is_some())
            .then(|| UserSecurity {
                enabled: self.enabled,
                password: self.password.clone(),
                roles: self.roles.iter().map(|r| r.as_str().to_string()).collect(),
            });
        User {
            user_name: user_name.to_string(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            security,
            ..User::default()
        }
    }
}

#[derive(Default)]
pub struct UserParams {
    pub api: ApiHandle,
    pub user_name: String,
    pub fields: UserFields,
}

impl UserParams {
    fn check(&self, prefix: &str) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(prefix);
        check_api(&self.api, &mut merr);
        check_not_empty("username", &self.user_name, &mut merr);
        self.fields.check(&mut merr);
        merr.into_result()
    }
}

/// Creates a user. A password and at least one role are required.
pub async fn create(params: UserParams) -> Result<User> {
    let mut merr = MultiError::new("user create");
    merr.merge_result(params.check(""));
    if params.fields.password.is_none() {
        merr.push("password cannot be empty");
    }
    if params.fields.roles.is_empty() {
        merr.push("at least one role must be specified");
    }
    merr.into_result()?;

    instrumented("user create", &params.user_name, async {
        let user = params.fields.to_user(&params.user_name);
        Ok(api(&params.api)?.create_user(&user).await?)
    })
    .await
}

/// Updates the fields that are set. Roles, when given, replace the current set.
pub async fn update(params: UserParams) -> Result<User> {
    params.check("user update")?;
    instrumented("user update", &params.user_name, async {
        let user = params.fields.to_user(&params.user_name);
        Ok(api(&params.api)?
            .update_user(&params.user_name, &user)
            .await?)
    })
    .await
}

fn check_name(prefix: &str, handle: &ApiHandle, user_name: &str) -> std::result::Result<(), MultiError> {
    let mut merr = MultiError::new(prefix);
    check_api(handle, &mut merr);
    check_not_empty("username", user_name, &mut merr);
    merr.into_result()
}

pub async fn get(handle: ApiHandle, user_name: &str) -> Result<User> {
    check_name("user get", &handle, user_name)?;
    instrumented("user get", user_name, async {
        Ok(api(&handle)?.get_user(user_name).await?)
    })
    .await
}

pub async fn delete(handle: ApiHandle, user_name: &str) -> Result<()> {
    check_name("user delete", &handle, user_name)?;
    instrumented("user delete", user_name, async {
        Ok(api(&handle)?.delete_user(user_name).await?)
    })
    .await
}

pub async fn list(handle: ApiHandle) -> Result<UserList> {
    let mut merr = MultiError::new("user list");
    check_api(&handle, &mut merr);
    merr.into_result()?;
    instrumented("user list", "*", async {
        Ok(api(&handle)?.list_users().await?)
    })
    .await
}

/// The authenticated user.
pub async fn current(handle: ApiHandle) -> Result<User> {
    let mut merr = MultiError::new("user current");
    check_api(&handle, &mut merr);
    merr.into_result()?;
    instrumented("user current", "self", async {
        Ok(api(&handle)?.get_current_user().await?)
    })
    .await
}

/// Updates the authenticated user's profile. Roles cannot be self-assigned.
pub async fn update_current(handle: ApiHandle, fields: UserFields) -> Result<User> {
    let mut merr = MultiError::new("user update current");
    check_api(&handle, &mut merr);
    fields.check(&mut merr);
    if !fields.roles.is_empty() {
        merr.push("roles cannot be changed on the current user");
    }
    merr.into_result()?;

    instrumented("user update current", "self", async {
        let api = api(&handle)?;
        let me = api.get_current_user().await?;
        let user = fields.to_user(&me.user_name);
        Ok(api.update_current_user(&user).await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scripted;
    use serde_json::json;

    fn fields(password: &str, roles: Vec<Role>) -> UserFields {
        UserFields {
            password: Some(password.to_string()),
            roles,
            ..UserFields::default()
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("ece_platform_admin".parse::<Role>().unwrap(), Role::PlatformAdmin);
        assert_eq!("deployment-viewer".parse::<Role>().unwrap(), Role::DeploymentViewer);
        assert_eq!(
            "root".parse::<Role>().unwrap_err().to_string(),
            "unknown role \"root\""
        );
        let role: Role = serde_json::from_value(json!("platform-viewer")).unwrap();
        assert_eq!(serde_json::to_value(role).unwrap(), json!("ece_platform_viewer"));
    }

    #[test]
    fn test_role_compatibility() {
        let mut merr = MultiError::new("x");
        validate_roles(&[Role::PlatformAdmin], &mut merr);
        validate_roles(&[Role::PlatformViewer, Role::DeploymentManager], &mut merr);
        assert!(merr.is_empty());

        validate_roles(&[Role::PlatformAdmin, Role::PlatformViewer], &mut merr);
        validate_roles(&[Role::DeploymentManager, Role::DeploymentViewer], &mut merr);
        assert_eq!(
            merr.errors(),
            &[
                "ece_platform_admin role cannot be combined with any other role".to_string(),
                "only one of ece_deployment_manager or ece_deployment_viewer roles may be assigned"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_sends_wire_roles() {
        let (mock, handle) = scripted();
        mock.push_ok("create_user", json!({"user_name": "fulgencio"}));
        let user = create(UserParams {
            api: handle,
            user_name: "fulgencio".to_string(),
            fields: UserFields {
                email: Some("fulgencio@example.com".to_string()),
                ..fields("supersecret", vec![Role::DeploymentViewer])
            },
        })
        .await
        .unwrap();
        assert_eq!(user.user_name, "fulgencio");
        let args = &mock.calls()[0].args;
        assert_eq!(args["security"]["roles"], json!(["ece_deployment_viewer"]));
        assert_eq!(args["email"], json!("fulgencio@example.com"));
    }

    #[tokio::test]
    async fn test_create_validation_order() {
        let err = create(UserParams {
            api: None,
            user_name: String::new(),
            fields: UserFields {
                email: Some("nope".to_string()),
                ..fields("short", vec![Role::PlatformAdmin, Role::DeploymentManager])
            },
        })
        .await
        .unwrap_err();
        let merr = err.validation().unwrap();
        assert_eq!(merr.prefix(), "user create");
        assert_eq!(
            merr.errors(),
            &[
                "api reference is required for command".to_string(),
                "username cannot be empty".to_string(),
                "password must be at least 8 characters long".to_string(),
                "\"nope\" is not a valid email address format".to_string(),
                "ece_platform_admin role cannot be combined with any other role".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_requires_password_and_role() {
        let (_, handle) = scripted();
        let err = create(UserParams {
            api: handle,
            user_name: "fulgencio".to_string(),
            fields: UserFields::default(),
        })
        .await
        .unwrap_err();
        assert_eq!(
            err.validation().unwrap().errors(),
            &[
                "password cannot be empty".to_string(),
                "at least one role must be specified".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_leaves_unset_fields_out() {
        let (mock, handle) = scripted();
        mock.push_ok("update_user", json!({"user_name": "fulgencio", "full_name": "F"}));
        update(UserParams {
            api: handle,
            user_name: "fulgencio".to_string(),
            fields: UserFields {
                full_name: Some("F".to_string()),
                ..UserFields::default()
            },
        })
        .await
        .unwrap();
        let args = &mock.calls()[0].args;
        assert_eq!(args["name"], json!("fulgencio"));
        assert_eq!(args["user"], json!({"user_name": "fulgencio", "full_name": "F"}));
    }

    #[tokio::test]
    async fn test_update_current_uses_own_name() {
        let (mock, handle) = scripted();
        mock.push_ok("get_current_user", json!({"user_name": "me"}))
            .push_ok("update_current_user", json!({"user_name": "me"}));
        update_current(
            handle,
            UserFields {
                email: Some("me@example.com".to_string()),
                ..UserFields::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(mock.calls()[1].args["user_name"], json!("me"));
    }

    #[tokio::test]
    async fn test_get_delete_list_current() {
        let (mock, handle) = scripted();
        mock.push_ok("get_user", json!({"user_name": "a"}))
            .push_ok("delete_user", json!({}))
            .push_ok("list_users", json!({"users": [{"user_name": "a"}]}))
            .push_ok("get_current_user", json!({"user_name": "admin"}));

        assert_eq!(get(handle.clone(), "a").await.unwrap().user_name, "a");
        delete(handle.clone(), "a").await.unwrap();
        assert_eq!(list(handle.clone()).await.unwrap().users.len(), 1);
        assert_eq!(current(handle).await.unwrap().user_name, "admin");
        assert!(get(None, "").await.is_err());
    }
}
