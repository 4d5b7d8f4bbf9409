//! Field checks shared by every parameter record.
//!
//! Each check appends at most one message to the caller's [`MultiError`], so a
//! record's validator is a plain sequence of checks in field order.

use crate::error::{OpError, Result};
use crate::multierror::MultiError;
use esfleet_api::RemoteApi;
use regex::Regex;
use std::sync::{Arc, OnceLock};

pub const API_REQUIRED: &str = "api reference is required for command";
pub const CLUSTER_ID_LENGTH: usize = 32;
pub const CLUSTER_ID_INVALID: &str = "cluster id should have a length of 32 characters";
pub const DEPLOYMENT_ID_INVALID: &str = "deployment id should have a length of 32 characters";
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Shared handle type carried by every parameter record.
pub type ApiHandle = Option<Arc<dyn RemoteApi>>;

pub fn check_api(api: &ApiHandle, merr: &mut MultiError) {
    if api.is_none() {
        merr.push(API_REQUIRED);
    }
}

pub fn check_cluster_id(id: &str, merr: &mut MultiError) {
    if id.len() != CLUSTER_ID_LENGTH {
        merr.push(CLUSTER_ID_INVALID);
    }
}

pub fn check_deployment_id(id: &str, merr: &mut MultiError) {
    if id.len() != CLUSTER_ID_LENGTH {
        merr.push(DEPLOYMENT_ID_INVALID);
    }
}

pub fn check_not_empty(field: &str, value: &str, merr: &mut MultiError) {
    if value.trim().is_empty() {
        merr.push(format!("{} cannot be empty", field));
    }
}

pub fn check_password(password: Option<&str>, merr: &mut MultiError) {
    if let Some(p) = password {
        if p.chars().count() < MIN_PASSWORD_LENGTH {
            merr.push(format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ));
        }
    }
}

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // EMAIL_PATTERN is a literal; test_email_pattern_compiles covers it
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern must compile"))
}

pub fn check_email(email: Option<&str>, merr: &mut MultiError) {
    let Some(email) = email else { return };
    if email.len() > MAX_EMAIL_LENGTH {
        merr.push(format!(
            "email address must not exceed {} characters",
            MAX_EMAIL_LENGTH
        ));
    } else if !email_regex().is_match(email) {
        merr.push(format!("{:?} is not a valid email address format", email));
    }
}

/// Borrows the API handle of a validated record.
pub fn api(handle: &ApiHandle) -> Result<&dyn RemoteApi> {
    handle.as_deref().ok_or_else(|| {
        let mut merr = MultiError::default();
        merr.push(API_REQUIRED);
        OpError::Validation(merr)
    })
}
