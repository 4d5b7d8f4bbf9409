//! Proxies and proxy filtered groups.

use crate::error::Result;
use crate::multierror::MultiError;
use crate::pipeline::instrumented;
use crate::validate::{api, check_api, check_not_empty, ApiHandle};
use esfleet_api::platform::{
    ProxiesFilteredGroup, ProxiesFilteredGroupHealth, ProxyInfo, ProxyOverview,
};

fn check_handle(prefix: &str, handle: &ApiHandle) -> std::result::Result<(), MultiError> {
    let mut merr = MultiError::new(prefix);
    check_api(handle, &mut merr);
    merr.into_result()
}

fn check_id(
    prefix: &str,
    field: &str,
    handle: &ApiHandle,
    id: &str,
) -> std::result::Result<(), MultiError> {
    let mut merr = MultiError::new(prefix);
    check_api(handle, &mut merr);
    check_not_empty(field, id, &mut merr);
    merr.into_result()
}

pub async fn list(handle: ApiHandle) -> Result<ProxyOverview> {
    check_handle("proxy list", &handle)?;
    instrumented("proxy list", "*", async {
        Ok(api(&handle)?.list_proxies().await?)
    })
    .await
}

pub async fn show(handle: ApiHandle, proxy_id: &str) -> Result<ProxyInfo> {
    check_id("proxy show", "proxy id", &handle, proxy_id)?;
    instrumented("proxy show", proxy_id, async {
        Ok(api(&handle)?.get_proxy(proxy_id).await?)
    })
    .await
}

pub async fn list_filtered_groups(handle: ApiHandle) -> Result<Vec<ProxiesFilteredGroupHealth>> {
    check_handle("proxy filtered group list", &handle)?;
    instrumented("proxy filtered group list", "*", async {
        Ok(api(&handle)?.list_proxy_filtered_groups().await?)
    })
    .await
}

pub async fn show_filtered_group(handle: ApiHandle, id: &str) -> Result<ProxiesFilteredGroupHealth> {
    check_id("proxy filtered group show", "id", &handle, id)?;
    instrumented("proxy filtered group show", id, async {
        Ok(api(&handle)?.get_proxy_filtered_group(id).await?)
    })
    .await
}

pub async fn delete_filtered_group(handle: ApiHandle, id: &str) -> Result<()> {
    check_id("proxy filtered group delete", "id", &handle, id)?;
    instrumented("proxy filtered group delete", id, async {
        Ok(api(&handle)?.delete_proxy_filtered_group(id).await?)
    })
    .await
}

#[derive(Default)]
pub struct FilteredGroupParams {
    pub api: ApiHandle,
    pub group: ProxiesFilteredGroup,
    /// Expected current version on update.
    pub version: Option<u64>,
}

impl FilteredGroupParams {
    fn check(&self, prefix: &str) -> std::result::Result<(), MultiError> {
        let mut merr = MultiError::new(prefix);
        check_api(&self.api, &mut merr);
        check_not_empty("id", &self.group.id, &mut merr);
        if self.group.filters.is_empty() {
            merr.push("at least one filter must be specified");
        }
        for filter in &self.group.filters {
            if filter.key.trim().is_empty() || filter.value.trim().is_empty() {
                merr.push("filter key and value cannot be empty");
                break;
            }
        }
        if self.group.expected_proxies_count <= 0 {
            merr.push("expected proxies count must be greater than zero");
        }
        merr.into_result()
    }
}

pub async fn create_filtered_group(params: FilteredGroupParams) -> Result<ProxiesFilteredGroup> {
    params.check("proxy filtered group create")?;
    instrumented("proxy filtered group create", &params.group.id, async {
        Ok(api(&params.api)?
            .create_proxy_filtered_group(&params.group)
            .await?)
    })
    .await
}

pub async fn update_filtered_group(params: FilteredGroupParams) -> Result<ProxiesFilteredGroup> {
    params.check("proxy filtered group update")?;
    instrumented("proxy filtered group update", &params.group.id, async {
        Ok(api(&params.api)?
            .update_proxy_filtered_group(&params.group.id, &params.group, params.version)
            .await?)
    })
    .await
}
