//! Post-filtering of list results by current plan version.

use esfleet_api::cluster::{
    ElasticsearchClusterInfo, ElasticsearchClustersInfo, KibanaClusterInfo, KibanaClustersInfo,
};

/// A listed cluster whose current plan carries a version.
pub trait Versioned {
    fn current_version(&self) -> Option<&str>;
}

impl Versioned for ElasticsearchClusterInfo {
    fn current_version(&self) -> Option<&str> {
        ElasticsearchClusterInfo::current_version(self)
    }
}

impl Versioned for KibanaClusterInfo {
    fn current_version(&self) -> Option<&str> {
        KibanaClusterInfo::current_version(self)
    }
}

/// Keeps the items whose current plan version equals `version`. An empty
/// `version` keeps everything.
pub fn by_version<T: Versioned>(items: Vec<T>, version: &str) -> Vec<T> {
    if version.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|c| c.current_version() == Some(version))
        .collect()
}

pub fn filter_elasticsearch(list: ElasticsearchClustersInfo, version: &str) -> ElasticsearchClustersInfo {
    if version.is_empty() {
        return list;
    }
    let clusters = by_version(list.elasticsearch_clusters, version);
    ElasticsearchClustersInfo {
        return_count: clusters.len(),
        elasticsearch_clusters: clusters,
    }
}

pub fn filter_kibana(list: KibanaClustersInfo, version: &str) -> KibanaClustersInfo {
    if version.is_empty() {
        return list;
    }
    let clusters = by_version(list.kibana_clusters, version);
    KibanaClustersInfo {
        return_count: clusters.len(),
        kibana_clusters: clusters,
    }
}
