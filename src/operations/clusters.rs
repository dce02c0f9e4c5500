//! 集群（主题簇）操作：listClusters / createCluster / assignPageToCluster

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::content::{ContentRepository, PageFilter, PageUpdate};
use crate::operations::args::{repo_err, required_str, str_arg};
use crate::operations::pages::{ensure_cluster, page_not_found, PAGE_TARGET};
use crate::operations::{EntityTarget, Operation, ParamSpec, ParamType};

pub struct ListClusters {
    repo: Arc<dyn ContentRepository>,
}

impl ListClusters {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for ListClusters {
    fn name(&self) -> &str {
        "listClusters"
    }

    fn description(&self) -> &str {
        "List content clusters (topic groupings) with the number of pages in each."
    }

    async fn execute(&self, _args: Value) -> Result<Value, String> {
        let clusters = self.repo.list_clusters().map_err(repo_err)?;
        let pages = self.repo.list_pages(&PageFilter::default()).map_err(repo_err)?;
        let rows: Vec<Value> = clusters
            .iter()
            .map(|c| {
                let page_count = pages
                    .iter()
                    .filter(|p| p.cluster_id.as_deref() == Some(c.id.as_str()))
                    .count();
                json!({
                    "id": c.id,
                    "name": c.name,
                    "description": c.description,
                    "pillarPageId": c.pillar_page_id,
                    "pageCount": page_count,
                })
            })
            .collect();
        Ok(json!({ "count": rows.len(), "clusters": rows }))
    }
}

pub struct CreateCluster {
    repo: Arc<dyn ContentRepository>,
}

impl CreateCluster {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for CreateCluster {
    fn name(&self) -> &str {
        "createCluster"
    }

    fn description(&self) -> &str {
        "Create a new content cluster."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("name", ParamType::String, "cluster name"),
            ParamSpec::optional("description", ParamType::String, "what the cluster covers"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let cluster = self
            .repo
            .create_cluster(
                required_str(&args, "name")?,
                str_arg(&args, "description").unwrap_or_default(),
            )
            .map_err(repo_err)?;
        serde_json::to_value(cluster).map_err(|e| e.to_string())
    }
}

pub struct AssignPageToCluster {
    repo: Arc<dyn ContentRepository>,
}

impl AssignPageToCluster {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for AssignPageToCluster {
    fn name(&self) -> &str {
        "assignPageToCluster"
    }

    fn description(&self) -> &str {
        "Move a page into a cluster."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pageId", ParamType::String, "page id"),
            ParamSpec::required("clusterId", ParamType::String, "cluster id"),
        ]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let page_id = required_str(&args, "pageId")?;
        let cluster_id = required_str(&args, "clusterId")?;
        ensure_cluster(self.repo.as_ref(), cluster_id)?;
        let update = PageUpdate {
            cluster_id: Some(cluster_id.to_string()),
            ..Default::default()
        };
        match self.repo.update_page(page_id, update).map_err(repo_err)? {
            Some(page) => Ok(json!({ "pageId": page.id, "clusterId": page.cluster_id })),
            None => Err(page_not_found(page_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InMemoryContentRepository, NewPage};

    #[tokio::test]
    async fn test_assign_and_count_pages() {
        let repo: Arc<dyn ContentRepository> = Arc::new(InMemoryContentRepository::new());
        let cluster = CreateCluster::new(repo.clone())
            .execute(json!({"name": "Guides"}))
            .await
            .unwrap();
        let cluster_id = cluster["id"].as_str().unwrap().to_string();
        let page = repo
            .create_page(NewPage {
                title: "Mug care".into(),
                ..Default::default()
            })
            .unwrap();

        AssignPageToCluster::new(repo.clone())
            .execute(json!({"pageId": page.id, "clusterId": cluster_id}))
            .await
            .unwrap();

        let listed = ListClusters::new(repo).execute(json!({})).await.unwrap();
        assert_eq!(listed["clusters"][0]["pageCount"], 1);
    }

    #[tokio::test]
    async fn test_assign_to_missing_cluster_fails() {
        let repo: Arc<dyn ContentRepository> = Arc::new(InMemoryContentRepository::new());
        let err = AssignPageToCluster::new(repo)
            .execute(json!({"pageId": "p", "clusterId": "c"}))
            .await
            .unwrap_err();
        assert_eq!(err, "Cluster not found: c");
    }
}
