//! 页面操作：listPages / getPage / createPage / updatePage / deletePage / searchContent

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::content::{
    ContentIndex, ContentRepository, EntryKind, NewPage, Page, PageFilter, PageUpdate,
};
use crate::operations::args::{
    repo_err, required_str, status_arg, str_arg, to_payload, usize_arg,
};
use crate::operations::{EntityTarget, Operation, ParamSpec, ParamType};

pub(crate) const PAGE_TARGET: EntityTarget = EntityTarget {
    kind: "page",
    param: "pageId",
};

const DEFAULT_LIST_LIMIT: usize = 20;
const DEFAULT_SEARCH_LIMIT: usize = 5;

/// 列表中的页面摘要（不含正文）
fn page_row(page: &Page) -> Value {
    json!({
        "id": page.id,
        "title": page.title,
        "slug": page.slug,
        "status": page.status,
        "clusterId": page.cluster_id,
        "updatedAt": page.updated_at.to_rfc3339(),
    })
}

pub(crate) fn page_not_found(id: &str) -> String {
    format!("Page not found: {id}")
}

pub(crate) fn ensure_cluster(repo: &dyn ContentRepository, cluster_id: &str) -> Result<(), String> {
    match repo.get_cluster(cluster_id).map_err(repo_err)? {
        Some(_) => Ok(()),
        None => Err(format!("Cluster not found: {cluster_id}")),
    }
}

pub struct ListPages {
    repo: Arc<dyn ContentRepository>,
}

impl ListPages {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for ListPages {
    fn name(&self) -> &str {
        "listPages"
    }

    fn description(&self) -> &str {
        "List pages, most recently updated first. Optional filters: status, clusterId."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::optional("status", ParamType::String, "draft | published | archived"),
            ParamSpec::optional("clusterId", ParamType::String, "only pages in this cluster"),
            ParamSpec::optional("limit", ParamType::Integer, "max pages to return (default 20)"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let filter = PageFilter {
            status: status_arg(&args, "status")?,
            cluster_id: str_arg(&args, "clusterId").map(String::from),
            limit: Some(usize_arg(&args, "limit").unwrap_or(DEFAULT_LIST_LIMIT)),
        };
        let pages = self.repo.list_pages(&filter).map_err(repo_err)?;
        Ok(json!({
            "count": pages.len(),
            "pages": pages.iter().map(page_row).collect::<Vec<_>>(),
        }))
    }
}

pub struct GetPage {
    repo: Arc<dyn ContentRepository>,
}

impl GetPage {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for GetPage {
    fn name(&self) -> &str {
        "getPage"
    }

    fn description(&self) -> &str {
        "Get one page with its full content and SEO metadata."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("pageId", ParamType::String, "page id")]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "pageId")?;
        match self.repo.get_page(id).map_err(repo_err)? {
            Some(page) => to_payload(&page),
            None => Err(page_not_found(id)),
        }
    }
}

pub struct CreatePage {
    repo: Arc<dyn ContentRepository>,
}

impl CreatePage {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for CreatePage {
    fn name(&self) -> &str {
        "createPage"
    }

    fn description(&self) -> &str {
        "Create a new page. The slug is derived from the title when omitted."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("title", ParamType::String, "page title"),
            ParamSpec::optional("content", ParamType::String, "page body"),
            ParamSpec::optional("slug", ParamType::String, "url slug"),
            ParamSpec::optional("status", ParamType::String, "draft (default) | published"),
            ParamSpec::optional("clusterId", ParamType::String, "cluster to place the page in"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let cluster_id = str_arg(&args, "clusterId").map(String::from);
        if let Some(cid) = cluster_id.as_deref() {
            ensure_cluster(self.repo.as_ref(), cid)?;
        }
        let page = self
            .repo
            .create_page(NewPage {
                title: required_str(&args, "title")?.to_string(),
                slug: str_arg(&args, "slug").map(String::from),
                content: str_arg(&args, "content").unwrap_or_default().to_string(),
                status: status_arg(&args, "status")?.unwrap_or_default(),
                cluster_id,
            })
            .map_err(repo_err)?;
        Ok(page_row(&page))
    }
}

pub struct UpdatePage {
    repo: Arc<dyn ContentRepository>,
}

impl UpdatePage {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for UpdatePage {
    fn name(&self) -> &str {
        "updatePage"
    }

    fn description(&self) -> &str {
        "Update fields of an existing page. Only the given fields change."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pageId", ParamType::String, "page id"),
            ParamSpec::optional("title", ParamType::String, "new title"),
            ParamSpec::optional("content", ParamType::String, "new body"),
            ParamSpec::optional("slug", ParamType::String, "new slug"),
            ParamSpec::optional("status", ParamType::String, "draft | published | archived"),
        ]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "pageId")?;
        let update = PageUpdate {
            title: str_arg(&args, "title").map(String::from),
            content: str_arg(&args, "content").map(String::from),
            slug: str_arg(&args, "slug").map(String::from),
            status: status_arg(&args, "status")?,
            ..Default::default()
        };
        if update.is_empty() {
            return Err("No fields to update".to_string());
        }
        match self.repo.update_page(id, update).map_err(repo_err)? {
            Some(page) => Ok(page_row(&page)),
            None => Err(page_not_found(id)),
        }
    }
}

pub struct DeletePage {
    repo: Arc<dyn ContentRepository>,
}

impl DeletePage {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for DeletePage {
    fn name(&self) -> &str {
        "deletePage"
    }

    fn description(&self) -> &str {
        "Delete a page permanently."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("pageId", ParamType::String, "page id")]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "pageId")?;
        if self.repo.delete_page(id).map_err(repo_err)? {
            Ok(json!({ "deleted": id }))
        } else {
            Err(page_not_found(id))
        }
    }
}

pub struct SearchContent {
    repo: Arc<dyn ContentRepository>,
}

impl SearchContent {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for SearchContent {
    fn name(&self) -> &str {
        "searchContent"
    }

    fn description(&self) -> &str {
        "Keyword search over page and cluster titles and bodies."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("query", ParamType::String, "keywords"),
            ParamSpec::optional("limit", ParamType::Integer, "max hits (default 5)"),
        ]
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let query = required_str(&args, "query")?;
        let index = ContentIndex::from_repository(self.repo.as_ref()).map_err(repo_err)?;
        let hits = index.search(
            query,
            &[EntryKind::Page, EntryKind::Cluster],
            usize_arg(&args, "limit").unwrap_or(DEFAULT_SEARCH_LIMIT),
        );
        Ok(json!({ "query": query, "hits": hits }))
    }
}
