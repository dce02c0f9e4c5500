//! 内容库接口
//!
//! ContentRepository 是操作处理器访问内容存储的唯一入口：按实体提供 CRUD，未找到返回 None。
//! 单次调用内部原子；多次调用之间不提供事务。引擎本身只通过 snapshot() 读取概要。

use std::sync::RwLock;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::content::model::{
    slugify, Cluster, Document, MediaAsset, NewPage, Page, PageFilter, PageStatus, PageUpdate,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("invalid record: {0}")]
    Invalid(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// 概要中的页面条目
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub status: PageStatus,
}

/// 内容库当前状态的压缩概要（计数 + 最近更新的页面）
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub page_count: usize,
    pub published_count: usize,
    pub cluster_count: usize,
    pub document_count: usize,
    pub media_count: usize,
    pub recent_pages: Vec<PageSummary>,
}

/// 内容库 trait：页面 / 集群 / 文档 / 媒体
pub trait ContentRepository: Send + Sync {
    /// 按 updated_at 倒序列出页面
    fn list_pages(&self, filter: &PageFilter) -> RepoResult<Vec<Page>>;
    fn get_page(&self, id: &str) -> RepoResult<Option<Page>>;
    fn create_page(&self, page: NewPage) -> RepoResult<Page>;
    fn update_page(&self, id: &str, update: PageUpdate) -> RepoResult<Option<Page>>;
    fn delete_page(&self, id: &str) -> RepoResult<bool>;

    fn list_clusters(&self) -> RepoResult<Vec<Cluster>>;
    fn get_cluster(&self, id: &str) -> RepoResult<Option<Cluster>>;
    fn create_cluster(&self, name: &str, description: &str) -> RepoResult<Cluster>;

    fn list_documents(&self) -> RepoResult<Vec<Document>>;
    fn add_document(&self, title: &str, content: &str, source: Option<&str>)
        -> RepoResult<Document>;

    fn list_media(&self) -> RepoResult<Vec<MediaAsset>>;
    fn add_media(&self, filename: &str, url: &str, alt_text: Option<&str>) -> RepoResult<MediaAsset>;
    fn update_media_alt(&self, id: &str, alt_text: &str) -> RepoResult<Option<MediaAsset>>;

    /// 生成概要；recent 限制最近页面条数
    fn snapshot(&self, recent: usize) -> RepoResult<StoreSnapshot> {
        let pages = self.list_pages(&PageFilter::default())?;
        Ok(StoreSnapshot {
            page_count: pages.len(),
            published_count: pages
                .iter()
                .filter(|p| p.status == PageStatus::Published)
                .count(),
            cluster_count: self.list_clusters()?.len(),
            document_count: self.list_documents()?.len(),
            media_count: self.list_media()?.len(),
            recent_pages: pages
                .into_iter()
                .take(recent)
                .map(|p| PageSummary {
                    id: p.id,
                    title: p.title,
                    status: p.status,
                })
                .collect(),
        })
    }
}

/// 生成带前缀的短 ID，如 page-1a2b3c4d
pub(crate) fn new_id(prefix: &str) -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &raw[..8])
}

/// 由 NewPage 构造完整页面记录
pub(crate) fn build_page(page: NewPage) -> RepoResult<Page> {
    let title = page.title.trim().to_string();
    if title.is_empty() {
        return Err(RepositoryError::Invalid("page title must not be empty".into()));
    }
    let slug = page.slug.unwrap_or_else(|| slugify(&title));
    Ok(Page {
        id: new_id("page"),
        title,
        slug,
        content: page.content,
        status: page.status,
        cluster_id: page.cluster_id,
        seo: Default::default(),
        updated_at: Utc::now(),
    })
}

pub(crate) fn sort_and_limit(mut pages: Vec<Page>, filter: &PageFilter) -> Vec<Page> {
    pages.retain(|p| filter.matches(p));
    pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    if let Some(limit) = filter.limit {
        pages.truncate(limit);
    }
    pages
}

#[derive(Default)]
struct Store {
    pages: Vec<Page>,
    clusters: Vec<Cluster>,
    documents: Vec<Document>,
    media: Vec<MediaAsset>,
}

/// 内存实现（测试与无 sqlite_path 时的默认存储）
#[derive(Default)]
pub struct InMemoryContentRepository {
    store: RwLock<Store>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Storage("content store lock poisoned".into())
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentRepository for InMemoryContentRepository {
    fn list_pages(&self, filter: &PageFilter) -> RepoResult<Vec<Page>> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(sort_and_limit(store.pages.clone(), filter))
    }

    fn get_page(&self, id: &str) -> RepoResult<Option<Page>> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store.pages.iter().find(|p| p.id == id).cloned())
    }

    fn create_page(&self, page: NewPage) -> RepoResult<Page> {
        let page = build_page(page)?;
        self.store.write().map_err(poisoned)?.pages.push(page.clone());
        Ok(page)
    }

    fn update_page(&self, id: &str, update: PageUpdate) -> RepoResult<Option<Page>> {
        let mut store = self.store.write().map_err(poisoned)?;
        Ok(store.pages.iter_mut().find(|p| p.id == id).map(|page| {
            update.apply(page);
            page.clone()
        }))
    }

    fn delete_page(&self, id: &str) -> RepoResult<bool> {
        let mut store = self.store.write().map_err(poisoned)?;
        let before = store.pages.len();
        store.pages.retain(|p| p.id != id);
        Ok(store.pages.len() != before)
    }

    fn list_clusters(&self) -> RepoResult<Vec<Cluster>> {
        Ok(self.store.read().map_err(poisoned)?.clusters.clone())
    }

    fn get_cluster(&self, id: &str) -> RepoResult<Option<Cluster>> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store.clusters.iter().find(|c| c.id == id).cloned())
    }

    fn create_cluster(&self, name: &str, description: &str) -> RepoResult<Cluster> {
        if name.trim().is_empty() {
            return Err(RepositoryError::Invalid("cluster name must not be empty".into()));
        }
        let cluster = Cluster {
            id: new_id("cluster"),
            name: name.trim().to_string(),
            description: description.to_string(),
            pillar_page_id: None,
        };
        self.store
            .write()
            .map_err(poisoned)?
            .clusters
            .push(cluster.clone());
        Ok(cluster)
    }

    fn list_documents(&self) -> RepoResult<Vec<Document>> {
        Ok(self.store.read().map_err(poisoned)?.documents.clone())
    }

    fn add_document(
        &self,
        title: &str,
        content: &str,
        source: Option<&str>,
    ) -> RepoResult<Document> {
        let doc = Document {
            id: new_id("doc"),
            title: title.to_string(),
            content: content.to_string(),
            source: source.map(String::from),
        };
        self.store
            .write()
            .map_err(poisoned)?
            .documents
            .push(doc.clone());
        Ok(doc)
    }

    fn list_media(&self) -> RepoResult<Vec<MediaAsset>> {
        Ok(self.store.read().map_err(poisoned)?.media.clone())
    }

    fn add_media(&self, filename: &str, url: &str, alt_text: Option<&str>) -> RepoResult<MediaAsset> {
        let asset = MediaAsset {
            id: new_id("media"),
            filename: filename.to_string(),
            url: url.to_string(),
            alt_text: alt_text.map(String::from),
        };
        self.store.write().map_err(poisoned)?.media.push(asset.clone());
        Ok(asset)
    }

    fn update_media_alt(&self, id: &str, alt_text: &str) -> RepoResult<Option<MediaAsset>> {
        let mut store = self.store.write().map_err(poisoned)?;
        Ok(store.media.iter_mut().find(|m| m.id == id).map(|asset| {
            asset.alt_text = Some(alt_text.to_string());
            asset.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_page(title: &str, status: PageStatus) -> NewPage {
        NewPage {
            title: title.into(),
            content: format!("{title} body"),
            status,
            ..Default::default()
        }
    }

    #[test]
    fn test_page_crud() {
        let repo = InMemoryContentRepository::new();
        let page = repo.create_page(new_page("About Us", PageStatus::Draft)).unwrap();
        assert_eq!(page.slug, "about-us");
        assert!(page.id.starts_with("page-"));

        let updated = repo
            .update_page(
                &page.id,
                PageUpdate {
                    status: Some(PageStatus::Published),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, PageStatus::Published);

        assert!(repo.update_page("missing", PageUpdate::default()).unwrap().is_none());
        assert!(repo.delete_page(&page.id).unwrap());
        assert!(!repo.delete_page(&page.id).unwrap());
        assert!(repo.get_page(&page.id).unwrap().is_none());
    }

    #[test]
    fn test_create_page_rejects_blank_title() {
        let repo = InMemoryContentRepository::new();
        let err = repo.create_page(new_page("   ", PageStatus::Draft)).unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
    }

    #[test]
    fn test_list_pages_filters_by_status_and_limit() {
        let repo = InMemoryContentRepository::new();
        repo.create_page(new_page("A", PageStatus::Published)).unwrap();
        repo.create_page(new_page("B", PageStatus::Draft)).unwrap();
        repo.create_page(new_page("C", PageStatus::Published)).unwrap();

        let published = repo
            .list_pages(&PageFilter {
                status: Some(PageStatus::Published),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(published.len(), 2);

        let limited = repo
            .list_pages(&PageFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_snapshot_counts_and_bounds_recent() {
        let repo = InMemoryContentRepository::new();
        for i in 0..4 {
            repo.create_page(new_page(&format!("P{i}"), PageStatus::Published)).unwrap();
        }
        repo.create_cluster("Guides", "how-to content").unwrap();
        repo.add_document("Style guide", "Use short sentences", None).unwrap();
        repo.add_media("hero.png", "/media/hero.png", None).unwrap();

        let snap = repo.snapshot(2).unwrap();
        assert_eq!(snap.page_count, 4);
        assert_eq!(snap.published_count, 4);
        assert_eq!(snap.cluster_count, 1);
        assert_eq!(snap.document_count, 1);
        assert_eq!(snap.media_count, 1);
        assert_eq!(snap.recent_pages.len(), 2);
    }

    #[test]
    fn test_update_media_alt() {
        let repo = InMemoryContentRepository::new();
        let asset = repo.add_media("a.jpg", "/a.jpg", None).unwrap();
        let updated = repo.update_media_alt(&asset.id, "A cat").unwrap().unwrap();
        assert_eq!(updated.alt_text.as_deref(), Some("A cat"));
        assert!(repo.update_media_alt("nope", "x").unwrap().is_none());
    }
}
