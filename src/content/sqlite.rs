//! SQLite 内容库
//!
//! 每条记录以 JSON 载荷存入 records(kind, id, payload, updated_at)；
//! 单连接由 Mutex 保护，不跨调用持锁；更新类方法在一次加锁内以事务完成读-改-写。

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::content::model::{Cluster, Document, MediaAsset, NewPage, Page, PageFilter, PageUpdate};
use crate::content::repository::{
    build_page, new_id, sort_and_limit, ContentRepository, RepoResult, RepositoryError,
};

const PAGE: &str = "page";
const CLUSTER: &str = "cluster";
const DOCUMENT: &str = "document";
const MEDIA: &str = "media";

fn storage_err(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Storage(e.to_string())
}

pub struct SqliteContentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentRepository {
    /// 打开（必要时创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(storage_err)?;
            }
        }
        Self::init(Connection::open(path).map_err(storage_err)?)
    }

    pub fn in_memory() -> RepoResult<Self> {
        Self::init(Connection::open_in_memory().map_err(storage_err)?)
    }

    fn init(conn: Connection) -> RepoResult<Self> {
        conn.execute_batch(
            "BEGIN;
             CREATE TABLE IF NOT EXISTS records(
                kind TEXT NOT NULL,
                id TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY(kind, id)
             );
             CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind);
             COMMIT;",
        )
        .map_err(storage_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepositoryError::Storage("connection lock poisoned".into()))
    }

    fn put<T: Serialize>(&self, kind: &str, id: &str, record: &T) -> RepoResult<()> {
        write_record(&*self.lock()?, kind, id, record)
    }

    fn fetch<T: DeserializeOwned>(&self, kind: &str, id: &str) -> RepoResult<Option<T>> {
        read_record(&*self.lock()?, kind, id)
    }

    /// 读-改-写在同一把锁与同一事务内完成；记录不存在时返回 None 且不写入
    fn modify<T, F>(&self, kind: &str, id: &str, f: F) -> RepoResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(storage_err)?;
        let Some(mut record) = read_record::<T>(&tx, kind, id)? else {
            return Ok(None);
        };
        f(&mut record);
        write_record(&tx, kind, id, &record)?;
        tx.commit().map_err(storage_err)?;
        Ok(Some(record))
    }

    fn fetch_all<T: DeserializeOwned>(&self, kind: &str) -> RepoResult<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM records WHERE kind = ?1 ORDER BY rowid")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map(params![kind], |row| row.get::<_, String>(0))
            .map_err(storage_err)?;
        let mut out = Vec::new();
        for row in rows {
            let payload = row.map_err(storage_err)?;
            out.push(serde_json::from_str(&payload).map_err(storage_err)?);
        }
        Ok(out)
    }

    fn remove(&self, kind: &str, id: &str) -> RepoResult<bool> {
        let n = self
            .lock()?
            .execute(
                "DELETE FROM records WHERE kind = ?1 AND id = ?2",
                params![kind, id],
            )
            .map_err(storage_err)?;
        Ok(n > 0)
    }
}

fn write_record<T: Serialize>(conn: &Connection, kind: &str, id: &str, record: &T) -> RepoResult<()> {
    let payload = serde_json::to_string(record).map_err(storage_err)?;
    conn.execute(
        "INSERT OR REPLACE INTO records(kind, id, payload, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![kind, id, payload, Utc::now().to_rfc3339()],
    )
    .map_err(storage_err)?;
    Ok(())
}

fn read_record<T: DeserializeOwned>(conn: &Connection, kind: &str, id: &str) -> RepoResult<Option<T>> {
    let payload: Option<String> = conn
        .query_row(
            "SELECT payload FROM records WHERE kind = ?1 AND id = ?2",
            params![kind, id],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)?;
    payload
        .map(|p| serde_json::from_str(&p).map_err(storage_err))
        .transpose()
}

impl ContentRepository for SqliteContentRepository {
    fn list_pages(&self, filter: &PageFilter) -> RepoResult<Vec<Page>> {
        Ok(sort_and_limit(self.fetch_all(PAGE)?, filter))
    }

    fn get_page(&self, id: &str) -> RepoResult<Option<Page>> {
        self.fetch(PAGE, id)
    }

    fn create_page(&self, page: NewPage) -> RepoResult<Page> {
        let page = build_page(page)?;
        self.put(PAGE, &page.id, &page)?;
        Ok(page)
    }

    fn update_page(&self, id: &str, update: PageUpdate) -> RepoResult<Option<Page>> {
        self.modify(PAGE, id, |page: &mut Page| update.apply(page))
    }

    fn delete_page(&self, id: &str) -> RepoResult<bool> {
        self.remove(PAGE, id)
    }

    fn list_clusters(&self) -> RepoResult<Vec<Cluster>> {
        self.fetch_all(CLUSTER)
    }

    fn get_cluster(&self, id: &str) -> RepoResult<Option<Cluster>> {
        self.fetch(CLUSTER, id)
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
        self.put(CLUSTER, &cluster.id, &cluster)?;
        Ok(cluster)
    }

    fn list_documents(&self) -> RepoResult<Vec<Document>> {
        self.fetch_all(DOCUMENT)
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
        self.put(DOCUMENT, &doc.id, &doc)?;
        Ok(doc)
    }

    fn list_media(&self) -> RepoResult<Vec<MediaAsset>> {
        self.fetch_all(MEDIA)
    }

    fn add_media(&self, filename: &str, url: &str, alt_text: Option<&str>) -> RepoResult<MediaAsset> {
        let asset = MediaAsset {
            id: new_id("media"),
            filename: filename.to_string(),
            url: url.to_string(),
            alt_text: alt_text.map(String::from),
        };
        self.put(MEDIA, &asset.id, &asset)?;
        Ok(asset)
    }

    fn update_media_alt(&self, id: &str, alt_text: &str) -> RepoResult<Option<MediaAsset>> {
        self.modify(MEDIA, id, |asset: &mut MediaAsset| {
            asset.alt_text = Some(alt_text.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::model::PageStatus;

    #[test]
    fn test_sqlite_roundtrip_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.db");
        let id = {
            let repo = SqliteContentRepository::open(&path).unwrap();
            let page = repo
                .create_page(NewPage {
                    title: "Pricing".into(),
                    content: "Plans and prices".into(),
                    ..Default::default()
                })
                .unwrap();
            repo.create_cluster("Commercial", "money pages").unwrap();
            page.id
        };

        let repo = SqliteContentRepository::open(&path).unwrap();
        let page = repo.get_page(&id).unwrap().unwrap();
        assert_eq!(page.title, "Pricing");
        assert_eq!(repo.list_clusters().unwrap().len(), 1);
    }

    #[test]
    fn test_sqlite_update_and_delete() {
        let repo = SqliteContentRepository::in_memory().unwrap();
        let page = repo
            .create_page(NewPage {
                title: "Blog".into(),
                ..Default::default()
            })
            .unwrap();
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
        assert_eq!(repo.snapshot(5).unwrap().published_count, 1);
        assert!(repo.update_page("page-missing", PageUpdate::default()).unwrap().is_none());
        assert!(repo.delete_page(&page.id).unwrap());
        assert!(repo.list_pages(&PageFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_media_alt() {
        let repo = SqliteContentRepository::in_memory().unwrap();
        let asset = repo.add_media("logo.svg", "/logo.svg", None).unwrap();
        repo.update_media_alt(&asset.id, "Company logo").unwrap();
        let media = repo.list_media().unwrap();
        assert_eq!(media[0].alt_text.as_deref(), Some("Company logo"));
    }

    #[test]
    fn test_sqlite_concurrent_updates_keep_both_fields() {
        use std::sync::Barrier;

        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(SqliteContentRepository::open(dir.path().join("race.db")).unwrap());

        for round in 0..50 {
            let page = repo
                .create_page(NewPage {
                    title: "Draft".into(),
                    ..Default::default()
                })
                .unwrap();
            let barrier = Arc::new(Barrier::new(2));
            let title = format!("Title {round}");
            let content = format!("Body {round}");

            let handles: Vec<_> = [
                PageUpdate {
                    title: Some(title.clone()),
                    ..Default::default()
                },
                PageUpdate {
                    content: Some(content.clone()),
                    ..Default::default()
                },
            ]
            .into_iter()
            .map(|update| {
                let repo = repo.clone();
                let barrier = barrier.clone();
                let id = page.id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    repo.update_page(&id, update).unwrap();
                })
            })
            .collect();
            for h in handles {
                h.join().unwrap();
            }

            let stored = repo.get_page(&page.id).unwrap().unwrap();
            assert_eq!(stored.title, title);
            assert_eq!(stored.content, content);
        }
    }

    #[test]
    fn test_sqlite_update_after_delete_does_not_resurrect() {
        let repo = SqliteContentRepository::in_memory().unwrap();
        let page = repo
            .create_page(NewPage {
                title: "Gone".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(repo.delete_page(&page.id).unwrap());
        let update = PageUpdate {
            title: Some("Back".into()),
            ..Default::default()
        };
        assert!(repo.update_page(&page.id, update).unwrap().is_none());
        assert!(repo.get_page(&page.id).unwrap().is_none());
    }
}
