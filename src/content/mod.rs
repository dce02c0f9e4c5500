//! 内容层：实体模型、内容库接口（内存 / SQLite）、关键词索引与演示数据

pub mod index;
pub mod model;
pub mod repository;
pub mod seed;
pub mod sqlite;

pub use index::{ContentIndex, EntryKind, SearchHit};
pub use model::{
    Cluster, Document, MediaAsset, NewPage, Page, PageFilter, PageStatus, PageUpdate, SeoMetadata,
};
pub use repository::{
    ContentRepository, InMemoryContentRepository, PageSummary, RepoResult, RepositoryError,
    StoreSnapshot,
};
pub use seed::seed_demo_content;
pub use sqlite::SqliteContentRepository;
