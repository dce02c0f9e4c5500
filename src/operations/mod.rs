//! 操作层：注册表、分发器、请求格式与内容操作目录
//!
//! 新能力只需实现 Operation 并在 register_content_operations（或调用方自己的注册函数）中注册，
//! 分发器与编排循环无需修改。

pub mod args;
pub mod clusters;
pub mod dispatcher;
pub mod knowledge;
pub mod media;
pub mod pages;
pub mod registry;
pub mod schema;
pub mod seo;

use std::sync::Arc;

use crate::content::ContentRepository;
use crate::core::AgentError;

pub use clusters::{AssignPageToCluster, CreateCluster, ListClusters};
pub use dispatcher::Dispatcher;
pub use knowledge::{ListDocuments, SearchDocuments};
pub use media::{ListMedia, UpdateMediaAltText};
pub use pages::{CreatePage, DeletePage, GetPage, ListPages, SearchContent, UpdatePage};
pub use registry::{
    EntityTarget, Operation, OperationDescriptor, OperationRegistry, ParamSpec, ParamType,
};
pub use schema::{request_format_schema_json, OperationBatch, OperationRequest};
pub use seo::{score_page, GetSeoScore, SeoReport, UpdateSeoMetadata};

/// 注册内容管理的全部内置操作
pub fn register_content_operations(
    registry: &mut OperationRegistry,
    repo: Arc<dyn ContentRepository>,
) -> Result<(), AgentError> {
    registry.register(ListPages::new(repo.clone()))?;
    registry.register(GetPage::new(repo.clone()))?;
    registry.register(CreatePage::new(repo.clone()))?;
    registry.register(UpdatePage::new(repo.clone()))?;
    registry.register(DeletePage::new(repo.clone()))?;
    registry.register(SearchContent::new(repo.clone()))?;
    registry.register(ListClusters::new(repo.clone()))?;
    registry.register(CreateCluster::new(repo.clone()))?;
    registry.register(AssignPageToCluster::new(repo.clone()))?;
    registry.register(ListDocuments::new(repo.clone()))?;
    registry.register(SearchDocuments::new(repo.clone()))?;
    registry.register(GetSeoScore::new(repo.clone()))?;
    registry.register(UpdateSeoMetadata::new(repo.clone()))?;
    registry.register(ListMedia::new(repo.clone()))?;
    registry.register(UpdateMediaAltText::new(repo))?;
    Ok(())
}
