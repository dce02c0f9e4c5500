//! 知识库操作：listDocuments / searchDocuments

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::content::index::excerpt;
use crate::content::{ContentIndex, ContentRepository, EntryKind};
use crate::operations::args::{repo_err, required_str, usize_arg};
use crate::operations::{Operation, ParamSpec, ParamType};

pub struct ListDocuments {
    repo: Arc<dyn ContentRepository>,
}

impl ListDocuments {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for ListDocuments {
    fn name(&self) -> &str {
        "listDocuments"
    }

    fn description(&self) -> &str {
        "List knowledge-base documents (brand guides, briefs, research)."
    }

    async fn execute(&self, _args: Value) -> Result<Value, String> {
        let docs = self.repo.list_documents().map_err(repo_err)?;
        let rows: Vec<Value> = docs
            .iter()
            .map(|d| {
                json!({
                    "id": d.id,
                    "title": d.title,
                    "source": d.source,
                    "preview": excerpt(&d.content, 120),
                })
            })
            .collect();
        Ok(json!({ "count": rows.len(), "documents": rows }))
    }
}

pub struct SearchDocuments {
    repo: Arc<dyn ContentRepository>,
}

impl SearchDocuments {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for SearchDocuments {
    fn name(&self) -> &str {
        "searchDocuments"
    }

    fn description(&self) -> &str {
        "Keyword search over the knowledge base. Use it to ground answers in brand documents."
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
            &[EntryKind::Document],
            usize_arg(&args, "limit").unwrap_or(5),
        );
        Ok(json!({ "query": query, "hits": hits }))
    }
}
