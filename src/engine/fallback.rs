//! 降级回答
//!
//! 仅在补全服务本身失败时调用（操作失败由分发器隔离，不走这里）。策略依次为：
//! 1. 以最近一条用户输入为查询，在进程内关键词索引上检索页面 / 文档 / 集群；
//! 2. 无命中（或索引不可用）时返回固定的「服务不可用」提示。
//! 永远返回文本，不返回错误。

use std::sync::Arc;

use crate::content::{ContentIndex, ContentRepository, EntryKind, SearchHit};

pub struct FallbackResponder {
    repo: Arc<dyn ContentRepository>,
    max_hits: usize,
    unavailable_message: String,
}

impl FallbackResponder {
    pub fn new(repo: Arc<dyn ContentRepository>, max_hits: usize, unavailable_message: impl Into<String>) -> Self {
        Self {
            repo,
            max_hits: max_hits.max(1),
            unavailable_message: unavailable_message.into(),
        }
    }

    pub fn respond(&self, query: &str) -> String {
        let hits = match ContentIndex::from_repository(self.repo.as_ref()) {
            Ok(index) => index.search(query, &[], self.max_hits),
            Err(e) => {
                tracing::warn!(error = %e, "fallback index unavailable");
                Vec::new()
            }
        };
        if hits.is_empty() {
            return self.unavailable_message.clone();
        }
        tracing::info!(hits = hits.len(), "fallback answered from local index");
        render_hits(&hits)
    }
}

fn render_hits(hits: &[SearchHit]) -> String {
    let mut out = String::from(
        "The assistant service is unavailable right now, so I can't make changes. \
         A local keyword search found these possibly relevant items:",
    );
    for hit in hits {
        let kind = match hit.kind {
            EntryKind::Page => "Page",
            EntryKind::Document => "Document",
            EntryKind::Cluster => "Cluster",
        };
        out.push_str(&format!("\n- {kind} \"{}\" ({})", hit.title, hit.id));
        if !hit.excerpt.is_empty() {
            out.push_str(&format!(": {}", hit.excerpt));
        }
    }
    out
}
