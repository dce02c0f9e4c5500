//! SEO 操作：getSeoScore / updateSeoMetadata
//!
//! 评分为确定性规则（满分 100，五项各 20 分）：meta 标题长度、meta 描述长度、关键词、正文长度、
//! 主关键词出现在标题中。

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::content::{ContentRepository, Page, PageUpdate};
use crate::operations::args::{repo_err, required_str, str_arg, string_list_arg, to_payload};
use crate::operations::pages::{page_not_found, PAGE_TARGET};
use crate::operations::{EntityTarget, Operation, ParamSpec, ParamType};

const META_TITLE_RANGE: (usize, usize) = (30, 60);
const META_DESCRIPTION_RANGE: (usize, usize) = (70, 160);
const MIN_CONTENT_WORDS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoReport {
    pub page_id: String,
    pub score: u8,
    pub issues: Vec<String>,
}

fn in_range(len: usize, (lo, hi): (usize, usize)) -> bool {
    (lo..=hi).contains(&len)
}

pub fn score_page(page: &Page) -> SeoReport {
    let mut score = 0u8;
    let mut issues = Vec::new();

    let meta_title = page.seo.meta_title.as_deref().unwrap_or(&page.title);
    if in_range(meta_title.chars().count(), META_TITLE_RANGE) {
        score += 20;
    } else {
        issues.push(format!(
            "Meta title should be {}-{} characters (currently {})",
            META_TITLE_RANGE.0,
            META_TITLE_RANGE.1,
            meta_title.chars().count()
        ));
    }

    match page.seo.meta_description.as_deref() {
        Some(d) if in_range(d.chars().count(), META_DESCRIPTION_RANGE) => score += 20,
        Some(d) => issues.push(format!(
            "Meta description should be {}-{} characters (currently {})",
            META_DESCRIPTION_RANGE.0,
            META_DESCRIPTION_RANGE.1,
            d.chars().count()
        )),
        None => issues.push("Missing meta description".to_string()),
    }

    if page.seo.keywords.is_empty() {
        issues.push("No target keywords".to_string());
    } else {
        score += 20;
    }

    let words = page.content.split_whitespace().count();
    if words >= MIN_CONTENT_WORDS {
        score += 20;
    } else {
        issues.push(format!(
            "Content is thin: {words} words (aim for {MIN_CONTENT_WORDS}+)"
        ));
    }

    match page.seo.keywords.first() {
        Some(primary) if meta_title.to_lowercase().contains(&primary.to_lowercase()) => score += 20,
        Some(primary) => issues.push(format!("Primary keyword \"{primary}\" is not in the title")),
        None => {}
    }

    SeoReport {
        page_id: page.id.clone(),
        score,
        issues,
    }
}

pub struct GetSeoScore {
    repo: Arc<dyn ContentRepository>,
}

impl GetSeoScore {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for GetSeoScore {
    fn name(&self) -> &str {
        "getSeoScore"
    }

    fn description(&self) -> &str {
        "Compute an SEO quality score (0-100) for a page and list what to improve."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("pageId", ParamType::String, "page id")]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "pageId")?;
        let page = self
            .repo
            .get_page(id)
            .map_err(repo_err)?
            .ok_or_else(|| page_not_found(id))?;
        to_payload(&score_page(&page))
    }
}

pub struct UpdateSeoMetadata {
    repo: Arc<dyn ContentRepository>,
}

impl UpdateSeoMetadata {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for UpdateSeoMetadata {
    fn name(&self) -> &str {
        "updateSeoMetadata"
    }

    fn description(&self) -> &str {
        "Set the meta title, meta description and/or target keywords of a page."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("pageId", ParamType::String, "page id"),
            ParamSpec::optional("metaTitle", ParamType::String, "meta title"),
            ParamSpec::optional("metaDescription", ParamType::String, "meta description"),
            ParamSpec::optional("keywords", ParamType::Array, "target keywords, primary first"),
        ]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(PAGE_TARGET)
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "pageId")?;
        let page = self
            .repo
            .get_page(id)
            .map_err(repo_err)?
            .ok_or_else(|| page_not_found(id))?;

        let mut seo = page.seo;
        if let Some(t) = str_arg(&args, "metaTitle") {
            seo.meta_title = Some(t.to_string());
        }
        if let Some(d) = str_arg(&args, "metaDescription") {
            seo.meta_description = Some(d.to_string());
        }
        if let Some(k) = string_list_arg(&args, "keywords") {
            seo.keywords = k;
        }
        let update = PageUpdate {
            seo: Some(seo),
            ..Default::default()
        };
        let page = self
            .repo
            .update_page(id, update)
            .map_err(repo_err)?
            .ok_or_else(|| page_not_found(id))?;
        to_payload(&score_page(&page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InMemoryContentRepository, NewPage, PageStatus, SeoMetadata};
    use chrono::Utc;
    use serde_json::json;

    fn page(title: &str, content: &str, seo: SeoMetadata) -> Page {
        Page {
            id: "p1".into(),
            title: title.into(),
            slug: "p".into(),
            content: content.into(),
            status: PageStatus::Draft,
            cluster_id: None,
            seo,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bare_page_scores_low_with_issues() {
        let report = score_page(&page("Hi", "short", SeoMetadata::default()));
        assert_eq!(report.score, 0);
        assert!(report.issues.iter().any(|i| i.contains("Missing meta description")));
        assert!(report.issues.iter().any(|i| i.contains("No target keywords")));
    }

    #[test]
    fn test_complete_page_scores_full() {
        let seo = SeoMetadata {
            meta_title: Some("Handmade ceramic mugs fired in small batches".into()),
            meta_description: Some(
                "Shop handmade ceramic mugs, each one thrown by hand and glazed in our studio by the sea."
                    .into(),
            ),
            keywords: vec!["ceramic mugs".into()],
        };
        let content = "word ".repeat(MIN_CONTENT_WORDS);
        let report = score_page(&page("Mugs", &content, seo));
        assert_eq!(report.score, 100, "issues: {:?}", report.issues);
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_update_seo_metadata_returns_new_score() {
        let repo: Arc<dyn ContentRepository> = Arc::new(InMemoryContentRepository::new());
        let p = repo
            .create_page(NewPage {
                title: "Mugs".into(),
                ..Default::default()
            })
            .unwrap();
        let before = GetSeoScore::new(repo.clone())
            .execute(json!({"pageId": p.id}))
            .await
            .unwrap();
        let after = UpdateSeoMetadata::new(repo.clone())
            .execute(json!({"pageId": p.id, "keywords": ["mugs"]}))
            .await
            .unwrap();
        assert!(after["score"].as_u64() > before["score"].as_u64());
        assert_eq!(
            repo.get_page(&p.id).unwrap().unwrap().seo.keywords,
            vec!["mugs".to_string()]
        );
    }
}
