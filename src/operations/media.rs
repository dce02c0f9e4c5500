//! 媒体操作：listMedia / updateMediaAltText

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::content::ContentRepository;
use crate::operations::args::{bool_arg, repo_err, required_str, to_payload};
use crate::operations::{EntityTarget, Operation, ParamSpec, ParamType};

pub struct ListMedia {
    repo: Arc<dyn ContentRepository>,
}

impl ListMedia {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for ListMedia {
    fn name(&self) -> &str {
        "listMedia"
    }

    fn description(&self) -> &str {
        "List media assets. Set missingAltOnly to find images without alt text."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::optional(
            "missingAltOnly",
            ParamType::Boolean,
            "only assets without alt text",
        )]
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let missing_only = bool_arg(&args, "missingAltOnly").unwrap_or(false);
        let media: Vec<_> = self
            .repo
            .list_media()
            .map_err(repo_err)?
            .into_iter()
            .filter(|m| !missing_only || m.alt_text.as_deref().map_or(true, str::is_empty))
            .collect();
        Ok(json!({ "count": media.len(), "media": to_payload(&media)? }))
    }
}

pub struct UpdateMediaAltText {
    repo: Arc<dyn ContentRepository>,
}

impl UpdateMediaAltText {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Operation for UpdateMediaAltText {
    fn name(&self) -> &str {
        "updateMediaAltText"
    }

    fn description(&self) -> &str {
        "Set the alt text of a media asset."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("mediaId", ParamType::String, "media asset id"),
            ParamSpec::required("altText", ParamType::String, "descriptive alt text"),
        ]
    }

    fn entity(&self) -> Option<EntityTarget> {
        Some(EntityTarget {
            kind: "media",
            param: "mediaId",
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let id = required_str(&args, "mediaId")?;
        let alt = required_str(&args, "altText")?;
        match self.repo.update_media_alt(id, alt).map_err(repo_err)? {
            Some(asset) => to_payload(&asset),
            None => Err(format!("Media asset not found: {id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::InMemoryContentRepository;

    #[tokio::test]
    async fn test_missing_alt_filter_and_update() {
        let repo: Arc<dyn ContentRepository> = Arc::new(InMemoryContentRepository::new());
        let a = repo.add_media("a.jpg", "/a.jpg", None).unwrap();
        repo.add_media("b.jpg", "/b.jpg", Some("B")).unwrap();

        let missing = ListMedia::new(repo.clone())
            .execute(json!({"missingAltOnly": true}))
            .await
            .unwrap();
        assert_eq!(missing["count"], 1);

        UpdateMediaAltText::new(repo.clone())
            .execute(json!({"mediaId": a.id, "altText": "Blue mug"}))
            .await
            .unwrap();
        let missing = ListMedia::new(repo)
            .execute(json!({"missingAltOnly": true}))
            .await
            .unwrap();
        assert_eq!(missing["count"], 0);
    }
}
