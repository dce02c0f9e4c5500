//! 演示数据：空库时写入少量页面、集群、文档与媒体，便于本地体验

use crate::content::{ContentRepository, NewPage, PageFilter, PageStatus, PageUpdate, RepoResult, SeoMetadata};

/// 仅在内容库完全为空时写入；返回是否写入
pub fn seed_demo_content(repo: &dyn ContentRepository) -> RepoResult<bool> {
    if !repo.list_pages(&PageFilter::default())?.is_empty() || !repo.list_clusters()?.is_empty() {
        return Ok(false);
    }

    let guides = repo.create_cluster("Guides", "How-to articles for new customers")?;
    let home = repo.create_page(NewPage {
        title: "Home".into(),
        content: "Welcome to our store. We sell handmade ceramic mugs and bowls.".into(),
        status: PageStatus::Published,
        ..Default::default()
    })?;
    repo.update_page(
        &home.id,
        PageUpdate {
            seo: Some(SeoMetadata {
                meta_title: Some("Handmade ceramic mugs and bowls".into()),
                meta_description: Some("Shop handmade ceramics fired in small batches.".into()),
                keywords: vec!["ceramic mugs".into(), "handmade".into()],
            }),
            ..Default::default()
        },
    )?;
    repo.create_page(NewPage {
        title: "How to care for ceramic mugs".into(),
        content: "Hand wash your mugs with warm water. Avoid sudden temperature changes.".into(),
        status: PageStatus::Draft,
        cluster_id: Some(guides.id.clone()),
        ..Default::default()
    })?;
    repo.add_document(
        "Brand voice",
        "Write warmly and plainly. Prefer short sentences. Never promise dishwasher safety.",
        Some("brand-handbook.pdf"),
    )?;
    repo.add_media("mug-blue.jpg", "/media/mug-blue.jpg", None)?;
    Ok(true)
}
