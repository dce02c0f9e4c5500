//! 内容实体：页面、集群（主题簇）、知识文档、媒体资源

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// 页面的 SEO 元数据
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PageStatus,
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub seo: SeoMetadata,
    pub updated_at: DateTime<Utc>,
}

/// 创建页面的输入
#[derive(Clone, Debug, Default)]
pub struct NewPage {
    pub title: String,
    pub slug: Option<String>,
    pub content: String,
    pub status: PageStatus,
    pub cluster_id: Option<String>,
}

/// 页面的部分更新；None 表示不修改
#[derive(Clone, Debug, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub status: Option<PageStatus>,
    pub cluster_id: Option<String>,
    pub seo: Option<SeoMetadata>,
}

impl PageUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.content.is_none()
            && self.status.is_none()
            && self.cluster_id.is_none()
            && self.seo.is_none()
    }

    pub(crate) fn apply(self, page: &mut Page) {
        if let Some(title) = self.title {
            page.title = title;
        }
        if let Some(slug) = self.slug {
            page.slug = slug;
        }
        if let Some(content) = self.content {
            page.content = content;
        }
        if let Some(status) = self.status {
            page.status = status;
        }
        if let Some(cluster_id) = self.cluster_id {
            page.cluster_id = Some(cluster_id);
        }
        if let Some(seo) = self.seo {
            page.seo = seo;
        }
        page.updated_at = Utc::now();
    }
}

/// 列表过滤条件
#[derive(Clone, Debug, Default)]
pub struct PageFilter {
    pub status: Option<PageStatus>,
    pub cluster_id: Option<String>,
    pub limit: Option<usize>,
}

impl PageFilter {
    pub(crate) fn matches(&self, page: &Page) -> bool {
        self.status.map_or(true, |s| page.status == s)
            && self
                .cluster_id
                .as_deref()
                .map_or(true, |c| page.cluster_id.as_deref() == Some(c))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub description: String,
    pub pillar_page_id: Option<String>,
}

/// 知识库文档（可被检索，不直接发布）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub source: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub alt_text: Option<String>,
}

/// 由标题生成 slug：小写、非字母数字替换为连字符
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}
