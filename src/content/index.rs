//! 关键词索引
//!
//! 对页面 / 文档 / 集群做简单的词重叠检索（无向量）。中英文混合：含 CJK 时用 jieba 搜索模式分词，
//! 否则按非字母数字字符切分。供 searchContent / searchDocuments 操作与降级回答共用。

use std::collections::HashSet;
use std::sync::OnceLock;

use jieba_rs::Jieba;
use serde::Serialize;

use crate::content::repository::{ContentRepository, RepoResult};
use crate::content::model::PageFilter;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}' |
        '\u{3040}'..='\u{30FF}'
    )
}

/// 功能词不参与匹配，否则几乎任何英文查询都会命中
const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does", "for",
    "from", "has", "have", "how", "i", "in", "into", "is", "it", "its", "me", "my", "no", "not",
    "of", "on", "or", "our", "please", "so", "that", "the", "their", "them", "there", "these",
    "this", "to", "us", "was", "we", "what", "when", "where", "which", "who", "why", "will",
    "with", "you", "your", "的", "了", "是", "在", "和", "与", "或", "我", "你", "请", "吗",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// 分词为小写词集合；英文丢弃单字符词，两种模式都丢弃功能词
pub fn tokenize(text: &str) -> HashSet<String> {
    if text.chars().any(is_cjk) {
        jieba()
            .cut_for_search(text, true)
            .into_iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| w.chars().count() > 1 || w.chars().next().is_some_and(is_cjk))
            .filter(|w| !is_stop_word(w))
            .collect()
    } else {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 1)
            .map(|w| w.to_lowercase())
            .filter(|w| !is_stop_word(w))
            .collect()
    }
}

/// 截取前 max 个字符，超出时追加省略号
pub fn excerpt(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push_str("...");
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Page,
    Document,
    Cluster,
}

/// 命中结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub kind: EntryKind,
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub score: usize,
}

struct Entry {
    kind: EntryKind,
    id: String,
    title: String,
    excerpt: String,
    title_tokens: HashSet<String>,
    body_tokens: HashSet<String>,
}

const EXCERPT_CHARS: usize = 160;

#[derive(Default)]
pub struct ContentIndex {
    entries: Vec<Entry>,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从内容库全量构建（页面、文档、集群）
    pub fn from_repository(repo: &dyn ContentRepository) -> RepoResult<Self> {
        let mut index = Self::new();
        for page in repo.list_pages(&PageFilter::default())? {
            index.add(EntryKind::Page, &page.id, &page.title, &page.content);
        }
        for doc in repo.list_documents()? {
            index.add(EntryKind::Document, &doc.id, &doc.title, &doc.content);
        }
        for cluster in repo.list_clusters()? {
            index.add(EntryKind::Cluster, &cluster.id, &cluster.name, &cluster.description);
        }
        Ok(index)
    }

    pub fn add(&mut self, kind: EntryKind, id: &str, title: &str, body: &str) {
        self.entries.push(Entry {
            kind,
            id: id.to_string(),
            title: title.to_string(),
            excerpt: excerpt(body.trim(), EXCERPT_CHARS),
            title_tokens: tokenize(title),
            body_tokens: tokenize(body),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 标题命中计 2 分、正文命中计 1 分；只返回得分 > 0 的前 k 条，kinds 为空表示不限类型
    pub fn search(&self, query: &str, kinds: &[EntryKind], k: usize) -> Vec<SearchHit> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter(|e| kinds.is_empty() || kinds.contains(&e.kind))
            .filter_map(|e| {
                let score = query_tokens
                    .iter()
                    .map(|t| {
                        2 * usize::from(e.title_tokens.contains(t))
                            + usize::from(e.body_tokens.contains(t))
                    })
                    .sum::<usize>();
                (score > 0).then(|| SearchHit {
                    kind: e.kind,
                    id: e.id.clone(),
                    title: e.title.clone(),
                    excerpt: e.excerpt.clone(),
                    score,
                })
            })
            .collect();
        // 稳定排序：同分时保持插入顺序
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_english_drops_punctuation_and_short_words() {
        let tokens = tokenize("SEO: a Guide, for pages!");
        assert!(tokens.contains("seo"));
        assert!(tokens.contains("guide"));
        assert!(tokens.contains("pages"));
        assert!(!tokens.contains("a"));
        assert!(!tokens.contains("for"));
    }

    #[test]
    fn test_function_words_never_match() {
        let mut index = ContentIndex::new();
        index.add(EntryKind::Page, "p1", "How to care for mugs", "Wash them in the sink.");
        assert!(index.search("send the invoice to accounting", &[], 5).is_empty());
        assert!(tokenize("what is the").is_empty());
        assert_eq!(index.search("care of the mugs", &[], 5).len(), 1);
    }

    #[test]
    fn test_tokenize_cjk() {
        let tokens = tokenize("搜索引擎优化指南");
        assert!(!tokens.is_empty());
        assert!(tokens.iter().any(|t| t.contains("搜索")));
    }

    #[test]
    fn test_search_prefers_title_matches() {
        let mut index = ContentIndex::new();
        index.add(EntryKind::Page, "p1", "Pricing plans", "Our offer");
        index.add(EntryKind::Document, "d1", "Notes", "pricing discussion");
        let hits = index.search("pricing", &[], 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "p1");
        assert_eq!(hits[0].score, 2);
    }

    #[test]
    fn test_search_filters_kinds_and_zero_scores() {
        let mut index = ContentIndex::new();
        index.add(EntryKind::Page, "p1", "Pricing", "");
        index.add(EntryKind::Document, "d1", "Pricing memo", "");
        let hits = index.search("pricing", &[EntryKind::Document], 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "d1");
        assert!(index.search("unrelated", &[], 5).is_empty());
        assert!(index.search("", &[], 5).is_empty());
    }

    #[test]
    fn test_excerpt_truncates() {
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("abc", 3), "abc");
    }
}
