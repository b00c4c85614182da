use std::{fmt, ops::RangeInclusive, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

const UNKNOWN_SOURCE_COLOR: &str = "#95a5a6";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "news")]
    News,
    #[serde(rename = "cve")]
    Cve,
    #[serde(rename = "k8s")]
    Kubernetes,
    #[serde(rename = "sre")]
    Sre,
    #[serde(rename = "devtools")]
    DevTools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiAction {
    Fetch,
    Clear,
    Stats,
    Export,
}

impl ApiAction {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Clear => "clear",
            Self::Stats => "stats",
            Self::Export => "export",
        }
    }
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::News,
        Category::Cve,
        Category::Kubernetes,
        Category::Sre,
        Category::DevTools,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Cve => "cve",
            Self::Kubernetes => "k8s",
            Self::Sre => "sre",
            Self::DevTools => "devtools",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::News => "Cybersecurity news",
            Self::Cve => "CVE",
            Self::Kubernetes => "Kubernetes",
            Self::Sre => "SRE",
            Self::DevTools => "DevTools",
        }
    }

    /// Path of the cached list endpoint, relative to the server root.
    pub fn list_path(self) -> String {
        format!("api/{}/", self.slug())
    }

    /// News predates the per-category layout and keeps its actions at the
    /// API root (`/api/fetch/`, `/api/clear/`, ...).
    pub fn action_path(self, action: ApiAction) -> String {
        match self {
            Self::News => format!("api/{}/", action.segment()),
            _ => format!("api/{}/{}/", self.slug(), action.segment()),
        }
    }

    pub fn default_days(self) -> u32 {
        match self {
            Self::DevTools => 30,
            _ => 7,
        }
    }

    pub fn day_range(self) -> RangeInclusive<u32> {
        match self {
            Self::DevTools => 1..=60,
            _ => 1..=15,
        }
    }

    pub fn default_export_format(self) -> ExportFormat {
        match self {
            Self::News | Self::Kubernetes => ExportFormat::Json,
            Self::Cve | Self::Sre | Self::DevTools => ExportFormat::Html,
        }
    }

    pub fn export_stem(self) -> &'static str {
        match self {
            Self::News => "cybersecurity_news",
            Self::Cve => "cve_zafiyet_raporu",
            Self::Kubernetes => "k8s_entries",
            Self::Sre => "sre_raporu",
            Self::DevTools => "devtools_raporu",
        }
    }

    /// `<title>` of the exported HTML document.
    pub fn document_title(self) -> &'static str {
        match self {
            Self::News => "Siber Güvenlik Raporu",
            Self::Cve => "CVE Zafiyet Raporu",
            Self::Kubernetes => "Kubernetes Raporu",
            Self::Sre => "SRE Raporu",
            Self::DevTools => "DevTools Raporu",
        }
    }

    /// Top-level heading of the exported HTML document.
    pub fn report_heading(self) -> &'static str {
        match self {
            Self::News => "Siber Güvenlik Haberleri Raporu",
            Self::Cve => "CVE Zafiyet Raporu",
            Self::Kubernetes => "Kubernetes Haberleri Raporu",
            Self::Sre => "SRE Haberleri Raporu",
            Self::DevTools => "DevTools Güncellemeleri Raporu",
        }
    }

    /// Noun used in the report header count, e.g. "12 zafiyet".
    pub fn report_unit(self) -> &'static str {
        match self {
            Self::Cve => "zafiyet",
            Self::DevTools => "güncelleme",
            Self::News | Self::Kubernetes | Self::Sre => "haber",
        }
    }

    pub fn sources(self) -> &'static [SourceDescriptor] {
        match self {
            Self::News => NEWS_SOURCES,
            Self::Cve => CVE_SOURCES,
            Self::Kubernetes => K8S_SOURCES,
            Self::Sre => SRE_SOURCES,
            Self::DevTools => DEVTOOLS_SOURCES,
        }
    }

    pub fn find_source(self, value: &str) -> Option<&'static SourceDescriptor> {
        self.sources().iter().find(|source| source.value == value)
    }

    pub fn source_color(self, value: &str) -> &'static str {
        self.find_source(value)
            .map(|source| source.color)
            .unwrap_or(UNKNOWN_SOURCE_COLOR)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}' (expected one of news, cve, k8s, sre, devtools)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" | "cybersecurity" => Ok(Self::News),
            "cve" | "cves" => Ok(Self::Cve),
            "k8s" | "kubernetes" => Ok(Self::Kubernetes),
            "sre" => Ok(Self::Sre),
            "devtools" | "dev-tools" | "dev_tools" => Ok(Self::DevTools),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Html,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

/// One upstream feed the backend aggregates for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    /// Value sent in `FetchRequest::sources` and stored on each entry.
    pub value: &'static str,
    pub color: &'static str,
}

macro_rules! source {
    ($id:literal, $name:literal, $color:literal) => {
        SourceDescriptor {
            id: $id,
            name: $name,
            value: $name,
            color: $color,
        }
    };
}

static NEWS_SOURCES: &[SourceDescriptor] = &[
    source!("source1", "The Hacker News", "#e74c3c"),
    source!("source2", "Bleeping Computer", "#3498db"),
    source!("source3", "SecurityWeek", "#2ecc71"),
    source!("source4", "Dark Reading", "#9b59b6"),
    source!("source5", "Krebs on Security", "#f39c12"),
];

static CVE_SOURCES: &[SourceDescriptor] = &[
    source!("source1", "NVD", "#3498db"),
    source!("source2", "GitHub Advisory", "#e74c3c"),
    source!("source3", "Tenable", "#00b894"),
    source!("source4", "CIRCL", "#f39c12"),
    source!("source5", "NVD Güncel", "#6c5ce7"),
];

static K8S_SOURCES: &[SourceDescriptor] = &[
    source!("k8s_source1", "K8s Blog", "#326ce5"),
    source!("k8s_source2", "GitHub Releases", "#24292e"),
    source!("k8s_source3", "CNCF Blog", "#00aec7"),
];

static SRE_SOURCES: &[SourceDescriptor] = &[
    source!("sre_source1", "SRE Weekly", "#e74c3c"),
    source!("sre_source2", "InfoQ SRE", "#2ecc71"),
    source!("sre_source3", "PagerDuty Eng", "#e67e22"),
    source!("sre_source4", "Google Cloud SRE", "#4285f4"),
    source!("sre_source5", "DZone DevOps", "#9b59b6"),
];

static DEVTOOLS_SOURCES: &[SourceDescriptor] = &[
    source!("dt_source1", "MinIO", "#c72c48"),
    source!("dt_source2", "Seq", "#5b86a7"),
    source!("dt_source3", "Ceph", "#ef5350"),
    source!("dt_source4", "MongoDB", "#4db33d"),
    source!("dt_source5", "PostgreSQL", "#336791"),
    source!("dt_source6", "RabbitMQ", "#ff6600"),
    source!("dt_source7", "Elastic", "#fed10a"),
    source!("dt_source8", "Redis", "#dc382d"),
    source!("dt_source9", "Moodle", "#f98012"),
];

/// Backend severity label, normalized across the Turkish and English spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "kritik" | "critical" => Self::Critical,
            "yüksek" | "yuksek" | "high" => Self::High,
            "orta" | "medium" | "moderate" => Self::Medium,
            "düşük" | "dusuk" | "low" => Self::Low,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "Kritik",
            Self::High => "Yüksek",
            Self::Medium => "Orta",
            Self::Low => "Düşük",
            Self::Unknown => "Bilinmiyor",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Critical => "#dc3545",
            Self::High => "#fd7e14",
            Self::Medium => "#ffc107",
            Self::Low => "#28a745",
            Self::Unknown => "#6c757d",
        }
    }
}

/// Display band of a numeric CVSS score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvssBand {
    Critical,
    High,
    Medium,
    Low,
}

impl CvssBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 9.0 {
            Self::Critical
        } else if score >= 7.0 {
            Self::High
        } else if score >= 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Self::Critical => "cvss-critical",
            Self::High => "cvss-high",
            Self::Medium => "cvss-medium",
            Self::Low => "cvss-low",
        }
    }
}

pub mod timestamp {
    use super::*;

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    /// Accepts RFC 3339 with an offset, or a naive ISO timestamp taken as UTC.
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(value) if value.trim().is_empty() => Ok(None),
            Some(value) => parse(&value).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid timestamp '{value}'"))
            }),
        }
    }
}

fn default_k8s_category() -> String {
    "blog".to_string()
}

fn default_entry_type() -> String {
    "release".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub original_title: String,
    #[serde(default)]
    pub turkish_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub turkish_description: String,
    #[serde(default)]
    pub turkish_summary: String,
    #[serde(default)]
    pub link: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub original_date: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub cve_id: String,
    pub source: String,
    pub original_title: String,
    #[serde(default)]
    pub turkish_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub turkish_description: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub cvss_score: Option<f64>,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub modified_date: Option<NaiveDate>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub cwe_ids: Vec<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub affected_products: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KubernetesEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub original_title: String,
    #[serde(default)]
    pub turkish_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub turkish_description: String,
    #[serde(default)]
    pub link: String,
    pub published_date: NaiveDate,
    #[serde(default = "default_k8s_category")]
    pub category: String,
    #[serde(default)]
    pub version: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SreEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub original_title: String,
    #[serde(default)]
    pub turkish_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub turkish_description: String,
    #[serde(default)]
    pub link: String,
    pub published_date: NaiveDate,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevToolsEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub source: String,
    pub original_title: String,
    #[serde(default)]
    pub turkish_title: String,
    #[serde(default)]
    pub original_description: String,
    #[serde(default)]
    pub turkish_description: String,
    #[serde(default)]
    pub link: String,
    pub published_date: NaiveDate,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_entry_type")]
    pub entry_type: String,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Turkish label for a Kubernetes entry category; unknown values pass through.
pub fn kubernetes_category_label(category: &str) -> &str {
    match category {
        "release" => "Sürüm",
        "security" => "Güvenlik",
        "feature" => "Özellik",
        "ecosystem" => "Ekosistem",
        "blog" => "Blog",
        other => other,
    }
}

pub fn devtools_entry_type_label(entry_type: &str) -> &'static str {
    match entry_type {
        "release" => "Release",
        "blog" => "Blog",
        _ => "Haber",
    }
}

fn non_empty_or<'a>(preferred: &'a str, fallback: &'a str) -> &'a str {
    if preferred.is_empty() {
        fallback
    } else {
        preferred
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Behaviour shared by every entry kind rendered in a panel.
pub trait FeedItem:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const CATEGORY: Category;

    fn source(&self) -> &str;
    fn original_title(&self) -> &str;
    fn turkish_title(&self) -> &str;
    fn original_description(&self) -> &str;
    fn turkish_description(&self) -> &str;
    fn link(&self) -> &str;
    fn published(&self) -> NaiveDate;

    /// Stable identity used to look an entry up from the command line.
    fn key(&self) -> &str {
        self.link()
    }

    fn cvss_score(&self) -> Option<f64> {
        None
    }

    fn severity(&self) -> Option<Severity> {
        None
    }

    /// Category (k8s) or entry type (devtools) used by the kind filter.
    fn kind(&self) -> Option<&str> {
        None
    }

    fn version(&self) -> Option<&str> {
        None
    }

    fn display_title(&self) -> &str {
        non_empty_or(self.turkish_title(), self.original_title())
    }

    fn display_body(&self) -> &str {
        non_empty_or(self.turkish_description(), self.original_description())
    }
}

macro_rules! feed_item_fields {
    ($date:ident) => {
        fn source(&self) -> &str {
            &self.source
        }

        fn original_title(&self) -> &str {
            &self.original_title
        }

        fn turkish_title(&self) -> &str {
            &self.turkish_title
        }

        fn original_description(&self) -> &str {
            &self.original_description
        }

        fn turkish_description(&self) -> &str {
            &self.turkish_description
        }

        fn link(&self) -> &str {
            &self.link
        }

        fn published(&self) -> NaiveDate {
            self.$date
        }
    };
}

impl FeedItem for NewsArticle {
    const CATEGORY: Category = Category::News;

    feed_item_fields!(date);
}

impl FeedItem for CveEntry {
    const CATEGORY: Category = Category::Cve;

    feed_item_fields!(published_date);

    fn key(&self) -> &str {
        &self.cve_id
    }

    fn cvss_score(&self) -> Option<f64> {
        self.cvss_score
    }

    fn severity(&self) -> Option<Severity> {
        Some(Severity::from_label(&self.severity))
    }
}

impl FeedItem for KubernetesEntry {
    const CATEGORY: Category = Category::Kubernetes;

    feed_item_fields!(published_date);

    fn kind(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn version(&self) -> Option<&str> {
        non_empty(&self.version)
    }
}

impl FeedItem for SreEntry {
    const CATEGORY: Category = Category::Sre;

    feed_item_fields!(published_date);
}

impl FeedItem for DevToolsEntry {
    const CATEGORY: Category = Category::DevTools;

    feed_item_fields!(published_date);

    fn kind(&self) -> Option<&str> {
        Some(&self.entry_type)
    }

    fn version(&self) -> Option<&str> {
        non_empty(&self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_actions_live_at_api_root() {
        assert_eq!(Category::News.list_path(), "api/news/");
        assert_eq!(Category::News.action_path(ApiAction::Fetch), "api/fetch/");
        assert_eq!(
            Category::Cve.action_path(ApiAction::Export),
            "api/cve/export/"
        );
        assert_eq!(
            Category::DevTools.action_path(ApiAction::Clear),
            "api/devtools/clear/"
        );
    }

    #[test]
    fn parses_category_aliases() {
        assert_eq!("kubernetes".parse::<Category>(), Ok(Category::Kubernetes));
        assert_eq!("DevTools".parse::<Category>(), Ok(Category::DevTools));
        assert!("weather".parse::<Category>().is_err());
    }

    #[test]
    fn severity_accepts_both_label_languages() {
        assert_eq!(Severity::from_label("Kritik"), Severity::Critical);
        assert_eq!(Severity::from_label("HIGH"), Severity::High);
        assert_eq!(Severity::from_label("Düşük"), Severity::Low);
        assert_eq!(Severity::from_label(""), Severity::Unknown);
        assert_eq!(Severity::from_label("MEDIUM").color(), "#ffc107");
    }

    #[test]
    fn cvss_band_boundaries() {
        assert_eq!(CvssBand::from_score(9.0), CvssBand::Critical);
        assert_eq!(CvssBand::from_score(8.95), CvssBand::High);
        assert_eq!(CvssBand::from_score(4.0), CvssBand::Medium);
        assert_eq!(CvssBand::from_score(0.0), CvssBand::Low);
    }

    #[test]
    fn unknown_source_gets_fallback_color() {
        assert_eq!(Category::Cve.source_color("NVD"), "#3498db");
        assert_eq!(Category::Cve.source_color("Elsewhere"), UNKNOWN_SOURCE_COLOR);
    }

    #[test]
    fn lenient_timestamp_parsing() {
        let with_offset = timestamp::parse("2025-03-01T12:00:00+03:00").expect("offset");
        assert_eq!(with_offset.to_rfc3339(), "2025-03-01T09:00:00+00:00");

        let naive = timestamp::parse("2025-03-01T12:00:00.123456").expect("naive");
        assert_eq!(naive.format("%H:%M").to_string(), "12:00");

        assert!(timestamp::parse("yesterday").is_none());
    }

    #[test]
    fn display_title_prefers_translation() {
        let json = serde_json::json!({
            "source": "SRE Weekly",
            "original_title": "Original",
            "turkish_title": "",
            "original_description": "body",
            "link": "https://example.test/a",
            "published_date": "2025-02-01",
            "created_at": "2025-02-01T08:00:00"
        });
        let mut entry: SreEntry = serde_json::from_value(json).expect("decode");
        assert_eq!(entry.display_title(), "Original");
        entry.turkish_title = "Çeviri".into();
        assert_eq!(entry.display_title(), "Çeviri");
        assert!(entry.created_at.is_some());
    }

    #[test]
    fn kubernetes_entry_defaults_to_blog_category() {
        let json = serde_json::json!({
            "source": "K8s Blog",
            "original_title": "Post",
            "link": "https://kubernetes.io/blog/post",
            "published_date": "2025-02-01"
        });
        let entry: KubernetesEntry = serde_json::from_value(json).expect("decode");
        assert_eq!(entry.kind(), Some("blog"));
        assert_eq!(entry.version(), None);
        assert_eq!(kubernetes_category_label(&entry.category), "Blog");
    }
}
