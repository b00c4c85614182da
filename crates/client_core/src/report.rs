//! Client-side rendering of exported entries into downloadable reports.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use minijinja::{context, Environment};
use serde::Serialize;
use shared::domain::{Category, CvssBand, ExportFormat, FeedItem};
use tracing::info;

use crate::{
    changelog::{detail_body, DetailBody, Span, EMPTY_BODY_TEXT},
    error::{ClientError, Result},
};

const TEMPLATE_NAME: &str = "report.html";

const REPORT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="tr">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{ document_title }} - {{ generated }}</title>
<style>
  body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #0a0a0f; color: #e0e0e0; max-width: 960px; margin: 0 auto; padding: 2rem; line-height: 1.6; }
  h1 { color: #ffffff; border-bottom: 2px solid #5b86a7; padding-bottom: 0.5rem; }
  .meta { color: #8a8a9a; margin-bottom: 2rem; }
  .article { background: #14141f; border: 1px solid #23233a; border-radius: 8px; padding: 1.25rem; margin-bottom: 1.25rem; }
  .article h2 { font-size: 1.15rem; margin: 0.5rem 0; color: #ffffff; }
  .badges { display: flex; flex-wrap: wrap; gap: 0.5rem; align-items: center; }
  .source, .version, .severity, .cveid { display: inline-block; padding: 0.15rem 0.6rem; border-radius: 4px; font-size: 0.8rem; font-weight: 600; color: #ffffff; }
  .source { background: #5b86a7; }
  .version { background: #2ecc71; }
  .cveid { background: #23233a; font-family: monospace; }
  .cvss { font-size: 0.85rem; color: #c0c0d0; }
  .cvss-critical { color: #dc3545; font-weight: 700; }
  .cvss-high { color: #fd7e14; font-weight: 700; }
  .cvss-medium { color: #ffc107; }
  .cvss-low { color: #28a745; }
  .date { color: #8a8a9a; font-size: 0.85rem; }
  .content { margin: 0.75rem 0; color: #cfcfdf; }
  .section { border-left: 4px solid #6c757d; padding-left: 0.75rem; margin: 0.75rem 0; }
  .section h3 { margin: 0 0 0.5rem 0; font-size: 1rem; }
  .section ul { margin: 0; padding-left: 1.25rem; }
  .pr { font-size: 0.8rem; color: #8a8a9a; }
  code { background: #23233a; padding: 0.05rem 0.3rem; border-radius: 3px; }
  a { color: #5b86a7; }
  @media print {
    body { background: #ffffff; color: #000000; }
    .article { border-color: #cccccc; background: #ffffff; page-break-inside: avoid; }
    .article h2, h1 { color: #000000; }
    .content { color: #000000; }
  }
</style>
</head>
<body>
<h1>{{ heading }}</h1>
<div class="meta">{{ generated }} tarihinde oluşturuldu &mdash; {{ count }} {{ unit }}</div>
{% for card in cards %}
<div class="article">
  <div class="badges">
    <span class="source" style="background: {{ card.source_color }}">{{ card.source }}</span>
    {% if card.cve_id %}<span class="cveid">{{ card.cve_id }}</span>{% endif %}
    {% if card.severity %}<span class="severity" style="background: {{ card.severity.color }}">{{ card.severity.label }}</span>{% endif %}
    {% if card.cvss %}<span class="cvss {{ card.cvss_class }}">CVSS: {{ card.cvss }}</span>{% endif %}
    {% if card.version %}<span class="version">{{ card.version }}</span>{% endif %}
    <span class="date">{{ card.date }}</span>
  </div>
  <h2>{{ card.title }}</h2>
  {% if card.sections %}
  {% for section in card.sections %}
  <div class="section" style="border-left-color: {{ section.accent }}">
    <h3 style="color: {{ section.accent }}">{{ section.title }}</h3>
    <ul>
    {% for item in section.items %}
      <li>{% for span in item.spans %}{% if span.code %}<code>{{ span.text }}</code>{% else %}{{ span.text }}{% endif %}{% endfor %}
      {% if item.pr %}<span class="pr"><a href="{{ item.pr.url }}">#{{ item.pr.number }}</a> @{{ item.pr.author }}{% if item.pr.sigs %} &middot; {{ item.pr.sigs | join(", ") }}{% endif %}</span>{% endif %}</li>
    {% endfor %}
    </ul>
  </div>
  {% endfor %}
  {% else %}
  <div class="content">{% for line in card.lines %}{{ line }}{% if not loop.last %}<br>{% endif %}{% endfor %}</div>
  {% endif %}
  {% if card.link %}<a href="{{ card.link }}" target="_blank" rel="noopener">Kaynağa Git &rarr;</a>{% endif %}
</div>
{% endfor %}
</body>
</html>
"##;

/// A rendered report ready to be written or printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub file_name: String,
    pub format: ExportFormat,
    pub contents: String,
}

impl Report {
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ClientError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, self.contents.as_bytes())
            .await
            .map_err(|source| ClientError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), bytes = self.contents.len(), "report written");
        Ok(path)
    }
}

pub fn file_name(category: Category, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        category.export_stem(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

pub fn render<T: FeedItem>(items: &[T], format: ExportFormat, today: NaiveDate) -> Result<Report> {
    let contents = match format {
        ExportFormat::Html => render_html(items, today)?,
        ExportFormat::Json => render_json(items)?,
    };
    Ok(Report {
        file_name: file_name(T::CATEGORY, format, today),
        format,
        contents,
    })
}

pub fn render_json<T: FeedItem>(items: &[T]) -> Result<String> {
    serde_json::to_string_pretty(items).map_err(ClientError::Encode)
}

#[derive(Serialize)]
struct SeverityView {
    label: &'static str,
    color: &'static str,
}

#[derive(Serialize)]
struct SpanView<'a> {
    code: bool,
    text: &'a str,
}

#[derive(Serialize)]
struct PullRequestView {
    number: u64,
    url: String,
    author: String,
    sigs: Vec<String>,
}

#[derive(Serialize)]
struct ItemView<'a> {
    spans: Vec<SpanView<'a>>,
    pr: Option<PullRequestView>,
}

#[derive(Serialize)]
struct SectionView<'a> {
    title: &'a str,
    accent: &'static str,
    items: Vec<ItemView<'a>>,
}

#[derive(Serialize)]
struct Card<'a> {
    source: &'a str,
    source_color: &'static str,
    date: String,
    title: &'a str,
    link: &'a str,
    cve_id: Option<&'a str>,
    severity: Option<SeverityView>,
    cvss: Option<String>,
    cvss_class: Option<&'static str>,
    version: Option<&'a str>,
    lines: Vec<&'a str>,
    sections: Vec<SectionView<'a>>,
}

fn card_sections(changelog: &crate::changelog::Changelog) -> Vec<SectionView<'_>> {
    changelog
        .sections
        .iter()
        .map(|section| SectionView {
            title: &section.title,
            accent: section.accent(),
            items: section
                .items
                .iter()
                .map(|item| ItemView {
                    spans: item
                        .spans()
                        .into_iter()
                        .map(|span| match span {
                            Span::Text(text) => SpanView { code: false, text },
                            Span::Code(text) => SpanView { code: true, text },
                        })
                        .collect(),
                    pr: item.pull_request.as_ref().map(|pr| PullRequestView {
                        number: pr.number,
                        url: pr.url(),
                        author: pr.author.clone(),
                        sigs: pr.sigs.clone(),
                    }),
                })
                .collect(),
        })
        .collect()
}

pub fn render_html<T: FeedItem>(items: &[T], today: NaiveDate) -> Result<String> {
    let category = T::CATEGORY;
    let bodies: Vec<DetailBody> = items.iter().map(detail_body).collect();

    let cards: Vec<Card<'_>> = items
        .iter()
        .zip(&bodies)
        .map(|(item, body)| {
            let (lines, sections) = match body {
                DetailBody::Changelog(changelog) => (Vec::new(), card_sections(changelog)),
                DetailBody::Paragraphs(_) => (item.display_body().trim().lines().collect(), Vec::new()),
                DetailBody::Empty => (vec![EMPTY_BODY_TEXT], Vec::new()),
            };
            Card {
                source: item.source(),
                source_color: category.source_color(item.source()),
                date: item.published().format("%Y-%m-%d").to_string(),
                title: item.display_title(),
                link: item.link(),
                cve_id: (category == Category::Cve).then(|| item.key()),
                severity: item.severity().map(|severity| SeverityView {
                    label: severity.label(),
                    color: severity.color(),
                }),
                cvss: item.cvss_score().map(|score| format!("{score:.1}")),
                cvss_class: item
                    .cvss_score()
                    .map(|score| CvssBand::from_score(score).class_name()),
                version: item.version(),
                lines,
                sections,
            }
        })
        .collect();

    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, REPORT_TEMPLATE)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    let html = template.render(context! {
        document_title => category.document_title(),
        heading => category.report_heading(),
        generated => today.format("%d.%m.%Y").to_string(),
        count => items.len(),
        unit => category.report_unit(),
        cards => cards,
    })?;
    Ok(html)
}

#[cfg(test)]
#[path = "tests/report_tests.rs"]
mod tests;
