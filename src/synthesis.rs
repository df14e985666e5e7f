use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::CompletionClient;
use crate::models::report::{FindingSpec, ReportTree, SlideSpec, TagSpec};
use crate::models::{Analysis, Severity};
use crate::prompts::Prompts;
use crate::store::ReportStore;

const TOPIC_MAX_TOKENS: u32 = 4096;
const FINDINGS_MAX_TOKENS: u32 = 4096;
const SUMMARY_MAX_TOKENS: u32 = 4096;

/// Stage A response shape: 8-12 discovered topics plus the tag cloud.
#[derive(Debug, Deserialize)]
struct TopicDiscovery {
    topics: Vec<DiscoveredTopic>,
    #[serde(default)]
    tags_cloud: Vec<TagWeight>,
}

#[derive(Debug, Deserialize)]
struct DiscoveredTopic {
    name: String,
    #[serde(default)]
    description: String,
    /// Local indices into the collected-analyses arena, not database ids.
    #[serde(default)]
    finding_indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct TagWeight {
    tag: String,
    weight: i32,
}

/// Stage B response shape for one topic.
#[derive(Debug, Deserialize)]
struct FindingsResponse {
    findings: Vec<RawFinding>,
}

#[derive(Debug, Deserialize)]
struct RawFinding {
    title: String,
    #[serde(default)]
    description: String,
    severity: Option<String>,
    #[serde(default)]
    recommendation: String,
    /// Local analysis indices evidencing the finding.
    #[serde(default)]
    chat_id: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeverityTally {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl SeverityTally {
    fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Low => self.low += 1,
            Severity::Medium => self.medium += 1,
            Severity::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub slide_count: usize,
    pub finding_count: usize,
    pub skipped_topics: usize,
}

/// Aggregates every analyzed chat of an audit into a hierarchical report:
/// topic discovery, per-topic findings, executive summary, then one
/// transactional replace of the audit's slide/finding/tag tree.
///
/// Three staged model calls keep each required output small; a malformed
/// per-topic response skips only that topic. Concurrent synthesis runs for
/// the same audit are not made safe.
pub struct ReportSynthesizer {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn ReportStore>,
}

impl ReportSynthesizer {
    pub fn new(llm: Arc<dyn CompletionClient>, store: Arc<dyn ReportStore>) -> Self {
        ReportSynthesizer { llm, store }
    }

    pub async fn synthesize(&self, audit_id: Uuid) -> Result<ReportSummary, AppError> {
        let audit = self
            .store
            .audit_by_id(audit_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("audit {}", audit_id)))?;

        // Collect: the arena of analyses and the local index -> chat id map.
        // Stage A/B cross-reference through these indices only.
        let collected = self.store.analyses_with_tags(audit_id).await?;
        if collected.is_empty() {
            return Err(AppError::NoAnalyzedChats(audit_id));
        }
        let chat_ids: HashMap<usize, Uuid> = collected
            .iter()
            .enumerate()
            .map(|(index, analysis)| (index, analysis.chat_id))
            .collect();

        // Stage A: topic discovery. A parse failure here aborts the run
        // before anything is written.
        let raw = self
            .llm
            .complete(
                Prompts::REPORT_JSON_SYSTEM,
                &topic_discovery_prompt(&collected),
                TOPIC_MAX_TOKENS,
            )
            .await?;
        let discovery = parse_topic_discovery(&raw)
            .ok_or_else(|| AppError::parse("topic discovery response", raw))?;
        info!(
            "audit {}: discovered {} topics over {} analyses",
            audit_id,
            discovery.topics.len(),
            collected.len()
        );

        // Stage B: per-topic findings, in discovery order. A topic whose
        // response does not parse is skipped; the rest of the report stands.
        let mut topic_slides: Vec<SlideSpec> = Vec::with_capacity(discovery.topics.len());
        let mut tally = SeverityTally::default();
        let mut skipped_topics = 0usize;

        for topic in &discovery.topics {
            let referenced: Vec<(usize, &Analysis)> = topic
                .finding_indices
                .iter()
                .filter_map(|&index| collected.get(index).map(|analysis| (index, analysis)))
                .collect();

            let raw = self
                .llm
                .complete(
                    Prompts::REPORT_JSON_SYSTEM,
                    &topic_findings_prompt(topic, &referenced),
                    FINDINGS_MAX_TOKENS,
                )
                .await?;

            let response = match parse_findings(&raw) {
                Some(response) => response,
                None => {
                    warn!(
                        "audit {}: topic '{}' skipped, findings response did not parse",
                        audit_id, topic.name
                    );
                    skipped_topics += 1;
                    continue;
                }
            };

            let findings: Vec<FindingSpec> = response
                .findings
                .iter()
                .map(|finding| {
                    let severity =
                        Severity::parse_lenient(finding.severity.as_deref().unwrap_or("medium"));
                    tally.record(severity);
                    FindingSpec {
                        title: finding.title.clone(),
                        description: finding.description.clone(),
                        recommendation: finding.recommendation.clone(),
                        severity,
                        // Unmapped indices are dropped silently
                        example_chat_ids: finding
                            .chat_id
                            .iter()
                            .filter_map(|index| chat_ids.get(index).copied())
                            .collect(),
                    }
                })
                .collect();

            topic_slides.push(SlideSpec {
                name: topic.name.clone(),
                description: topic.description.clone(),
                is_home: false,
                content_html: None,
                findings,
            });
        }

        // Stage C: executive summary over everything that survived stage B.
        let html = self
            .llm
            .complete(
                Prompts::REPORT_HTML_SYSTEM,
                &executive_summary_prompt(&topic_slides, &tally),
                SUMMARY_MAX_TOKENS,
            )
            .await?;

        // Commit: home slide at order 0, topic slides after it, tag cloud.
        let mut slides = Vec::with_capacity(topic_slides.len() + 1);
        slides.push(SlideSpec {
            name: "Executive Summary".to_string(),
            description: format!("Audit report for {}", audit.company_name),
            is_home: true,
            content_html: Some(html),
            findings: Vec::new(),
        });
        slides.extend(topic_slides);

        let tree = ReportTree {
            slides,
            tags: discovery
                .tags_cloud
                .iter()
                .map(|t| TagSpec {
                    tag: t.tag.clone(),
                    weight: t.weight,
                })
                .collect(),
        };
        self.store.replace_report(audit_id, &tree).await?;

        Ok(ReportSummary {
            slide_count: tree.slides.len(),
            finding_count: tally.total(),
            skipped_topics,
        })
    }
}

/// One arena entry rendered for a prompt, addressed by its local index.
fn digest_entry(index: usize, analysis: &Analysis) -> String {
    format!(
        "[{}]\nsummary: {}\nkey findings: {}\ntags: {}\ntopics: {}",
        index,
        analysis.summary.as_deref().unwrap_or("-"),
        analysis.key_findings.as_deref().unwrap_or("-"),
        analysis.tags.as_deref().unwrap_or("-"),
        analysis.topics.as_deref().unwrap_or("-"),
    )
}

fn topic_discovery_prompt(collected: &[Analysis]) -> String {
    let digest = collected
        .iter()
        .enumerate()
        .map(|(index, analysis)| digest_entry(index, analysis))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Per-conversation analyses, indexed from 0:\n\n{}\n\n{}",
        digest,
        Prompts::TOPIC_DISCOVERY
    )
}

fn topic_findings_prompt(topic: &DiscoveredTopic, referenced: &[(usize, &Analysis)]) -> String {
    let digest = referenced
        .iter()
        .map(|(index, analysis)| digest_entry(*index, analysis))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Topic: {}\n{}\n\nSupporting analyses, addressed by their original indices:\n\n{}\n\n{}",
        topic.name,
        topic.description,
        digest,
        Prompts::TOPIC_FINDINGS
    )
}

fn executive_summary_prompt(topic_slides: &[SlideSpec], tally: &SeverityTally) -> String {
    let titles = topic_slides
        .iter()
        .map(|slide| format!("- {}", slide.name))
        .collect::<Vec<_>>()
        .join("\n");

    let findings = topic_slides
        .iter()
        .flat_map(|slide| slide.findings.iter())
        .map(|finding| format!("- {}: {}", finding.title, finding.recommendation))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Report sections:\n{}\n\nTotal findings: {} (low: {}, medium: {}, high: {})\n\nFindings and recommendations:\n{}\n\nWrite the executive summary as an HTML fragment matching this skeleton exactly, replacing only the text content:\n{}",
        titles,
        tally.total(),
        tally.low,
        tally.medium,
        tally.high,
        findings,
        Prompts::SUMMARY_SKELETON
    )
}

/// Stage A parse: valid JSON object with a `topics` key, or nothing.
fn parse_topic_discovery(raw: &str) -> Option<TopicDiscovery> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    if value.get("topics").is_none() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Stage B parse: valid JSON object with a `findings` key, or nothing.
fn parse_findings(raw: &str) -> Option<FindingsResponse> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    if value.get("findings").is_none() {
        return None;
    }
    serde_json::from_value(value).ok()
}
