pub struct Prompts;

impl Prompts {
    /// System instruction for single-chat analysis. The model must emit one
    /// JSON object and nothing else.
    pub const ANALYSIS_SYSTEM: &'static str = "You are an HR audit analyst. You will receive the transcript of one conversation between an employee (Customer) and an AI interviewer (Assistant). Respond with a single JSON object and absolutely nothing else - no prose, no markdown fences. The object must contain exactly these fields: \"sentiment\" (integer 0-100, 0 = very negative), \"summary\" (string), \"keyfindings\" (array of strings), \"tags\" (array of short lowercase strings), \"topics\" (array of strings), \"customer_satisfaction\" (integer 0-100), \"agent_effectiveness\" (integer 0-100), \"improvement_suggestions\" (array of strings), \"conversation_quality\" (object with integer fields \"clarity\", \"speed\", \"solution\", each 0-100).";

    /// System instruction for report stages that must return JSON.
    pub const REPORT_JSON_SYSTEM: &'static str = "You are an HR audit analyst compiling an analytical report. Respond with a single JSON object and absolutely nothing else - no prose, no markdown fences.";

    /// System instruction for the executive-summary stage, which must return
    /// an HTML fragment matching the provided skeleton.
    pub const REPORT_HTML_SYSTEM: &'static str = "You are an HR audit analyst writing the executive summary of an audit report. Respond with an HTML fragment and absolutely nothing else - no prose outside the markup, no markdown fences. Use exactly the wrapper elements and classes of the skeleton you are given; replace only the text content.";

    /// Stage A instruction, appended after the indexed analysis digest.
    pub const TOPIC_DISCOVERY: &'static str = "Group the analyses above into 8-12 topics. Return a JSON object with a \"topics\" array, each element {\"name\": string, \"description\": string of at least 400 characters, \"finding_indices\": array of the integer indices of the analyses supporting the topic}, and a \"tags_cloud\" array of {\"tag\": string, \"weight\": integer} summarising the most frequent tags.";

    /// Stage B instruction, appended after a topic's analysis digest.
    pub const TOPIC_FINDINGS: &'static str = "Derive 4-6 findings for this topic. Return a JSON object with a \"findings\" array, each element {\"title\": string, \"description\": string of at least 300 characters, \"severity\": one of \"low\", \"medium\", \"high\", \"recommendation\": string of at least 400 characters, \"chat_id\": array of the integer indices of the analyses evidencing the finding}.";

    /// Literal skeleton the executive summary must reproduce, with only the
    /// text content replaced.
    pub const SUMMARY_SKELETON: &'static str = r#"<div class="report-summary">
  <section class="summary">
    <h2>Summary</h2>
    <p>...</p>
  </section>
  <section class="key-findings">
    <h2>Key Findings</h2>
    <ul>
      <li>...</li>
    </ul>
  </section>
  <section class="improvement-suggestions">
    <h2>Improvement Suggestions</h2>
    <ul>
      <li>...</li>
    </ul>
  </section>
</div>"#;
}
