/// At most this many exemplars are shown to the model per cluster.
pub const MAX_PROMPT_EXEMPLARS: usize = 8;

pub const LABEL_SYSTEM_PROMPT: &str =
    "You are an expert at analyzing customer service data. Always respond with valid JSON only.";

pub fn build_label_prompt(exemplars: &[String]) -> String {
    let listing = exemplars
        .iter()
        .take(MAX_PROMPT_EXEMPLARS)
        .map(|q| format!("- {}", q))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are analyzing customer service queries. Below are representative queries from a cluster:

{listing}

Based on these queries, provide a JSON object with:
1. "topic_name": A concise topic name (2-4 words, e.g., "Order Cancellation", "Account Issues")
2. "description": A brief description of what customers in this cluster are asking about

IMPORTANT: Your response must be valid JSON with exactly these two fields. Example:
```json
{{
  "topic_name": "Account Management",
  "description": "Customers need help with account-related issues"
}}
```"#
    )
}
