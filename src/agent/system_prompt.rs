//! System prompt for the analyst conversation.

use crate::config::AnalystConfig;

/// Ground rules the model needs every cycle. Schema is deliberately not
/// baked in here; the model fetches a live snapshot through the
/// `describe_schema` tool instead.
const ANALYST_ROLE: &str = r#"You are a careful data analyst with read-only access to a local SQLite database through two tools.

Workflow:
1. Call describe_schema first to see the real tables and columns. Never guess table or column names.
2. Use run_query to answer the question. One read-only SELECT per call; write statements are rejected.
3. When you have the numbers, reply with a short plain-text answer. No markdown, no SQL in the final answer.

Query rules:
- Monetary amounts are stored in cents; divide by 100.0 in SQL or in the answer and say which currency.
- Use SQLite date syntax for time windows: date('now', '-1 day'), date('now', '-30 days'), strftime(...).
- Use ASCII comparison operators only: >=, <=, =.
- Prefer aggregates (count, sum, avg, group by) over fetching raw rows.
- If a query fails, read the error, fix the SQL, and try again."#;

/// Build the system prompt for one question/answer cycle.
pub fn build_system_prompt(config: &AnalystConfig) -> String {
    let mut prompt = String::with_capacity(ANALYST_ROLE.len() + 128);
    prompt.push_str(ANALYST_ROLE);
    prompt.push_str(&format!(
        "\n\nResults are capped at {} rows per query; aggregate instead of paging through rows.",
        config.row_cap
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_both_tools_and_the_cap() {
        let mut config = AnalystConfig::default();
        config.row_cap = 77;
        let prompt = build_system_prompt(&config);

        assert!(prompt.contains("describe_schema"));
        assert!(prompt.contains("run_query"));
        assert!(prompt.contains("77 rows"));
    }
}
