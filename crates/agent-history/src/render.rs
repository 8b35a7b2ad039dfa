//! Renders a `HistoryItem` as `<step_N>\n<content>\n</step_N>` (spec §4.5).

use crate::model::HistoryItem;

const HEAD: usize = 100;
const TAIL: usize = 100;

/// Truncates long error text to a head-100 + `......` + tail-100 window
/// (spec §4.5 "(d)").
pub fn truncate_error(message: &str) -> String {
    let chars: Vec<char> = message.chars().collect();
    if chars.len() <= HEAD + TAIL {
        return message.to_string();
    }
    let head: String = chars[..HEAD].iter().collect();
    let tail: String = chars[chars.len() - TAIL..].iter().collect();
    format!("{head}......{tail}")
}

pub fn render_item(item: &HistoryItem) -> String {
    let mut lines = Vec::new();
    if let Some(eval) = &item.evaluation_previous_goal {
        lines.push(format!("Evaluation of Previous Step: {eval}"));
    }
    if let Some(memory) = &item.memory {
        lines.push(format!("Memory: {memory}"));
    }
    if let Some(goal) = &item.next_goal {
        lines.push(format!("Next Goal: {goal}"));
    }
    if !item.action_results.is_empty() {
        lines.push("Action Results:".to_string());
        for result in &item.action_results {
            lines.push(format!("  {result}"));
        }
    }
    if let Some(err) = &item.error {
        lines.push(format!("Error: {}", truncate_error(err)));
    }
    if let Some(sys) = &item.system_message {
        lines.push(format!("System: {sys}"));
    }
    format!(
        "<step_{n}>\n{content}\n</step_{n}>",
        n = item.step_number,
        content = lines.join("\n")
    )
}

pub fn render_history(items: &[HistoryItem]) -> String {
    items
        .iter()
        .map(render_item)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reconstructs a `HistoryItem` from `render_item`'s output. Used by the
/// round-trip testable property; not used in the normal history path.
pub fn parse_item(text: &str) -> Option<HistoryItem> {
    let text = text.trim();
    let open_tag_end = text.find('>')?;
    let open_tag = &text[..open_tag_end];
    let step_number: u32 = open_tag.strip_prefix("<step_")?.parse().ok()?;
    let close_tag = format!("</step_{step_number}>");
    let content = text[open_tag_end + 1..].strip_suffix(&close_tag)?.trim_end_matches('\n');

    let mut item = HistoryItem {
        step_number,
        ..Default::default()
    };
    let mut lines = content.lines().peekable();
    while let Some(line) = lines.next() {
        if let Some(rest) = line.strip_prefix("Evaluation of Previous Step: ") {
            item.evaluation_previous_goal = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("Memory: ") {
            item.memory = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("Next Goal: ") {
            item.next_goal = Some(rest.to_string());
        } else if line == "Action Results:" {
            while let Some(next) = lines.peek() {
                if let Some(result) = next.strip_prefix("  ") {
                    item.action_results.push(result.to_string());
                    lines.next();
                } else {
                    break;
                }
            }
        } else if let Some(rest) = line.strip_prefix("Error: ") {
            item.error = Some(rest.to_string());
        } else if let Some(rest) = line.strip_prefix("System: ") {
            item.system_message = Some(rest.to_string());
        }
    }
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_then_parse_round_trips_a_step_item() {
        let item = HistoryItem::step(
            3,
            Some("page loaded".to_string()),
            Some("looking for login".to_string()),
            Some("click sign in".to_string()),
            vec!["Action 1/1: Clicked element 2".to_string()],
        );
        let rendered = render_item(&item);
        let parsed = parse_item(&rendered).expect("parses");
        assert_eq!(parsed.step_number, item.step_number);
        assert_eq!(parsed.evaluation_previous_goal, item.evaluation_previous_goal);
        assert_eq!(parsed.memory, item.memory);
        assert_eq!(parsed.next_goal, item.next_goal);
        assert_eq!(parsed.action_results, item.action_results);
        assert_eq!(parsed.error, item.error);
        assert_eq!(parsed.system_message, item.system_message);
    }

    #[test]
    fn render_then_parse_round_trips_an_error_item() {
        let item = HistoryItem::error(5, "boom".to_string());
        let parsed = parse_item(&render_item(&item)).expect("parses");
        assert_eq!(parsed.step_number, 5);
        assert_eq!(parsed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn truncate_error_preserves_short_messages() {
        assert_eq!(truncate_error("short"), "short");
    }

    #[test]
    fn truncate_error_truncates_long_messages() {
        let long = "a".repeat(500);
        let truncated = truncate_error(&long);
        assert!(truncated.contains("......"));
        assert!(truncated.len() < long.len());
    }
}
