//! Static action-kind registry: one JSON-schema-shaped description per kind,
//! rendered into the `<page_actions>` prompt section (spec §4.6).

pub struct ActionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params_schema: &'static str,
}

pub const REGISTRY: &[ActionSpec] = &[
    ActionSpec {
        name: "go_to_url",
        description: "Navigate the active tab to a URL, optionally opening a new tab first.",
        params_schema: r#"{"url": "string", "new_tab": "boolean, default false"}"#,
    },
    ActionSpec {
        name: "click_element_by_index",
        description: "Click the interactive element at the given selector-map index.",
        params_schema: r#"{"index": "integer"}"#,
    },
    ActionSpec {
        name: "type_text",
        description: "Type text into the input element at the given selector-map index.",
        params_schema: r#"{"index": "integer", "text": "string"}"#,
    },
    ActionSpec {
        name: "scroll",
        description: "Scroll the page vertically by a pixel amount (negative scrolls up).",
        params_schema: r#"{"pixels": "integer, default 0"}"#,
    },
    ActionSpec {
        name: "wait",
        description: "Pause for a number of seconds before the next action.",
        params_schema: r#"{"seconds": "integer"}"#,
    },
    ActionSpec {
        name: "extract_structured_data",
        description: "Extract structured content from the current page matching a query.",
        params_schema: r#"{"query": "string", "links": "boolean, default false"}"#,
    },
    ActionSpec {
        name: "create_new_tab",
        description: "Open a new tab at the given URL and make it active.",
        params_schema: r#"{"url": "string"}"#,
    },
    ActionSpec {
        name: "switch_to_tab",
        description: "Switch the active tab; -1 selects the most recently opened tab.",
        params_schema: r#"{"index": "integer"}"#,
    },
    ActionSpec {
        name: "go_back",
        description: "Navigate the active tab back in its history.",
        params_schema: "{}",
    },
    ActionSpec {
        name: "go_forward",
        description: "Navigate the active tab forward in its history.",
        params_schema: "{}",
    },
    ActionSpec {
        name: "refresh",
        description: "Reload the active tab.",
        params_schema: "{}",
    },
    ActionSpec {
        name: "done",
        description: "End the task and report the final outcome to the user.",
        params_schema: r#"{"text": "string", "success": "boolean", "files": "string[], default []"}"#,
    },
];

/// Renders the fixed registry as the `<page_actions>` prompt body.
pub fn render_page_actions() -> String {
    let mut out = String::new();
    for spec in REGISTRY {
        out.push_str(&format!("- {}: {} params: {}\n", spec.name, spec.description, spec.params_schema));
    }
    out
}
