//! Interactive-element predicate (spec §4.2).

use dom_observer::RawNode;

const INTERACTIVE_TAGS: &[&str] = &[
    "button", "input", "select", "textarea", "a", "label", "details", "summary", "option",
    "optgroup",
];

pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "menuitem",
    "option",
    "radio",
    "checkbox",
    "tab",
    "textbox",
    "combobox",
    "slider",
    "spinbutton",
    "listbox",
    "search",
    "searchbox",
];

const AX_BOOLEAN_PROPERTY_FLAGS: &[&str] = &[
    "focusable",
    "editable",
    "settable",
    "checked",
    "expanded",
    "pressed",
    "selected",
    "required",
    "autocomplete",
    "keyshortcuts",
];

const INTERACTIVE_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "onkeydown",
    "onkeyup",
    "tabindex",
];

/// Class/id substrings identifying a search-box affordance even when the
/// element itself carries none of the other interactive markers.
const SEARCH_ICON_HINTS: &[&str] = &["search", "magnifier", "magnifying-glass", "lookup"];

fn has_any_ax_flag(node: &RawNode) -> bool {
    AX_BOOLEAN_PROPERTY_FLAGS
        .iter()
        .any(|flag| node.ax_properties.contains_key(*flag))
}

fn has_interactive_attribute(node: &RawNode) -> bool {
    INTERACTIVE_ATTRIBUTES
        .iter()
        .any(|attr| node.attributes.contains_key(*attr))
}

fn matches_search_icon_heuristic(node: &RawNode) -> bool {
    let haystacks = [
        node.attributes.get("class").map(String::as_str).unwrap_or(""),
        node.attributes.get("id").map(String::as_str).unwrap_or(""),
    ];
    haystacks.iter().any(|h| {
        let lower = h.to_ascii_lowercase();
        SEARCH_ICON_HINTS.iter().any(|hint| lower.contains(hint))
    })
}

fn is_large_enough_iframe(node: &RawNode) -> bool {
    if node.tag.as_deref() != Some("iframe") {
        return false;
    }
    match node.bounds {
        Some(b) => b.width >= 100.0 && b.height >= 100.0,
        None => false,
    }
}

fn is_small_interactive_square(node: &RawNode) -> bool {
    let Some(b) = node.bounds else { return false };
    let square = (10.0..=50.0).contains(&b.width) && (10.0..=50.0).contains(&b.height);
    square && has_interactive_attribute(node)
}

/// Conjunction of heuristics, short-circuiting on the first `false` gate
/// (ax-hidden/ax-disabled), then any of the positive criteria.
pub fn is_interactive(node: &RawNode) -> bool {
    if node.is_hidden() || node.is_disabled() {
        return false;
    }

    let tag_match = node
        .tag
        .as_deref()
        .map(|t| INTERACTIVE_TAGS.contains(&t))
        .unwrap_or(false);
    let role_match = node
        .ax_role
        .as_deref()
        .map(|r| INTERACTIVE_ROLES.contains(&r))
        .unwrap_or(false);

    tag_match
        || role_match
        || has_any_ax_flag(node)
        || has_interactive_attribute(node)
        || matches_search_icon_heuristic(node)
        || is_large_enough_iframe(node)
        || is_small_interactive_square(node)
}

/// Whether `node`'s accessibility role is one of `INTERACTIVE_ROLES`, as
/// opposed to merely having some role at all (`presentation`/`generic`/
/// `group` are roles too, and aren't interactive).
pub fn has_interactive_role(node: &RawNode) -> bool {
    node.ax_role
        .as_deref()
        .map(|r| INTERACTIVE_ROLES.contains(&r))
        .unwrap_or(false)
}

pub fn is_visible(node: &RawNode) -> bool {
    node.visible
        && !node.is_hidden()
        && node.bounds.map(|b| b.area() > 0.0).unwrap_or(false)
}
