//! Renders the `<browser_state>` section (spec §4.6).

use browser_session::BrowserStateSummary;

fn current_tab_id(state: &BrowserStateSummary) -> Option<u64> {
    let matches: Vec<_> = state
        .tabs
        .iter()
        .filter(|tab| tab.url == state.url && tab.title == state.title)
        .collect();
    match matches.as_slice() {
        [single] => Some(single.page_id),
        _ => None,
    }
}

fn render_tabs(state: &BrowserStateSummary) -> String {
    let mut out = String::new();
    for tab in &state.tabs {
        out.push_str(&format!(
            "Tab {}: {} ({})\n",
            tab.page_id, tab.title, tab.url
        ));
    }
    out
}

fn render_page_info(state: &BrowserStateSummary) -> String {
    let info = &state.page_info;
    let scrollable_height = (info.page_height - info.viewport_height).max(0);
    let scroll_pct = if scrollable_height > 0 {
        ((info.scroll_y as f64 / scrollable_height as f64) * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    format!(
        "Viewport: {}x{}, Page: {}x{}, Scroll: {:.0}%",
        info.viewport_width, info.viewport_height, info.page_width, info.page_height, scroll_pct
    )
}

fn render_interactive_elements(state: &BrowserStateSummary) -> String {
    let dom = state.dom_string.clone().unwrap_or_default();
    let mut out = String::new();
    if state.pixels_above > 0 {
        out.push_str(&format!("... {} pixels above ...\n", state.pixels_above));
    } else {
        out.push_str("[Start of page]\n");
    }
    out.push_str(&dom);
    if !dom.ends_with('\n') {
        out.push('\n');
    }
    if state.pixels_below > 0 {
        out.push_str(&format!("... {} pixels below ...\n", state.pixels_below));
    } else {
        out.push_str("[End of page]\n");
    }
    out
}

pub fn render_browser_state(state: &BrowserStateSummary) -> String {
    let mut out = String::new();
    out.push_str(&render_tabs(state));
    if let Some(id) = current_tab_id(state) {
        out.push_str(&format!("Current tab: {id}\n"));
    }
    out.push_str(&render_page_info(state));
    out.push('\n');
    if state.is_pdf_viewer {
        out.push_str("PDF viewer open — element indices are unavailable.\n");
    }
    out.push_str(&render_interactive_elements(state));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_session::{PageInfo, Tab};
    use dom_serializer::SelectorMap;

    fn summary() -> BrowserStateSummary {
        BrowserStateSummary {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            tabs: vec![Tab {
                page_id: 1,
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                parent_page_id: None,
            }],
            selector_map: SelectorMap::default(),
            dom_string: Some("[1] <a>Link</a>".to_string()),
            screenshot: None,
            page_info: PageInfo {
                viewport_width: 1280,
                viewport_height: 720,
                page_width: 1280,
                page_height: 720,
                scroll_x: 0,
                scroll_y: 0,
            },
            pixels_above: 0,
            pixels_below: 0,
            pixels_left: 0,
            pixels_right: 0,
            is_pdf_viewer: false,
            loading_status: None,
            browser_errors: Vec::new(),
            pending_network_requests: Vec::new(),
            closed_popup_messages: Vec::new(),
            recent_events: None,
        }
    }

    #[test]
    fn current_tab_reported_when_url_and_title_match_uniquely() {
        let rendered = render_browser_state(&summary());
        assert!(rendered.contains("Current tab: 1"));
    }

    #[test]
    fn full_page_gets_start_and_end_markers() {
        let rendered = render_browser_state(&summary());
        assert!(rendered.contains("[Start of page]"));
        assert!(rendered.contains("[End of page]"));
    }

    #[test]
    fn off_viewport_content_gets_pixel_annotations() {
        let mut state = summary();
        state.pixels_above = 200;
        state.pixels_below = 400;
        let rendered = render_browser_state(&state);
        assert!(rendered.contains("200 pixels above"));
        assert!(rendered.contains("400 pixels below"));
        assert!(!rendered.contains("[Start of page]"));
        assert!(!rendered.contains("[End of page]"));
    }
}
