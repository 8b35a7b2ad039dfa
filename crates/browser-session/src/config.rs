use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct BrowserSessionConfig {
    pub wait_for_network_idle_ms: u64,
    pub max_wait_page_load_ms: u64,
    pub keep_alive: bool,
    pub downloads_path: Option<PathBuf>,
    pub auto_download_pdfs: bool,
    pub page_probe_timeout_ms: u64,
    pub allowed_domains: Vec<String>,
    pub prohibited_domains: Vec<String>,
    pub block_ip_addresses: bool,
    pub highlight_elements: bool,
}

impl Default for BrowserSessionConfig {
    fn default() -> Self {
        Self {
            wait_for_network_idle_ms: 500,
            max_wait_page_load_ms: 5_000,
            keep_alive: false,
            downloads_path: None,
            auto_download_pdfs: true,
            page_probe_timeout_ms: 5_000,
            allowed_domains: Vec::new(),
            prohibited_domains: Vec::new(),
            block_ip_addresses: false,
            highlight_elements: true,
        }
    }
}
