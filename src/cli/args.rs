//! CLI flag surface (spec §6 "CLI surface").

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "browser-use", version, about = "Intelligent web automation agent")]
pub struct Args {
    #[arg(long)]
    pub provider: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub headless: bool,

    #[arg(long = "window-width")]
    pub window_width: Option<u32>,

    #[arg(long = "window-height")]
    pub window_height: Option<u32>,

    #[arg(long = "user-data-dir")]
    pub user_data_dir: Option<PathBuf>,

    #[arg(long = "profile-directory")]
    pub profile_directory: Option<String>,

    /// Comma-separated, trimmed, non-empty entries.
    #[arg(long = "allowed-domains")]
    pub allowed_domains: Option<String>,

    #[arg(long = "proxy-url")]
    pub proxy_url: Option<String>,

    #[arg(long = "no-proxy")]
    pub no_proxy: Option<String>,

    #[arg(long = "proxy-username")]
    pub proxy_username: Option<String>,

    #[arg(long = "proxy-password")]
    pub proxy_password: Option<String>,

    #[arg(long = "allow-insecure")]
    pub allow_insecure: bool,

    #[arg(long = "cdp-url")]
    pub cdp_url: Option<String>,

    #[arg(short = 'p', long = "prompt")]
    pub prompt: Option<String>,

    /// Positional task words, joined with spaces. Mutually exclusive with
    /// `--prompt`.
    #[arg(trailing_var_arg = true)]
    pub task: Vec<String>,
}

impl Args {
    /// Resolves the task text, enforcing that `--prompt` and positional
    /// words are mutually exclusive (spec §6).
    pub fn task_text(&self) -> Result<String, crate::errors::CliError> {
        match (&self.prompt, self.task.is_empty()) {
            (Some(_), false) => Err(crate::errors::CliError::Usage(
                "--prompt and positional task text are mutually exclusive".to_string(),
            )),
            (Some(prompt), true) => Ok(prompt.clone()),
            (None, false) => Ok(self.task.join(" ")),
            (None, true) => Err(crate::errors::CliError::Usage(
                "no task provided: pass -p \"task\" or positional task words".to_string(),
            )),
        }
    }

    /// Comma-separated, trimmed, non-empty allowed-domain entries.
    pub fn allowed_domains_list(&self) -> Vec<String> {
        self.allowed_domains
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn no_proxy_list(&self) -> Vec<String> {
        self.no_proxy
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_and_positional_task_are_mutually_exclusive() {
        let args = Args {
            provider: None,
            model: None,
            headless: false,
            window_width: None,
            window_height: None,
            user_data_dir: None,
            profile_directory: None,
            allowed_domains: None,
            proxy_url: None,
            no_proxy: None,
            proxy_username: None,
            proxy_password: None,
            allow_insecure: false,
            cdp_url: None,
            prompt: Some("find the price".to_string()),
            task: vec!["find".to_string(), "price".to_string()],
        };
        assert!(args.task_text().is_err());
    }

    #[test]
    fn allowed_domains_are_trimmed_and_non_empty() {
        let args = Args {
            provider: None,
            model: None,
            headless: false,
            window_width: None,
            window_height: None,
            user_data_dir: None,
            profile_directory: None,
            allowed_domains: Some(" example.com , , foo.test ".to_string()),
            proxy_url: None,
            no_proxy: None,
            proxy_username: None,
            proxy_password: None,
            allow_insecure: false,
            cdp_url: None,
            prompt: None,
            task: vec![],
        };
        assert_eq!(
            args.allowed_domains_list(),
            vec!["example.com".to_string(), "foo.test".to_string()]
        );
    }
}
