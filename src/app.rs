//! Composition root wiring `agent-loop` to a real `cdp-adapter`-backed
//! `browser-session` (spec §6).

use std::path::PathBuf;
use std::sync::Arc;

use agent_loop::{AgentLoop, AgentLoopConfig};
use browser_session::{BrowserSession, BrowserSessionConfig};
use cdp_adapter::{CdpAdapter, CdpConfig};
use dom_observer::CdpDomObserver;
use domain_policy::DomainPolicy;
use llm_client::LlmClient;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::{interactive, provider, Args};
use crate::config;
use crate::errors::CliError;

const EVENT_BUS_CAPACITY: usize = 1024;

pub async fn run(args: Args) -> Result<(), CliError> {
    let app_config = config::load_or_default();

    let allowed_domains = if args.allowed_domains_list().is_empty() {
        app_config.allowed_domains.clone()
    } else {
        args.allowed_domains_list()
    };

    let (provider, model) = provider::resolve(args.provider.as_deref(), args.model.as_deref())
        .map_err(|err| CliError::Usage(err.to_string()))?;

    let session = build_session(&args, &allowed_domains).await?;
    session.start().await?;

    let llm = resolve_llm_client(&provider, model.as_deref())?;

    let loop_config = AgentLoopConfig::default();
    let cancel = CancellationToken::new();

    if interactive::is_interactive() {
        run_interactive(session, llm, allowed_domains, loop_config, cancel).await
    } else {
        let task_text = args.task_text()?;
        run_one_task(session, llm, task_text, allowed_domains, loop_config, cancel).await
    }
}

async fn build_session(args: &Args, allowed_domains: &[String]) -> Result<Arc<BrowserSession>, CliError> {
    let (tx, _rx) = broadcast::channel(EVENT_BUS_CAPACITY);

    let mut cdp_config = CdpConfig::default();
    cdp_config.headless = args.headless;
    if let Some(dir) = &args.user_data_dir {
        cdp_config.user_data_dir = expand_path(dir);
    }
    if let Some(url) = &args.cdp_url {
        cdp_config.websocket_url = Some(url.clone());
    }

    let cdp = Arc::new(CdpAdapter::new(cdp_config, tx));
    let observer = Arc::new(CdpDomObserver::new(cdp.clone()));
    let policy = DomainPolicy::new(allowed_domains.to_vec(), Vec::new(), true);

    let session_config = BrowserSessionConfig {
        allowed_domains: allowed_domains.to_vec(),
        highlight_elements: true,
        ..BrowserSessionConfig::default()
    };

    Ok(Arc::new(BrowserSession::new(cdp, observer, policy, session_config, true)))
}

fn expand_path(path: &std::path::Path) -> PathBuf {
    match path.to_str() {
        Some(s) => config::expand_tilde(s),
        None => path.to_path_buf(),
    }
}

/// No vendor HTTP integration ships in this crate (spec §6 "LLM clients"
/// is an out-of-scope collaborator): every provider resolves to a clear
/// runtime error naming the missing backend rather than a silent stub.
fn resolve_llm_client(provider: &provider::Provider, model: Option<&str>) -> Result<Arc<dyn LlmClient>, CliError> {
    let _ = model;
    Err(CliError::Runtime(format!(
        "no vendor LLM backend is wired in this build for provider {provider:?}; \
         implement `llm_client::LlmClient` for it and plug the client into `soulbrowser_cli::app::resolve_llm_client`"
    )))
}

async fn run_one_task(
    session: Arc<BrowserSession>,
    llm: Arc<dyn LlmClient>,
    task: String,
    allowed_domains: Vec<String>,
    loop_config: AgentLoopConfig,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let mut agent = AgentLoop::new(
        session,
        llm,
        None,
        task,
        None,
        !allowed_domains.is_empty(),
        loop_config,
    )?;
    agent.run(&cancel).await?;
    info!("task completed");
    Ok(())
}

async fn run_interactive(
    session: Arc<BrowserSession>,
    llm: Arc<dyn LlmClient>,
    allowed_domains: Vec<String>,
    loop_config: AgentLoopConfig,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let mut history = interactive::CommandHistory::load();
    println!("{}", interactive::HELP_TEXT);

    loop {
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        match interactive::classify(&line) {
            interactive::Command::Exit => break,
            interactive::Command::Help => println!("{}", interactive::HELP_TEXT),
            interactive::Command::Task(task) => {
                history.push(task.clone());
                let mut agent = AgentLoop::new(
                    session.clone(),
                    llm.clone(),
                    None,
                    task,
                    None,
                    !allowed_domains.is_empty(),
                    loop_config.clone(),
                )?;
                if let Err(err) = agent.run(&cancel).await {
                    error!(?err, "task failed");
                }
            }
        }
    }

    history.save()?;
    Ok(())
}
