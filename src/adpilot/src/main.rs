//! ADPilot — cross-channel ad budget optimizer.
//!
//! Pulls campaign performance from social and search platforms, scores and
//! allocates the daily budget across them, and applies the result back.

use std::collections::HashMap;
use std::sync::Arc;

use adpilot_adapters::{SearchAdapter, SocialAdapter};
use adpilot_allocator::{AllocationStrategy, Allocator, BanditStrategy};
use adpilot_audit::PlatformTrackingConfig;
use adpilot_core::config::AppConfig;
use adpilot_core::types::{Goal, TimeWindow};
use adpilot_optimizer::{AccountTargets, CycleReport, CycleStatus, OptimizationLoop};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "adpilot")]
#[command(about = "Cross-channel advertising budget optimizer")]
#[command(version)]
struct Cli {
    /// Internal account identifier, used for the per-account busy lock
    #[arg(long, env = "ADPILOT__RUN__ACCOUNT_ID")]
    account_id: String,

    /// Social platform account id (omit to skip that platform)
    #[arg(long, env = "ADPILOT__RUN__SOCIAL_ACCOUNT_ID")]
    social_account_id: Option<String>,

    /// Search platform customer id (omit to skip that platform)
    #[arg(long, env = "ADPILOT__RUN__SEARCH_CUSTOMER_ID")]
    search_customer_id: Option<String>,

    /// Total daily budget to allocate across all arms
    #[arg(long, env = "ADPILOT__RUN__DAILY_BUDGET")]
    daily_budget: f64,

    /// Optimization goal
    #[arg(long, value_enum, default_value_t = GoalArg::Roas)]
    goal: GoalArg,

    /// Allocation strategy
    #[arg(long, value_enum, default_value_t = StrategyArg::Proportional)]
    strategy: StrategyArg,

    /// Time window to fetch insights for
    #[arg(long, value_enum, default_value_t = WindowArg::Yesterday)]
    window: WindowArg,

    /// Insight aggregation level (campaign, adset, ad, account)
    #[arg(long, default_value = "campaign")]
    level: String,

    /// If set, run on this interval instead of once and exiting
    #[arg(long, env = "ADPILOT__RUN__INTERVAL_SECS")]
    interval_secs: Option<u64>,

    /// Run the ROI/tracking-health audit over the fetched arms after each cycle
    #[arg(long)]
    audit: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GoalArg {
    Roas,
    Profit,
    Ltv,
    Cpa,
}

impl From<GoalArg> for Goal {
    fn from(value: GoalArg) -> Self {
        match value {
            GoalArg::Roas => Goal::Roas,
            GoalArg::Profit => Goal::Profit,
            GoalArg::Ltv => Goal::Ltv,
            GoalArg::Cpa => Goal::Cpa,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Proportional,
    EpsilonGreedy,
    Ucb1,
    Thompson,
    Adaptive,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Yesterday,
    Last7d,
    Last30d,
}

impl From<WindowArg> for TimeWindow {
    fn from(value: WindowArg) -> Self {
        match value {
            WindowArg::Yesterday => TimeWindow::Yesterday,
            WindowArg::Last7d => TimeWindow::Last7d,
            WindowArg::Last30d => TimeWindow::Last30d,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "adpilot=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("adpilot starting up");

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "failed to load config, using defaults");
        AppConfig::default()
    });

    if config.oracle.provider.is_some() {
        warn!(
            provider = ?config.oracle.provider,
            "an allocation oracle provider is configured, but no provider is wired up, falling back to local strategies"
        );
    }

    let social: Arc<dyn adpilot_adapters::PlatformAdapter> = Arc::new(SocialAdapter::new(
        config.social.access_token.clone(),
        config.social.base_url.clone(),
        config.social.api_version.clone(),
        config.social.pixel_id.clone(),
        config.social.timeout_ms,
    ));

    let search: Arc<dyn adpilot_adapters::PlatformAdapter> = Arc::new(SearchAdapter::new(
        config.search.developer_token.clone(),
        config.search.base_url.clone(),
        config.search.api_version.clone(),
        config.search.customer_id.clone(),
        config.search.timeout_ms,
        HashMap::new(),
    ));

    let allocator = Allocator::new();
    let optimizer = OptimizationLoop::new(social, search, allocator);

    let strategy = match cli.strategy {
        StrategyArg::Proportional => AllocationStrategy::Proportional,
        StrategyArg::EpsilonGreedy => AllocationStrategy::Bandit(BanditStrategy::EpsilonGreedy {
            epsilon: config.optimization.epsilon,
        }),
        StrategyArg::Ucb1 => AllocationStrategy::Bandit(BanditStrategy::Ucb1 {
            confidence: config.optimization.ucb_confidence,
        }),
        StrategyArg::Thompson => AllocationStrategy::Bandit(BanditStrategy::Thompson),
        StrategyArg::Adaptive => AllocationStrategy::Bandit(BanditStrategy::Adaptive),
    };

    let allocator_config = adpilot_allocator::AllocatorConfig {
        goal: cli.goal.into(),
        min_conversions: config.optimization.min_conversions,
        max_change_ratio: config.optimization.max_change_ratio,
        strategy,
    };

    let targets = AccountTargets {
        account_id: cli.account_id.clone(),
        social_account_id: cli.social_account_id.clone(),
        search_customer_id: cli.search_customer_id.clone(),
    };

    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            info!("received SIGINT, shutting down");
        }
        shutdown_signal.cancel();
    });

    let tracking = PlatformTrackingConfig {
        social_capi_enabled: config.social.pixel_id.is_some(),
        search_enhanced_conversions_enabled: config.search.customer_id.is_some(),
    };

    match cli.interval_secs {
        None => {
            run_once(
                &optimizer,
                &targets,
                cli.daily_budget,
                &allocator_config,
                cli.window.into(),
                &cli.level,
                cli.audit,
                tracking,
                shutdown,
            )
            .await;
        }
        Some(interval_secs) => {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("adpilot shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        run_once(
                            &optimizer,
                            &targets,
                            cli.daily_budget,
                            &allocator_config,
                            cli.window.clone().into(),
                            &cli.level,
                            cli.audit,
                            tracking,
                            shutdown.clone(),
                        )
                        .await;
                    }
                }
            }
        }
    }

    info!("adpilot shut down cleanly");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_once(
    optimizer: &OptimizationLoop,
    targets: &AccountTargets,
    daily_budget: f64,
    allocator_config: &adpilot_allocator::AllocatorConfig,
    window: TimeWindow,
    level: &str,
    audit: bool,
    tracking: PlatformTrackingConfig,
    cancel: CancellationToken,
) {
    match optimizer
        .run_cycle(targets, daily_budget, allocator_config, window, level, cancel)
        .await
    {
        Ok(report) => {
            info!(
                status = ?report.status,
                arms_processed = report.arms_processed,
                applied_success = report.applied.succeeded,
                applied_pending = report.applied.pending,
                applied_failed = report.applied.failed,
                "optimization cycle complete"
            );
            if report.status == CycleStatus::Partial {
                warn!("cycle completed with partial apply failures, see per-arm results");
            }
            if audit {
                run_audit_report(&report, allocator_config.goal, tracking);
            }
        }
        Err(e) => error!(error = %e, "optimization cycle failed"),
    }
}

fn run_audit_report(report: &CycleReport, goal: Goal, tracking: PlatformTrackingConfig) {
    let audit = adpilot_audit::run_audit(&report.arms, goal, tracking);
    info!(
        health_score = audit.health_score,
        critical_count = audit.critical_count,
        issue_count = audit.issues.len(),
        "audit complete"
    );
    for issue in &audit.issues {
        warn!(kind = %issue.kind, severity = ?issue.severity, "{}", issue.description);
    }
    for recommendation in &audit.recommendations {
        info!("{}", recommendation);
    }
}
