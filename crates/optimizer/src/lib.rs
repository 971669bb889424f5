#![warn(clippy::unwrap_used)]

//! The optimization loop: fetch insights from both platforms, score and
//! allocate, apply the new budgets back, and report what happened. One
//! `OptimizationLoop` serves every account; concurrent cycles for the same
//! account are rejected rather than queued, so a slow cycle can never pile
//! up behind itself.

pub mod report;

pub use report::{ApplyOutcome, ApplyResult, ApplySummary, CycleReport, CycleStatus};

use std::sync::Arc;

use adpilot_adapters::{AdapterError, PlatformAdapter};
use adpilot_allocator::{Allocator, AllocatorConfig};
use adpilot_core::{
    error::{AdPilotError, AdPilotResult},
    types::{Platform, TimeWindow},
};
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which account-scoped ids to fetch/apply with, per platform. Either side
/// may be absent — a platform with no id configured is simply skipped.
#[derive(Debug, Clone, Default)]
pub struct AccountTargets {
    pub account_id: String,
    pub social_account_id: Option<String>,
    pub search_customer_id: Option<String>,
}

pub struct OptimizationLoop {
    social: Arc<dyn PlatformAdapter>,
    search: Arc<dyn PlatformAdapter>,
    allocator: Allocator,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OptimizationLoop {
    pub fn new(social: Arc<dyn PlatformAdapter>, search: Arc<dyn PlatformAdapter>, allocator: Allocator) -> Self {
        Self {
            social,
            search,
            allocator,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run one optimization cycle for `targets`. Returns `CycleBusy` if
    /// another cycle for the same account is already in flight — this
    /// never blocks waiting for the other cycle to finish.
    pub async fn run_cycle(
        &self,
        targets: &AccountTargets,
        total_budget: f64,
        allocator_config: &AllocatorConfig,
        window: TimeWindow,
        level: &str,
        cancel: CancellationToken,
    ) -> AdPilotResult<CycleReport> {
        let lock = self.lock_for(&targets.account_id);
        let _guard = lock
            .try_lock()
            .map_err(|_| AdPilotError::CycleBusy(targets.account_id.clone()))?;

        if cancel.is_cancelled() {
            return Ok(CycleReport {
                status: CycleStatus::Cancelled,
                arms_processed: 0,
                arms: Vec::new(),
                allocations: Vec::new(),
                applied: ApplySummary::default(),
                timestamp: Utc::now(),
            });
        }

        let arms = self.fetch_all(targets, &window, level).await;
        info!(account = %targets.account_id, arms = arms.len(), "fetched arms for cycle");

        if arms.is_empty() {
            return Ok(CycleReport {
                status: CycleStatus::NoData,
                arms_processed: 0,
                arms: Vec::new(),
                allocations: Vec::new(),
                applied: ApplySummary::default(),
                timestamp: Utc::now(),
            });
        }

        if cancel.is_cancelled() {
            return Ok(CycleReport {
                status: CycleStatus::Cancelled,
                arms_processed: arms.len(),
                arms,
                allocations: Vec::new(),
                applied: ApplySummary::default(),
                timestamp: Utc::now(),
            });
        }

        let allocations = self.allocator.allocate(&arms, total_budget, allocator_config);

        let applied = self.apply_all(&allocations, &cancel).await;
        let status = if cancel.is_cancelled() && applied.results.len() < allocations.len() {
            CycleStatus::Cancelled
        } else if applied.failed == 0 && applied.pending == 0 {
            CycleStatus::Success
        } else if applied.succeeded > 0 {
            CycleStatus::Partial
        } else {
            CycleStatus::Partial
        };

        Ok(CycleReport {
            status,
            arms_processed: arms.len(),
            arms,
            allocations,
            applied,
            timestamp: Utc::now(),
        })
    }

    async fn fetch_all(&self, targets: &AccountTargets, window: &TimeWindow, level: &str) -> Vec<adpilot_core::types::Arm> {
        let social_account = targets.social_account_id.clone();
        let search_account = targets.search_customer_id.clone();

        let social_fetch = {
            let social = self.social.clone();
            let window = window.clone();
            let level = level.to_string();
            async move {
                match social_account {
                    Some(account_id) => social.fetch_insights(&account_id, &window, &level).await,
                    None => Ok(Vec::new()),
                }
            }
        };

        let search_fetch = {
            let search = self.search.clone();
            let window = window.clone();
            let level = level.to_string();
            async move {
                match search_account {
                    Some(account_id) => search.fetch_insights(&account_id, &window, &level).await,
                    None => Ok(Vec::new()),
                }
            }
        };

        let (social_result, search_result) = tokio::join!(social_fetch, search_fetch);

        let mut arms = Vec::new();
        for (platform, result) in [(Platform::Social, social_result), (Platform::Search, search_result)] {
            match result {
                Ok(platform_arms) => arms.extend(platform_arms),
                Err(err) => warn!(%platform, %err, "fetch failed for platform, excluding from this cycle"),
            }
        }
        arms
    }

    async fn apply_all(&self, allocations: &[adpilot_core::types::Allocation], cancel: &CancellationToken) -> ApplySummary {
        let mut tasks = Vec::new();
        for allocation in allocations {
            if cancel.is_cancelled() {
                break;
            }
            let adapter: Arc<dyn PlatformAdapter> = match allocation.platform {
                Platform::Social => self.social.clone(),
                Platform::Search => self.search.clone(),
            };
            let arm_id = allocation.arm_id.clone();
            let platform = allocation.platform;
            let new_budget = allocation.new_budget;
            tasks.push(tokio::spawn(async move {
                let outcome = match tokio::time::timeout(
                    std::time::Duration::from_secs(30),
                    adapter.update_budget(&arm_id, new_budget),
                )
                .await
                {
                    Ok(Ok(())) => ApplyOutcome::Success,
                    Ok(Err(AdapterError::Pending(reason))) => ApplyOutcome::Pending(reason),
                    Ok(Err(err)) => ApplyOutcome::Failed(err.to_string()),
                    Err(_) => ApplyOutcome::Failed("apply timed out".to_string()),
                };
                ApplyResult { arm_id, platform, outcome }
            }));
        }

        let mut summary = ApplySummary::default();
        for task in tasks {
            match task.await {
                Ok(result) => summary.record(result),
                Err(join_err) => warn!(%join_err, "apply task panicked"),
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adpilot_allocator::{AllocationStrategy, Allocator};
    use adpilot_core::types::{Arm, Goal, PlatformSignal};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubAdapter {
        arms: Vec<Arm>,
        apply_calls: AtomicUsize,
        fail_apply: bool,
    }

    #[async_trait]
    impl PlatformAdapter for StubAdapter {
        async fn fetch_insights(&self, _account_id: &str, _window: &TimeWindow, _level: &str) -> Result<Vec<Arm>, AdapterError> {
            Ok(self.arms.clone())
        }

        async fn update_budget(&self, _arm_id: &str, _new_daily_budget: f64) -> Result<(), AdapterError> {
            self.apply_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_apply {
                Err(AdapterError::PlatformResponse("boom".to_string()))
            } else {
                Ok(())
            }
        }

        async fn upload_conversion(&self, _signal: &PlatformSignal) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn arm(id: &str, platform: Platform) -> Arm {
        Arm {
            platform,
            id: id.to_string(),
            campaign_id: id.to_string(),
            campaign_name: "test".into(),
            date: None,
            spend: 100.0,
            revenue: 300.0,
            conversions: 20,
            clicks: 100,
            impressions: 5000,
            ltv: None,
            profit_margin: None,
            inventory_status: None,
            audience_quality_score: None,
            days_active: None,
            current_daily_budget: Some(100.0),
        }
    }

    fn config() -> AllocatorConfig {
        AllocatorConfig {
            goal: Goal::Roas,
            min_conversions: 10,
            max_change_ratio: 0.3,
            strategy: AllocationStrategy::Proportional,
        }
    }

    #[tokio::test]
    async fn no_data_when_nothing_configured() {
        let social = Arc::new(StubAdapter { arms: vec![], apply_calls: AtomicUsize::new(0), fail_apply: false });
        let search = Arc::new(StubAdapter { arms: vec![], apply_calls: AtomicUsize::new(0), fail_apply: false });
        let loop_ = OptimizationLoop::new(social, search, Allocator::new());
        let targets = AccountTargets { account_id: "acct-1".into(), ..Default::default() };
        let report = loop_
            .run_cycle(&targets, 200.0, &config(), TimeWindow::Yesterday, "campaign", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status, CycleStatus::NoData);
    }

    #[tokio::test]
    async fn successful_cycle_applies_every_allocation() {
        let social = Arc::new(StubAdapter {
            arms: vec![arm("a", Platform::Social), arm("b", Platform::Social)],
            apply_calls: AtomicUsize::new(0),
            fail_apply: false,
        });
        let search = Arc::new(StubAdapter { arms: vec![], apply_calls: AtomicUsize::new(0), fail_apply: false });
        let loop_ = OptimizationLoop::new(social, search, Allocator::new());
        let targets = AccountTargets {
            account_id: "acct-1".into(),
            social_account_id: Some("act_1".into()),
            search_customer_id: None,
        };
        let report = loop_
            .run_cycle(&targets, 200.0, &config(), TimeWindow::Yesterday, "campaign", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status, CycleStatus::Success);
        assert_eq!(report.applied.succeeded, 2);
    }

    #[tokio::test]
    async fn failed_applies_yield_partial_status() {
        let social = Arc::new(StubAdapter {
            arms: vec![arm("a", Platform::Social)],
            apply_calls: AtomicUsize::new(0),
            fail_apply: true,
        });
        let search = Arc::new(StubAdapter { arms: vec![], apply_calls: AtomicUsize::new(0), fail_apply: false });
        let loop_ = OptimizationLoop::new(social, search, Allocator::new());
        let targets = AccountTargets {
            account_id: "acct-1".into(),
            social_account_id: Some("act_1".into()),
            search_customer_id: None,
        };
        let report = loop_
            .run_cycle(&targets, 100.0, &config(), TimeWindow::Yesterday, "campaign", CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.status, CycleStatus::Partial);
        assert_eq!(report.applied.failed, 1);
    }

    #[tokio::test]
    async fn concurrent_cycle_for_same_account_is_rejected() {
        let social = Arc::new(StubAdapter {
            arms: vec![arm("a", Platform::Social)],
            apply_calls: AtomicUsize::new(0),
            fail_apply: false,
        });
        let search = Arc::new(StubAdapter { arms: vec![], apply_calls: AtomicUsize::new(0), fail_apply: false });
        let loop_ = Arc::new(OptimizationLoop::new(social, search, Allocator::new()));
        let targets = AccountTargets { account_id: "acct-1".into(), ..Default::default() };

        let lock = loop_.lock_for(&targets.account_id);
        let _held = lock.try_lock().unwrap();

        let result = loop_
            .run_cycle(&targets, 100.0, &config(), TimeWindow::Yesterday, "campaign", CancellationToken::new())
            .await;
        assert!(matches!(result, Err(AdPilotError::CycleBusy(_))));
    }
}
