// ==========================================
// 学员训练计划管理 - 后台刷新协调器
// ==========================================
// 职责: 打开任务时按提示触发静默刷新,同一时刻最多一个刷新在途
// 红线: 刷新失败只记日志,不影响已经作出的解锁判定
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

// ==========================================
// RefreshSource Trait
// ==========================================
// 用途: 重新拉取某个学员的数据（失效缓存 + 重新加载）
// 实现者: SqliteDocumentStore
#[async_trait]
pub trait RefreshSource: Send + Sync {
    async fn refresh_customer(&self, customer_id: &str) -> RepositoryResult<()>;
}

/// 触发结果
#[derive(Debug)]
pub enum RefreshTicket {
    /// 已启动,可 await 等待结束（调用方通常直接丢弃）
    Started {
        ticket_id: String,
        handle: JoinHandle<()>,
    },
    /// 已有刷新在途,本次忽略
    AlreadyInFlight,
    /// 当前不在 tokio 运行时内,无法后台执行
    NoRuntime,
}

impl RefreshTicket {
    pub fn is_started(&self) -> bool {
        matches!(self, RefreshTicket::Started { .. })
    }

    /// 等待刷新结束（未启动时立即返回）
    pub async fn wait(self) {
        if let RefreshTicket::Started { handle, .. } = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "后台刷新任务异常结束");
            }
        }
    }
}

// 离开作用域时清除在途标志（含 panic 路径）
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ==========================================
// RefreshCoordinator - 后台刷新协调器
// ==========================================
#[derive(Clone)]
pub struct RefreshCoordinator {
    source: Arc<dyn RefreshSource>,
    in_flight: Arc<AtomicBool>,
}

impl RefreshCoordinator {
    pub fn new(source: Arc<dyn RefreshSource>) -> Self {
        Self {
            source,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 触发一次后台刷新（不等待结果）
    pub fn trigger(&self, customer_id: &str) -> RefreshTicket {
        let Ok(runtime) = Handle::try_current() else {
            warn!(customer_id, "不在异步运行时内,跳过后台刷新");
            return RefreshTicket::NoRuntime;
        };

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(customer_id, "已有刷新在途,忽略本次触发");
            return RefreshTicket::AlreadyInFlight;
        }

        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let source = Arc::clone(&self.source);
        let customer_id = customer_id.to_string();
        let ticket_id = Uuid::new_v4().to_string();
        let task_ticket = ticket_id.clone();

        let handle = runtime.spawn(async move {
            let _guard = guard;
            match source.refresh_customer(&customer_id).await {
                Ok(()) => debug!(ticket_id = %task_ticket, %customer_id, "后台刷新完成"),
                Err(e) => warn!(
                    ticket_id = %task_ticket,
                    %customer_id,
                    error = %e,
                    "后台刷新失败,已忽略"
                ),
            }
        });

        RefreshTicket::Started { ticket_id, handle }
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::RepositoryError;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct GatedSource {
        calls: AtomicUsize,
        release: Notify,
        fail: bool,
    }

    impl GatedSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                release: Notify::new(),
                fail,
            })
        }
    }

    #[async_trait]
    impl RefreshSource for GatedSource {
        async fn refresh_customer(&self, customer_id: &str) -> RepositoryResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            if self.fail {
                Err(RepositoryError::NotFound {
                    entity: "customer".to_string(),
                    id: customer_id.to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_second_trigger_is_deduplicated() {
        let source = GatedSource::new(false);
        let coordinator = RefreshCoordinator::new(source.clone());

        let first = coordinator.trigger("C1");
        assert!(first.is_started());
        assert!(coordinator.is_in_flight());

        let second = coordinator.trigger("C1");
        assert!(matches!(second, RefreshTicket::AlreadyInFlight));

        source.release.notify_one();
        first.wait().await;

        assert!(!coordinator.is_in_flight());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed_and_flag_cleared() {
        let source = GatedSource::new(true);
        let coordinator = RefreshCoordinator::new(source.clone());

        let ticket = coordinator.trigger("C404");
        source.release.notify_one();
        ticket.wait().await;

        assert!(!coordinator.is_in_flight());
        let again = coordinator.trigger("C404");
        assert!(again.is_started());
        source.release.notify_one();
        again.wait().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_outside_runtime_is_skipped() {
        let coordinator = RefreshCoordinator::new(GatedSource::new(false));
        assert!(matches!(coordinator.trigger("C1"), RefreshTicket::NoRuntime));
        assert!(!coordinator.is_in_flight());
    }
}
