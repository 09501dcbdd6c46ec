use super::{
    errors::PoolError,
    result::PoolResult,
};
use tokio::{
    sync::oneshot,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;


/// Handle на результат принятой задачи: вторая сторона личного канала конверта
pub struct ResultHandle<T> {
    cancel_token: CancellationToken,
    closed: CancellationToken,
    receiver: oneshot::Receiver<PoolResult<T>>,
}

impl<T> ResultHandle<T> {

    pub(crate) fn new
    (
        cancel_token: CancellationToken,
        closed: CancellationToken,
        receiver: oneshot::Receiver<PoolResult<T>>,
    ) -> Self {
        Self {
            cancel_token,
            closed,
            receiver,
        }
    }

    /// Кооперативная отмена: воркер, который еще не стартовал, пропустит задачу
    #[inline]
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Ждет результат без ограничения по времени
    pub async fn wait(self) -> PoolResult<T> {
        let Self { cancel_token, closed, receiver } = self;
        tokio::select! {
            biased;
            res = receiver => flatten(res, &cancel_token, &closed),
            _ = closed.cancelled() => Err(PoolError::WorkerClosed),
        }
    }

    pub async fn wait_timeout(self, timeout: Duration) -> PoolResult<T> {
        self.wait_until(deadline_after(timeout)).await
    }

    /// Ждет результат до дедлайна. По истечении отменяет задачу и бросает канал,
    /// поэтому поздний воркер не блокируется на отправке
    pub async fn wait_until(self, deadline: Instant) -> PoolResult<T> {
        let Self { cancel_token, closed, receiver } = self;
        tokio::select! {
            biased;
            res = receiver => flatten(res, &cancel_token, &closed),
            _ = closed.cancelled() => Err(PoolError::WorkerClosed),
            _ = tokio::time::sleep_until(deadline) => {
                cancel_token.cancel();
                Err(PoolError::JobTimedOut)
            }
        }
    }
}

/// Дедлайн через `timeout` от текущего момента. Для огромных значений
/// (например `Duration::MAX`) берется момент примерно через 30 лет
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| far_future(now))
}

fn far_future(now: Instant) -> Instant {
    now + Duration::from_secs(86400 * 365 * 30)
}

/// Канал закрыт без значения: либо пул закрыт, либо задачу отменили до старта
fn flatten<T>(
    res: Result<PoolResult<T>, oneshot::error::RecvError>,
    cancel_token: &CancellationToken,
    closed: &CancellationToken,
) -> PoolResult<T> {
    match res {
        Ok(result) => result,
        Err(_) if !closed.is_cancelled() && cancel_token.is_cancelled() => Err(PoolError::Cancelled),
        Err(_) => Err(PoolError::WorkerClosed),
    }
}
