use super::{
    config::Config,
    dispatcher::Dispatcher,
    envelope::{BoxedJob, Processor, TaskEnvelope},
    errors::PoolError,
    handle::{deadline_after, ResultHandle},
    model::{AdmissionMode, Outcome, PoolMetrics},
    result::PoolResult,
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Weak,
};
use crossbeam::utils::CachePadded;
use tokio::{
    runtime::Handle,
    sync::{mpsc, Notify, Semaphore},
    time::{Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;


pub type SharedPool = Arc<WorkerPool>;

/// Состояние, общее для пула, диспетчера и воркеров
pub(crate) struct PoolState {
    pub(crate) semaphore: Arc<Semaphore>,
    pub(crate) capacity: usize,
    pub(crate) admission: AdmissionMode,
    pub(crate) closed: AtomicBool,
    pub(crate) cancellation_token: CancellationToken,
    pub(crate) in_flight: CachePadded<AtomicUsize>,
    pub(crate) peak_in_flight: AtomicUsize,
    pub(crate) drained: Notify,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    timed_out: AtomicUsize,
    abandoned: AtomicUsize,
    skipped: AtomicUsize,
    panicked: AtomicUsize,
}

impl PoolState {
    fn new(capacity: usize, admission: AdmissionMode) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            admission,
            closed: AtomicBool::new(false),
            cancellation_token: CancellationToken::new(),
            in_flight: CachePadded::new(AtomicUsize::new(0)),
            peak_in_flight: AtomicUsize::new(0),
            drained: Notify::new(),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            timed_out: AtomicUsize::new(0),
            abandoned: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Delivered => &self.completed,
            Outcome::Abandoned => &self.abandoned,
            Outcome::Skipped => &self.skipped,
            Outcome::Panicked => &self.panicked,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Пул с ограниченным числом одновременно работающих воркеров.
///
/// Задачи идут через единственный диспетчер, результат возвращается
/// напрямую вызывающему через личный канал конверта.
pub struct WorkerPool {
    state: Arc<PoolState>,
    sender: mpsc::Sender<BoxedJob>,
    config: Config,
}

impl WorkerPool {
    /// Должен вызываться внутри рантайма tokio: диспетчер запускается сразу.
    ///
    /// # Panics
    /// Вне рантайма. Для проверяемого варианта см. [`WorkerPool::try_with_config`]
    pub fn new(capacity: usize) -> SharedPool {
        Self::with_config(Config::with_capacity(capacity))
    }

    /// # Panics
    /// Вне рантайма tokio
    pub fn with_config(config: Config) -> SharedPool {
        Self::start(config, &Handle::current())
    }

    /// Как `with_config`, но вне рантайма возвращает `RuntimeUnavailable`
    pub fn try_with_config(config: Config) -> PoolResult<SharedPool> {
        let runtime = Handle::try_current().map_err(|_| PoolError::RuntimeUnavailable)?;
        Ok(Self::start(config, &runtime))
    }

    fn start(config: Config, runtime: &Handle) -> SharedPool {
        let capacity = config.effective_capacity();
        let state = Arc::new(PoolState::new(capacity, config.admission));

        // tokio не умеет канал без буфера, 1 - минимальная передача
        let (sender, receiver) = mpsc::channel::<BoxedJob>(1);
        Dispatcher::spawn(runtime, state.clone(), receiver);

        tracing::info!(capacity, admission = ?config.admission, "worker pool started");

        Arc::new(Self {
            state,
            sender,
            config,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    #[inline]
    pub fn admission_mode(&self) -> AdmissionMode {
        self.state.admission
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Отправляет задачу и ждет результат
    pub async fn submit<P, W>(&self, payload: P, processor: W) -> PoolResult<W::Output>
    where
        P: Send + 'static,
        W: Processor<P>,
    {
        self.enqueue(payload, processor).await?.wait().await
    }

    /// Один дедлайн на прием задачи и на ожидание результата.
    /// Если он истек до приема, задача не ставится в очередь
    pub async fn submit_with_deadline<P, W>(
        &self,
        payload: P,
        processor: W,
        timeout: Duration,
    ) -> PoolResult<W::Output>
    where
        P: Send + 'static,
        W: Processor<P>,
    {
        let deadline = deadline_after(timeout);
        let handle = self.enqueue_inner(payload, processor, Some(deadline)).await?;
        let result = handle.wait_until(deadline).await;
        if matches!(result, Err(PoolError::JobTimedOut)) {
            self.state.timed_out.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Возвращается, как только диспетчер принял задачу
    pub async fn enqueue<P, W>(&self, payload: P, processor: W) -> PoolResult<ResultHandle<W::Output>>
    where
        P: Send + 'static,
        W: Processor<P>,
    {
        self.enqueue_inner(payload, processor, None).await
    }

    /// Пакетная отправка. Результаты в порядке входных данных
    pub async fn submit_batch<P, W>(&self, payloads: Vec<P>, processor: W) -> Vec<PoolResult<W::Output>>
    where
        P: Send + 'static,
        W: Processor<P> + Clone,
    {
        if payloads.is_empty() {
            return Vec::new();
        }

        let calls = payloads
            .into_iter()
            .map(|payload| self.submit(payload, processor.clone()));
        futures::future::join_all(calls).await
    }

    async fn enqueue_inner<P, W>(
        &self,
        payload: P,
        processor: W,
        deadline: Option<Instant>,
    ) -> PoolResult<ResultHandle<W::Output>>
    where
        P: Send + 'static,
        W: Processor<P>,
    {
        if self.is_closed() {
            return Err(PoolError::WorkerClosed);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            self.state.timed_out.fetch_add(1, Ordering::Relaxed);
            return Err(PoolError::JobTimedOut);
        }

        let token = &self.state.cancellation_token;
        let (envelope, handle) = TaskEnvelope::new(payload, processor, token.child_token(), token.clone());
        let send = self.sender.send(Box::new(envelope) as BoxedJob);

        let sent = match deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(PoolError::WorkerClosed),
                res = send => res.map_err(|_| PoolError::WorkerClosed),
                _ = tokio::time::sleep_until(deadline) => {
                    self.state.timed_out.fetch_add(1, Ordering::Relaxed);
                    Err(PoolError::JobTimedOut)
                }
            },
            None => tokio::select! {
                biased;
                _ = token.cancelled() => Err(PoolError::WorkerClosed),
                res = send => res.map_err(|_| PoolError::WorkerClosed),
            },
        };
        sent?;

        self.state.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Закрывает пул, не дожидаясь работающих воркеров.
    /// Возвращает `true` только при первом вызове
    pub fn close(&self) -> bool {
        if self.state.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.state.cancellation_token.cancel();
        self.state.semaphore.close();
        tracing::info!(in_flight = self.state.in_flight.load(Ordering::Relaxed), "worker pool closed");
        true
    }

    /// Ждет, пока не останется воркеров в работе
    pub async fn join_all(&self) {
        loop {
            let notified = self.state.drained.notified();
            if self.state.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub async fn join_all_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.join_all()).await.is_ok()
    }

    pub async fn shutdown(&self) {
        self.close();
        self.join_all().await;
        tracing::info!("worker pool shut down");
    }

    pub async fn shutdown_timeout(&self, grace: Duration) -> bool {
        self.close();
        let drained = self.join_all_timeout(grace).await;
        if !drained {
            tracing::warn!(
                ?grace,
                in_flight = self.state.in_flight.load(Ordering::Relaxed),
                "workers still running after grace period"
            );
        }
        drained
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            capacity: self.state.capacity,
            in_flight: self.state.in_flight.load(Ordering::Relaxed),
            peak_in_flight: self.state.peak_in_flight.load(Ordering::Relaxed),
            submitted: self.state.submitted.load(Ordering::Relaxed),
            completed: self.state.completed.load(Ordering::Relaxed),
            timed_out: self.state.timed_out.load(Ordering::Relaxed),
            abandoned: self.state.abandoned.load(Ordering::Relaxed),
            skipped: self.state.skipped.load(Ordering::Relaxed),
            panicked: self.state.panicked.load(Ordering::Relaxed),
        }
    }

    /// Периодически отдает снимок метрик в `report`.
    ///
    /// Монитор держит только слабую ссылку и не продлевает жизнь пула.
    /// Останавливается через `stop_monitoring`, при закрытии пула
    /// или когда пул уже удален
    pub fn start_monitoring<F>(self: &Arc<Self>, period: Duration, mut report: F) -> CancellationToken
    where
        F: FnMut(PoolMetrics) + Send + 'static,
    {
        let target: Weak<Self> = Arc::downgrade(self);
        let stop = self.state.cancellation_token.child_token();
        let stopped = stop.clone();

        let mut ticks = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::spawn(async move {
            // первый тик срабатывает сразу
            ticks.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = stopped.cancelled() => break,
                    _ = ticks.tick() => match target.upgrade() {
                        Some(pool) => report(pool.metrics()),
                        None => break,
                    },
                }
            }
            tracing::debug!("pool monitoring stopped");
        });

        stop
    }

    #[inline]
    pub fn stop_monitoring(stop: CancellationToken) {
        stop.cancel();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}
