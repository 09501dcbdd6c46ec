use super::{
    errors::PoolError,
    handle::ResultHandle,
    model::Outcome,
    result::PoolResult,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;


/// Обработчик полезной нагрузки. Для замыканий `FnOnce(P) -> R` реализован автоматически
pub trait Processor<P>: Send + 'static {
    type Output: Send + 'static;

    fn process(self, payload: P) -> Self::Output;
}

impl<P, R, F> Processor<P> for F
where
    F: FnOnce(P) -> R + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    #[inline(always)]
    fn process(self, payload: P) -> R {
        self(payload)
    }
}

/// Конверт со стертым типом, в таком виде он идет через очередь задач
pub(crate) trait Job: Send {
    fn run(self: Box<Self>, worker_id: usize) -> Outcome;
}

pub(crate) type BoxedJob = Box<dyn Job>;

/// Единица работы: нагрузка, обработчик и личный канал результата
pub(crate) struct TaskEnvelope<P, W: Processor<P>> {
    payload: P,
    processor: W,
    reply: oneshot::Sender<PoolResult<W::Output>>,
    cancel_token: CancellationToken,
    worker_id: Option<usize>,
}

impl<P, W> TaskEnvelope<P, W>
where
    P: Send + 'static,
    W: Processor<P>,
{
    /// Создает конверт и парный ему handle. `cancel_token` обычно дочерний от токена пула
    pub(crate) fn new(
        payload: P,
        processor: W,
        cancel_token: CancellationToken,
        closed: CancellationToken,
    ) -> (Self, ResultHandle<W::Output>) {
        let (tx, rx) = oneshot::channel();
        let envelope = Self {
            payload,
            processor,
            reply: tx,
            cancel_token: cancel_token.clone(),
            worker_id: None,
        };
        (envelope, ResultHandle::new(cancel_token, closed, rx))
    }
}

impl<P, W> Job for TaskEnvelope<P, W>
where
    P: Send + 'static,
    W: Processor<P>,
{
    fn run(mut self: Box<Self>, worker_id: usize) -> Outcome {
        self.worker_id = Some(worker_id);

        if self.cancel_token.is_cancelled() || self.reply.is_closed() {
            tracing::debug!(worker_id, "task skipped before start");
            return Outcome::Skipped;
        }

        let Self { payload, processor, reply, worker_id, .. } = *self;

        match catch_unwind(AssertUnwindSafe(move || processor.process(payload))) {
            Ok(value) => match reply.send(Ok(value)) {
                Ok(()) => {
                    tracing::trace!(?worker_id, "result delivered");
                    Outcome::Delivered
                }
                Err(_) => {
                    tracing::debug!(?worker_id, "result abandoned by caller");
                    Outcome::Abandoned
                }
            },
            Err(panic_info) => {
                let message = panic_message(panic_info.as_ref());
                tracing::warn!(?worker_id, %message, "processor panicked");
                let _ = reply.send(Err(PoolError::Panic(message)));
                Outcome::Panicked
            }
        }
    }
}

fn panic_message(info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = info.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = info.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in processor".into()
    }
}
