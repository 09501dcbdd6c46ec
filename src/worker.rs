use super::{
    envelope::BoxedJob,
    pool::PoolState,
};
use std::sync::{
    atomic::Ordering,
    Arc,
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};


/// Занятый воркером слот. Освобождается ровно один раз, когда воркер закончил
pub(crate) enum Slot {
    /// Permit взят до запуска, вернется при drop
    Owned(OwnedSemaphorePermit),
    /// Permit забирает диспетчер после запуска, воркер возвращает его вручную
    Lagged(Arc<Semaphore>),
}

impl Slot {
    #[inline]
    fn release(self) {
        match self {
            Slot::Owned(permit) => drop(permit),
            Slot::Lagged(semaphore) => semaphore.add_permits(1),
        }
    }
}

/// Запускает конверт на blocking-пуле tokio, не дожидаясь завершения
pub(crate) fn launch(state: Arc<PoolState>, job: BoxedJob, slot: Slot) {
    let in_flight = state.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
    state.peak_in_flight.fetch_max(in_flight, Ordering::AcqRel);

    let worker_id = in_flight;
    tracing::debug!(worker_id, in_flight, capacity = state.capacity, "worker launched");

    tokio::task::spawn_blocking(move || {
        let outcome = job.run(worker_id);
        state.record(outcome);

        // счетчик уменьшаем до возврата слота, иначе пик может превысить границу
        if state.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            state.drained.notify_waiters();
        }
        slot.release();
        tracing::debug!(worker_id, ?outcome, "worker finished");
    });
}
