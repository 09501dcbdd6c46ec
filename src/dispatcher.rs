use super::{
    envelope::BoxedJob,
    model::AdmissionMode,
    pool::PoolState,
    worker::{self, Slot},
};
use std::sync::Arc;
use tokio::{runtime::Handle, sync::mpsc};


/// Единственный цикл, который принимает конверты и запускает воркеры
pub(crate) struct Dispatcher {
    state: Arc<PoolState>,
    receiver: mpsc::Receiver<BoxedJob>,
}

impl Dispatcher {
    pub(crate) fn spawn(runtime: &Handle, state: Arc<PoolState>, receiver: mpsc::Receiver<BoxedJob>) {
        let dispatcher = Self { state, receiver };
        runtime.spawn(dispatcher.run());
    }

    async fn run(mut self) {
        loop {
            let job = tokio::select! {
                biased;
                _ = self.state.cancellation_token.cancelled() => break,
                next = self.receiver.recv() => match next {
                    Some(job) => job,
                    None => break,
                },
            };

            let admitted = match self.state.admission {
                AdmissionMode::Strict => self.admit_then_launch(job).await,
                AdmissionMode::Lagged => self.launch_then_admit(job).await,
            };
            if !admitted {
                break;
            }
        }

        // все, что осталось в очереди, дропается: вызывающие получат WorkerClosed
        self.receiver.close();
        tracing::debug!("dispatcher stopped");
    }

    async fn admit_then_launch(&self, job: BoxedJob) -> bool {
        let permit = tokio::select! {
            biased;
            _ = self.state.cancellation_token.cancelled() => return false,
            permit = self.state.semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => return false,
            },
        };
        worker::launch(self.state.clone(), job, Slot::Owned(permit));
        true
    }

    /// Запуск без ожидания слота, затем занимаем слот. Пока насыщено, цикл стоит здесь
    async fn launch_then_admit(&self, job: BoxedJob) -> bool {
        worker::launch(self.state.clone(), job, Slot::Lagged(self.state.semaphore.clone()));

        let permit = tokio::select! {
            biased;
            _ = self.state.cancellation_token.cancelled() => return false,
            permit = self.state.semaphore.acquire() => permit,
        };
        match permit {
            Ok(p) => {
                p.forget();
                true
            }
            Err(_) => false,
        }
    }
}
