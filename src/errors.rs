use thiserror::Error;

/// Ошибки, которые пул возвращает вызывающему коду
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum PoolError {
    /// Пул закрыт: задача не принята или результат уже не придет
    #[error("no active jobs")]
    WorkerClosed,
    /// Дедлайн истек до приема задачи или до получения результата
    #[error("request timed out")]
    JobTimedOut,
    /// Задача отменена через `ResultHandle::cancel` до запуска
    #[error("job cancelled")]
    Cancelled,
    /// Обработчик запаниковал внутри воркера
    #[error("worker panicked: {0}")]
    Panic(String),
    /// Пул создается вне рантайма tokio, диспетчер запускать негде
    #[error("no tokio runtime")]
    RuntimeUnavailable,
}

impl PoolError {
    /// Короткая стабильная метка для логов
    pub fn as_label(&self) -> &'static str {
        match self {
            PoolError::WorkerClosed => "worker_closed",
            PoolError::JobTimedOut => "job_timed_out",
            PoolError::Cancelled => "job_cancelled",
            PoolError::Panic(_) => "worker_panic",
            PoolError::RuntimeUnavailable => "runtime_unavailable",
        }
    }
}
