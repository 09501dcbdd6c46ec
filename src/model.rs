/// Как диспетчер занимает слот под воркер
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionMode {
    /// Слот занимается до запуска воркера: одновременно не больше `capacity`
    #[default]
    Strict,
    /// Воркер запускается сразу, слот занимается после.
    /// Допускает одного лишнего воркера сверх `capacity`
    Lagged,
}

impl AdmissionMode {
    /// Верхняя граница одновременно работающих воркеров
    pub fn concurrency_bound(&self, capacity: usize) -> usize {
        match self {
            AdmissionMode::Strict => capacity,
            AdmissionMode::Lagged => capacity + 1,
        }
    }
}

/// Чем закончилось выполнение одного конверта
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Delivered,
    /// Результат посчитан, но вызывающий уже ушел
    Abandoned,
    /// Обработчик не запускался: отмена или вызывающий ушел до старта
    Skipped,
    Panicked,
}

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub capacity: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub submitted: usize,
    pub completed: usize,
    pub timed_out: usize,
    pub abandoned: usize,
    pub skipped: usize,
    pub panicked: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.in_flight as f64 / self.capacity as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.abandoned + self.skipped + self.panicked;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }
}
