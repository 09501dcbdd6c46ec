use super::model::AdmissionMode;
use tokio::runtime::{Builder, Runtime};

/// Переменная окружения, ограничивающая число потоков рантайма
pub const CPU_LIMIT_ENV: &str = "MAX_CPU_UTILIZATION";

/// Конфигурация пула воркеров
#[derive(Debug, Clone)]
pub struct Config {
    /// Число одновременно работающих воркеров (минимум 1)
    pub capacity: usize,
    pub admission: AdmissionMode,
    /// Ограничение параллелизма рантайма, прочитанное из окружения
    pub max_cpu_utilization: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: num_cpus::get(),
            admission: AdmissionMode::Strict,
            max_cpu_utilization: None,
        }
    }
}

impl Config {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        Self::with_capacity(num_cpus::get())
    }

    /// Для задач, которые в основном ждут (сеть, диск)
    pub fn io_bound() -> Self {
        Self::with_capacity(num_cpus::get() * 4)
    }

    /// Читает `MAX_CPU_UTILIZATION` один раз, при создании конфигурации
    pub fn from_env() -> Self {
        let raw = std::env::var(CPU_LIMIT_ENV).ok();
        let max_cpu_utilization = cpu_limit_from(raw.as_deref(), num_cpus::get());
        if let Some(limit) = max_cpu_utilization {
            tracing::debug!(limit, "cpu utilization limited from environment");
        }
        Self {
            max_cpu_utilization,
            ..Default::default()
        }
    }

    pub fn admission(mut self, admission: AdmissionMode) -> Self {
        self.admission = admission;
        self
    }

    #[inline]
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }

    /// Сколько потоков отдавать рантайму
    pub fn worker_threads(&self) -> usize {
        self.max_cpu_utilization.unwrap_or_else(num_cpus::get)
    }

    /// Собирает multi-thread рантайм с учетом ограничения из окружения
    pub fn build_runtime(&self) -> std::io::Result<Runtime> {
        Builder::new_multi_thread()
            .worker_threads(self.worker_threads())
            .enable_all()
            .build()
    }
}

/// Значение учитывается, только если оно положительное и меньше числа доступных CPU
pub fn cpu_limit_from(raw: Option<&str>, available: usize) -> Option<usize> {
    raw?
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n != 0 && *n < available)
}
