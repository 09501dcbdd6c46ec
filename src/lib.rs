//! Пул воркеров с ограниченной конкурентностью поверх tokio
//!
//! # Features
//! - Единственный диспетчер и семафор допуска: не больше `capacity` воркеров одновременно
//! - Два режима допуска: строгий и совместимый (+1 воркер сверх лимита)
//! - Отправка с дедлайном, без утечек воркеров при истечении
//! - Чистое закрытие: вызовы после `close` получают `WorkerClosed`, а не панику
//! - Паники обработчиков перехватываются и возвращаются как ошибка
//! - Метрики и периодический мониторинг

pub mod config;
mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod global;
pub mod handle;
pub mod model;
pub mod pool;
pub mod result;
mod worker;

pub use config::Config;
pub use envelope::Processor;
pub use errors::PoolError;
pub use handle::ResultHandle;
pub use model::{AdmissionMode, PoolMetrics};
pub use pool::{SharedPool, WorkerPool};
pub use result::PoolResult;
