//! Пул на весь процесс. Создается один раз, дальше возвращается тот же экземпляр.
//!
//! Диспетчер живет в рантайме, где был первый вызов `initialize`,
//! поэтому этот рантайм должен жить столько же, сколько и пул.

use super::{
    config::Config,
    pool::{SharedPool, WorkerPool},
    result::PoolResult,
};
use std::sync::OnceLock;

static POOL: OnceLock<SharedPool> = OnceLock::new();

/// Первый вызов создает пул на `capacity` слотов, остальные вызовы
/// возвращают его же, аргумент игнорируется.
///
/// Вне рантайма tokio возвращает `RuntimeUnavailable`, пул не создается
pub fn initialize(capacity: usize) -> PoolResult<SharedPool> {
    if let Some(pool) = POOL.get() {
        return Ok(pool.clone());
    }

    let config = Config {
        capacity,
        ..Config::from_env()
    };
    let pool = WorkerPool::try_with_config(config)?;
    // при гонке проигравший пул дропается и закрывается сам
    Ok(POOL.get_or_init(|| pool).clone())
}

pub fn get() -> Option<SharedPool> {
    POOL.get().cloned()
}

/// `false`, если пул не создавался или уже закрыт
pub fn close() -> bool {
    POOL.get().is_some_and(|pool| pool.close())
}
