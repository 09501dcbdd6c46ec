#[cfg(test)]
mod tests {
    use bounded_pool::{
        config::Config,
        errors::PoolError,
        model::AdmissionMode,
        pool::{SharedPool, WorkerPool},
    };
    use futures::future::join_all;
    use std::{
        collections::HashSet,
        future::Future,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    async fn measure<F, Fut, T>(name: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed();
        println!("✓ {}: {:?}", name, elapsed);
        result
    }

    /// Отслеживает, сколько обработчиков реально выполняется одновременно
    #[derive(Clone, Default)]
    struct ConcurrencyTracker {
        current: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    impl ConcurrencyTracker {
        fn run(&self, hold: Duration) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(hold);
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn max(&self) -> usize {
            self.max.load(Ordering::SeqCst)
        }
    }

    async fn flood(pool: &SharedPool, calls: usize, tracker: &ConcurrencyTracker) {
        flood_with_hold(pool, calls, tracker, Duration::from_millis(20)).await
    }

    async fn flood_with_hold(pool: &SharedPool, calls: usize, tracker: &ConcurrencyTracker, hold: Duration) {
        let handles: Vec<_> = (0..calls)
            .map(|i| {
                let pool = pool.clone();
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    pool.submit(i, move |x: usize| {
                        tracker.run(hold);
                        x
                    })
                    .await
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let result = handle.await.expect("задача не должна паниковать");
            assert_eq!(result, Ok(i));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_1_five_squares() {
        println!("\n=== LOAD TEST 1: 5 квадратов на пуле из 2 ===");
        let pool = WorkerPool::new(2);

        let handles: Vec<_> = (1..=5u64)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move { (i, pool.submit(i, |x: u64| x * x).await) })
            })
            .collect();

        let mut squares = HashSet::new();
        for handle in handles {
            let (input, result) = handle.await.expect("задача не должна паниковать");
            assert_eq!(result, Ok(input * input), "результат пришел не своему вызову");
            squares.insert(input * input);
        }

        assert_eq!(squares, HashSet::from([1, 4, 9, 16, 25]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_2_lagged_admission_bound() {
        println!("\n=== LOAD TEST 2: Совместимый режим, не больше capacity + 1 ===");
        let capacity = 3;
        let pool = WorkerPool::with_config(
            Config::with_capacity(capacity).admission(AdmissionMode::Lagged),
        );
        let tracker = ConcurrencyTracker::default();

        measure("30 calls @ 20ms", || flood(&pool, 30, &tracker)).await;
        assert!(pool.join_all_timeout(Duration::from_secs(5)).await);

        let metrics = pool.metrics();
        println!("  Пик воркеров: {}, пик обработчиков: {}", metrics.peak_in_flight, tracker.max());
        assert!(tracker.max() <= capacity + 1);
        assert!(metrics.peak_in_flight <= capacity + 1);
        assert_eq!(metrics.completed, 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_2b_lagged_admission_reaches_extra_slot() {
        println!("\n=== LOAD TEST 2b: Совместимый режим занимает лишний слот ===");
        let capacity = 2;
        let pool = WorkerPool::with_config(
            Config::with_capacity(capacity).admission(AdmissionMode::Lagged),
        );
        let tracker = ConcurrencyTracker::default();

        measure("10 calls @ 100ms", || {
            flood_with_hold(&pool, 10, &tracker, Duration::from_millis(100))
        })
        .await;
        assert!(pool.join_all_timeout(Duration::from_secs(5)).await);

        // диспетчер запускает воркер до захвата слота, поэтому при насыщении
        // работает ровно capacity + 1
        let metrics = pool.metrics();
        println!("  Пик воркеров: {}, пик обработчиков: {}", metrics.peak_in_flight, tracker.max());
        assert_eq!(metrics.peak_in_flight, capacity + 1);
        assert_eq!(tracker.max(), capacity + 1);
        assert_eq!(metrics.completed, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_3_strict_admission_bound() {
        println!("\n=== LOAD TEST 3: Строгий режим, не больше capacity ===");
        let capacity = 3;
        let pool = WorkerPool::new(capacity);
        let tracker = ConcurrencyTracker::default();

        measure("30 calls @ 20ms", || flood(&pool, 30, &tracker)).await;
        assert!(pool.join_all_timeout(Duration::from_secs(5)).await);

        let metrics = pool.metrics();
        println!("  Пик воркеров: {}, пик обработчиков: {}", metrics.peak_in_flight, tracker.max());
        assert!(tracker.max() <= capacity);
        assert!(metrics.peak_in_flight <= capacity);
        assert!(metrics.peak_in_flight >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_4_batch_keeps_order() {
        println!("\n=== LOAD TEST 4: Пакет из 1k задач ===");
        let pool = WorkerPool::with_config(Config::cpu_bound());

        let items: Vec<u64> = (0..1_000).collect();
        let results = measure("1k squares", || pool.submit_batch(items, |x: u64| x * x)).await;

        assert_eq!(results.len(), 1_000);
        for (i, result) in results.into_iter().enumerate() {
            assert_eq!(result, Ok((i * i) as u64));
        }

        let metrics = pool.metrics();
        println!("  Успешно: {}/{}", metrics.completed, metrics.submitted);
        assert_eq!(metrics.submitted, 1_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_5_mixed_deadlines_do_not_leak() {
        println!("\n=== LOAD TEST 5: Смешанные дедлайны ===");
        let pool = WorkerPool::new(4);

        let calls = (0..40u64).map(|i| {
            let timeout = if i % 2 == 0 {
                Duration::from_millis(5)
            } else {
                Duration::from_secs(10)
            };
            pool.submit_with_deadline(
                i,
                |x: u64| {
                    std::thread::sleep(Duration::from_millis(15));
                    x
                },
                timeout,
            )
        });
        let results = measure("40 calls", || join_all(calls)).await;

        for (i, result) in results.into_iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(result, Err(PoolError::JobTimedOut));
            } else {
                assert_eq!(result, Ok(i as u64));
            }
        }

        assert!(pool.join_all_timeout(Duration::from_secs(5)).await, "воркеры не должны зависать");
        let metrics = pool.metrics();
        assert_eq!(metrics.in_flight, 0);
        assert_eq!(metrics.timed_out, 20);
        assert_eq!(metrics.completed, 20);
        println!("  Брошено: {}, пропущено: {}", metrics.abandoned, metrics.skipped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn load_test_6_close_under_load() {
        println!("\n=== LOAD TEST 6: Закрытие под нагрузкой ===");
        let pool = WorkerPool::new(2);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    pool.submit(i, |x: i32| {
                        std::thread::sleep(Duration::from_millis(30));
                        x
                    })
                    .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(40)).await;
        pool.close();

        for handle in handles {
            match handle.await.expect("закрытие не должно приводить к панике") {
                Ok(_) | Err(PoolError::WorkerClosed) => {}
                Err(e) => panic!("неожиданная ошибка: {:?}", e),
            }
        }

        assert!(pool.shutdown_timeout(Duration::from_secs(5)).await);
    }
}
