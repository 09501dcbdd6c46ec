use bounded_pool::{global, Config, PoolError};
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};


fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("POOL_LOG").as_deref() {
            Ok("trace") => "trace",
            Ok("debug") => "debug",
            Ok("warn") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("bounded_pool={level}"))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() -> std::io::Result<()> {
    init_tracing();

    let config = Config::from_env();
    let rt = config.build_runtime()?;

    rt.block_on(async {
        let now = Instant::now();
        let pool = global::initialize(2)?;

        let results = pool.submit_batch((1..=5u64).collect::<Vec<_>>(), |x: u64| x * x).await;
        for (input, result) in (1..=5).zip(results) {
            match result {
                Ok(square) => println!("{input}^2 = {square}"),
                Err(e) => eprintln!("{input}: {e}"),
            }
        }

        pool.shutdown().await;
        println!("elapsed: {:?}", now.elapsed());
        Ok::<(), PoolError>(())
    })
    .map_err(std::io::Error::other)
}
