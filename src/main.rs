use std::{sync::Arc, time::Duration};

use clap::Parser;
use memocall::{
    cli::{Args, Runtime},
    helpers,
    logging::{self, LogSettings},
    CacheConfig, Memoizer,
};
use tracing::info;

#[tokio::main]
async fn main() -> memocall::Result<()> {
    let args = Args::parse();

    logging::init(&LogSettings {
        level: args.log_level.clone(),
        json: args.log_json,
    })?;

    let config = match &args.config {
        Some(path) => CacheConfig::from_json_file(path)?,
        None => CacheConfig::default(),
    };

    match args.subcommand {
        Runtime::Demo {
            tasks,
            calls,
            keys,
            work_ms,
        } => demo(&config, tasks, calls, keys.max(1), work_ms).await?,
        Runtime::Hash { password, cost } => {
            println!("{}", helpers::password::hash_password_with_cost(&password, cost)?)
        }
        Runtime::Verify { password, hash } => {
            println!("{}", helpers::password::verify_password(&password, &hash)?)
        }
        Runtime::Random { len, min, max } => match (min, max) {
            (Some(min), Some(max)) => match helpers::random::random_number(min..max) {
                Some(n) => println!("{n}"),
                None => println!("empty range"),
            },
            _ => println!("{}", helpers::random::random_string(len)),
        },
    }

    Ok(())
}

async fn slow_square(x: u64, work: Duration) -> u64 {
    tokio::time::sleep(work).await;
    x * x
}

async fn demo(
    config: &CacheConfig,
    tasks: usize,
    calls: usize,
    keys: u64,
    work_ms: u64,
) -> memocall::Result<()> {
    let cache = Arc::new(Memoizer::from_config(config)?);
    let _sweeper = config
        .sweep_interval()
        .map(|every| cache.spawn_sweeper(every));

    info!(ttl = ?cache.ttl(), tasks, calls, keys, "starting demo");

    let work = Duration::from_millis(work_ms);
    let mut handles = Vec::with_capacity(tasks);
    for task in 0..tasks {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let square = move |x: u64| slow_square(x, work);
            for call in 0..calls {
                let x = ((task + call) as u64) % keys;
                cache.call_async_named("slow_square", &square, (x,)).await?;
            }
            Ok::<_, memocall::Error>(())
        }));
    }

    for handle in handles {
        handle.await??;
    }

    println!("{}", serde_json::to_string_pretty(&cache.stats())?);
    Ok(())
}
