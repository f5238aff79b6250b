//! Demo workloads for the `tt` binary

use std::time::Duration;

use eyre::{Result, eyre};
use rand::Rng;
use serde::Serialize;

use crate::config::DemoConfig;
use crate::operation::{Operation, Outcome};
use crate::throttler::ThrottlerStats;

/// n-th Fibonacci number, counting from `fib(1) == 1`
pub fn fib(n: u32) -> Result<u128> {
    if n == 0 {
        return Err(eyre!("Fibonacci position must be at least 1"));
    }

    let (mut a, mut b) = (0u128, 1u128);
    for _ in 1..n {
        let next = a.checked_add(b).ok_or_else(|| eyre!("fib({}) overflows u128", n))?;
        a = b;
        b = next;
    }
    Ok(b)
}

/// Build the demo workload: quick jobs with throttled and failing ones mixed in
///
/// Throttled jobs sit in the middle of the submission list so they land in a
/// later batch than the first quick jobs.
pub fn workload(demo: &DemoConfig) -> Vec<Operation<u64, eyre::Report>> {
    let mut rng = rand::rng();
    let max_ms = demo.max_task_ms.max(1);

    let mut quick: Vec<_> = (0..demo.tasks)
        .map(|i| {
            let delay = Duration::from_millis(rng.random_range(0..max_ms));
            let value = rng.random_range(1..1000);
            quick_job(format!("job-{}", i), delay, value)
        })
        .collect();

    let tail = quick.split_off(quick.len() / 2);
    let mut jobs = quick;
    for i in 0..demo.throttled {
        let value = rng.random_range(1..1000);
        jobs.push(throttled_job(format!("throttled-{}", i), demo.throttle_count, value));
    }
    for i in 0..demo.failing {
        jobs.push(failing_job(format!("failing-{}", i)));
    }
    jobs.extend(tail);
    jobs
}

fn quick_job(name: String, delay: Duration, value: u64) -> Operation<u64, eyre::Report> {
    Operation::named(name, async move {
        tokio::time::sleep(delay).await;
        Outcome::Success(value)
    })
}

/// A job that asks to be retried `remaining` more times before succeeding
pub fn throttled_job(name: String, remaining: u32, value: u64) -> Operation<u64, eyre::Report> {
    let retry_name = name.clone();
    Operation::named(name, async move {
        if remaining == 0 {
            Outcome::Success(value)
        } else {
            Outcome::Retry(throttled_job(retry_name, remaining - 1, value))
        }
    })
}

fn failing_job(name: String) -> Operation<u64, eyre::Report> {
    let message = format!("{} gave up", name);
    Operation::named(name, async move { Outcome::Failure(eyre!(message)) })
}

/// Printable summary of a demo run
#[derive(Debug, Clone, Serialize)]
pub struct DemoSummary {
    pub jobs: usize,
    pub elapsed_ms: u128,
    pub stats: ThrottlerStats,
    pub failures: Vec<String>,
}
