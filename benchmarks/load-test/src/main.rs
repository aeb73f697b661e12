//! Catalog load generator.
//!
//! Simulates concurrent clients against a running catalog server. Run it
//! once against an eager server and once against a lazy one to compare the
//! two fetch modes under the same workload.
//!
//! Usage:
//!   cargo run -p catalog-loadtest -- --base-url http://localhost:8080 --users 50 --duration 60

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::Parser;
use futures::future::join_all;
use parking_lot::Mutex;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::{Value, json};

/// Load test configuration.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the catalog server.
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Number of concurrent users.
    #[arg(long, default_value = "50")]
    users: usize,

    /// Test duration in seconds.
    #[arg(long, default_value = "60")]
    duration: u64,

    /// Think time between requests in milliseconds.
    #[arg(long, default_value = "0")]
    think_time: u64,

    /// Page size used by list requests.
    #[arg(long, default_value = "50")]
    page_size: u32,

    /// Workload mix: percentage of list requests (0-100).
    #[arg(long, default_value = "60")]
    list_pct: u8,

    /// Workload mix: percentage of single-item reads (0-100).
    #[arg(long, default_value = "30")]
    detail_pct: u8,

    /// Base seed for the per-user request generators.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the results as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

/// Load test statistics.
#[derive(Debug, Clone, Serialize)]
struct Stats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    total_duration_ms: u64,
    min_latency_ms: u64,
    max_latency_ms: u64,
    avg_latency_ms: f64,
    p50_latency_ms: u64,
    p95_latency_ms: u64,
    p99_latency_ms: u64,
    requests_per_second: f64,
}

/// Atomic counters for thread-safe statistics.
struct AtomicStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    latencies: Mutex<Vec<u64>>,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            latencies: Mutex::new(Vec::with_capacity(100_000)),
        }
    }

    fn record_request(&self, success: bool, latency_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.latencies.lock().push(latency_ms);
    }

    fn compute_stats(&self, elapsed: Duration) -> Stats {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);

        let mut latencies = self.latencies.lock().clone();
        latencies.sort_unstable();

        let min = latencies.first().copied().unwrap_or(0);
        let max = latencies.last().copied().unwrap_or(0);
        let avg = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
        };

        let percentile = |p: f64| -> u64 {
            if latencies.is_empty() {
                return 0;
            }
            let idx = ((latencies.len() as f64 * p) as usize).min(latencies.len() - 1);
            latencies[idx]
        };

        let secs = elapsed.as_secs_f64();
        Stats {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            total_duration_ms: elapsed.as_millis() as u64,
            min_latency_ms: min,
            max_latency_ms: max,
            avg_latency_ms: avg,
            p50_latency_ms: percentile(0.5),
            p95_latency_ms: percentile(0.95),
            p99_latency_ms: percentile(0.99),
            requests_per_second: if secs > 0.0 { total as f64 / secs } else { 0.0 },
        }
    }
}

/// Row counts discovered before the run; request ids are drawn from them.
#[derive(Debug, Clone, Copy)]
struct Dataset {
    categories: u64,
    items: u64,
}

/// One generated request.
#[derive(Debug, PartialEq)]
enum Op {
    ListItems { page: u64 },
    ListCategoryItems { category_id: u64, page: u64 },
    ListCategories { page: u64 },
    GetItem { id: u64 },
    CreateAndDelete { category_id: u64 },
}

impl Op {
    /// Draw an operation according to the workload mix.
    fn pick(rng: &mut StdRng, args: &Args, data: Dataset) -> Self {
        let size = u64::from(args.page_size.max(1));
        let item_pages = data.items.div_ceil(size).max(1);
        let category_id = rng.gen_range(1..=data.categories.max(1));

        let roll: u8 = rng.gen_range(0..100);
        if roll < args.list_pct {
            match rng.gen_range(0..3) {
                0 => Op::ListItems {
                    page: rng.gen_range(0..item_pages),
                },
                1 => Op::ListCategoryItems {
                    category_id,
                    page: 0,
                },
                _ => Op::ListCategories {
                    page: rng.gen_range(0..data.categories.div_ceil(size).max(1)),
                },
            }
        } else if roll < args.list_pct.saturating_add(args.detail_pct) {
            Op::GetItem {
                id: rng.gen_range(1..=data.items.max(1)),
            }
        } else {
            Op::CreateAndDelete { category_id }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if u16::from(args.list_pct) + u16::from(args.detail_pct) > 100 {
        bail!("--list-pct plus --detail-pct must not exceed 100");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to create HTTP client")?;

    let fetch = check_health(&client, &args.base_url).await?;
    let data = Dataset {
        categories: total_elements(&client, &format!("{}/categories?size=1", args.base_url))
            .await?,
        items: total_elements(&client, &format!("{}/items?size=1", args.base_url)).await?,
    };
    if data.categories == 0 || data.items == 0 {
        bail!("server has no data; run `catalog seed` first");
    }

    if !args.json {
        println!("Catalog Load Test");
        println!("=================");
        println!("Base URL:         {}", args.base_url);
        println!("Fetch mode:       {fetch}");
        println!("Data set:         {} categories, {} items", data.categories, data.items);
        println!("Concurrent users: {}", args.users);
        println!("Duration:         {} seconds", args.duration);
        println!(
            "Workload:         {}% list, {}% detail, {}% write",
            args.list_pct,
            args.detail_pct,
            100 - args.list_pct - args.detail_pct
        );
        println!();
        println!("Starting load test...");
    }

    let args = Arc::new(args);
    let stats = Arc::new(AtomicStats::new());
    let base_seed = args.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    let start_time = Instant::now();

    let handles = (0..args.users).map(|user_id| {
        let client = client.clone();
        let args = Arc::clone(&args);
        let stats = Arc::clone(&stats);
        let rng = StdRng::seed_from_u64(base_seed.wrapping_add(user_id as u64));
        tokio::spawn(async move { run_user(user_id, client, args, data, stats, rng).await })
    });
    join_all(handles).await;

    let results = stats.compute_stats(start_time.elapsed());

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "fetch": fetch, "stats": results }))?
        );
        return Ok(());
    }

    let success_rate = if results.total_requests == 0 {
        0.0
    } else {
        results.successful_requests as f64 / results.total_requests as f64 * 100.0
    };

    println!("\nResults ({fetch})");
    println!("=======");
    println!("Total requests:      {}", results.total_requests);
    println!("Successful requests: {}", results.successful_requests);
    println!("Failed requests:     {}", results.failed_requests);
    println!("Success rate:        {success_rate:.2}%");
    println!();
    println!("Requests/second:     {:.2}", results.requests_per_second);
    println!();
    println!("Latency (ms):");
    println!("  Min:  {}", results.min_latency_ms);
    println!("  Avg:  {:.2}", results.avg_latency_ms);
    println!("  P50:  {}", results.p50_latency_ms);
    println!("  P95:  {}", results.p95_latency_ms);
    println!("  P99:  {}", results.p99_latency_ms);
    println!("  Max:  {}", results.max_latency_ms);

    if results.failed_requests > 0 {
        println!();
        println!("WARN: {} failed requests", results.failed_requests);
    }

    Ok(())
}

/// Verify the server is up and return its fetch mode.
async fn check_health(client: &reqwest::Client, base_url: &str) -> Result<String> {
    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .with_context(|| format!("failed to connect to {base_url}"))?;
    if !resp.status().is_success() {
        bail!("server returned error status: {}", resp.status());
    }
    let body: Value = resp.json().await.context("health body is not JSON")?;
    Ok(body["fetch"].as_str().unwrap_or("unknown").to_string())
}

/// Read `totalElements` from a page envelope.
async fn total_elements(client: &reqwest::Client, url: &str) -> Result<u64> {
    let body: Value = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?
        .error_for_status()?
        .json()
        .await
        .context("page body is not JSON")?;
    body["totalElements"]
        .as_u64()
        .with_context(|| format!("no totalElements in response from {url}"))
}

/// Simulate a single user making requests until the duration elapses.
async fn run_user(
    user_id: usize,
    client: reqwest::Client,
    args: Arc<Args>,
    data: Dataset,
    stats: Arc<AtomicStats>,
    mut rng: StdRng,
) {
    let duration = Duration::from_secs(args.duration);
    let base = args.base_url.as_str();
    let size = args.page_size;
    let start = Instant::now();
    let mut written = 0u64;

    while start.elapsed() < duration {
        let op = Op::pick(&mut rng, &args, data);

        let req_start = Instant::now();
        let success = match op {
            Op::ListItems { page } => {
                get_ok(&client, format!("{base}/items?page={page}&size={size}")).await
            }
            Op::ListCategoryItems { category_id, page } => {
                get_ok(
                    &client,
                    format!("{base}/categories/{category_id}/items?page={page}&size={size}"),
                )
                .await
            }
            Op::ListCategories { page } => {
                get_ok(&client, format!("{base}/categories?page={page}&size={size}")).await
            }
            // Ids have gaps after deletes, so a miss is not a failure.
            Op::GetItem { id } => matches!(
                client.get(format!("{base}/items/{id}")).send().await,
                Ok(resp) if resp.status().is_success() || resp.status().as_u16() == 404
            ),
            Op::CreateAndDelete { category_id } => {
                written += 1;
                create_and_delete(&client, base, user_id, written, category_id).await
            }
        };
        stats.record_request(success, req_start.elapsed().as_millis() as u64);

        if args.think_time > 0 {
            tokio::time::sleep(Duration::from_millis(args.think_time)).await;
        }
    }
}

async fn get_ok(client: &reqwest::Client, url: String) -> bool {
    matches!(client.get(url).send().await, Ok(resp) if resp.status().is_success())
}

/// Create an item and remove it again so the data set stays stable.
async fn create_and_delete(
    client: &reqwest::Client,
    base: &str,
    user_id: usize,
    n: u64,
    category_id: u64,
) -> bool {
    let body = json!({
        "sku": format!("LT-{user_id}-{n}"),
        "name": format!("Load Test Item {user_id}-{n}"),
        "price": 9.99,
        "stock": 1,
        "categoryId": category_id,
    });

    let Ok(resp) = client.post(format!("{base}/items")).json(&body).send().await else {
        return false;
    };
    if !resp.status().is_success() {
        return false;
    }
    let Ok(created) = resp.json::<Value>().await else {
        return false;
    };
    let Some(id) = created["id"].as_i64() else {
        return false;
    };

    matches!(
        client.delete(format!("{base}/items/{id}")).send().await,
        Ok(resp) if resp.status().is_success()
    )
}
