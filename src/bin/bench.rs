//! Xanadu Benchmark Driver
//!
//! Runs a YCSB-style load + run workload against the Xanadu binding.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use xanadu_ycsb::config::REGISTRIES_PROPERTY;
use xanadu_ycsb::store::InProcessConnector;
use xanadu_ycsb::{Config, Db, Properties, Record, Status, XanaduClient};

/// Xanadu benchmark driver
#[derive(Parser, Debug)]
#[command(name = "xanadu-bench")]
#[command(about = "Run a YCSB-style workload against the Xanadu binding")]
#[command(version)]
struct Args {
    /// Property files to load (later files override earlier ones)
    #[arg(short = 'P', long = "property-file")]
    property_files: Vec<PathBuf>,

    /// Individual properties as key=value (override property files)
    #[arg(short = 'p', long = "property", value_parser = parse_property)]
    properties: Vec<(String, String)>,

    /// Table name handed to the binding
    #[arg(long, default_value = "usertable")]
    table: String,

    /// Records inserted during the load phase
    #[arg(long, default_value = "1000")]
    records: usize,

    /// Operations executed during the run phase
    #[arg(long, default_value = "10000")]
    operations: usize,

    /// Worker threads (one client each)
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Relative weight of reads
    #[arg(long, default_value = "50")]
    read_proportion: usize,

    /// Relative weight of updates
    #[arg(long, default_value = "45")]
    update_proportion: usize,

    /// Relative weight of inserts of new keys
    #[arg(long, default_value = "5")]
    insert_proportion: usize,

    /// Relative weight of deletes
    #[arg(long, default_value = "0")]
    delete_proportion: usize,

    /// Fields per record
    #[arg(long, default_value = "10")]
    field_count: usize,

    /// Bytes per field value
    #[arg(long, default_value = "100")]
    field_length: usize,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    Properties::parse_assignment(raw).map_err(|e| e.to_string())
}

/// Workload operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Op {
    Read,
    Update,
    Insert,
    Delete,
}

/// Per-operation outcome counters
#[derive(Debug, Default, Clone)]
struct OpStats {
    ok: u64,
    errors: u64,
    latency: Duration,
}

type Report = BTreeMap<Op, OpStats>;

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xanadu_ycsb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Xanadu benchmark driver v{}", xanadu_ycsb::VERSION);

    let properties = match collect_properties(&args) {
        Ok(props) => props,
        Err(e) => {
            tracing::error!("Failed to load properties: {}", e);
            std::process::exit(1);
        }
    };

    // Fail fast on bad configuration before spawning anything
    let config = match Config::from_properties(&properties) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Backend: {}, replicas: {}", config.backend, config.replicas);

    let connector = Arc::new(InProcessConnector::new());

    // Load phase
    let started = Instant::now();
    let load = match load_phase(&args, &properties, &connector) {
        Some(report) => report,
        None => std::process::exit(1),
    };
    print_report("LOAD", &load, started.elapsed());

    // Run phase
    let started = Instant::now();
    let threads = args.threads.max(1);
    let run = crossbeam::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                let args = &args;
                let properties = &properties;
                let connector = &connector;
                scope.spawn(move |_| run_worker(worker, threads, args, properties, connector))
            })
            .collect();

        gather_reports(workers.into_iter().map(|handle| handle.join()))
    });

    let (report, missing) = match run {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!("Run phase scope panicked");
            std::process::exit(1);
        }
    };

    print_report("RUN", &report, started.elapsed());
    if missing > 0 {
        tracing::error!("{} of {} workers missing from the RUN report", missing, threads);
        std::process::exit(1);
    }
}

/// Defaults, then property files in order, then `-p` overrides
fn collect_properties(args: &Args) -> xanadu_ycsb::Result<Properties> {
    let mut properties = Properties::new();
    properties.set(REGISTRIES_PROPERTY, "localhost");

    for path in &args.property_files {
        properties.merge(Properties::load(path)?);
    }
    for (key, value) in &args.properties {
        properties.set(key.clone(), value.clone());
    }

    Ok(properties)
}

fn open_client(properties: &Properties, connector: &Arc<InProcessConnector>) -> Option<XanaduClient> {
    let mut client = XanaduClient::from_properties(properties.clone(), connector.clone());
    if client.init() != Status::Ok {
        tracing::error!("Client initialization failed");
        return None;
    }
    Some(client)
}

fn close_client(mut client: XanaduClient) -> Status {
    let status = client.cleanup();
    if status != Status::Ok {
        tracing::error!("Client cleanup failed");
    }
    status
}

fn load_phase(args: &Args, properties: &Properties, connector: &Arc<InProcessConnector>) -> Option<Report> {
    let client = open_client(properties, connector)?;
    let mut report = Report::new();

    for n in 0..args.records {
        let record = build_record(n, args.field_count, args.field_length);
        let key = record_key(n);
        timed(&mut report, Op::Insert, || client.insert(&args.table, &key, &record));
    }

    close_client(client);
    Some(report)
}

fn run_worker(
    worker: usize,
    threads: usize,
    args: &Args,
    properties: &Properties,
    connector: &Arc<InProcessConnector>,
) -> Option<Report> {
    let client = open_client(properties, connector)?;
    let mut report = Report::new();
    let mut result = Record::new();

    for n in (worker..args.operations).step_by(threads) {
        let key = record_key(pick_existing(n, args.records));

        match choose_op(n, args) {
            Op::Read => {
                result = Record::new();
                timed(&mut report, Op::Read, || client.read(&args.table, &key, None, &mut result));
            }
            Op::Update => {
                let record = build_record(n, args.field_count, args.field_length);
                timed(&mut report, Op::Update, || client.update(&args.table, &key, &record));
            }
            Op::Insert => {
                let key = record_key(args.records + n);
                let record = build_record(n, args.field_count, args.field_length);
                timed(&mut report, Op::Insert, || client.insert(&args.table, &key, &record));
            }
            Op::Delete => {
                timed(&mut report, Op::Delete, || client.delete(&args.table, &key));
            }
        }
    }

    tracing::debug!(worker, last_read_fields = result.len(), "Worker finished");
    close_client(client);
    Some(report)
}

/// Deterministic weighted choice: operation `n` lands in a slot of the
/// cumulative proportions
fn choose_op(n: usize, args: &Args) -> Op {
    let weights = [
        (Op::Read, args.read_proportion),
        (Op::Update, args.update_proportion),
        (Op::Insert, args.insert_proportion),
        (Op::Delete, args.delete_proportion),
    ];
    let total: usize = weights.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return Op::Read;
    }

    let mut slot = n.wrapping_mul(37) % total;
    for (op, weight) in weights {
        if slot < weight {
            return op;
        }
        slot -= weight;
    }
    Op::Read
}

/// Spread accesses over the loaded key space
fn pick_existing(n: usize, records: usize) -> usize {
    if records == 0 {
        return 0;
    }
    n.wrapping_mul(7919) % records
}

fn record_key(n: usize) -> String {
    format!("user{}", n)
}

fn build_record(n: usize, field_count: usize, field_length: usize) -> Record {
    (0..field_count)
        .map(|f| {
            let fill = b'a' + ((n + f) % 26) as u8;
            (format!("field{}", f), vec![fill; field_length])
        })
        .collect()
}

fn timed<F: FnOnce() -> Status>(report: &mut Report, op: Op, call: F) {
    let started = Instant::now();
    let status = call();
    let stats = report.entry(op).or_default();
    stats.latency += started.elapsed();
    match status {
        Status::Ok => stats.ok += 1,
        Status::Error => stats.errors += 1,
    }
}

/// Merge worker reports, counting workers that panicked or never started
fn gather_reports<I>(outcomes: I) -> (Report, usize)
where
    I: IntoIterator<Item = std::thread::Result<Option<Report>>>,
{
    let mut report = Report::new();
    let mut missing = 0;
    for (worker, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(worker_report)) => report = merge_reports(report, worker_report),
            Ok(None) => {
                tracing::error!(worker, "Worker failed to start");
                missing += 1;
            }
            Err(_) => {
                tracing::error!(worker, "Worker thread panicked");
                missing += 1;
            }
        }
    }
    (report, missing)
}

fn merge_reports(mut acc: Report, other: Report) -> Report {
    for (op, stats) in other {
        let entry = acc.entry(op).or_default();
        entry.ok += stats.ok;
        entry.errors += stats.errors;
        entry.latency += stats.latency;
    }
    acc
}

fn print_report(phase: &str, report: &Report, elapsed: Duration) {
    let total: u64 = report.values().map(|s| s.ok + s.errors).sum();
    let secs = elapsed.as_secs_f64();
    let throughput = if secs > 0.0 { total as f64 / secs } else { 0.0 };

    tracing::info!("[{}] {} operations in {:.3}s ({:.1} ops/sec)", phase, total, secs, throughput);

    for (op, stats) in report {
        let count = stats.ok + stats.errors;
        let avg_us = if count > 0 {
            stats.latency.as_micros() as f64 / count as f64
        } else {
            0.0
        };
        tracing::info!(
            "[{}] {:?}: ok={} errors={} avg_latency={:.1}us",
            phase,
            op,
            stats.ok,
            stats.errors,
            avg_us
        );
    }
}
