/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use clap::Parser;
use s3_benchmark::bench::endpoint_name;
use s3_benchmark::config::loader::{TlsVerification, TransportConfig};
use s3_benchmark::size::parse_size;
use s3_benchmark::types::BucketCreationPolicy;
use s3_benchmark::{Benchmark, Config, ConfigLoader, S3Store};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "s3-benchmark")]
#[command(about = "Measures PUT, GET and DELETE throughput of an S3 compatible object store.")]
struct Args {
    /// Access key
    #[arg(short = 'a', long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    access_key: Option<String>,

    /// Secret key
    #[arg(short = 's', long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// URL of host with port and no path
    #[arg(short = 'u', long = "url", env = "AWS_HOST")]
    endpoint: Option<String>,

    /// Bucket for testing
    #[arg(short = 'b', long, default_value = "loadgen")]
    bucket: String,

    /// Region for testing
    #[arg(short = 'r', long, default_value = "us-east-1")]
    region: String,

    /// Duration of each test in seconds
    #[arg(short = 'd', long, default_value_t = 60)]
    duration: u64,

    /// Number of concurrent workers
    #[arg(short = 't', long, default_value_t = 1)]
    threads: usize,

    /// Number of times to repeat the test
    #[arg(short = 'l', long, default_value_t = 1)]
    loops: u32,

    /// Size of objects in bytes with postfix K, M, and G
    #[arg(short = 'z', long, default_value = "1M")]
    size: String,

    /// Objects larger than this are sent with multipart upload, in parts of this size
    #[arg(short = 'm', long, default_value = "5G")]
    multipart_threshold: String,

    /// Stop if the bucket can't be created instead of continuing with a warning
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    fail_on_bucket_error: bool,

    /// Leave objects already in the bucket in place
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    keep_existing_objects: bool,

    /// Maximum SDK attempts per request
    #[arg(long, default_value_t = 1)]
    max_attempts: u32,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 30)]
    connect_timeout: u64,

    /// Idle connections kept per host
    #[arg(long, default_value_t = 4096)]
    max_idle_connections: usize,

    /// Seconds an idle connection is kept before it is closed
    #[arg(long)]
    pool_idle_timeout: Option<u64>,

    /// PEM file with extra certificates to trust, e.g. a self-signed endpoint's
    #[arg(long)]
    ca_bundle: Option<PathBuf>,

    /// Trust only the certificates in --ca-bundle, not the native roots
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue, requires = "ca_bundle")]
    ca_bundle_only: bool,

    /// File the log is appended to
    #[arg(long, default_value = "benchmark.log")]
    log_file: PathBuf,
}

fn init_tracing(log_file: &Path) -> Result<(), BoxError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}

async fn run(args: Args) -> Result<(), BoxError> {
    let object_size = parse_size(&args.size)?;
    let multipart_threshold = parse_size(&args.multipart_threshold)?;
    let bucket_creation_policy = if args.fail_on_bucket_error {
        BucketCreationPolicy::Fail
    } else {
        BucketCreationPolicy::Ignore
    };

    let config = Config::builder()
        .bucket(&args.bucket)
        .duration(Duration::from_secs(args.duration))
        .threads(args.threads)
        .loops(args.loops)
        .object_size(object_size)
        .multipart_threshold(multipart_threshold)
        .bucket_creation_policy(bucket_creation_policy)
        .clear_bucket(!args.keep_existing_objects)
        .build()?;

    let tls_verification = match args.ca_bundle {
        Some(path) => {
            let pem = std::fs::read(&path)
                .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
            if args.ca_bundle_only {
                TlsVerification::CertificatesOnly(pem)
            } else {
                TlsVerification::WithCertificates(pem)
            }
        }
        None => TlsVerification::NativeRoots,
    };
    let transport = TransportConfig::default()
        .max_attempts(args.max_attempts)
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .max_idle_connections_per_host(args.max_idle_connections)
        .pool_idle_timeout(args.pool_idle_timeout.map(Duration::from_secs))
        .tls_verification(tls_verification);
    let loader = ConfigLoader::default()
        .set_access_key(args.access_key)
        .set_secret_key(args.secret_key)
        .set_endpoint_url(args.endpoint)
        .region(&args.region)
        .transport(transport);
    let client_config = loader.client_config()?;
    let endpoint = client_config.endpoint_url().to_owned();

    tracing::info!(
        "Parameters: url={endpoint}, bucket={}, region={}, duration={}, threads={}, loops={}, size={}, multipart-threshold={}, use-multipart-upload={}",
        config.bucket(),
        args.region,
        args.duration,
        config.threads(),
        config.loops(),
        args.size,
        args.multipart_threshold,
        config.upload_strategy().is_multipart()
    );

    let client = client_config.load().await?;
    let store = S3Store::new(client, config.bucket());

    let benchmark = Benchmark::new(config, Arc::new(store));
    benchmark.prepare().await?;
    let report = benchmark.run().await;

    println!("result title: name-concurrency-size, uploadspeed, downloadspeed");
    println!(
        "result csv: {}",
        report.summary(endpoint_name(&endpoint), args.threads, &args.size)
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(err) = init_tracing(&args.log_file) {
        eprintln!("unable to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    tracing::info!("s3-benchmark v{}", env!("CARGO_PKG_VERSION"));
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("benchmark failed: {}", DisplayErrorContext(err.as_ref()));
            ExitCode::FAILURE
        }
    }
}
