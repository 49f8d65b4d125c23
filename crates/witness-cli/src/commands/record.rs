//! Record command - Run a short instrumented demo and write a report bundle.
//!
//! The demo has no real screen or network: frames come from a synthetic
//! gradient and requests go to an in-process loopback transport. Everything
//! else (recorder, interceptor, crash capture, bundling) is the real thing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};
use clap::Args;

use witness::prelude::*;
use witness::witness_session::{ProcessSampler, from_fn};

use crate::OutputFormat;

/// Arguments for the record command.
#[derive(Args)]
pub struct RecordArgs {
    /// Directory the report bundle is written under
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// How long to record, in seconds
    #[arg(long, default_value = "3")]
    pub seconds: u64,

    /// Number of demo requests to issue
    #[arg(long, default_value = "5")]
    pub requests: u32,

    /// Session length override, in seconds
    #[arg(long)]
    pub session_length: Option<u32>,

    /// Capture frequency override
    #[arg(long, value_parser = parse_frequency)]
    pub frequency: Option<CaptureFrequency>,

    /// Simulate a fault before bundling
    #[arg(long)]
    pub fault: bool,
}

fn parse_frequency(value: &str) -> Result<CaptureFrequency, String> {
    match value.to_ascii_lowercase().as_str() {
        "low" => Ok(CaptureFrequency::Low),
        "medium" => Ok(CaptureFrequency::Medium),
        "high" => Ok(CaptureFrequency::High),
        other => Err(format!("unknown frequency '{}' (low, medium, high)", other)),
    }
}

/// Answers every request locally. Paths containing `fail` get a connection
/// error, everything else echoes the path back.
struct LoopbackTransport;

impl Transport for LoopbackTransport {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            if request.url.contains("fail") {
                return Err(TransportError::Connect("loopback refused".to_string()));
            }
            Ok(HttpResponse::new(200)
                .with_header("Content-Type", "application/json")
                .with_body(format!("{{\"path\":\"{}\"}}", request.url)))
        }
    }
}

/// 32x32 RGBA gradient that shifts on every capture.
fn gradient_provider() -> Arc<dyn SnapshotProvider> {
    let frame = AtomicU32::new(0);
    Arc::new(from_fn(move |request: &CaptureRequest| {
        let shift = frame.fetch_add(1, Ordering::Relaxed);
        let side = if request.quality == CaptureQuality::High { 64 } else { 32 };
        let mut pixels = Vec::with_capacity((side * side * 4) as usize);
        for y in 0..side {
            for x in 0..side {
                pixels.extend_from_slice(&[
                    ((x + shift) % 256) as u8,
                    ((y + shift) % 256) as u8,
                    (shift % 256) as u8,
                    255,
                ]);
            }
        }
        Ok(Snapshot::new(side, side, ImageFormat::Rgba8, pixels))
    }))
}

fn demo_config(args: &RecordArgs, config: Option<&Path>) -> Result<InstrumentationConfig> {
    let mut config = match config {
        Some(path) => super::load_config(path)?,
        None => InstrumentationConfig::new("witness-demo").with_session_length(10),
    };
    if let Some(seconds) = args.session_length {
        config = config.with_session_length(seconds);
    }
    if let Some(frequency) = args.frequency {
        config = config.with_capture_frequency(frequency);
    }
    Ok(config)
}

/// Execute the record command.
pub fn execute(
    args: RecordArgs,
    config: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let config = demo_config(&args, config)?;

    let witness = Witness::builder()
        .with_snapshot_provider(gradient_provider())
        .with_resource_sampler(Arc::new(ProcessSampler::new()))
        .with_output_dir(&args.output)
        .with_crash_dir(args.output.join("witness_crashes"))
        .with_crash_capture(false)
        .build();
    witness
        .initialize(config)
        .context("Failed to initialize instrumentation")?;
    witness.add_custom_data("source", "witness record");
    witness.add_custom_data("requests", args.requests);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let bundle = runtime.block_on(async {
        let client = witness.intercept(LoopbackTransport);
        let pause = Duration::from_secs(args.seconds) / args.requests.max(1);
        for i in 0..args.requests {
            let path = if i % 4 == 3 { "fail" } else { "ok" };
            let url = format!("https://demo.witness.local/{}/{}", path, i);
            if let Err(e) = client.send(HttpRequest::get(url)).await {
                tracing::debug!(error = %e, "Demo request failed");
            }
            tokio::time::sleep(pause).await;
        }

        if args.fault {
            witness.crash_capture().handle_fault(&Fault::new(
                "SimulatedFault",
                "raised by witness record --fault",
                format!("{:?}", std::backtrace::Backtrace::force_capture()),
            ));
        }

        witness.capture_report_bundle_async().await
    })?;

    witness.shutdown();

    if format.print_json(&bundle)? {
        return Ok(());
    }
    if !quiet {
        println!("Report bundle written to {}", bundle.directory.display());
        println!("  Network entries: {}", bundle.network_entries);
        println!("  Session frames: {}", bundle.session_frames);
        println!("  Crashes: {}", bundle.crashes.len());
        for warning in &bundle.warnings {
            println!("  Warning: {}", warning);
        }
    }
    Ok(())
}
