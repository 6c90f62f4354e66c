//! `render-probe`: runs the native benchmarks on this machine and prints the
//! reading with the tier it maps to, for threshold calibration.

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    probe::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod probe {
    use std::rc::Rc;

    use anyhow::Result;
    use serde::Serialize;
    use tracing::info;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    use adaptive_render::benchmark::{MemoryCanvasFactory, SysinfoProbe};
    use adaptive_render::clock::TokioFrameClock;
    use adaptive_render::dom::MemoryDocument;
    use adaptive_render::{
        decide_tier, scan_document, BenchmarkReading, CapabilityTier, EngineConfig,
        EnvironmentProbe, Probe,
    };

    #[derive(Serialize)]
    struct ProbeReport {
        reading: BenchmarkReading,
        tier: CapabilityTier,
        marker_class: &'static str,
    }

    pub async fn run() -> Result<()> {
        // Load configuration first (fails on malformed ADAPTIVE_RENDER_* values)
        let config = EngineConfig::from_env()?;

        let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("adaptive_render={rust_log},render_probe={rust_log}"))
            }))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        info!("Starting render-probe v{}", env!("CARGO_PKG_VERSION"));

        let probe = EnvironmentProbe::new(
            Rc::new(TokioFrameClock::default()),
            Box::new(MemoryCanvasFactory::new()),
            Box::new(SysinfoProbe::new()),
            config.clone(),
        );
        let measured = probe.measure().await?;

        let mut document = MemoryDocument::default();
        let scan = scan_document(&mut document, &config.weights, config.heaviness_cap);

        let reading = BenchmarkReading::new(measured, scan.heaviness);
        let tier = decide_tier(&reading, &config.thresholds);
        info!(tier = %tier, "Probe complete");

        let report = ProbeReport {
            reading,
            tier,
            marker_class: tier.marker_class(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
