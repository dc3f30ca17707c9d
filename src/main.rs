use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use claimsim::config::{AgingConfig, BillingConfig, Cli, IngestionConfig, PayerConfig, SimulatorConfig};
use claimsim::denial::DenialCategory;
use claimsim::json_faker::write_fake_claims_jsonl;
use claimsim::logging;
use claimsim::orchestrator::SimulatorOrchestrator;
use claimsim::reader::JsonlClaimSource;
use claimsim::store::NoopClaimStore;

fn demo_payers() -> Vec<PayerConfig> {
    vec![
        PayerConfig {
            payer_id: "medicare".to_string(),
            name: "Medicare".to_string(),
            contact: Some("1-800-633-4227".to_string()),
            delay_min_ms: 200,
            delay_max_ms: 1500,
            payer_percentage: 0.8,
            copay_fixed: 20.0,
            deductible_percentage: 0.05,
            denial_rate: 0.1,
            hard_denial_rate: 0.4,
            preferred_denial_categories: vec![DenialCategory::Authorization, DenialCategory::MedicalNecessity],
        },
        PayerConfig {
            payer_id: "united_health_group".to_string(),
            name: "United Health Group".to_string(),
            contact: Some("1-866-414-1959".to_string()),
            delay_min_ms: 300,
            delay_max_ms: 2500,
            payer_percentage: 0.75,
            copay_fixed: 25.0,
            deductible_percentage: 0.1,
            denial_rate: 0.15,
            hard_denial_rate: 0.3,
            preferred_denial_categories: vec![DenialCategory::Eligibility, DenialCategory::Coding],
        },
        PayerConfig {
            payer_id: "anthem".to_string(),
            name: "Anthem".to_string(),
            contact: Some("1-833-369-4873".to_string()),
            delay_min_ms: 150,
            delay_max_ms: 1000,
            payer_percentage: 0.85,
            copay_fixed: 15.0,
            deductible_percentage: 0.05,
            denial_rate: 0.08,
            hard_denial_rate: 0.5,
            preferred_denial_categories: vec![],
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    if !Path::new(&cli.file_path).exists() {
        tracing::info!(
            file_path = cli.file_path.as_str(),
            count = cli.generate,
            "input file not found, generating fake claims"
        );
        write_fake_claims_jsonl(&cli.file_path, cli.generate)?;
    }

    let config = SimulatorConfig {
        payers: demo_payers(),
        ingestion: IngestionConfig {
            rate_limit: cli.ingest_rate,
        },
        billing: BillingConfig::default(),
        aging: AgingConfig::default(),
        max_attempts: 3,
        retry_base_ms: 1000,
        verbose: cli.verbose,
    };

    let orchestrator = SimulatorOrchestrator::new(&config, Arc::new(NoopClaimStore))?;
    let source = Box::new(JsonlClaimSource::open(&cli.file_path).await?);
    orchestrator.start(source, None).await?;

    // Give the downstream payer/remittance stages time to drain after
    // ingestion finishes, since each stage is paced independently.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    println!("{}", orchestrator.billing().render_report().await);
    let status = orchestrator.status().await;
    tracing::info!(
        claims_processed = orchestrator.billing().claims_processed().await,
        remittance_pending = status.remittance_queue.pending,
        "simulation run complete"
    );

    Ok(())
}
