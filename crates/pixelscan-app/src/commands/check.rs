use super::build_pipeline;
use pixelscan_core::AppConfig;
use pixelscan_resolver::normalize;
use pixelscan_scanner::{RejectedTarget, ScanResult, ScanTarget};
use tokio_util::sync::CancellationToken;

pub async fn run(config: &AppConfig, target: &str) -> anyhow::Result<()> {
    let result = match normalize(target) {
        Ok(domain) => {
            let pipeline = build_pipeline(config)?;
            let target = ScanTarget {
                input: target.to_string(),
                correlation_id: None,
                domain,
            };
            pipeline.scan(&target, &CancellationToken::new()).await
        }
        Err(error) => ScanResult::rejected(&RejectedTarget {
            input: target.to_string(),
            correlation_id: None,
            error,
        }),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
