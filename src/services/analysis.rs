use tracing::{info, warn};

use crate::error::PromptError;
use crate::models::{Interval, Payload};
use crate::services::candle_reader::CandleReader;
use crate::services::indicator_store::IndicatorSource;
use crate::services::metrics_reader::MetricsSource;
use crate::services::payload_builder::PayloadBuilder;
use crate::services::prompt_builder::PromptRegistry;

/// Serialized payload size the downstream model is sized for.
pub const PAYLOAD_SIZE_CEILING: usize = 100 * 1024;

/// Everything the generation step needs for one request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub payload: Payload,
    pub system_prompt: String,
    pub data_json: String,
}

impl AnalysisRequest {
    pub fn payload_bytes(&self) -> usize {
        self.data_json.len()
    }

    pub fn within_ceiling(&self) -> bool {
        self.payload_bytes() <= PAYLOAD_SIZE_CEILING
    }
}

/// Build payload and prompt for one request.
///
/// The template is checked before any store is queried, so an unknown prompt
/// fails without touching the databases.
pub async fn prepare_analysis<C, M, I>(
    builder: &PayloadBuilder<C, M, I>,
    registry: &PromptRegistry,
    symbol: &str,
    interval: Interval,
    prompt_name: &str,
) -> Result<AnalysisRequest, PromptError>
where
    C: CandleReader,
    M: MetricsSource,
    I: IndicatorSource,
{
    registry.require_template(prompt_name)?;
    let payload = builder.fetch_payload(symbol, interval).await;
    let (system_prompt, data_json) = registry.build_prompt(prompt_name, &payload)?;

    let request = AnalysisRequest {
        payload,
        system_prompt,
        data_json,
    };

    if request.within_ceiling() {
        info!(
            symbol = %symbol,
            interval = %interval,
            prompt = %prompt_name,
            bytes = request.payload_bytes(),
            "Prepared analysis request"
        );
    } else {
        warn!(
            symbol = %symbol,
            interval = %interval,
            bytes = request.payload_bytes(),
            ceiling = PAYLOAD_SIZE_CEILING,
            "Payload exceeds size ceiling"
        );
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReaderError;
    use crate::models::{FuturesMetric, IndicatorScan, IntervalSeries};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recording {
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CandleReader for Recording {
        async fn read_candles(
            &self,
            _: &str,
            _: &[Interval],
        ) -> Result<IntervalSeries, ReaderError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(IntervalSeries::new())
        }
    }

    struct Empty;

    #[async_trait]
    impl MetricsSource for Empty {
        async fn read_metrics(&self, _: &str) -> Vec<FuturesMetric> {
            Vec::new()
        }
    }

    #[async_trait]
    impl IndicatorSource for Empty {
        async fn read_indicators(&self, _: &str) -> IndicatorScan {
            IndicatorScan::Tables(Default::default())
        }
    }

    #[tokio::test]
    async fn test_unknown_prompt_fails_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let builder = PayloadBuilder::new(
            Recording {
                called: called.clone(),
            },
            Empty,
            Empty,
        );
        let registry = PromptRegistry::new(dir.path());

        let result = prepare_analysis(&builder, &registry, "BTCUSDT", Interval::H1, "missing").await;

        assert!(matches!(result, Err(PromptError::NotFound { .. })));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_request_carries_prompt_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("market.txt"), "Analyse the data.").unwrap();
        let builder = PayloadBuilder::new(Recording::default(), Empty, Empty);
        let registry = PromptRegistry::new(dir.path());

        let request = prepare_analysis(&builder, &registry, "BTCUSDT", Interval::H4, "market")
            .await
            .unwrap();

        assert_eq!(request.system_prompt, "Analyse the data.");
        assert!(request.within_ceiling());
        let (_, rebuilt) = registry.build_prompt("market", &request.payload).unwrap();
        assert_eq!(rebuilt, request.data_json);
        let parsed: Payload = serde_json::from_str(&request.data_json).unwrap();
        assert_eq!(parsed.symbol, "BTCUSDT");
        assert_eq!(
            parsed.candles.keys().copied().collect::<Vec<_>>(),
            vec![Interval::H4, Interval::D1]
        );
    }
}
