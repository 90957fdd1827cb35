use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting roster run...");

        // Extract
        let report = self.pipeline.extract().await?;
        let counts = report.counts();
        tracing::info!(
            "Extracted {} records from {} of {} teams",
            counts.records,
            counts.accepted,
            counts.teams
        );

        // Transform
        let transformed = self.pipeline.transform(report).await?;
        tracing::info!("Rendered {} output files", transformed.files.len());

        // Load
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("📁 Output saved to: {}", output_path);

        Ok(output_path)
    }
}
