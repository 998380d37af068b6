use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use soccer_analysis::analysis::eda::SoccerAnalysis;
use soccer_analysis::analysis::inference::InferenceAnalysis;
use soccer_analysis::analysis::modeling::{ModelingAnalysis, ModelingConfig};
use soccer_analysis::analysis::summary::DataSummary;
use soccer_analysis::config::AppConfig;
use soccer_analysis::data_handling::any_dataset::AnyDataset;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the soccer analysis");
    let config = AppConfig::load().context("loading configuration")?;
    let matches = AnyDataset::new(&config.matches_source);
    let rankings = AnyDataset::new(&config.rankings_source);

    // Summaries
    let matches_summary = DataSummary::new(&matches).context("loading the match table")?;
    let rankings_summary = DataSummary::new(&rankings).context("loading the rankings table")?;
    matches_summary.explain_head_tail();
    println!("Shape: {:?}", matches_summary.shape());
    println!("{}", matches_summary.missing_value_percent()?);
    rankings_summary.data_info();
    rankings_summary.explain_descriptive_stats()?;

    // Exploratory charts and the score regression
    let mut eda = SoccerAnalysis::new(&matches, &config.chart_dir)?
        .with_split(config.test_size, config.random_state);
    eda.scatterplot_spi_ratings()?;
    eda.histogram_projected_scores()?;
    let (correlations, _) = eda.correlation_matrix()?;
    info!("Correlation matrix:\n{:.2}", correlations);
    eda.label_outcomes()?;
    eda.train_regression()?;
    if let Some(scores) = eda.predict(&eda.display_data_head())? {
        info!("Predicted scores for the first matches:\n{:.2}", scores);
    }

    // Joint density and distributions
    let inference = InferenceAnalysis::new(&matches, &config.chart_dir)?;
    inference.scatterplot_spi_ratings()?;
    inference.scatterplot_spi_ratings_hexbin()?;
    inference.boxplot_scores()?;
    inference.distribution_probabilities()?;

    // Rankings model
    let modeling_config = ModelingConfig {
        test_size: config.test_size,
        random_state: config.random_state,
        ..ModelingConfig::default()
    };
    let mut modeling = ModelingAnalysis::load_prepared(&rankings, modeling_config, &config.chart_dir)?;
    modeling.train()?;
    if modeling.evaluate()?.is_none() {
        warn!("Rankings model produced no evaluation");
    }
    if let Some(importances) = modeling.feature_importances() {
        for (feature, importance) in importances {
            info!("{:<12} {:.4}", feature, importance);
        }
    }

    info!("Charts written to {}", config.chart_dir.display());
    Ok(())
}
