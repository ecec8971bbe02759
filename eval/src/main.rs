mod args;

use anyhow::Context;
use common::{bundle::ResultsBundle, utils::config::get_config};
use eval_report::report::MarkdownReport;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = fmt()
        .with_env_filter(EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    let report_config = get_config().context("loading report configuration")?;
    let parsed = args::parse(&report_config)?;

    let bundle = ResultsBundle::from_path(&parsed.results).with_context(|| {
        format!("loading results bundle {}", parsed.results.display())
    })?;
    info!(
        models = bundle.assessment_per_model.len(),
        total_score = bundle.total_score,
        "Results bundle ready"
    );

    let report = MarkdownReport::from_bundle(bundle, &report_config);
    report
        .write_to_file(&parsed.markdown_path)
        .with_context(|| format!("writing report to {}", parsed.markdown_path.display()))?;

    println!(
        "Evaluation report for {} models → Markdown: {}",
        report.assessment_per_model.len(),
        parsed.markdown_path.display()
    );

    Ok(())
}
