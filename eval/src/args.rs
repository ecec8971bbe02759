use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use common::utils::config::ReportConfig;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Results bundle (JSON) produced by the evaluation run
    #[arg(long, env = "EVAL_REPORT_RESULTS")]
    pub results: PathBuf,

    /// Directory receiving the Markdown report and chart (overrides config)
    #[arg(long)]
    pub result_path: Option<PathBuf>,

    /// File name of the Markdown report inside the result directory
    #[arg(long = "markdown-file")]
    pub markdown_file_name: Option<String>,

    // Computed fields (not arguments)
    #[arg(skip)]
    pub markdown_path: PathBuf,
}

impl Config {
    pub fn finalize(&mut self, report_config: &ReportConfig) -> Result<()> {
        let result_path = self
            .result_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&report_config.result_path));
        let markdown_file_name = self
            .markdown_file_name
            .clone()
            .unwrap_or_else(|| report_config.markdown_file_name.clone());

        if markdown_file_name.trim().is_empty() {
            return Err(anyhow!("--markdown-file requires a non-empty file name"));
        }
        if report_config.svg_file_name.trim().is_empty() {
            return Err(anyhow!("svg_file_name must not be empty"));
        }

        self.markdown_path = result_path.join(markdown_file_name);
        Ok(())
    }
}

pub fn parse(report_config: &ReportConfig) -> Result<Config> {
    let mut config = Config::parse();
    config.finalize(report_config)?;
    Ok(config)
}
