use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct ReportConfig {
    #[serde(default = "default_result_path")]
    pub result_path: String,
    #[serde(default = "default_markdown_file_name")]
    pub markdown_file_name: String,
    #[serde(default = "default_svg_file_name")]
    pub svg_file_name: String,
    #[serde(default = "default_csv_file_name")]
    pub csv_file_name: String,
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
    #[serde(default = "default_model_logs_dir")]
    pub model_logs_dir: String,
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    #[serde(default = "default_tool_url")]
    pub tool_url: String,
}

fn default_result_path() -> String {
    "./evaluation".to_string()
}

fn default_markdown_file_name() -> String {
    "README.md".to_string()
}

fn default_svg_file_name() -> String {
    "categories.svg".to_string()
}

fn default_csv_file_name() -> String {
    "evaluation.csv".to_string()
}

fn default_log_file_name() -> String {
    "evaluation.log".to_string()
}

fn default_model_logs_dir() -> String {
    "logs".to_string()
}

fn default_tool_name() -> String {
    "DevQualityEval benchmark".to_string()
}

fn default_tool_url() -> String {
    "https://github.com/symflower/eval-dev-quality".to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            result_path: default_result_path(),
            markdown_file_name: default_markdown_file_name(),
            svg_file_name: default_svg_file_name(),
            csv_file_name: default_csv_file_name(),
            log_file_name: default_log_file_name(),
            model_logs_dir: default_model_logs_dir(),
            tool_name: default_tool_name(),
            tool_url: default_tool_url(),
        }
    }
}

pub fn get_config() -> Result<ReportConfig, ConfigError> {
    build_config(Environment::with_prefix("EVAL_REPORT"))
}

fn build_config(environment: Environment) -> Result<ReportConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("eval-report").required(false))
        .add_source(environment)
        .build()?;

    config.try_deserialize()
}
