use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Component, Path, PathBuf, MAIN_SEPARATOR},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{
    bundle::ResultsBundle,
    create_template_engine,
    metrics::{AssessmentCategory, Assessments, ALL_ASSESSMENT_CATEGORIES},
    utils::{
        config::ReportConfig, model_name::clean_model_name_for_file_system,
        template_engine::{TemplateEngine, Value},
    },
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chart;

const REPORT_TEMPLATE: &str = "report.md";

/// Model names per category id. Names within a bucket are sorted.
pub type ModelsPerCategory = BTreeMap<&'static str, Vec<String>>;

#[derive(Debug, Clone)]
pub struct MarkdownReport {
    pub date_time: DateTime<Utc>,
    pub version: String,
    pub revision: String,
    pub csv_path: String,
    pub log_paths: Vec<String>,
    pub model_logs_path: String,
    /// Relative to the directory of the Markdown file.
    pub svg_path: String,
    pub assessment_per_model: BTreeMap<String, Assessments>,
    pub total_score: u64,
    pub tool_name: String,
    pub tool_url: String,
}

#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    date_time: String,
    svg_path: Option<&'a str>,
    tool_name: &'a str,
    tool_url: &'a str,
    version: &'a str,
    revision: &'a str,
    csv_path: &'a str,
    log_paths: &'a [String],
    categories: Vec<CategoryEntry>,
    sections: Vec<CategorySection>,
}

#[derive(Debug, Serialize)]
struct CategoryEntry {
    id: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct CategorySection {
    id: &'static str,
    description: &'static str,
    models: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    name: String,
    log_path: String,
}

impl CategoryEntry {
    fn from_category(category: &'static AssessmentCategory) -> Self {
        Self {
            id: category.id,
            description: category.description,
        }
    }
}

impl MarkdownReport {
    pub fn from_bundle(bundle: ResultsBundle, config: &ReportConfig) -> Self {
        Self {
            date_time: bundle.date_time.unwrap_or_else(Utc::now),
            version: bundle.version,
            revision: bundle.revision,
            csv_path: bundle
                .csv_path
                .unwrap_or_else(|| config.csv_file_name.clone()),
            log_paths: bundle
                .log_paths
                .unwrap_or_else(|| vec![config.log_file_name.clone()]),
            model_logs_path: bundle
                .model_logs_path
                .unwrap_or_else(|| config.model_logs_dir.clone()),
            svg_path: bundle
                .svg_path
                .unwrap_or_else(|| config.svg_file_name.clone()),
            assessment_per_model: bundle.assessment_per_model,
            total_score: bundle.total_score,
            tool_name: config.tool_name.clone(),
            tool_url: config.tool_url.clone(),
        }
    }

    pub fn models_per_category(&self) -> ModelsPerCategory {
        let mut models_per_category = ModelsPerCategory::new();
        for (model, assessments) in &self.assessment_per_model {
            let category = assessments.category(self.total_score);
            models_per_category
                .entry(category.id)
                .or_default()
                .push(model.clone());
        }
        models_per_category
    }

    /// Link target of a model's log directory, relative to the Markdown file
    /// unless the logs live under an absolute path.
    pub fn model_log_name(&self, model_name: &str) -> String {
        let joined = clean_path(
            &Path::new(&self.model_logs_path).join(clean_model_name_for_file_system(model_name)),
        );
        let mut model_path = joined.to_string_lossy().into_owned();
        model_path.push(MAIN_SEPARATOR);
        if !joined.is_absolute() {
            model_path = format!(".{MAIN_SEPARATOR}{model_path}");
        }

        if cfg!(windows) {
            model_path = model_path.replace('\\', "/");
        }

        model_path
    }

    /// Render the report into `writer`. The chart is written next to the
    /// report, inside `markdown_dir`, only when assessments exist.
    pub fn format<W: Write>(&self, writer: &mut W, markdown_dir: &Path) -> Result<()> {
        let models_per_category = self.models_per_category();

        let chart_written = if self.assessment_per_model.is_empty() {
            warn!("No assessments recorded; skipping category chart");
            false
        } else {
            let svg_path = markdown_dir.join(&self.svg_path);
            write_chart(&svg_path, &models_per_category)?;
            true
        };

        let context = self.template_context(&models_per_category, chart_written);
        let markdown = template_engine()?
            .render(REPORT_TEMPLATE, &Value::from_serialize(&context))
            .context("rendering Markdown report template")?;
        writer
            .write_all(markdown.as_bytes())
            .context("writing Markdown report")?;

        Ok(())
    }

    /// Render the report to `path`, creating parent directories as needed.
    /// A report that fails to render or flush is removed again.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let markdown_dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(markdown_dir).with_context(|| {
            format!("creating report directory {}", markdown_dir.display())
        })?;

        let file = File::create(path)
            .with_context(|| format!("creating report file {}", path.display()))?;
        if let Err(err) = self.write_report(file, path, markdown_dir) {
            if let Err(remove_err) = fs::remove_file(path) {
                warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "Failed to remove incomplete report"
                );
            }
            return Err(err);
        }

        info!(
            path = %path.display(),
            models = self.assessment_per_model.len(),
            "Wrote evaluation report"
        );
        Ok(())
    }

    fn write_report(&self, file: File, path: &Path, markdown_dir: &Path) -> Result<()> {
        let mut writer = BufWriter::new(file);
        self.format(&mut writer, markdown_dir)
            .with_context(|| format!("formatting report {}", path.display()))?;
        writer
            .into_inner()
            .map_err(std::io::IntoInnerError::into_error)
            .with_context(|| format!("flushing report {}", path.display()))?;
        Ok(())
    }

    fn template_context<'a>(
        &'a self,
        models_per_category: &ModelsPerCategory,
        chart_written: bool,
    ) -> TemplateContext<'a> {
        let sections = ALL_ASSESSMENT_CATEGORIES
            .iter()
            .filter_map(|category| {
                let models = models_per_category.get(category.id)?;
                Some(CategorySection {
                    id: category.id,
                    description: category.description,
                    models: models
                        .iter()
                        .map(|name| ModelEntry {
                            name: name.clone(),
                            log_path: self.model_log_name(name),
                        })
                        .collect(),
                })
            })
            .collect();

        TemplateContext {
            date_time: self.date_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            svg_path: chart_written.then_some(self.svg_path.as_str()),
            tool_name: &self.tool_name,
            tool_url: &self.tool_url,
            version: &self.version,
            revision: &self.revision,
            csv_path: &self.csv_path,
            log_paths: &self.log_paths,
            categories: ALL_ASSESSMENT_CATEGORIES
                .iter()
                .copied()
                .map(CategoryEntry::from_category)
                .collect(),
            sections,
        }
    }
}

/// Lexically drop `.` and resolve `..` against preceding components.
fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(cleaned.components().next_back(), Some(Component::Normal(_))) {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    cleaned.push(component);
                }
            }
            _ => cleaned.push(component),
        }
    }
    cleaned
}

fn template_engine() -> Result<TemplateEngine> {
    create_template_engine!((REPORT_TEMPLATE, "../templates/report.md"))
        .context("loading report templates")
}

fn write_chart(path: &Path, models_per_category: &ModelsPerCategory) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating chart file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    chart::bar_chart_models_per_category_svg(
        &mut writer,
        &ALL_ASSESSMENT_CATEGORIES,
        models_per_category,
    )
    .with_context(|| format!("rendering chart to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing chart file {}", path.display()))?;
    debug!(path = %path.display(), "Wrote category chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::metrics::AssessmentKey;
    use tempfile::tempdir;

    const ALL_KEYS: [AssessmentKey; 6] = [
        AssessmentKey::CoverageStatement,
        AssessmentKey::FilesExecuted,
        AssessmentKey::ResponseNoError,
        AssessmentKey::ResponseNoExcess,
        AssessmentKey::ResponseNotEmpty,
        AssessmentKey::ResponseWithCode,
    ];

    fn assessments_missing(total: u64, missing: Option<AssessmentKey>) -> Assessments {
        ALL_KEYS
            .into_iter()
            .map(|key| {
                let value = if Some(key) == missing { 0 } else { total };
                (key, value)
            })
            .collect()
    }

    fn sample_report(models: Vec<(&str, Assessments)>) -> MarkdownReport {
        MarkdownReport {
            date_time: Utc
                .with_ymd_and_hms(2024, 6, 1, 12, 30, 5)
                .single()
                .expect("valid timestamp"),
            version: "0.5.0".into(),
            revision: "abc1234".into(),
            csv_path: "evaluation.csv".into(),
            log_paths: vec!["evaluation.log".into()],
            model_logs_path: "logs".into(),
            svg_path: "categories.svg".into(),
            assessment_per_model: models
                .into_iter()
                .map(|(name, assessments)| (name.to_string(), assessments))
                .collect(),
            total_score: 4,
            tool_name: "DevQualityEval benchmark".into(),
            tool_url: "https://github.com/symflower/eval-dev-quality".into(),
        }
    }

    fn render(report: &MarkdownReport, dir: &Path) -> String {
        let mut buffer = Vec::new();
        report.format(&mut buffer, dir).expect("report formats");
        String::from_utf8(buffer).expect("utf8 markdown")
    }

    #[test]
    fn models_land_in_their_category_bucket() {
        let report = sample_report(vec![
            ("perfect", assessments_missing(4, None)),
            ("broken", Assessments::new()),
            ("also-broken", Assessments::new()),
            (
                "no-tests",
                assessments_missing(4, Some(AssessmentKey::CoverageStatement)),
            ),
        ]);

        let buckets = report.models_per_category();
        assert_eq!(
            buckets.get("code-no-excess"),
            Some(&vec!["perfect".to_string()])
        );
        assert_eq!(
            buckets.get("response-error"),
            Some(&vec!["also-broken".to_string(), "broken".to_string()])
        );
        assert_eq!(
            buckets.get("code-executed"),
            Some(&vec!["no-tests".to_string()])
        );
        assert_eq!(buckets.values().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn zero_total_score_buckets_everything_as_unknown() {
        let mut report = sample_report(vec![("a", assessments_missing(4, None))]);
        report.total_score = 0;
        let buckets = report.models_per_category();
        assert_eq!(buckets.keys().copied().collect::<Vec<_>>(), vec!["category-unknown"]);
    }

    #[test]
    fn model_log_name_is_relative_to_markdown_file() {
        let report = sample_report(vec![]);
        assert_eq!(
            report.model_log_name("openrouter/vendor:model"),
            "./logs/openrouter_vendor_model/"
        );

        let mut dotted = sample_report(vec![]);
        dotted.model_logs_path = "./logs".into();
        assert_eq!(dotted.model_log_name("m"), "./logs/m/");
    }

    #[test]
    fn model_log_name_resolves_parent_components() {
        let mut report = sample_report(vec![]);
        report.model_logs_path = "logs/../shared/./logs".into();
        assert_eq!(report.model_log_name("m"), "./shared/logs/m/");

        report.model_logs_path = "../logs".into();
        assert_eq!(report.model_log_name("m"), "./../logs/m/");
    }

    #[cfg(unix)]
    #[test]
    fn model_log_name_keeps_absolute_paths() {
        let mut report = sample_report(vec![]);
        report.model_logs_path = "/var/eval/logs".into();
        assert_eq!(report.model_log_name("m"), "/var/eval/logs/m/");
    }

    #[test]
    fn renders_full_document_layout() {
        let dir = tempdir().expect("tempdir");
        let report = sample_report(vec![("model-a", assessments_missing(4, None))]);
        let markdown = render(&report, dir.path());

        let mut expected = String::from(
            "# Evaluation from 2024-06-01 12:30:05\n\
             \n\
             ![Bar chart that categorizes all evaluated models.](categories.svg)\n\
             \n\
             This report was generated by [DevQualityEval benchmark](https://github.com/symflower/eval-dev-quality) in `version 0.5.0` - `revision abc1234`.\n\
             \n\
             ## Results\n\
             \n\
             > Keep in mind that LLMs are nondeterministic. The following results just reflect a current snapshot.\n\
             \n\
             The results of all models have been divided into the following categories:\n",
        );
        for category in ALL_ASSESSMENT_CATEGORIES {
            expected.push_str(&format!("- {}: {}\n", category.id, category.description));
        }
        expected.push_str(
            "\n\
             The following sections list all models with their categories. Detailed scoring can be found [here](evaluation.csv). The complete log of the evaluation with all outputs can be found here:\n\
             - evaluation.log\n\
             \n\
             ### Result category \"code-no-excess\"\n\
             \n",
        );
        expected.push_str(common::metrics::CATEGORY_CODE_NO_EXCESS.description);
        expected.push_str("\n\n- [`model-a`](./logs/model-a/)\n\n");

        assert_eq!(markdown, expected);
    }

    #[test]
    fn renders_only_non_empty_categories_in_order() {
        let dir = tempdir().expect("tempdir");
        let report = sample_report(vec![
            ("z-model", assessments_missing(4, None)),
            ("a-model", Assessments::new()),
        ]);
        let markdown = render(&report, dir.path());

        let error_section = markdown
            .find("### Result category \"response-error\"")
            .expect("response-error section");
        let excess_section = markdown
            .find("### Result category \"code-no-excess\"")
            .expect("code-no-excess section");
        assert!(error_section < excess_section);
        assert!(!markdown.contains("### Result category \"code-invalid\""));
        assert!(markdown.contains("- [`a-model`](./logs/a-model/)"));
        assert!(markdown.contains("- [`z-model`](./logs/z-model/)"));
        assert!(markdown.contains("[here](evaluation.csv)"));
    }

    #[test]
    fn chart_is_written_when_assessments_exist() {
        let dir = tempdir().expect("tempdir");
        let report = sample_report(vec![("model-a", Assessments::new())]);
        render(&report, dir.path());

        let svg = fs::read_to_string(dir.path().join("categories.svg")).expect("chart exists");
        assert!(svg.contains(">response-error</text>"));
    }

    #[test]
    fn chart_is_skipped_without_assessments() {
        let dir = tempdir().expect("tempdir");
        let report = sample_report(vec![]);
        let markdown = render(&report, dir.path());

        assert!(!dir.path().join("categories.svg").exists());
        assert!(!markdown.contains("![Bar chart"));
        assert!(!markdown.contains("### Result category"));
        assert!(markdown.contains("## Results"));
        assert!(markdown.ends_with("- evaluation.log\n\n"));
    }

    #[test]
    fn every_section_ends_with_a_blank_line() {
        let dir = tempdir().expect("tempdir");
        let report = sample_report(vec![
            ("z-model", assessments_missing(4, None)),
            ("a-model", Assessments::new()),
        ]);
        let markdown = render(&report, dir.path());

        assert!(markdown.contains("- [`a-model`](./logs/a-model/)\n\n### Result category"));
        assert!(markdown.ends_with("- [`z-model`](./logs/z-model/)\n\n"));
    }

    #[test]
    fn write_to_file_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/run/README.md");
        let report = sample_report(vec![("model-a", assessments_missing(4, None))]);

        report.write_to_file(&path).expect("report written");

        let markdown = fs::read_to_string(&path).expect("report exists");
        assert!(markdown.starts_with("# Evaluation from 2024-06-01 12:30:05"));
        assert!(dir.path().join("nested/run/categories.svg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn report_permissions_match_a_regularly_created_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("README.md");
        let report = sample_report(vec![("model-a", assessments_missing(4, None))]);
        report.write_to_file(&path).expect("report written");

        let reference = dir.path().join("reference.txt");
        File::create(&reference).expect("reference file");
        let mode = |path: &Path| {
            fs::metadata(path)
                .expect("metadata")
                .permissions()
                .mode()
                & 0o777
        };

        assert_eq!(mode(&path), mode(&reference));
        assert_eq!(mode(&dir.path().join("categories.svg")), mode(&reference));
    }

    #[test]
    fn report_directory_failure_propagates() {
        let dir = tempdir().expect("tempdir");
        // A regular file where the report directory should be.
        fs::write(dir.path().join("run"), "not a directory").expect("blocking file");
        let path = dir.path().join("run/README.md");
        let report = sample_report(vec![("model-a", Assessments::new())]);

        let err = report.write_to_file(&path).expect_err("directory creation fails");

        assert!(format!("{err:#}").contains("creating report directory"));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("run")]);
        assert_eq!(
            fs::read_to_string(dir.path().join("run")).expect("file untouched"),
            "not a directory"
        );
    }

    #[test]
    fn report_file_failure_propagates() {
        let dir = tempdir().expect("tempdir");
        // A directory in place of the report file makes creating it fail.
        let path = dir.path().join("README.md");
        fs::create_dir(&path).expect("blocking dir");
        let report = sample_report(vec![("model-a", Assessments::new())]);

        let err = report.write_to_file(&path).expect_err("report creation fails");

        assert!(format!("{err:#}").contains("creating report file"));
        assert!(path.is_dir());
        assert!(!dir.path().join("categories.svg").exists());
    }

    #[test]
    fn chart_creation_failure_propagates_without_partial_report() {
        let dir = tempdir().expect("tempdir");
        // A directory in place of the chart file makes creating it fail.
        fs::create_dir(dir.path().join("categories.svg")).expect("blocking dir");
        let path = dir.path().join("README.md");
        let report = sample_report(vec![("model-a", Assessments::new())]);

        let err = report.write_to_file(&path).expect_err("chart creation fails");

        assert!(format!("{err:#}").contains("creating chart file"));
        assert!(!path.exists());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("categories.svg")]);
    }

    #[test]
    fn from_bundle_fills_missing_paths_from_config() {
        let bundle = ResultsBundle::from_slice(
            br#"{"version": "1.0.0", "revision": "deadbeef", "total_score": 2}"#,
        )
        .expect("bundle parses");
        let config = ReportConfig::default();

        let report = MarkdownReport::from_bundle(bundle, &config);

        assert_eq!(report.svg_path, config.svg_file_name);
        assert_eq!(report.csv_path, config.csv_file_name);
        assert_eq!(report.log_paths, vec![config.log_file_name.clone()]);
        assert_eq!(report.model_logs_path, config.model_logs_dir);
        assert!(report.assessment_per_model.is_empty());
    }
}
