//! Assessment scores recorded per model and the categories derived from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single scored aspect of a model response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentKey {
    /// Statement coverage reached by the generated tests.
    CoverageStatement,
    /// Files that compiled and executed.
    FilesExecuted,
    /// Responses that were returned without an error.
    ResponseNoError,
    /// Responses that contained nothing beyond the requested code.
    ResponseNoExcess,
    /// Responses that were not empty.
    ResponseNotEmpty,
    /// Responses that contained a code block.
    ResponseWithCode,
}

/// Scores a model reached, keyed by assessment. Missing keys count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assessments(BTreeMap<AssessmentKey, u64>);

#[derive(Debug, PartialEq, Eq)]
pub struct AssessmentCategory {
    pub id: &'static str,
    pub description: &'static str,
}

pub static CATEGORY_UNKNOWN: AssessmentCategory = AssessmentCategory {
    id: "category-unknown",
    description: "Models in this category could not be categorized.",
};
pub static CATEGORY_RESPONSE_ERROR: AssessmentCategory = AssessmentCategory {
    id: "response-error",
    description: "Models in this category encountered an error.",
};
pub static CATEGORY_RESPONSE_EMPTY: AssessmentCategory = AssessmentCategory {
    id: "response-empty",
    description: "Models in this category produced an empty response.",
};
pub static CATEGORY_RESPONSE_NO_CODE: AssessmentCategory = AssessmentCategory {
    id: "response-no-code",
    description: "Models in this category produced no code.",
};
pub static CATEGORY_CODE_INVALID: AssessmentCategory = AssessmentCategory {
    id: "code-invalid",
    description: "Models in this category produced invalid code.",
};
pub static CATEGORY_CODE_EXECUTED: AssessmentCategory = AssessmentCategory {
    id: "code-executed",
    description: "Models in this category produced executable code.",
};
pub static CATEGORY_CODE_COVERAGE_STATEMENT: AssessmentCategory = AssessmentCategory {
    id: "code-coverage-statement",
    description: "Models in this category produced code that reached full statement coverage.",
};
pub static CATEGORY_CODE_NO_EXCESS: AssessmentCategory = AssessmentCategory {
    id: "code-no-excess",
    description: "Models in this category produced code that reached full statement coverage without excess content in the response.",
};

/// Every category, ordered from worst to best.
pub static ALL_ASSESSMENT_CATEGORIES: [&AssessmentCategory; 8] = [
    &CATEGORY_UNKNOWN,
    &CATEGORY_RESPONSE_ERROR,
    &CATEGORY_RESPONSE_EMPTY,
    &CATEGORY_RESPONSE_NO_CODE,
    &CATEGORY_CODE_INVALID,
    &CATEGORY_CODE_EXECUTED,
    &CATEGORY_CODE_COVERAGE_STATEMENT,
    &CATEGORY_CODE_NO_EXCESS,
];

/// Requirements checked in order; the first unmet one decides the category.
static REQUIREMENTS: [(AssessmentKey, &AssessmentCategory); 6] = [
    (AssessmentKey::ResponseNoError, &CATEGORY_RESPONSE_ERROR),
    (AssessmentKey::ResponseNotEmpty, &CATEGORY_RESPONSE_EMPTY),
    (AssessmentKey::ResponseWithCode, &CATEGORY_RESPONSE_NO_CODE),
    (AssessmentKey::FilesExecuted, &CATEGORY_CODE_INVALID),
    (AssessmentKey::CoverageStatement, &CATEGORY_CODE_EXECUTED),
    (AssessmentKey::ResponseNoExcess, &CATEGORY_CODE_COVERAGE_STATEMENT),
];

impl Assessments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: AssessmentKey) -> u64 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: AssessmentKey, value: u64) {
        self.0.insert(key, value);
    }

    /// Categorize against the total reachable score. A requirement counts as
    /// met only when its score equals `total_score`.
    pub fn category(&self, total_score: u64) -> &'static AssessmentCategory {
        if total_score == 0 {
            return &CATEGORY_UNKNOWN;
        }

        REQUIREMENTS
            .iter()
            .find(|(key, _)| self.get(*key) != total_score)
            .map_or(&CATEGORY_CODE_NO_EXCESS, |(_, category)| *category)
    }
}

impl FromIterator<(AssessmentKey, u64)> for Assessments {
    fn from_iter<T: IntoIterator<Item = (AssessmentKey, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
