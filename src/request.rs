//! Typed inference request.
//!
//! [`JobPosting`] mirrors the input form: eight fields with closed option
//! sets and numeric ranges. Raw [`RawParams`] callers skip this layer.

use serde::{Deserialize, Serialize};

use crate::error::ModelInputError;
use crate::row::{FeatureValue, RawParams};

pub const CITIES: &[&str] = &[
    "Bangalore",
    "London",
    "Singapore",
    "Sydney",
    "Tokyo",
    "Nairobi",
    "New York",
    "San Francisco",
];

pub const COMPANY_SIZES: &[&str] = &["Startup", "Small", "Medium", "Large", "Enterprise"];

pub const INDUSTRIES: &[&str] = &[
    "Tech",
    "Finance",
    "Healthcare",
    "Education",
    "Manufacturing",
    "Energy",
    "Government",
    "Retail",
];

pub const JOB_TITLES: &[&str] = &[
    "ML Engineer",
    "Data Scientist",
    "Software Engineer",
    "AI Researcher",
    "Product Manager",
    "Policy Analyst",
    "Business Analyst",
];

pub const SENIORITY_LEVELS: &[&str] = &["Intern", "Junior", "Mid", "Senior", "Lead", "Executive"];

pub const POSTING_YEAR_RANGE: (i32, i32) = (2010, 2030);
pub const SALARY_RANGE: (u32, u32) = (10_000, 500_000);

/// One job posting as entered by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobPosting {
    pub posting_year: i32,
    pub city: String,
    pub company_size: String,
    pub industry: String,
    pub job_title: String,
    pub seniority_level: String,
    /// How AI-intensive the role is, `0.0..=1.0`.
    pub ai_intensity_score: f64,
    pub salary_usd: u32,
}

impl Default for JobPosting {
    fn default() -> Self {
        Self {
            posting_year: 2025,
            city: "Bangalore".into(),
            company_size: "Large".into(),
            industry: "Tech".into(),
            job_title: "ML Engineer".into(),
            seniority_level: "Mid".into(),
            ai_intensity_score: 0.5,
            salary_usd: 80_000,
        }
    }
}

impl JobPosting {
    /// Check every field against its option set or range.
    pub fn validate(&self) -> Result<(), ModelInputError> {
        let (lo, hi) = POSTING_YEAR_RANGE;
        if !(lo..=hi).contains(&self.posting_year) {
            return Err(invalid("posting_year", format!("{} is outside {lo}..={hi}", self.posting_year)));
        }

        one_of("city", &self.city, CITIES)?;
        one_of("company_size", &self.company_size, COMPANY_SIZES)?;
        one_of("industry", &self.industry, INDUSTRIES)?;
        one_of("job_title", &self.job_title, JOB_TITLES)?;
        one_of("seniority_level", &self.seniority_level, SENIORITY_LEVELS)?;

        if !(0.0..=1.0).contains(&self.ai_intensity_score) {
            return Err(invalid(
                "ai_intensity_score",
                format!("{} is outside 0..=1", self.ai_intensity_score),
            ));
        }

        let (lo, hi) = SALARY_RANGE;
        if !(lo..=hi).contains(&self.salary_usd) {
            return Err(invalid("salary_usd", format!("{} is outside {lo}..={hi}", self.salary_usd)));
        }
        Ok(())
    }

    /// Raw parameters keyed by feature name.
    pub fn to_params(&self) -> RawParams {
        [
            ("posting_year", FeatureValue::from(self.posting_year)),
            ("city", FeatureValue::from(self.city.as_str())),
            ("company_size", FeatureValue::from(self.company_size.as_str())),
            ("industry", FeatureValue::from(self.industry.as_str())),
            ("job_title", FeatureValue::from(self.job_title.as_str())),
            ("seniority_level", FeatureValue::from(self.seniority_level.as_str())),
            ("ai_intensity_score", FeatureValue::from(self.ai_intensity_score)),
            ("salary_usd", FeatureValue::from(self.salary_usd)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    pub fn into_params(self) -> RawParams {
        self.to_params()
    }
}

fn invalid(field: &str, reason: String) -> ModelInputError {
    ModelInputError::InvalidParameter {
        field: field.to_string(),
        reason,
    }
}

fn one_of(field: &str, value: &str, options: &[&str]) -> Result<(), ModelInputError> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("`{value}` is not one of {}", options.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_is_valid() {
        let posting = JobPosting::default();
        posting.validate().unwrap();

        let params = posting.into_params();
        assert_eq!(params.len(), 8);
        assert_eq!(params["city"], FeatureValue::from("Bangalore"));
        assert_eq!(params["salary_usd"], FeatureValue::Numeric(80_000.0));
        assert_eq!(params["posting_year"], FeatureValue::Numeric(2025.0));
    }

    #[rstest]
    #[case::year_low(JobPosting { posting_year: 2009, ..Default::default() }, "posting_year")]
    #[case::year_high(JobPosting { posting_year: 2031, ..Default::default() }, "posting_year")]
    #[case::city(JobPosting { city: "Paris".into(), ..Default::default() }, "city")]
    #[case::size(JobPosting { company_size: "Huge".into(), ..Default::default() }, "company_size")]
    #[case::intensity(JobPosting { ai_intensity_score: 1.01, ..Default::default() }, "ai_intensity_score")]
    #[case::intensity_nan(JobPosting { ai_intensity_score: f64::NAN, ..Default::default() }, "ai_intensity_score")]
    #[case::salary(JobPosting { salary_usd: 9_999, ..Default::default() }, "salary_usd")]
    fn rejects_out_of_range(#[case] posting: JobPosting, #[case] field: &str) {
        match posting.validate() {
            Err(ModelInputError::InvalidParameter { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected invalid {field}, got {other:?}"),
        }
    }

    #[rstest]
    #[case(JobPosting { posting_year: 2010, salary_usd: 10_000, ai_intensity_score: 0.0, ..Default::default() })]
    #[case(JobPosting { posting_year: 2030, salary_usd: 500_000, ai_intensity_score: 1.0, ..Default::default() })]
    fn accepts_range_edges(#[case] posting: JobPosting) {
        posting.validate().unwrap();
    }

    #[test]
    fn json_fills_defaults() {
        let posting: JobPosting = serde_json::from_str(r#"{"city": "Tokyo", "salary_usd": 120000}"#).unwrap();
        assert_eq!(posting.city, "Tokyo");
        assert_eq!(posting.industry, "Tech");
        assert_eq!(posting.salary_usd, 120_000);
    }
}
