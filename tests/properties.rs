//! Property tests over the documented input ranges.

use proptest::prelude::*;
use proptest::sample::select;

use jobimpact::request::{
    CITIES, COMPANY_SIZES, INDUSTRIES, JOB_TITLES, POSTING_YEAR_RANGE, SALARY_RANGE, SENIORITY_LEVELS,
};
use jobimpact::testing::{self, ADOPTION_LABELS, DISPLACEMENT_LABELS};
use jobimpact::{JobPosting, Orchestrator, PipelineOptions, RiskBand, RiskClamp};

fn posting() -> impl Strategy<Value = JobPosting> {
    (
        POSTING_YEAR_RANGE.0..=POSTING_YEAR_RANGE.1,
        select(CITIES),
        select(COMPANY_SIZES),
        select(INDUSTRIES),
        select(JOB_TITLES),
        select(SENIORITY_LEVELS),
        0.0f64..=1.0,
        SALARY_RANGE.0..=SALARY_RANGE.1,
    )
        .prop_map(
            |(posting_year, city, company_size, industry, job_title, seniority_level, ai_intensity_score, salary_usd)| {
                JobPosting {
                    posting_year,
                    city: city.to_string(),
                    company_size: company_size.to_string(),
                    industry: industry.to_string(),
                    job_title: job_title.to_string(),
                    seniority_level: seniority_level.to_string(),
                    ai_intensity_score,
                    salary_usd,
                }
            },
        )
}

fn orchestrator(risk_clamp: RiskClamp) -> Orchestrator {
    let options = PipelineOptions {
        risk_clamp,
        ..Default::default()
    };
    Orchestrator::new(testing::demo_context().unwrap(), options)
}

proptest! {
    #[test]
    fn valid_postings_always_predict(posting in posting()) {
        prop_assert!(posting.validate().is_ok());

        let orch = orchestrator(RiskClamp::Clamp);
        let result = orch.predict_posting(&posting).unwrap();

        prop_assert!(ADOPTION_LABELS.contains(&result.adoption_stage.as_str()));
        prop_assert!(DISPLACEMENT_LABELS.contains(&result.displacement_risk.as_str()));
        prop_assert!(result.automation_risk.is_finite());
        prop_assert!((0.0..=1.0).contains(&result.automation_risk));
        prop_assert!(result.automation_risk_raw.is_finite());
        prop_assert!(result.adoption_probability > 0.0 && result.adoption_probability <= 1.0);
        prop_assert!(result.displacement_probability > 0.0 && result.displacement_probability <= 1.0);
    }

    #[test]
    fn clamping_never_changes_the_labels(posting in posting()) {
        let clamped = orchestrator(RiskClamp::Clamp).predict_posting(&posting).unwrap();
        let raw = orchestrator(RiskClamp::PassThrough).predict_posting(&posting).unwrap();

        prop_assert_eq!(&clamped.adoption_stage, &raw.adoption_stage);
        prop_assert_eq!(&clamped.displacement_risk, &raw.displacement_risk);
        prop_assert_eq!(clamped.automation_risk_raw.to_bits(), raw.automation_risk.to_bits());
    }

    #[test]
    fn risk_bands_are_monotonic(a in -1.0f64..2.0, b in -1.0f64..2.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |band: RiskBand| match band {
            RiskBand::Low => 0,
            RiskBand::Moderate => 1,
            RiskBand::High => 2,
        };
        prop_assert!(rank(RiskBand::from_score(lo)) <= rank(RiskBand::from_score(hi)));
    }
}
