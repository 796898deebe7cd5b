//! End-to-end pipeline behaviour over artifacts loaded from disk.

mod common;

use std::sync::Arc;
use std::thread;

use approx::assert_abs_diff_eq;
use rstest::rstest;

use common::{params, ArtifactDir};
use jobimpact::persist::Format;
use jobimpact::testing::{ADOPTION_LABELS, DISPLACEMENT_LABELS};
use jobimpact::{
    AbsentPolicy, FailureKind, FeatureValue, JobPosting, ModelInputError, Orchestrator, PipelineConfig,
    PipelineError, PredictionOutcome, RiskBand, Stage, StageError,
};

#[test]
fn form_defaults_end_to_end() {
    let artifacts = ArtifactDir::new(Format::Json);
    let orch = artifacts.orchestrator();

    let result = orch.predict(&params(&[])).unwrap();
    assert!(ADOPTION_LABELS.contains(&result.adoption_stage.as_str()));
    assert!(DISPLACEMENT_LABELS.contains(&result.displacement_risk.as_str()));
    assert!(result.automation_risk.is_finite());

    // the synthetic rules put a mid-level Tech ML engineer here
    assert_eq!(result.adoption_stage, "Mature");
    assert_abs_diff_eq!(result.automation_risk, 0.55, epsilon = 1e-6);
    assert_eq!(result.displacement_risk, "Medium");
    assert_eq!(result.automation_risk_band(), RiskBand::Moderate);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["industry_ai_adoption_stage"], "Mature");
    assert_eq!(json["ai_job_displacement_risk"], "Medium");
    assert!(json["automation_risk_score"].is_f64());
}

#[test]
fn repeated_calls_are_bit_identical() {
    let orch = ArtifactDir::new(Format::Binary).orchestrator();
    let input = params(&[("industry", "Retail".into()), ("seniority_level", "Lead".into())]);

    let first = orch.predict(&input).unwrap();
    for _ in 0..5 {
        let again = orch.predict(&input).unwrap();
        assert_eq!(again.automation_risk.to_bits(), first.automation_risk.to_bits());
        assert_eq!(again, first);
    }
}

#[test]
fn derived_columns_come_from_predictions_only() {
    let orch = ArtifactDir::new(Format::Json).orchestrator();
    let clean = orch.predict(&params(&[("industry", "Government".into())])).unwrap();
    assert_eq!(clean.adoption_stage, "Emerging");

    // ground truth smuggled in under the derived names is ignored
    let leaked = orch
        .predict(&params(&[
            ("industry", "Government".into()),
            ("industry_ai_adoption_stage", "Mature".into()),
            ("automation_risk_score", 0.01.into()),
        ]))
        .unwrap();
    assert_eq!(leaked, clean);
}

#[test]
fn missing_salary_uses_the_absent_sentinel() {
    let artifacts = ArtifactDir::new(Format::Json);
    let orch = artifacts.orchestrator();
    let mut input = params(&[]);
    input.remove("salary_usd");

    let result = orch.predict(&input).unwrap();
    assert!(result.automation_risk.is_finite());
    // absent salary follows the high-salary branch
    assert_abs_diff_eq!(result.automation_risk, 0.55, epsilon = 1e-6);

    let explicit = orch
        .predict(&params(&[("salary_usd", FeatureValue::Absent)]))
        .unwrap();
    assert_eq!(explicit, result);
}

#[test]
fn missing_salary_rejected_under_strict_policy() {
    let artifacts = ArtifactDir::new(Format::Json);
    let config = PipelineConfig::builder()
        .model_dir(artifacts.path())
        .absent_policy(AbsentPolicy::Reject)
        .build()
        .unwrap();
    let orch = Orchestrator::from_config(&config).unwrap();

    let mut input = params(&[]);
    input.remove("salary_usd");
    assert_eq!(
        orch.predict(&input),
        Err(PipelineError::Request(ModelInputError::AbsentValue {
            row: 0,
            column: "salary_usd".into(),
        }))
    );

    let outcome = orch.predict_outcome(&input);
    match outcome {
        PredictionOutcome::Failure { stage, kind, message } => {
            assert_eq!(stage, None);
            assert_eq!(kind, FailureKind::InvalidInput);
            assert!(message.contains("salary_usd"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[rstest]
#[case::year_min("posting_year", FeatureValue::from(2010))]
#[case::year_max("posting_year", FeatureValue::from(2030))]
#[case::intensity_min("ai_intensity_score", FeatureValue::from(0.0))]
#[case::intensity_max("ai_intensity_score", FeatureValue::from(1.0))]
#[case::salary_min("salary_usd", FeatureValue::from(10_000))]
#[case::salary_max("salary_usd", FeatureValue::from(500_000))]
fn range_boundaries_predict(#[case] key: &str, #[case] value: FeatureValue) {
    let orch = ArtifactDir::new(Format::Json).orchestrator();
    let result = orch.predict(&params(&[(key, value)])).unwrap();
    assert!(result.automation_risk.is_finite());
    assert!((0.0..=1.0).contains(&result.automation_risk));
}

#[test]
fn unknown_category_fails_in_the_first_stage() {
    let orch = ArtifactDir::new(Format::Json).orchestrator();
    let err = orch.predict(&params(&[("city", "Paris".into())])).unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Adoption));
    assert!(matches!(
        err,
        PipelineError::Stage {
            source: StageError::Input(ModelInputError::UnknownCategory { .. }),
            ..
        }
    ));

    let outcome = orch.predict_outcome(&params(&[("salary_usd", "lots".into())]));
    assert!(!outcome.is_success());
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["status"], "failure");
    assert_eq!(json["stage"], "adoption");
    assert_eq!(json["kind"], "invalid_input");
}

#[test]
fn typed_postings_are_validated_first() {
    let orch = ArtifactDir::new(Format::Json).orchestrator();
    let ok = orch.predict_posting(&JobPosting::default()).unwrap();
    assert_eq!(ok, orch.predict(&params(&[])).unwrap());

    let bad = JobPosting {
        ai_intensity_score: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        orch.predict_posting(&bad),
        Err(PipelineError::Request(ModelInputError::InvalidParameter { .. }))
    ));
}

#[test]
fn shared_context_serves_threads() {
    let orch = Arc::new(ArtifactDir::new(Format::Binary).orchestrator());
    let expected = orch.predict(&params(&[])).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let orch = Arc::clone(&orch);
            thread::spawn(move || orch.predict(&params(&[])).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
