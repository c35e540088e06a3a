mod support;

use std::fs;
use std::sync::Arc;

use churnguard::config::ChurnConfig;
use churnguard::features::{
    ENCODING_PLAN_FILE_NAME, FEATURE_COLUMNS_FILE_NAME, FeatureMatrix, FieldRule, one_hot_column,
};
use churnguard::ml::gbdt_stump::GbdtStumpModel;
use churnguard::ml::{Classifier, MODEL_FILE_NAME, ModelError};
use churnguard::record::{CustomerRecord, Record};
use churnguard::serving::{
    ChurnVerdict, Degradation, InitError, PredictError, PredictionResponse, RUN_ARTIFACT_SUBDIR,
    ServeTransform, ServingContext,
};
use support::telco::{request, write_artifact};
use tempfile::tempdir;

fn context() -> (tempfile::TempDir, ServingContext) {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("model");
    write_artifact(&dir);
    let context = ServingContext::from_dir(&dir).expect("load artifact");
    (temp, context)
}

fn response_json(context: &ServingContext, record: &Record) -> String {
    serde_json::to_string(&context.respond(record)).expect("serialize response")
}

#[test]
fn short_tenure_month_to_month_is_likely_to_churn() {
    let (_temp, context) = context();
    assert_eq!(
        response_json(&context, &request(0)),
        r#"{"prediction":"Likely to churn"}"#
    );
}

#[test]
fn form_values_encode_to_canonical_columns() {
    let (_temp, context) = context();
    let record = request(0)
        .with("gender", "Female")
        .with("Partner", "Yes")
        .with("tenure", 5)
        .with("MonthlyCharges", 70.35)
        .with("TotalCharges", 350.0);
    let (values, report) = context.transform().transform(&record);
    let schema = context.schema();
    let value = |name: &str| values[schema.position(name).expect("schema column")];
    assert_eq!(values.len(), schema.len());
    assert_eq!(value("gender"), 0.0);
    assert_eq!(value("Partner"), 1.0);
    assert_eq!(value("tenure"), 5.0);
    assert_eq!(value("MonthlyCharges"), 70.35);
    assert_eq!(value("TotalCharges"), 350.0);
    assert!(report.degradations.is_empty());
    for spec in &context.transform().plan().fields {
        let FieldRule::OneHot { categories, .. } = &spec.rule else {
            continue;
        };
        let active = categories
            .iter()
            .filter_map(|category| schema.position(&one_hot_column(&spec.name, category)))
            .filter(|&idx| values[idx] == 1.0)
            .count();
        assert!(active <= 1, "{} has {active} active indicators", spec.name);
    }
}

struct FixedOutput(f32);

impl Classifier for FixedOutput {
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<f32>, ModelError> {
        Ok(vec![self.0; features.n_rows()])
    }
}

#[test]
fn model_output_maps_to_exact_labels() {
    let temp = tempdir().expect("tempdir");
    let schema = write_artifact(temp.path());
    let respond = |output: f32| {
        let context = ServingContext::new(
            Arc::new(FixedOutput(output)),
            ServeTransform::with_canonical_rules(schema.clone()),
            temp.path(),
        );
        context.respond(&request(5))
    };
    assert_eq!(
        respond(1.0),
        PredictionResponse::Prediction {
            prediction: ChurnVerdict::Likely
        }
    );
    assert_eq!(
        respond(0.0),
        PredictionResponse::Prediction {
            prediction: ChurnVerdict::NotLikely
        }
    );
    assert_eq!(ChurnVerdict::Likely.as_str(), "Likely to churn");
    assert_eq!(ChurnVerdict::NotLikely.as_str(), "Not likely to churn");
}

#[test]
fn long_contract_is_not_likely_to_churn() {
    let (_temp, context) = context();
    assert_eq!(
        response_json(&context, &request(2)),
        r#"{"prediction":"Not likely to churn"}"#
    );
}

#[test]
fn typed_form_payload_round_trips_through_json() {
    let (_temp, context) = context();
    let body = r#"{
        "gender": "Male", "Partner": "No", "Dependents": "No", "PhoneService": "Yes",
        "MultipleLines": "No", "InternetService": "Fiber optic", "OnlineSecurity": "No",
        "OnlineBackup": "No", "DeviceProtection": "No", "TechSupport": "No",
        "StreamingTV": "Yes", "StreamingMovies": "Yes", "Contract": "Month-to-month",
        "PaperlessBilling": "Yes", "PaymentMethod": "Electronic check",
        "tenure": 2, "MonthlyCharges": 95.5, "TotalCharges": 191.0
    }"#;
    let typed: CustomerRecord = serde_json::from_str(body).expect("typed payload");
    let record = Record::from(typed);
    let prediction = context.predict(&record).expect("prediction");
    assert_eq!(prediction.verdict, ChurnVerdict::Likely);
    // SeniorCitizen is a model column the form never collects.
    assert!(
        prediction
            .report
            .degradations
            .contains(&Degradation::MissingField {
                field: "SeniorCitizen".into()
            })
    );
}

#[test]
fn bad_numeric_and_unseen_category_still_predict() {
    let (_temp, context) = context();
    let record = request(2)
        .with("TotalCharges", " ")
        .with("PaymentMethod", "Crypto wallet");
    let prediction = context.predict(&record).expect("prediction");
    assert_eq!(prediction.verdict, ChurnVerdict::NotLikely);
    let events = prediction.report.degradations.events();
    assert!(events.contains(&Degradation::NumericDefaulted {
        field: "TotalCharges".into(),
        raw: " ".into(),
    }));
    assert!(events.contains(&Degradation::UnseenCategory {
        field: "PaymentMethod".into(),
        value: "Crypto wallet".into(),
    }));
    assert!(
        prediction
            .report
            .reconcile
            .dropped
            .contains(&"PaymentMethod_Crypto wallet".to_string())
    );
}

#[test]
fn sparse_request_is_filled_with_zeros() {
    let (_temp, context) = context();
    let record = Record::new().with("tenure", 3).with("Contract", "Month-to-month");
    let prediction = context.predict(&record).expect("prediction");
    assert_eq!(prediction.verdict, ChurnVerdict::Likely);
    assert!(prediction.report.degradations.len() > 10);
}

#[test]
fn batch_prediction_keeps_row_order() {
    let (_temp, context) = context();
    let records: Vec<Record> = (0..12).map(request).collect();
    let predictions = context.predict_batch(&records).expect("batch");
    assert_eq!(predictions.len(), 12);
    for (idx, prediction) in predictions.iter().enumerate() {
        let single = context.predict(&records[idx]).expect("single");
        assert_eq!(prediction.verdict, single.verdict, "row {idx}");
    }
}

struct BrokenModel;

impl Classifier for BrokenModel {
    fn predict(&self, _features: &FeatureMatrix) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::Runtime("tensor shape mismatch".into()))
    }
}

#[test]
fn model_failure_becomes_error_payload() {
    let temp = tempdir().expect("tempdir");
    let schema = write_artifact(temp.path());
    let context = ServingContext::new(
        Arc::new(BrokenModel),
        ServeTransform::with_canonical_rules(schema),
        temp.path(),
    );
    let result = context.predict(&request(0));
    assert!(matches!(result, Err(PredictError::ModelFailed(_))));
    assert_eq!(
        context.respond(&request(0)),
        PredictionResponse::Error {
            error: "Model prediction failed: tensor shape mismatch".into()
        }
    );
}

#[test]
fn artifact_without_plan_uses_canonical_rules() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("model");
    write_artifact(&dir);
    fs::remove_file(dir.join(ENCODING_PLAN_FILE_NAME)).expect("remove plan");
    let context = ServingContext::from_dir(&dir).expect("load artifact");
    assert_eq!(
        context.predict(&request(0)).expect("prediction").verdict,
        ChurnVerdict::Likely
    );
    assert_eq!(
        context.predict(&request(2)).expect("prediction").verdict,
        ChurnVerdict::NotLikely
    );
}

#[test]
fn falls_back_to_latest_run_when_model_dir_is_unusable() {
    let temp = tempdir().expect("tempdir");
    let runs_root = temp.path().join("mlruns");
    let run_dir = runs_root.join("0").join("abc123").join(RUN_ARTIFACT_SUBDIR);
    write_artifact(&run_dir);
    let config = ChurnConfig {
        model_dir: temp.path().join("missing"),
        runs_root,
        ..ChurnConfig::default()
    };
    let context = ServingContext::init(&config).expect("fallback");
    assert_eq!(context.artifact_dir(), run_dir.as_path());
}

#[test]
fn fails_fast_without_any_artifact() {
    let temp = tempdir().expect("tempdir");
    let config = ChurnConfig {
        model_dir: temp.path().join("missing"),
        runs_root: temp.path().join("mlruns"),
        ..ChurnConfig::default()
    };
    let err = ServingContext::init(&config).err().expect("init must fail");
    assert!(matches!(err, InitError::NoArtifacts { .. }));
}

#[test]
fn missing_schema_is_an_init_error() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("model");
    write_artifact(&dir);
    fs::remove_file(dir.join(FEATURE_COLUMNS_FILE_NAME)).expect("remove schema");
    assert!(matches!(
        ServingContext::from_dir(&dir),
        Err(InitError::Schema(_))
    ));
    assert!(dir.join(MODEL_FILE_NAME).is_file());
}

#[test]
fn request_cannot_set_indicator_columns_directly() {
    let (_temp, context) = context();
    let record = request(0)
        .with("Contract", "Month-to-month")
        .with("Contract_Two year", 1);
    let (values, report) = context.transform().transform(&record);
    let column = context.schema().position("Contract_Two year").expect("column");
    assert_eq!(values[column], 0.0);
    assert!(
        report
            .reconcile
            .dropped
            .contains(&"Contract_Two year".to_string())
    );
    assert_eq!(
        context.predict(&record).expect("prediction").verdict,
        ChurnVerdict::Likely
    );
}

fn swap_model_columns(dir: &std::path::Path) {
    let path = dir.join(MODEL_FILE_NAME);
    let mut model = GbdtStumpModel::load_json(&path).expect("load model");
    model.feature_columns.swap(0, 1);
    model.save_json(&path).expect("save model");
}

#[test]
fn model_and_schema_disagreement_fails_at_load() {
    let temp = tempdir().expect("tempdir");
    let dir = temp.path().join("model");
    write_artifact(&dir);
    swap_model_columns(&dir);
    assert!(matches!(
        ServingContext::from_dir(&dir),
        Err(InitError::ColumnMismatch { .. })
    ));
}

#[test]
fn inconsistent_model_dir_falls_back_to_run() {
    let temp = tempdir().expect("tempdir");
    let model_dir = temp.path().join("model");
    write_artifact(&model_dir);
    swap_model_columns(&model_dir);
    let runs_root = temp.path().join("mlruns");
    let run_dir = runs_root.join("1").join("def456").join(RUN_ARTIFACT_SUBDIR);
    write_artifact(&run_dir);
    let config = ChurnConfig {
        model_dir,
        runs_root,
        ..ChurnConfig::default()
    };
    let context = ServingContext::init(&config).expect("fallback");
    assert_eq!(context.artifact_dir(), run_dir.as_path());
}
