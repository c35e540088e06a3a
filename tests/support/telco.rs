use std::path::Path;

use churnguard::dataset::Frame;
use churnguard::features::{EncodedDataset, FeatureSchema, build_features};
use churnguard::ml::gbdt_stump::{GbdtStumpModel, Stump};
use churnguard::record::{ID_COLUMN, Record};
use churnguard::serving::save_artifacts;

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const PAYMENTS: [&str; 4] = [
    "Bank transfer (automatic)",
    "Credit card (automatic)",
    "Electronic check",
    "Mailed check",
];

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Deterministic telco-style customer row. Month-to-month customers with
/// short tenure churn.
pub fn telco_row(i: usize) -> Record {
    let contract = CONTRACTS[i % 3];
    let tenure = ((i * 7) % 72) as i64 + 1;
    let internet = INTERNET[(i / 3) % 3];
    let addon = |k: usize| {
        if internet == "No" {
            "No internet service"
        } else {
            yes_no((i + k) % 2 == 0)
        }
    };
    let phone = i % 5 != 0;
    let monthly = 20.25 + ((i * 13) % 90) as f64;
    Record::new()
        .with(ID_COLUMN, format!("{i:04}-CUST"))
        .with("gender", if i % 2 == 0 { "Female" } else { "Male" })
        .with("SeniorCitizen", i64::from(i % 4 == 0))
        .with("Partner", yes_no(i % 3 == 0))
        .with("Dependents", yes_no(i % 4 == 1))
        .with("tenure", tenure)
        .with("PhoneService", yes_no(phone))
        .with(
            "MultipleLines",
            if phone {
                yes_no(i % 2 == 1)
            } else {
                "No phone service"
            },
        )
        .with("InternetService", internet)
        .with("OnlineSecurity", addon(0))
        .with("OnlineBackup", addon(1))
        .with("DeviceProtection", addon(2))
        .with("TechSupport", addon(3))
        .with("StreamingTV", addon(4))
        .with("StreamingMovies", addon(5))
        .with("Contract", contract)
        .with("PaperlessBilling", yes_no(i % 3 != 1))
        .with("PaymentMethod", PAYMENTS[i % 4])
        .with("MonthlyCharges", monthly)
        .with("TotalCharges", monthly * tenure as f64)
        .with("Churn", yes_no(contract == "Month-to-month" && tenure <= 24))
}

pub fn telco_rows(n: usize) -> Vec<Record> {
    (0..n).map(telco_row).collect()
}

pub fn frame(records: &[Record]) -> Frame {
    Frame::from_rows(records.iter().map(|record| {
        record
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Encode the fixture rows the way `churn-train` does.
pub fn encode(records: &[Record]) -> EncodedDataset {
    build_features(&frame(records).without_column(ID_COLUMN), "Churn").expect("encode fixture")
}

/// A request as a caller would send it: no label, no identifier.
pub fn request(i: usize) -> Record {
    telco_row(i)
        .iter()
        .filter(|(name, _)| *name != "Churn" && *name != ID_COLUMN)
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Hand-built model over `schema`: short tenure on a month-to-month contract churns.
pub fn contract_tenure_model(schema: &FeatureSchema) -> GbdtStumpModel {
    let index = |name: &str| schema.position(name).expect("fixture column") as u16;
    GbdtStumpModel {
        model_version: 1,
        feature_columns: schema.columns().to_vec(),
        classes: vec!["No".into(), "Yes".into()],
        learning_rate: 1.0,
        init_raw: 0.0,
        stumps: vec![
            Stump {
                feature_index: index("tenure"),
                threshold: 24.5,
                left_value: 1.0,
                right_value: -3.0,
            },
            Stump {
                feature_index: index("Contract_One year"),
                threshold: 0.5,
                left_value: 1.0,
                right_value: -3.0,
            },
            Stump {
                feature_index: index("Contract_Two year"),
                threshold: 0.5,
                left_value: 1.0,
                right_value: -3.0,
            },
        ],
    }
}

/// Write a complete artifact directory for the fixture data and return its schema.
pub fn write_artifact(dir: &Path) -> FeatureSchema {
    let encoded = encode(&telco_rows(60));
    let schema = encoded.schema().expect("fixture schema");
    let model = contract_tenure_model(&schema);
    save_artifacts(dir, &model, &encoded.plan, &schema).expect("save fixture artifacts");
    schema
}
