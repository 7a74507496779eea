use arap_anomaly::config::{AggregationMode, DetectionConfig};
use arap_anomaly::models::{AgingBucket, InvoiceInput, InvoiceRecord, Severity};
use arap_anomaly::service::aging;
use arap_anomaly::service::rules::{REASON_DUPLICATE, REASON_WEEKEND};
use arap_anomaly::{AnomalyEngine, RecordNormalizer, RuleBasedDetector};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn input(id: &str, entity: &str, amount: i64, invoice_date: &str) -> InvoiceInput {
    InvoiceInput {
        invoice_id: id.to_string(),
        entity_name: entity.to_string(),
        invoice_date: date(invoice_date),
        due_date: None,
        amount: BigDecimal::from(amount),
        currency: Some("USD".to_string()),
        invoice_type: Some("AP".to_string()),
        status: Some("Open".to_string()),
    }
}

fn normalize(inputs: Vec<InvoiceInput>) -> Vec<InvoiceRecord> {
    RecordNormalizer::default().normalize_inputs(inputs).unwrap()
}

#[test]
fn duplicate_weekend_scenario_through_aging() {
    let records = normalize(vec![
        input("1", "acme", 1000, "2024-01-06"),
        input("2", " ACME ", 1000, "2024-01-06"),
        input("3", "beta", 50, "2024-01-08"),
    ]);
    let aged = aging::classify(&records, date("2024-03-01"));
    assert_eq!(aged[0].aging_bucket, AgingBucket::Days1To30);

    let out = RuleBasedDetector::new().detect(&aged);
    assert_eq!(out.len(), 4);
    for id in ["1", "2"] {
        let hits: Vec<_> = out.iter().filter(|a| a.record.record.invoice_id == id).collect();
        assert_eq!(hits.len(), 2);
        assert!(hits
            .iter()
            .any(|a| a.anomaly_reason == REASON_DUPLICATE && a.severity == Severity::High));
        assert!(hits
            .iter()
            .any(|a| a.anomaly_reason == REASON_WEEKEND && a.severity == Severity::Low));
    }
    assert!(out.iter().all(|a| a.record.record.invoice_id != "3"));
}

#[test]
fn high_amount_threshold_scenario() {
    // 100 weekday invoices: 97 small, two at 9500, one at 9501 -> p98 = 9500
    let mut inputs: Vec<InvoiceInput> = (0..97)
        .map(|i| input(&format!("S{i}"), &format!("VENDOR{i}"), 100 + i, "2024-01-09"))
        .collect();
    inputs.push(input("EQ1", "EDGE1", 9500, "2024-01-09"));
    inputs.push(input("EQ2", "EDGE2", 9500, "2024-01-10"));
    inputs.push(input("ABOVE", "BIG", 9501, "2024-01-09"));

    let out = RuleBasedDetector::new().detect(&normalize(inputs));
    let high: Vec<_> = out
        .iter()
        .filter(|a| a.anomaly_reason.starts_with("Unusually High Amount"))
        .collect();

    assert_eq!(high.len(), 1);
    assert_eq!(high[0].record.invoice_id, "ABOVE");
    assert_eq!(high[0].anomaly_reason, "Unusually High Amount (>9500.00)");
    assert_eq!(high[0].severity, Severity::Medium);
}

#[test]
fn every_member_of_a_duplicate_group_is_flagged() {
    let inputs: Vec<InvoiceInput> = (0..4)
        .map(|i| input(&format!("D{i}"), "ACME", 250, "2024-02-13"))
        .chain(std::iter::once(input("X", "ACME", 251, "2024-02-13")))
        .collect();
    let out = RuleBasedDetector::new().detect(&normalize(inputs));
    let dup_ids: Vec<&str> = out
        .iter()
        .filter(|a| a.anomaly_reason == REASON_DUPLICATE)
        .map(|a| a.record.invoice_id.as_str())
        .collect();
    assert_eq!(dup_ids, vec!["D0", "D1", "D2", "D3"]);
}

#[test]
fn engine_keeps_rule_and_model_rows_separate() {
    let mut inputs: Vec<InvoiceInput> = (0..99)
        .map(|i| {
            let d = date("2024-01-01") + chrono::Duration::days(i * 3);
            input(&format!("N{i}"), &format!("V{i}"), 100 + (i * 37) % 400, &d.to_string())
        })
        .collect();
    inputs.push(input("SPIKE", "WHALE", 5_000_000, "2024-05-14"));
    let records = normalize(inputs);

    let engine = AnomalyEngine::new(DetectionConfig::default()).unwrap();
    let outcome = engine.process(&records, date("2024-12-31")).unwrap();

    let spike_reasons: Vec<&str> = outcome
        .anomalies
        .iter()
        .filter(|a| a.record.record.invoice_id == "SPIKE")
        .map(|a| a.anomaly_reason.as_str())
        .collect();
    assert!(spike_reasons.contains(&"Statistical Outlier (ML)"));
    assert!(spike_reasons.iter().any(|r| r.starts_with("Unusually High Amount")));
    assert_eq!(
        outcome.stats.anomalies,
        outcome.stats.rule_hits + outcome.stats.model_hits
    );

    // rules first, then model
    let first_model = outcome
        .anomalies
        .iter()
        .position(|a| a.anomaly_score.is_some())
        .unwrap();
    assert!(outcome.anomalies[first_model..]
        .iter()
        .all(|a| a.anomaly_score.is_some()));

    let merged = AnomalyEngine::new(DetectionConfig::default())
        .unwrap()
        .with_aggregation(AggregationMode::MergePerInvoice)
        .process(&records, date("2024-12-31"))
        .unwrap();
    assert_eq!(
        merged
            .anomalies
            .iter()
            .filter(|a| a.record.record.invoice_id == "SPIKE")
            .count(),
        1
    );

    let again = engine.process(&records, date("2024-12-31")).unwrap();
    assert_eq!(outcome.anomalies, again.anomalies);
}
