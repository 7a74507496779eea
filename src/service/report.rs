use bigdecimal::BigDecimal;
use std::io::Write;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::models::{AlertMessage, Anomaly, AnomalyRow, AsInvoice, Severity};

pub const NO_ANOMALIES: &str = "No anomalies detected.";

/// 告警报告生成 (只负责文本与邮件内容，SMTP 发送不在本服务内)
#[derive(Debug, Clone)]
pub struct AlertReporter {
    sender: String,
    top_n: usize,
}

impl AlertReporter {
    pub fn new(cfg: &ReportConfig) -> Self {
        Self {
            sender: cfg.sender.clone(),
            top_n: cfg.top_n,
        }
    }

    /// 纯文本摘要: 总数、High 数量，以及前 top_n 条 High 明细
    pub fn generate_report<R: AsInvoice>(&self, anomalies: &[Anomaly<R>]) -> String {
        if anomalies.is_empty() {
            return NO_ANOMALIES.to_string();
        }

        let high_risk: Vec<&Anomaly<R>> = anomalies
            .iter()
            .filter(|a| a.severity == Severity::High)
            .collect();

        let mut report = String::from("Anomaly Detection Report\n");
        report.push_str(&format!("Total Anomalies: {}\n", anomalies.len()));
        report.push_str(&format!("High Risk Items: {}\n\n", high_risk.len()));
        report.push_str(&format!("Top {} High Risk Items:\n", self.top_n));

        for a in high_risk.iter().take(self.top_n) {
            let inv = a.record.invoice();
            report.push_str(&format!(
                "- {} | ID: {} | Amount: ${} | Reason: {}\n",
                inv.entity_name,
                inv.invoice_id,
                format_amount(&inv.amount),
                a.anomaly_reason
            ));
        }

        report
    }

    /// 组装告警邮件，没有异常时返回 None (不发送)
    pub fn compose_alert<R: AsInvoice>(
        &self,
        recipient: &str,
        anomalies: &[Anomaly<R>],
    ) -> Option<AlertMessage> {
        if anomalies.is_empty() {
            tracing::info!("No anomalies to report, skipping alert for {}", recipient);
            return None;
        }

        Some(AlertMessage {
            from: self.sender.clone(),
            to: recipient.to_string(),
            subject: format!("URGENT: {} Financial Anomalies Detected", anomalies.len()),
            body: self.generate_report(anomalies),
        })
    }
}

/// 两位小数金额
pub fn format_amount(amount: &BigDecimal) -> String {
    amount.round(2).with_scale(2).to_string()
}

/// 导出异常表 CSV (扁平列)
pub fn write_anomalies_csv<W: Write, R: AsInvoice>(writer: W, anomalies: &[Anomaly<R>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for a in anomalies {
        wtr.serialize(AnomalyRow::from(a))?;
    }
    wtr.flush()?;
    Ok(())
}
