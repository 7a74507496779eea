use serde::{Deserialize, Serialize};

/// 待发送的告警邮件 (只负责组装，发送由外部完成)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}
