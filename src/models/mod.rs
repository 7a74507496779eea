pub mod aging;
pub mod anomaly;
pub mod invoice;
pub mod report;

pub use aging::{AgedRecord, AgingBucket, AgingSummary, BucketTotal};
pub use anomaly::{Anomaly, AnomalyRow, Severity};
pub use invoice::{AsInvoice, InvoiceInput, InvoiceRecord, RawInvoiceRow};
pub use report::AlertMessage;
