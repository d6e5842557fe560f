//! Customer inquiries and the responses recorded on them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Channel an inquiry arrived through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InquirySource {
    #[default]
    Email,
    Webhook,
    Form,
    Chat,
    Phone,
    Social,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InquiryCategory {
    Support,
    Sales,
    Billing,
    Feedback,
    FeatureRequest,
    Complaint,
    #[default]
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InquiryPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    #[default]
    New,
    Assigned,
    InProgress,
    WaitingCustomer,
    Resolved,
    Closed,
}

impl InquiryStatus {
    /// New, assigned or being worked on
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            InquiryStatus::New | InquiryStatus::Assigned | InquiryStatus::InProgress
        )
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, InquiryStatus::Resolved | InquiryStatus::Closed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// Who wrote a response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    Agent,
    Human,
    Customer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseSender {
    #[serde(rename = "type")]
    pub sender_type: SenderType,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryResponse {
    pub id: Uuid,
    pub inquiry_id: Uuid,
    pub content: String,
    pub sender: ResponseSender,
    /// Visible to the customer
    pub is_public: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Customer inquiry taken in by the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInquiry {
    pub id: Uuid,
    pub source: InquirySource,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    pub category: InquiryCategory,
    pub priority: InquiryPriority,
    pub status: InquiryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_human_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub responses: Vec<InquiryResponse>,
    /// Execution of the customer service workflow started for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Minutes until the first non-customer response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_minutes: Option<i64>,
    /// Minutes until the inquiry was resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_time_minutes: Option<i64>,
}

/// Intake payload; category and priority are derived from the text when absent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInquiry {
    #[serde(default)]
    pub source: InquirySource,
    pub subject: String,
    pub content: String,
    #[serde(default)]
    pub customer_info: CustomerInfo,
    #[serde(default)]
    pub category: Option<InquiryCategory>,
    #[serde(default)]
    pub priority: Option<InquiryPriority>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInquiryResponse {
    pub content: String,
    pub sender: ResponseSender,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub attachments: Vec<String>,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InquiryUpdate {
    pub status: Option<InquiryStatus>,
    pub category: Option<InquiryCategory>,
    pub priority: Option<InquiryPriority>,
    pub assigned_agent_id: Option<String>,
    pub assigned_human_id: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub tags: Option<Vec<String>>,
}
