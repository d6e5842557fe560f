//! Customer inquiry intake, triage and response tracking

use crate::models::{
    CustomerInquiry, InquiryCategory, InquiryPriority, InquiryResponse, InquiryStatus,
    InquiryUpdate, NewInquiry, NewInquiryResponse, SenderType,
};
use crate::workflow::persistence::BoardPersistence;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Keyword rules checked in order; the first hit wins
const CATEGORY_KEYWORDS: &[(InquiryCategory, &[&str])] = &[
    (InquiryCategory::Billing, &["billing", "payment", "invoice"]),
    (InquiryCategory::Support, &["bug", "error", "problem", "issue"]),
    (InquiryCategory::FeatureRequest, &["feature", "request", "enhancement"]),
    (InquiryCategory::Sales, &["sales", "pricing", "purchase", "buy"]),
    (InquiryCategory::Complaint, &["complain", "dissatisfied", "upset"]),
    (InquiryCategory::Feedback, &["feedback", "suggestion", "review"]),
];

const PRIORITY_KEYWORDS: &[(InquiryPriority, &[&str])] = &[
    (InquiryPriority::Urgent, &["urgent", "emergency", "critical", "down"]),
    (InquiryPriority::High, &["important", "asap", "priority"]),
    (InquiryPriority::Low, &["when possible", "no rush", "low priority"]),
];

fn inquiry_text(subject: &str, content: &str) -> String {
    format!("{} {}", content, subject).to_lowercase()
}

fn first_match<T: Copy>(text: &str, rules: &[(T, &[&str])]) -> Option<T> {
    rules
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(value, _)| *value)
}

/// Category from keywords in the text, `Support` when nothing matches
pub fn categorize_inquiry(subject: &str, content: &str) -> InquiryCategory {
    first_match(&inquiry_text(subject, content), CATEGORY_KEYWORDS)
        .unwrap_or(InquiryCategory::Support)
}

/// Priority from keywords in the text, `Medium` when nothing matches
pub fn prioritize_inquiry(subject: &str, content: &str) -> InquiryPriority {
    first_match(&inquiry_text(subject, content), PRIORITY_KEYWORDS)
        .unwrap_or(InquiryPriority::Medium)
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_minutes()
}

/// Stores inquiries and the responses given to them
pub struct InquiryDesk {
    persistence: Arc<BoardPersistence>,
}

impl InquiryDesk {
    pub fn new(persistence: Arc<BoardPersistence>) -> Self {
        Self { persistence }
    }

    /// Record a new inquiry, filling in category and priority when missing
    pub fn create(&self, inquiry: NewInquiry) -> Result<CustomerInquiry> {
        let category = match inquiry.category {
            Some(category) if category != InquiryCategory::Other => category,
            _ => categorize_inquiry(&inquiry.subject, &inquiry.content),
        };
        let priority = inquiry
            .priority
            .unwrap_or_else(|| prioritize_inquiry(&inquiry.subject, &inquiry.content));

        let now = Utc::now();
        let inquiry = CustomerInquiry {
            id: Uuid::new_v4(),
            source: inquiry.source,
            subject: inquiry.subject,
            content: inquiry.content,
            customer_info: inquiry.customer_info,
            category,
            priority,
            status: InquiryStatus::New,
            assigned_agent_id: None,
            assigned_human_id: None,
            sentiment: None,
            tags: inquiry.tags,
            responses: Vec::new(),
            execution_id: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            response_time_minutes: None,
            resolution_time_minutes: None,
        };

        self.persistence
            .insert_inquiry(inquiry.clone())
            .context("Failed to store inquiry")?;

        tracing::info!(
            "Inquiry {} received ({:?}, {:?})",
            inquiry.id,
            inquiry.category,
            inquiry.priority
        );
        Ok(inquiry)
    }

    /// Apply an update; `None` when the inquiry does not exist
    pub fn update(&self, inquiry_id: Uuid, update: InquiryUpdate) -> Result<Option<CustomerInquiry>> {
        self.persistence.update_inquiry(inquiry_id, move |inquiry| {
            let now = Utc::now();
            if let Some(status) = update.status {
                if status == InquiryStatus::Resolved && inquiry.status != InquiryStatus::Resolved {
                    inquiry.resolved_at = Some(now);
                    inquiry.resolution_time_minutes =
                        Some(minutes_between(inquiry.created_at, now));
                }
                inquiry.status = status;
            }
            if let Some(category) = update.category {
                inquiry.category = category;
            }
            if let Some(priority) = update.priority {
                inquiry.priority = priority;
            }
            if update.assigned_agent_id.is_some() {
                inquiry.assigned_agent_id = update.assigned_agent_id;
            }
            if update.assigned_human_id.is_some() {
                inquiry.assigned_human_id = update.assigned_human_id;
            }
            if update.sentiment.is_some() {
                inquiry.sentiment = update.sentiment;
            }
            if let Some(tags) = update.tags {
                inquiry.tags = tags;
            }
            inquiry.updated_at = now;
            inquiry.clone()
        })
    }

    /// Link the workflow execution handling an inquiry
    pub fn attach_execution(&self, inquiry_id: Uuid, execution_id: Uuid) -> Result<()> {
        self.persistence.update_inquiry(inquiry_id, |inquiry| {
            inquiry.execution_id = Some(execution_id);
            inquiry.updated_at = Utc::now();
        })?;
        Ok(())
    }

    /// Append a response; `None` when the inquiry does not exist
    ///
    /// A first response that does not come from the customer sets the
    /// inquiry's response time.
    pub fn add_response(
        &self,
        inquiry_id: Uuid,
        response: NewInquiryResponse,
    ) -> Result<Option<InquiryResponse>> {
        let response = InquiryResponse {
            id: Uuid::new_v4(),
            inquiry_id,
            content: response.content,
            sender: response.sender,
            is_public: response.is_public,
            attachments: response.attachments,
            created_at: Utc::now(),
        };

        let stored = response.clone();
        let added = self.persistence.update_inquiry(inquiry_id, move |inquiry| {
            inquiry.responses.push(stored);
            inquiry.updated_at = Utc::now();

            if inquiry.responses.len() == 1
                && response.sender.sender_type != SenderType::Customer
            {
                inquiry.response_time_minutes =
                    Some(minutes_between(inquiry.created_at, response.created_at));
            }
            response
        })?;

        if let Some(response) = &added {
            tracing::info!(
                "Response {} added to inquiry {} by {}",
                response.id,
                inquiry_id,
                response.sender.id
            );
        }
        Ok(added)
    }

    pub fn get(&self, inquiry_id: Uuid) -> Option<CustomerInquiry> {
        self.persistence.get_inquiry(inquiry_id)
    }

    pub fn list(&self) -> Vec<CustomerInquiry> {
        self.persistence.list_inquiries()
    }

    /// Inquiries that are new, assigned or in progress
    pub fn open(&self) -> Vec<CustomerInquiry> {
        self.list()
            .into_iter()
            .filter(|i| i.status.is_open())
            .collect()
    }

    /// Urgent inquiries not yet resolved or closed
    pub fn urgent(&self) -> Vec<CustomerInquiry> {
        self.list()
            .into_iter()
            .filter(|i| i.priority == InquiryPriority::Urgent && !i.status.is_settled())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomerInfo, InquirySource, ResponseSender};
    use tempfile::tempdir;

    fn desk() -> (tempfile::TempDir, InquiryDesk) {
        let dir = tempdir().unwrap();
        let persistence = Arc::new(BoardPersistence::new(dir.path().join("board.json")).unwrap());
        (dir, InquiryDesk::new(persistence))
    }

    fn inquiry(subject: &str, content: &str) -> NewInquiry {
        NewInquiry {
            source: InquirySource::Form,
            subject: subject.to_string(),
            content: content.to_string(),
            customer_info: CustomerInfo {
                email: Some("dana@example.com".to_string()),
                ..CustomerInfo::default()
            },
            ..NewInquiry::default()
        }
    }

    fn sender(sender_type: SenderType) -> ResponseSender {
        ResponseSender {
            sender_type,
            id: "support-bot".to_string(),
            name: "Support Bot".to_string(),
        }
    }

    #[test]
    fn test_categorize_by_keywords() {
        let cases = [
            ("Invoice question", "I was charged twice", InquiryCategory::Billing),
            ("Crash", "There is a bug in the export", InquiryCategory::Support),
            ("Idea", "Please add dark mode as a feature", InquiryCategory::FeatureRequest),
            ("Seats", "What is your pricing for teams?", InquiryCategory::Sales),
            ("Unhappy", "I am very dissatisfied", InquiryCategory::Complaint),
            ("Thoughts", "Some feedback on onboarding", InquiryCategory::Feedback),
            ("Hello", "Just saying hi", InquiryCategory::Support),
        ];
        for (subject, content, expected) in cases {
            assert_eq!(categorize_inquiry(subject, content), expected, "{}", subject);
        }

        // Billing outranks support keywords
        assert_eq!(
            categorize_inquiry("Payment error", "The payment page shows an error"),
            InquiryCategory::Billing
        );
    }

    #[test]
    fn test_prioritize_by_keywords() {
        assert_eq!(prioritize_inquiry("Site is DOWN", ""), InquiryPriority::Urgent);
        assert_eq!(prioritize_inquiry("Please reply asap", ""), InquiryPriority::High);
        assert_eq!(prioritize_inquiry("", "answer when possible"), InquiryPriority::Low);
        assert_eq!(prioritize_inquiry("Question", "How do I log in"), InquiryPriority::Medium);
    }

    #[test]
    fn test_create_fills_missing_triage() {
        let (_dir, desk) = desk();

        let derived = desk
            .create(inquiry("Urgent: invoice wrong", "Our invoice lists the wrong plan"))
            .unwrap();
        assert_eq!(derived.category, InquiryCategory::Billing);
        assert_eq!(derived.priority, InquiryPriority::Urgent);
        assert_eq!(derived.status, InquiryStatus::New);

        // Explicit values are kept, except the catch-all category
        let explicit = desk
            .create(NewInquiry {
                category: Some(InquiryCategory::Sales),
                priority: Some(InquiryPriority::Low),
                ..inquiry("Invoice", "invoice")
            })
            .unwrap();
        assert_eq!(explicit.category, InquiryCategory::Sales);
        assert_eq!(explicit.priority, InquiryPriority::Low);

        let other = desk
            .create(NewInquiry {
                category: Some(InquiryCategory::Other),
                ..inquiry("Refund", "Where is my payment?")
            })
            .unwrap();
        assert_eq!(other.category, InquiryCategory::Billing);

        assert_eq!(desk.list().len(), 3);
        assert_eq!(desk.urgent().len(), 1);
    }

    #[test]
    fn test_first_staff_response_sets_response_time() {
        let (_dir, desk) = desk();
        let created = desk.create(inquiry("Login", "Cannot log in")).unwrap();

        let response = desk
            .add_response(
                created.id,
                NewInquiryResponse {
                    content: "Try resetting your password".to_string(),
                    sender: sender(SenderType::Agent),
                    is_public: true,
                    attachments: vec![],
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(response.inquiry_id, created.id);

        let stored = desk.get(created.id).unwrap();
        assert_eq!(stored.responses.len(), 1);
        assert_eq!(stored.response_time_minutes, Some(0));

        assert!(desk
            .add_response(
                Uuid::new_v4(),
                NewInquiryResponse {
                    content: "lost".to_string(),
                    sender: sender(SenderType::Agent),
                    is_public: true,
                    attachments: vec![],
                },
            )
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_customer_follow_up_does_not_count_as_response() {
        let (_dir, desk) = desk();
        let created = desk.create(inquiry("Login", "Cannot log in")).unwrap();

        desk.add_response(
            created.id,
            NewInquiryResponse {
                content: "Any update?".to_string(),
                sender: sender(SenderType::Customer),
                is_public: true,
                attachments: vec![],
            },
        )
        .unwrap();

        assert_eq!(desk.get(created.id).unwrap().response_time_minutes, None);
    }

    #[test]
    fn test_resolving_records_resolution() {
        let (_dir, desk) = desk();
        let created = desk.create(inquiry("Login", "Cannot log in")).unwrap();
        assert_eq!(desk.open().len(), 1);

        let resolved = desk
            .update(
                created.id,
                InquiryUpdate {
                    status: Some(InquiryStatus::Resolved),
                    assigned_agent_id: Some("support-bot".to_string()),
                    ..InquiryUpdate::default()
                },
            )
            .unwrap()
            .unwrap();

        assert!(resolved.resolved_at.is_some());
        assert_eq!(resolved.resolution_time_minutes, Some(0));
        assert_eq!(resolved.assigned_agent_id.as_deref(), Some("support-bot"));
        assert!(desk.open().is_empty());
        assert!(desk.update(Uuid::new_v4(), InquiryUpdate::default()).unwrap().is_none());
    }
}
