//! Customer inquiry CLI commands

use crate::cli::context::parse_label;
use aiboard_core::models::{
    InquiryCategory, InquiryPriority, InquirySource, InquiryStatus, SenderType,
};
use clap::Subcommand;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum InquiryCommands {
    /// Record an inquiry and run the customer service workflow for it
    Create {
        /// Inquiry subject
        subject: String,

        /// Inquiry body
        content: String,

        /// email, webhook, form, chat, phone or social
        #[arg(long, default_value = "email", value_parser = parse_label::<InquirySource>)]
        source: InquirySource,

        /// Category; derived from the text when omitted
        #[arg(long, value_parser = parse_label::<InquiryCategory>)]
        category: Option<InquiryCategory>,

        /// low, medium, high or urgent; derived from the text when omitted
        #[arg(long, value_parser = parse_label::<InquiryPriority>)]
        priority: Option<InquiryPriority>,

        /// Customer name
        #[arg(long)]
        name: Option<String>,

        /// Customer email
        #[arg(long)]
        email: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List inquiries
    List {
        /// Only new, assigned or in-progress inquiries
        #[arg(long)]
        open: bool,

        /// Only unresolved urgent inquiries
        #[arg(long, conflicts_with = "open")]
        urgent: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show an inquiry with its responses
    Show {
        /// Inquiry ID (UUID)
        inquiry_id: Uuid,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Add a response to an inquiry
    Respond {
        /// Inquiry ID (UUID)
        inquiry_id: Uuid,

        /// Response text
        content: String,

        /// agent, human or customer
        #[arg(long, default_value = "human", value_parser = parse_label::<SenderType>)]
        sender_type: SenderType,

        /// Sender ID
        #[arg(long, default_value = "operator")]
        sender: String,

        /// Keep the response internal
        #[arg(long)]
        internal: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Change an inquiry's status or assignee
    Update {
        /// Inquiry ID (UUID)
        inquiry_id: Uuid,

        /// new, assigned, in_progress, waiting_customer, resolved or closed
        #[arg(long, value_parser = parse_label::<InquiryStatus>)]
        status: Option<InquiryStatus>,

        /// Assigned agent ID
        #[arg(long)]
        agent: Option<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
