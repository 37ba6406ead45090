//! Employee messaging over WhatsApp.
//!
//! Message templates, the Whapi delivery client, AI-personalized message
//! composition with static fallbacks, and the notifier that ties them to
//! storage and the insight pipeline.

#![warn(missing_docs)]

pub mod composer;
pub mod notifier;
pub mod templates;
pub mod whatsapp;

pub use composer::{
    weekly_report, ComposeError, MessageComposer, MessageKind, DAILY_REMINDER, WEEKLY_REPORT_FALLBACK,
};
pub use notifier::{NotifyError, Notifier};
pub use templates::{MessageTemplates, TemplateError, TemplateKey};
pub use whatsapp::{DeliveryError, MessageSender, SentMessage, WhapiClient, WhapiConfig};
