//! # Rejection Notifier
//!
//! Renders the rejection report for a sample, keeps it as an attachment on
//! the sample and emails the sample's contacts about the rejection.
//!
//! A notification counts as sent once it was composed for at least one
//! recipient. Mail transport failures are logged and do not change the
//! result.

use crate::config::LimsConfig;
use crate::constants::{PDF_CONTENT_TYPE, REJECTED_PDF_SUFFIX};
use crate::error::{LimsError, LimsResult};
use crate::logging::log_sample_operation;
use crate::models::{Content, Sample};
use crate::notifications::mime::{format_address, MimeMessage};
use crate::portal::{ContentStore, MailHost, PdfRenderer, RejectionTemplate};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct RejectionNotifier {
    config: LimsConfig,
    store: Arc<dyn ContentStore>,
    renderer: Arc<dyn PdfRenderer>,
    mail_host: Arc<dyn MailHost>,
}

impl std::fmt::Debug for RejectionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RejectionNotifier")
            .field("laboratory", &self.config.laboratory.name)
            .finish_non_exhaustive()
    }
}

impl RejectionNotifier {
    pub fn new(
        config: LimsConfig,
        store: Arc<dyn ContentStore>,
        renderer: Arc<dyn PdfRenderer>,
        mail_host: Arc<dyn MailHost>,
    ) -> Self {
        Self {
            config,
            store,
            renderer,
            mail_host,
        }
    }

    /// Notify the sample's contacts that it was rejected. Returns `false`
    /// without sending anything when no contact has an email address.
    pub async fn notify_rejection(&self, sample: &mut Sample) -> LimsResult<bool> {
        let sample_id = sample.id().to_string();
        let filename = format!("{sample_id}{REJECTED_PDF_SUFFIX}");

        let report = self
            .renderer
            .render_template(sample, RejectionTemplate::Pdf)
            .await?;
        let pdf = self.renderer.create_pdf(&report).await?;
        if let Some(data) = &pdf {
            let container = sample
                .client_uid()
                .ok_or_else(|| LimsError::Validation(format!("Sample {sample_id} has no client")))?;
            let attachment = self
                .store
                .create_attachment(
                    &container,
                    &format!("{filename}.pdf"),
                    PDF_CONTENT_TYPE,
                    data.clone(),
                )
                .await?;
            sample.add_attachment(&attachment.uid);
            self.store.save_sample(sample).await?;
            debug!(sample = %sample_id, attachment = %attachment.uid, "Attached rejection report");
        }

        let body = self
            .renderer
            .render_template(sample, RejectionTemplate::Email)
            .await?;

        let recipients = self.recipients(sample).await?;
        if recipients.is_empty() {
            log_sample_operation("notify_rejection", &sample_id, "no_recipients", None);
            return Ok(false);
        }

        let laboratory = &self.config.laboratory;
        let subject = format!("{sample_id} has been rejected");
        let mut message = MimeMessage::related(
            subject.as_str(),
            format_address(&laboratory.name, &laboratory.email_address),
        )
        .to(recipients)
        .html_body(&body);
        if self.config.notification.attach_pdf {
            if let Some(data) = pdf {
                message = message.attach_pdf(&filename, data);
            }
        }

        let immediate = self.config.notification.send_immediately;
        match self.mail_host.send(&message.render(), immediate).await {
            Ok(()) => log_sample_operation("notify_rejection", &sample_id, "sent", None),
            Err(e) => warn!(
                sample = %sample_id,
                subject = %subject,
                error = %e,
                "Rejection email was not sent"
            ),
        }
        Ok(true)
    }

    /// Formatted addresses of the primary contact and CC contacts that have
    /// an email address, in that order
    async fn recipients(&self, sample: &Sample) -> LimsResult<Vec<String>> {
        let mut contact_uids: Vec<_> = sample.contact_uid().into_iter().collect();
        contact_uids.extend(sample.cc_contact_uids());

        let mut recipients = Vec::with_capacity(contact_uids.len());
        for uid in &contact_uids {
            let Some(contact) = self.store.get_contact(uid).await? else {
                warn!(contact = %uid, "Contact not found");
                continue;
            };
            if let Some(email) = contact.email() {
                recipients.push(format_address(&contact.fullname, email));
            }
        }
        Ok(recipients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::fields;
    use crate::models::{Contact, Uid};
    use crate::test_helpers::{InMemoryContentStore, RecordingMailHost, StaticPdfRenderer};
    use serde_json::json;

    struct Setup {
        store: Arc<InMemoryContentStore>,
        mail_host: Arc<RecordingMailHost>,
        notifier: RejectionNotifier,
    }

    fn setup(mail_host: RecordingMailHost, renderer: StaticPdfRenderer) -> Setup {
        let store = Arc::new(InMemoryContentStore::new());
        let mail_host = Arc::new(mail_host);
        let notifier = RejectionNotifier::new(
            LimsConfig::default(),
            store.clone(),
            Arc::new(renderer),
            mail_host.clone(),
        );
        Setup {
            store,
            mail_host,
            notifier,
        }
    }

    fn rejected_sample(contact: &Contact, cc: &[&Contact]) -> Sample {
        let mut sample = Sample::new(Uid::generate(), "W-0042", &Uid::generate());
        sample.set_field(fields::CONTACT, json!(contact.uid.as_str()));
        let cc: Vec<_> = cc.iter().map(|c| json!(c.uid.as_str())).collect();
        sample.set_field(fields::CC_CONTACT, json!(cc));
        sample
    }

    #[tokio::test]
    async fn test_no_recipients_means_no_send() {
        let s = setup(RecordingMailHost::new(), StaticPdfRenderer::new());
        let contact = Contact::new("Ann", None);
        let cc = Contact::new("Bob", Some(" "));
        s.store.add_contact(contact.clone());
        s.store.add_contact(cc.clone());
        let mut sample = rejected_sample(&contact, &[&cc]);

        let notified = s.notifier.notify_rejection(&mut sample).await.unwrap();

        assert!(!notified);
        assert!(s.mail_host.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sends_to_contact_and_cc() {
        let s = setup(RecordingMailHost::new(), StaticPdfRenderer::new());
        let contact = Contact::new("Ann", Some("ann@example.com"));
        let cc = Contact::new("Bob", Some("bob@example.com"));
        s.store.add_contact(contact.clone());
        s.store.add_contact(cc.clone());
        let mut sample = rejected_sample(&contact, &[&cc]);

        assert!(s.notifier.notify_rejection(&mut sample).await.unwrap());

        let sent = s.mail_host.sent();
        assert_eq!(sent.len(), 1);
        let (raw, immediate) = &sent[0];
        assert!(immediate);
        assert!(raw.contains("Subject: W-0042 has been rejected"));
        assert!(raw.contains("To: Ann <ann@example.com>,Bob <bob@example.com>"));
        assert!(raw.contains("W-0042-rejected.pdf"));
        assert_eq!(sample.attachment_uids().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_still_reports_attempt() {
        let s = setup(RecordingMailHost::failing(), StaticPdfRenderer::without_pdf());
        let contact = Contact::new("Ann", Some("ann@example.com"));
        s.store.add_contact(contact.clone());
        let mut sample = rejected_sample(&contact, &[]);

        assert!(s.notifier.notify_rejection(&mut sample).await.unwrap());
        assert!(sample.attachment_uids().is_empty());
    }
}
