//! Mail submission shared by the two SendGrid-backed providers

use crate::domain::{EmailAddress, EmailBulkResult, EmailSendResult, SendBulkPayload, SendEmailPayload};
use crate::sendgrid::{
    MailSendRequest, Personalization, SendGridClient, SendGridContent, SendGridEmail,
    MAX_PERSONALIZATIONS,
};
use tracing::warn;

pub(crate) fn sendgrid_address(addr: &EmailAddress) -> SendGridEmail {
    SendGridEmail {
        email: addr.email.clone(),
        name: addr.name.clone().filter(|n| !n.is_empty()),
    }
}

/// All `to` addresses share a single personalization
pub(crate) async fn send_one(
    client: &SendGridClient,
    from: SendGridEmail,
    payload: &SendEmailPayload,
    provider: &'static str,
) -> EmailSendResult {
    let request = MailSendRequest {
        personalizations: vec![Personalization {
            to: payload.to.iter().map(sendgrid_address).collect(),
        }],
        from,
        reply_to: payload.reply_to.as_ref().map(sendgrid_address),
        subject: payload.subject.clone(),
        content: SendGridContent::alternatives(payload.text_part(), payload.html_part()),
    };

    match client.send_mail(&request).await {
        Ok(message_id) => EmailSendResult::success(message_id),
        Err(e) => {
            warn!(provider, error = %e, "SendGrid send failed");
            EmailSendResult::failure(e.to_string())
        }
    }
}

/// One personalization per recipient, at most `MAX_PERSONALIZATIONS` per request.
/// A rejected request fails every recipient it carried.
pub(crate) async fn send_many(
    client: &SendGridClient,
    from: SendGridEmail,
    payload: &SendBulkPayload,
    provider: &'static str,
) -> EmailBulkResult {
    let mut result = EmailBulkResult::default();
    let content = SendGridContent::alternatives(payload.text_part(), payload.html_part());

    for batch in payload.recipients.chunks(MAX_PERSONALIZATIONS) {
        let request = MailSendRequest {
            personalizations: batch
                .iter()
                .map(|r| Personalization {
                    to: vec![sendgrid_address(r)],
                })
                .collect(),
            from: from.clone(),
            reply_to: None,
            subject: payload.subject.clone(),
            content: content.clone(),
        };

        match client.send_mail(&request).await {
            Ok(_) => batch.iter().for_each(|_| result.record_sent()),
            Err(e) => {
                warn!(provider, recipients = batch.len(), error = %e, "SendGrid bulk batch failed");
                let error = e.to_string();
                for recipient in batch {
                    result.record_failure(&recipient.email, &error);
                }
            }
        }
    }

    result
}
