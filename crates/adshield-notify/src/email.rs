use adshield_common::types::{DigestPayload, Severity};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::{NotifyError, Result};

/// SMTP sender for the daily digest email.
pub struct DigestMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl DigestMailer {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?
            .port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from: from.to_string(),
        })
    }

    /// Render the digest as a self-contained HTML table.
    pub fn render_html(company: &str, payload: &DigestPayload) -> String {
        let icon = |s: Severity| match s {
            Severity::Crit => "🔴",
            Severity::Warn => "⚠️",
            Severity::Ok => "✅",
        };

        let rows: String = payload
            .items
            .iter()
            .map(|i| {
                format!(
                    "<tr>\
                     <td style=\"padding:6px\">{}</td>\
                     <td style=\"padding:6px;font-weight:600\">{}</td>\
                     <td style=\"padding:6px\">{}{}</td>\
                     </tr>",
                    icon(i.severity),
                    i.brand.as_deref().unwrap_or(""),
                    i.title,
                    i.detail
                        .as_deref()
                        .map(|d| format!(" — {d}"))
                        .unwrap_or_default(),
                )
            })
            .collect();

        let note = payload
            .source_note
            .as_deref()
            .map(|n| format!("<div style=\"color:#777;margin-top:12px\"><em>{n}</em></div>"))
            .unwrap_or_default();

        format!(
            "<div style=\"font-family:Inter,Arial,sans-serif;color:#111\">\
             <h2 style=\"margin:0 0 8px\">🛡 Daily Digest — {company}</h2>\
             <div style=\"color:#666;margin-bottom:12px\">\
             <b>{}</b> stable • <b>{}</b> risks • <b>{}</b> critical</div>\
             <table style=\"width:100%;border-collapse:collapse\">{rows}</table>\
             {note}\
             </div>",
            payload.summary.ok, payload.summary.warn, payload.summary.crit,
        )
    }

    /// Send one digest email. Like the webhook path, a single attempt: the
    /// caller decides what a failure means for the batch.
    pub async fn send_digest(
        &self,
        to: &str,
        subject: &str,
        company: &str,
        payload: &DigestPayload,
    ) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(self.from.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotifyError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(Self::render_html(company, payload))
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        Ok(())
    }
}
