/// Report dispatch via local SMTP or a sendmail subprocess
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use lettre::message::header::{ContentDisposition, ContentType};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Message, SendmailTransport, SmtpTransport, Transport};
use log::info;

/// Build and send the report mail: two inline HTML tables followed by the
/// rendered charts as inline PNG attachments.
pub fn send_report(
    mail_to: &[String],
    mail_from: &str,
    use_sendmail: bool,
    daily_html: &str,
    min_max_html: &str,
    images: &[PathBuf],
) -> Result<(), Box<dyn Error>> {
    let mut builder = Message::builder()
        .subject("hydrometer")
        .from(mail_from.parse::<Mailbox>()?);
    for recipient in mail_to {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }

    let mut parts = MultiPart::mixed().build();
    for html in [daily_html, min_max_html] {
        parts = parts.singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .header(ContentDisposition::inline())
                .body(html.to_string()),
        );
    }
    for (index, path) in images.iter().enumerate() {
        let bytes = fs::read(path)?;
        parts = parts.singlepart(
            Attachment::new_inline(format!("plot-{index}"))
                .body(bytes, ContentType::parse("image/png")?),
        );
    }

    let email = builder.multipart(parts)?;

    if use_sendmail {
        info!("Dispatching report via sendmail");
        SendmailTransport::new().send(&email)?;
    } else {
        info!("Dispatching report via SMTP on localhost");
        SmtpTransport::unencrypted_localhost().send(&email)?;
    }

    Ok(())
}
