//! Attachment URL validation
//!
//! Attachments are uploaded out-of-band; the gateway only ever sees the
//! resulting URL and refuses anything that is not HTTPS on an approved
//! storage host. The three failure modes are distinct user-facing
//! errors, not one collapsed message.

use url::Url;

use crate::handlers::{HandlerError, HandlerResult};

/// Validate an attachment URL against the approved-host list
pub fn validate_attachment_url(raw: &str, approved_hosts: &[String]) -> HandlerResult<()> {
    let url = Url::parse(raw).map_err(|_| HandlerError::AttachmentMalformed)?;

    if url.scheme() != "https" {
        return Err(HandlerError::AttachmentNotHttps);
    }

    let host = url
        .host_str()
        .ok_or(HandlerError::AttachmentMalformed)?
        .to_ascii_lowercase();

    if !approved_hosts.iter().any(|h| h.eq_ignore_ascii_case(&host)) {
        return Err(HandlerError::AttachmentUntrustedHost);
    }

    Ok(())
}
