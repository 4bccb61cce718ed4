// 📨 Document loading - .eml (MIME) and saved .html notifications from disk

use crate::registry::MailDocument;
use anyhow::{bail, Context, Result};
use mailparse::{addrparse, parse_mail, MailAddr, MailHeaderMap, ParsedMail};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const EXTENSIONS: [&str; 3] = ["eml", "html", "htm"];

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<MailDocument>,
    /// Sender not in the allow-list
    pub skipped_senders: usize,
    /// Unreadable file or no html/plain body
    pub unreadable: usize,
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// A single file, or every supported file under a directory (sorted)
pub fn collect_files(input_path: &Path) -> Result<Vec<PathBuf>> {
    if !input_path.exists() {
        bail!("path not found: {}", input_path.display());
    }
    if input_path.is_file() {
        if !has_supported_extension(input_path) {
            bail!("unsupported file (expected .eml or .html): {}", input_path.display());
        }
        return Ok(vec![input_path.to_path_buf()]);
    }

    let mut files = WalkDir::new(input_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_supported_extension(p))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

/// HTML part preferred, plain text as fallback
fn extract_best_body(mail: &ParsedMail) -> Option<String> {
    fn walk(mail: &ParsedMail, want_html: bool) -> Option<String> {
        let mime = mail.ctype.mimetype.to_ascii_lowercase();
        if (want_html && mime == "text/html") || (!want_html && mime == "text/plain") {
            if let Ok(body) = mail.get_body() {
                return Some(body);
            }
        }
        mail.subparts.iter().find_map(|part| walk(part, want_html))
    }

    walk(mail, true).or_else(|| walk(mail, false))
}

/// Bare address of the first `From` mailbox
fn sender_address(mail: &ParsedMail) -> Option<String> {
    let from = mail.headers.get_first_value("From")?;
    let parsed = addrparse(&from).ok()?;
    let addr = parsed.iter().find_map(|addr| match addr {
        MailAddr::Single(info) => Some(info.addr.clone()),
        MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
    });
    addr.or_else(|| Some(from.trim().to_string()))
}

pub fn load_eml(path: &Path) -> Result<MailDocument> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mail = parse_mail(&bytes).with_context(|| format!("invalid MIME in {}", path.display()))?;
    let body = extract_best_body(&mail)
        .with_context(|| format!("no html/plain body in {}", path.display()))?;
    let sender = sender_address(&mail);

    Ok(MailDocument::new(body, sender.as_deref()).with_origin(path.display().to_string()))
}

/// Saved notification body, no sender information
pub fn load_html(path: &Path) -> Result<MailDocument> {
    let body = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(MailDocument::new(body, None).with_origin(path.display().to_string()))
}

pub fn load_file(path: &Path) -> Result<MailDocument> {
    let is_eml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("eml"))
        .unwrap_or(false);
    if is_eml {
        load_eml(path)
    } else {
        load_html(path)
    }
}

/// Load every document under `input_path`. Unreadable files and mail from
/// senders rejected by `sender_allowed` are counted, not fatal. Documents
/// without a sender are always kept.
pub fn load_documents<F>(input_path: &Path, sender_allowed: F) -> Result<LoadOutcome>
where
    F: Fn(&str) -> bool,
{
    let mut outcome = LoadOutcome::default();

    for path in collect_files(input_path)? {
        let doc = match load_file(&path) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(error = %format!("{:#}", err), "skipping unreadable document");
                outcome.unreadable += 1;
                continue;
            }
        };

        if let Some(sender) = doc.sender.as_deref() {
            if !sender_allowed(sender) {
                tracing::debug!(sender, origin = %doc.origin, "sender not allowed");
                outcome.skipped_senders += 1;
                continue;
            }
        }

        outcome.documents.push(doc);
    }

    tracing::info!(
        loaded = outcome.documents.len(),
        skipped_senders = outcome.skipped_senders,
        unreadable = outcome.unreadable,
        "documents loaded"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BCP_EML: &str = "From: BCP <notificaciones@notificacionesbcp.com.pe>\r\n\
        To: tesoreria@empresa.pe\r\n\
        Subject: Constancia de transferencia\r\n\
        MIME-Version: 1.0\r\n\
        Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
        \r\n\
        --b1\r\n\
        Content-Type: text/plain; charset=utf-8\r\n\
        \r\n\
        Texto plano\r\n\
        --b1\r\n\
        Content-Type: text/html; charset=utf-8\r\n\
        \r\n\
        <html><body><p>BCP</p></body></html>\r\n\
        --b1--\r\n";

    const PROMO_EML: &str = "From: promo@tienda.pe\r\n\
        Content-Type: text/plain\r\n\
        \r\n\
        Ofertas\r\n";

    #[test]
    fn test_load_eml_prefers_html_and_extracts_sender() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bcp.eml");
        fs::write(&path, BCP_EML).unwrap();

        let doc = load_eml(&path).unwrap();
        assert_eq!(doc.sender.as_deref(), Some("notificaciones@notificacionesbcp.com.pe"));
        assert!(doc.body.contains("<p>BCP</p>"));
        assert!(doc.origin.ends_with("bcp.eml"));
    }

    #[test]
    fn test_load_documents_filters_senders() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.eml"), BCP_EML).unwrap();
        fs::write(dir.path().join("b.eml"), PROMO_EML).unwrap();
        fs::create_dir(dir.path().join("saved")).unwrap();
        fs::write(dir.path().join("saved").join("c.html"), "<html><body>x</body></html>").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let outcome = load_documents(dir.path(), |s| s.ends_with("notificacionesbcp.com.pe")).unwrap();

        assert_eq!(outcome.documents.len(), 2);
        assert_eq!(outcome.skipped_senders, 1);
        assert_eq!(outcome.unreadable, 0);
        assert!(outcome.documents[1].sender.is_none());
    }

    #[test]
    fn test_collect_files_errors() {
        let dir = TempDir::new().unwrap();
        assert!(collect_files(&dir.path().join("missing")).is_err());

        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "x").unwrap();
        assert!(collect_files(&txt).is_err());
        assert!(collect_files(dir.path()).unwrap().is_empty());
    }
}
