//! Printable-artifact seam for approved permits.
//!
//! Document layout is not this crate's concern; the built-in renderer emits a
//! minimal single-page PDF carrying the frozen approval-time field values so
//! the lifecycle guard (`Approved` only) has a real artifact to hand out.

use crate::models::permit::Permit;

pub trait PermitRenderer: Send + Sync {
    fn render(&self, permit: &Permit) -> Vec<u8>;
}

/// Single-page, single-font PDF writer. No external layout engine.
pub struct MinimalPdfRenderer;

impl MinimalPdfRenderer {
    fn text_lines(permit: &Permit) -> Vec<String> {
        let mut lines = vec![
            "WORK PERMIT".to_string(),
            format!(
                "Permit No: {}",
                permit.permit_number.as_deref().unwrap_or("-")
            ),
            format!("Title: {}", permit.title),
            format!("Terminal: {}", permit.terminal),
            format!("Window: {} - {}", permit.window_start, permit.window_end),
            format!("Requested by account #{}", permit.requester_id),
            format!("Description: {}", permit.description),
        ];

        if let Some(stamp) = &permit.pre_approval {
            lines.push(format!("Pre-approved by {} at {}", stamp.actor_name, stamp.at));
            if let Some(comments) = &stamp.comments {
                lines.push(format!("Pre-approval comments: {comments}"));
            }
        }
        if let Some(stamp) = &permit.approval {
            lines.push(format!("Approved by {} at {}", stamp.actor_name, stamp.at));
        }

        lines
    }

    fn escape(text: &str) -> String {
        text.chars()
            .flat_map(|c| match c {
                '(' => vec!['\\', '('],
                ')' => vec!['\\', ')'],
                '\\' => vec!['\\', '\\'],
                '\n' | '\r' => vec![' '],
                c => vec![c],
            })
            .collect()
    }
}

impl PermitRenderer for MinimalPdfRenderer {
    fn render(&self, permit: &Permit) -> Vec<u8> {
        let mut content = String::from("BT\n/F1 12 Tf\n50 790 Td\n16 TL\n");
        for line in Self::text_lines(permit) {
            content.push_str(&format!("({}) Tj\nT*\n", Self::escape(&line)));
        }
        content.push_str("ET\n");

        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                content.len(),
                content
            ),
        ];

        let mut out = String::from("%PDF-1.4\n");
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_offset = out.len();
        out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
        out.push_str("0000000000 65535 f \n");
        for offset in offsets {
            out.push_str(&format!("{offset:010} 00000 n \n"));
        }
        out.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        ));

        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permit::{PermitStatus, ReviewStamp};

    fn approved_permit() -> Permit {
        Permit {
            id: 1,
            requester_id: 7,
            title: "Hot work (welding)".to_string(),
            description: "Pipe repair at bay 3".to_string(),
            terminal: "Terminal A".to_string(),
            window_start: "2026-03-02T08:00:00Z".to_string(),
            window_end: "2026-03-02T16:00:00Z".to_string(),
            risk_flags: vec!["hot_work".to_string()],
            risk_reasons: None,
            attachments: vec![],
            status: PermitStatus::Approved,
            permit_number: Some("BHS-02032026-101500-001".to_string()),
            pre_approval: Some(ReviewStamp {
                actor_id: 2,
                actor_name: "P. Salem".to_string(),
                at: "2026-03-02T09:00:00Z".to_string(),
                comments: Some("ok".to_string()),
            }),
            approval: Some(ReviewStamp {
                actor_id: 7,
                actor_name: "R. Hasan".to_string(),
                at: "2026-03-02T10:15:00Z".to_string(),
                comments: None,
            }),
            created_at: "2026-03-01T12:00:00Z".to_string(),
            updated_at: "2026-03-02T10:15:00Z".to_string(),
        }
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let bytes = MinimalPdfRenderer.render(&approved_permit());
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));

        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("BHS-02032026-101500-001"));
        assert!(text.contains("Hot work \\(welding\\)"));
    }

    #[test]
    fn test_escape_parentheses() {
        assert_eq!(MinimalPdfRenderer::escape("a(b)c\\"), "a\\(b\\)c\\\\");
    }
}
