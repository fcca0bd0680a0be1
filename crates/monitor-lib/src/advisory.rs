//! PDF advisory documents for stored alerts
//!
//! Rendered with the PDF base-14 fonts, so no font files are needed at
//! runtime.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};

use crate::error::AdvisoryError;
use crate::store::StoredAlert;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 6.5;

/// Characters per body line before wrapping
const WRAP_WIDTH: usize = 85;

/// Body lines of an advisory, in print order
pub fn advisory_lines(stored: &StoredAlert) -> Vec<String> {
    let alert = &stored.alert;
    let mut lines = vec![
        format!("Alert ID: {}", stored.id),
        format!("Status: {}", alert.status),
    ];
    lines.extend(wrap(&format!("Message: {}", alert.message), WRAP_WIDTH));
    lines.push(format!("SST: {:.2}", alert.sst));
    lines.push(format!("Chlorophyll: {:.3}", alert.chl));
    lines.push(match &alert.location {
        Some(loc) => format!("Location: {:.4}, {:.4}", loc.lat, loc.lon),
        None => "Location: unknown".to_string(),
    });
    let observed = alert.observed_at.unwrap_or(stored.created_at);
    lines.push(format!("Time: {}", observed.to_rfc3339()));
    lines
}

/// Advisory title line
pub fn advisory_title(stored: &StoredAlert) -> String {
    format!("Advisory: {}", stored.alert.alert_type)
}

/// Render a single-page PDF advisory
pub fn render_advisory_pdf(stored: &StoredAlert) -> Result<Vec<u8>, AdvisoryError> {
    let title = advisory_title(stored);
    let (doc, page, layer) = PdfDocument::new(
        title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "advisory",
    );

    let heading = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AdvisoryError::Pdf(e.to_string()))?;
    let body = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AdvisoryError::Pdf(e.to_string()))?;

    let canvas = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    write_line(&canvas, &title, TITLE_SIZE, y, &heading);
    y -= LINE_HEIGHT_MM * 2.0;

    for line in advisory_lines(stored) {
        if y < MARGIN_MM {
            break;
        }
        write_line(&canvas, &line, BODY_SIZE, y, &body);
        y -= LINE_HEIGHT_MM;
    }

    doc.save_to_bytes()
        .map_err(|e| AdvisoryError::Pdf(e.to_string()))
}

fn write_line(canvas: &PdfLayerReference, text: &str, size: f32, y: f32, font: &IndirectFontRef) {
    canvas.use_text(text, size, Mm(MARGIN_MM), Mm(y), font);
}

/// Greedy word wrap; words longer than `width` get a line of their own
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Attachment file name for an advisory
pub fn advisory_filename(id: u64) -> String {
    format!("advisory_{}.pdf", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{AnomalyEvaluator, DetectorConfig};
    use crate::models::{ChannelHistory, Measurement};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn stored(measurement: Measurement) -> StoredAlert {
        let alert = AnomalyEvaluator::new(DetectorConfig::default())
            .unwrap()
            .evaluate(&measurement, &ChannelHistory::default())
            .unwrap()
            .into_alert()
            .unwrap();
        StoredAlert {
            id: 12,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap(),
            alert,
            notified: false,
            notifications: BTreeMap::new(),
        }
    }

    #[test]
    fn test_lines_with_location_and_timestamp() {
        let observed = Utc.with_ymd_and_hms(2024, 4, 30, 23, 15, 0).unwrap();
        let stored = stored(
            Measurement::new(31.2, 0.4)
                .with_location(15.5, 73.75)
                .with_timestamp(observed),
        );

        assert_eq!(advisory_title(&stored), "Advisory: environmental risk");
        let lines = advisory_lines(&stored);
        assert_eq!(lines[0], "Alert ID: 12");
        assert!(lines.contains(&"Status: Active".to_string()));
        assert!(lines.contains(&"Message: SST too high: 31.2".to_string()));
        assert!(lines.contains(&"Location: 15.5000, 73.7500".to_string()));
        assert!(lines.contains(&"Time: 2024-04-30T23:15:00+00:00".to_string()));
    }

    #[test]
    fn test_lines_fall_back_to_creation_time() {
        let lines = advisory_lines(&stored(Measurement::new(27.0, 3.9)));
        assert!(lines.contains(&"Location: unknown".to_string()));
        assert!(lines.contains(&"Time: 2024-05-01T06:00:00+00:00".to_string()));
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = render_advisory_pdf(&stored(Measurement::new(31.2, 3.4))).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 200);
    }

    #[test]
    fn test_wrap_long_message() {
        let text = "SST z=12.50; SST too high: 35.0; Chl z=4.20; Chl too high: 4.10";
        let lines = wrap(text, 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 20));
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_advisory_filename() {
        assert_eq!(advisory_filename(7), "advisory_7.pdf");
    }
}
