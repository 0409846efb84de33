//! Pure shaping of detections for display.

use crate::models::{AnalysisPayload, SymbolDetection};

/// Descending by confidence; equal confidences keep their incoming order.
pub fn sort_by_confidence(mut detections: Vec<SymbolDetection>) -> Vec<SymbolDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    detections
}

pub fn confidence_percent(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Moderate,
}

pub fn confidence_band(confidence: f64) -> ConfidenceBand {
    if confidence_percent(confidence) >= 80 { ConfidenceBand::High } else { ConfidenceBand::Moderate }
}

/// Splits free-text dos/don'ts into list items, one per line.
pub fn parse_care_notes(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCard {
    pub title: String,
    pub category_label: &'static str,
    pub description: String,
    pub confidence_percent: u8,
    pub band: ConfidenceBand,
    pub dos: Vec<String>,
    pub donts: Vec<String>,
    pub image: Option<String>,
}

impl DetectionCard {
    pub fn from_detection(d: &SymbolDetection) -> Self {
        Self {
            title: d.title.clone(),
            category_label: d.category.label(),
            description: d.short_description.clone(),
            confidence_percent: confidence_percent(d.confidence),
            band: confidence_band(d.confidence),
            dos: parse_care_notes(d.dos.as_deref()),
            donts: parse_care_notes(d.donts.as_deref()),
            image: d.image.clone(),
        }
    }

    pub fn has_more_info(&self) -> bool { !self.dos.is_empty() || !self.donts.is_empty() }
}

/// What the results screen shows. "No analysis" and "nothing detected" are different states.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    NoAnalysis,
    NothingDetected { file_id: String },
    Detected { file_id: String, detections: Vec<SymbolDetection> },
}

impl ResultsView {
    pub fn from_handoff(payload: Option<AnalysisPayload>) -> Self {
        match payload {
            None => ResultsView::NoAnalysis,
            Some(p) if p.detections.is_empty() => ResultsView::NothingDetected { file_id: p.file_ref.0 },
            Some(p) => ResultsView::Detected {
                file_id: p.file_ref.0,
                detections: sort_by_confidence(p.detections),
            },
        }
    }

    pub fn headline(&self) -> String {
        match self {
            ResultsView::NoAnalysis => "No Analysis in Progress".to_string(),
            ResultsView::NothingDetected { .. } => "No symbols detected".to_string(),
            ResultsView::Detected { detections, .. } => {
                let n = detections.len();
                format!("We found {} care symbol{} on your label", n, if n == 1 { "" } else { "s" })
            }
        }
    }

    pub fn cards(&self) -> Vec<DetectionCard> {
        match self {
            ResultsView::Detected { detections, .. } => detections.iter().map(DetectionCard::from_detection).collect(),
            _ => Vec::new(),
        }
    }
}

/// Plain-text rendering for terminals.
pub fn render_text(view: &ResultsView) -> String {
    let mut out = String::new();
    out.push_str(&view.headline());
    out.push('\n');
    match view {
        ResultsView::NoAnalysis => {
            out.push_str("Upload a photo of a care label to see its symbols.\n");
        }
        ResultsView::NothingDetected { .. } => {
            out.push_str("Try a sharper, well-lit photo with the label filling the frame.\n");
        }
        ResultsView::Detected { .. } => {
            for card in view.cards() {
                out.push_str(&format!(
                    "\n[{}%] {} ({})\n",
                    card.confidence_percent, card.title, card.category_label
                ));
                if !card.description.is_empty() {
                    out.push_str(&format!("  {}\n", card.description));
                }
                for item in &card.dos {
                    out.push_str(&format!("  + {}\n", item));
                }
                for item in &card.donts {
                    out.push_str(&format!("  - {}\n", item));
                }
            }
        }
    }
    out
}
