//! Response normalization: best-effort repair of model output into the
//! shape each bot promises its callers.
//!
//! This is deliberately not a parser. The reviewer path looks for two
//! anchor keywords and rebuilds three sections around them; everything it
//! cannot derive is omitted rather than invented.

use crate::kind::BotKind;
use minerva_context::clean_text;
use regex::Regex;

/// The canonical reviewer section headings, in output order.
pub const REVIEWER_HEADINGS: [&str; 6] = [
    "Title Assessment",
    "Abstract Evaluation",
    "Strengths",
    "Weaknesses",
    "Detailed Comments",
    "Overall Recommendation",
];

/// Normalizes raw completion text per bot kind. Compile once, reuse.
#[derive(Debug)]
pub struct ResponseFormatter {
    canonical: Vec<Regex>,
    strengths: Regex,
    weaknesses: Regex,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseFormatter {
    pub fn new() -> Self {
        let canonical = REVIEWER_HEADINGS
            .iter()
            .map(|heading| {
                Regex::new(&format!(r"(?im)^#*\s*{}", regex::escape(heading)))
                    .expect("static regex")
            })
            .collect();

        Self {
            canonical,
            strengths: Regex::new(r"(?i)strengths?[:-]").expect("static regex"),
            weaknesses: Regex::new(r"(?i)weaknesses?[:-]").expect("static regex"),
        }
    }

    /// Normalize `text` for `kind`. Whitespace is cleaned for every kind;
    /// the analyst and any future kinds get nothing beyond that.
    pub fn normalize(&self, kind: BotKind, text: &str) -> String {
        let cleaned = clean_text(text);
        match kind {
            BotKind::Reviewer => self.reviewer(&cleaned),
            BotKind::Writer => writer(&cleaned),
            BotKind::Conference => conference(&cleaned),
            BotKind::Analyst => cleaned,
        }
    }

    /// Ensure reviewer output carries the canonical headings.
    ///
    /// Output with all six headings already present passes through
    /// untouched. Otherwise the text is split around the Strengths and
    /// Weaknesses anchors when both are found, or dropped wholesale under
    /// Detailed Comments when they are not.
    fn reviewer(&self, cleaned: &str) -> String {
        if self.canonical.iter().all(|re| re.is_match(cleaned)) {
            return cleaned.to_string();
        }

        let strengths = self.strengths.find(cleaned);
        let weaknesses = self.weaknesses.find(cleaned);

        let sections: Vec<(&str, String)> = match (strengths, weaknesses) {
            (Some(s), Some(w)) if s.start() < w.start() => {
                let preamble = cleaned[..s.start()].trim();
                let title = if preamble.is_empty() {
                    "(no title provided)".to_string()
                } else {
                    preamble.to_string()
                };
                vec![
                    ("Title Assessment", title),
                    ("Strengths", cleaned[s.end()..w.start()].trim().to_string()),
                    ("Weaknesses", cleaned[w.end()..].trim().to_string()),
                ]
            }
            _ => vec![("Detailed Comments", cleaned.to_string())],
        };

        sections
            .iter()
            .map(|(heading, body)| format!("## {heading}\n{body}\n"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Collapse writer output into contiguous non-empty paragraphs.
fn writer(cleaned: &str) -> String {
    cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Promote the first line of conference output to a summary heading.
fn conference(cleaned: &str) -> String {
    let mut lines = cleaned.lines();
    match lines.next() {
        Some(first) if !first.trim().is_empty() => {
            let rest = lines.collect::<Vec<_>>().join("\n");
            let rest = rest.trim();
            if rest.is_empty() {
                format!("### Summary\n{}", first.trim())
            } else {
                format!("### Summary\n{}\n\n{rest}", first.trim())
            }
        }
        _ => cleaned.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_collapses_blank_lines() {
        let formatter = ResponseFormatter::new();
        assert_eq!(
            formatter.normalize(BotKind::Writer, "a\n\nb\n  \nc"),
            "a\n\nb\n\nc"
        );
    }

    #[test]
    fn conference_promotes_first_line_to_summary() {
        let formatter = ResponseFormatter::new();
        assert_eq!(
            formatter.normalize(BotKind::Conference, "Line1\nLine2\nLine3"),
            "### Summary\nLine1\n\nLine2\nLine3"
        );
    }

    #[test]
    fn conference_single_line_has_no_trailing_blank() {
        let formatter = ResponseFormatter::new();
        assert_eq!(
            formatter.normalize(BotKind::Conference, "Only line"),
            "### Summary\nOnly line"
        );
    }

    #[test]
    fn reviewer_repairs_from_anchors() {
        let formatter = ResponseFormatter::new();
        let out = formatter.normalize(BotKind::Reviewer, "Strengths: x\nWeaknesses: y");

        assert!(out.contains("## Title Assessment\n(no title provided)"));
        assert!(out.contains("## Strengths\nx"));
        assert!(out.contains("## Weaknesses\ny"));
        assert!(!out.contains("Abstract Evaluation"));
        assert!(!out.contains("Detailed Comments"));
        assert!(!out.contains("Overall Recommendation"));
    }

    #[test]
    fn reviewer_keeps_preamble_as_title_assessment() {
        let formatter = ResponseFormatter::new();
        let out = formatter.normalize(
            BotKind::Reviewer,
            "A solid paper on caching.\nStrengths: fast\nWeaknesses: racy",
        );

        assert!(out.contains("## Title Assessment\nA solid paper on caching."));
        assert!(out.contains("## Strengths\nfast"));
        assert!(out.contains("## Weaknesses\nracy"));
    }

    #[test]
    fn reviewer_without_anchors_falls_back_to_detailed_comments() {
        let formatter = ResponseFormatter::new();
        let out = formatter.normalize(BotKind::Reviewer, "Free-form commentary only.");

        assert_eq!(out, "## Detailed Comments\nFree-form commentary only.\n");
    }

    #[test]
    fn reviewer_with_all_headings_passes_through() {
        let formatter = ResponseFormatter::new();
        let text = "## Title Assessment\nGood.\n\n## Abstract Evaluation\nFine.\n\n\
                    ## Strengths\nFast.\n\n## Weaknesses\nRacy.\n\n\
                    ## Detailed Comments\nSee above.\n\n## Overall Recommendation\nAccept.";
        let out = formatter.normalize(BotKind::Reviewer, text);

        assert_eq!(out, clean_text(text));
    }

    #[test]
    fn analyst_output_is_only_cleaned() {
        let formatter = ResponseFormatter::new();
        assert_eq!(
            formatter.normalize(BotKind::Analyst, "word\r\nanother   word\n\n\n\nend"),
            "word\nanother word\n\nend"
        );
    }
}
