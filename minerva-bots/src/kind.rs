//! The bot kinds and their per-bot defaults.

use std::str::FromStr;

/// The retrieval-augmented bots this crate serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotKind {
    /// Structured peer review of a paper.
    Reviewer,
    /// Free-form analysis of a paper.
    Analyst,
    /// Q&A against an indexed profile or site.
    Conference,
    /// Paragraph-clean prose generation.
    Writer,
}

impl BotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotKind::Reviewer => "reviewer",
            BotKind::Analyst => "analyst",
            BotKind::Conference => "conference",
            BotKind::Writer => "writer",
        }
    }

    /// Question used when the caller does not supply one. Bots without a
    /// default require an explicit question.
    pub fn default_question(&self) -> Option<&'static str> {
        match self {
            BotKind::Reviewer => Some("Please provide a structured review of the paper."),
            BotKind::Analyst => Some("Explain the summary of the paper in detail."),
            BotKind::Conference | BotKind::Writer => None,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            BotKind::Reviewer => {
                "You are an experienced academic peer reviewer. Base every judgement on the \
                 provided context and organize the review under clear section headings."
            }
            BotKind::Analyst => {
                "You are a research paper analyst. Explain the paper's contribution using only \
                 the provided context."
            }
            BotKind::Conference => {
                "You answer questions about the indexed profile. Keep answers short and lead \
                 with a one-line summary."
            }
            BotKind::Writer => {
                "You are an academic writing assistant. Respond with clean, well-formed \
                 paragraphs and nothing else."
            }
        }
    }
}

impl std::fmt::Display for BotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reviewer" => Ok(BotKind::Reviewer),
            "analyst" => Ok(BotKind::Analyst),
            "conference" => Ok(BotKind::Conference),
            "writer" => Ok(BotKind::Writer),
            _ => Err(format!("unknown bot: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_bots_case_insensitively() {
        assert_eq!("Reviewer".parse::<BotKind>().unwrap(), BotKind::Reviewer);
        assert_eq!("ANALYST".parse::<BotKind>().unwrap(), BotKind::Analyst);
        assert!("citation".parse::<BotKind>().is_err());
    }

    #[test]
    fn rag_bots_have_default_questions() {
        assert!(BotKind::Reviewer.default_question().is_some());
        assert!(BotKind::Analyst.default_question().is_some());
        assert!(BotKind::Conference.default_question().is_none());
    }
}
