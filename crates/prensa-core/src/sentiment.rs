//! Parsing of the constrained sentiment-classifier reply.
//!
//! The classifier is instructed to answer with a label token and a
//! `Confianza: NN%` marker. Parsing is total: any input maps to
//! exactly one verdict and never errors.

use crate::models::{SentimentLabel, SentimentVerdict};

/// Marker preceding the confidence percentage in a reply.
const CONFIDENCE_MARKER: &str = "Confianza:";

/// Parse a classifier reply into a verdict.
///
/// Label precedence mirrors the upstream prompt contract: `NEGATIVO`
/// is checked before `POSITIVO`, anything else is neutral. A reply
/// without a parseable confidence marker is `Indeterminate`.
pub fn parse_sentiment_reply(reply: &str) -> SentimentVerdict {
    let label = if reply.contains("NEGATIVO") {
        SentimentLabel::Negative
    } else if reply.contains("POSITIVO") {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    };

    match confidence_percent(reply) {
        Some(confidence_percent) => SentimentVerdict::Classified {
            label,
            confidence_percent,
        },
        None => SentimentVerdict::Indeterminate,
    }
}

/// Extract the confidence percentage after the marker, clamped to 100.
fn confidence_percent(reply: &str) -> Option<u8> {
    let (_, rest) = reply.split_once(CONFIDENCE_MARKER)?;
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value.min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_reply_with_confidence() {
        assert_eq!(
            parse_sentiment_reply("POSITIVO Confianza: 92%"),
            SentimentVerdict::Classified {
                label: SentimentLabel::Positive,
                confidence_percent: 92,
            }
        );
    }

    #[test]
    fn negative_reply_with_confidence() {
        assert_eq!(
            parse_sentiment_reply("NEGATIVO Confianza: 95%"),
            SentimentVerdict::Classified {
                label: SentimentLabel::Negative,
                confidence_percent: 95,
            }
        );
    }

    #[test]
    fn unlabelled_reply_is_neutral() {
        assert_eq!(
            parse_sentiment_reply("NEUTRAL Confianza: 60%"),
            SentimentVerdict::Classified {
                label: SentimentLabel::Neutral,
                confidence_percent: 60,
            }
        );
    }

    #[test]
    fn negativo_takes_precedence_over_positivo() {
        let verdict = parse_sentiment_reply("POSITIVO o NEGATIVO Confianza: 50%");
        assert_eq!(
            verdict,
            SentimentVerdict::Classified {
                label: SentimentLabel::Negative,
                confidence_percent: 50,
            }
        );
    }

    #[test]
    fn missing_marker_is_indeterminate() {
        assert_eq!(
            parse_sentiment_reply("POSITIVO, sin duda"),
            SentimentVerdict::Indeterminate
        );
        assert_eq!(parse_sentiment_reply(""), SentimentVerdict::Indeterminate);
    }

    #[test]
    fn unparseable_confidence_is_indeterminate() {
        assert_eq!(
            parse_sentiment_reply("POSITIVO Confianza: alta"),
            SentimentVerdict::Indeterminate
        );
    }

    #[test]
    fn confidence_clamps_at_100() {
        assert_eq!(
            parse_sentiment_reply("POSITIVO Confianza: 250%"),
            SentimentVerdict::Classified {
                label: SentimentLabel::Positive,
                confidence_percent: 100,
            }
        );
    }

    #[test]
    fn parsing_is_idempotent() {
        let reply = "NEGATIVO Confianza: 73%";
        assert_eq!(parse_sentiment_reply(reply), parse_sentiment_reply(reply));
    }
}
