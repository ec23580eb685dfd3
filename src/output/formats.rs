//! Output format implementations

use std::fmt::Write;

use crate::assessment::AssessmentResult;
use crate::error::{AssessError, Result};
use super::format_duration;

/// Format as JSON, one line unless `pretty`
pub fn format_json(result: &AssessmentResult, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    };
    json.map_err(|e| AssessError::Serialization(e.to_string()))
}

/// Format as a human-readable report
pub fn format_text(result: &AssessmentResult) -> String {
    let audio = &result.audio_features;
    let text = &result.text_analysis;
    let combined = &result.combined_assessment;
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(
        out,
        "Assessment: {} [{}]",
        audio.filename,
        format_duration(audio.duration_total)
    );
    if !result.participant_info.is_empty() {
        let fields: Vec<String> = result
            .participant_info
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        let _ = writeln!(out, "Participant: {}", fields.join(", "));
    }
    let _ = writeln!(
        out,
        "Risk level: {} ({:.1}% of {})",
        combined.risk_level, combined.percentage, combined.max_score
    );
    let _ = writeln!(
        out,
        "Scores: audio {:.1}, text {:.1}, combined {:.1}",
        combined.audio_score, combined.text_score, combined.combined_score
    );
    match &audio.error {
        Some(error) => {
            let _ = writeln!(out, "Acoustic: unavailable ({})", error);
        }
        None => {
            let _ = writeln!(
                out,
                "Acoustic: {} utterances, {:.1}/min, mean pause {:.2}s, pitch {:.1} +/- {:.1} Hz",
                audio.number_utt(),
                audio.speech_rate(),
                audio.mean_pause(),
                audio.pitch.mean(),
                audio.pitch.std()
            );
        }
    }
    let _ = writeln!(
        out,
        "Lexical: {} words, {} unique, {} sentences, overall {:.2}/10",
        text.word_count, text.unique_words, text.sentence_count, text.overall_score
    );
    let _ = writeln!(out, "Recommendations:");
    for recommendation in &combined.recommendations {
        let _ = writeln!(out, "  - {}", recommendation);
    }
    out.trim_end().to_string()
}
