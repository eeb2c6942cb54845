//! Note field rendering and audio task planning
//!
//! Turns an [`EnrichmentResult`] into the field map handed to the note store,
//! and into the audio files those fields reference. Both sides derive file
//! names from [`audio_file_name`] so a note's `[sound:...]` tag always points at
//! the file the download stage writes.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{NoteFieldOptions, PronunciationChoice};
use crate::types::{Accent, AudioTask, EnrichmentResult, Gloss};

/// Field names of the note type, in display order
pub const FIELD_NAMES: [&str; 9] = [
    "term",
    "definition",
    "sentence",
    "phrase",
    "image",
    "BrEPhonetic",
    "AmEPhonetic",
    "BrEPron",
    "AmEPron",
];

/// `BrEPron_<term>.mp3` / `AmEPron_<term>.mp3`, with path separators replaced
pub fn audio_file_name(accent: Accent, term: &str) -> String {
    let safe: String = term
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}Pron_{safe}.mp3", accent.field_prefix())
}

/// Field map for one note; disabled and empty fields are left out
pub fn note_fields(
    result: &EnrichmentResult,
    options: &NoteFieldOptions,
    pronunciation: PronunciationChoice,
) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert("term".to_string(), result.term.clone());

    if options.definition && !result.definitions.is_empty() {
        fields.insert("definition".to_string(), result.definitions.join("<br>"));
    }
    if options.sentence && !result.sentences.is_empty() {
        fields.insert("sentence".to_string(), render_glosses(&result.term, &result.sentences));
    }
    if options.phrase && !result.phrases.is_empty() {
        fields.insert("phrase".to_string(), render_glosses(&result.term, &result.phrases));
    }
    if options.image
        && let Some(image) = &result.image
    {
        fields.insert("image".to_string(), format!("src=\"{image}\""));
    }

    for accent in Accent::ALL {
        let entry = result.pronunciation(accent);
        let wanted = match accent {
            Accent::British => options.br_phonetic,
            Accent::American => options.am_phonetic,
        };
        if wanted && let Some(phonetic) = &entry.phonetic {
            fields.insert(format!("{}Phonetic", accent.field_prefix()), phonetic.clone());
        }
        if pronunciation.includes(accent) && entry.audio_url.is_some() {
            fields.insert(
                format!("{}Pron", accent.field_prefix()),
                format!("[sound:{}]", audio_file_name(accent, &result.term)),
            );
        }
    }

    fields
}

/// Audio files referenced by a note built from `result`
pub fn audio_tasks(
    result: &EnrichmentResult,
    media_dir: &Path,
    pronunciation: PronunciationChoice,
) -> Vec<AudioTask> {
    Accent::ALL
        .into_iter()
        .filter(|accent| pronunciation.includes(*accent))
        .filter_map(|accent| {
            let url = result.pronunciation(accent).audio_url.as_ref()?;
            Some(AudioTask {
                destination: media_dir.join(audio_file_name(accent, &result.term)),
                source_url: url.clone(),
            })
        })
        .collect()
}

/// `<p><span class="en">…</span><br>\n<span class="ch">…</span></p>` per pair, term in bold
fn render_glosses(term: &str, glosses: &[Gloss]) -> String {
    glosses
        .iter()
        .map(|gloss| {
            let text = if term.is_empty() {
                gloss.text.trim().to_string()
            } else {
                gloss.text.trim().replace(term, &format!("<b>{term}</b>"))
            };
            format!(
                "<p><span class=\"en\">{text}</span><br>\n<span class=\"ch\">{}</span></p>",
                gloss.gloss.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
