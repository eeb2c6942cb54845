//! Detail page extraction
//!
//! Every field is extracted on its own through a chain of selectors, so a
//! missing or reshaped section only empties that field. Only a body that is
//! not a document at all fails the whole parse.

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::types::{Accent, EnrichmentResult, Gloss, Pronunciation};

const DEFINITION_CONTAINER: &str = "div #ExpFCChild";
const DEFINITION_SENSES: &str = "li";
const DEFINITION_SINGLE: &str = ".exp";
const PHONETIC_LINE: &str = ".phonitic-line";
const PHONETIC_LINKS: &str = "a";
const PHONETIC_TEXT: &str = ".Phonitic";
const VOICE_BUTTON: &str = "div .gv_details .voice-button";
const SENTENCE_ITEMS: &str = "div #ExpLJChild .lj_item";
const IMAGE: &str = "div .word-thumbnail-container img";
const PHRASE_ITEMS: &str = "div #ExpSPECChild #phrase";

/// Parses word detail pages into [`EnrichmentResult`]s
#[derive(Clone, Debug)]
pub struct EnrichmentParser {
    speech_url: String,
}

impl EnrichmentParser {
    /// `speech_url` prefixes audio references that are not absolute URLs
    pub fn new(speech_url: impl Into<String>) -> Self {
        Self {
            speech_url: speech_url.into(),
        }
    }

    /// Extract every field of `term` from a detail page
    pub fn parse(&self, term: &str, html: &str) -> Result<EnrichmentResult> {
        if html.trim().is_empty() {
            return Err(Error::Parse(format!("empty detail page for {term}")));
        }

        let document = Html::parse_document(html);
        let root = document.root_element();

        let mut result = EnrichmentResult::new(term);
        result.definitions = definitions(root);
        result.sentences = sentences(root);
        result.phrases = phrases(root);
        result.image = image(root);
        for (accent, pronunciation) in self.pronunciations(root) {
            *result.pronunciation_mut(accent) = pronunciation;
        }

        tracing::debug!(
            term = %term,
            definitions = result.definitions.len(),
            sentences = result.sentences.len(),
            phrases = result.phrases.len(),
            image = result.image.is_some(),
            "detail page parsed"
        );
        Ok(result)
    }

    /// Phonetic/audio pairs by position: the first pair is British, the second American
    fn pronunciations(&self, root: ElementRef<'_>) -> Vec<(Accent, Pronunciation)> {
        let Some(line) = select_all(root, PHONETIC_LINE).into_iter().next() else {
            return vec![];
        };

        let phonetics = select_all(line, PHONETIC_TEXT);
        let mut links = select_all(line, PHONETIC_LINKS);
        if links.is_empty() {
            // Single-pronunciation pages only carry one voice button; use it for both accents.
            if let Some(button) = select_all(root, VOICE_BUTTON).into_iter().next() {
                links = vec![button, button];
            }
        }

        Accent::ALL
            .into_iter()
            .map(|accent| {
                let index = accent.position();
                let phonetic = phonetics
                    .get(index)
                    .map(|el| stripped_text(*el))
                    .filter(|text| !text.is_empty());
                let audio_url = links
                    .get(index)
                    .and_then(|el| el.value().attr("data-rel"))
                    .map(|rel| self.audio_url(rel));
                (accent, Pronunciation { phonetic, audio_url })
            })
            .collect()
    }

    fn audio_url(&self, reference: &str) -> String {
        if reference.contains("http") {
            reference.to_string()
        } else {
            format!("{}{}", self.speech_url, reference)
        }
    }
}

/// Senses as list items, else single `.exp` blocks, else the de-noised container text
fn definitions(root: ElementRef<'_>) -> Vec<String> {
    let Some(container) = select_all(root, DEFINITION_CONTAINER).into_iter().next() else {
        return vec![];
    };

    let mut senses = select_all(container, DEFINITION_SENSES);
    if senses.is_empty() {
        senses = select_all(container, DEFINITION_SINGLE);
    }
    if senses.is_empty() {
        let text = text_without_noise(container);
        return if text.is_empty() { vec![] } else { vec![text] };
    }

    senses
        .into_iter()
        .map(stripped_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Example sentences keep their inline markup; the translation is plain text
fn sentences(root: ElementRef<'_>) -> Vec<Gloss> {
    select_all(root, SENTENCE_ITEMS)
        .into_iter()
        .filter_map(|item| {
            let lines = select_all(item, "p");
            match lines.as_slice() {
                [sentence, translation, ..] => {
                    Some(Gloss::new(sentence.inner_html(), stripped_text(*translation)))
                }
                _ => None,
            }
        })
        .collect()
}

fn phrases(root: ElementRef<'_>) -> Vec<Gloss> {
    select_all(root, PHRASE_ITEMS)
        .into_iter()
        .filter_map(|item| {
            let phrase = select_all(item, "i").into_iter().next()?;
            let explanation = select_all(item, ".exp").into_iter().next()?;
            Some(Gloss::new(stripped_text(phrase), stripped_text(explanation)))
        })
        .collect()
}

/// Thumbnail URL; titled images are placeholders, not illustrations
fn image(root: ElementRef<'_>) -> Option<String> {
    let img = select_all(root, IMAGE).into_iter().next()?;
    if img.value().attr("title").is_some() {
        return None;
    }
    let src = img.value().attr("src")?;
    if src.starts_with("//") {
        Some(format!("https:{src}"))
    } else {
        Some(src.to_string())
    }
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(e) => {
            tracing::warn!(selector = css, error = %e, "invalid selector");
            vec![]
        }
    }
}

/// Text nodes trimmed and concatenated
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Like [`stripped_text`] but skipping scripts, vote links and the nested `#trans` block
fn text_without_noise(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !is_noise(child_element) {
                collect_text(child_element, out);
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text.trim());
        }
    }
}

fn is_noise(element: ElementRef<'_>) -> bool {
    let value = element.value();
    matches!(value.name(), "script" | "a") || value.id() == Some("trans")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const SPEECH: &str = "https://api.frdic.com/api/v2/speech/speakweb?";

    fn parser() -> EnrichmentParser {
        EnrichmentParser::new(SPEECH)
    }

    fn page(body: &str) -> String {
        format!("<html><body>{body}</body></html>")
    }

    const FULL_PAGE: &str = r#"
<html><body>
<div class="phonitic-line">
  <a class="voice-js" data-rel="langid=en&amp;txt=QYNYXBwbGU%3d">UK</a>
  <span class="Phonitic">/ˈæp.əl/</span>
  <a class="voice-js" data-rel="https://cdn.example/apple-us.mp3">US</a>
  <span class="Phonitic"> /ˈæp.l̩/ </span>
</div>
<div class="word"><div class="word-thumbnail-container"><img src="//img.example/apple.jpg"></div></div>
<div id="ExpFC"><div id="ExpFCChild">
  <ol><li>n. 蘋果</li><li> n. 蘋果樹 </li></ol>
</div></div>
<div id="ExpLJ"><div id="ExpLJChild">
  <div class="lj_item"><p class="line">An <b>apple</b> a day.</p><p class="exp"> 一天一蘋果。 </p></div>
  <div class="lj_item"><p class="line">orphan line</p></div>
  <div class="lj_item"><p>She ate the apple.</p><p>她吃了蘋果。</p></div>
</div></div>
<div id="ExpSPEC"><div id="ExpSPECChild">
  <div id="phrase"><i>apple of one's eye</i><span class="exp">掌上明珠</span></div>
  <div id="phrase"><i>no explanation</i></div>
</div></div>
</body></html>
"#;

    #[test]
    fn full_page_yields_every_field() {
        let result = parser().parse("apple", FULL_PAGE).unwrap();

        assert_eq!(result.term, "apple");
        assert_eq!(result.definitions, vec!["n. 蘋果", "n. 蘋果樹"]);
        assert_eq!(
            result.sentences,
            vec![
                Gloss::new("An <b>apple</b> a day.", "一天一蘋果。"),
                Gloss::new("She ate the apple.", "她吃了蘋果。"),
            ]
        );
        assert_eq!(result.phrases, vec![Gloss::new("apple of one's eye", "掌上明珠")]);
        assert_eq!(result.image.as_deref(), Some("https://img.example/apple.jpg"));
    }

    #[test]
    fn first_pair_is_british_and_second_american() {
        let result = parser().parse("apple", FULL_PAGE).unwrap();

        assert_eq!(result.british.phonetic.as_deref(), Some("/ˈæp.əl/"));
        assert_eq!(
            result.british.audio_url.as_deref(),
            Some("https://api.frdic.com/api/v2/speech/speakweb?langid=en&txt=QYNYXBwbGU%3d")
        );
        assert_eq!(result.american.phonetic.as_deref(), Some("/ˈæp.l̩/"));
        assert_eq!(
            result.american.audio_url.as_deref(),
            Some("https://cdn.example/apple-us.mp3"),
            "absolute references are kept as-is"
        );
    }

    #[test]
    fn single_voice_button_serves_both_accents() {
        let html = page(
            r#"<div class="phonitic-line"><span class="Phonitic">/kæt/</span></div>
               <div><div class="gv_details"><span class="voice-button" data-rel="txt=cat"></span></div></div>"#,
        );

        let result = parser().parse("cat", &html).unwrap();

        let expected = Some(format!("{SPEECH}txt=cat"));
        assert_eq!(result.british.audio_url, expected);
        assert_eq!(result.american.audio_url, expected);
        assert_eq!(result.british.phonetic.as_deref(), Some("/kæt/"));
        assert_eq!(result.american.phonetic, None);
    }

    #[test]
    fn no_phonetic_line_means_no_pronunciations() {
        let result = parser().parse("cat", &page("<p>nothing</p>")).unwrap();
        assert_eq!(result.british, Pronunciation::default());
        assert_eq!(result.american, Pronunciation::default());
    }

    #[test]
    fn definition_falls_back_to_exp_blocks() {
        let html = page(r#"<div><div id="ExpFCChild"><div class="exp">adj. 快樂的</div></div></div>"#);
        let result = parser().parse("happy", &html).unwrap();
        assert_eq!(result.definitions, vec!["adj. 快樂的"]);
    }

    #[test]
    fn definition_last_resort_strips_noise() {
        let html = page(
            r##"<div><div id="ExpFCChild">
                 ad. 此後
                 <span id="trans">hereafter translation</span>
                 <script>var votes = 1;</script>
                 <a href="#">贊</a><a href="#">踩</a>
                 <span>(正式)</span>
               </div></div>"##,
        );

        let result = parser().parse("hence", &html).unwrap();

        assert_eq!(result.definitions, vec!["ad. 此後(正式)"]);
    }

    #[test]
    fn missing_containers_give_empty_fields_without_error() {
        let result = parser()
            .parse("ghost", &page("<div class='unrelated'>nothing here</div>"))
            .unwrap();

        assert!(result.definitions.is_empty());
        assert!(result.sentences.is_empty());
        assert!(result.phrases.is_empty());
        assert_eq!(result.image, None);
    }

    #[test]
    fn one_missing_field_does_not_void_the_others() {
        let html = page(
            r#"<div><div id="ExpFCChild"><li>v. 跑</li></div></div>
               <div><div class="word-thumbnail-container"><img title="placeholder" src="https://img.example/none.png"></div></div>"#,
        );

        let result = parser().parse("run", &html).unwrap();

        assert_eq!(result.definitions, vec!["v. 跑"]);
        assert_eq!(result.image, None, "titled thumbnails are placeholders");
    }

    #[test]
    fn blank_body_is_a_parse_error() {
        assert!(matches!(parser().parse("x", "  \n"), Err(Error::Parse(_))));
    }
}
