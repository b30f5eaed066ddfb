//! System prompts for vision-model text recognition.
//!
//! Every prompt lives here so the recognition engine in
//! [`crate::pipeline::llm`] stays free of wording, and tests can inspect the
//! prompts without a live provider.
//!
//! Callers can override the default via [`crate::config::JobConfig::system_prompt`];
//! the constants here are used only when no override is provided.

/// Default system prompt for transcribing a rasterised page.
///
/// `{languages}` is replaced by [`ocr_system_prompt`].
pub const DEFAULT_OCR_PROMPT: &str = r#"You are an OCR engine. Transcribe the text visible in the page image exactly as printed.

Rules:

1. Expected languages: {languages}. Keep the original language; never translate.
2. Preserve reading order as a human would read the page, including columns.
3. Keep line breaks between paragraphs; join hyphenated line-end word breaks only when certain.
4. Do not describe images, layout, or styling. Output text only.
5. If the page has no legible text, output nothing.
6. Do NOT wrap the output in code fences and do NOT add commentary."#;

/// Map a language code to a readable name for the prompt.
///
/// Unknown codes are passed through unchanged.
pub fn language_name(code: &str) -> &str {
    match code {
        "eng" | "en" => "English",
        "deu" | "de" => "German",
        "fra" | "fr" => "French",
        "spa" | "es" => "Spanish",
        "ita" | "it" => "Italian",
        "por" | "pt" => "Portuguese",
        "nld" | "nl" => "Dutch",
        "jpn" | "ja" => "Japanese",
        "chi_sim" | "zh" => "Simplified Chinese",
        "chi_tra" => "Traditional Chinese",
        "kor" | "ko" => "Korean",
        "rus" | "ru" => "Russian",
        "ara" | "ar" => "Arabic",
        other => other,
    }
}

/// Build the system prompt for the given language set.
///
/// A custom `template` may use `{languages}` the same way the default does.
pub fn ocr_system_prompt(languages: &[String], template: Option<&str>) -> String {
    let names: Vec<&str> = languages.iter().map(|l| language_name(l)).collect();
    template
        .unwrap_or(DEFAULT_OCR_PROMPT)
        .replace("{languages}", &names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_languages_in_order() {
        let prompt = ocr_system_prompt(&["deu".into(), "eng".into(), "xyz".into()], None);
        assert!(prompt.contains("German, English, xyz"), "{prompt}");
        assert!(!prompt.contains("{languages}"));
    }

    #[test]
    fn custom_template() {
        let prompt = ocr_system_prompt(&["fra".into()], Some("Read {languages} text."));
        assert_eq!(prompt, "Read French text.");
    }
}
