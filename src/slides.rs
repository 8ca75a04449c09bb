//! Slide records and narration-script parsing.
//!
//! Slides arrive either from an external deck extractor (as
//! `(slide_number, text, image_path)` tuples) or from a user-edited
//! narration script with `## Slide N` headings.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One slide to narrate and render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Position in the final video; unique within a run
    pub slide_number: u32,
    /// Narration text, may be empty
    pub text: String,
    /// Background image; `None` means a placeholder is synthesized
    pub image_path: Option<PathBuf>,
    /// Informational flag, does not alter pipeline behavior
    pub has_math_markup: bool,
}

impl SlideRecord {
    pub fn new(slide_number: u32, text: &str) -> Self {
        Self {
            slide_number,
            text: text.to_string(),
            image_path: None,
            has_math_markup: false,
        }
    }

    pub fn with_image(mut self, image_path: PathBuf) -> Self {
        self.image_path = Some(image_path);
        self
    }
}

static SLIDE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\s*(?:#+\s*)?slide\s+(\d+)\s*:?\s*$").expect("valid slide heading regex")
});

/// Parse a user-edited narration script into slide records.
///
/// Headings of the form `## Slide 1` or `Slide 1:` delimit slides. If no
/// heading is found, the whole script becomes slide 1. The result is
/// sorted by slide number.
pub fn parse_slide_script(script: &str) -> Vec<SlideRecord> {
    let mut slides = Vec::new();
    if script.trim().is_empty() {
        return slides;
    }

    let text = script.replace("\r\n", "\n");
    let matches: Vec<_> = SLIDE_HEADING.find_iter(&text).collect();

    if matches.is_empty() {
        slides.push(SlideRecord::new(1, text.trim()));
        return slides;
    }

    let captures: Vec<_> = SLIDE_HEADING.captures_iter(&text).collect();
    for (idx, caps) in captures.iter().enumerate() {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let start = whole.1;
        let end = if idx + 1 < matches.len() {
            matches[idx + 1].start()
        } else {
            text.len()
        };
        let number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(idx as u32 + 1);
        let body = text[start..end].trim();
        slides.push(SlideRecord::new(number, body));
    }

    slides.sort_by_key(|s| s.slide_number);
    slides
}

/// Merge user-edited slide text with images extracted from the deck.
///
/// Images are matched by `slide_number` first, then by position. The
/// user's text always wins; only as many slides as the user provided are
/// produced.
pub fn merge_with_deck_images(
    user_slides: Vec<SlideRecord>,
    deck_slides: &[SlideRecord],
) -> Vec<SlideRecord> {
    if user_slides.is_empty() {
        return deck_slides.to_vec();
    }
    if deck_slides.is_empty() {
        return user_slides;
    }

    let mut merged = Vec::with_capacity(user_slides.len());
    for (idx, user) in user_slides.into_iter().enumerate() {
        let by_number = deck_slides
            .iter()
            .find(|d| d.slide_number == user.slide_number)
            .and_then(|d| d.image_path.clone());
        let image_path =
            by_number.or_else(|| deck_slides.get(idx).and_then(|d| d.image_path.clone()));

        merged.push(SlideRecord {
            slide_number: user.slide_number,
            text: user.text,
            image_path,
            has_math_markup: false,
        });
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_with_headings() {
        let script = "## Slide 1\nXin chào các em.\n\nSlide 2:\nHôm nay chúng ta học về Rust.\n";
        let slides = parse_slide_script(script);

        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].slide_number, 1);
        assert_eq!(slides[0].text, "Xin chào các em.");
        assert_eq!(slides[1].slide_number, 2);
        assert_eq!(slides[1].text, "Hôm nay chúng ta học về Rust.");
    }

    #[test]
    fn test_parse_script_without_headings() {
        let slides = parse_slide_script("Just one block of narration.");
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].slide_number, 1);
        assert_eq!(slides[0].text, "Just one block of narration.");
    }

    #[test]
    fn test_parse_script_sorts_by_number() {
        let script = "Slide 3:\nthird\n\nSlide 1:\nfirst\n";
        let slides = parse_slide_script(script);
        assert_eq!(slides[0].slide_number, 1);
        assert_eq!(slides[0].text, "first");
        assert_eq!(slides[1].slide_number, 3);
    }

    #[test]
    fn test_parse_empty_script() {
        assert!(parse_slide_script("   \n ").is_empty());
    }

    #[test]
    fn test_merge_prefers_slide_number_match() {
        let user = vec![SlideRecord::new(2, "edited text")];
        let deck = vec![
            SlideRecord::new(1, "a").with_image(PathBuf::from("deck_1.png")),
            SlideRecord::new(2, "b").with_image(PathBuf::from("deck_2.png")),
        ];

        let merged = merge_with_deck_images(user, &deck);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "edited text");
        assert_eq!(merged[0].image_path, Some(PathBuf::from("deck_2.png")));
    }

    #[test]
    fn test_merge_falls_back_to_position() {
        let user = vec![SlideRecord::new(10, "renumbered")];
        let deck = vec![SlideRecord::new(1, "a").with_image(PathBuf::from("deck_1.png"))];

        let merged = merge_with_deck_images(user, &deck);
        assert_eq!(merged[0].image_path, Some(PathBuf::from("deck_1.png")));
    }

    #[test]
    fn test_merge_without_deck_keeps_user_slides() {
        let user = vec![SlideRecord::new(1, "only text")];
        let merged = merge_with_deck_images(user, &[]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].image_path.is_none());
    }
}
