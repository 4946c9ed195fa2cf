//! Color → instruction lookup.
//!
//! Each locale has one instruction template with a `{color}` slot and one
//! name per [`ColorChoice`]. Adding a color means adding a row to
//! [`COLOR_NAMES`]; there is no per-color branching anywhere else.

use crate::locale::Locale;
use crate::types::ColorChoice;

/// Human-readable color names, indexed by locale.
const COLOR_NAMES: &[(ColorChoice, [(Locale, &str); 4])] = &[
    (
        ColorChoice::Red,
        [
            (Locale::ZhCn, "红色"),
            (Locale::En, "red"),
            (Locale::Fr, "rouge"),
            (Locale::Ja, "赤"),
        ],
    ),
    (
        ColorChoice::Blue,
        [
            (Locale::ZhCn, "蓝色"),
            (Locale::En, "blue"),
            (Locale::Fr, "bleu"),
            (Locale::Ja, "青"),
        ],
    ),
];

fn template(locale: Locale) -> &'static str {
    match locale {
        Locale::ZhCn => "将这张照片的背景改为{color}，保持人物主体不变，确保背景颜色均匀。",
        Locale::En => {
            "Change the background of this photo to {color}. Keep the person unchanged \
             and make sure the background color is uniform."
        }
        Locale::Fr => {
            "Remplacez l'arrière-plan de cette photo par un fond {color}. Ne modifiez pas \
             la personne et assurez-vous que la couleur du fond est uniforme."
        }
        Locale::Ja => "この写真の背景を{color}に変更してください。人物はそのままにし、背景色を均一にしてください。",
    }
}

/// The localized name of a color.
pub fn color_name(color: ColorChoice, locale: Locale) -> &'static str {
    COLOR_NAMES
        .iter()
        .find(|(c, _)| *c == color)
        .and_then(|(_, names)| names.iter().find(|(l, _)| *l == locale))
        .map(|(_, name)| *name)
        // Every (color, locale) pair has a row; the table test guards this.
        .unwrap_or_else(|| color.as_str())
}

/// The instruction sent alongside the photo.
pub fn instruction(color: ColorChoice, locale: Locale) -> String {
    template(locale).replace("{color}", color_name(color, locale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_color_and_locale() {
        for color in ColorChoice::ALL {
            let row = COLOR_NAMES
                .iter()
                .find(|(c, _)| *c == color)
                .unwrap_or_else(|| panic!("no names for {color}"));
            for locale in Locale::ALL {
                assert!(
                    row.1.iter().any(|(l, _)| *l == locale),
                    "{color} has no {locale} name"
                );
            }
        }
    }

    #[test]
    fn chinese_instruction_matches_source_wording() {
        assert_eq!(
            instruction(ColorChoice::Red, Locale::ZhCn),
            "将这张照片的背景改为红色，保持人物主体不变，确保背景颜色均匀。"
        );
        assert!(instruction(ColorChoice::Blue, Locale::ZhCn).contains("蓝色"));
    }

    #[test]
    fn instruction_names_only_the_chosen_color() {
        for locale in Locale::ALL {
            let red = instruction(ColorChoice::Red, locale);
            let blue = instruction(ColorChoice::Blue, locale);
            assert!(red.contains(color_name(ColorChoice::Red, locale)), "{red}");
            assert!(!red.contains(color_name(ColorChoice::Blue, locale)), "{red}");
            assert!(blue.contains(color_name(ColorChoice::Blue, locale)), "{blue}");
            assert!(!blue.contains(color_name(ColorChoice::Red, locale)), "{blue}");
            assert!(!red.contains("{color}"));
        }
    }

    #[test]
    fn english_instruction() {
        let text = instruction(ColorChoice::Blue, Locale::En);
        assert!(text.starts_with("Change the background of this photo to blue."));
    }
}
