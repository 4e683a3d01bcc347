use penpal_studio::prelude::*;
use penpal_studio::selector::{select_model, FAST_MODEL, HIGH_REASONING_MODEL};
use penpal_studio::templates::{templates, FieldKind};
use penpal_studio::validation::{gibberish_issue, text_issue, validate_params, TextIssue};
use penpal_studio::build_prompt;

/// Fill every field of a template; the field at `skip` is left blank.
fn filled(content_type: ContentType, skip: Option<usize>) -> GenerationParams {
    let template = content_type.template();
    let mut params = GenerationParams::new(content_type).with_genre("Mystery");
    for (i, field) in template.fields.iter().enumerate() {
        let value = if Some(i) == skip {
            String::new()
        } else if field.kind == FieldKind::Select {
            field.options[0].to_string()
        } else {
            format!("Value for {}", field.label)
        };
        params = params.with_input(field.key, value);
    }
    params
}

#[test]
fn test_prompt_lists_every_filled_field() {
    for template in templates() {
        let params = filled(template.id, None);
        let prompt = build_prompt(&params, template);
        for field in template.fields {
            let value = params.input(field.key).unwrap();
            assert!(
                prompt.user_text.contains(&format!("- {}: {}", field.label, value)),
                "{} prompt is missing {}",
                template.id,
                field.key
            );
        }
        assert!(prompt
            .user_text
            .contains(&format!("{} in the Mystery genre.", template.name.to_lowercase())));
    }
}

#[test]
fn test_prompt_omits_empty_fields() {
    for template in templates() {
        let params = filled(template.id, Some(0));
        let prompt = build_prompt(&params, template);
        let skipped = &template.fields[0];
        assert!(!prompt.user_text.contains(&format!("- {}:", skipped.label)));

        let err = validate_params(&params, template).unwrap_err();
        assert_eq!(err.field(), Some(skipped.label));
        assert!(err.to_string().contains("Please fill in the"));
    }
}

#[test]
fn test_every_filled_template_validates() {
    for template in templates() {
        validate_params(&filled(template.id, None), template).unwrap();
    }
}

#[test]
fn test_model_selection_rule() {
    let creativities = [0.0, 0.5, 0.8, 0.800_001, 0.81, 0.9, 1.0];
    for content_type in ContentType::ALL {
        for creativity in creativities {
            let expected = if creativity > 0.8 || content_type == ContentType::Worldbuilding {
                HIGH_REASONING_MODEL
            } else {
                FAST_MODEL
            };
            assert_eq!(select_model(creativity, content_type), expected);
        }
    }
}

#[test]
fn test_gibberish_rules_fire_independently() {
    assert_eq!(gibberish_issue("aaaaaaa"), Some(TextIssue::RepeatedCharacter('a')));
    assert_eq!(
        gibberish_issue("the old lighthouse keeper mxzqwrtplkjhgfdsv"),
        Some(TextIssue::VowellessToken)
    );
    assert_eq!(gibberish_issue("xyzzzplkj"), Some(TextIssue::LowVowelRatio));
    assert_eq!(gibberish_issue("A lighthouse on a cliff"), None);
}

#[test]
fn test_free_text_restrictions() {
    assert_eq!(text_issue("42"), Some(TextIssue::Numeric));
    assert_eq!(
        text_issue("name = value"),
        Some(TextIssue::DisallowedCharacter('='))
    );
    assert_eq!(text_issue("Ngiyabonga, mama"), None);
}
