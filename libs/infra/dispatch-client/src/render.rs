// [libs/infra/dispatch-client/src/render.rs]
/*!
 * =================================================================
 * APARATO: RENDERIZADO DE MENSAJES DE DESPACHO
 * CLASIFICACIÓN: DOMAIN CORE (ESTRATO L3)
 * RESPONSABILIDAD: COMBINAR TEXTO ORIGINAL + ANÁLISIS + PIE DE METADATOS,
 *                  RESPETANDO EL TOPE DE LONGITUD DE LA PLATAFORMA
 *
 * El tope (~4096 caracteres) se trunca por caracteres, no por bytes, para
 * no partir un carácter multi-byte a la mitad; el marcador de elipsis
 * siempre es el último carácter visible.
 * =================================================================
 */

use chrono::{DateTime, Utc};

/// Límite de longitud aproximado de la plataforma de chat de destino.
pub const MESSAGE_LENGTH_CAP: usize = 4096;
const ELLIPSIS: char = '…';

pub struct RenderInput<'a> {
    pub account: &'a str,
    pub original_text: &'a str,
    pub analysis_output: &'a str,
    pub created_at: DateTime<Utc>,
    pub markup_enabled: bool,
}

/// Compone el mensaje saliente y lo recorta al tope de la plataforma.
pub fn render_message(input: &RenderInput<'_>) -> String {
    let footer = format!("— @{} · {}", input.account, input.created_at.to_rfc3339());

    let body = if input.markup_enabled {
        format!(
            "*Original:*\n{}\n\n*Analysis:*\n{}\n\n_{}_",
            input.original_text, input.analysis_output, footer
        )
    } else {
        format!(
            "Original:\n{}\n\nAnalysis:\n{}\n\n{}",
            input.original_text, input.analysis_output, footer
        )
    };

    truncate_to_cap(&body, MESSAGE_LENGTH_CAP)
}

fn truncate_to_cap(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(cap.saturating_sub(1)).collect();
    truncated.push(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input(original_text: &str) -> RenderInput<'static> {
        RenderInput {
            account: "alice",
            original_text: Box::leak(original_text.to_string().into_boxed_str()),
            analysis_output: "looks fine",
            created_at: Utc::now(),
            markup_enabled: false,
        }
    }

    #[test]
    fn renders_under_cap_unchanged() {
        let input = sample_input("short post");
        let rendered = render_message(&input);
        assert!(rendered.chars().count() <= MESSAGE_LENGTH_CAP);
        assert!(rendered.contains("short post"));
        assert!(!rendered.ends_with(ELLIPSIS));
    }

    #[test]
    fn truncates_exactly_at_the_cap_boundary() {
        let long_text = "a".repeat(MESSAGE_LENGTH_CAP * 2);
        let input = sample_input(&long_text);
        let rendered = render_message(&input);

        assert_eq!(rendered.chars().count(), MESSAGE_LENGTH_CAP);
        assert!(rendered.ends_with(ELLIPSIS));
    }

    #[test]
    fn one_character_over_cap_still_truncates() {
        let text = "x".repeat(MESSAGE_LENGTH_CAP + 1);
        let rendered = truncate_to_cap(&text, MESSAGE_LENGTH_CAP);
        assert_eq!(rendered.chars().count(), MESSAGE_LENGTH_CAP);
        assert!(rendered.ends_with(ELLIPSIS));
    }

    #[test]
    fn text_exactly_at_cap_is_not_truncated() {
        let text = "y".repeat(MESSAGE_LENGTH_CAP);
        let rendered = truncate_to_cap(&text, MESSAGE_LENGTH_CAP);
        assert_eq!(rendered, text);
    }
}
