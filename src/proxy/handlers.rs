use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Claims;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(rename = "mosText")]
    pub mos_text: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub bullets: Vec<String>,
    pub raw: String,
}

/// Turn an MOS description into at most three civilian resume bullets.
pub async fn translate_mos(
    req: web::Json<TranslateRequest>,
    claims: web::ReqData<Claims>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.mos_text.trim().is_empty() {
        return Err(AppError::Validation(HashMap::from([(
            "mosText".to_string(),
            "must not be empty".to_string(),
        )])));
    }

    info!("translating MOS text for account {}", claims.sub);

    let prompt = format!(
        "Translate this military experience into 3 concise civilian resume bullets:\n\n{}",
        req.mos_text
    );
    let raw = state.generation.complete(&prompt).await?;
    let bullets = parse_bullets(&raw);

    Ok(HttpResponse::Ok().json(TranslateResponse { bullets, raw }))
}

/// Split completion text into clean bullets: leading list markers and
/// numbering are stripped, blank lines dropped, at most three kept.
fn parse_bullets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c == '-' || c == '\u{2022}' || c == '.' || c == ')' || c.is_ascii_digit() || c.is_whitespace()
            })
            .trim()
        })
        .filter(|line| !line.is_empty())
        .take(3)
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_bullets() {
        let content = "1. Led a 12-person team\n2) Managed logistics\n3. Trained new staff";
        assert_eq!(
            parse_bullets(content),
            vec!["Led a 12-person team", "Managed logistics", "Trained new staff"]
        );
    }

    #[test]
    fn test_parse_dashed_and_dotted_bullets() {
        let content = "- Coordinated supply runs\n\u{2022} Maintained vehicles\n";
        assert_eq!(
            parse_bullets(content),
            vec!["Coordinated supply runs", "Maintained vehicles"]
        );
    }

    #[test]
    fn test_blank_lines_dropped_and_capped_at_three() {
        let content = "1. One\n\n2. Two\n\n3. Three\n\n4. Four";
        assert_eq!(parse_bullets(content), vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_empty_content_yields_no_bullets() {
        assert!(parse_bullets("").is_empty());
        assert!(parse_bullets("\n \n").is_empty());
    }
}
