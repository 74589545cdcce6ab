// src/report.rs
//
// Deterministic text assembly: the headline block handed to the synthesis
// collaborator, and the final artifact written to disk. Exactly one artifact
// per run, on every non-fatal path.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::ingest::types::NewsItem;

/// One line (plus optional summary paragraph) per item: title, source,
/// reliability, link. Input order is preserved.
pub fn headline_block(items: &[NewsItem]) -> String {
    let mut out = String::new();
    for it in items {
        let title = if it.title.is_empty() { "(sem título)" } else { &it.title };
        out.push_str(&format!(
            "- {} ({}, confiabilidade {}/10) {}\n",
            title, it.source, it.reliability, it.link
        ));
        if let Some(summary) = &it.summary {
            out.push_str(&format!("  {summary}\n"));
        }
    }
    out
}

/// Body used when the run finds nothing, even after the fallback.
pub fn no_news_notice(target_date_br: &str) -> String {
    format!("Nenhuma notícia relevante de mineração foi encontrada para {target_date_br}.")
}

/// Body used when the synthesis collaborator fails; carries the underlying
/// error so the failure is visible in the artifact itself.
pub fn failure_notice(err: &anyhow::Error) -> String {
    format!("Não foi possível gerar o resumo hoje. Erro: {err:#}")
}

/// Wrap a body with the digest header and footer.
pub fn render_artifact(
    body: &str,
    target_date_br: &str,
    generated_at: &str,
    fallback_used: bool,
) -> String {
    let mut out = vec![
        format!("Resumo diário de mineração — {target_date_br}"),
        format!("(Gerado em {generated_at})"),
        String::new(),
    ];
    if fallback_used {
        out.push(format!(
            "(Sem notícias datadas de {target_date_br}; seguem as mais recentes.)"
        ));
        out.push(String::new());
    }
    out.push(body.to_string());
    out.push(String::new());
    out.push("— Fonte automatizada via GPT (PT-BR/BR).".to_string());
    out.join("\n").trim().to_string() + "\n"
}

pub fn write_artifact(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("writing digest artifact to {}", path.display()))
}
