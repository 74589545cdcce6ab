// src/summarize.rs
//
// Client for the external synthesis collaborator (OpenAI chat completions).
// The call returns a typed Result; converting a failure into the visible
// placeholder artifact is the caller's job, so tests can assert on both
// paths.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-4o-mini";

/// The run-time secret. Its absence is a configuration error and must abort
/// the run before any network I/O.
pub fn api_key_from_env() -> Result<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| anyhow!("Missing OPENAI_API_KEY env var"))
}

/// PT-BR analyst instructions around the collected headline block.
pub fn build_prompt(headlines: &str, target_date_br: &str) -> String {
    format!(
        "Você é um analista de notícias sobre mineração.\n\
         A seguir estão manchetes coletadas APENAS da data {target_date_br}, no contexto do \
         setor mineral (não incluir criptoativos).\n\n\
         Tarefas:\n\
         1) Produza um resumo em português do Brasil, direto ao ponto, com 5-10 tópicos do que \
         realmente importa, sem opinião e sem redundância.\n\
         2) Na seção \"Principais manchetes\", liste as notícias com o título seguido da fonte \
         entre parênteses e um parágrafo curto explicando cada uma.\n\
         3) Na seção \"Links-chave\", inclua apenas os 3-5 links mais relevantes.\n\
         4) Ignore qualquer manchete que não seja de {target_date_br}.\n\
         5) Se alguma manchete estiver em inglês, traduza para o português.\n\
         Manchetes:\n---\n{headlines}\n---"
    )
}

pub struct Summarizer {
    http: reqwest::Client,
    api_key: String,
}

impl Summarizer {
    pub fn new(api_key: String, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .context("building openai http client")?;
        Ok(Self { http, api_key })
    }

    /// One chat-completions call; any transport or protocol problem surfaces
    /// as an error for the caller's fail-soft handling.
    pub async fn summarize(&self, headlines: &str, target_date_br: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let prompt = build_prompt(headlines, target_date_br);
        let req = Req {
            model: MODEL,
            messages: vec![
                Msg {
                    role: "system",
                    content: "Você resume notícias de forma clara e objetiva.",
                },
                Msg {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.3,
        };

        let resp = self
            .http
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?
            .error_for_status()
            .context("openai non-2xx")?;

        let body: Resp = resp.json().await.context("openai response body")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(anyhow!("openai returned an empty completion"));
        }
        Ok(content.to_string())
    }
}
