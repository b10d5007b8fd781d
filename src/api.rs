use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use futures::StreamExt;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{ApiError, GENERATION_FAILED_MESSAGE};
use crate::ingest::Document;
use crate::llm::ModelClient;
use crate::questions::{QuestionCategory, QuestionGenerator};
use crate::session::SessionStore;
use crate::types::{
    ChatRequest, ChatResponse, ConnectionTestResponse, CreateSessionResponse, EssayRequest,
    EssayResponse, HistoryResponse, QuestionRequest, QuestionResponse, QuestionSetEntry,
    QuestionSetResponse, UploadResponse,
};

/// Everything the handlers share. Built once at startup.
pub struct AppState {
    pub client: Arc<dyn ModelClient>,
    pub generator: QuestionGenerator,
    pub sessions: SessionStore,
    pub chat_max_tokens: u32,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(client: Arc<dyn ModelClient>, config: &AppConfig) -> Self {
        Self {
            generator: QuestionGenerator::new(client.clone(), &config.prompts),
            sessions: SessionStore::new(config.session.ttl),
            chat_max_tokens: config.provider.max_tokens,
            max_upload_bytes: config.server.max_upload_bytes,
            client,
        }
    }
}

pub async fn health() -> impl Responder {
    web::Json(serde_json::json!({"status": "ok"}))
}

pub async fn create_session(state: web::Data<AppState>) -> impl Responder {
    let session_id = state.sessions.create().await;
    HttpResponse::Created().json(CreateSessionResponse { session_id })
}

pub async fn end_session(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    state.sessions.remove(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn upload_document(
    path: web::Path<String>,
    mut payload: Multipart,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let session_id = path.into_inner();
    if !state.sessions.contains(&session_id).await {
        return Err(ApiError::NotFound(format!("Session {} not found", session_id)));
    }

    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?;

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|name| name.to_string());
        let is_file = field.name() == Some("file");

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| ApiError::BadRequest(format!("failed to read upload: {}", e)))?;
            if is_file {
                if bytes.len() + chunk.len() > state.max_upload_bytes {
                    return Err(ApiError::BadRequest(format!(
                        "file exceeds the {} byte upload limit",
                        state.max_upload_bytes
                    )));
                }
                bytes.extend_from_slice(&chunk);
            }
        }

        if is_file {
            let filename = filename
                .ok_or_else(|| ApiError::BadRequest("uploaded file has no name".to_string()))?;
            upload = Some((filename, bytes));
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("missing `file` field".to_string()))?;

    let document = tokio::task::spawn_blocking(move || Document::from_upload(&filename, &bytes))
        .await
        .map_err(|e| ApiError::InternalError(format!("Extraction task failed: {}", e)))??;

    let response = UploadResponse {
        filename: document.filename.clone(),
        preview: document.preview(),
        sentence_count: document.sentences.len(),
    };
    state.sessions.attach_document(&session_id, document).await?;

    Ok(web::Json(response))
}

pub async fn generate_questions(
    path: web::Path<String>,
    body: web::Json<QuestionRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let session_id = path.into_inner();
    let request = body.into_inner();
    let category = request.to_category()?;
    let count = request.count.unwrap_or_else(|| state.generator.default_count());

    let text = state.sessions.document(&session_id).await?.joined_text();

    let response = match &category {
        QuestionCategory::Custom { subject, tone } => {
            let custom = state
                .generator
                .generate_custom(&text, count, subject, tone)
                .await?;
            QuestionResponse {
                category: category.name().to_string(),
                content: custom.questions,
                evaluation: Some(custom.evaluation),
            }
        }
        _ => QuestionResponse {
            category: category.name().to_string(),
            content: state.generator.generate(&category, &text, count).await?,
            evaluation: None,
        },
    };

    Ok(web::Json(response))
}

pub async fn generate_all_questions(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let text = state.sessions.document(&path.into_inner()).await?.joined_text();

    let results = state
        .generator
        .generate_all(&text)
        .await
        .into_iter()
        .map(|(category, result)| match result {
            Ok(content) => QuestionSetEntry {
                category: category.name().to_string(),
                content: Some(content),
                error: None,
            },
            Err(_) => QuestionSetEntry {
                category: category.name().to_string(),
                content: None,
                error: Some(GENERATION_FAILED_MESSAGE.to_string()),
            },
        })
        .collect();

    Ok(web::Json(QuestionSetResponse { results }))
}

pub async fn chat(
    path: web::Path<String>,
    body: web::Json<ChatRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let session_id = path.into_inner();
    let reply = state
        .sessions
        .chat(
            &session_id,
            &body.message,
            state.client.as_ref(),
            state.chat_max_tokens,
        )
        .await?;
    let history = state.sessions.history(&session_id).await?;

    Ok(web::Json(ChatResponse { reply, history }))
}

pub async fn chat_history(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let history = state.sessions.history(&path.into_inner()).await?;
    Ok(web::Json(HistoryResponse { history }))
}

pub async fn clear_chat(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    state.sessions.clear_history(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn sample_essay(
    body: web::Json<EssayRequest>,
    state: web::Data<AppState>,
) -> Result<impl Responder, ApiError> {
    let content = state.generator.write_sample_essay(&body.topic).await?;
    Ok(web::Json(EssayResponse { content }))
}

pub async fn connection_test(state: web::Data<AppState>) -> impl Responder {
    match state.client.ping().await {
        Ok(reply) => web::Json(ConnectionTestResponse {
            ok: true,
            reply: Some(reply),
        }),
        Err(e) => {
            tracing::error!("API connection test failed: {}", e);
            web::Json(ConnectionTestResponse {
                ok: false,
                reply: None,
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{id}", web::delete().to(end_session))
            .route("/sessions/{id}/document", web::post().to(upload_document))
            .route("/sessions/{id}/questions", web::post().to(generate_questions))
            .route(
                "/sessions/{id}/questions/all",
                web::post().to(generate_all_questions),
            )
            .service(
                web::resource("/sessions/{id}/chat")
                    .route(web::get().to(chat_history))
                    .route(web::post().to(chat))
                    .route(web::delete().to(clear_chat)),
            )
            .route("/essays", web::post().to(sample_essay))
            .route("/connection-test", web::post().to(connection_test)),
    );
}
